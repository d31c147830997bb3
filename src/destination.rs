/// Destination resolution for classified files.
///
/// Turns a target root, a [`Classification`] and a file name into a concrete
/// destination path, creating the destination directory on demand and
/// applying the [`ConflictPolicy`] when the name is already taken.
use crate::classifier::Classification;
use crate::file_organizer::{OrganizeError, OrganizeResult};
use serde::{Deserialize, Serialize};
use std::ffi::OsStr;
use std::fs;
use std::path::{Path, PathBuf};

/// What to do when the destination name is already taken.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum ConflictPolicy {
    /// Leave both files alone and record the file as failed.
    #[default]
    Fail,
    /// Pick the first free `name (N).ext`.
    Rename,
    /// Replace the existing file.
    Overwrite,
}

/// A resolved destination for one file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Destination {
    /// The directory the file goes into.
    pub dir: PathBuf,
    /// The full destination path, including the (possibly renamed) file name.
    pub path: PathBuf,
    /// Directories created while resolving, outermost first.
    pub created_dirs: Vec<PathBuf>,
    /// Whether an existing file at `path` is to be replaced.
    pub replace: bool,
}

/// Computes the destination directory for a classification.
///
/// Returns `None` for [`Classification::NoMatch`].
///
/// ```
/// use downsort::classifier::{Classification, Classifier, KeywordSet};
/// use downsort::destination::destination_dir;
/// use downsort::file_category::Category;
/// use std::path::Path;
///
/// let root = Path::new("/sorted");
/// assert_eq!(
///     destination_dir(root, &Classification::Category(Category::Images)),
///     Some(root.join("Images"))
/// );
///
/// let keywords = KeywordSet::parse("invoice").unwrap();
/// let classifier = Classifier::Keywords { keywords: &keywords, separate_folders: true };
/// let classification = classifier.classify("invoice_jan.txt");
/// assert_eq!(destination_dir(root, &classification), Some(root.join("invoice")));
/// ```
pub fn destination_dir(target_root: &Path, classification: &Classification) -> Option<PathBuf> {
    match classification {
        Classification::Category(category) => Some(target_root.join(category.dir_name())),
        Classification::Keywords(m) if m.separate_folders => Some(target_root.join(m.primary())),
        Classification::Keywords(_) => Some(target_root.to_path_buf()),
        Classification::NoMatch => None,
    }
}

/// Resolves destinations under one target root.
#[derive(Debug, Clone)]
pub struct DestinationResolver {
    target_root: PathBuf,
    policy: ConflictPolicy,
    create_dirs: bool,
}

impl DestinationResolver {
    /// Creates a resolver. With `create_dirs` unset (dry runs) nothing is
    /// created on disk.
    pub fn new(target_root: impl Into<PathBuf>, policy: ConflictPolicy, create_dirs: bool) -> Self {
        Self {
            target_root: target_root.into(),
            policy,
            create_dirs,
        }
    }

    /// Resolves the destination of `file_name`.
    ///
    /// The name is joined as given, so names that are not valid UTF-8 keep
    /// their bytes. Returns `Ok(None)` when the classification says the file
    /// stays put.
    ///
    /// # Errors
    ///
    /// `DirectoryCreationFailed` when the destination directory cannot be
    /// created, `DestinationExists` when the name is taken under
    /// [`ConflictPolicy::Fail`].
    pub fn resolve(
        &self,
        classification: &Classification,
        file_name: impl AsRef<OsStr>,
    ) -> OrganizeResult<Option<Destination>> {
        let Some(dir) = destination_dir(&self.target_root, classification) else {
            return Ok(None);
        };

        let created_dirs = if self.create_dirs {
            ensure_dir(&dir)?
        } else {
            Vec::new()
        };

        let candidate = dir.join(file_name.as_ref());
        let (path, replace) = if !candidate.exists() {
            (candidate, false)
        } else {
            match self.policy {
                ConflictPolicy::Fail => {
                    return Err(OrganizeError::DestinationExists { path: candidate });
                }
                ConflictPolicy::Rename => (unique_destination(&candidate), false),
                ConflictPolicy::Overwrite => (candidate, true),
            }
        };

        Ok(Some(Destination {
            dir,
            path,
            created_dirs,
            replace,
        }))
    }
}

/// Creates `dir` and any missing parents, returning the ones that were created.
///
/// An already existing directory is not an error.
pub fn ensure_dir(dir: &Path) -> OrganizeResult<Vec<PathBuf>> {
    let mut missing: Vec<PathBuf> = dir
        .ancestors()
        .take_while(|p| !p.as_os_str().is_empty() && !p.is_dir())
        .map(Path::to_path_buf)
        .collect();
    if missing.is_empty() {
        return Ok(missing);
    }

    fs::create_dir_all(dir).map_err(|e| OrganizeError::DirectoryCreationFailed {
        path: dir.to_path_buf(),
        source: e,
    })?;

    missing.reverse();
    Ok(missing)
}

/// Finds the first free `stem (N).ext` next to `candidate`.
///
/// Example: `report.pdf` becomes `report (1).pdf`, then `report (2).pdf`.
fn unique_destination(candidate: &Path) -> PathBuf {
    let stem = candidate.file_stem().unwrap_or(OsStr::new("file"));
    let ext = candidate.extension();

    (1u32..)
        .map(|n| {
            let mut name = stem.to_os_string();
            name.push(format!(" ({})", n));
            if let Some(ext) = ext {
                name.push(".");
                name.push(ext);
            }
            candidate.with_file_name(name)
        })
        .find(|path| !path.exists())
        .unwrap_or_else(|| candidate.to_path_buf())
}
