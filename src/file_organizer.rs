/// Moving single files into their destination and recording the result.
///
/// The executor never lets a per-file failure escape: every call produces a
/// [`MoveOutcome`], successful or not, so the batch can carry on.
use serde::Serialize;
use std::ffi::OsString;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::process;

/// Errors that can occur while organizing files.
///
/// The first group aborts a batch before any file is touched; the second group
/// is recorded per file and never stops the batch (see
/// [`OrganizeError::is_batch_fatal`]).
#[derive(Debug)]
pub enum OrganizeError {
    /// A required path argument was empty.
    MissingPath { role: &'static str },
    /// Keyword mode was requested but no keyword survived parsing.
    NoKeywords,
    /// A keyword cannot be used as a folder name.
    InvalidKeyword { keyword: String, reason: String },
    /// Flat keyword mode would move every file onto itself.
    SameSourceAndTarget { path: PathBuf },
    /// The source directory does not exist or is not a directory.
    SourceMissing { path: PathBuf },
    /// The source directory could not be listed.
    SourceUnreadable { path: PathBuf, source: io::Error },
    /// The target root could not be created.
    TargetUnavailable { path: PathBuf, source: io::Error },
    /// Failed to create a destination directory.
    DirectoryCreationFailed { path: PathBuf, source: io::Error },
    /// Something already exists at the destination and the policy forbids replacing it.
    DestinationExists { path: PathBuf },
    /// Failed to move a file to its destination.
    FileMoveFailure {
        source: PathBuf,
        destination: PathBuf,
        source_error: io::Error,
    },
    /// The path has no usable file name component.
    InvalidFileName { path: PathBuf },
}

impl OrganizeError {
    /// True for errors that prevent a batch from starting.
    pub fn is_batch_fatal(&self) -> bool {
        !matches!(
            self,
            Self::DirectoryCreationFailed { .. }
                | Self::DestinationExists { .. }
                | Self::FileMoveFailure { .. }
                | Self::InvalidFileName { .. }
        )
    }

    /// True for errors caused by the caller's input rather than the filesystem.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            Self::MissingPath { .. }
                | Self::NoKeywords
                | Self::InvalidKeyword { .. }
                | Self::SameSourceAndTarget { .. }
        )
    }
}

impl std::fmt::Display for OrganizeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MissingPath { role } => write!(f, "No {} directory provided", role),
            Self::NoKeywords => write!(f, "No keywords provided"),
            Self::InvalidKeyword { keyword, reason } => {
                write!(f, "Invalid keyword '{}': {}", keyword, reason)
            }
            Self::SameSourceAndTarget { path } => write!(
                f,
                "Source and target are the same directory ({}); choose another target or use separate folders",
                path.display()
            ),
            Self::SourceMissing { path } => write!(
                f,
                "Source directory {} does not exist or is not a directory",
                path.display()
            ),
            Self::SourceUnreadable { path, source } => {
                write!(f, "Error reading directory {}: {}", path.display(), source)
            }
            Self::TargetUnavailable { path, source } => write!(
                f,
                "Could not create target directory {}: {}",
                path.display(),
                source
            ),
            Self::DirectoryCreationFailed { path, source } => {
                write!(
                    f,
                    "Failed to create directory {}: {}",
                    path.display(),
                    source
                )
            }
            Self::DestinationExists { path } => {
                write!(f, "Destination already exists: {}", path.display())
            }
            Self::FileMoveFailure {
                source,
                destination,
                source_error,
            } => {
                write!(
                    f,
                    "Failed to move {} to {}: {}",
                    source.display(),
                    destination.display(),
                    source_error
                )
            }
            Self::InvalidFileName { path } => {
                write!(f, "Path has no file name: {}", path.display())
            }
        }
    }
}

impl std::error::Error for OrganizeError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::SourceUnreadable { source, .. }
            | Self::TargetUnavailable { source, .. }
            | Self::DirectoryCreationFailed { source, .. } => Some(source),
            Self::FileMoveFailure { source_error, .. } => Some(source_error),
            _ => None,
        }
    }
}

/// Result type for file organization operations.
pub type OrganizeResult<T> = Result<T, OrganizeError>;

/// Status tag of a processed file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum MoveStatus {
    Moved,
    /// Keyword mode only: the name matched no keyword, the file stays put.
    SkippedNoMatch,
    Failed,
    /// Dry run: the file would have been moved.
    Planned,
}

impl MoveStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            MoveStatus::Moved => "moved",
            MoveStatus::SkippedNoMatch => "skipped-no-match",
            MoveStatus::Failed => "failed",
            MoveStatus::Planned => "planned",
        }
    }
}

/// The result of processing one file.
#[derive(Debug, Clone, Serialize)]
pub struct MoveOutcome {
    /// Where the file was found.
    pub source: PathBuf,
    /// Where the file went, or would have gone. `None` when no destination
    /// was resolved.
    pub destination: Option<PathBuf>,
    pub status: MoveStatus,
    /// Human-readable description, only set for failures.
    pub error: Option<String>,
}

impl MoveOutcome {
    pub fn moved(source: PathBuf, destination: PathBuf) -> Self {
        Self {
            source,
            destination: Some(destination),
            status: MoveStatus::Moved,
            error: None,
        }
    }

    pub fn planned(source: PathBuf, destination: PathBuf) -> Self {
        Self {
            source,
            destination: Some(destination),
            status: MoveStatus::Planned,
            error: None,
        }
    }

    pub fn skipped(source: PathBuf) -> Self {
        Self {
            source,
            destination: None,
            status: MoveStatus::SkippedNoMatch,
            error: None,
        }
    }

    pub fn failed(source: PathBuf, destination: Option<PathBuf>, error: &OrganizeError) -> Self {
        Self {
            source,
            destination,
            status: MoveStatus::Failed,
            error: Some(error.to_string()),
        }
    }

    pub fn is_failure(&self) -> bool {
        self.status == MoveStatus::Failed
    }
}

/// Moves files to already resolved destinations.
pub struct FileOrganizer;

impl FileOrganizer {
    /// Moves `file_path` to `destination_path`.
    ///
    /// With `replace` set, an existing file at the destination is removed
    /// first so the result does not depend on platform rename semantics.
    /// Failures are folded into a `failed` outcome.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use downsort::file_organizer::FileOrganizer;
    /// use std::path::Path;
    ///
    /// let outcome = FileOrganizer::execute(
    ///     Path::new("/downloads/photo.png"),
    ///     Path::new("/sorted/Images/photo.png"),
    ///     false,
    /// );
    /// println!("{}: {:?}", outcome.status.as_str(), outcome.error);
    /// ```
    pub fn execute(file_path: &Path, destination_path: &Path, replace: bool) -> MoveOutcome {
        match Self::move_file(file_path, destination_path, replace) {
            Ok(()) => MoveOutcome::moved(file_path.to_path_buf(), destination_path.to_path_buf()),
            Err(e) => MoveOutcome::failed(
                file_path.to_path_buf(),
                Some(destination_path.to_path_buf()),
                &e,
            ),
        }
    }

    /// Moves a file, falling back to copy and remove across filesystems.
    pub fn move_file(file_path: &Path, destination_path: &Path, replace: bool) -> OrganizeResult<()> {
        let failure = |e: io::Error| OrganizeError::FileMoveFailure {
            source: file_path.to_path_buf(),
            destination: destination_path.to_path_buf(),
            source_error: e,
        };

        if !file_path.is_file() {
            return Err(failure(io::Error::new(
                io::ErrorKind::NotFound,
                "source file no longer exists",
            )));
        }

        if destination_path.exists() {
            if !replace {
                return Err(OrganizeError::DestinationExists {
                    path: destination_path.to_path_buf(),
                });
            }
            if destination_path.is_dir() {
                return Err(failure(io::Error::new(
                    io::ErrorKind::AlreadyExists,
                    "destination is a directory",
                )));
            }
            fs::remove_file(destination_path).map_err(failure)?;
        }

        match fs::rename(file_path, destination_path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::CrossesDevices => {
                if is_symlink(file_path) {
                    return Err(failure(io::Error::new(
                        io::ErrorKind::CrossesDevices,
                        "symbolic links are not moved across filesystems",
                    )));
                }
                copy_into_place(file_path, destination_path).map_err(failure)?;
                if let Err(e) = fs::remove_file(file_path) {
                    // leave only the original behind
                    let _ = fs::remove_file(destination_path);
                    return Err(failure(e));
                }
                Ok(())
            }
            Err(e) => Err(failure(e)),
        }
    }
}

fn is_symlink(path: &Path) -> bool {
    fs::symlink_metadata(path)
        .map(|m| m.file_type().is_symlink())
        .unwrap_or(false)
}

/// Copies `file_path` to a temporary name next to `destination_path`, then
/// renames it into place. The temporary file is removed on any error, so a
/// partial copy never shows up under the destination name.
fn copy_into_place(file_path: &Path, destination_path: &Path) -> io::Result<()> {
    let temp_path = temp_path_for(destination_path);
    let result = fs::copy(file_path, &temp_path)
        .and_then(|_| fs::rename(&temp_path, destination_path));
    if result.is_err() {
        let _ = fs::remove_file(&temp_path);
    }
    result
}

/// `dir/.name.downsort-<pid>.tmp` for `dir/name`.
fn temp_path_for(destination_path: &Path) -> PathBuf {
    let mut name = OsString::from(".");
    name.push(destination_path.file_name().unwrap_or_default());
    name.push(format!(".downsort-{}.tmp", process::id()));
    destination_path.with_file_name(name)
}
