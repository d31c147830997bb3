//! Batch orchestration.
//!
//! An [`Organizer`] validates its inputs, snapshots the direct entries of the
//! source directory and drives classify, resolve and move for every eligible
//! file. Per-file failures are recorded and never stop the batch. Every
//! meaningful step is reported as a [`StatusEvent`] to a caller supplied
//! callback and kept as a status line in the final [`BatchReport`].

use crate::classifier::{Classification, Classifier, KeywordSet};
use crate::config::CompiledFilters;
use crate::destination::{ConflictPolicy, DestinationResolver, ensure_dir};
use crate::file_category::CategoryTable;
use crate::file_organizer::{FileOrganizer, MoveOutcome, MoveStatus, OrganizeError, OrganizeResult};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::ffi::OsString;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

/// Lifecycle of an [`Organizer`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BatchState {
    /// No batch has started, or the last one was rejected before starting.
    Idle,
    Running,
    Completed,
}

/// Aggregate counts of one batch, derived from its outcomes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BatchSummary {
    pub considered: usize,
    pub moved: usize,
    pub skipped: usize,
    pub failed: usize,
    pub planned: usize,
}

impl BatchSummary {
    pub fn from_outcomes(outcomes: &[MoveOutcome]) -> Self {
        outcomes.iter().fold(
            Self {
                considered: outcomes.len(),
                ..Self::default()
            },
            |mut summary, outcome| {
                match outcome.status {
                    MoveStatus::Moved => summary.moved += 1,
                    MoveStatus::SkippedNoMatch => summary.skipped += 1,
                    MoveStatus::Failed => summary.failed += 1,
                    MoveStatus::Planned => summary.planned += 1,
                }
                summary
            },
        )
    }
}

impl fmt::Display for BatchSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} considered, {} moved, {} skipped, {} failed",
            self.considered, self.moved, self.skipped, self.failed
        )?;
        if self.planned > 0 {
            write!(f, ", {} planned", self.planned)?;
        }
        Ok(())
    }
}

/// Everything a caller needs to present the result of a batch.
#[derive(Debug, Clone, Serialize)]
pub struct BatchReport {
    pub source: PathBuf,
    pub target: PathBuf,
    /// `category` or `keywords`.
    pub mode: &'static str,
    pub dry_run: bool,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub outcomes: Vec<MoveOutcome>,
    pub summary: BatchSummary,
    /// Human-readable status lines, in the order they were emitted.
    pub log: Vec<String>,
}

/// A meaningful step of a batch, delivered to the status callback.
///
/// The `Display` form is the status line shown in a log view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StatusEvent {
    BatchStarted {
        source: PathBuf,
        target: PathBuf,
        files: usize,
        dry_run: bool,
    },
    FolderCreated {
        path: PathBuf,
    },
    FileMoved {
        source: PathBuf,
        destination: PathBuf,
    },
    FilePlanned {
        source: PathBuf,
        destination: PathBuf,
    },
    FileSkipped {
        source: PathBuf,
    },
    FileFailed {
        source: PathBuf,
        error: String,
    },
    /// Left out by the configured filters.
    FileExcluded {
        source: PathBuf,
    },
    BatchCompleted {
        summary: BatchSummary,
    },
    ValidationFailed {
        error: String,
    },
}

impl StatusEvent {
    fn for_outcome(outcome: &MoveOutcome) -> Self {
        let source = outcome.source.clone();
        let destination = outcome.destination.clone().unwrap_or_default();
        match outcome.status {
            MoveStatus::Moved => StatusEvent::FileMoved {
                source,
                destination,
            },
            MoveStatus::Planned => StatusEvent::FilePlanned {
                source,
                destination,
            },
            MoveStatus::SkippedNoMatch => StatusEvent::FileSkipped { source },
            MoveStatus::Failed => StatusEvent::FileFailed {
                source,
                error: outcome.error.clone().unwrap_or_default(),
            },
        }
    }

    /// True for events describing a single file.
    pub fn is_file_event(&self) -> bool {
        matches!(
            self,
            StatusEvent::FileMoved { .. }
                | StatusEvent::FilePlanned { .. }
                | StatusEvent::FileSkipped { .. }
                | StatusEvent::FileFailed { .. }
        )
    }
}

impl fmt::Display for StatusEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StatusEvent::BatchStarted {
                source,
                target,
                files,
                dry_run,
            } => write!(
                f,
                "{}Organizing {} file{} from {} into {}",
                if *dry_run { "DRY RUN: " } else { "" },
                files,
                if *files == 1 { "" } else { "s" },
                source.display(),
                target.display()
            ),
            StatusEvent::FolderCreated { path } => {
                write!(f, "Created folder: {}", path.display())
            }
            StatusEvent::FileMoved {
                source,
                destination,
            } => write!(f, "Moved: {} -> {}", source.display(), destination.display()),
            StatusEvent::FilePlanned {
                source,
                destination,
            } => write!(
                f,
                "Would move: {} -> {}",
                source.display(),
                destination.display()
            ),
            StatusEvent::FileSkipped { source } => {
                write!(f, "Skipped (no keyword match): {}", source.display())
            }
            StatusEvent::FileFailed { source, error } => {
                write!(f, "Failed: {}: {}", source.display(), error)
            }
            StatusEvent::FileExcluded { source } => {
                write!(f, "Excluded by filters: {}", source.display())
            }
            StatusEvent::BatchCompleted { summary } => {
                write!(f, "Organization complete: {}", summary)
            }
            StatusEvent::ValidationFailed { error } => write!(f, "Error: {}", error),
        }
    }
}

/// Options that stay fixed across batches of one [`Organizer`].
#[derive(Debug, Clone, Copy, Default)]
pub struct OrganizeOptions {
    pub on_conflict: ConflictPolicy,
    /// Resolve destinations and report `planned` outcomes without touching
    /// the filesystem.
    pub dry_run: bool,
}

/// A file of the source directory that takes part in the batch.
#[derive(Debug, Clone)]
struct SourceEntry {
    /// The name as stored on disk, used to build the destination.
    file_name: OsString,
    /// Lossy UTF-8 form for classification and filters.
    name: String,
    path: PathBuf,
}

/// The snapshot of a source directory.
struct Snapshot {
    entries: Vec<SourceEntry>,
    excluded: Vec<PathBuf>,
}

/// Runs batches against a category table.
///
/// A batch borrows the organizer mutably, so one organizer never runs two
/// batches at the same time.
pub struct Organizer<'a> {
    table: &'a CategoryTable,
    filters: CompiledFilters,
    options: OrganizeOptions,
    state: BatchState,
}

impl<'a> Organizer<'a> {
    pub fn new(table: &'a CategoryTable) -> Self {
        Self {
            table,
            filters: CompiledFilters::default(),
            options: OrganizeOptions::default(),
            state: BatchState::Idle,
        }
    }

    pub fn with_filters(mut self, filters: CompiledFilters) -> Self {
        self.filters = filters;
        self
    }

    pub fn with_options(mut self, options: OrganizeOptions) -> Self {
        self.options = options;
        self
    }

    pub fn state(&self) -> BatchState {
        self.state
    }

    /// Sorts the files of `source_dir` into `target_dir/<Category>/`.
    ///
    /// # Errors
    ///
    /// Returns validation and source errors before touching the filesystem,
    /// and `TargetUnavailable` when the target root cannot be created.
    /// Per-file failures are part of the returned report instead.
    pub fn organize_by_category<F>(
        &mut self,
        source_dir: &str,
        target_dir: &str,
        mut on_status: F,
    ) -> OrganizeResult<BatchReport>
    where
        F: FnMut(&StatusEvent),
    {
        let mut log = Vec::new();
        let (source, target) =
            self.check_inputs(source_dir, target_dir, false, &mut log, &mut on_status)?;
        let classifier = Classifier::Extension(self.table);
        self.run(&source, &target, classifier, log, &mut on_status)
    }

    /// Moves files whose name contains one of the comma separated keywords.
    ///
    /// With `separate_folders` each file goes to `target_dir/<first matching
    /// keyword>/`, otherwise straight into `target_dir`. Files matching no
    /// keyword stay in place.
    ///
    /// # Errors
    ///
    /// Same as [`Organizer::organize_by_category`], plus `NoKeywords` when the
    /// keyword string holds no keyword.
    pub fn organize_by_keywords<F>(
        &mut self,
        source_dir: &str,
        target_dir: &str,
        raw_keywords: &str,
        separate_folders: bool,
        mut on_status: F,
    ) -> OrganizeResult<BatchReport>
    where
        F: FnMut(&StatusEvent),
    {
        let mut log = Vec::new();
        let keywords = match KeywordSet::parse(raw_keywords) {
            Ok(keywords) => keywords,
            Err(e) => return Err(self.reject(e, &mut log, &mut on_status)),
        };

        let (source, target) = self.check_inputs(
            source_dir,
            target_dir,
            !separate_folders,
            &mut log,
            &mut on_status,
        )?;
        let classifier = Classifier::Keywords {
            keywords: &keywords,
            separate_folders,
        };
        self.run(&source, &target, classifier, log, &mut on_status)
    }

    /// Validates paths and checks the source before a batch starts.
    ///
    /// `distinct_target` is set for keyword mode without separate folders,
    /// where source and target must differ.
    fn check_inputs<F>(
        &mut self,
        source_dir: &str,
        target_dir: &str,
        distinct_target: bool,
        log: &mut Vec<String>,
        on_status: &mut F,
    ) -> OrganizeResult<(PathBuf, PathBuf)>
    where
        F: FnMut(&StatusEvent),
    {
        let checked = validate_paths(source_dir, target_dir).and_then(|(source, target)| {
            if !source.is_dir() {
                return Err(OrganizeError::SourceMissing { path: source });
            }
            if distinct_target && same_directory(&source, &target) {
                return Err(OrganizeError::SameSourceAndTarget { path: source });
            }
            Ok((source, target))
        });

        checked.map_err(|e| self.reject(e, log, on_status))
    }

    /// Reports a batch-fatal error and returns the organizer to `Idle`.
    fn reject<F>(
        &mut self,
        error: OrganizeError,
        log: &mut Vec<String>,
        on_status: &mut F,
    ) -> OrganizeError
    where
        F: FnMut(&StatusEvent),
    {
        self.state = BatchState::Idle;
        emit(
            StatusEvent::ValidationFailed {
                error: error.to_string(),
            },
            log,
            on_status,
        );
        error
    }

    fn run<F>(
        &mut self,
        source: &Path,
        target: &Path,
        classifier: Classifier<'_>,
        mut log: Vec<String>,
        on_status: &mut F,
    ) -> OrganizeResult<BatchReport>
    where
        F: FnMut(&StatusEvent),
    {
        self.state = BatchState::Running;
        let started_at = Utc::now();
        let dry_run = self.options.dry_run;

        let Snapshot { entries, excluded } = match self.snapshot(source) {
            Ok(snapshot) => snapshot,
            Err(e) => return Err(self.reject(e, &mut log, on_status)),
        };

        if !dry_run {
            match ensure_dir(target) {
                Ok(created) => {
                    for path in created {
                        emit(StatusEvent::FolderCreated { path }, &mut log, on_status);
                    }
                }
                Err(OrganizeError::DirectoryCreationFailed { path, source }) => {
                    let error = OrganizeError::TargetUnavailable { path, source };
                    return Err(self.reject(error, &mut log, on_status));
                }
                Err(e) => return Err(self.reject(e, &mut log, on_status)),
            }
        }

        emit(
            StatusEvent::BatchStarted {
                source: source.to_path_buf(),
                target: target.to_path_buf(),
                files: entries.len(),
                dry_run,
            },
            &mut log,
            on_status,
        );
        for source in excluded {
            emit(StatusEvent::FileExcluded { source }, &mut log, on_status);
        }

        let resolver = DestinationResolver::new(target, self.options.on_conflict, !dry_run);
        let mut outcomes = Vec::with_capacity(entries.len());

        for entry in &entries {
            let classification = classifier.classify(&entry.name);
            let outcome = self.process(entry, &classification, &resolver, &mut log, on_status);
            emit(StatusEvent::for_outcome(&outcome), &mut log, on_status);
            outcomes.push(outcome);
        }

        let summary = BatchSummary::from_outcomes(&outcomes);
        self.state = BatchState::Completed;
        emit(StatusEvent::BatchCompleted { summary }, &mut log, on_status);

        Ok(BatchReport {
            source: source.to_path_buf(),
            target: target.to_path_buf(),
            mode: classifier.mode_label(),
            dry_run,
            started_at,
            finished_at: Utc::now(),
            outcomes,
            summary,
            log,
        })
    }

    /// Resolve and move a single classified file.
    fn process<F>(
        &self,
        entry: &SourceEntry,
        classification: &Classification,
        resolver: &DestinationResolver,
        log: &mut Vec<String>,
        on_status: &mut F,
    ) -> MoveOutcome
    where
        F: FnMut(&StatusEvent),
    {
        let destination = match resolver.resolve(classification, &entry.file_name) {
            Ok(Some(destination)) => destination,
            Ok(None) => return MoveOutcome::skipped(entry.path.clone()),
            Err(e) => {
                let attempted = match &e {
                    OrganizeError::DestinationExists { path } => Some(path.clone()),
                    _ => None,
                };
                return MoveOutcome::failed(entry.path.clone(), attempted, &e);
            }
        };

        for path in destination.created_dirs {
            emit(StatusEvent::FolderCreated { path }, log, on_status);
        }

        if self.options.dry_run {
            return MoveOutcome::planned(entry.path.clone(), destination.path);
        }
        FileOrganizer::execute(&entry.path, &destination.path, destination.replace)
    }

    /// Lists the eligible files of `source`, sorted by name, and the files
    /// the filters left out.
    ///
    /// The whole listing is read before anything moves. Directories are
    /// skipped, symlinks count when they point at a regular file.
    fn snapshot(&self, source: &Path) -> OrganizeResult<Snapshot> {
        let listing = fs::read_dir(source).map_err(|e| OrganizeError::SourceUnreadable {
            path: source.to_path_buf(),
            source: e,
        })?;

        let mut entries: Vec<SourceEntry> = Vec::new();
        let mut excluded = Vec::new();
        for entry in listing.flatten() {
            let path = entry.path();
            let is_file = fs::metadata(&path).map(|m| m.is_file()).unwrap_or(false);
            if !is_file {
                continue;
            }

            let file_name = entry.file_name();
            let name = file_name.to_string_lossy().into_owned();
            if !self.filters.should_include(&name) {
                excluded.push(path);
                continue;
            }
            entries.push(SourceEntry {
                file_name,
                name,
                path,
            });
        }

        entries.sort_by(|a, b| a.file_name.cmp(&b.file_name));
        excluded.sort();
        Ok(Snapshot { entries, excluded })
    }
}

/// Records a status line and hands the event to the callback.
fn emit<F>(event: StatusEvent, log: &mut Vec<String>, on_status: &mut F)
where
    F: FnMut(&StatusEvent),
{
    log.push(event.to_string());
    on_status(&event);
}

/// Checks both paths are non-empty and expands a leading `~`.
fn validate_paths(source_dir: &str, target_dir: &str) -> OrganizeResult<(PathBuf, PathBuf)> {
    let source_dir = source_dir.trim();
    let target_dir = target_dir.trim();
    if source_dir.is_empty() {
        return Err(OrganizeError::MissingPath { role: "source" });
    }
    if target_dir.is_empty() {
        return Err(OrganizeError::MissingPath { role: "target" });
    }
    Ok((expand_home(source_dir), expand_home(target_dir)))
}

/// Expands `~` and `~/...` using `HOME`. Other paths are returned unchanged.
///
/// ```
/// use downsort::batch::expand_home;
/// use std::path::PathBuf;
///
/// assert_eq!(expand_home("/tmp/in"), PathBuf::from("/tmp/in"));
/// assert_eq!(expand_home("~user/in"), PathBuf::from("~user/in"));
/// ```
pub fn expand_home(raw: &str) -> PathBuf {
    let rest = if raw == "~" {
        Some("")
    } else {
        raw.strip_prefix("~/")
    };

    match (rest, std::env::var_os("HOME")) {
        (Some(rest), Some(home)) if rest.is_empty() => PathBuf::from(home),
        (Some(rest), Some(home)) => PathBuf::from(home).join(rest),
        _ => PathBuf::from(raw),
    }
}

/// True when both paths name the same existing directory.
fn same_directory(a: &Path, b: &Path) -> bool {
    match (fs::canonicalize(a), fs::canonicalize(b)) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}

/// Sorts `source_dir` by extension using the standard category table.
///
/// Status lines are available in [`BatchReport::log`].
///
/// # Examples
///
/// ```no_run
/// let report = downsort::organize_by_category("~/Downloads", "~/Documents/Sorted_Downloads")?;
/// println!("moved {} files", report.summary.moved);
/// # Ok::<(), downsort::OrganizeError>(())
/// ```
pub fn organize_by_category(source_dir: &str, target_dir: &str) -> OrganizeResult<BatchReport> {
    Organizer::new(CategoryTable::standard()).organize_by_category(source_dir, target_dir, |_| {})
}

/// Moves files matching the comma separated keywords with default options.
pub fn organize_by_keywords(
    source_dir: &str,
    target_dir: &str,
    raw_keywords: &str,
    separate_folders: bool,
) -> OrganizeResult<BatchReport> {
    Organizer::new(CategoryTable::standard()).organize_by_keywords(
        source_dir,
        target_dir,
        raw_keywords,
        separate_folders,
        |_| {},
    )
}
