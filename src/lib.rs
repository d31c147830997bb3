//! downsort - sort the files of a flat directory into folders
//!
//! Files are classified either by extension into a fixed set of categories
//! (Images, Videos, Documents, Audio, Archives, Programs, Others) or by
//! case-insensitive keyword matches against their name, then moved into the
//! target directory. Each batch returns a per-file outcome log, status lines
//! and a summary.

pub mod batch;
pub mod classifier;
pub mod cli;
pub mod config;
pub mod destination;
pub mod file_category;
pub mod file_organizer;
pub mod output;

pub use batch::{
    BatchReport, BatchState, BatchSummary, OrganizeOptions, Organizer, StatusEvent,
    organize_by_category, organize_by_keywords,
};
pub use classifier::{Classification, Classifier, KeywordSet};
pub use config::{CompiledFilters, Config, ConfigError};
pub use destination::{ConflictPolicy, Destination, DestinationResolver};
pub use file_category::{Category, CategoryTable};
pub use file_organizer::{FileOrganizer, MoveOutcome, MoveStatus, OrganizeError, OrganizeResult};

pub use cli::{Args, run_cli};
