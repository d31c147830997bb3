//! Command-line interface module for downsort.
//!
//! This module handles all CLI-related functionality including:
//! - Argument parsing
//! - Loading configuration and building the category table
//! - Running a batch and rendering its status stream

use crate::batch::{BatchReport, OrganizeOptions, Organizer, StatusEvent};
use crate::config::Config;
use crate::destination::ConflictPolicy;
use crate::file_category::CategoryTable;
use crate::output::OutputFormatter;
use clap::Parser;
use indicatif::ProgressBar;
use std::path::PathBuf;

/// Sort the files of a directory into category or keyword folders.
#[derive(Debug, Clone, Parser)]
#[command(author, version, name = "downsort")]
pub struct Args {
    /// Directory whose files are sorted (only its direct children)
    #[arg(value_hint = clap::ValueHint::DirPath)]
    pub source: String,

    /// Directory receiving the sorted files, created when missing
    #[arg(value_hint = clap::ValueHint::DirPath)]
    pub target: String,

    /// Comma-separated keywords; only files whose name contains one are moved
    #[arg(short, long, value_name = "LIST")]
    pub keywords: Option<String>,

    /// Put each file into a folder named after its first matching keyword
    #[arg(short, long, requires = "keywords")]
    pub separate_folders: bool,

    /// Only print what would be moved
    #[arg(short = 'n', long)]
    pub dry_run: bool,

    /// What to do when the destination name is taken [default: from config, else fail]
    #[arg(long, value_enum, value_name = "POLICY")]
    pub on_conflict: Option<ConflictPolicy>,

    /// Configuration file
    #[arg(short, long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Print the batch report as JSON
    #[arg(long)]
    pub json: bool,

    /// Only print the summary
    #[arg(short, long)]
    pub quiet: bool,
}

impl Args {
    /// Organizer options: command line first, then the configuration file.
    fn options(&self, config: &Config) -> OrganizeOptions {
        OrganizeOptions {
            on_conflict: self.on_conflict.unwrap_or(config.organize.on_conflict),
            dry_run: self.dry_run,
        }
    }
}

/// Runs the CLI application with parsed arguments.
///
/// Returns an error message for batch-fatal problems: invalid configuration,
/// validation failures, a missing source or an unusable target. A batch in
/// which files failed still returns `Ok`.
///
/// # Examples
///
/// ```no_run
/// use clap::Parser;
/// use downsort::cli::{Args, run_cli};
///
/// let args = Args::parse_from(["downsort", "/tmp/in", "/tmp/out", "-k", "invoice"]);
/// if let Err(e) = run_cli(&args) {
///     eprintln!("Error: {}", e);
/// }
/// ```
pub fn run_cli(args: &Args) -> Result<BatchReport, String> {
    let config = Config::load(args.config.as_deref())
        .map_err(|e| format!("Error loading configuration: {}", e))?;
    let filters = config
        .compile_filters()
        .map_err(|e| format!("Error compiling filters: {}", e))?;

    let custom_table;
    let table = if config.uses_standard_categories() {
        CategoryTable::standard()
    } else {
        custom_table = config
            .category_table()
            .map_err(|e| format!("Error building categories: {}", e))?;
        &custom_table
    };

    let mut organizer = Organizer::new(table)
        .with_filters(filters)
        .with_options(args.options(&config));

    let mut renderer = StatusRenderer::new(args.quiet || args.json);
    let result = match &args.keywords {
        Some(raw) => organizer.organize_by_keywords(
            &args.source,
            &args.target,
            raw,
            args.separate_folders,
            |event| renderer.handle(event),
        ),
        None => organizer.organize_by_category(&args.source, &args.target, |event| {
            renderer.handle(event)
        }),
    };
    renderer.finish();

    let report = result.map_err(|e| e.to_string())?;
    if args.json {
        let json = serde_json::to_string_pretty(&report)
            .map_err(|e| format!("Error serializing report: {}", e))?;
        println!("{}", json);
    } else {
        OutputFormatter::summary_table(&report);
        if report.dry_run {
            OutputFormatter::success("Dry run complete. No files were modified.");
        }
    }
    Ok(report)
}

/// Renders status events while a batch runs.
///
/// File lines are printed above a progress bar that is created once the batch
/// announces its file count. Quiet mode prints nothing while the batch runs.
struct StatusRenderer {
    quiet: bool,
    progress: Option<ProgressBar>,
}

impl StatusRenderer {
    fn new(quiet: bool) -> Self {
        Self {
            quiet,
            progress: None,
        }
    }

    fn handle(&mut self, event: &StatusEvent) {
        match event {
            StatusEvent::BatchStarted { files, .. } => {
                if !self.quiet {
                    OutputFormatter::render(event);
                    if *files > 0 {
                        self.progress = Some(OutputFormatter::create_progress_bar(*files as u64));
                    }
                }
            }
            StatusEvent::BatchCompleted { .. } => {
                if let Some(pb) = self.progress.take() {
                    pb.finish_and_clear();
                }
                if !self.quiet {
                    OutputFormatter::render(event);
                }
            }
            StatusEvent::ValidationFailed { .. } => {
                // reported once by the caller through the returned error
            }
            _ => {
                if event.is_file_event()
                    && let Some(pb) = &self.progress
                {
                    pb.inc(1);
                }
                if self.quiet {
                    return;
                }
                match &self.progress {
                    Some(pb) => pb.suspend(|| OutputFormatter::render(event)),
                    None => OutputFormatter::render(event),
                }
            }
        }
    }

    fn finish(&mut self) {
        if let Some(pb) = self.progress.take() {
            pb.finish_and_clear();
        }
    }
}
