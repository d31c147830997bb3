//! Output formatting and styling module.
//!
//! All terminal output of the command-line front end goes through here:
//! colored status lines, the progress bar and the summary table.

use crate::batch::{BatchReport, StatusEvent};
use crate::file_organizer::MoveStatus;
use colored::*;
use indicatif::{ProgressBar, ProgressStyle};
use std::collections::BTreeMap;
use std::path::Path;

/// Manages all CLI output with consistent styling and formatting.
///
/// - Success messages (green with ✓)
/// - Error messages (red with ✗)
/// - Warning messages (yellow with ⚠)
pub struct OutputFormatter;

impl OutputFormatter {
    /// Prints a success message in green with a checkmark.
    ///
    /// ```no_run
    /// use downsort::output::OutputFormatter;
    /// OutputFormatter::success("File organized successfully!");
    /// ```
    pub fn success(message: &str) {
        println!("{} {}", "✓".green(), message);
    }

    /// Prints an error message in red with an X mark.
    pub fn error(message: &str) {
        eprintln!("{} {}", "✗".red(), message);
    }

    /// Prints a warning message in yellow with a warning symbol.
    pub fn warning(message: &str) {
        println!("{} {}", "⚠".yellow(), message);
    }

    /// Prints a section header.
    pub fn header(header: &str) {
        println!("\n{}", header.bold());
    }

    /// Styles a status line the way [`OutputFormatter::render`] prints it.
    pub fn styled(event: &StatusEvent) -> String {
        let line = event.to_string();
        match event {
            StatusEvent::FileMoved { .. } => format!("{} {}", "✓".green(), line),
            StatusEvent::FilePlanned { .. } => format!("{}", format!("[DRY RUN] {}", line).yellow()),
            StatusEvent::FileFailed { .. } | StatusEvent::ValidationFailed { .. } => {
                format!("{} {}", "✗".red(), line)
            }
            StatusEvent::FileSkipped { .. } | StatusEvent::FileExcluded { .. } => {
                format!("{}", line.dimmed())
            }
            StatusEvent::BatchStarted { .. } => format!("{}", line.cyan()),
            StatusEvent::FolderCreated { .. } => format!("{} {}", "+".cyan(), line),
            StatusEvent::BatchCompleted { .. } => format!("\n{}", line.bold()),
        }
    }

    /// Prints a status event. Errors go to stderr.
    pub fn render(event: &StatusEvent) {
        let line = Self::styled(event);
        match event {
            StatusEvent::FileFailed { .. } | StatusEvent::ValidationFailed { .. } => {
                eprintln!("{}", line)
            }
            _ => println!("{}", line),
        }
    }

    /// Creates and returns a progress bar for file operations.
    ///
    /// ```no_run
    /// use downsort::output::OutputFormatter;
    /// let pb = OutputFormatter::create_progress_bar(100);
    /// pb.inc(1);
    /// pb.finish_with_message("Completed!");
    /// ```
    pub fn create_progress_bar(total: u64) -> ProgressBar {
        let pb = ProgressBar::new(total);
        let style = ProgressStyle::default_bar()
            .template("{spinner:.cyan} [{bar:40.cyan/blue}] {pos}/{len} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("█▓░");
        pb.set_style(style);
        pb
    }

    /// Counts files per destination folder, relative to the target root.
    ///
    /// Only moved and planned files are counted.
    pub fn folder_counts(report: &BatchReport) -> BTreeMap<String, usize> {
        let mut counts = BTreeMap::new();
        for outcome in &report.outcomes {
            if !matches!(outcome.status, MoveStatus::Moved | MoveStatus::Planned) {
                continue;
            }
            let Some(destination) = outcome.destination.as_deref() else {
                continue;
            };
            *counts
                .entry(folder_label(&report.target, destination))
                .or_insert(0) += 1;
        }
        counts
    }

    /// Prints a summary table with file counts per destination folder,
    /// followed by the batch totals.
    pub fn summary_table(report: &BatchReport) {
        Self::header(if report.dry_run {
            "DRY RUN SUMMARY"
        } else {
            "SUMMARY"
        });

        let folder_counts = Self::folder_counts(report);
        let max_folder_len = folder_counts
            .keys()
            .map(|name| name.len())
            .max()
            .unwrap_or(0)
            .max(8);

        println!(
            "{:<width$} | {}",
            "Folder".bold(),
            "Files".bold(),
            width = max_folder_len
        );
        println!("{}", "-".repeat(max_folder_len + 10));

        for (folder, count) in &folder_counts {
            println!(
                "{:<width$} | {} {}",
                folder,
                count.to_string().green(),
                plural(*count),
                width = max_folder_len
            );
        }

        println!("{}", "-".repeat(max_folder_len + 10));
        let summary = &report.summary;
        let done = if report.dry_run {
            summary.planned
        } else {
            summary.moved
        };
        println!(
            "{:<width$} | {} {}",
            "Total".bold(),
            done.to_string().green().bold(),
            plural(done),
            width = max_folder_len
        );

        if summary.skipped > 0 {
            println!("Skipped (no keyword match): {}", summary.skipped);
        }
        if summary.failed > 0 {
            Self::warning(&format!(
                "{} {} could not be organized",
                summary.failed,
                plural(summary.failed)
            ));
        }
    }
}

fn plural(count: usize) -> &'static str {
    if count == 1 { "file" } else { "files" }
}

/// Folder of `destination` relative to `target`, `.` for the target itself.
fn folder_label(target: &Path, destination: &Path) -> String {
    let parent = destination.parent().unwrap_or(destination);
    match parent.strip_prefix(target) {
        Ok(relative) if relative.as_os_str().is_empty() => ".".to_string(),
        Ok(relative) => relative.display().to_string(),
        Err(_) => parent.display().to_string(),
    }
}
