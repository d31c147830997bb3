use clap::Parser;
use downsort::cli::{Args, run_cli};
/// Integration tests for downsort
///
/// These tests run complete batches against temporary source and target
/// directories, through the library entry points and the CLI layer.
///
/// Test categories:
/// 1. Category mode
/// 2. Keyword mode
/// 3. Validation and batch-fatal errors
/// 4. Conflicts and per-file failures
/// 5. Dry run, configuration and reports
use downsort::{
    BatchState, CategoryTable, ConflictPolicy, MoveStatus, OrganizeError, OrganizeOptions,
    Organizer, StatusEvent, organize_by_category, organize_by_keywords,
};
use std::collections::BTreeSet;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

// ============================================================================
// Test Utilities
// ============================================================================

/// A temporary workspace with a `source` and a `target` directory path.
///
/// The source directory is created up front, the target is left for the
/// organizer to create.
struct TestFixture {
    temp_dir: TempDir,
}

impl TestFixture {
    fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        fs::create_dir(temp_dir.path().join("source")).expect("Failed to create source");
        TestFixture { temp_dir }
    }

    fn source(&self) -> PathBuf {
        self.temp_dir.path().join("source")
    }

    fn target(&self) -> PathBuf {
        self.temp_dir.path().join("target")
    }

    fn source_str(&self) -> String {
        self.source().to_string_lossy().into_owned()
    }

    fn target_str(&self) -> String {
        self.target().to_string_lossy().into_owned()
    }

    /// Create a file with content in the source directory.
    fn create_file(&self, name: &str, content: &str) {
        let mut file = File::create(self.source().join(name)).expect("Failed to create file");
        file.write_all(content.as_bytes())
            .expect("Failed to write file content");
    }

    fn create_files(&self, names: &[&str]) {
        for name in names {
            self.create_file(name, name);
        }
    }

    fn create_source_subdir(&self, name: &str) {
        fs::create_dir(self.source().join(name)).expect("Failed to create subdirectory");
    }

    fn assert_in_target(&self, rel_path: &str) {
        let path = self.target().join(rel_path);
        assert!(path.is_file(), "File should exist: {}", path.display());
    }

    fn assert_not_in_target(&self, rel_path: &str) {
        let path = self.target().join(rel_path);
        assert!(!path.exists(), "Should not exist: {}", path.display());
    }

    fn assert_in_source(&self, name: &str) {
        let path = self.source().join(name);
        assert!(path.is_file(), "File should remain: {}", path.display());
    }

    fn assert_not_in_source(&self, name: &str) {
        let path = self.source().join(name);
        assert!(!path.exists(), "File should be gone: {}", path.display());
    }

    /// Files below the target directory, relative to it.
    fn target_files(&self) -> BTreeSet<String> {
        let mut files = BTreeSet::new();
        Self::walk_dir(&self.target(), &self.target(), &mut files);
        files
    }

    fn walk_dir(root: &Path, dir: &Path, files: &mut BTreeSet<String>) {
        if let Ok(entries) = fs::read_dir(dir) {
            for entry in entries.flatten() {
                let path = entry.path();
                if path.is_file() {
                    let relative = path.strip_prefix(root).unwrap();
                    files.insert(relative.to_string_lossy().replace('\\', "/"));
                } else if path.is_dir() {
                    Self::walk_dir(root, &path, files);
                }
            }
        }
    }

    fn run_cli(&self, extra: &[&str]) -> Result<downsort::BatchReport, String> {
        let source = self.source_str();
        let target = self.target_str();
        let mut argv = vec!["downsort", source.as_str(), target.as_str(), "--quiet"];
        argv.extend_from_slice(extra);
        run_cli(&Args::parse_from(argv))
    }
}

fn set(items: &[&str]) -> BTreeSet<String> {
    items.iter().map(|s| s.to_string()).collect()
}

// ============================================================================
// Test Suite 1: Category Mode
// ============================================================================

#[test]
fn test_category_sample_scenario() {
    let fixture = TestFixture::new();
    fixture.create_files(&["report.pdf", "photo.png", "notes"]);

    let report = organize_by_category(&fixture.source_str(), &fixture.target_str()).unwrap();

    assert_eq!(
        fixture.target_files(),
        set(&["Documents/report.pdf", "Images/photo.png", "Others/notes"])
    );
    fixture.assert_not_in_source("report.pdf");
    fixture.assert_not_in_source("photo.png");
    fixture.assert_not_in_source("notes");
    assert_eq!(report.summary.moved, 3);
    assert_eq!(report.summary.failed, 0);
    assert_eq!(report.mode, "category");
}

#[test]
fn test_category_every_standard_category() {
    let fixture = TestFixture::new();
    fixture.create_files(&[
        "a.JPEG", "b.mov", "c.xlsx", "d.wav", "e.7z", "f.msi", "g.xyz", ".hidden",
    ]);

    let report = organize_by_category(&fixture.source_str(), &fixture.target_str()).unwrap();

    assert_eq!(
        fixture.target_files(),
        set(&[
            "Images/a.JPEG",
            "Videos/b.mov",
            "Documents/c.xlsx",
            "Audio/d.wav",
            "Archives/e.7z",
            "Programs/f.msi",
            "Others/g.xyz",
            "Others/.hidden",
        ])
    );
    assert_eq!(report.summary.moved, 8);
}

#[test]
fn test_category_skips_subdirectories() {
    let fixture = TestFixture::new();
    fixture.create_file("clip.mp4", "video");
    fixture.create_source_subdir("nested");
    fs::write(fixture.source().join("nested").join("inner.txt"), "inner").unwrap();

    let report = organize_by_category(&fixture.source_str(), &fixture.target_str()).unwrap();

    assert_eq!(report.summary.considered, 1);
    fixture.assert_in_target("Videos/clip.mp4");
    assert!(fixture.source().join("nested").join("inner.txt").is_file());
    fixture.assert_not_in_target("nested");
}

#[test]
fn test_category_second_run_moves_nothing() {
    let fixture = TestFixture::new();
    fixture.create_files(&["a.txt", "b.zip"]);

    let first = organize_by_category(&fixture.source_str(), &fixture.target_str()).unwrap();
    assert_eq!(first.summary.moved, 2);

    let second = organize_by_category(&fixture.source_str(), &fixture.target_str()).unwrap();
    assert_eq!(second.summary.moved, 0);
    assert_eq!(second.summary.considered, 0);
    assert!(second.outcomes.is_empty());
}

#[test]
fn test_category_creates_nested_target() {
    let fixture = TestFixture::new();
    fixture.create_file("song.mp3", "la");
    let target = fixture.target().join("deep").join("er");

    organize_by_category(&fixture.source_str(), &target.to_string_lossy()).unwrap();

    assert!(target.join("Audio").join("song.mp3").is_file());
}

#[test]
fn test_category_many_files() {
    let fixture = TestFixture::new();
    for i in 0..40 {
        let ext = ["png", "txt", "mp3", "zip", "bin"][i % 5];
        fixture.create_file(&format!("file_{}.{}", i, ext), "x");
    }

    let report = organize_by_category(&fixture.source_str(), &fixture.target_str()).unwrap();

    assert_eq!(report.summary.moved, 40);
    assert_eq!(fixture.target_files().len(), 40);
    assert_eq!(fs::read_dir(fixture.source()).unwrap().count(), 0);
}

// ============================================================================
// Test Suite 2: Keyword Mode
// ============================================================================

#[test]
fn test_keywords_flat_sample_scenario() {
    let fixture = TestFixture::new();
    fixture.create_files(&["invoice_jan.txt", "invoice_feb.txt", "memo.txt"]);

    let report = organize_by_keywords(
        &fixture.source_str(),
        &fixture.target_str(),
        "invoice",
        false,
    )
    .unwrap();

    assert_eq!(
        fixture.target_files(),
        set(&["invoice_jan.txt", "invoice_feb.txt"])
    );
    fixture.assert_in_source("memo.txt");
    assert_eq!(report.summary.moved, 2);
    assert_eq!(report.summary.skipped, 1);
    assert_eq!(report.mode, "keywords");

    let skipped: Vec<_> = report
        .outcomes
        .iter()
        .filter(|o| o.status == MoveStatus::SkippedNoMatch)
        .collect();
    assert_eq!(skipped.len(), 1);
    assert!(skipped[0].source.ends_with("memo.txt"));
    assert!(skipped[0].destination.is_none());
}

#[test]
fn test_keywords_separate_folders_sample_scenario() {
    let fixture = TestFixture::new();
    fixture.create_files(&["invoice_jan.txt", "invoice_feb.txt", "memo.txt"]);

    let report = organize_by_keywords(
        &fixture.source_str(),
        &fixture.target_str(),
        "invoice,memo",
        true,
    )
    .unwrap();

    assert_eq!(
        fixture.target_files(),
        set(&[
            "invoice/invoice_jan.txt",
            "invoice/invoice_feb.txt",
            "memo/memo.txt"
        ])
    );
    assert_eq!(report.summary.moved, 3);
}

#[test]
fn test_keywords_first_keyword_in_input_order_wins() {
    let fixture = TestFixture::new();
    fixture.create_file("memo_for_invoice.txt", "both");

    organize_by_keywords(
        &fixture.source_str(),
        &fixture.target_str(),
        "invoice, memo",
        true,
    )
    .unwrap();

    assert_eq!(
        fixture.target_files(),
        set(&["invoice/memo_for_invoice.txt"])
    );
    fixture.assert_not_in_target("memo");
}

#[test]
fn test_keywords_match_case_insensitively_on_full_name() {
    let fixture = TestFixture::new();
    fixture.create_files(&["Scan.PDF", "photo.png"]);

    organize_by_keywords(&fixture.source_str(), &fixture.target_str(), "pdf", false).unwrap();

    fixture.assert_in_target("Scan.PDF");
    fixture.assert_in_source("photo.png");
}

#[test]
fn test_keywords_no_match_moves_nothing() {
    let fixture = TestFixture::new();
    fixture.create_files(&["a.txt", "b.txt"]);

    let report =
        organize_by_keywords(&fixture.source_str(), &fixture.target_str(), "zzz", true).unwrap();

    assert_eq!(report.summary.moved, 0);
    assert_eq!(report.summary.skipped, 2);
    fixture.assert_in_source("a.txt");
    fixture.assert_in_source("b.txt");
    assert!(fixture.target_files().is_empty());
}

// ============================================================================
// Test Suite 3: Validation and Batch-Fatal Errors
// ============================================================================

#[test]
fn test_empty_keyword_string_is_validation_error() {
    let fixture = TestFixture::new();
    fixture.create_files(&["invoice.txt", "photo.png"]);

    let result = organize_by_keywords(&fixture.source_str(), &fixture.target_str(), "", false);

    let err = result.unwrap_err();
    assert!(matches!(err, OrganizeError::NoKeywords));
    assert!(err.is_validation());
    fixture.assert_in_source("invoice.txt");
    fixture.assert_in_source("photo.png");
    assert!(!fixture.target().exists());
}

#[test]
fn test_missing_paths_are_validation_errors() {
    let fixture = TestFixture::new();

    let err = organize_by_category("", &fixture.target_str()).unwrap_err();
    assert!(err.is_validation());

    let err = organize_by_keywords(&fixture.source_str(), "   ", "a", false).unwrap_err();
    assert!(err.is_validation());
    assert!(!fixture.target().exists());
}

#[test]
fn test_source_missing() {
    let fixture = TestFixture::new();
    let missing = fixture.source().join("gone");

    let err = organize_by_category(&missing.to_string_lossy(), &fixture.target_str()).unwrap_err();

    assert!(matches!(err, OrganizeError::SourceMissing { .. }));
    assert!(err.is_batch_fatal());
    assert!(!fixture.target().exists());
}

#[test]
fn test_source_is_a_file() {
    let fixture = TestFixture::new();
    fixture.create_file("plain.txt", "x");
    let file = fixture.source().join("plain.txt");

    let err = organize_by_category(&file.to_string_lossy(), &fixture.target_str()).unwrap_err();

    assert!(matches!(err, OrganizeError::SourceMissing { .. }));
}

#[test]
fn test_validation_failure_emits_one_status_line() {
    let fixture = TestFixture::new();
    let mut organizer = Organizer::new(CategoryTable::standard());
    let mut lines = Vec::new();

    let result = organizer.organize_by_keywords(
        &fixture.source_str(),
        &fixture.target_str(),
        ",,",
        true,
        |event| lines.push(event.to_string()),
    );

    assert!(result.is_err());
    assert_eq!(lines, vec!["Error: No keywords provided".to_string()]);
    assert_eq!(organizer.state(), BatchState::Idle);
}

// ============================================================================
// Test Suite 4: Conflicts and Per-File Failures
// ============================================================================

#[test]
fn test_conflict_fail_keeps_both_files_and_continues() {
    let fixture = TestFixture::new();
    fixture.create_file("report.pdf", "new");
    fixture.create_file("photo.png", "img");
    fs::create_dir_all(fixture.target().join("Documents")).unwrap();
    fs::write(fixture.target().join("Documents").join("report.pdf"), "old").unwrap();

    let report = organize_by_category(&fixture.source_str(), &fixture.target_str()).unwrap();

    assert_eq!(report.summary.failed, 1);
    assert_eq!(report.summary.moved, 1);
    fixture.assert_in_source("report.pdf");
    fixture.assert_in_target("Images/photo.png");
    assert_eq!(
        fs::read_to_string(fixture.target().join("Documents").join("report.pdf")).unwrap(),
        "old"
    );

    let failed = report
        .outcomes
        .iter()
        .find(|o| o.status == MoveStatus::Failed)
        .unwrap();
    assert!(failed.error.as_deref().unwrap().contains("already exists"));
    assert!(report.log.iter().any(|l| l.starts_with("Failed:")));
}

#[test]
fn test_conflict_rename() {
    let fixture = TestFixture::new();
    fixture.create_file("report.pdf", "new");
    fs::create_dir_all(fixture.target().join("Documents")).unwrap();
    fs::write(fixture.target().join("Documents").join("report.pdf"), "old").unwrap();

    let report = Organizer::new(CategoryTable::standard())
        .with_options(OrganizeOptions {
            on_conflict: ConflictPolicy::Rename,
            dry_run: false,
        })
        .organize_by_category(&fixture.source_str(), &fixture.target_str(), |_| {})
        .unwrap();

    assert_eq!(report.summary.moved, 1);
    assert_eq!(
        fs::read_to_string(fixture.target().join("Documents").join("report (1).pdf")).unwrap(),
        "new"
    );
    assert_eq!(
        fs::read_to_string(fixture.target().join("Documents").join("report.pdf")).unwrap(),
        "old"
    );
}

#[test]
fn test_conflict_overwrite() {
    let fixture = TestFixture::new();
    fixture.create_file("invoice.txt", "new");
    fs::create_dir_all(fixture.target()).unwrap();
    fs::write(fixture.target().join("invoice.txt"), "old").unwrap();

    let report = Organizer::new(CategoryTable::standard())
        .with_options(OrganizeOptions {
            on_conflict: ConflictPolicy::Overwrite,
            dry_run: false,
        })
        .organize_by_keywords(
            &fixture.source_str(),
            &fixture.target_str(),
            "invoice",
            false,
            |_| {},
        )
        .unwrap();

    assert_eq!(report.summary.moved, 1);
    assert_eq!(
        fs::read_to_string(fixture.target().join("invoice.txt")).unwrap(),
        "new"
    );
    fixture.assert_not_in_source("invoice.txt");
}

#[test]
fn test_category_folder_blocked_by_file_fails_per_file() {
    let fixture = TestFixture::new();
    fixture.create_files(&["photo.png", "report.pdf"]);
    fs::create_dir_all(fixture.target()).unwrap();
    // a plain file where the Images folder should be
    fs::write(fixture.target().join("Images"), "not a dir").unwrap();

    let report = organize_by_category(&fixture.source_str(), &fixture.target_str()).unwrap();

    assert_eq!(report.summary.failed, 1);
    assert_eq!(report.summary.moved, 1);
    fixture.assert_in_source("photo.png");
    fixture.assert_in_target("Documents/report.pdf");
}

// ============================================================================
// Test Suite 5: Dry Run, Configuration and Reports
// ============================================================================

#[test]
fn test_dry_run_touches_nothing() {
    let fixture = TestFixture::new();
    fixture.create_files(&["photo.png", "report.pdf"]);

    let report = fixture.run_cli(&["--dry-run"]).unwrap();

    assert_eq!(report.summary.planned, 2);
    assert_eq!(report.summary.moved, 0);
    fixture.assert_in_source("photo.png");
    fixture.assert_in_source("report.pdf");
    assert!(!fixture.target().exists());
    assert!(
        report
            .outcomes
            .iter()
            .all(|o| o.status == MoveStatus::Planned && o.destination.is_some())
    );
}

#[test]
fn test_cli_keyword_mode() {
    let fixture = TestFixture::new();
    fixture.create_files(&["invoice_jan.txt", "memo.txt"]);

    let report = fixture.run_cli(&["-k", "invoice,memo", "-s"]).unwrap();

    assert_eq!(report.summary.moved, 2);
    assert_eq!(
        fixture.target_files(),
        set(&["invoice/invoice_jan.txt", "memo/memo.txt"])
    );
}

#[test]
fn test_cli_empty_keywords_is_error() {
    let fixture = TestFixture::new();
    fixture.create_file("invoice.txt", "x");

    let result = fixture.run_cli(&["--keywords", ""]);

    assert!(result.is_err());
    fixture.assert_in_source("invoice.txt");
}

#[test]
fn test_cli_config_filters_and_categories() {
    let fixture = TestFixture::new();
    fixture.create_files(&["photo.webp", "movie.mkv.part", ".DS_Store", "notes.txt"]);
    let config_path = fixture.temp_dir.path().join("downsort.toml");
    fs::write(
        &config_path,
        r#"
[filters]
enable_hidden_files = false

[filters.exclude]
patterns = ["*.part"]

[categories]
Images = [".webp"]
"#,
    )
    .unwrap();

    let report = fixture
        .run_cli(&["--config", &config_path.to_string_lossy()])
        .unwrap();

    assert_eq!(report.summary.considered, 2);
    assert_eq!(
        fixture.target_files(),
        set(&["Images/photo.webp", "Documents/notes.txt"])
    );
    fixture.assert_in_source("movie.mkv.part");
    fixture.assert_in_source(".DS_Store");
}

#[test]
fn test_cli_config_conflict_policy() {
    let fixture = TestFixture::new();
    fixture.create_file("notes.txt", "new");
    fs::create_dir_all(fixture.target().join("Documents")).unwrap();
    fs::write(fixture.target().join("Documents").join("notes.txt"), "old").unwrap();
    let config_path = fixture.temp_dir.path().join("downsort.toml");
    fs::write(&config_path, "[organize]\non_conflict = \"rename\"\n").unwrap();

    let report = fixture
        .run_cli(&["-c", &config_path.to_string_lossy()])
        .unwrap();

    assert_eq!(report.summary.moved, 1);
    fixture.assert_in_target("Documents/notes (1).txt");
}

#[test]
fn test_cli_invalid_config_is_error() {
    let fixture = TestFixture::new();
    fixture.create_file("notes.txt", "x");
    let config_path = fixture.temp_dir.path().join("bad.toml");
    fs::write(&config_path, "[categories]\nPrograms = [\".txt\"]\n").unwrap();

    let result = fixture.run_cli(&["-c", &config_path.to_string_lossy()]);

    assert!(result.unwrap_err().contains("categories"));
    fixture.assert_in_source("notes.txt");
}

#[test]
fn test_status_events_follow_batch_order() {
    let fixture = TestFixture::new();
    fixture.create_files(&["b.png", "a.txt"]);
    let mut events = Vec::new();

    Organizer::new(CategoryTable::standard())
        .organize_by_category(&fixture.source_str(), &fixture.target_str(), |event| {
            events.push(event.clone())
        })
        .unwrap();

    let started = events
        .iter()
        .position(|e| matches!(e, StatusEvent::BatchStarted { files: 2, .. }))
        .unwrap();
    let moved: Vec<_> = events
        .iter()
        .enumerate()
        .filter(|(_, e)| matches!(e, StatusEvent::FileMoved { .. }))
        .map(|(i, _)| i)
        .collect();
    assert_eq!(moved.len(), 2);
    assert!(moved.iter().all(|i| *i > started));
    assert!(matches!(
        events.last(),
        Some(StatusEvent::BatchCompleted { .. })
    ));
    assert_eq!(
        events
            .iter()
            .filter(|e| matches!(e, StatusEvent::FolderCreated { .. }))
            .count(),
        3
    );
}

#[test]
fn test_report_serializes_to_json() {
    let fixture = TestFixture::new();
    fixture.create_files(&["invoice.txt", "memo.txt"]);

    let report =
        organize_by_keywords(&fixture.source_str(), &fixture.target_str(), "invoice", false)
            .unwrap();
    let json: serde_json::Value = serde_json::to_value(&report).unwrap();

    assert_eq!(json["mode"], "keywords");
    assert_eq!(json["summary"]["moved"], 1);
    assert_eq!(json["summary"]["skipped"], 1);
    let statuses: BTreeSet<_> = json["outcomes"]
        .as_array()
        .unwrap()
        .iter()
        .map(|o| o["status"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(statuses, set(&["moved", "skipped-no-match"]));
}
