//! End-to-end pipeline: probe, scan, merge, and report across all sources.

use std::{
    path::{Path, PathBuf},
    time::Duration,
};

use thiserror::Error;
use tracing::{error, info, warn};

use crate::inventory::{
    ChangeRecord, DB_FILE_NAME, DbError, InventoryDb, SourcesError, read_sources, scanner,
};
use crate::probe;
use crate::report::{self, REPORT_FILE_NAME};

/// Settings for one inventory run.
#[derive(Debug, Clone)]
pub struct RunOptions {
    pub sources_file: PathBuf,
    pub db_path: PathBuf,
    pub report_path: PathBuf,
    pub jobs: usize,
    pub probe_timeout: Duration,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            sources_file: PathBuf::from("sources.txt"),
            db_path: PathBuf::from(DB_FILE_NAME),
            report_path: PathBuf::from(REPORT_FILE_NAME),
            jobs: scanner::default_jobs(),
            probe_timeout: Duration::from_secs(5),
        }
    }
}

/// Counters and results for one completed run.
#[derive(Debug, Default)]
pub struct RunSummary {
    /// Directories scanned and persisted successfully.
    pub scanned: usize,
    /// Directories skipped because their host did not resolve.
    pub skipped: usize,
    /// Directories that failed to scan or persist.
    pub failed: usize,
    /// Artifacts fingerprinted across all directories.
    pub files_hashed: usize,
    /// All changes detected this run, in directory order.
    pub changes: Vec<ChangeRecord>,
    /// Path of the written report, when any changes were detected.
    pub report: Option<PathBuf>,
}

/// Errors that abort a run before any directory is processed.
#[derive(Debug, Error)]
pub enum RunError {
    #[error(transparent)]
    Sources(#[from] SourcesError),
    #[error(transparent)]
    Db(#[from] DbError),
}

/// Receives pipeline progress for interactive feedback.
///
/// The default implementations do nothing, so a sink only overrides what it
/// can display.
pub trait RunProgress {
    fn directory_started(&mut self, _root: &Path) {}
    fn file_progress(&mut self, _done: usize, _total: usize) {}
    fn directory_finished(&mut self, _root: &Path) {}
}

/// Progress sink that discards all events.
pub struct SilentProgress;

impl RunProgress for SilentProgress {}

/// Inventory every listed directory, merging results into the store and
/// writing a change report when anything diverged.
///
/// Failures are isolated per directory: an unreachable host, a failed scan,
/// or a failed merge is logged and counted, and the run moves on. Only a
/// missing sources file or an unopenable database aborts the run.
pub fn run(options: &RunOptions, progress: &mut dyn RunProgress) -> Result<RunSummary, RunError> {
    let directories = read_sources(&options.sources_file)?;
    let db = InventoryDb::open(&options.db_path)?;
    info!(
        sources = directories.len(),
        db = %options.db_path.display(),
        "Starting inventory run"
    );

    let mut summary = RunSummary::default();
    for root in &directories {
        if !probe::probe(root, options.probe_timeout) {
            warn!(dir = %root.display(), "Skipping inaccessible directory");
            summary.skipped += 1;
            continue;
        }

        info!(dir = %root.display(), "Scanning directory");
        progress.directory_started(root);
        let scanned = scanner::scan_with_progress(root, options.jobs, &mut |done, total| {
            progress.file_progress(done, total);
        });
        progress.directory_finished(root);

        let outcome = match scanned {
            Ok(outcome) => outcome,
            Err(err) => {
                error!(dir = %root.display(), error = %err, "Failed to scan directory");
                summary.failed += 1;
                continue;
            }
        };

        log_catalog(&outcome.catalog);
        match db.merge(&outcome.catalog, root) {
            Ok(mut changes) => {
                info!(
                    dir = %root.display(),
                    files = outcome.stats.hashed,
                    dropped = outcome.stats.failed,
                    changes = changes.len(),
                    "Directory merged"
                );
                summary.changes.append(&mut changes);
                summary.files_hashed += outcome.stats.hashed;
                summary.scanned += 1;
            }
            Err(err) => {
                error!(dir = %root.display(), error = %err, "Failed to persist catalog");
                summary.failed += 1;
            }
        }
    }

    if summary.changes.is_empty() {
        info!("No changes detected");
    } else {
        match report::write_report(&summary.changes, &options.report_path) {
            Ok(_) => {
                info!(
                    report = %options.report_path.display(),
                    changes = summary.changes.len(),
                    "Report generated"
                );
                summary.report = Some(options.report_path.clone());
            }
            Err(err) => {
                error!(error = %err, "Failed to write change report");
            }
        }
    }
    Ok(summary)
}

fn log_catalog(catalog: &scanner::Catalog) {
    let mut names: Vec<&String> = catalog.keys().collect();
    names.sort();
    for name in names {
        let record = &catalog[name];
        info!(
            name = %record.name,
            location = %record.location.display(),
            checksum = %record.checksum,
            modified = %record.last_modified,
            "Cataloged artifact"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    fn options_for(base: &Path) -> RunOptions {
        RunOptions {
            sources_file: base.join("sources.txt"),
            db_path: base.join(DB_FILE_NAME),
            report_path: base.join(REPORT_FILE_NAME),
            jobs: 2,
            probe_timeout: Duration::from_millis(500),
        }
    }

    #[test]
    fn first_run_is_a_baseline_and_second_detects_the_change() {
        let base = tempdir().unwrap();
        let apps = base.path().join("apps");
        fs::create_dir_all(&apps).unwrap();
        let installer = apps.join("setup.exe");
        fs::write(&installer, b"one").unwrap();

        let options = options_for(base.path());
        fs::write(&options.sources_file, format!("{}\n", apps.display())).unwrap();

        let first = run(&options, &mut SilentProgress).unwrap();
        assert_eq!(first.scanned, 1);
        assert_eq!(first.files_hashed, 1);
        assert!(first.changes.is_empty());
        assert!(first.report.is_none());
        assert!(!options.report_path.exists());

        fs::write(&installer, b"two").unwrap();
        let second = run(&options, &mut SilentProgress).unwrap();
        assert_eq!(second.changes.len(), 1);
        let change = &second.changes[0];
        assert_eq!(change.name, "setup.exe");
        assert_eq!(change.location, installer);
        assert_ne!(change.old_checksum, change.new_checksum);
        assert_eq!(second.report.as_deref(), Some(options.report_path.as_path()));

        let html = fs::read_to_string(&options.report_path).unwrap();
        assert!(html.contains("setup.exe"));
        assert!(html.contains(&change.old_checksum));
        assert!(html.contains(&change.new_checksum));

        let db = InventoryDb::open(&options.db_path).unwrap();
        let rows = db.list_artifacts(&apps).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].checksum.as_deref(), Some(change.new_checksum.as_str()));
    }

    #[test]
    fn unreachable_directory_is_skipped_while_others_complete() {
        let base = tempdir().unwrap();
        let apps = base.path().join("apps");
        fs::create_dir_all(&apps).unwrap();
        fs::write(apps.join("setup.exe"), b"one").unwrap();

        let options = options_for(base.path());
        fs::write(
            &options.sources_file,
            format!("\\\\host-that-does-not-exist.invalid\\share\n{}\n", apps.display()),
        )
        .unwrap();

        let summary = run(&options, &mut SilentProgress).unwrap();
        assert_eq!(summary.skipped, 1);
        assert_eq!(summary.scanned, 1);
        assert_eq!(summary.files_hashed, 1);
    }

    #[test]
    fn missing_directory_fails_alone_and_the_run_continues() {
        let base = tempdir().unwrap();
        let apps = base.path().join("apps");
        fs::create_dir_all(&apps).unwrap();
        fs::write(apps.join("setup.exe"), b"one").unwrap();

        let options = options_for(base.path());
        fs::write(
            &options.sources_file,
            format!("{}\n{}\n", base.path().join("gone").display(), apps.display()),
        )
        .unwrap();

        let summary = run(&options, &mut SilentProgress).unwrap();
        assert_eq!(summary.failed, 1);
        assert_eq!(summary.scanned, 1);
    }

    #[test]
    fn missing_sources_file_aborts_the_run() {
        let base = tempdir().unwrap();
        let options = options_for(base.path());
        let err = run(&options, &mut SilentProgress).unwrap_err();
        assert!(matches!(err, RunError::Sources(_)));
    }

    #[test]
    fn progress_events_arrive_per_completed_file() {
        struct Recorder {
            started: usize,
            files: Vec<(usize, usize)>,
            finished: usize,
        }
        impl RunProgress for Recorder {
            fn directory_started(&mut self, _root: &Path) {
                self.started += 1;
            }
            fn file_progress(&mut self, done: usize, total: usize) {
                self.files.push((done, total));
            }
            fn directory_finished(&mut self, _root: &Path) {
                self.finished += 1;
            }
        }

        let base = tempdir().unwrap();
        let apps = base.path().join("apps");
        fs::create_dir_all(&apps).unwrap();
        for idx in 0..3 {
            fs::write(apps.join(format!("tool-{idx}.msi")), format!("p{idx}")).unwrap();
        }

        let options = options_for(base.path());
        fs::write(&options.sources_file, format!("{}\n", apps.display())).unwrap();

        let mut recorder = Recorder {
            started: 0,
            files: Vec::new(),
            finished: 0,
        };
        run(&options, &mut recorder).unwrap();

        assert_eq!(recorder.started, 1);
        assert_eq!(recorder.finished, 1);
        assert_eq!(recorder.files.len(), 3);
        assert_eq!(recorder.files.last(), Some(&(3, 3)));
    }
}
