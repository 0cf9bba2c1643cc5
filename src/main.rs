#![deny(missing_docs)]
#![deny(warnings)]

//! Entry point for the stocktake CLI.

use std::{
    error::Error,
    path::{Path, PathBuf},
    time::Duration,
};

use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use stocktake::inventory::{DB_FILE_NAME, scanner};
use stocktake::logging;
use stocktake::report::REPORT_FILE_NAME;
use stocktake::run::{self, RunOptions, RunProgress};

/// Inventory installer artifacts across directories and report checksum
/// changes between scans.
#[derive(Parser)]
#[command(name = "stocktake", version, about)]
struct Cli {
    /// Newline-delimited list of directories to scan.
    #[arg(short, long, default_value = "sources.txt")]
    sources: PathBuf,

    /// SQLite file holding fingerprint history.
    #[arg(long, default_value = DB_FILE_NAME)]
    db: PathBuf,

    /// HTML report written when changes are detected.
    #[arg(long, default_value = REPORT_FILE_NAME)]
    report: PathBuf,

    /// Hash worker count; defaults to available parallelism.
    #[arg(short, long)]
    jobs: Option<usize>,

    /// Seconds to wait for a remote host to resolve.
    #[arg(long, default_value_t = 5)]
    probe_timeout: u64,
}

fn main() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();
    if let Err(err) = logging::init() {
        eprintln!("Logging disabled: {err}");
    }

    let options = RunOptions {
        sources_file: cli.sources,
        db_path: cli.db,
        report_path: cli.report,
        jobs: cli.jobs.unwrap_or_else(scanner::default_jobs),
        probe_timeout: Duration::from_secs(cli.probe_timeout),
    };

    let mut progress = CliProgress::default();
    let summary = run::run(&options, &mut progress)?;
    tracing::info!(
        scanned = summary.scanned,
        skipped = summary.skipped,
        failed = summary.failed,
        files = summary.files_hashed,
        changes = summary.changes.len(),
        "Run complete"
    );
    Ok(())
}

/// Progress sink that renders one bar per scanned directory.
#[derive(Default)]
struct CliProgress {
    bar: Option<ProgressBar>,
}

impl RunProgress for CliProgress {
    fn directory_started(&mut self, root: &Path) {
        let bar = ProgressBar::no_length().with_message(root.display().to_string());
        if let Ok(style) = ProgressStyle::with_template("{msg} [{bar:30}] {pos}/{len}") {
            bar.set_style(style.progress_chars("=> "));
        }
        self.bar = Some(bar);
    }

    fn file_progress(&mut self, done: usize, total: usize) {
        if let Some(bar) = &self.bar {
            if bar.length().is_none() {
                bar.set_length(total as u64);
            }
            bar.set_position(done as u64);
        }
    }

    fn directory_finished(&mut self, _root: &Path) {
        if let Some(bar) = self.bar.take() {
            bar.finish_and_clear();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_defaults_match_the_documented_interface() {
        let cli = Cli::parse_from(["stocktake"]);
        assert_eq!(cli.sources, PathBuf::from("sources.txt"));
        assert_eq!(cli.db, PathBuf::from(DB_FILE_NAME));
        assert_eq!(cli.report, PathBuf::from(REPORT_FILE_NAME));
        assert_eq!(cli.probe_timeout, 5);
        assert!(cli.jobs.is_none());
    }

    #[test]
    fn progress_bar_lifecycle_is_safe_without_a_terminal() {
        let mut progress = CliProgress::default();
        progress.directory_started(Path::new("/apps"));
        progress.file_progress(1, 3);
        progress.file_progress(3, 3);
        progress.directory_finished(Path::new("/apps"));
        assert!(progress.bar.is_none());
    }
}
