use std::{
    collections::HashMap,
    path::{Path, PathBuf},
    thread,
};

use thiserror::Error;
use tracing::warn;

use crate::inventory::ArtifactRecord;

use super::scan_fs::{collect_candidates, ensure_root_dir};
use super::scan_pool::hash_candidates;

/// In-memory result of one directory scan, keyed by artifact basename.
pub type Catalog = HashMap<String, ArtifactRecord>;

/// Summary of a scan run.
#[derive(Debug, Default, Clone)]
pub struct ScanStats {
    pub candidates: usize,
    pub hashed: usize,
    pub failed: usize,
}

/// Catalog plus counters for one scanned root.
#[derive(Debug, Default)]
pub struct ScanOutcome {
    pub catalog: Catalog,
    pub stats: ScanStats,
}

/// Errors that can occur while scanning a directory root.
#[derive(Debug, Error)]
pub enum ScanError {
    #[error("Scan root is not a directory: {0}")]
    InvalidRoot(PathBuf),
    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Time conversion failed for {path}")]
    Time { path: PathBuf },
}

/// Number of hash workers to use when the caller does not specify one.
pub fn default_jobs() -> usize {
    thread::available_parallelism()
        .map(std::num::NonZeroUsize::get)
        .unwrap_or(1)
}

/// Recursively scan a root directory, fingerprinting installer artifacts.
pub fn scan_once(root: &Path, jobs: usize) -> Result<ScanOutcome, ScanError> {
    scan(root, jobs, None)
}

/// Scan with a per-completed-unit progress callback `(done, total)`.
pub fn scan_with_progress(
    root: &Path,
    jobs: usize,
    on_progress: &mut impl FnMut(usize, usize),
) -> Result<ScanOutcome, ScanError> {
    scan(root, jobs, Some(on_progress))
}

fn scan(
    root: &Path,
    jobs: usize,
    mut on_progress: Option<&mut dyn FnMut(usize, usize)>,
) -> Result<ScanOutcome, ScanError> {
    ensure_root_dir(root)?;
    let candidates = collect_candidates(root)?;
    let total = candidates.len();
    let mut outcome = ScanOutcome {
        stats: ScanStats {
            candidates: total,
            ..ScanStats::default()
        },
        ..ScanOutcome::default()
    };
    let mut done = 0usize;
    hash_candidates(candidates, jobs.max(1), &mut |path, unit| {
        done += 1;
        match unit {
            Ok(record) => {
                outcome.stats.hashed += 1;
                // Basename collisions resolve last-completed-wins; completion
                // order is not deterministic when hashing runs in parallel.
                outcome.catalog.insert(record.name.clone(), record);
            }
            Err(error) => {
                outcome.stats.failed += 1;
                warn!(
                    path = %path.display(),
                    error = %error,
                    "Dropping artifact; checksum failed"
                );
            }
        }
        if let Some(on_progress) = on_progress.as_mut() {
            on_progress(done, total);
        }
    });
    Ok(outcome)
}
