use std::{
    path::{Path, PathBuf},
    thread,
};

use crossbeam_channel::{bounded, unbounded};

use crate::inventory::ArtifactRecord;

use super::scan::ScanError;
use super::scan_fs::modified_timestamp;
use super::scan_hash::compute_checksum;

/// Cap on queued work items; keeps memory bounded while workers drain.
const WORK_QUEUE_CAP: usize = 1024;

/// Fan candidate files out across a bounded worker pool.
///
/// Each worker computes checksum and modification time for one candidate at a
/// time and emits a self-contained result; `on_unit` runs on the calling
/// thread only, so the caller folds results without any locking. Units are
/// delivered in completion order, which is not deterministic when more than
/// one worker runs.
pub(super) fn hash_candidates(
    candidates: Vec<PathBuf>,
    workers: usize,
    on_unit: &mut impl FnMut(PathBuf, Result<ArtifactRecord, ScanError>),
) {
    if candidates.is_empty() {
        return;
    }
    let workers = workers.clamp(1, candidates.len());
    let (work_tx, work_rx) = bounded::<PathBuf>(WORK_QUEUE_CAP);
    let (result_tx, result_rx) = unbounded();

    thread::scope(|scope| {
        for _ in 0..workers {
            let work_rx = work_rx.clone();
            let result_tx = result_tx.clone();
            scope.spawn(move || {
                for path in work_rx.iter() {
                    let outcome = process_candidate(&path);
                    if result_tx.send((path, outcome)).is_err() {
                        return;
                    }
                }
            });
        }
        drop(work_rx);
        drop(result_tx);

        scope.spawn(move || {
            for path in candidates {
                if work_tx.send(path).is_err() {
                    return;
                }
            }
        });

        for (path, outcome) in result_rx.iter() {
            on_unit(path, outcome);
        }
    });
}

fn process_candidate(path: &Path) -> Result<ArtifactRecord, ScanError> {
    let last_modified = modified_timestamp(path)?;
    let checksum = compute_checksum(path)?;
    Ok(ArtifactRecord {
        name: artifact_name(path),
        location: path.to_path_buf(),
        checksum,
        last_modified,
    })
}

fn artifact_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.to_string_lossy().into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn every_candidate_is_reported_exactly_once() {
        let dir = tempdir().unwrap();
        let mut candidates = Vec::new();
        for idx in 0..20 {
            let path = dir.path().join(format!("tool-{idx}.exe"));
            fs::write(&path, format!("payload-{idx}")).unwrap();
            candidates.push(path);
        }

        let mut seen = Vec::new();
        hash_candidates(candidates.clone(), 4, &mut |path, outcome| {
            assert!(outcome.is_ok());
            seen.push(path);
        });

        seen.sort();
        candidates.sort();
        assert_eq!(seen, candidates);
    }

    #[test]
    fn failed_units_are_reported_without_stalling_the_pool() {
        let dir = tempdir().unwrap();
        let good = dir.path().join("good.exe");
        fs::write(&good, b"good").unwrap();
        let missing = dir.path().join("missing.exe");

        let mut ok = 0;
        let mut failed = 0;
        hash_candidates(vec![good, missing], 2, &mut |_path, outcome| {
            match outcome {
                Ok(_) => ok += 1,
                Err(_) => failed += 1,
            }
        });

        assert_eq!(ok, 1);
        assert_eq!(failed, 1);
    }

    #[test]
    fn single_worker_preserves_submission_order() {
        let dir = tempdir().unwrap();
        let mut candidates = Vec::new();
        for idx in 0..5 {
            let path = dir.path().join(format!("tool-{idx}.msi"));
            fs::write(&path, format!("payload-{idx}")).unwrap();
            candidates.push(path);
        }

        let mut seen = Vec::new();
        hash_candidates(candidates.clone(), 1, &mut |path, _outcome| {
            seen.push(path);
        });

        assert_eq!(seen, candidates);
    }

    #[test]
    fn empty_candidate_list_is_a_no_op() {
        let mut calls = 0;
        hash_candidates(Vec::new(), 4, &mut |_path, _outcome| {
            calls += 1;
        });
        assert_eq!(calls, 0);
    }
}
