mod scan;
mod scan_fs;
mod scan_hash;
mod scan_pool;

pub use scan::{
    Catalog, ScanError, ScanOutcome, ScanStats, default_jobs, scan_once, scan_with_progress,
};
