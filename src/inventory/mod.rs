//! Software inventory: artifact records, scanning, and fingerprint history.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

pub mod db;
pub mod scanner;
pub mod sources;

pub use db::{DB_FILE_NAME, DbError, InventoryDb, StoredArtifact};
pub use scanner::{Catalog, ScanError, ScanOutcome, ScanStats};
pub use sources::{SourcesError, read_sources};

/// One discovered installer file with a successfully computed fingerprint.
///
/// Records are only constructed when hashing succeeded; a candidate whose
/// checksum could not be computed is dropped, never stored.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArtifactRecord {
    pub name: String,
    pub location: PathBuf,
    pub checksum: String,
    pub last_modified: String,
}

/// A detected divergence between a fresh fingerprint and the stored one for
/// the same `(name, location)` identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeRecord {
    pub name: String,
    pub location: PathBuf,
    pub old_checksum: String,
    pub new_checksum: String,
}
