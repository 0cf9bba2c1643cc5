use std::{fs, io::Read, path::Path};

use sha2::{Digest, Sha256};

use super::scan::ScanError;

/// Compute the lowercase hex SHA-256 digest of a file.
///
/// Reads in fixed-size chunks so memory stays bounded for arbitrarily large
/// artifacts. Any read failure propagates; a partial digest is never returned.
pub(super) fn compute_checksum(path: &Path) -> Result<String, ScanError> {
    let mut file = fs::File::open(path).map_err(|source| ScanError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let mut hasher = Sha256::new();
    let mut buffer = [0u8; 64 * 1024];
    loop {
        let read = file.read(&mut buffer).map_err(|source| ScanError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        if read == 0 {
            break;
        }
        hasher.update(&buffer[..read]);
    }
    Ok(format!("{:x}", hasher.finalize()))
}
