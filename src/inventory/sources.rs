//! Reading the newline-delimited list of directories to inventory.

use std::{
    fs,
    path::{Path, PathBuf},
};

use thiserror::Error;

/// Errors returned while reading the sources list.
#[derive(Debug, Error)]
pub enum SourcesError {
    #[error("Failed to read sources file {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Read the ordered list of directories to scan from a text file.
///
/// One path per line; surrounding whitespace is trimmed and blank lines are
/// ignored.
pub fn read_sources(path: &Path) -> Result<Vec<PathBuf>, SourcesError> {
    let text = fs::read_to_string(path).map_err(|source| SourcesError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(text
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(PathBuf::from)
        .collect())
}
