use std::{
    fs,
    path::{Path, PathBuf},
};

use time::{OffsetDateTime, format_description::well_known::Rfc3339};
use tracing::warn;

use super::scan::ScanError;

/// File extensions that mark a file as an installer artifact.
pub(super) const INSTALLER_EXTENSIONS: [&str; 4] = ["exe", "msi", "dmg", "pkg"];

pub(super) fn ensure_root_dir(root: &Path) -> Result<(), ScanError> {
    if root.is_dir() {
        Ok(())
    } else {
        Err(ScanError::InvalidRoot(root.to_path_buf()))
    }
}

/// Enumerate installer candidates under the root, depth-first.
///
/// Unreadable subdirectories and entries are logged and skipped so one bad
/// subtree only costs its own files; an unreadable root is an error.
pub(super) fn collect_candidates(root: &Path) -> Result<Vec<PathBuf>, ScanError> {
    let mut candidates = Vec::new();
    let mut stack = vec![root.to_path_buf()];
    while let Some(dir) = stack.pop() {
        let entries = match fs::read_dir(&dir) {
            Ok(entries) => entries,
            Err(source) if dir != root => {
                warn!(
                    dir = %dir.display(),
                    error = %source,
                    "Failed to read directory during scan"
                );
                continue;
            }
            Err(source) => {
                return Err(ScanError::Io {
                    path: dir.clone(),
                    source,
                });
            }
        };
        for entry_result in entries {
            let entry = match entry_result {
                Ok(entry) => entry,
                Err(err) => {
                    warn!(
                        dir = %dir.display(),
                        error = %err,
                        "Failed to read directory entry during scan"
                    );
                    continue;
                }
            };

            let path = entry.path();
            let file_type = match entry.file_type() {
                Ok(file_type) => file_type,
                Err(err) => {
                    warn!(
                        path = %path.display(),
                        error = %err,
                        "Failed to read file type during scan"
                    );
                    continue;
                }
            };
            if file_type.is_symlink() {
                continue;
            }
            if file_type.is_dir() {
                stack.push(path);
                continue;
            }
            if file_type.is_file() && is_installer(&path) {
                candidates.push(path);
            }
        }
    }
    Ok(candidates)
}

pub(super) fn is_installer(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| {
            INSTALLER_EXTENSIONS
                .iter()
                .any(|known| ext.eq_ignore_ascii_case(known))
        })
}

/// RFC 3339 rendering of the file's modification time, captured at scan time.
pub(super) fn modified_timestamp(path: &Path) -> Result<String, ScanError> {
    let meta = path.metadata().map_err(|source| ScanError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let modified = meta.modified().map_err(|source| ScanError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    OffsetDateTime::from(modified)
        .format(&Rfc3339)
        .map_err(|_| ScanError::Time {
            path: path.to_path_buf(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn installer_extensions_match_case_insensitively() {
        assert!(is_installer(Path::new("setup.exe")));
        assert!(is_installer(Path::new("Setup.EXE")));
        assert!(is_installer(Path::new("tool.msi")));
        assert!(is_installer(Path::new("bundle.dmg")));
        assert!(is_installer(Path::new("app.pkg")));
        assert!(!is_installer(Path::new("readme.txt")));
        assert!(!is_installer(Path::new("exe")));
        assert!(!is_installer(Path::new("archive.exe.bak")));
    }

    #[test]
    fn modified_timestamp_is_rfc3339() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("setup.exe");
        fs::write(&file, b"payload").unwrap();

        let stamp = modified_timestamp(&file).unwrap();
        assert!(OffsetDateTime::parse(&stamp, &Rfc3339).is_ok());
    }

    #[test]
    fn missing_file_yields_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = modified_timestamp(&dir.path().join("gone.exe")).unwrap_err();
        assert!(matches!(err, ScanError::Io { .. }));
    }
}
