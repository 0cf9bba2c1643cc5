//! HTML rendering of detected fingerprint changes.

use std::{
    fs,
    path::{Path, PathBuf},
};

use thiserror::Error;

use crate::inventory::ChangeRecord;

/// Default filename for the change report.
pub const REPORT_FILE_NAME: &str = "report.html";

/// Errors returned while writing the change report.
#[derive(Debug, Error)]
pub enum ReportError {
    #[error("Failed to write report {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Render the change list into a self-contained HTML document.
///
/// Output is a pure function of the input list: one list item per change, in
/// input order, carrying the artifact name, its location, and the old and new
/// checksums.
pub fn render(changes: &[ChangeRecord]) -> String {
    let mut html = String::from("<html><body><h1>Software Changes Report</h1><ul>");
    for change in changes {
        html.push_str("<li>");
        html.push_str(&escape_html(&change.name));
        html.push_str(" at ");
        html.push_str(&escape_html(&change.location.to_string_lossy()));
        html.push_str(": Checksum changed from ");
        html.push_str(&escape_html(&change.old_checksum));
        html.push_str(" to ");
        html.push_str(&escape_html(&change.new_checksum));
        html.push_str("</li>");
    }
    html.push_str("</ul></body></html>");
    html
}

/// Write the report file, but only when there is something to report.
///
/// Returns whether an artifact was produced; an empty change list writes
/// nothing and leaves any previous report untouched.
pub fn write_report(changes: &[ChangeRecord], path: &Path) -> Result<bool, ReportError> {
    if changes.is_empty() {
        return Ok(false);
    }
    fs::write(path, render(changes)).map_err(|source| ReportError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(true)
}

fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            other => escaped.push(other),
        }
    }
    escaped
}
