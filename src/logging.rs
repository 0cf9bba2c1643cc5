//! Logging setup for the application.
//!
//! Builds the tracing subscriber once at process start: an `EnvFilter`
//! (default `info`), a stdout layer for interactive runs, and a non-blocking
//! per-launch log file under the platform data directory. Library modules
//! only emit events; nothing below this file touches subscriber state.

use std::{
    env, fs,
    path::{Path, PathBuf},
    sync::OnceLock,
};

use directories::BaseDirs;
use time::{OffsetDateTime, UtcOffset, format_description::FormatItem, macros::format_description};
use tracing_appender::{non_blocking::WorkerGuard, rolling};
use tracing_subscriber::{EnvFilter, Registry, fmt, prelude::*};

/// Log files older than the newest `MAX_LOG_FILES` are deleted at startup.
const MAX_LOG_FILES: usize = 10;

/// Environment variable that redirects log files, mainly for tests and
/// portable installs.
pub const LOG_DIR_ENV: &str = "STOCKTAKE_LOG_DIR";

static LOG_GUARD: OnceLock<WorkerGuard> = OnceLock::new();

/// Errors that may occur while initializing logging.
#[derive(Debug, thiserror::Error)]
pub enum LoggingError {
    /// No platform data directory and no `STOCKTAKE_LOG_DIR` override.
    #[error("No suitable directory available for log files")]
    NoLogDir,
    /// Filesystem work in the log directory failed.
    #[error("Failed to prepare log directory {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    /// The launch timestamp could not be rendered into a filename.
    #[error("Failed to format log filename time: {0}")]
    FormatTime(time::error::Format),
    /// Another subscriber was installed first.
    #[error("Failed to install global tracing subscriber: {0}")]
    SetGlobal(tracing::subscriber::SetGlobalDefaultError),
}

/// Initialize tracing to write to stdout and a per-launch log file.
///
/// Subsequent calls are no-ops. Failures are returned so the caller can keep
/// running without file logging instead of aborting startup.
pub fn init() -> Result<(), LoggingError> {
    if LOG_GUARD.get().is_some() {
        return Ok(());
    }

    let log_dir = resolve_log_dir()?;
    fs::create_dir_all(&log_dir).map_err(|source| LoggingError::Io {
        path: log_dir.clone(),
        source,
    })?;
    prune_stale_logs(&log_dir)?;

    let file_name = launch_file_name(now_local_or_utc())?;
    let log_path = log_dir.join(&file_name);
    let (file_writer, guard) = tracing_appender::non_blocking(rolling::never(&log_dir, file_name));

    let timer = build_timer();
    let subscriber = Registry::default()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(
            fmt::layer()
                .with_timer(timer.clone())
                .with_writer(std::io::stdout),
        )
        .with(
            fmt::layer()
                .with_ansi(false)
                .with_timer(timer)
                .with_writer(file_writer),
        );
    tracing::subscriber::set_global_default(subscriber).map_err(LoggingError::SetGlobal)?;
    let _ = LOG_GUARD.set(guard);

    tracing::info!("Logging initialized; log file at {}", log_path.display());
    Ok(())
}

/// Pick the log directory: env override first, then the platform data dir.
fn resolve_log_dir() -> Result<PathBuf, LoggingError> {
    if let Ok(custom) = env::var(LOG_DIR_ENV) {
        return Ok(PathBuf::from(custom));
    }
    BaseDirs::new()
        .map(|dirs| dirs.data_local_dir().join("stocktake").join("logs"))
        .ok_or(LoggingError::NoLogDir)
}

/// Delete the oldest launch logs beyond the retention cap.
///
/// Filenames embed the launch timestamp, so lexicographic order is age order
/// and no metadata calls are needed.
fn prune_stale_logs(dir: &Path) -> Result<(), LoggingError> {
    let entries = fs::read_dir(dir).map_err(|source| LoggingError::Io {
        path: dir.to_path_buf(),
        source,
    })?;
    let mut logs: Vec<PathBuf> = entries
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| {
            path.is_file() && path.extension().and_then(|ext| ext.to_str()) == Some("log")
        })
        .collect();
    logs.sort();

    // Keep one slot free for the file this launch is about to create.
    while logs.len() >= MAX_LOG_FILES {
        let oldest = logs.remove(0);
        fs::remove_file(&oldest).map_err(|source| LoggingError::Io {
            path: oldest,
            source,
        })?;
    }
    Ok(())
}

fn launch_file_name(now: OffsetDateTime) -> Result<String, LoggingError> {
    const NAME_FORMAT: &[FormatItem<'_>] =
        format_description!("[year]-[month]-[day]_[hour]-[minute]-[second]");
    let stamp = now.format(NAME_FORMAT).map_err(LoggingError::FormatTime)?;
    Ok(format!("stocktake_{stamp}.log"))
}

fn build_timer() -> fmt::time::OffsetTime<time::format_description::BorrowedFormatItem<'static>> {
    const DISPLAY_FORMAT: &[FormatItem<'static>] =
        format_description!("[year]-[month]-[day] [hour]:[minute]:[second]");
    let offset = UtcOffset::current_local_offset().unwrap_or(UtcOffset::UTC);
    fmt::time::OffsetTime::new(offset, DISPLAY_FORMAT.into())
}

fn now_local_or_utc() -> OffsetDateTime {
    OffsetDateTime::now_local().unwrap_or_else(|_| OffsetDateTime::now_utc())
}
