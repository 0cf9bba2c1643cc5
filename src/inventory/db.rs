use std::{
    collections::HashMap,
    path::{Path, PathBuf},
    sync::LazyLock,
};

use regex::Regex;
use rusqlite::{Connection, OptionalExtension, params};
use thiserror::Error;

use super::{ArtifactRecord, ChangeRecord};

/// Default filename for the inventory database.
pub const DB_FILE_NAME: &str = "software_inventory.db";

static NON_IDENT_CHARS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^A-Za-z0-9_]").expect("identifier regex must compile"));

/// Errors returned when managing the inventory database.
#[derive(Debug, Error)]
pub enum DbError {
    #[error("Database query failed: {0}")]
    Sql(#[from] rusqlite::Error),
    #[error("Could not write to {path}: {source}")]
    CreateDir {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Directory path has no final segment to name a table after: {0}")]
    UnnamableRoot(PathBuf),
    #[error("Database is busy, please retry")]
    Busy,
    #[error("SQLite returned an unexpected result")]
    Unexpected,
}

/// A row read back from a per-directory history table.
#[derive(Debug, Clone)]
pub struct StoredArtifact {
    pub name: String,
    pub location: String,
    pub checksum: Option<String>,
    pub last_update: Option<String>,
}

/// SQLite wrapper that stores fingerprint history, one table per scanned root.
pub struct InventoryDb {
    connection: Connection,
}

impl InventoryDb {
    /// Open (or create) the inventory database at the given path.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, DbError> {
        let path = path.as_ref();
        create_parent_if_needed(path)?;
        let connection = Connection::open(path)?;
        let db = Self { connection };
        db.apply_pragmas()?;
        Ok(db)
    }

    /// Merge one directory's freshly scanned catalog into its history table.
    ///
    /// Returns the changes detected against previously stored fingerprints: a
    /// `(name, location)` pair already present with a different checksum emits
    /// one ChangeRecord. First observations are baselines and emit nothing.
    /// Every row is upserted with the new checksum and timestamp regardless,
    /// and all writes for the directory commit as a single transaction.
    ///
    /// Rows whose artifacts have disappeared from disk are left untouched;
    /// the store never prunes history.
    pub fn merge(
        &self,
        catalog: &HashMap<String, ArtifactRecord>,
        root: &Path,
    ) -> Result<Vec<ChangeRecord>, DbError> {
        let table = table_ident(root)?;
        self.ensure_table(&table)?;

        // Stable iteration so change lists and log output do not depend on
        // catalog map ordering.
        let mut records: Vec<&ArtifactRecord> = catalog.values().collect();
        records.sort_by(|a, b| a.name.cmp(&b.name));

        let tx = self
            .connection
            .unchecked_transaction()
            .map_err(map_sql_error)?;
        let mut changes = Vec::new();
        {
            let mut select = tx
                .prepare_cached(&format!(
                    "SELECT checksum FROM {table} WHERE name = ?1 AND location = ?2"
                ))
                .map_err(map_sql_error)?;
            let mut upsert = tx
                .prepare_cached(&format!(
                    "INSERT INTO {table} (name, location, checksum, last_update)
                     VALUES (?1, ?2, ?3, ?4)
                     ON CONFLICT(name, location) DO UPDATE SET checksum = excluded.checksum,
                                                               last_update = excluded.last_update"
                ))
                .map_err(map_sql_error)?;
            for record in records {
                let location = location_text(&record.location);
                let stored: Option<Option<String>> = select
                    .query_row(params![record.name, location], |row| row.get(0))
                    .optional()
                    .map_err(map_sql_error)?;
                if let Some(Some(old_checksum)) = stored
                    && old_checksum != record.checksum
                {
                    changes.push(ChangeRecord {
                        name: record.name.clone(),
                        location: record.location.clone(),
                        old_checksum,
                        new_checksum: record.checksum.clone(),
                    });
                }
                upsert
                    .execute(params![
                        record.name,
                        location,
                        record.checksum,
                        record.last_modified
                    ])
                    .map_err(map_sql_error)?;
            }
        }
        tx.commit().map_err(map_sql_error)?;
        Ok(changes)
    }

    /// Fetch all stored rows for a scanned root, ordered by name.
    pub fn list_artifacts(&self, root: &Path) -> Result<Vec<StoredArtifact>, DbError> {
        let table = table_ident(root)?;
        if !self.table_exists(&table)? {
            return Ok(Vec::new());
        }
        let mut stmt = self
            .connection
            .prepare(&format!(
                "SELECT name, location, checksum, last_update FROM {table}
                 ORDER BY name ASC, location ASC"
            ))
            .map_err(map_sql_error)?;
        let rows = stmt
            .query_map([], |row| {
                Ok(StoredArtifact {
                    name: row.get(0)?,
                    location: row.get(1)?,
                    checksum: row.get(2)?,
                    last_update: row.get(3)?,
                })
            })
            .map_err(map_sql_error)?
            .collect::<Result<Vec<_>, _>>()
            .map_err(map_sql_error)?;
        Ok(rows)
    }

    fn table_exists(&self, table: &str) -> Result<bool, DbError> {
        let found: Option<String> = self
            .connection
            .query_row(
                "SELECT name FROM sqlite_master WHERE type = 'table' AND name = ?1",
                params![table],
                |row| row.get(0),
            )
            .optional()
            .map_err(map_sql_error)?;
        Ok(found.is_some())
    }

    fn ensure_table(&self, table: &str) -> Result<(), DbError> {
        self.connection
            .execute_batch(&format!(
                "CREATE TABLE IF NOT EXISTS {table} (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    name TEXT NOT NULL,
                    location TEXT NOT NULL,
                    checksum TEXT,
                    last_update TEXT,
                    UNIQUE(name, location)
                );"
            ))
            .map_err(map_sql_error)?;
        Ok(())
    }

    fn apply_pragmas(&self) -> Result<(), DbError> {
        self.connection
            .execute_batch(
                "PRAGMA journal_mode=WAL;
             PRAGMA synchronous = NORMAL;
             PRAGMA busy_timeout=5000;
             PRAGMA temp_store=MEMORY;",
            )
            .map_err(map_sql_error)?;
        Ok(())
    }
}

/// Derive the history table identifier for a scanned root directory.
///
/// Pure function of the final path segment: every character outside
/// `[A-Za-z0-9_]` becomes `_` and a leading digit is escaped with `_`, so the
/// result is always a valid SQL identifier. Identifiers are interpolated into
/// statements; row values are always bound parameters. Two directories whose
/// final segments sanitize identically share a table; resolving that is out
/// of scope.
pub fn table_ident(root: &Path) -> Result<String, DbError> {
    let segment = root
        .components()
        .next_back()
        .and_then(|component| match component {
            std::path::Component::Normal(name) => Some(name.to_string_lossy()),
            _ => None,
        })
        .ok_or_else(|| DbError::UnnamableRoot(root.to_path_buf()))?;
    let mut ident = NON_IDENT_CHARS.replace_all(&segment, "_").into_owned();
    if ident.starts_with(|c: char| c.is_ascii_digit()) {
        ident.insert(0, '_');
    }
    if ident.is_empty() {
        return Err(DbError::UnnamableRoot(root.to_path_buf()));
    }
    Ok(ident)
}

fn location_text(location: &Path) -> String {
    location.to_string_lossy().into_owned()
}

/// Translate rusqlite errors into friendlier DbError variants.
fn map_sql_error(err: rusqlite::Error) -> DbError {
    match err {
        rusqlite::Error::SqliteFailure(sql_err, _)
            if sql_err.extended_code == rusqlite::ffi::SQLITE_BUSY =>
        {
            DbError::Busy
        }
        rusqlite::Error::InvalidQuery
        | rusqlite::Error::InvalidParameterName(_)
        | rusqlite::Error::MultipleStatement => DbError::Unexpected,
        other => DbError::Sql(other),
    }
}

fn create_parent_if_needed(path: &Path) -> Result<(), DbError> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
        && !parent.exists()
    {
        std::fs::create_dir_all(parent).map_err(|source| DbError::CreateDir {
            path: parent.to_path_buf(),
            source,
        })?;
    }
    Ok(())
}
