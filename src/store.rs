//! Relational Store Adapter
//!
//! Opens a fresh SQLite connection for every statement and closes it before
//! returning, on success and on failure alike. No pooling: the workload is a
//! single user issuing a handful of queries.

use crate::result::{Cell, ResultSet, Row};
use crate::schema;
use rusqlite::{Batch, Connection, OpenFlags};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("failed to open database {path}: {source}")]
    Open {
        path: String,
        source: rusqlite::Error,
    },

    #[error("{0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("statement modifies the database; only read-only statements are permitted")]
    WriteRejected,

    #[error("no SQL statement found")]
    EmptyStatement,

    #[error("only one SQL statement can be executed at a time")]
    MultipleStatements { sql: String },
}

/// A store that can run one SQL statement and materialize its rows.
pub trait RelationalStore: Send + Sync {
    /// Store name for logs (e.g., "sqlite")
    fn name(&self) -> &'static str;

    /// Run a single statement, returning every row and the projected column names.
    fn run(&self, sql: &str) -> std::result::Result<ResultSet, StoreError>;

    /// Schema tables that are absent from the store.
    fn missing_tables(&self) -> std::result::Result<Vec<&'static str>, StoreError>;
}

/// SQLite file holding `DIAGNOSIS` and `HIS_LOGS`, opened read-only.
#[derive(Debug, Clone)]
pub struct SqliteStore {
    path: PathBuf,
}

impl SqliteStore {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    fn connect(&self) -> std::result::Result<Connection, StoreError> {
        let flags = OpenFlags::SQLITE_OPEN_READ_ONLY
            | OpenFlags::SQLITE_OPEN_NO_MUTEX
            | OpenFlags::SQLITE_OPEN_URI;
        Connection::open_with_flags(&self.path, flags).map_err(|source| StoreError::Open {
            path: self.path.display().to_string(),
            source,
        })
    }
}

impl RelationalStore for SqliteStore {
    fn name(&self) -> &'static str {
        "sqlite"
    }

    fn run(&self, sql: &str) -> std::result::Result<ResultSet, StoreError> {
        let conn = self.connect()?;

        // Comment-only text yields no statement; anything after the first one
        // would otherwise be dropped without ever running.
        let mut batch = Batch::new(&conn, sql);
        let mut stmt = batch.next()?.ok_or(StoreError::EmptyStatement)?;
        if batch.next()?.is_some() {
            return Err(StoreError::MultipleStatements { sql: sql.to_string() });
        }

        // The connection is read-only already; this catches writes before stepping
        // so the caller gets a clear message instead of SQLite's "readonly database".
        if !stmt.readonly() {
            return Err(StoreError::WriteRejected);
        }

        let columns: Vec<String> = stmt.column_names().into_iter().map(str::to_string).collect();
        let width = columns.len();

        let mut rows = Vec::new();
        let mut cursor = stmt.query([])?;
        while let Some(row) = cursor.next()? {
            let cells = (0..width)
                .map(|i| row.get_ref(i).map(Cell::from))
                .collect::<rusqlite::Result<Vec<_>>>()?;
            rows.push(Row(cells));
        }

        debug!(rows = rows.len(), columns = width, "sqlite statement finished");
        Ok(ResultSet::new(columns, rows))
    }

    fn missing_tables(&self) -> std::result::Result<Vec<&'static str>, StoreError> {
        let conn = self.connect()?;
        let mut stmt = conn.prepare("SELECT name FROM sqlite_master WHERE type = 'table' AND name = ?1")?;
        let mut missing = Vec::new();
        for table in schema::TABLES.iter() {
            if !stmt.exists([table.name])? {
                missing.push(table.name);
            }
        }
        Ok(missing)
    }
}
