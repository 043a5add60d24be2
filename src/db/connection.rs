use std::path::Path;
use std::time::Duration;

use rusqlite::{Connection, OpenFlags};

use crate::db::schema::CREATE_SCHEMA;
use crate::error::{FindexError, Result};

/// How long a statement waits while the indexer or monitor holds a write lock.
const BUSY_TIMEOUT: Duration = Duration::from_secs(2);

/// Connection to the file index.
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Open an existing index. The schema is left untouched; a missing file
    /// is an error rather than a freshly created empty database.
    pub fn open(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(FindexError::IndexNotFound {
                path: path.display().to_string(),
            });
        }
        let conn = Connection::open_with_flags(
            path,
            OpenFlags::SQLITE_OPEN_READ_WRITE
                | OpenFlags::SQLITE_OPEN_URI
                | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )?;
        conn.busy_timeout(BUSY_TIMEOUT)?;
        Ok(Self { conn })
    }

    /// Open (or create) an index and make sure the `files` table exists.
    pub fn create(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let conn = Connection::open(path)?;
        conn.busy_timeout(BUSY_TIMEOUT)?;
        conn.execute_batch(CREATE_SCHEMA)?;
        Ok(Self { conn })
    }

    /// Create an in-memory database (for testing).
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch(CREATE_SCHEMA)?;
        Ok(Self { conn })
    }

    /// Access the underlying connection.
    pub fn conn(&self) -> &Connection {
        &self.conn
    }
}
