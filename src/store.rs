//! Record store over the file index.
//!
//! Each call opens its own connection and drops it before returning, so no
//! connection outlives a call and two calls never share a transaction.
//! Storage errors stop here: they are logged and reported as "no result".

use std::path::{Path, PathBuf};

use crate::db::{Database, IndexStats};
use crate::error::Result;
use crate::models::FileRecord;

/// Upper bound on rows returned by [`RecordStore::search`].
pub const SEARCH_LIMIT: usize = 1000;

/// Accessor for the persisted `files` table.
#[derive(Debug, Clone)]
pub struct RecordStore {
    db_path: PathBuf,
}

impl RecordStore {
    #[must_use]
    pub fn new(db_path: impl Into<PathBuf>) -> Self {
        Self {
            db_path: db_path.into(),
        }
    }

    #[must_use]
    pub fn db_path(&self) -> &Path {
        &self.db_path
    }

    /// Whether the index file is present yet.
    #[must_use]
    pub fn exists(&self) -> bool {
        self.db_path.exists()
    }

    fn with_db<T>(&self, f: impl FnOnce(&Database) -> Result<T>) -> Result<T> {
        let db = Database::open(&self.db_path)?;
        f(&db)
    }

    /// Records whose path contains `keyword`, in insertion order, at most
    /// [`SEARCH_LIMIT`]. An empty keyword matches everything.
    #[must_use]
    pub fn search(&self, keyword: &str) -> Vec<FileRecord> {
        match self.with_db(|db| db.search_files(keyword, SEARCH_LIMIT)) {
            Ok(rows) => rows.into_iter().map(FileRecord::from).collect(),
            Err(e) => {
                tracing::warn!(keyword, error = %e, "search failed");
                Vec::new()
            }
        }
    }

    /// Exact-path lookup.
    #[must_use]
    pub fn get_by_path(&self, full_path: &str) -> Option<FileRecord> {
        match self.with_db(|db| db.get_file_by_path(full_path)) {
            Ok(found) => found.map(FileRecord::from),
            Err(e) => {
                tracing::warn!(path = full_path, error = %e, "lookup failed");
                None
            }
        }
    }

    /// Remove all rows for `full_path`. True iff at least one row went away.
    pub fn delete(&self, full_path: &str) -> bool {
        match self.with_db(|db| db.delete_file_by_path(full_path)) {
            Ok(removed) => removed > 0,
            Err(e) => {
                tracing::warn!(path = full_path, error = %e, "index delete failed");
                false
            }
        }
    }

    /// Move the row at `old_path` to `new_path`. True iff a row was updated.
    ///
    /// The destination is not checked beforehand; when the table's unique
    /// key rejects it the call reports false and nothing changes.
    pub fn rename(&self, old_path: &str, new_path: &str) -> bool {
        match self.with_db(|db| db.rename_file(old_path, new_path)) {
            Ok(changed) => changed > 0,
            Err(e) => {
                tracing::warn!(old_path, new_path, error = %e, "index rename failed");
                false
            }
        }
    }

    /// Total number of rows, `None` if the index cannot be read.
    #[must_use]
    pub fn count(&self) -> Option<u64> {
        self.with_db(Database::count_files)
            .map_err(|e| tracing::warn!(error = %e, "count failed"))
            .ok()
    }

    /// Aggregate figures, `None` if the index cannot be read.
    #[must_use]
    pub fn stats(&self) -> Option<IndexStats> {
        self.with_db(Database::stats)
            .map_err(|e| tracing::warn!(error = %e, "stats failed"))
            .ok()
    }
}
