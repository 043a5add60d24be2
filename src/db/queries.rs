use rusqlite::{params, OptionalExtension, Row};
use serde::Serialize;

use crate::error::Result;
use crate::models::file::StoredFile;

use super::Database;

const FILE_COLUMNS: &str = "fullpath, fileSize, creationTime, lastAccessTime, lastWriteTime";

impl Database {
    // ─── Reads ───

    /// Files whose path contains `keyword`, oldest insertion first.
    ///
    /// The keyword is matched literally: `%`, `_` and `\` are escaped before
    /// it reaches `LIKE`. Case folding follows SQLite's `LIKE` (ASCII only).
    pub fn search_files(&self, keyword: &str, limit: usize) -> Result<Vec<StoredFile>> {
        let pattern = format!("%{}%", escape_like(keyword));
        let mut stmt = self.conn().prepare(&format!(
            "SELECT {FILE_COLUMNS} FROM files
             WHERE fullpath LIKE ?1 ESCAPE '\\'
             ORDER BY id LIMIT ?2"
        ))?;
        let rows = stmt.query_map(params![pattern, limit as i64], map_stored_file)?;
        let mut files = Vec::new();
        for r in rows {
            files.push(r?);
        }
        Ok(files)
    }

    /// Exact-path lookup. With duplicate rows the oldest one wins.
    pub fn get_file_by_path(&self, path: &str) -> Result<Option<StoredFile>> {
        let file = self
            .conn()
            .query_row(
                &format!("SELECT {FILE_COLUMNS} FROM files WHERE fullpath = ?1 ORDER BY id LIMIT 1"),
                params![path],
                map_stored_file,
            )
            .optional()?;
        Ok(file)
    }

    /// Number of rows in the index.
    pub fn count_files(&self) -> Result<u64> {
        let count: i64 = self
            .conn()
            .query_row("SELECT COUNT(*) FROM files", [], |r| r.get(0))?;
        Ok(count as u64)
    }

    /// Aggregate figures over the whole index.
    pub fn stats(&self) -> Result<IndexStats> {
        let (file_count, total_bytes, newest_write): (i64, i64, i64) = self.conn().query_row(
            "SELECT COUNT(*), COALESCE(SUM(fileSize), 0), COALESCE(MAX(lastWriteTime), 0) FROM files",
            [],
            |r| Ok((r.get(0)?, r.get(1)?, r.get(2)?)),
        )?;
        Ok(IndexStats {
            file_count: file_count as u64,
            total_bytes: total_bytes as u64,
            newest_write_time: newest_write as u64,
        })
    }

    // ─── Writes ───

    /// Insert a row the way the indexer does (`INSERT OR IGNORE`).
    /// Returns false when the path is already present.
    pub fn insert_file(&self, file: &StoredFile) -> Result<bool> {
        let changed = self.conn().execute(
            &format!("INSERT OR IGNORE INTO files ({FILE_COLUMNS}) VALUES (?1, ?2, ?3, ?4, ?5)"),
            params![
                file.full_path,
                file.file_size,
                file.creation_time as i64,
                file.last_access_time as i64,
                file.last_write_time as i64,
            ],
        )?;
        Ok(changed > 0)
    }

    /// Remove every row with exactly this path. Returns the number removed.
    pub fn delete_file_by_path(&self, path: &str) -> Result<usize> {
        let removed = self
            .conn()
            .execute("DELETE FROM files WHERE fullpath = ?1", params![path])?;
        Ok(removed)
    }

    /// Point the row at `old_path` to `new_path`. Other columns are untouched.
    /// Returns the number of rows changed.
    pub fn rename_file(&self, old_path: &str, new_path: &str) -> Result<usize> {
        let changed = self.conn().execute(
            "UPDATE files SET fullpath = ?1 WHERE fullpath = ?2",
            params![new_path, old_path],
        )?;
        Ok(changed)
    }
}

fn map_stored_file(row: &Row<'_>) -> rusqlite::Result<StoredFile> {
    Ok(StoredFile {
        full_path: row.get(0)?,
        file_size: row.get(1)?,
        creation_time: row.get::<_, i64>(2)? as u64,
        last_access_time: row.get::<_, i64>(3)? as u64,
        last_write_time: row.get::<_, i64>(4)? as u64,
    })
}

/// Escape `LIKE` metacharacters so the keyword matches literally.
pub(crate) fn escape_like(keyword: &str) -> String {
    let mut out = String::with_capacity(keyword.len());
    for c in keyword.chars() {
        if matches!(c, '%' | '_' | '\\') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

/// Aggregate figures over the index.
#[derive(Debug, Clone, Default, Serialize)]
pub struct IndexStats {
    pub file_count: u64,
    pub total_bytes: u64,
    /// Native file-time of the most recent write, 0 when empty.
    pub newest_write_time: u64,
}
