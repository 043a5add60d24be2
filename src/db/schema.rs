/// The `files` table exactly as the external indexer and monitor create it.
///
/// Timestamps are native file-times stored as the bit pattern of an
/// unsigned 64-bit value. The shape must not change: other processes write it.
pub const CREATE_SCHEMA: &str = r"
CREATE TABLE IF NOT EXISTS files (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    fullpath TEXT UNIQUE NOT NULL,
    fileSize INTEGER NOT NULL DEFAULT 0,
    creationTime INTEGER NOT NULL DEFAULT 0,
    lastAccessTime INTEGER NOT NULL DEFAULT 0,
    lastWriteTime INTEGER NOT NULL DEFAULT 0
);
";

#[cfg(test)]
mod tests {
    use super::*;
    use rusqlite::Connection;

    #[test]
    fn schema_creates_without_error() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(CREATE_SCHEMA).unwrap();
    }

    #[test]
    fn schema_is_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(CREATE_SCHEMA).unwrap();
        conn.execute_batch(CREATE_SCHEMA).unwrap();
    }

    #[test]
    fn fullpath_is_unique() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(CREATE_SCHEMA).unwrap();
        conn.execute("INSERT INTO files (fullpath) VALUES ('/a')", [])
            .unwrap();
        assert!(conn
            .execute("INSERT INTO files (fullpath) VALUES ('/a')", [])
            .is_err());
    }
}
