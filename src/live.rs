//! Live search: every change to the query text re-runs the search and
//! replaces the displayed rows.
//!
//! Queries are sequence numbered. A result is applied only if no newer query
//! has been issued or applied, so a slow query can never overwrite the rows
//! of a later keystroke.

use crate::models::FileRecord;
use crate::store::RecordStore;

/// A query that has been issued but whose rows are not yet displayed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryTicket {
    pub seq: u64,
    pub text: String,
}

/// Display state for the search view.
#[derive(Debug)]
pub struct LiveSearch {
    store: RecordStore,
    query: String,
    rows: Vec<FileRecord>,
    issued: u64,
    applied: u64,
}

impl LiveSearch {
    #[must_use]
    pub fn new(store: RecordStore) -> Self {
        Self {
            store,
            query: String::new(),
            rows: Vec::new(),
            issued: 0,
            applied: 0,
        }
    }

    #[must_use]
    pub fn store(&self) -> &RecordStore {
        &self.store
    }

    #[must_use]
    pub fn query(&self) -> &str {
        &self.query
    }

    #[must_use]
    pub fn rows(&self) -> &[FileRecord] {
        &self.rows
    }

    #[must_use]
    pub fn row(&self, index: usize) -> Option<&FileRecord> {
        self.rows.get(index)
    }

    /// The query text changed: search synchronously and replace the rows.
    pub fn on_query_changed(&mut self, text: &str) -> &[FileRecord] {
        let ticket = self.begin_query(text);
        let rows = self.store.search(&ticket.text);
        self.apply(&ticket, rows);
        &self.rows
    }

    /// Re-run the current query.
    pub fn refresh(&mut self) -> &[FileRecord] {
        let text = self.query.clone();
        self.on_query_changed(&text)
    }

    /// Record a new query text and hand out its ticket.
    pub fn begin_query(&mut self, text: &str) -> QueryTicket {
        self.issued += 1;
        self.query = text.to_string();
        QueryTicket {
            seq: self.issued,
            text: self.query.clone(),
        }
    }

    /// Display the rows for `ticket` unless a newer query superseded it.
    /// Returns whether the rows were applied.
    pub fn apply(&mut self, ticket: &QueryTicket, rows: Vec<FileRecord>) -> bool {
        if ticket.seq < self.issued || ticket.seq <= self.applied {
            tracing::debug!(seq = ticket.seq, latest = self.issued, "dropping stale results");
            return false;
        }
        self.applied = ticket.seq;
        self.rows = rows;
        true
    }

    /// Drop the displayed row for `path`. Returns whether one was shown.
    pub fn remove_path(&mut self, path: &str) -> bool {
        let before = self.rows.len();
        self.rows.retain(|r| r.full_path != path);
        self.rows.len() != before
    }

    /// Point the displayed row for `old` at `new`, leaving its other fields
    /// as they were. Returns whether one was shown.
    pub fn replace_path(&mut self, old: &str, new: &str) -> bool {
        let mut found = false;
        for row in self.rows.iter_mut().filter(|r| r.full_path == old) {
            *row = row.with_path(new);
            found = true;
        }
        found
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::Database;
    use crate::models::StoredFile;
    use tempfile::TempDir;

    fn view_with(paths: &[&str]) -> (TempDir, LiveSearch) {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("file_index.db");
        let db = Database::create(&path).unwrap();
        for p in paths {
            db.insert_file(&StoredFile::new(*p, 1)).unwrap();
        }
        (tmp, LiveSearch::new(RecordStore::new(path)))
    }

    #[test]
    fn each_keystroke_replaces_rows() {
        let (_tmp, mut view) = view_with(&["/d/report.txt", "/d/report_old.txt", "/d/notes.md"]);
        assert_eq!(view.on_query_changed("").len(), 3);
        assert_eq!(view.on_query_changed("r").len(), 2);
        assert_eq!(view.on_query_changed(".").len(), 3);
        assert_eq!(view.on_query_changed("rep").len(), 2);
        assert_eq!(view.on_query_changed("report_").len(), 1);
        assert_eq!(view.on_query_changed("report_x").len(), 0);
        assert_eq!(view.on_query_changed("rep").len(), 2);
        assert_eq!(view.query(), "rep");
    }

    #[test]
    fn stale_results_are_dropped() {
        let (_tmp, mut view) = view_with(&["/d/a.txt", "/d/b.txt"]);
        let first = view.begin_query("a");
        let second = view.begin_query("b");
        let rows_b = view.store().search(&second.text);
        assert!(view.apply(&second, rows_b));
        let rows_a = view.store().search(&first.text);
        assert!(!view.apply(&first, rows_a));
        assert_eq!(view.rows().len(), 1);
        assert_eq!(view.rows()[0].full_path, "/d/b.txt");
    }

    #[test]
    fn superseded_ticket_is_dropped_before_newer_applies() {
        let (_tmp, mut view) = view_with(&["/d/a.txt"]);
        let first = view.begin_query("a");
        let _second = view.begin_query("");
        assert!(!view.apply(&first, Vec::new()));
    }

    #[test]
    fn remove_and_replace_touch_only_matching_rows() {
        let (_tmp, mut view) = view_with(&["/d/a.txt", "/d/b.txt"]);
        view.on_query_changed("");
        assert!(view.replace_path("/d/a.txt", "/d/c.txt"));
        assert_eq!(view.row(0).unwrap().full_path, "/d/c.txt");
        assert!(view.remove_path("/d/b.txt"));
        assert!(!view.remove_path("/d/b.txt"));
        assert_eq!(view.rows().len(), 1);
    }
}
