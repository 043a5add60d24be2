use serde::Serialize;

use crate::filetime;

/// A file record as shown to the user.
///
/// Timestamps are already decoded to local `yyyy-MM-dd HH:mm:ss` text, or
/// empty when the index holds no value for them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileRecord {
    /// Absolute path; the record's identity.
    pub full_path: String,
    /// File size in bytes.
    pub size: u64,
    pub creation_time: String,
    pub last_access_time: String,
    pub last_write_time: String,
}

impl FileRecord {
    /// Last path segment, splitting on either separator.
    #[must_use]
    pub fn file_name(&self) -> &str {
        file_name_from_path(&self.full_path)
    }

    /// Same record under another path. Nothing else is re-read.
    #[must_use]
    pub fn with_path(&self, full_path: impl Into<String>) -> Self {
        Self {
            full_path: full_path.into(),
            ..self.clone()
        }
    }
}

/// A row of the `files` table exactly as the indexer writes it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredFile {
    pub full_path: String,
    pub file_size: i64,
    /// Native file-times (100ns ticks since 1601), 0 when unset.
    pub creation_time: u64,
    pub last_access_time: u64,
    pub last_write_time: u64,
}

impl StoredFile {
    #[must_use]
    pub fn new(full_path: impl Into<String>, file_size: i64) -> Self {
        Self {
            full_path: full_path.into(),
            file_size,
            creation_time: 0,
            last_access_time: 0,
            last_write_time: 0,
        }
    }

    #[must_use]
    pub fn with_times(mut self, creation: u64, last_access: u64, last_write: u64) -> Self {
        self.creation_time = creation;
        self.last_access_time = last_access;
        self.last_write_time = last_write;
        self
    }

    /// Decode into the display form. Negative sizes (never written by the
    /// indexer) clamp to 0.
    #[must_use]
    pub fn to_record(&self) -> FileRecord {
        FileRecord {
            full_path: self.full_path.clone(),
            size: u64::try_from(self.file_size).unwrap_or(0),
            creation_time: filetime::decode(self.creation_time),
            last_access_time: filetime::decode(self.last_access_time),
            last_write_time: filetime::decode(self.last_write_time),
        }
    }
}

impl From<StoredFile> for FileRecord {
    fn from(stored: StoredFile) -> Self {
        stored.to_record()
    }
}

pub(crate) fn file_name_from_path(path: &str) -> &str {
    path.rsplit(['\\', '/']).next().unwrap_or(path)
}
