//! Delete and rename applied to the filesystem and the index together.

use std::path::{Component, Path, PathBuf};
use std::process::{Command, ExitStatus};

use serde::Serialize;

use crate::error::{FindexError, Result};
use crate::live::LiveSearch;

/// What a delete actually did.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DeleteOutcome {
    /// The file existed and was removed from disk.
    pub file_removed: bool,
    /// Why removal from disk failed, if it did.
    pub file_error: Option<String>,
    /// The index held a row for the path and it was removed.
    pub index_removed: bool,
}

/// Delete `path` from disk, then from the index and the displayed rows.
///
/// The index row is removed even when the file could not be deleted; the
/// failure is returned in [`DeleteOutcome::file_error`] for the caller to show.
pub fn delete_path(view: &mut LiveSearch, path: &str) -> DeleteOutcome {
    let mut outcome = DeleteOutcome::default();

    let target = Path::new(path);
    match std::fs::symlink_metadata(target) {
        Ok(meta) => {
            let removed = if meta.is_dir() {
                std::fs::remove_dir_all(target)
            } else {
                std::fs::remove_file(target)
            };
            match removed {
                Ok(()) => outcome.file_removed = true,
                Err(e) => outcome.file_error = Some(e.to_string()),
            }
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            tracing::debug!(path, "file already gone, dropping index row only");
        }
        Err(e) => outcome.file_error = Some(e.to_string()),
    }

    outcome.index_removed = view.store().delete(path);
    if outcome.index_removed {
        view.remove_path(path);
    }

    if let Some(err) = &outcome.file_error {
        if outcome.index_removed {
            tracing::warn!(path, error = %err, "index row removed but file is still on disk");
        } else {
            tracing::warn!(path, error = %err, "file delete failed");
        }
    } else {
        tracing::info!(path, index_removed = outcome.index_removed, "deleted");
    }
    outcome
}

/// Rename `old_path` to `new_name` within its directory.
///
/// Nothing in the index or view changes unless the filesystem rename
/// succeeds. An existing destination is refused rather than overwritten,
/// unless it is the source itself under a different letter case.
pub fn rename_path(view: &mut LiveSearch, old_path: &str, new_name: &str) -> Result<PathBuf> {
    let new_name = validate_name(new_name)?;
    let old = Path::new(old_path);
    let new_path = old
        .parent()
        .map_or_else(|| PathBuf::from(new_name), |dir| dir.join(new_name));

    if new_path.as_path() == old {
        return Ok(new_path);
    }
    if std::fs::symlink_metadata(&new_path).is_ok() && !is_case_variant(old, &new_path) {
        return Err(FindexError::RenameCollision {
            path: new_path.display().to_string(),
        });
    }
    std::fs::rename(old, &new_path)?;

    let new_str = new_path.to_string_lossy().into_owned();
    let store = view.store();
    if store.get_by_path(&new_str).is_some() {
        tracing::warn!(
            old_path,
            new_path = %new_str,
            "index already holds a row for the new path"
        );
    }
    if !store.rename(old_path, &new_str) {
        tracing::warn!(old_path, new_path = %new_str, "index row not renamed");
    }
    view.replace_path(old_path, &new_str);
    tracing::info!(old_path, new_path = %new_str, "renamed");
    Ok(new_path)
}

/// A new name must be a single, non-blank path component. It is used as
/// given, surrounding whitespace included.
fn validate_name(name: &str) -> Result<&str> {
    let invalid = || FindexError::InvalidName {
        name: name.to_string(),
    };
    if name.trim().is_empty() || name.contains(['/', '\\']) {
        return Err(invalid());
    }
    let mut parts = Path::new(name).components();
    match (parts.next(), parts.next()) {
        (Some(Component::Normal(_)), None) => Ok(name),
        _ => Err(invalid()),
    }
}

/// On a case-insensitive filesystem a case-only rename finds its own
/// source at the destination. That is not a collision.
fn is_case_variant(old: &Path, new_path: &Path) -> bool {
    let (Some(a), Some(b)) = (old.file_name(), new_path.file_name()) else {
        return false;
    };
    a.to_string_lossy().to_lowercase() == b.to_string_lossy().to_lowercase()
        && same_file(old, new_path)
}

#[cfg(unix)]
fn same_file(a: &Path, b: &Path) -> bool {
    use std::os::unix::fs::MetadataExt;
    match (std::fs::symlink_metadata(a), std::fs::symlink_metadata(b)) {
        (Ok(a), Ok(b)) => a.dev() == b.dev() && a.ino() == b.ino(),
        _ => false,
    }
}

#[cfg(not(unix))]
fn same_file(a: &Path, b: &Path) -> bool {
    match (std::fs::canonicalize(a), std::fs::canonicalize(b)) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}

fn ensure_command_success(status: ExitStatus, command_label: &str) -> Result<()> {
    if status.success() {
        Ok(())
    } else {
        Err(FindexError::Other(format!(
            "{command_label} failed with status {status}"
        )))
    }
}

/// Open `path` with the desktop's default handler.
#[cfg(target_os = "macos")]
pub fn open_path(path: &Path) -> Result<()> {
    let status = Command::new("open").arg(path).status()?;
    ensure_command_success(status, "open")
}

/// Open `path` with the desktop's default handler.
#[cfg(target_os = "windows")]
pub fn open_path(path: &Path) -> Result<()> {
    let status = Command::new("cmd")
        .arg("/C")
        .arg("start")
        .arg("")
        .arg(path)
        .status()?;
    ensure_command_success(status, "start")
}

/// Open `path` with the desktop's default handler.
#[cfg(not(any(target_os = "macos", target_os = "windows")))]
pub fn open_path(path: &Path) -> Result<()> {
    let status = Command::new("xdg-open").arg(path).status()?;
    ensure_command_success(status, "xdg-open")
}
