//! Whole-file reads and writes that keep a [`FileTimeTracker`] current.
//!
//! These are the read and write halves the tracker expects around it: a
//! read records the file's stamp, a write checks it first and refreshes it
//! afterwards.

use crate::edit::atomic_write;
use crate::error::ErrorKind;
use crate::path::PathError;
use crate::tracker::{FileTimeTracker, TrackError};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::PoisonError;
use thiserror::Error;
use tracing::info;

#[derive(Error, Debug)]
pub enum FileError {
    #[error(transparent)]
    Track(#[from] TrackError),

    #[error(transparent)]
    Path(#[from] PathError),

    #[error("file {} not found", path.display())]
    NotFound { path: PathBuf },

    #[error("path {} is a directory, not a file", path.display())]
    IsDirectory { path: PathBuf },

    #[error("failed to {action} {}: {source}", path.display())]
    Io {
        path: PathBuf,
        action: &'static str,
        #[source]
        source: io::Error,
    },
}

impl FileError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            FileError::Track(e) => e.kind(),
            FileError::Path(e) => e.kind(),
            FileError::NotFound { .. } | FileError::IsDirectory { .. } => ErrorKind::FileNotFound,
            FileError::Io { .. } => ErrorKind::Io,
        }
    }

    fn io(path: &Path, action: &'static str, source: io::Error) -> Self {
        if source.kind() == io::ErrorKind::NotFound {
            return FileError::NotFound {
                path: path.to_path_buf(),
            };
        }
        FileError::Io {
            path: path.to_path_buf(),
            action,
            source,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriteOutcome {
    /// Canonical path written
    pub path: PathBuf,
    /// Whether the file did not exist before
    pub created: bool,
    pub bytes: usize,
}

/// Read `path` as UTF-8 and record it as read.
///
/// The recorded stamp comes from a stat taken before the read, so a write
/// racing with the read is caught by the next staleness check.
pub fn read_file(tracker: &FileTimeTracker, path: impl AsRef<Path>) -> Result<String, FileError> {
    let canonical = tracker.resolver().resolve(path)?;
    let metadata = fs::metadata(&canonical).map_err(|e| FileError::io(&canonical, "stat", e))?;
    if metadata.is_dir() {
        return Err(FileError::IsDirectory { path: canonical });
    }

    let content =
        fs::read_to_string(&canonical).map_err(|e| FileError::io(&canonical, "read", e))?;
    tracker.mark_read_at(&canonical, &metadata)?;
    Ok(content)
}

/// Write `contents` to `path`, creating parent directories as needed.
///
/// Existing files must have been read through `tracker` and be unchanged
/// since. The previous file mode is kept.
pub fn write_file(
    tracker: &FileTimeTracker,
    path: impl AsRef<Path>,
    contents: &str,
) -> Result<WriteOutcome, FileError> {
    let canonical = tracker.resolver().resolve(path)?;
    let lock = tracker.path_lock(&canonical);
    let _held = lock.lock().unwrap_or_else(PoisonError::into_inner);

    tracker.assert_not_modified(&canonical)?;

    let permissions = match fs::metadata(&canonical) {
        Ok(metadata) if metadata.is_dir() => {
            return Err(FileError::IsDirectory { path: canonical });
        }
        Ok(metadata) => Some(metadata.permissions()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => None,
        Err(e) => return Err(FileError::io(&canonical, "stat", e)),
    };
    let created = permissions.is_none();

    if let Some(parent) = canonical.parent() {
        fs::create_dir_all(parent).map_err(|e| FileError::io(parent, "create directory", e))?;
    }
    atomic_write(&canonical, contents.as_bytes(), permissions)
        .map_err(|e| FileError::io(&canonical, "write", e))?;
    tracker.mark_written(&canonical)?;

    let shown = tracker.resolver().display_path(&canonical);
    if created {
        info!(path = %shown.display(), bytes = contents.len(), "created file");
    } else {
        info!(path = %shown.display(), bytes = contents.len(), "wrote file");
    }

    Ok(WriteOutcome {
        path: canonical,
        created,
        bytes: contents.len(),
    })
}

/// Delete `path` and stop tracking it.
///
/// The file must have been read through `tracker` and be unchanged since.
pub fn delete_file(tracker: &FileTimeTracker, path: impl AsRef<Path>) -> Result<(), FileError> {
    let canonical = tracker.resolver().resolve(path)?;
    let lock = tracker.path_lock(&canonical);
    let _held = lock.lock().unwrap_or_else(PoisonError::into_inner);

    if !canonical.exists() {
        tracker.clear(&canonical)?;
        return Err(FileError::NotFound { path: canonical });
    }
    tracker.assert_not_modified(&canonical)?;
    if canonical.is_dir() {
        return Err(FileError::IsDirectory { path: canonical });
    }

    fs::remove_file(&canonical).map_err(|e| FileError::io(&canonical, "delete", e))?;
    tracker.clear(&canonical)?;
    let shown = tracker.resolver().display_path(&canonical);
    info!(path = %shown.display(), "deleted file");
    Ok(())
}
