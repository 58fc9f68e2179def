//! Tail reader error types.

use std::path::PathBuf;

/// Errors that can occur while tailing the game log.
#[derive(thiserror::Error, Debug)]
pub enum TailError {
    /// Log file does not exist (yet).
    #[error("Log file not found: {0}")]
    NotFound(PathBuf),

    /// Permission denied accessing the log, usually while the game holds a lock.
    #[error("Permission denied: {0}")]
    PermissionDenied(PathBuf),

    /// Offset file could not be read or written.
    #[error("Offset file {path}: {source}")]
    OffsetFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Notify watcher error.
    #[error("File watcher error: {0}")]
    Watch(#[from] notify::Error),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl TailError {
    /// Whether retrying on the next poll is expected to succeed.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::NotFound(_) | Self::PermissionDenied(_))
    }
}
