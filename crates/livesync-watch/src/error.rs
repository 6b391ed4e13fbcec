//! Watcher error types.

use std::path::PathBuf;

/// Error returned when the change detector cannot be started.
#[derive(Debug, thiserror::Error)]
pub enum WatchError {
    /// Watch root does not exist.
    #[error("Watch root does not exist: {}", .0.display())]
    NotFound(PathBuf),
    /// Watch root exists but is not a directory.
    #[error("Watch root is not a directory: {}", .0.display())]
    NotADirectory(PathBuf),
    /// I/O error (canonicalization, thread spawn).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    /// Underlying notify backend failed.
    #[error("File watcher error: {0}")]
    Notify(#[from] notify::Error),
}
