//! Server error types.

use livesync_watch::WatchError;

use crate::lifecycle::LifecycleError;

/// Error returned when the live reload server cannot start or run.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    /// Watch root invalid or watcher could not be started.
    #[error(transparent)]
    Watch(#[from] WatchError),
    /// Listener could not be bound.
    #[error("Failed to bind {address}: {source}")]
    Bind {
        /// Requested `host:port`.
        address: String,
        /// Underlying I/O error.
        source: std::io::Error,
    },
    /// I/O error while serving.
    #[error("Server error: {0}")]
    Io(#[from] std::io::Error),
    /// Lifecycle violated.
    #[error(transparent)]
    Lifecycle(#[from] LifecycleError),
}
