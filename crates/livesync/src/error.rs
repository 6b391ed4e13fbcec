//! CLI error types.

use livesync_config::ConfigError;
use livesync_seed::SeedError;
use livesync_server::ServerError;
use livesync_watch::WatchError;

/// CLI error type.
#[derive(Debug, thiserror::Error)]
pub(crate) enum CliError {
    #[error("{0}")]
    Config(#[from] ConfigError),

    #[error("{0}")]
    Watch(#[from] WatchError),

    #[error("{0}")]
    Seed(#[from] SeedError),

    #[error("{0}")]
    Server(#[from] ServerError),
}
