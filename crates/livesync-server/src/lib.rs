//! WebSocket live reload server for livesync.
//!
//! Bridges the filesystem change detector into an axum server and fans every
//! change out to the connected clients as a plain text frame holding the
//! root-relative path (e.g. `css/app.css`).
//!
//! # Quick Start
//!
//! ```ignore
//! use std::path::PathBuf;
//! use livesync_server::{ServerConfig, run_server};
//!
//! #[tokio::main]
//! async fn main() {
//!     let config = ServerConfig {
//!         host: "0.0.0.0".to_string(),
//!         port: 12345,
//!         root: PathBuf::from("/var/www/html"),
//!         extensions: vec!["css".to_string(), "js".to_string()],
//!     };
//!
//!     run_server(config).await.unwrap();
//! }
//! ```
//!
//! # Architecture
//!
//! ```text
//! notify ──► livesync-watch thread ──BridgeSender──► bridge task (tokio)
//!                                                        │
//!                                                        └─► Broadcaster ──snapshot──► ClientRegistry
//!                                                                │
//!                                                                └─► per-client queue ──► WebSocket handler ──► client
//! ```
//!
//! # Shutdown
//!
//! On the shutdown signal the detector is stopped and joined first, then
//! every client queue is closed without draining. Each connection handler
//! reacts by sending a Close frame and exiting, but nothing waits for it:
//! graceful shutdown stops the accept loop without tracking upgraded
//! WebSocket tasks, so a handler still running when the runtime is dropped
//! is cancelled and its client just sees the socket go away. The bridge task
//! is aborted last.

mod app;
pub mod bridge;
mod broadcaster;
mod error;
mod lifecycle;
mod registry;
mod state;
mod websocket;

use std::future::Future;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use livesync_watch::{ChangeDetector, validate_root};
use tokio::net::TcpListener;

pub use bridge::{BridgeReceiver, BridgeSender};
pub use broadcaster::{BroadcastReport, Broadcaster};
pub use error::ServerError;
pub use lifecycle::{Lifecycle, LifecycleError, Phase};
pub use registry::{ClientId, ClientRegistry, ClientSender};
use state::AppState;

/// Server configuration.
#[derive(Clone, Debug)]
pub struct ServerConfig {
    /// Host address to bind to.
    pub host: String,
    /// Port to listen on.
    ///
    /// `0` picks a free port. Only the programmatic API accepts it;
    /// configuration files and CLI flags reject `0`.
    pub port: u16,
    /// Directory tree to watch.
    pub root: PathBuf,
    /// Extensions that trigger a broadcast.
    pub extensions: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_owned(),
            port: 12345,
            root: PathBuf::from("/var/www/html"),
            extensions: vec!["css".to_owned(), "js".to_owned()],
        }
    }
}

/// Create server configuration from livesync config.
#[must_use]
pub fn server_config_from_config(config: &livesync_config::Config) -> ServerConfig {
    ServerConfig {
        host: config.server.host.clone(),
        port: config.server.port,
        root: config.watch_resolved.root.clone(),
        extensions: config.watch_resolved.extensions.clone(),
    }
}

/// A bound live reload server that has not started serving yet.
pub struct Server {
    listener: TcpListener,
    root: PathBuf,
    extensions: Vec<String>,
    registry: Arc<ClientRegistry>,
    bridge_tx: BridgeSender,
    bridge_rx: BridgeReceiver,
    lifecycle: Arc<Lifecycle>,
}

impl Server {
    /// Validate the watch root and bind the listener.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError::Watch`] if the root is missing or not a
    /// directory (nothing is bound in that case), or [`ServerError::Bind`]
    /// if the address cannot be bound.
    pub async fn bind(config: ServerConfig) -> Result<Self, ServerError> {
        Self::bind_tracked(config, Arc::new(Lifecycle::new())).await
    }

    /// [`bind`](Self::bind) reporting into a caller-owned lifecycle, which is
    /// walked to `Stopped` if startup fails.
    async fn bind_tracked(
        config: ServerConfig,
        lifecycle: Arc<Lifecycle>,
    ) -> Result<Self, ServerError> {
        lifecycle.transition(Phase::Starting)?;

        let acquired = async {
            let root = validate_root(&config.root)?;
            let address = format!("{}:{}", config.host, config.port);
            let listener = TcpListener::bind((config.host.as_str(), config.port))
                .await
                .map_err(|source| ServerError::Bind { address, source })?;
            Ok::<_, ServerError>((root, listener))
        }
        .await;

        let (root, listener) = match acquired {
            Ok(acquired) => acquired,
            Err(e) => {
                abort_start(&lifecycle)?;
                return Err(e);
            }
        };

        let (bridge_tx, bridge_rx) = bridge::channel();

        Ok(Self {
            listener,
            root,
            extensions: config.extensions,
            registry: Arc::new(ClientRegistry::new()),
            bridge_tx,
            bridge_rx,
            lifecycle,
        })
    }

    /// Address the listener is bound to.
    ///
    /// # Errors
    ///
    /// Returns an error if the socket address cannot be queried.
    pub fn local_addr(&self) -> Result<SocketAddr, ServerError> {
        Ok(self.listener.local_addr()?)
    }

    /// Canonical watch root.
    pub fn root(&self) -> &std::path::Path {
        &self.root
    }

    /// Registry of connected clients.
    pub fn registry(&self) -> Arc<ClientRegistry> {
        Arc::clone(&self.registry)
    }

    /// Lifecycle tracker.
    pub fn lifecycle(&self) -> Arc<Lifecycle> {
        Arc::clone(&self.lifecycle)
    }

    /// Additional bridge sender, for submitting payloads without the detector.
    pub fn bridge(&self) -> BridgeSender {
        self.bridge_tx.clone()
    }

    /// Start the detector and serve until `shutdown` resolves.
    ///
    /// # Errors
    ///
    /// Returns an error if the detector cannot be started or the server
    /// fails while running.
    pub async fn run<F>(self, shutdown: F) -> Result<(), ServerError>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let Self {
            listener,
            root,
            extensions,
            registry,
            bridge_tx,
            bridge_rx,
            lifecycle,
        } = self;

        let bridge_task = tokio::spawn(bridge_rx.run(Broadcaster::new(Arc::clone(&registry))));

        let detector = match ChangeDetector::new(root, &extensions).start(bridge_tx) {
            Ok(handle) => handle,
            Err(e) => {
                bridge_task.abort();
                abort_start(&lifecycle)?;
                return Err(e.into());
            }
        };

        let app = app::create_router(Arc::new(AppState {
            registry: Arc::clone(&registry),
        }));

        lifecycle.transition(Phase::Running)?;
        tracing::info!(address = %listener.local_addr()?, "Live reload server running");

        let graceful = {
            let lifecycle = Arc::clone(&lifecycle);
            let registry = Arc::clone(&registry);
            async move {
                shutdown.await;
                if let Err(e) = lifecycle.transition(Phase::Stopping) {
                    tracing::warn!(error = %e, "Unexpected lifecycle state at shutdown");
                }

                // Join the detector off the runtime so no event outlives the bridge
                if tokio::task::spawn_blocking(move || detector.stop())
                    .await
                    .is_err()
                {
                    tracing::warn!("Failed to join change detector");
                }

                let closed = registry.close_all();
                tracing::info!(clients = closed, "Closed client connections");
            }
        };

        let served = axum::serve(listener, app)
            .with_graceful_shutdown(graceful)
            .await;

        // Pending payloads have no recipients left
        bridge_task.abort();
        let _ = bridge_task.await;

        if lifecycle.phase() == Phase::Running {
            lifecycle.transition(Phase::Stopping)?;
        }
        lifecycle.transition(Phase::Stopped)?;

        served?;
        Ok(())
    }
}

/// Walk a lifecycle stuck in `Starting` through to `Stopped`.
fn abort_start(lifecycle: &Lifecycle) -> Result<(), LifecycleError> {
    lifecycle.transition(Phase::Stopping)?;
    lifecycle.transition(Phase::Stopped)
}

/// Run the server until Ctrl-C (or SIGTERM on unix).
///
/// # Errors
///
/// Returns an error if the watch root is invalid, the listener cannot be
/// bound, or the server fails while running.
pub async fn run_server(config: ServerConfig) -> Result<(), ServerError> {
    let server = Server::bind(config).await?;
    server.run(shutdown_signal()).await
}

/// Wait for a shutdown signal (Ctrl-C, or SIGTERM on unix).
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {}
        () = terminate => {}
    }

    tracing::info!("Shutdown signal received, stopping server...");
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_server_config_from_config() {
        let config = livesync_config::Config::default();
        let server_config = server_config_from_config(&config);

        assert_eq!(server_config.host, "0.0.0.0");
        assert_eq!(server_config.port, 12345);
        assert_eq!(server_config.root, PathBuf::from("/var/www/html"));
        assert_eq!(server_config.extensions, vec!["css", "js"]);
    }

    #[tokio::test]
    async fn test_bind_rejects_missing_root() {
        let dir = tempfile::tempdir().unwrap();
        let config = ServerConfig {
            host: "127.0.0.1".to_owned(),
            port: 0,
            root: dir.path().join("missing"),
            ..ServerConfig::default()
        };

        let result = Server::bind(config).await;

        assert!(matches!(
            result,
            Err(ServerError::Watch(livesync_watch::WatchError::NotFound(_)))
        ));
    }

    #[tokio::test]
    async fn test_failed_bind_finishes_lifecycle() {
        let dir = tempfile::tempdir().unwrap();
        let config = ServerConfig {
            host: "127.0.0.1".to_owned(),
            port: 0,
            root: dir.path().join("missing"),
            ..ServerConfig::default()
        };
        let lifecycle = Arc::new(Lifecycle::new());

        let result = Server::bind_tracked(config, Arc::clone(&lifecycle)).await;

        assert!(result.is_err());
        assert_eq!(lifecycle.phase(), Phase::Stopped);
        assert!(lifecycle.is_finished());
    }

    #[tokio::test]
    async fn test_bind_port_zero_picks_free_port() {
        let dir = tempfile::tempdir().unwrap();
        let config = ServerConfig {
            host: "127.0.0.1".to_owned(),
            port: 0,
            root: dir.path().to_path_buf(),
            ..ServerConfig::default()
        };

        let server = Server::bind(config).await.unwrap();

        assert_ne!(server.local_addr().unwrap().port(), 0);
    }

    #[tokio::test]
    async fn test_bind_reports_canonical_root() {
        let dir = tempfile::tempdir().unwrap();
        let config = ServerConfig {
            host: "127.0.0.1".to_owned(),
            port: 0,
            root: dir.path().to_path_buf(),
            ..ServerConfig::default()
        };

        let server = Server::bind(config).await.unwrap();

        assert_eq!(server.root(), dir.path().canonicalize().unwrap());
        assert_eq!(server.lifecycle().phase(), Phase::Starting);
        assert!(server.registry().is_empty());
    }

    #[tokio::test]
    async fn test_run_stops_on_shutdown() {
        let dir = tempfile::tempdir().unwrap();
        let config = ServerConfig {
            host: "127.0.0.1".to_owned(),
            port: 0,
            root: dir.path().to_path_buf(),
            ..ServerConfig::default()
        };
        let server = Server::bind(config).await.unwrap();
        let lifecycle = server.lifecycle();

        server.run(async {}).await.unwrap();

        assert_eq!(lifecycle.phase(), Phase::Stopped);
        assert!(lifecycle.is_finished());
    }
}
