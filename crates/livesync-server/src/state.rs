//! Application state.
//!
//! Shared state for the WebSocket handler.

use std::sync::Arc;

use crate::registry::ClientRegistry;

/// Application state shared across all handlers.
pub(crate) struct AppState {
    /// Connected live reload clients.
    pub(crate) registry: Arc<ClientRegistry>,
}
