//! WebSocket connection handler.
//!
//! Registers each connection, forwards queued payloads as text frames, and
//! deregisters once the peer goes away or the queue is closed.

use std::sync::Arc;
use std::time::Duration;

use axum::extract::State;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::response::IntoResponse;

use crate::state::AppState;

/// Upper bound for a single frame write before the client is considered hung.
const SEND_TIMEOUT: Duration = Duration::from_secs(5);

/// Handle WebSocket upgrade for live reload.
pub(crate) async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    ws.on_upgrade(|socket| handle_socket(socket, state))
}

/// Handle an established WebSocket connection.
async fn handle_socket(mut socket: WebSocket, state: Arc<AppState>) {
    let registry = &state.registry;
    let (id, mut outbound) = registry.connect();
    tracing::info!(client = %id, clients = registry.len(), "Client connected");

    loop {
        tokio::select! {
            // Forward queued payloads to the client
            payload = outbound.recv() => {
                let Some(payload) = payload else {
                    // Pruned by the broadcaster or server shutting down
                    let _ = tokio::time::timeout(SEND_TIMEOUT, socket.send(Message::Close(None))).await;
                    break;
                };
                match tokio::time::timeout(SEND_TIMEOUT, socket.send(Message::Text(payload.into()))).await {
                    Ok(Ok(())) => {}
                    Ok(Err(e)) => {
                        tracing::debug!(client = %id, error = %e, "Send failed");
                        break;
                    }
                    Err(_) => {
                        tracing::warn!(client = %id, "Send timed out");
                        break;
                    }
                }
            }
            // Client messages are ignored; only closure matters
            incoming = socket.recv() => {
                match incoming {
                    Some(Ok(Message::Close(_)) | Err(_)) | None => break,
                    Some(Ok(_)) => {}
                }
            }
        }
    }

    registry.remove(id);
    tracing::info!(client = %id, clients = registry.len(), "Client disconnected");
}
