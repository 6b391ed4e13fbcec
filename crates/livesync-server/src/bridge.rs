//! Hand-off from the change detector thread into the server runtime.
//!
//! The detector runs on its own OS thread. It submits payloads through a
//! [`BridgeSender`], which is a non-blocking push onto an unbounded channel.
//! A single task on the runtime drains the channel in FIFO order and runs one
//! broadcast per payload, so two changes reach every client in the order the
//! detector observed them.

use livesync_watch::EventSink;
use tokio::sync::mpsc;

use crate::broadcaster::Broadcaster;

/// Create a connected bridge pair.
#[must_use]
pub fn channel() -> (BridgeSender, BridgeReceiver) {
    let (tx, rx) = mpsc::unbounded_channel();
    (BridgeSender { tx }, BridgeReceiver { rx })
}

/// Submitting side, usable from any thread.
#[derive(Clone, Debug)]
pub struct BridgeSender {
    tx: mpsc::UnboundedSender<String>,
}

impl EventSink for BridgeSender {
    /// Queue a payload for broadcast. Never blocks.
    ///
    /// If the server side is gone the payload is dropped.
    fn submit(&self, relative_path: String) {
        if let Err(mpsc::error::SendError(path)) = self.tx.send(relative_path) {
            tracing::debug!(path = %path, "Server stopped, dropping change notification");
        }
    }
}

/// Receiving side, driven by a task on the server runtime.
#[derive(Debug)]
pub struct BridgeReceiver {
    rx: mpsc::UnboundedReceiver<String>,
}

impl BridgeReceiver {
    /// Broadcast every submitted payload until all senders are dropped.
    pub async fn run(mut self, broadcaster: Broadcaster) {
        while let Some(payload) = self.rx.recv().await {
            let report = broadcaster.broadcast(&payload);
            tracing::debug!(
                path = %payload,
                delivered = report.delivered,
                pruned = report.pruned,
                "Broadcast change"
            );
        }
    }
}
