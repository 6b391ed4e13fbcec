//! Fan-out of change notifications to every registered client.

use std::sync::Arc;

use crate::registry::{ClientId, ClientRegistry};

/// Outcome of one broadcast. Informational only.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct BroadcastReport {
    /// Clients whose queue accepted the payload.
    pub delivered: usize,
    /// Clients removed because their queue was already closed.
    pub pruned: usize,
}

/// Sends payloads to a snapshot of the registry.
///
/// Each send is a non-blocking enqueue on the client's outbound queue; the
/// connection handler performs the network write. Only a closed queue prunes
/// a client, and that never affects the others.
#[derive(Clone)]
pub struct Broadcaster {
    registry: Arc<ClientRegistry>,
}

impl Broadcaster {
    /// Create a broadcaster over `registry`.
    #[must_use]
    pub fn new(registry: Arc<ClientRegistry>) -> Self {
        Self { registry }
    }

    /// Send `payload` to every client registered at call time.
    pub fn broadcast(&self, payload: &str) -> BroadcastReport {
        let mut report = BroadcastReport::default();

        for (id, sender) in self.registry.snapshot() {
            if sender.send(payload.to_owned()).is_ok() {
                report.delivered += 1;
            } else {
                tracing::debug!(client = %id, "Client connection already closed");
                report.pruned += usize::from(self.prune(id));
            }
        }

        report
    }

    fn prune(&self, id: ClientId) -> bool {
        self.registry.remove(id)
    }
}
