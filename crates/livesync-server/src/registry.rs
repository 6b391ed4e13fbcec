//! Client registry.
//!
//! Tracks the outbound queue of every connected client. The lock is held
//! only for the map operation itself, never across a send, so a slow client
//! cannot stall registration or other deliveries.
//!
//! Queues are unbounded: a burst of changes never costs a healthy client its
//! connection. A client that stops reading is caught by the write timeout in
//! its connection handler instead.

use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use tokio::sync::mpsc;

/// Sending half of a client's outbound queue.
pub type ClientSender = mpsc::UnboundedSender<String>;

/// Identifier of a registered client.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ClientId(u64);

impl fmt::Display for ClientId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Default)]
struct Clients {
    senders: HashMap<ClientId, ClientSender>,
    /// Set by [`ClientRegistry::close_all`]; later inserts are refused.
    closed: bool,
}

/// Concurrent set of connected clients.
#[derive(Default)]
pub struct ClientRegistry {
    clients: RwLock<Clients>,
    next_id: AtomicU64,
}

impl ClientRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new client with a fresh outbound queue.
    ///
    /// Returns the client id and the receiving half the connection handler
    /// drains. The receiver yields `None` once the client is removed.
    pub fn connect(&self) -> (ClientId, mpsc::UnboundedReceiver<String>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (self.insert(tx), rx)
    }

    /// Register a client's outbound queue.
    ///
    /// After [`close_all`](Self::close_all) the sender is dropped right away,
    /// so the client sees its queue closed.
    pub fn insert(&self, sender: ClientSender) -> ClientId {
        let id = ClientId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let mut clients = self.write();
        if !clients.closed {
            clients.senders.insert(id, sender);
        }
        id
    }

    /// Remove a client. Removing an absent client is a no-op.
    ///
    /// Returns whether the client was present.
    pub fn remove(&self, id: ClientId) -> bool {
        self.write().senders.remove(&id).is_some()
    }

    /// Copy of the current membership for iteration without the lock.
    pub fn snapshot(&self) -> Vec<(ClientId, ClientSender)> {
        self.read()
            .senders
            .iter()
            .map(|(id, sender)| (*id, sender.clone()))
            .collect()
    }

    /// Whether `id` is currently registered.
    pub fn contains(&self, id: ClientId) -> bool {
        self.read().senders.contains_key(&id)
    }

    /// Number of registered clients.
    pub fn len(&self) -> usize {
        self.read().senders.len()
    }

    /// Whether no clients are registered.
    pub fn is_empty(&self) -> bool {
        self.read().senders.is_empty()
    }

    /// Remove every client and refuse new ones.
    ///
    /// Dropping the senders closes each client's queue, which makes its
    /// connection handler send a Close frame and exit. Returns the number of
    /// clients removed.
    pub fn close_all(&self) -> usize {
        let mut clients = self.write();
        clients.closed = true;
        let closed = clients.senders.len();
        clients.senders.clear();
        closed
    }

    fn read(&self) -> RwLockReadGuard<'_, Clients> {
        self.clients.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Clients> {
        self.clients.write().unwrap_or_else(PoisonError::into_inner)
    }
}
