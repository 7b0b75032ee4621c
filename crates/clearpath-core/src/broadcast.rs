//! Fan-out of [`ServerEvent`]s to every connected observer.
//!
//! Delivery is at-most-once. An observer that falls more than
//! [`BROADCAST_CAPACITY`] events behind gets a
//! [`broadcast::error::RecvError::Lagged`] and resumes from the newest
//! event; nothing is retried. Sending with no observers is not an error.

use clearpath_types::ServerEvent;
use tokio::sync::broadcast;
use tracing::trace;

/// Capacity of the event channel.
pub const BROADCAST_CAPACITY: usize = 256;

/// Cloneable handle to the event channel.
#[derive(Debug, Clone)]
pub struct Broadcaster {
    tx: broadcast::Sender<ServerEvent>,
}

impl Broadcaster {
    /// Create a channel with [`BROADCAST_CAPACITY`].
    pub fn new() -> Self {
        Self::with_capacity(BROADCAST_CAPACITY)
    }

    /// Create a channel with the given capacity.
    pub fn with_capacity(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    /// Subscribe a new observer. It sees only events sent after this call.
    pub fn subscribe(&self) -> broadcast::Receiver<ServerEvent> {
        self.tx.subscribe()
    }

    /// Push an event to all current observers.
    ///
    /// Returns the number of observers that will receive it.
    pub fn broadcast(&self, event: ServerEvent) -> usize {
        let name = event.name();
        // send returns Err only when there are zero receivers.
        let receivers = self.tx.send(event).unwrap_or(0);
        trace!(event = name, receivers, "event broadcast");
        receivers
    }

    /// Number of currently subscribed observers.
    pub fn observer_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for Broadcaster {
    fn default() -> Self {
        Self::new()
    }
}
