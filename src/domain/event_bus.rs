//! Broadcast channel for storage-change events.
//!
//! Every cache write or clear publishes a [`CacheEvent`] here. WebSocket
//! connections and other holders of the shared stores listen on it.

use tokio::sync::broadcast;

use super::CacheEvent;

/// Fan-out of [`CacheEvent`]s over a [`tokio::sync::broadcast`] ring.
///
/// Receivers that fall behind lose the oldest events; an invalidation
/// signal is best effort.
#[derive(Debug, Clone)]
pub struct EventBus {
    sender: broadcast::Sender<CacheEvent>,
}

impl EventBus {
    /// Creates a bus buffering up to `capacity` events (at least one).
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    /// Sends `event` to every live receiver and returns how many got it.
    /// With no receivers the event is discarded and 0 is returned.
    pub fn publish(&self, event: CacheEvent) -> usize {
        self.sender.send(event).unwrap_or(0)
    }

    /// Receiver for events published from now on.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<CacheEvent> {
        self.sender.subscribe()
    }

    /// Number of live receivers.
    #[must_use]
    pub fn receiver_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(1_024)
    }
}
