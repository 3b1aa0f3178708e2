//! Per-connection subscription manager.
//!
//! Tracks which cache keys a WebSocket client is subscribed to and
//! provides server-side event filtering.

use std::collections::HashSet;

/// Key that subscribes to every cache.
pub const WILDCARD: &str = "*";

/// Manages the set of cache-key subscriptions for a single connection.
#[derive(Debug, Default)]
pub struct SubscriptionManager {
    /// Subscribed keys. Ignored while `subscribe_all` is set.
    keys: HashSet<String>,
    subscribe_all: bool,
}

impl SubscriptionManager {
    /// Creates a new empty subscription manager.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds keys to the subscription set. [`WILDCARD`] enables every key.
    pub fn subscribe(&mut self, keys: &[String]) {
        for key in keys {
            if key == WILDCARD {
                self.subscribe_all = true;
            } else {
                self.keys.insert(key.clone());
            }
        }
    }

    /// Removes keys from the subscription set. [`WILDCARD`] turns the
    /// wildcard off again.
    pub fn unsubscribe(&mut self, keys: &[String]) {
        for key in keys {
            if key == WILDCARD {
                self.subscribe_all = false;
            } else {
                self.keys.remove(key);
            }
        }
    }

    /// Returns `true` if events for `key` should be forwarded.
    #[must_use]
    pub fn matches(&self, key: &str) -> bool {
        self.subscribe_all || self.keys.contains(key)
    }

    /// Returns the number of explicitly subscribed keys.
    #[must_use]
    pub fn count(&self) -> usize {
        self.keys.len()
    }

    /// Returns `true` if the wildcard subscription is active.
    #[must_use]
    pub fn is_subscribed_all(&self) -> bool {
        self.subscribe_all
    }
}
