//! Storage-change events published after every cache mutation.
//!
//! These are the cross-context signal: other holders of the same durable
//! store (another process, another WebSocket client) learn that a key
//! changed and drop their in-memory copy. Delivery is best effort.

use chrono::{DateTime, Utc};
use serde::Serialize;

/// What happened to a cache key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeKind {
    /// A new snapshot was written.
    Written,
    /// The cache was cleared.
    Cleared,
}

/// Domain event emitted after every write or clear.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event_type", rename_all = "snake_case")]
pub enum CacheEvent {
    /// The value stored under `key` changed.
    StorageChange {
        /// Fixed storage key of the cache that changed.
        key: String,
        /// Whether the key was written or cleared.
        kind: ChangeKind,
        /// `updated_at` of the new snapshot; absent after a clear.
        #[serde(skip_serializing_if = "Option::is_none")]
        updated_at: Option<DateTime<Utc>>,
        /// Number of items in the new snapshot.
        item_count: usize,
        /// Time the event was emitted.
        timestamp: DateTime<Utc>,
    },
}

impl CacheEvent {
    /// Returns the storage key this event refers to.
    #[must_use]
    pub fn key(&self) -> &str {
        match self {
            Self::StorageChange { key, .. } => key,
        }
    }

    /// Returns the event type as a static string slice.
    #[must_use]
    pub const fn event_type_str(&self) -> &'static str {
        match self {
            Self::StorageChange { .. } => "storage_change",
        }
    }
}
