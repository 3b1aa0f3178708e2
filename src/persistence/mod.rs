//! Persistence tiers: the durable key-value store and the fallback store.
//!
//! The durable tier is an async key/value interface over a per-origin store
//! with two partitions, `vehicles` and `buckets`, each holding one
//! serialized snapshot per key. The fallback tier is a synchronous string
//! store used when the durable tier is unavailable and for warm starts.

pub mod fallback;
pub mod memory;
pub mod sqlite;

use std::fmt;

use async_trait::async_trait;
use serde_json::Value;

use crate::error::CacheError;

pub use fallback::{FallbackStore, FileFallbackStore, MemoryFallbackStore, NoFallbackStore};
pub use memory::MemoryDurableStore;
pub use sqlite::SqliteDurableStore;

/// Named partition inside the durable store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Partition {
    /// Raw listing snapshots.
    Vehicles,
    /// Derived bucket snapshots.
    Buckets,
}

impl Partition {
    /// Every partition the store must provide.
    pub const ALL: [Self; 2] = [Self::Vehicles, Self::Buckets];

    /// Partition name as created in the underlying store.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Vehicles => "vehicles",
            Self::Buckets => "buckets",
        }
    }
}

impl fmt::Display for Partition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Async key/value contract of the durable tier.
///
/// Environments without a durable facility resolve every call to
/// "absent"/no-op (see [`UnsupportedStore`]); real failures come back as
/// `Err` and the caches treat them as a miss.
#[async_trait]
pub trait DurableStore: Send + Sync + fmt::Debug {
    /// Reads the value under `key`.
    ///
    /// # Errors
    ///
    /// Returns [`CacheError::Durable`] when the store cannot be reached.
    async fn get(&self, partition: Partition, key: &str) -> Result<Option<Value>, CacheError>;

    /// Replaces the value under `key`.
    ///
    /// # Errors
    ///
    /// Returns [`CacheError::Durable`] when the write fails.
    async fn set(&self, partition: Partition, key: &str, value: &Value) -> Result<(), CacheError>;

    /// Removes the value under `key`. Removing a missing key is not an error.
    ///
    /// # Errors
    ///
    /// Returns [`CacheError::Durable`] when the delete fails.
    async fn delete(&self, partition: Partition, key: &str) -> Result<(), CacheError>;
}

/// Durable store for environments that have none.
#[derive(Debug, Clone, Copy, Default)]
pub struct UnsupportedStore;

#[async_trait]
impl DurableStore for UnsupportedStore {
    async fn get(&self, _partition: Partition, _key: &str) -> Result<Option<Value>, CacheError> {
        Ok(None)
    }

    async fn set(
        &self,
        _partition: Partition,
        _key: &str,
        _value: &Value,
    ) -> Result<(), CacheError> {
        Ok(())
    }

    async fn delete(&self, _partition: Partition, _key: &str) -> Result<(), CacheError> {
        Ok(())
    }
}
