//! In-process durable store for tests and database-less deployments.

use std::collections::HashMap;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::RwLock;

use super::{DurableStore, Partition};
use crate::error::CacheError;

/// Durable store backed by a `HashMap` behind a [`RwLock`].
///
/// Values are cloned in and out, so a caller can never alias what the
/// store holds.
#[derive(Debug, Default)]
pub struct MemoryDurableStore {
    entries: RwLock<HashMap<(Partition, String), Value>>,
}

impl MemoryDurableStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored keys across all partitions.
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    /// Returns `true` if nothing is stored.
    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

#[async_trait]
impl DurableStore for MemoryDurableStore {
    async fn get(&self, partition: Partition, key: &str) -> Result<Option<Value>, CacheError> {
        let map = self.entries.read().await;
        Ok(map.get(&(partition, key.to_string())).cloned())
    }

    async fn set(&self, partition: Partition, key: &str, value: &Value) -> Result<(), CacheError> {
        let mut map = self.entries.write().await;
        map.insert((partition, key.to_string()), value.clone());
        Ok(())
    }

    async fn delete(&self, partition: Partition, key: &str) -> Result<(), CacheError> {
        let mut map = self.entries.write().await;
        map.remove(&(partition, key.to_string()));
        Ok(())
    }
}
