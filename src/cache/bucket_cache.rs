//! Cache of the derived bucket snapshot.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};

use super::snapshot_cache::{CacheKey, CacheTiers, Snapshot, SnapshotCache};
use super::{DEFAULT_TTL, Subscription, is_stale};
use crate::domain::{Bucket, BucketSnapshot, ListingSnapshot};
use crate::persistence::Partition;

/// Storage location of the bucket snapshot.
pub const BUCKETS_KEY: CacheKey = CacheKey {
    partition: Partition::Buckets,
    key: "vehicle_buckets_v1",
};

impl Snapshot for BucketSnapshot {
    fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    fn item_count(&self) -> usize {
        self.buckets.len()
    }
}

/// Multi-tier cache of the current [`BucketSnapshot`].
///
/// Same tier and notification contract as [`super::ListingCache`]; writes
/// also record which listing snapshot the buckets were derived from.
#[derive(Debug)]
pub struct BucketCache {
    inner: SnapshotCache<BucketSnapshot>,
}

impl BucketCache {
    /// Creates an empty cache over `tiers`.
    #[must_use]
    pub fn new(tiers: CacheTiers) -> Self {
        Self {
            inner: SnapshotCache::new(BUCKETS_KEY, tiers),
        }
    }

    /// Current snapshot from the first tier that has one, if any.
    ///
    /// The result may be derived from outdated listings; use
    /// [`Self::read_valid_for`] when that matters.
    pub async fn read(&self) -> Option<Arc<BucketSnapshot>> {
        self.inner.read().await
    }

    /// Current snapshot if it was derived from `listings` and is younger
    /// than `ttl` (default [`DEFAULT_TTL`]).
    pub async fn read_valid_for(
        &self,
        listings: Option<&ListingSnapshot>,
        ttl: Option<Duration>,
    ) -> Option<Arc<BucketSnapshot>> {
        let snapshot = self.read().await?;
        if !snapshot.matches(listings) {
            tracing::debug!(
                derived_from = ?snapshot.source_listings_updated_at,
                current = ?listings.map(|l| l.updated_at),
                "bucket snapshot derived from outdated listings"
            );
            return None;
        }
        if self.is_stale(Some(snapshot.updated_at), ttl) {
            return None;
        }
        Some(snapshot)
    }

    /// Memory or fallback snapshot without awaiting the durable store.
    pub fn peek(&self) -> Option<Arc<BucketSnapshot>> {
        self.inner.peek()
    }

    /// Stamps `buckets` with the current time and the provenance timestamp,
    /// writes them through all tiers, then notifies subscribers.
    pub async fn write(
        &self,
        buckets: Vec<Bucket>,
        source_listings_updated_at: Option<DateTime<Utc>>,
    ) -> Arc<BucketSnapshot> {
        self.inner
            .write_with(move || BucketSnapshot::new(buckets, source_listings_updated_at))
            .await
    }

    /// Writes a snapshot built elsewhere, keeping its timestamps.
    pub async fn write_snapshot(&self, snapshot: BucketSnapshot) -> Arc<BucketSnapshot> {
        self.inner.write(snapshot).await
    }

    /// Registers a listener for new snapshots.
    pub fn subscribe<F>(&self, listener: F) -> Subscription
    where
        F: Fn(&Arc<BucketSnapshot>) + Send + Sync + 'static,
    {
        self.inner.subscribe(listener)
    }

    /// Drops the snapshot from every tier.
    pub async fn clear(&self) {
        self.inner.clear().await;
    }

    /// See [`SnapshotCache::handle_storage_change`].
    pub fn handle_storage_change(&self, key: &str) -> bool {
        self.inner.handle_storage_change(key)
    }

    /// Staleness of `updated_at`; `ttl` defaults to [`DEFAULT_TTL`].
    #[must_use]
    pub fn is_stale(&self, updated_at: Option<DateTime<Utc>>, ttl: Option<Duration>) -> bool {
        is_stale(updated_at, ttl.unwrap_or(DEFAULT_TTL))
    }

    /// Number of registered listeners.
    #[must_use]
    pub fn listener_count(&self) -> usize {
        self.inner.listener_count()
    }

    /// Storage location of this cache.
    #[must_use]
    pub const fn key(&self) -> CacheKey {
        self.inner.key()
    }
}
