//! Bucket service: serves buckets that always match the current listings.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;

use super::listing_source::ListingSource;
use crate::cache::{BucketCache, DEFAULT_TTL, ListingCache};
use crate::config::{CacheConfig, DEFAULT_BUCKET_ID_LIMIT};
use crate::domain::{BucketSnapshot, Listing, ListingSnapshot};
use crate::error::CacheError;
use crate::worker::AggregationWorker;

/// Freshness and sizing knobs of [`BucketService`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ServiceSettings {
    /// Age after which the listing snapshot is refreshed from the source.
    pub listing_ttl: Duration,
    /// Age after which buckets are recomputed even with matching provenance.
    pub bucket_ttl: Duration,
    /// Maximum member ids recorded per bucket.
    pub id_limit: usize,
}

impl Default for ServiceSettings {
    fn default() -> Self {
        Self {
            listing_ttl: DEFAULT_TTL,
            bucket_ttl: DEFAULT_TTL,
            id_limit: DEFAULT_BUCKET_ID_LIMIT,
        }
    }
}

impl From<&CacheConfig> for ServiceSettings {
    fn from(config: &CacheConfig) -> Self {
        Self {
            listing_ttl: config.listing_ttl,
            bucket_ttl: config.bucket_ttl,
            id_limit: config.bucket_id_limit,
        }
    }
}

/// Orchestrates the listing cache, the bucket cache and the worker.
///
/// Buckets are returned from cache only while their provenance matches the
/// current listing snapshot and they are within TTL; otherwise they are
/// recomputed, written through the bucket cache, and subscribers notified.
#[derive(Debug, Clone)]
pub struct BucketService {
    listings: Arc<ListingCache>,
    buckets: Arc<BucketCache>,
    worker: Arc<AggregationWorker>,
    source: Option<Arc<dyn ListingSource>>,
    settings: ServiceSettings,
    recompute: Arc<Mutex<()>>,
}

impl BucketService {
    /// Creates a service without a listing source; listings arrive through
    /// [`Self::ingest_listings`].
    #[must_use]
    pub fn new(
        listings: Arc<ListingCache>,
        buckets: Arc<BucketCache>,
        worker: Arc<AggregationWorker>,
        settings: ServiceSettings,
    ) -> Self {
        Self {
            listings,
            buckets,
            worker,
            source: None,
            settings,
            recompute: Arc::new(Mutex::new(())),
        }
    }

    /// Refreshes stale listings from `source`.
    #[must_use]
    pub fn with_source(mut self, source: Arc<dyn ListingSource>) -> Self {
        self.source = Some(source);
        self
    }

    /// The listing cache.
    #[must_use]
    pub fn listing_cache(&self) -> &Arc<ListingCache> {
        &self.listings
    }

    /// The bucket cache.
    #[must_use]
    pub fn bucket_cache(&self) -> &Arc<BucketCache> {
        &self.buckets
    }

    /// The aggregation worker.
    #[must_use]
    pub fn worker(&self) -> &Arc<AggregationWorker> {
        &self.worker
    }

    /// Active settings.
    #[must_use]
    pub const fn settings(&self) -> ServiceSettings {
        self.settings
    }

    /// Stores a freshly fetched listing collection.
    pub async fn ingest_listings(&self, listings: Vec<Listing>) -> Arc<ListingSnapshot> {
        let snapshot = self.listings.write(listings).await;
        tracing::info!(count = snapshot.len(), "listings ingested");
        snapshot
    }

    /// Fetches listings from the configured source and stores them.
    ///
    /// # Errors
    ///
    /// Returns [`CacheError::Upstream`] if no source is configured or the
    /// source fails.
    pub async fn refresh_listings(&self) -> Result<Arc<ListingSnapshot>, CacheError> {
        let Some(source) = &self.source else {
            return Err(CacheError::Upstream("no listing source configured".to_string()));
        };
        let listings = source.fetch_listings().await.map_err(|err| match err {
            CacheError::Upstream(_) => err,
            other => CacheError::Upstream(other.to_string()),
        })?;
        Ok(self.ingest_listings(listings).await)
    }

    /// Current listing snapshot, refreshed from the source when absent or
    /// older than the listing TTL. A failed refresh serves what is cached.
    pub async fn current_listings(&self) -> Option<Arc<ListingSnapshot>> {
        let cached = self.listings.read().await;
        let stale = cached.as_ref().is_none_or(|snapshot| {
            self.listings
                .is_stale(Some(snapshot.updated_at), Some(self.settings.listing_ttl))
        });
        if !stale || self.source.is_none() {
            return cached;
        }

        match self.refresh_listings().await {
            Ok(snapshot) => Some(snapshot),
            Err(err) => {
                tracing::warn!(%err, "listing refresh failed, serving cached listings");
                cached
            }
        }
    }

    /// Buckets derived from the current listing snapshot.
    pub async fn current_buckets(&self) -> Arc<BucketSnapshot> {
        let listings = self.current_listings().await;
        if let Some(valid) = self.valid_buckets(listings.as_deref()).await {
            return valid;
        }

        let _guard = self.recompute.lock().await;
        // another caller may have recomputed while we waited
        if let Some(valid) = self.valid_buckets(listings.as_deref()).await {
            return valid;
        }
        self.recompute_for(listings.as_deref()).await
    }

    /// Drops both snapshots from every tier.
    pub async fn clear(&self) {
        self.listings.clear().await;
        self.buckets.clear().await;
        tracing::info!("caches cleared");
    }

    /// Forwards a storage-change signal from another context to both
    /// caches. Returns `true` if either cache was invalidated.
    pub fn handle_storage_change(&self, key: &str) -> bool {
        let listings = self.listings.handle_storage_change(key);
        let buckets = self.buckets.handle_storage_change(key);
        listings || buckets
    }

    async fn valid_buckets(
        &self,
        listings: Option<&ListingSnapshot>,
    ) -> Option<Arc<BucketSnapshot>> {
        self.buckets
            .read_valid_for(listings, Some(self.settings.bucket_ttl))
            .await
    }

    async fn recompute_for(&self, listings: Option<&ListingSnapshot>) -> Arc<BucketSnapshot> {
        let items: &[Listing] = listings
            .map(|snapshot| snapshot.listings.as_slice())
            .unwrap_or_default();
        let buckets = self
            .worker
            .run_bucketing(items, self.settings.id_limit)
            .await;
        let snapshot = self
            .buckets
            .write(buckets, listings.map(|snapshot| snapshot.updated_at))
            .await;
        tracing::info!(
            listings = items.len(),
            buckets = snapshot.buckets.len(),
            "buckets recomputed"
        );
        snapshot
    }
}
