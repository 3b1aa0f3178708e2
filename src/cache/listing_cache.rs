//! Cache of the raw listing snapshot.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};

use super::snapshot_cache::{CacheKey, CacheTiers, Snapshot, SnapshotCache};
use super::{DEFAULT_TTL, Subscription, is_stale};
use crate::domain::{Listing, ListingSnapshot};
use crate::persistence::Partition;

/// Storage location of the listing snapshot.
pub const LISTINGS_KEY: CacheKey = CacheKey {
    partition: Partition::Vehicles,
    key: "vehicles_cache_v1",
};

impl Snapshot for ListingSnapshot {
    fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    fn item_count(&self) -> usize {
        self.len()
    }
}

/// Multi-tier cache of the current [`ListingSnapshot`].
///
/// Construct one per process and share it behind an `Arc`.
#[derive(Debug)]
pub struct ListingCache {
    inner: SnapshotCache<ListingSnapshot>,
}

impl ListingCache {
    /// Creates an empty cache over `tiers`.
    #[must_use]
    pub fn new(tiers: CacheTiers) -> Self {
        Self {
            inner: SnapshotCache::new(LISTINGS_KEY, tiers),
        }
    }

    /// Current snapshot from the first tier that has one, if any.
    pub async fn read(&self) -> Option<Arc<ListingSnapshot>> {
        self.inner.read().await
    }

    /// Memory or fallback snapshot without awaiting the durable store.
    pub fn peek(&self) -> Option<Arc<ListingSnapshot>> {
        self.inner.peek()
    }

    /// Stamps `listings` with the current time and writes them through all
    /// tiers, then notifies subscribers.
    pub async fn write(&self, listings: Vec<Listing>) -> Arc<ListingSnapshot> {
        self.inner
            .write_with(move || ListingSnapshot::new(listings))
            .await
    }

    /// Writes a snapshot built elsewhere, keeping its timestamp.
    pub async fn write_snapshot(&self, snapshot: ListingSnapshot) -> Arc<ListingSnapshot> {
        self.inner.write(snapshot).await
    }

    /// Registers a listener for new snapshots.
    pub fn subscribe<F>(&self, listener: F) -> Subscription
    where
        F: Fn(&Arc<ListingSnapshot>) + Send + Sync + 'static,
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

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    use async_trait::async_trait;
    use serde_json::Value;
    use tokio::sync::Notify;

    use crate::cache::{DiagnosticHook, Tier};
    use crate::domain::{EventBus, VehicleAttributes, now_millis};
    use crate::error::CacheError;
    use crate::persistence::{
        DurableStore, FallbackStore, MemoryDurableStore, MemoryFallbackStore, NoFallbackStore,
    };

    #[derive(Debug)]
    struct BrokenStore;

    #[async_trait]
    impl DurableStore for BrokenStore {
        async fn get(&self, _p: Partition, _k: &str) -> Result<Option<Value>, CacheError> {
            Err(CacheError::Durable("quota exceeded".to_string()))
        }
        async fn set(&self, _p: Partition, _k: &str, _v: &Value) -> Result<(), CacheError> {
            Err(CacheError::Durable("quota exceeded".to_string()))
        }
        async fn delete(&self, _p: Partition, _k: &str) -> Result<(), CacheError> {
            Err(CacheError::Durable("quota exceeded".to_string()))
        }
    }

    #[derive(Debug)]
    struct BrokenFallback;

    impl FallbackStore for BrokenFallback {
        fn get_item(&self, _key: &str) -> Result<Option<String>, CacheError> {
            Err(CacheError::Fallback("access denied".to_string()))
        }
        fn set_item(&self, _key: &str, _value: &str) -> Result<(), CacheError> {
            Err(CacheError::Fallback("access denied".to_string()))
        }
        fn remove_item(&self, _key: &str) -> Result<(), CacheError> {
            Err(CacheError::Fallback("access denied".to_string()))
        }
    }

    /// Durable store whose next `get` parks after loading until released.
    #[derive(Debug, Default)]
    struct GatedStore {
        inner: MemoryDurableStore,
        hold_next_get: AtomicBool,
        entered: Notify,
        release: Notify,
    }

    #[async_trait]
    impl DurableStore for GatedStore {
        async fn get(&self, p: Partition, k: &str) -> Result<Option<Value>, CacheError> {
            let loaded = self.inner.get(p, k).await;
            if self.hold_next_get.swap(false, Ordering::SeqCst) {
                self.entered.notify_one();
                self.release.notified().await;
            }
            loaded
        }
        async fn set(&self, p: Partition, k: &str, v: &Value) -> Result<(), CacheError> {
            self.inner.set(p, k, v).await
        }
        async fn delete(&self, p: Partition, k: &str) -> Result<(), CacheError> {
            self.inner.delete(p, k).await
        }
    }

    fn counting_hook() -> (DiagnosticHook, Arc<AtomicUsize>) {
        let count = Arc::new(AtomicUsize::new(0));
        let hook = {
            let count = Arc::clone(&count);
            DiagnosticHook::new(move |_| {
                count.fetch_add(1, Ordering::SeqCst);
            })
        };
        (hook, count)
    }

    fn camry(id: &str, price: f64) -> Listing {
        Listing {
            id: id.to_string(),
            attributes: VehicleAttributes {
                brand: Some("Toyota".to_string()),
                model: Some("Camry".to_string()),
                year: Some(2020),
                ..VehicleAttributes::default()
            },
            price: Some(price),
            currency: Some("USD".to_string()),
            seller_id: "s1".to_string(),
            ..Listing::default()
        }
    }

    #[tokio::test]
    async fn write_then_read_returns_same_listings() {
        let cache = ListingCache::new(CacheTiers::memory_only());
        let before = now_millis();
        let input = vec![camry("a", 1.0), camry("b", 2.0)];

        let _ = cache.write(input.clone()).await;
        let Some(snapshot) = cache.read().await else {
            panic!("snapshot expected");
        };
        assert_eq!(snapshot.listings, input);
        assert!(snapshot.updated_at >= before);
    }

    #[tokio::test]
    async fn empty_cache_reads_absent() {
        let cache = ListingCache::new(CacheTiers::memory_only());
        assert!(cache.read().await.is_none());
        assert!(cache.peek().is_none());
    }

    #[tokio::test]
    async fn durable_hit_is_promoted_into_memory() {
        let durable = Arc::new(MemoryDurableStore::new());
        let tiers = CacheTiers::new(
            Arc::clone(&durable) as Arc<dyn DurableStore>,
            Arc::new(NoFallbackStore),
        );

        let writer = ListingCache::new(tiers.clone());
        let written = writer.write(vec![camry("a", 1.0)]).await;

        // a second process sharing the durable store
        let reader = ListingCache::new(tiers);
        assert!(reader.peek().is_none());
        let Some(loaded) = reader.read().await else {
            panic!("durable tier should hit");
        };
        assert_eq!(*loaded, *written);

        let _ = durable.delete(Partition::Vehicles, LISTINGS_KEY.key).await;
        let Some(again) = reader.read().await else {
            panic!("memory tier should hold the promoted copy");
        };
        assert!(Arc::ptr_eq(&loaded, &again));
    }

    #[tokio::test]
    async fn fallback_answers_when_durable_is_broken() {
        let fallback = Arc::new(MemoryFallbackStore::new());
        let failures = Arc::new(Mutex::new(Vec::new()));
        let hook = {
            let failures = Arc::clone(&failures);
            DiagnosticHook::new(move |d| {
                failures
                    .lock()
                    .unwrap_or_else(std::sync::PoisonError::into_inner)
                    .push((d.tier, d.operation));
            })
        };
        let tiers = CacheTiers::new(
            Arc::new(BrokenStore),
            Arc::clone(&fallback) as Arc<dyn FallbackStore>,
        )
        .with_diagnostics(hook);

        let writer = ListingCache::new(tiers.clone());
        let _ = writer.write(vec![camry("a", 1.0)]).await;

        let reader = ListingCache::new(tiers);
        let Some(snapshot) = reader.read().await else {
            panic!("fallback tier should hit");
        };
        assert_eq!(snapshot.len(), 1);

        let seen = failures
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .clone();
        assert!(seen.iter().all(|(tier, _)| *tier == Tier::Durable));
        assert_eq!(seen.len(), 2);
    }

    #[tokio::test]
    async fn every_tier_failing_reads_absent() {
        let (hook, failures) = counting_hook();
        let cache = ListingCache::new(
            CacheTiers::new(Arc::new(BrokenStore), Arc::new(BrokenFallback)).with_diagnostics(hook),
        );

        assert!(cache.read().await.is_none());
        assert_eq!(failures.load(Ordering::SeqCst), 2);
        assert!(cache.peek().is_none());
        assert_eq!(failures.load(Ordering::SeqCst), 3);

        let written = cache.write(vec![camry("a", 1.0)]).await;
        assert_eq!(failures.load(Ordering::SeqCst), 5);
        let Some(current) = cache.read().await else {
            panic!("memory tier should still hold the write");
        };
        assert!(Arc::ptr_eq(&current, &written));
    }

    #[tokio::test]
    async fn clear_during_durable_load_is_not_undone() {
        let durable = Arc::new(GatedStore::default());
        let tiers = CacheTiers::new(
            Arc::clone(&durable) as Arc<dyn DurableStore>,
            Arc::new(NoFallbackStore),
        );
        let _ = ListingCache::new(tiers.clone())
            .write(vec![camry("a", 1.0)])
            .await;

        let cache = Arc::new(ListingCache::new(tiers));
        durable.hold_next_get.store(true, Ordering::SeqCst);
        let reader = {
            let cache = Arc::clone(&cache);
            tokio::spawn(async move { cache.read().await })
        };

        durable.entered.notified().await;
        cache.clear().await;
        durable.release.notify_one();

        let Ok(loaded) = reader.await else {
            panic!("reader task failed");
        };
        assert!(loaded.is_none());
        assert!(cache.peek().is_none());
        assert!(cache.read().await.is_none());
    }

    #[tokio::test]
    async fn corrupt_fallback_value_is_a_miss_and_is_kept() {
        let fallback = Arc::new(MemoryFallbackStore::new());
        let _ = fallback.set_item(LISTINGS_KEY.key, "{not json");
        let cache = ListingCache::new(CacheTiers::new(
            Arc::new(crate::persistence::UnsupportedStore),
            Arc::clone(&fallback) as Arc<dyn FallbackStore>,
        ));

        assert!(cache.read().await.is_none());
        let kept = fallback.get_item(LISTINGS_KEY.key).ok().flatten();
        assert_eq!(kept.as_deref(), Some("{not json"));
    }

    #[tokio::test]
    async fn subscribers_see_writes_in_order_until_unsubscribed() {
        let cache = ListingCache::new(CacheTiers::memory_only());
        let sizes = Arc::new(Mutex::new(Vec::new()));
        let other = Arc::new(AtomicUsize::new(0));

        let sub = {
            let sizes = Arc::clone(&sizes);
            cache.subscribe(move |snap| {
                sizes
                    .lock()
                    .unwrap_or_else(std::sync::PoisonError::into_inner)
                    .push(snap.len());
            })
        };
        let _keep = {
            let other = Arc::clone(&other);
            cache.subscribe(move |_| {
                other.fetch_add(1, Ordering::SeqCst);
            })
        };

        let _ = cache.write(vec![camry("a", 1.0)]).await;
        let _ = cache.write(vec![camry("a", 1.0), camry("b", 2.0)]).await;
        sub.unsubscribe();
        let _ = cache.write(Vec::new()).await;

        let sizes = sizes
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .clone();
        assert_eq!(sizes, vec![1, 2]);
        assert_eq!(other.load(Ordering::SeqCst), 3);
        assert_eq!(cache.listener_count(), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_writes_notify_in_commit_order() {
        let cache = Arc::new(ListingCache::new(CacheTiers::memory_only()));
        let seen = Arc::new(Mutex::new(Vec::new()));
        let _sub = {
            let seen = Arc::clone(&seen);
            cache.subscribe(move |snap| {
                seen.lock()
                    .unwrap_or_else(std::sync::PoisonError::into_inner)
                    .push(snap.updated_at);
            })
        };

        let mut writers = Vec::new();
        for i in 0..16 {
            let cache = Arc::clone(&cache);
            writers.push(tokio::spawn(async move {
                cache.write(vec![camry(&format!("w{i}"), 1.0)]).await
            }));
        }
        let mut written = Vec::new();
        for writer in writers {
            let Ok(snapshot) = writer.await else {
                panic!("writer task failed");
            };
            written.push(snapshot.updated_at);
        }

        let seen = seen
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .clone();
        assert_eq!(seen.len(), 16);
        assert!(seen.windows(2).all(|pair| matches!(pair, [a, b] if a < b)));
        for stamp in &written {
            assert_eq!(seen.iter().filter(|s| *s == stamp).count(), 1);
        }
        let Some(current) = cache.read().await else {
            panic!("last write should be current");
        };
        assert_eq!(seen.last(), Some(&current.updated_at));
    }

    #[tokio::test]
    async fn clear_empties_every_tier_and_publishes() {
        let bus = EventBus::new(8);
        let mut rx = bus.subscribe();
        let durable = Arc::new(MemoryDurableStore::new());
        let fallback = Arc::new(MemoryFallbackStore::new());
        let cache = ListingCache::new(
            CacheTiers::new(
                Arc::clone(&durable) as Arc<dyn DurableStore>,
                Arc::clone(&fallback) as Arc<dyn FallbackStore>,
            )
            .with_events(bus),
        );

        let _ = cache.write(vec![camry("a", 1.0)]).await;
        cache.clear().await;

        assert!(cache.read().await.is_none());
        assert!(durable.is_empty().await);
        assert!(matches!(fallback.get_item(LISTINGS_KEY.key), Ok(None)));

        let Ok(written) = rx.recv().await else {
            panic!("write event expected");
        };
        let Ok(cleared) = rx.recv().await else {
            panic!("clear event expected");
        };
        assert_eq!(written.key(), LISTINGS_KEY.key);
        let crate::domain::CacheEvent::StorageChange { kind, .. } = cleared;
        assert_eq!(kind, crate::domain::ChangeKind::Cleared);
    }

    #[tokio::test]
    async fn storage_change_forces_reload_from_durable() {
        let durable = Arc::new(MemoryDurableStore::new());
        let tiers = CacheTiers::new(
            Arc::clone(&durable) as Arc<dyn DurableStore>,
            Arc::new(NoFallbackStore),
        );
        let ours = ListingCache::new(tiers.clone());
        let theirs = ListingCache::new(tiers);

        let _ = ours.write(vec![camry("a", 1.0)]).await;
        let _ = theirs.write(vec![camry("a", 1.0), camry("b", 2.0)]).await;

        assert_eq!(ours.read().await.map(|s| s.len()), Some(1));
        assert!(!ours.handle_storage_change("unrelated_key"));
        assert!(ours.handle_storage_change(LISTINGS_KEY.key));
        assert_eq!(ours.read().await.map(|s| s.len()), Some(2));
    }

    #[test]
    fn is_stale_uses_default_ttl() {
        let cache = ListingCache::new(CacheTiers::memory_only());
        assert!(cache.is_stale(None, None));
        assert!(!cache.is_stale(Some(Utc::now()), None));
        assert!(cache.is_stale(
            Some(Utc::now() - chrono::TimeDelta::seconds(10)),
            Some(Duration::from_secs(1))
        ));
    }

    #[test]
    fn warm_start_reads_fallback_synchronously() {
        let fallback = Arc::new(MemoryFallbackStore::new());
        let tiers = CacheTiers::new(
            Arc::new(crate::persistence::UnsupportedStore),
            Arc::clone(&fallback) as Arc<dyn FallbackStore>,
        );
        let writer = ListingCache::new(tiers.clone());
        let _ = tokio_test::block_on(writer.write(vec![camry("a", 1.0)]));

        let reader = ListingCache::new(tiers);
        let Some(snapshot) = reader.peek() else {
            panic!("fallback warm start expected");
        };
        assert_eq!(snapshot.listings.first().map(|l| l.id.as_str()), Some("a"));
    }
}
