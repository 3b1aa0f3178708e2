//! Generic multi-tier snapshot cache.
//!
//! [`SnapshotCache`] holds exactly one current snapshot per cache key and
//! layers three tiers behind it:
//!
//! 1. process memory (authoritative for the rest of the process lifetime),
//! 2. the [`DurableStore`] partition for this key,
//! 3. the [`FallbackStore`] item for this key.
//!
//! No public operation returns an error. Tier failures are logged, passed to
//! the optional [`DiagnosticHook`], and then treated as a miss.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tokio::sync::Mutex;

use super::listeners::{ListenerSet, Subscription};
use super::tier::{DiagnosticHook, Tier, TierDiagnostic, TierOperation, TierOutcome};
use crate::domain::{CacheEvent, ChangeKind, EventBus, now_millis, observe_stamp};
use crate::error::CacheError;
use crate::persistence::{
    DurableStore, FallbackStore, MemoryFallbackStore, NoFallbackStore, Partition,
    UnsupportedStore,
};

/// A value a [`SnapshotCache`] can hold.
pub trait Snapshot: Serialize + DeserializeOwned + Send + Sync + 'static {
    /// When the snapshot was produced.
    fn updated_at(&self) -> DateTime<Utc>;

    /// Number of items carried, for logs and change events.
    fn item_count(&self) -> usize;
}

/// Location of a cache's single value in both persistent tiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheKey {
    /// Durable store partition.
    pub partition: Partition,
    /// Fixed key, used verbatim in both the durable and fallback tiers.
    pub key: &'static str,
}

/// Persistent tiers and observers shared by the caches of one process.
#[derive(Debug, Clone)]
pub struct CacheTiers {
    /// Durable key-value store.
    pub durable: Arc<dyn DurableStore>,
    /// Fallback string store.
    pub fallback: Arc<dyn FallbackStore>,
    /// Where storage-change events are published, if anywhere.
    pub events: Option<EventBus>,
    /// Observer of swallowed tier failures.
    pub diagnostics: Option<DiagnosticHook>,
}

impl CacheTiers {
    /// Combines a durable and a fallback store.
    #[must_use]
    pub fn new(durable: Arc<dyn DurableStore>, fallback: Arc<dyn FallbackStore>) -> Self {
        Self {
            durable,
            fallback,
            events: None,
            diagnostics: None,
        }
    }

    /// Tiers for an environment with no persistent storage at all.
    #[must_use]
    pub fn memory_only() -> Self {
        Self::new(Arc::new(UnsupportedStore), Arc::new(NoFallbackStore))
    }

    /// No durable store, in-process fallback store.
    #[must_use]
    pub fn in_process() -> Self {
        Self::new(Arc::new(UnsupportedStore), Arc::new(MemoryFallbackStore::new()))
    }

    /// Publishes storage-change events on `bus`.
    #[must_use]
    pub fn with_events(mut self, bus: EventBus) -> Self {
        self.events = Some(bus);
        self
    }

    /// Reports swallowed tier failures to `hook`.
    #[must_use]
    pub fn with_diagnostics(mut self, hook: DiagnosticHook) -> Self {
        self.diagnostics = Some(hook);
        self
    }
}

/// Multi-tier cache of one snapshot value.
///
/// The memory tier is a single `Arc` replaced on every write; readers get a
/// clone of that `Arc` and must treat it as immutable. Writes are serialized
/// by an async mutex, so persistence and listener notification happen in
/// call order.
///
/// Every change to the memory tier (write, clear, storage-change signal)
/// bumps a generation counter. A value loaded from a persistent tier is only
/// promoted into memory if no such change happened while it was loading.
pub struct SnapshotCache<S: Snapshot> {
    key: CacheKey,
    tiers: CacheTiers,
    memory: RwLock<Option<Arc<S>>>,
    generation: AtomicU64,
    listeners: ListenerSet<S>,
    write_lock: Mutex<()>,
}

impl<S: Snapshot> std::fmt::Debug for SnapshotCache<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SnapshotCache")
            .field("key", &self.key)
            .field("tiers", &self.tiers)
            .field("listeners", &self.listeners.len())
            .finish_non_exhaustive()
    }
}

impl<S: Snapshot> SnapshotCache<S> {
    /// Creates an empty cache over `tiers`.
    #[must_use]
    pub fn new(key: CacheKey, tiers: CacheTiers) -> Self {
        Self {
            key,
            tiers,
            memory: RwLock::new(None),
            generation: AtomicU64::new(0),
            listeners: ListenerSet::new(),
            write_lock: Mutex::new(()),
        }
    }

    /// Storage location of this cache.
    #[must_use]
    pub const fn key(&self) -> CacheKey {
        self.key
    }

    /// Returns the current snapshot, consulting memory, then the durable
    /// store, then the fallback store. The first hit is promoted into memory.
    pub async fn read(&self) -> Option<Arc<S>> {
        let generation = self.generation.load(Ordering::Acquire);
        if let Some(snapshot) = self.memory_snapshot() {
            return Some(snapshot);
        }

        let durable = self
            .tiers
            .durable
            .get(self.key.partition, self.key.key)
            .await;
        match TierOutcome::from_lookup(durable, |value| Ok(serde_json::from_value::<S>(value)?)) {
            TierOutcome::Hit(snapshot) => {
                tracing::debug!(key = self.key.key, tier = "durable", "cache hit");
                return self.promote(snapshot, generation);
            }
            TierOutcome::Miss => {}
            TierOutcome::Failed(err) => self.report(Tier::Durable, TierOperation::Read, &err),
        }

        self.read_fallback(generation)
    }

    /// Synchronous warm start: memory, else the fallback store.
    ///
    /// Never touches the durable store, so it can run before that store has
    /// been opened.
    pub fn peek(&self) -> Option<Arc<S>> {
        let generation = self.generation.load(Ordering::Acquire);
        self.memory_snapshot()
            .or_else(|| self.read_fallback(generation))
    }

    /// Replaces the current snapshot.
    ///
    /// Memory is updated first, then the durable and fallback tiers are
    /// written best effort, then listeners are called synchronously and a
    /// storage-change event is published.
    pub async fn write(&self, snapshot: S) -> Arc<S> {
        self.write_with(move || snapshot).await
    }

    /// Like [`Self::write`], but builds the snapshot once the write lock is
    /// held, so snapshots stamped inside `build` are stamped in write order.
    pub async fn write_with<F>(&self, build: F) -> Arc<S>
    where
        F: FnOnce() -> S,
    {
        let _guard = self.write_lock.lock().await;
        let snapshot = Arc::new(build());
        self.replace_memory(Some(Arc::clone(&snapshot)));

        self.persist(&snapshot).await;
        self.listeners.notify(&snapshot);
        self.publish(ChangeKind::Written, Some(snapshot.as_ref()));

        tracing::debug!(
            key = self.key.key,
            count = snapshot.item_count(),
            "snapshot written"
        );
        snapshot
    }

    /// Drops the snapshot from every tier. Listeners are not called.
    pub async fn clear(&self) {
        let _guard = self.write_lock.lock().await;
        self.replace_memory(None);

        if let Err(err) = self
            .tiers
            .durable
            .delete(self.key.partition, self.key.key)
            .await
        {
            self.report(Tier::Durable, TierOperation::Delete, &err);
        }
        let removed = self
            .on_fallback(|store, key| store.remove_item(key))
            .await;
        if let Err(err) = removed {
            self.report(Tier::Fallback, TierOperation::Delete, &err);
        }

        self.publish(ChangeKind::Cleared, None);
        tracing::debug!(key = self.key.key, "cache cleared");
    }

    /// Registers `listener`, called with every newly written snapshot.
    pub fn subscribe<F>(&self, listener: F) -> Subscription
    where
        F: Fn(&Arc<S>) + Send + Sync + 'static,
    {
        self.listeners.add(listener)
    }

    /// Number of registered listeners.
    #[must_use]
    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }

    /// Reacts to a storage-change signal from another context.
    ///
    /// When `key` names this cache the memory tier is dropped, so the next
    /// [`Self::read`] reloads from the durable store. Returns whether the
    /// signal applied.
    pub fn handle_storage_change(&self, key: &str) -> bool {
        if key != self.key.key {
            return false;
        }
        self.replace_memory(None);
        tracing::debug!(key, "memory tier invalidated by storage change");
        true
    }

    fn memory_snapshot(&self) -> Option<Arc<S>> {
        self.memory
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Swaps the memory tier and starts a new generation.
    fn replace_memory(&self, snapshot: Option<Arc<S>>) {
        let mut memory = self.memory.write().unwrap_or_else(PoisonError::into_inner);
        *memory = snapshot;
        self.generation.fetch_add(1, Ordering::AcqRel);
    }

    fn read_fallback(&self, generation: u64) -> Option<Arc<S>> {
        let item = self.tiers.fallback.get_item(self.key.key);
        match TierOutcome::from_lookup(item, |text| Ok(serde_json::from_str::<S>(&text)?)) {
            TierOutcome::Hit(snapshot) => {
                tracing::debug!(key = self.key.key, tier = "fallback", "cache hit");
                self.promote(snapshot, generation)
            }
            TierOutcome::Miss => None,
            TierOutcome::Failed(err) => {
                self.report(Tier::Fallback, TierOperation::Read, &err);
                None
            }
        }
    }

    /// Installs a snapshot loaded from a persistent tier during `generation`.
    ///
    /// A value already in memory wins. If the memory tier was cleared or
    /// invalidated since the load began, the loaded value is dropped and the
    /// read is a miss.
    fn promote(&self, snapshot: S, generation: u64) -> Option<Arc<S>> {
        let mut memory = self.memory.write().unwrap_or_else(PoisonError::into_inner);
        if let Some(current) = memory.as_ref() {
            return Some(Arc::clone(current));
        }
        if self.generation.load(Ordering::Acquire) != generation {
            tracing::debug!(key = self.key.key, "load overtaken by clear or invalidation");
            return None;
        }
        observe_stamp(snapshot.updated_at());
        let snapshot = Arc::new(snapshot);
        *memory = Some(Arc::clone(&snapshot));
        Some(snapshot)
    }

    async fn persist(&self, snapshot: &S) {
        match serde_json::to_value(snapshot) {
            Ok(value) => {
                if let Err(err) = self
                    .tiers
                    .durable
                    .set(self.key.partition, self.key.key, &value)
                    .await
                {
                    self.report(Tier::Durable, TierOperation::Write, &err);
                }
                let written = match serde_json::to_string(&value) {
                    Ok(text) => {
                        self.on_fallback(move |store, key| store.set_item(key, &text))
                            .await
                    }
                    Err(err) => Err(err.into()),
                };
                if let Err(err) = written {
                    self.report(Tier::Fallback, TierOperation::Write, &err);
                }
            }
            Err(err) => {
                let err = CacheError::from(err);
                self.report(Tier::Durable, TierOperation::Write, &err);
                self.report(Tier::Fallback, TierOperation::Write, &err);
            }
        }
    }

    /// Runs a fallback-store mutation on the blocking pool; file-backed
    /// stores do synchronous I/O.
    async fn on_fallback<F>(&self, op: F) -> Result<(), CacheError>
    where
        F: FnOnce(&dyn FallbackStore, &'static str) -> Result<(), CacheError> + Send + 'static,
    {
        let store = Arc::clone(&self.tiers.fallback);
        let key = self.key.key;
        tokio::task::spawn_blocking(move || op(store.as_ref(), key))
            .await
            .map_err(|err| CacheError::Fallback(format!("fallback task failed: {err}")))?
    }

    fn publish(&self, kind: ChangeKind, snapshot: Option<&S>) {
        if let Some(bus) = &self.tiers.events {
            let _ = bus.publish(CacheEvent::StorageChange {
                key: self.key.key.to_string(),
                kind,
                updated_at: snapshot.map(Snapshot::updated_at),
                item_count: snapshot.map_or(0, Snapshot::item_count),
                timestamp: now_millis(),
            });
        }
    }

    fn report(&self, tier: Tier, operation: TierOperation, error: &CacheError) {
        tracing::warn!(
            key = self.key.key,
            ?tier,
            ?operation,
            %error,
            "cache tier unavailable, treating as miss"
        );
        if let Some(hook) = &self.tiers.diagnostics {
            hook.emit(&TierDiagnostic {
                key: self.key.key,
                tier,
                operation,
                error,
            });
        }
    }
}
