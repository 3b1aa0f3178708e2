//! Listing and bucket caches.
//!
//! Both caches share one implementation, [`SnapshotCache`]: a memory tier
//! in front of a durable key-value store and a fallback string store. Reads
//! never fail; writes are best effort below memory; subscribers hear about
//! every write in call order.

pub mod bucket_cache;
pub mod listeners;
pub mod listing_cache;
pub mod snapshot_cache;
pub mod staleness;
pub mod tier;

pub use bucket_cache::{BUCKETS_KEY, BucketCache};
pub use listeners::Subscription;
pub use listing_cache::{LISTINGS_KEY, ListingCache};
pub use snapshot_cache::{CacheKey, CacheTiers, Snapshot, SnapshotCache};
pub use staleness::{DEFAULT_TTL, is_stale, is_stale_at};
pub use tier::{DiagnosticHook, Tier, TierDiagnostic, TierOperation, TierOutcome};
