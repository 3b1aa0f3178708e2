//! Domain layer: listings, buckets, and the change-event system.
//!
//! Listings and buckets are plain serde value types. Snapshots wrap them
//! with a millisecond timestamp and are replaced wholesale, never patched.

pub mod bucket;
pub mod cache_event;
pub mod event_bus;
pub mod lenient;
pub mod listing;

pub use bucket::{Bucket, BucketSnapshot};
pub use cache_event::{CacheEvent, ChangeKind};
pub use event_bus::EventBus;
pub use listing::{Listing, ListingSnapshot, VehicleAttributes};

use std::sync::atomic::{AtomicI64, Ordering};

use chrono::{DateTime, SubsecRound, Utc};

/// Highest snapshot stamp handed out or observed in this process, in epoch
/// milliseconds.
static LAST_STAMP_MS: AtomicI64 = AtomicI64::new(i64::MIN);

/// Current time truncated to whole milliseconds.
///
/// Snapshots are persisted with millisecond timestamps; truncating up
/// front keeps the in-memory copy equal to what a later read decodes.
#[must_use]
pub fn now_millis() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(3)
}

/// Timestamp for a new snapshot.
///
/// Millisecond precision like [`now_millis`], but strictly greater than any
/// stamp issued or observed before in this process. Two snapshots written in
/// the same millisecond never share an `updated_at`.
#[must_use]
pub fn snapshot_stamp() -> DateTime<Utc> {
    let now = now_millis();
    let wanted = now.timestamp_millis();
    let next = |last: i64| Some(wanted.max(last.saturating_add(1)));
    let previous = LAST_STAMP_MS
        .fetch_update(Ordering::AcqRel, Ordering::Acquire, next)
        .unwrap_or_else(std::convert::identity);
    let stamp = wanted.max(previous.saturating_add(1));
    DateTime::from_timestamp_millis(stamp).unwrap_or(now)
}

/// Records a stamp loaded from a persistent tier so later stamps exceed it.
pub(crate) fn observe_stamp(stamp: DateTime<Utc>) {
    LAST_STAMP_MS.fetch_max(stamp.timestamp_millis(), Ordering::AcqRel);
}
