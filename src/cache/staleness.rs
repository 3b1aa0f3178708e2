//! TTL-based freshness checks.

use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};

/// Default freshness window for both caches: five minutes.
pub const DEFAULT_TTL: Duration = Duration::from_secs(5 * 60);

/// Returns `true` when a snapshot stamped `updated_at` is older than `ttl`.
///
/// An absent timestamp is always stale.
#[must_use]
pub fn is_stale(updated_at: Option<DateTime<Utc>>, ttl: Duration) -> bool {
    is_stale_at(updated_at, ttl, Utc::now())
}

/// [`is_stale`] against an explicit clock reading.
#[must_use]
pub fn is_stale_at(updated_at: Option<DateTime<Utc>>, ttl: Duration, now: DateTime<Utc>) -> bool {
    let Some(updated_at) = updated_at else {
        return true;
    };
    let ttl = TimeDelta::from_std(ttl).unwrap_or(TimeDelta::MAX);
    now.signed_duration_since(updated_at) > ttl
}
