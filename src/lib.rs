//! # listing-cache
//!
//! Tiered cache for a vehicle-listing catalog plus the pipeline that folds
//! listings into deduplicated display buckets.
//!
//! Two snapshots are cached: the raw listing collection and the buckets
//! derived from it. Each lives in process memory, a durable SQLite store
//! and a small fallback store, and a read falls through those tiers in
//! order. Buckets carry the timestamp of the listing snapshot they were
//! computed from, so stale buckets are never served against newer listings.
//!
//! ## Architecture
//!
//! ```text
//! Clients (HTTP, WebSocket)
//!     │
//!     ├── REST Handlers (api/)
//!     ├── WS Handler (ws/)
//!     │
//!     ├── BucketService (service/)
//!     │     ├── ListingCache / BucketCache (cache/)
//!     │     └── AggregationWorker (worker/) ── bucketing engine (bucketing/)
//!     │
//!     ├── EventBus (domain/)
//!     │
//!     └── Durable + fallback tiers (persistence/)
//! ```

pub mod api;
pub mod app_state;
pub mod bucketing;
pub mod cache;
pub mod config;
pub mod domain;
pub mod error;
pub mod persistence;
pub mod service;
pub mod worker;
pub mod ws;
