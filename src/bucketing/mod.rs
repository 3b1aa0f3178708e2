//! Bucketing engine: collapses near-duplicate listings into display buckets.
//!
//! Pure and deterministic. The same function runs inline or on the
//! background aggregation unit (see [`crate::worker`]).

pub mod engine;
pub mod key;

pub use engine::bucket;
pub use key::{KEY_DELIMITER, bucket_key};
