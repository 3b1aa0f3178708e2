//! Aggregation worker boundary.
//!
//! Keeps the O(n) bucketing pass off the async executor for large listing
//! collections. Small inputs run inline; large ones are moved, by message,
//! to a dedicated background thread that answers with exactly one response
//! per request.

pub mod aggregation;
pub mod messages;
pub mod policy;

pub use aggregation::{AggregationWorker, WorkerStats};
pub use messages::{WorkerRequest, WorkerResponse};
pub use policy::{AlwaysInline, AlwaysOffload, DispatchPolicy, ThresholdPolicy};
