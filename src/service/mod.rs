//! Service layer: the control flow that ties caches, engine and worker.

pub mod bucket_service;
pub mod listing_source;

pub use bucket_service::{BucketService, ServiceSettings};
pub use listing_source::{ListingSource, StaticListingSource};
