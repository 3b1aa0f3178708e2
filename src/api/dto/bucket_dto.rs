//! Bucket listing DTOs.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::common_dto::PaginationMeta;
use crate::domain::Bucket;

/// Response body for `GET /buckets`.
#[derive(Debug, Serialize, Deserialize)]
pub struct BucketListResponse {
    /// When the buckets were computed.
    pub updated_at: DateTime<Utc>,
    /// Listing snapshot the buckets were derived from, if any.
    pub source_listings_updated_at: Option<DateTime<Utc>>,
    /// Listings represented across every bucket, not just this page.
    pub total_listings: usize,
    /// Buckets on this page, largest first.
    pub data: Vec<Bucket>,
    /// Pagination metadata.
    pub pagination: PaginationMeta,
}
