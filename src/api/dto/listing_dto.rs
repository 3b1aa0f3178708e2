//! Listing snapshot DTOs for read and ingest.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::Listing;

/// Request body for `PUT /listings`.
#[derive(Debug, Serialize, Deserialize)]
pub struct IngestListingsRequest {
    /// Full listing collection; replaces the current snapshot.
    pub listings: Vec<Listing>,
}

/// Response body for `PUT /listings`.
#[derive(Debug, Serialize, Deserialize)]
pub struct IngestListingsResponse {
    /// Timestamp of the new snapshot.
    pub updated_at: DateTime<Utc>,
    /// Number of listings stored.
    pub count: usize,
}

/// Response body for `GET /listings`.
#[derive(Debug, Serialize, Deserialize)]
pub struct ListingsResponse {
    /// Timestamp of the current snapshot; `None` when nothing is cached.
    pub updated_at: Option<DateTime<Utc>>,
    /// Whether the snapshot is past the listing TTL.
    pub stale: bool,
    /// Number of listings.
    pub count: usize,
    /// The listings themselves.
    pub listings: Vec<Listing>,
}
