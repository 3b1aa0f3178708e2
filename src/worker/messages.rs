//! Typed request/response envelope exchanged with the background unit.

use serde::{Deserialize, Serialize};

use crate::domain::{Bucket, Listing};

/// Message sent to the background unit.
///
/// Serialized form: `{"type":"BUCKET","listings":[..],"limit":30}` or
/// `{"type":"PING"}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WorkerRequest {
    /// Run the bucketing engine over `listings`.
    Bucket {
        /// Listings to group; owned by the message.
        listings: Vec<Listing>,
        /// Maximum member ids per bucket.
        limit: usize,
    },
    /// Liveness check.
    Ping,
}

/// Message returned by the background unit.
///
/// Serialized form: `{"type":"BUCKET_RESULT","buckets":[..]}` or
/// `{"type":"PONG"}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WorkerResponse {
    /// Buckets computed for a [`WorkerRequest::Bucket`].
    BucketResult {
        /// Buckets ordered by count, descending.
        buckets: Vec<Bucket>,
    },
    /// Answer to [`WorkerRequest::Ping`].
    Pong,
}

impl WorkerRequest {
    /// Processes a request. This is the whole body of the background unit.
    #[must_use]
    pub fn handle(self) -> WorkerResponse {
        match self {
            Self::Bucket { listings, limit } => WorkerResponse::BucketResult {
                buckets: crate::bucketing::bucket(&listings, limit),
            },
            Self::Ping => WorkerResponse::Pong,
        }
    }

    /// Discriminator string, as found in the `type` field.
    #[must_use]
    pub const fn type_str(&self) -> &'static str {
        match self {
            Self::Bucket { .. } => "BUCKET",
            Self::Ping => "PING",
        }
    }
}
