//! The fetch collaborator that produces raw listings.

use std::fmt;

use async_trait::async_trait;

use crate::domain::Listing;
use crate::error::CacheError;

/// Produces the current listing collection from the origin service.
///
/// Retry, backoff and authentication are the implementation's business;
/// the caches only consume the resulting listings.
#[async_trait]
pub trait ListingSource: Send + Sync + fmt::Debug {
    /// Fetches every listing currently offered.
    ///
    /// # Errors
    ///
    /// Returns [`CacheError::Upstream`] when the origin cannot be reached
    /// or answers with something that is not a listing collection.
    async fn fetch_listings(&self) -> Result<Vec<Listing>, CacheError>;
}

/// Source serving a fixed collection; handy for seeding and tests.
#[derive(Debug, Clone, Default)]
pub struct StaticListingSource {
    listings: Vec<Listing>,
}

impl StaticListingSource {
    /// Serves `listings` on every fetch.
    #[must_use]
    pub fn new(listings: Vec<Listing>) -> Self {
        Self { listings }
    }
}

#[async_trait]
impl ListingSource for StaticListingSource {
    async fn fetch_listings(&self) -> Result<Vec<Listing>, CacheError> {
        Ok(self.listings.clone())
    }
}
