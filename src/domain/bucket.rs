//! Deduplicated display buckets and the bucket snapshot.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{Listing, ListingSnapshot};

/// One display card standing for every listing of a single vehicle
/// configuration.
///
/// `count` always reflects every folded listing even when `vehicle_ids`
/// was truncated at the configured id limit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Bucket {
    /// Normalized grouping key.
    pub bucket_key: String,
    /// Id of the first listing seen for this key.
    pub representative_id: String,
    /// Seller of the representative listing.
    pub seller_id: String,
    /// Seller display name of the representative listing.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seller_name: Option<String>,
    /// Brand as spelled by the representative.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub brand: Option<String>,
    /// Model as spelled by the representative.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    /// Variant as spelled by the representative.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub variant: Option<String>,
    /// Color as spelled by the representative.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    /// Model year.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub year: Option<i32>,
    /// Condition as spelled by the representative.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub condition: Option<String>,
    /// Body type as spelled by the representative.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body_type: Option<String>,
    /// Number of listings folded into this bucket (at least 1).
    pub count: usize,
    /// Lowest price across members.
    pub min_price: f64,
    /// Highest price across members.
    pub max_price: f64,
    /// First non-empty currency seen.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub currency: Option<String>,
    /// First non-empty image seen.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hero_image_url: Option<String>,
    /// Member ids in insertion order, capped at the id limit.
    #[serde(default)]
    pub vehicle_ids: Vec<String>,
}

impl Bucket {
    /// Seeds a bucket from the first listing seen for `bucket_key`.
    #[must_use]
    pub fn seed(bucket_key: String, listing: &Listing, id_limit: usize) -> Self {
        let price = listing.effective_price();
        let attrs = &listing.attributes;
        let mut vehicle_ids = Vec::new();
        if !listing.id.is_empty() && id_limit > 0 {
            vehicle_ids.push(listing.id.clone());
        }
        Self {
            bucket_key,
            representative_id: listing.id.clone(),
            seller_id: listing.seller_id.clone(),
            seller_name: listing.seller_name.clone(),
            brand: attrs.brand.clone(),
            model: attrs.model.clone(),
            variant: attrs.variant.clone(),
            color: attrs.color.clone(),
            year: attrs.year,
            condition: attrs.condition.clone(),
            body_type: attrs.body_type.clone(),
            count: 1,
            min_price: price,
            max_price: price,
            currency: non_blank(listing.currency.as_deref()),
            hero_image_url: non_blank(listing.hero_image_url.as_deref()),
            vehicle_ids,
        }
    }

    /// Folds another listing with the same key into this bucket.
    pub fn absorb(&mut self, listing: &Listing, id_limit: usize) {
        let price = listing.effective_price();
        self.count = self.count.saturating_add(1);
        self.min_price = self.min_price.min(price);
        self.max_price = self.max_price.max(price);
        if self.currency.is_none() {
            self.currency = non_blank(listing.currency.as_deref());
        }
        if self.hero_image_url.is_none() {
            self.hero_image_url = non_blank(listing.hero_image_url.as_deref());
        }
        if !listing.id.is_empty() && self.vehicle_ids.len() < id_limit {
            self.vehicle_ids.push(listing.id.clone());
        }
    }
}

fn non_blank(value: Option<&str>) -> Option<String> {
    value
        .filter(|v| !v.trim().is_empty())
        .map(ToString::to_string)
}

/// Immutable, timestamped bucket collection with provenance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BucketSnapshot {
    /// When the buckets were computed.
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub updated_at: DateTime<Utc>,
    /// `updated_at` of the listing snapshot these buckets came from.
    #[serde(default, with = "chrono::serde::ts_milliseconds_option")]
    pub source_listings_updated_at: Option<DateTime<Utc>>,
    /// Buckets ordered by `count`, descending.
    pub buckets: Vec<Bucket>,
}

impl BucketSnapshot {
    /// Builds a snapshot stamped with the current time.
    #[must_use]
    pub fn new(buckets: Vec<Bucket>, source_listings_updated_at: Option<DateTime<Utc>>) -> Self {
        Self {
            updated_at: super::snapshot_stamp(),
            source_listings_updated_at,
            buckets,
        }
    }

    /// Returns `true` when these buckets were computed from the listing
    /// snapshot stamped `listings_updated_at`.
    ///
    /// Both sides absent counts as a match: buckets derived from "no
    /// listings" stay valid until listings arrive.
    #[must_use]
    pub fn is_derived_from(&self, listings_updated_at: Option<DateTime<Utc>>) -> bool {
        self.source_listings_updated_at == listings_updated_at
    }

    /// Shorthand for [`Self::is_derived_from`] with a concrete snapshot.
    #[must_use]
    pub fn matches(&self, listings: Option<&ListingSnapshot>) -> bool {
        self.is_derived_from(listings.map(|l| l.updated_at))
    }

    /// Total number of listings represented across all buckets.
    #[must_use]
    pub fn total_listings(&self) -> usize {
        self.buckets.iter().map(|b| b.count).sum()
    }
}
