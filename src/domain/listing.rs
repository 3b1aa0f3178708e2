//! Vehicle listings and the listing snapshot.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::lenient;

/// Descriptive attributes of one vehicle offer.
///
/// Everything is free-form and may be absent; the bucketing engine
/// normalizes these values when it builds a grouping key.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VehicleAttributes {
    /// Manufacturer, e.g. `"Toyota"`.
    #[serde(
        default,
        deserialize_with = "lenient::text",
        skip_serializing_if = "Option::is_none"
    )]
    pub brand: Option<String>,
    /// Model name, e.g. `"Camry"`.
    #[serde(
        default,
        deserialize_with = "lenient::text",
        skip_serializing_if = "Option::is_none"
    )]
    pub model: Option<String>,
    /// Trim level, e.g. `"LE"`.
    #[serde(
        default,
        deserialize_with = "lenient::text",
        skip_serializing_if = "Option::is_none"
    )]
    pub variant: Option<String>,
    /// Exterior color.
    #[serde(
        default,
        deserialize_with = "lenient::text",
        skip_serializing_if = "Option::is_none"
    )]
    pub color: Option<String>,
    /// Model year. Numbers and numeric strings are accepted.
    #[serde(
        default,
        deserialize_with = "lenient::year",
        skip_serializing_if = "Option::is_none"
    )]
    pub year: Option<i32>,
    /// `"new"`, `"used"`, ...
    #[serde(
        default,
        deserialize_with = "lenient::text",
        skip_serializing_if = "Option::is_none"
    )]
    pub condition: Option<String>,
    /// `"sedan"`, `"suv"`, ...
    #[serde(
        default,
        deserialize_with = "lenient::text",
        skip_serializing_if = "Option::is_none"
    )]
    pub body_type: Option<String>,
}

/// One vehicle offer as received from the origin service.
///
/// Listings are immutable value objects: a refresh replaces the whole
/// snapshot, individual listings are never patched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Listing {
    /// Identifier, unique within a snapshot. Empty when the origin omitted it.
    #[serde(default, deserialize_with = "lenient::text_or_empty")]
    pub id: String,
    /// Grouping and display attributes.
    #[serde(default)]
    pub attributes: VehicleAttributes,
    /// Asking price. Numbers and numeric strings are accepted.
    #[serde(
        default,
        deserialize_with = "lenient::number",
        skip_serializing_if = "Option::is_none"
    )]
    pub price: Option<f64>,
    /// ISO currency code of `price`.
    #[serde(
        default,
        deserialize_with = "lenient::text",
        skip_serializing_if = "Option::is_none"
    )]
    pub currency: Option<String>,
    /// Main photo.
    #[serde(
        default,
        deserialize_with = "lenient::text",
        skip_serializing_if = "Option::is_none"
    )]
    pub hero_image_url: Option<String>,
    /// Seller account id.
    #[serde(default, deserialize_with = "lenient::text_or_empty")]
    pub seller_id: String,
    /// Seller display name.
    #[serde(
        default,
        deserialize_with = "lenient::text",
        skip_serializing_if = "Option::is_none"
    )]
    pub seller_name: Option<String>,
}

impl Listing {
    /// Price used for aggregation: absent or non-numeric prices count as 0.
    #[must_use]
    pub fn effective_price(&self) -> f64 {
        self.price.filter(|p| p.is_finite()).unwrap_or(0.0)
    }
}

/// Immutable, timestamped collection of listings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListingSnapshot {
    /// When this snapshot was produced (millisecond precision).
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub updated_at: DateTime<Utc>,
    /// Listings in origin order.
    pub listings: Vec<Listing>,
}

impl ListingSnapshot {
    /// Builds a snapshot stamped with the current time.
    #[must_use]
    pub fn new(listings: Vec<Listing>) -> Self {
        Self::at(super::snapshot_stamp(), listings)
    }

    /// Builds a snapshot with an explicit timestamp.
    #[must_use]
    pub fn at(updated_at: DateTime<Utc>, listings: Vec<Listing>) -> Self {
        Self {
            updated_at,
            listings,
        }
    }

    /// Number of listings held.
    #[must_use]
    pub fn len(&self) -> usize {
        self.listings.len()
    }

    /// Returns `true` when the snapshot holds no listings.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.listings.is_empty()
    }
}
