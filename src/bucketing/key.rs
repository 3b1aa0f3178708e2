//! Grouping key derivation.

use crate::domain::Listing;

/// Separator between the seven key segments.
pub const KEY_DELIMITER: char = '|';

fn normalize(value: Option<&str>) -> String {
    value.map(|v| v.trim().to_lowercase()).unwrap_or_default()
}

/// Computes the grouping key of `listing`.
///
/// Brand, model, variant, color, year, condition and body type are
/// lower-cased and trimmed (year rendered as a number) and joined with
/// [`KEY_DELIMITER`]. A missing or unparseable year is an empty segment, so
/// such listings group together when everything else matches.
///
/// Returns `None` when every segment is blank: such a listing cannot be
/// grouped.
#[must_use]
pub fn bucket_key(listing: &Listing) -> Option<String> {
    let attrs = &listing.attributes;
    let segments = [
        normalize(attrs.brand.as_deref()),
        normalize(attrs.model.as_deref()),
        normalize(attrs.variant.as_deref()),
        normalize(attrs.color.as_deref()),
        attrs.year.map(|y| y.to_string()).unwrap_or_default(),
        normalize(attrs.condition.as_deref()),
        normalize(attrs.body_type.as_deref()),
    ];

    if segments.iter().all(String::is_empty) {
        return None;
    }
    Some(segments.join(&KEY_DELIMITER.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::VehicleAttributes;

    fn with_attrs(attributes: VehicleAttributes) -> Listing {
        Listing {
            attributes,
            ..Listing::default()
        }
    }

    #[test]
    fn normalizes_case_and_whitespace() {
        let a = with_attrs(VehicleAttributes {
            brand: Some("  Toyota ".to_string()),
            model: Some("CAMRY".to_string()),
            year: Some(2020),
            body_type: Some("Sedan".to_string()),
            ..VehicleAttributes::default()
        });
        assert_eq!(bucket_key(&a).as_deref(), Some("toyota|camry|||2020||sedan"));
    }

    #[test]
    fn blank_listing_has_no_key() {
        let blank = with_attrs(VehicleAttributes {
            brand: Some("   ".to_string()),
            ..VehicleAttributes::default()
        });
        assert_eq!(bucket_key(&blank), None);
        assert_eq!(bucket_key(&Listing::default()), None);
    }

    #[test]
    fn year_alone_is_enough_for_a_key() {
        let only_year = with_attrs(VehicleAttributes {
            year: Some(1999),
            ..VehicleAttributes::default()
        });
        assert_eq!(bucket_key(&only_year).as_deref(), Some("||||1999||"));
    }
}
