//! The bucketing pass itself.

use std::collections::HashMap;

use super::key::bucket_key;
use crate::domain::{Bucket, Listing};

/// Groups `listings` into buckets ordered by member count, descending.
///
/// Buckets keep first-seen order among equal counts (the sort is stable).
/// At most `id_limit` member ids are recorded per bucket; `count` is never
/// truncated. Listings without a usable key are skipped.
#[must_use]
pub fn bucket(listings: &[Listing], id_limit: usize) -> Vec<Bucket> {
    let mut index: HashMap<String, usize> = HashMap::new();
    let mut buckets: Vec<Bucket> = Vec::new();

    for listing in listings {
        let Some(key) = bucket_key(listing) else {
            continue;
        };
        match index.get(&key).and_then(|&slot| buckets.get_mut(slot)) {
            Some(existing) => existing.absorb(listing, id_limit),
            None => {
                index.insert(key.clone(), buckets.len());
                buckets.push(Bucket::seed(key, listing, id_limit));
            }
        }
    }

    buckets.sort_by(|a, b| b.count.cmp(&a.count));
    buckets
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use crate::domain::VehicleAttributes;

    fn car(id: &str, brand: &str, model: &str, price: f64) -> Listing {
        Listing {
            id: id.to_string(),
            attributes: VehicleAttributes {
                brand: Some(brand.to_string()),
                model: Some(model.to_string()),
                variant: Some("LE".to_string()),
                color: Some("Black".to_string()),
                year: Some(2020),
                condition: Some("used".to_string()),
                body_type: Some("sedan".to_string()),
            },
            price: Some(price),
            currency: Some("USD".to_string()),
            seller_id: format!("seller-{id}"),
            ..Listing::default()
        }
    }

    fn sample() -> Vec<Listing> {
        vec![
            car("a", "Toyota", "Camry", 20_000.0),
            car("b", "Toyota", "Camry", 22_000.0),
            car("c", "Honda", "Accord", 18_000.0),
        ]
    }

    #[test]
    fn empty_input_yields_no_buckets() {
        assert!(bucket(&[], 30).is_empty());
    }

    #[test]
    fn groups_identical_configurations() {
        let buckets = bucket(&sample(), 30);
        assert_eq!(buckets.len(), 2);

        let Some(first) = buckets.first() else {
            panic!("two buckets expected");
        };
        assert_eq!(first.count, 2);
        assert!((first.min_price - 20_000.0).abs() < f64::EPSILON);
        assert!((first.max_price - 22_000.0).abs() < f64::EPSILON);
        assert_eq!(first.vehicle_ids, vec!["a", "b"]);
        assert_eq!(first.representative_id, "a");
        assert_eq!(first.seller_id, "seller-a");

        let Some(second) = buckets.get(1) else {
            panic!("two buckets expected");
        };
        assert_eq!(second.count, 1);
        assert!((second.min_price - 18_000.0).abs() < f64::EPSILON);
        assert!((second.max_price - second.min_price).abs() < f64::EPSILON);
    }

    #[test]
    fn single_listing_is_its_own_bucket() {
        let buckets = bucket(&[car("x", "Kia", "Rio", 9_000.0)], 30);
        assert_eq!(buckets.len(), 1);
        assert!(buckets.iter().all(|b| b.count == 1 && b.min_price == b.max_price));
    }

    #[test]
    fn zero_id_limit_keeps_counts() {
        let full = bucket(&sample(), 30);
        let none = bucket(&sample(), 0);
        assert!(none.iter().all(|b| b.vehicle_ids.is_empty()));
        let full_counts: Vec<usize> = full.iter().map(|b| b.count).collect();
        let none_counts: Vec<usize> = none.iter().map(|b| b.count).collect();
        assert_eq!(full_counts, none_counts);
    }

    #[test]
    fn id_limit_caps_ids_but_not_count() {
        let listings: Vec<Listing> = (0..10)
            .map(|i| car(&format!("id{i}"), "Ford", "Focus", f64::from(i)))
            .collect();
        let buckets = bucket(&listings, 3);
        let Some(only) = buckets.first() else {
            panic!("one bucket expected");
        };
        assert_eq!(only.count, 10);
        assert_eq!(only.vehicle_ids, vec!["id0", "id1", "id2"]);
        assert!(only.min_price.abs() < f64::EPSILON);
        assert!((only.max_price - 9.0).abs() < f64::EPSILON);
    }

    #[test]
    fn ties_keep_first_seen_order() {
        let listings = vec![
            car("1", "Mazda", "3", 1.0),
            car("2", "Audi", "A4", 1.0),
            car("3", "BMW", "X1", 1.0),
            car("4", "BMW", "X1", 1.0),
        ];
        let order: Vec<String> = bucket(&listings, 30)
            .into_iter()
            .map(|b| b.representative_id)
            .collect();
        assert_eq!(order, vec!["3", "1", "2"]);
    }

    #[test]
    fn counts_sum_to_groupable_listings() {
        let mut listings = sample();
        listings.push(Listing::default());
        listings.push(car("d", "toyota ", " CAMRY", 21_000.0));
        let buckets = bucket(&listings, 30);
        let total: usize = buckets.iter().map(|b| b.count).sum();
        assert_eq!(total, listings.len() - 1);
    }

    #[test]
    fn min_and_max_are_member_prices() {
        let buckets = bucket(&sample(), 30);
        let prices = [20_000.0, 22_000.0, 18_000.0];
        for b in &buckets {
            assert!(b.min_price <= b.max_price);
            assert!(prices.iter().any(|p| (p - b.min_price).abs() < f64::EPSILON));
            assert!(prices.iter().any(|p| (p - b.max_price).abs() < f64::EPSILON));
        }
    }

    #[test]
    fn missing_price_counts_as_zero() {
        let mut cheap = car("a", "Fiat", "Panda", 0.0);
        cheap.price = None;
        let buckets = bucket(&[car("b", "Fiat", "Panda", 5_000.0), cheap], 30);
        let Some(only) = buckets.first() else {
            panic!("one bucket expected");
        };
        assert!(only.min_price.abs() < f64::EPSILON);
        assert!((only.max_price - 5_000.0).abs() < f64::EPSILON);
    }

    #[test]
    fn unknown_years_group_together() {
        let mut a = car("a", "Opel", "Corsa", 1.0);
        a.attributes.year = None;
        let mut b = car("b", "Opel", "Corsa", 2.0);
        b.attributes.year = None;
        let buckets = bucket(&[a, b], 30);
        assert_eq!(buckets.len(), 1);
    }

    #[test]
    fn backfills_image_from_later_member() {
        let first = car("a", "Seat", "Ibiza", 1.0);
        let mut second = car("b", "Seat", "Ibiza", 1.0);
        second.hero_image_url = Some("https://img/b.jpg".to_string());
        let mut third = car("c", "Seat", "Ibiza", 1.0);
        third.hero_image_url = Some("https://img/c.jpg".to_string());

        let buckets = bucket(&[first, second, third], 30);
        let image = buckets.first().and_then(|b| b.hero_image_url.clone());
        assert_eq!(image.as_deref(), Some("https://img/b.jpg"));
    }

    #[test]
    fn is_deterministic() {
        let listings = sample();
        assert_eq!(bucket(&listings, 30), bucket(&listings, 30));
    }
}
