//! # Feed normalization
//!
//! The static feeds were hand-maintained per category and disagree on
//! almost every field type. Everything is coerced here so the stores only
//! ever see a [`Product`].
//!
//! ## Shapes
//! - Flat: `[ {..}, {..} ]`
//! - Nested: `{ "rings": [ {..} ] }`, or any object with a single array member
//!
//! ## Coercions
//! - `id`: number or numeric string
//! - `price`: number or string with currency symbols and separators
//! - `reviews`: count or list depending on [`ReviewsKind`]
//! - `images`: list, single string, or missing (falls back to `image`)
//! - flags: bools, `"true"`/`"yes"`/`"1"` and friends, or `0`/`1`
use std::collections::HashSet;

use serde::Serialize;
use serde_json::{Map, Value};
use thiserror::Error;

use crate::{
    category::{Category, ReviewsKind},
    product::{Product, Reviews, reconcile_images},
};

#[derive(Error, Debug, PartialEq)]
pub enum NormalizeError {
    #[error("Feed for {0} is neither an array nor an object holding one")]
    FeedShape(Category),

    #[error("Record is not an object")]
    NotAnObject,

    #[error("Missing or invalid id")]
    InvalidId,

    #[error("Missing or empty name")]
    MissingName,

    #[error("Missing or invalid price")]
    InvalidPrice,

    #[error("Duplicate id {0}")]
    DuplicateId(i64),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SkippedRecord {
    pub index: usize,
    pub reason: String,
}

#[derive(Debug, Default)]
pub struct NormalizedFeed {
    pub products: Vec<Product>,
    pub skipped: Vec<SkippedRecord>,
}

pub fn extract_records(value: Value, category: Category) -> Result<Vec<Value>, NormalizeError> {
    match value {
        Value::Array(records) => Ok(records),
        Value::Object(mut map) => {
            for key in [category.feed_key(), category.prefix(), "products"] {
                if let Some(Value::Array(records)) = map.remove(key) {
                    return Ok(records);
                }
            }

            let mut arrays = map.into_iter().filter_map(|(_, value)| match value {
                Value::Array(records) => Some(records),
                _ => None,
            });

            match (arrays.next(), arrays.next()) {
                (Some(records), None) => Ok(records),
                _ => Err(NormalizeError::FeedShape(category)),
            }
        }
        _ => Err(NormalizeError::FeedShape(category)),
    }
}

pub fn normalize_feed(value: Value, category: Category) -> Result<NormalizedFeed, NormalizeError> {
    let records = extract_records(value, category)?;

    let mut feed = NormalizedFeed::default();
    let mut seen = HashSet::new();

    for (index, record) in records.iter().enumerate() {
        let result = normalize_record(record, category).and_then(|product| {
            if seen.insert(product.id) {
                Ok(product)
            } else {
                Err(NormalizeError::DuplicateId(product.id))
            }
        });

        match result {
            Ok(product) => feed.products.push(product),
            Err(e) => feed.skipped.push(SkippedRecord {
                index,
                reason: e.to_string(),
            }),
        }
    }

    Ok(feed)
}

pub fn normalize_record(value: &Value, category: Category) -> Result<Product, NormalizeError> {
    let record = value.as_object().ok_or(NormalizeError::NotAnObject)?;

    let id = record
        .get("id")
        .and_then(as_integer)
        .ok_or(NormalizeError::InvalidId)?;

    let name = text(record, "name").ok_or(NormalizeError::MissingName)?;

    let price = record
        .get("price")
        .and_then(as_price)
        .filter(|price| *price >= 0.0)
        .ok_or(NormalizeError::InvalidPrice)?;

    let (image, images) = reconcile_images(text(record, "image"), image_list(record.get("images")));

    Ok(Product {
        id,
        name,
        price,
        description: text(record, "description"),
        image,
        images,
        rating: record.get("rating").and_then(as_number).unwrap_or(0.0),
        reviews: reviews(record.get("reviews"), category.reviews_kind()),
        is_featured: flag(record, "is_featured"),
        is_bestseller: flag(record, "is_bestseller"),
        has_special_deal: flag(record, "has_special_deal"),
        is_fast_delivery: flag(record, "is_fast_delivery"),
        material: text(record, "material"),
        gemstone: text(record, "gemstone"),
        category: text(record, "category"),
        gender: text(record, "gender"),
        occasion: text(record, "occasion"),
        added_date: text(record, "added_date"),
    })
}

fn as_integer(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().filter(|f| f.fract() == 0.0).map(|f| f as i64)),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn as_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
    .filter(|f| f.is_finite())
}

fn as_price(value: &Value) -> Option<f64> {
    match value {
        Value::String(s) => {
            let digits: String = s
                .chars()
                .filter(|c| c.is_ascii_digit() || *c == '.' || *c == '-')
                .collect();

            // "Rs. 1,299" leaves a leading dot behind
            digits
                .trim_start_matches('.')
                .parse()
                .ok()
                .filter(|f: &f64| f.is_finite())
        }
        other => as_number(other),
    }
}

fn as_bool(value: &Value) -> Option<bool> {
    match value {
        Value::Bool(b) => Some(*b),
        Value::Number(n) => n.as_i64().map(|n| n != 0),
        Value::String(s) => parse_bool(s),
        _ => None,
    }
}

/// Shared with query-string parsing so both sides accept the same spellings.
pub fn parse_bool(s: &str) -> Option<bool> {
    match s.trim().to_lowercase().as_str() {
        "true" | "yes" | "1" => Some(true),
        "false" | "no" | "0" => Some(false),
        _ => None,
    }
}

fn flag(record: &Map<String, Value>, key: &str) -> bool {
    record.get(key).and_then(as_bool).unwrap_or(false)
}

fn text(record: &Map<String, Value>, key: &str) -> Option<String> {
    match record.get(key)? {
        Value::String(s) => Some(s.trim().to_string()).filter(|s| !s.is_empty()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn image_list(value: Option<&Value>) -> Vec<String> {
    match value {
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(Value::as_str)
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect(),
        Some(Value::String(s)) if !s.trim().is_empty() => vec![s.trim().to_string()],
        _ => Vec::new(),
    }
}

fn reviews(value: Option<&Value>, kind: ReviewsKind) -> Reviews {
    match kind {
        ReviewsKind::Count => Reviews::Count(match value {
            Some(Value::Array(list)) => list.len() as u64,
            Some(other) => as_integer(other).map_or(0, |n| n.max(0) as u64),
            None => 0,
        }),
        ReviewsKind::List => Reviews::List(match value {
            Some(Value::Array(list)) => list.clone(),
            _ => Vec::new(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_extract_flat_and_nested() {
        let flat = json!([{ "id": 1 }, { "id": 2 }]);
        assert_eq!(extract_records(flat, Category::Ring).unwrap().len(), 2);

        let keyed = json!({ "bestSellers": [{ "id": 1 }], "meta": { "v": 2 } });
        assert_eq!(extract_records(keyed, Category::BestSeller).unwrap().len(), 1);

        let single = json!({ "items": [{ "id": 1 }, { "id": 2 }, { "id": 3 }] });
        assert_eq!(extract_records(single, Category::Trending).unwrap().len(), 3);
    }

    #[test]
    fn test_extract_rejects_ambiguous_shapes() {
        let two = json!({ "a": [], "b": [] });
        assert_eq!(
            extract_records(two, Category::Ring),
            Err(NormalizeError::FeedShape(Category::Ring))
        );
        assert!(extract_records(json!("nope"), Category::Ring).is_err());
    }

    #[test]
    fn test_coerces_loose_record() {
        let record = json!({
            "id": "12",
            "name": " Gold Bangle ",
            "price": "₹1,299.50",
            "rating": "4.5",
            "reviews": [{ "text": "nice" }, { "text": "ok" }],
            "image": "bangle.jpg",
            "is_featured": "true",
            "is_bestseller": 1,
            "has_special_deal": "no",
            "material": "  ",
            "gemstone": "Ruby",
        });

        let product = normalize_record(&record, Category::Bracelet).unwrap();

        assert_eq!(product.id, 12);
        assert_eq!(product.name, "Gold Bangle");
        assert_eq!(product.price, 1299.5);
        assert_eq!(product.rating, 4.5);
        assert_eq!(product.reviews, Reviews::Count(2));
        assert_eq!(product.images, vec!["bangle.jpg".to_string()]);
        assert!(product.is_featured);
        assert!(product.is_bestseller);
        assert!(!product.has_special_deal);
        assert!(!product.is_fast_delivery);
        assert_eq!(product.material, None);
        assert_eq!(product.gemstone.as_deref(), Some("Ruby"));
    }

    #[test]
    fn test_list_reviews_kept() {
        let record = json!({ "id": 3, "name": "Hamper", "price": 10, "reviews": 14 });
        let product = normalize_record(&record, Category::Gifting).unwrap();
        assert_eq!(product.reviews, Reviews::List(Vec::new()));

        let record = json!({ "id": 3, "name": "Hamper", "price": 10, "reviews": [{ "r": 5 }] });
        let product = normalize_record(&record, Category::Gifting).unwrap();
        assert_eq!(product.reviews.len(), 1);
    }

    #[test]
    fn test_image_falls_back_to_images() {
        let record = json!({ "id": 1, "name": "Stud", "price": 5, "images": ["a.jpg", 4, "b.jpg"] });
        let product = normalize_record(&record, Category::Earring).unwrap();

        assert_eq!(product.image.as_deref(), Some("a.jpg"));
        assert_eq!(product.images.len(), 2);
    }

    #[test]
    fn test_invalid_records() {
        let no_id = json!({ "name": "x", "price": 1 });
        assert_eq!(
            normalize_record(&no_id, Category::Ring),
            Err(NormalizeError::InvalidId)
        );

        let no_name = json!({ "id": 1, "name": "", "price": 1 });
        assert_eq!(
            normalize_record(&no_name, Category::Ring),
            Err(NormalizeError::MissingName)
        );

        let bad_price = json!({ "id": 1, "name": "x", "price": "call us" });
        assert_eq!(
            normalize_record(&bad_price, Category::Ring),
            Err(NormalizeError::InvalidPrice)
        );

        assert_eq!(
            normalize_record(&json!(5), Category::Ring),
            Err(NormalizeError::NotAnObject)
        );
    }

    #[test]
    fn test_feed_skips_bad_and_duplicate_records() {
        let feed = json!([
            { "id": 1, "name": "A", "price": 1 },
            { "id": 1, "name": "A again", "price": 2 },
            { "name": "no id", "price": 3 },
            { "id": 2, "name": "B", "price": 4 },
        ]);

        let normalized = normalize_feed(feed, Category::Necklace).unwrap();

        let ids: Vec<i64> = normalized.products.iter().map(|p| p.id).collect();
        assert_eq!(ids, vec![1, 2]);
        assert_eq!(normalized.products[0].name, "A");

        let skipped: Vec<usize> = normalized.skipped.iter().map(|s| s.index).collect();
        assert_eq!(skipped, vec![1, 2]);
        assert_eq!(normalized.skipped[0].reason, "Duplicate id 1");
    }

    #[test]
    fn test_parse_bool() {
        assert_eq!(parse_bool("TRUE"), Some(true));
        assert_eq!(parse_bool(" 0 "), Some(false));
        assert_eq!(parse_bool("maybe"), None);
    }
}
