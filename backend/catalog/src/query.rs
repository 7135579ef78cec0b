use std::{cmp::Ordering, collections::HashMap};

use thiserror::Error;

use crate::{normalize::parse_bool, product::Product};

#[derive(Error, Debug, PartialEq)]
pub enum QueryError {
    #[error("Invalid number for {key}: {value}")]
    InvalidNumber { key: &'static str, value: String },

    #[error("Invalid boolean for {key}: {value}")]
    InvalidBool { key: &'static str, value: String },

    #[error("Unknown sort order: {0}")]
    InvalidSort(String),

    #[error("minPrice {min} is greater than maxPrice {max}")]
    InvertedPriceRange { min: f64, max: f64 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    PriceAsc,
    PriceDesc,
    Rating,
    Newest,
    Name,
}

/// Exact-match string attributes, in the order they are applied.
pub const EXACT_FIELDS: [&str; 5] = ["category", "material", "gemstone", "gender", "occasion"];

/// Boolean flags filterable from the query string.
pub const FLAG_FIELDS: [&str; 4] = [
    "is_featured",
    "is_bestseller",
    "has_special_deal",
    "is_fast_delivery",
];

/// Filter and ordering for a list request, parsed from the query string.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProductQuery {
    pub name: Option<String>,
    /// `(field, value)` pairs from [`EXACT_FIELDS`].
    pub exact: Vec<(&'static str, String)>,
    pub min_price: Option<f64>,
    pub max_price: Option<f64>,
    pub min_rating: Option<f64>,
    /// `(field, value)` pairs from [`FLAG_FIELDS`].
    pub flags: Vec<(&'static str, bool)>,
    pub sort: Option<SortOrder>,
}

impl ProductQuery {
    pub fn from_params(params: &HashMap<String, String>) -> Result<Self, QueryError> {
        let lookup = |keys: &[&str]| {
            keys.iter()
                .find_map(|key| params.get(*key))
                .map(|value| value.trim())
                .filter(|value| !value.is_empty())
        };

        let number = |key: &'static str, aliases: &[&str]| -> Result<Option<f64>, QueryError> {
            lookup(aliases)
                .map(|value| {
                    value
                        .parse::<f64>()
                        .ok()
                        .filter(|f| f.is_finite())
                        .ok_or_else(|| QueryError::InvalidNumber {
                            key,
                            value: value.to_string(),
                        })
                })
                .transpose()
        };

        let mut query = ProductQuery {
            name: lookup(&["name", "search", "q"]).map(str::to_string),
            min_price: number("minPrice", &["minPrice", "min_price"])?,
            max_price: number("maxPrice", &["maxPrice", "max_price"])?,
            min_rating: number("minRating", &["minRating", "min_rating"])?,
            ..Default::default()
        };

        if let (Some(min), Some(max)) = (query.min_price, query.max_price) {
            if min > max {
                return Err(QueryError::InvertedPriceRange { min, max });
            }
        }

        for key in EXACT_FIELDS {
            if let Some(value) = lookup(&[key]) {
                query.exact.push((key, value.to_string()));
            }
        }

        for key in FLAG_FIELDS {
            if let Some(value) = lookup(&[key]) {
                let flag = parse_bool(value).ok_or_else(|| QueryError::InvalidBool {
                    key,
                    value: value.to_string(),
                })?;
                query.flags.push((key, flag));
            }
        }

        query.sort = lookup(&["sort", "sortBy"]).map(SortOrder::parse).transpose()?;

        Ok(query)
    }

    pub fn matches(&self, product: &Product) -> bool {
        if let Some(name) = &self.name {
            if !product.name.to_lowercase().contains(&name.to_lowercase()) {
                return false;
            }
        }

        if self.min_price.is_some_and(|min| product.price < min)
            || self.max_price.is_some_and(|max| product.price > max)
            || self.min_rating.is_some_and(|min| product.rating < min)
        {
            return false;
        }

        let exact_ok = self
            .exact
            .iter()
            .all(|(field, value)| string_field(product, field) == Some(value.as_str()));

        let flags_ok = self
            .flags
            .iter()
            .all(|(field, value)| flag_field(product, field) == *value);

        exact_ok && flags_ok
    }

    /// Filters and orders `products` the way a store backend would.
    pub fn apply(&self, products: impl IntoIterator<Item = Product>) -> Vec<Product> {
        let mut matched: Vec<Product> = products
            .into_iter()
            .filter(|product| self.matches(product))
            .collect();

        match self.sort {
            Some(order) => matched.sort_by(|a, b| order.compare(a, b)),
            None => matched.sort_by_key(|product| product.id),
        }

        matched
    }
}

impl SortOrder {
    pub fn parse(value: &str) -> Result<Self, QueryError> {
        match value.to_lowercase().as_str() {
            "price_asc" | "price-asc" | "price" => Ok(SortOrder::PriceAsc),
            "price_desc" | "price-desc" => Ok(SortOrder::PriceDesc),
            "rating" => Ok(SortOrder::Rating),
            "newest" => Ok(SortOrder::Newest),
            "name" => Ok(SortOrder::Name),
            _ => Err(QueryError::InvalidSort(value.to_string())),
        }
    }

    /// Primary key and direction (`1` ascending, `-1` descending). Ties are
    /// always broken by ascending `id`.
    pub fn key(self) -> (&'static str, i32) {
        match self {
            SortOrder::PriceAsc => ("price", 1),
            SortOrder::PriceDesc => ("price", -1),
            SortOrder::Rating => ("rating", -1),
            SortOrder::Newest => ("added_date", -1),
            SortOrder::Name => ("name", 1),
        }
    }

    pub fn compare(self, a: &Product, b: &Product) -> Ordering {
        let primary = match self {
            SortOrder::PriceAsc => a.price.total_cmp(&b.price),
            SortOrder::PriceDesc => b.price.total_cmp(&a.price),
            SortOrder::Rating => b.rating.total_cmp(&a.rating),
            SortOrder::Newest => b.added_date.cmp(&a.added_date),
            SortOrder::Name => a.name.cmp(&b.name),
        };

        primary.then(a.id.cmp(&b.id))
    }
}

fn string_field<'a>(product: &'a Product, field: &str) -> Option<&'a str> {
    match field {
        "category" => product.category.as_deref(),
        "material" => product.material.as_deref(),
        "gemstone" => product.gemstone.as_deref(),
        "gender" => product.gender.as_deref(),
        "occasion" => product.occasion.as_deref(),
        _ => None,
    }
}

fn flag_field(product: &Product, field: &str) -> bool {
    match field {
        "is_featured" => product.is_featured,
        "is_bestseller" => product.is_bestseller,
        "has_special_deal" => product.has_special_deal,
        "is_fast_delivery" => product.is_fast_delivery,
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::product::Reviews;

    fn params(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn product(id: i64, name: &str, price: f64, material: &str) -> Product {
        Product {
            id,
            name: name.to_string(),
            price,
            description: None,
            image: None,
            images: Vec::new(),
            rating: id as f64,
            reviews: Reviews::Count(0),
            is_featured: id % 2 == 0,
            is_bestseller: false,
            has_special_deal: false,
            is_fast_delivery: false,
            material: Some(material.to_string()),
            gemstone: None,
            category: None,
            gender: None,
            occasion: None,
            added_date: Some(format!("2024-01-0{id}")),
        }
    }

    fn catalog() -> Vec<Product> {
        vec![
            product(3, "Rose Gold Ring", 300.0, "gold"),
            product(1, "Silver Band", 100.0, "silver"),
            product(2, "Gold Chain", 200.0, "gold"),
            product(4, "Golden Hoop", 400.0, "gold"),
        ]
    }

    fn ids(products: &[Product]) -> Vec<i64> {
        products.iter().map(|p| p.id).collect()
    }

    #[test]
    fn test_empty_query_returns_all_by_id() {
        let query = ProductQuery::from_params(&HashMap::new()).unwrap();
        assert_eq!(ids(&query.apply(catalog())), vec![1, 2, 3, 4]);
    }

    #[test]
    fn test_name_is_case_insensitive_substring() {
        let query = ProductQuery::from_params(&params(&[("name", "GOLD")])).unwrap();
        assert_eq!(ids(&query.apply(catalog())), vec![2, 3, 4]);
    }

    #[test]
    fn test_price_range_and_exact_match() {
        let query = ProductQuery::from_params(&params(&[
            ("minPrice", "150"),
            ("max_price", "400"),
            ("material", "gold"),
            ("sort", "price_desc"),
        ]))
        .unwrap();

        assert_eq!(ids(&query.apply(catalog())), vec![4, 3, 2]);
    }

    #[test]
    fn test_flag_filter() {
        let query = ProductQuery::from_params(&params(&[("is_featured", "true")])).unwrap();
        assert_eq!(ids(&query.apply(catalog())), vec![2, 4]);

        let query = ProductQuery::from_params(&params(&[("is_featured", "0")])).unwrap();
        assert_eq!(ids(&query.apply(catalog())), vec![1, 3]);
    }

    #[test]
    fn test_sort_orders() {
        let newest = ProductQuery::from_params(&params(&[("sort", "newest")])).unwrap();
        assert_eq!(ids(&newest.apply(catalog())), vec![4, 3, 2, 1]);

        let by_name = ProductQuery::from_params(&params(&[("sort", "name")])).unwrap();
        assert_eq!(ids(&by_name.apply(catalog())), vec![2, 4, 3, 1]);
    }

    #[test]
    fn test_invalid_params() {
        assert_eq!(
            ProductQuery::from_params(&params(&[("minPrice", "cheap")])),
            Err(QueryError::InvalidNumber {
                key: "minPrice",
                value: "cheap".to_string()
            })
        );
        assert!(matches!(
            ProductQuery::from_params(&params(&[("is_featured", "perhaps")])),
            Err(QueryError::InvalidBool { .. })
        ));
        assert!(matches!(
            ProductQuery::from_params(&params(&[("sort", "random")])),
            Err(QueryError::InvalidSort(_))
        ));
        assert!(matches!(
            ProductQuery::from_params(&params(&[("minPrice", "5"), ("maxPrice", "1")])),
            Err(QueryError::InvertedPriceRange { .. })
        ));
    }

    #[test]
    fn test_blank_and_unknown_params_ignored() {
        let query =
            ProductQuery::from_params(&params(&[("name", "  "), ("page", "2")])).unwrap();
        assert_eq!(query, ProductQuery::default());
    }
}
