use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::category::{Category, ReviewsKind};

/// A catalog document. `id` is assigned by the feed (or the id counter for
/// admin-added products) and is unique within its category.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub id: i64,
    pub name: String,
    pub price: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub images: Vec<String>,
    #[serde(default)]
    pub rating: f64,
    #[serde(default)]
    pub reviews: Reviews,
    #[serde(default)]
    pub is_featured: bool,
    #[serde(default)]
    pub is_bestseller: bool,
    #[serde(default)]
    pub has_special_deal: bool,
    #[serde(default)]
    pub is_fast_delivery: bool,
    #[serde(default)]
    pub material: Option<String>,
    #[serde(default)]
    pub gemstone: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub gender: Option<String>,
    #[serde(default)]
    pub occasion: Option<String>,
    #[serde(default)]
    pub added_date: Option<String>,
}

/// Some feeds carry a review count, others the reviews themselves.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Reviews {
    Count(u64),
    List(Vec<Value>),
}

impl Default for Reviews {
    fn default() -> Self {
        Reviews::Count(0)
    }
}

impl Reviews {
    pub fn empty(kind: ReviewsKind) -> Self {
        match kind {
            ReviewsKind::Count => Reviews::Count(0),
            ReviewsKind::List => Reviews::List(Vec::new()),
        }
    }

    pub fn len(&self) -> u64 {
        match self {
            Reviews::Count(count) => *count,
            Reviews::List(list) => list.len() as u64,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Error, Debug, PartialEq)]
pub enum ValidationError {
    #[error("Product name must not be empty")]
    EmptyName,

    #[error("Price must be a non-negative number, got {0}")]
    InvalidPrice(f64),

    #[error("Rating must be between 0 and 5, got {0}")]
    InvalidRating(f64),

    #[error("No fields to update")]
    EmptyPatch,
}

/// Body of an admin `add` request.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewProduct {
    pub name: String,
    pub price: f64,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub images: Option<Vec<String>>,
    #[serde(default)]
    pub rating: Option<f64>,
    #[serde(default)]
    pub reviews: Option<Reviews>,
    #[serde(default)]
    pub is_featured: Option<bool>,
    #[serde(default)]
    pub is_bestseller: Option<bool>,
    #[serde(default)]
    pub has_special_deal: Option<bool>,
    #[serde(default)]
    pub is_fast_delivery: Option<bool>,
    #[serde(default)]
    pub material: Option<String>,
    #[serde(default)]
    pub gemstone: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub gender: Option<String>,
    #[serde(default)]
    pub occasion: Option<String>,
    #[serde(default)]
    pub added_date: Option<String>,
}

impl NewProduct {
    pub fn validate(&self) -> Result<(), ValidationError> {
        validate_name(&self.name)?;
        validate_price(self.price)?;
        if let Some(rating) = self.rating {
            validate_rating(rating)?;
        }

        Ok(())
    }

    pub fn into_product(self, id: i64, category: Category) -> Product {
        let (image, images) = reconcile_images(self.image, self.images.unwrap_or_default());

        Product {
            id,
            name: self.name.trim().to_string(),
            price: self.price,
            description: self.description,
            image,
            images,
            rating: self.rating.unwrap_or(0.0),
            reviews: self
                .reviews
                .unwrap_or_else(|| Reviews::empty(category.reviews_kind())),
            is_featured: self.is_featured.unwrap_or(false),
            is_bestseller: self.is_bestseller.unwrap_or(false),
            has_special_deal: self.has_special_deal.unwrap_or(false),
            is_fast_delivery: self.is_fast_delivery.unwrap_or(false),
            material: self.material,
            gemstone: self.gemstone,
            category: self.category,
            gender: self.gender,
            occasion: self.occasion,
            added_date: self.added_date,
        }
    }
}

/// Body of an admin `update` request. Absent fields are left untouched.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProductPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub images: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rating: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reviews: Option<Reviews>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_featured: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_bestseller: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub has_special_deal: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_fast_delivery: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub material: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gemstone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gender: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub occasion: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub added_date: Option<String>,
}

impl ProductPatch {
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.price.is_none()
            && self.description.is_none()
            && self.image.is_none()
            && self.images.is_none()
            && self.rating.is_none()
            && self.reviews.is_none()
            && self.is_featured.is_none()
            && self.is_bestseller.is_none()
            && self.has_special_deal.is_none()
            && self.is_fast_delivery.is_none()
            && self.material.is_none()
            && self.gemstone.is_none()
            && self.category.is_none()
            && self.gender.is_none()
            && self.occasion.is_none()
            && self.added_date.is_none()
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.is_empty() {
            return Err(ValidationError::EmptyPatch);
        }
        if let Some(name) = &self.name {
            validate_name(name)?;
        }
        if let Some(price) = self.price {
            validate_price(price)?;
        }
        if let Some(rating) = self.rating {
            validate_rating(rating)?;
        }

        Ok(())
    }

    /// A patch that replaces `images` without naming `image` moves the cover
    /// to the first new image.
    pub fn cover_from_images(&mut self) {
        if self.image.is_none() {
            self.image = self.images.as_ref().and_then(|images| images.first().cloned());
        }
    }

    pub fn apply(mut self, product: &mut Product) {
        self.cover_from_images();

        if let Some(name) = self.name {
            product.name = name.trim().to_string();
        }
        if let Some(price) = self.price {
            product.price = price;
        }
        if let Some(description) = self.description {
            product.description = Some(description);
        }
        if let Some(image) = self.image {
            product.image = Some(image);
        }
        if let Some(images) = self.images {
            product.images = images;
        }
        if let Some(rating) = self.rating {
            product.rating = rating;
        }
        if let Some(reviews) = self.reviews {
            product.reviews = reviews;
        }
        if let Some(flag) = self.is_featured {
            product.is_featured = flag;
        }
        if let Some(flag) = self.is_bestseller {
            product.is_bestseller = flag;
        }
        if let Some(flag) = self.has_special_deal {
            product.has_special_deal = flag;
        }
        if let Some(flag) = self.is_fast_delivery {
            product.is_fast_delivery = flag;
        }
        if let Some(material) = self.material {
            product.material = Some(material);
        }
        if let Some(gemstone) = self.gemstone {
            product.gemstone = Some(gemstone);
        }
        if let Some(category) = self.category {
            product.category = Some(category);
        }
        if let Some(gender) = self.gender {
            product.gender = Some(gender);
        }
        if let Some(occasion) = self.occasion {
            product.occasion = Some(occasion);
        }
        if let Some(added_date) = self.added_date {
            product.added_date = Some(added_date);
        }
    }
}

/// `images` falls back to the single `image`, and `image` to the first of
/// `images`.
pub(crate) fn reconcile_images(
    image: Option<String>,
    images: Vec<String>,
) -> (Option<String>, Vec<String>) {
    match (image, images.is_empty()) {
        (Some(image), true) => (Some(image.clone()), vec![image]),
        (None, false) => (images.first().cloned(), images),
        (image, _) => (image, images),
    }
}

fn validate_name(name: &str) -> Result<(), ValidationError> {
    if name.trim().is_empty() {
        return Err(ValidationError::EmptyName);
    }

    Ok(())
}

fn validate_price(price: f64) -> Result<(), ValidationError> {
    if !price.is_finite() || price < 0.0 {
        return Err(ValidationError::InvalidPrice(price));
    }

    Ok(())
}

fn validate_rating(rating: f64) -> Result<(), ValidationError> {
    if !(0.0..=5.0).contains(&rating) {
        return Err(ValidationError::InvalidRating(rating));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn new_ring() -> NewProduct {
        NewProduct {
            name: "  Solitaire Ring ".to_string(),
            price: 1499.0,
            image: Some("ring.jpg".to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn test_new_product_defaults() {
        let product = new_ring().into_product(7, Category::Ring);

        assert_eq!(product.id, 7);
        assert_eq!(product.name, "Solitaire Ring");
        assert_eq!(product.images, vec!["ring.jpg".to_string()]);
        assert_eq!(product.reviews, Reviews::Count(0));
        assert!(!product.is_featured);

        let gift = new_ring().into_product(1, Category::Gifting);
        assert_eq!(gift.reviews, Reviews::List(Vec::new()));
    }

    #[test]
    fn test_new_product_validation() {
        assert_eq!(new_ring().validate(), Ok(()));

        let mut blank = new_ring();
        blank.name = "   ".to_string();
        assert_eq!(blank.validate(), Err(ValidationError::EmptyName));

        let mut negative = new_ring();
        negative.price = -1.0;
        assert_eq!(negative.validate(), Err(ValidationError::InvalidPrice(-1.0)));

        let mut rated = new_ring();
        rated.rating = Some(5.5);
        assert_eq!(rated.validate(), Err(ValidationError::InvalidRating(5.5)));
    }

    #[test]
    fn test_patch_applies_only_present_fields() {
        let mut product = new_ring().into_product(3, Category::Ring);
        let patch: ProductPatch =
            serde_json::from_value(json!({ "price": 999.0, "is_featured": true })).unwrap();

        assert_eq!(patch.validate(), Ok(()));
        patch.apply(&mut product);

        assert_eq!(product.price, 999.0);
        assert!(product.is_featured);
        assert_eq!(product.name, "Solitaire Ring");
        assert_eq!(product.id, 3);
    }

    #[test]
    fn test_patch_images_moves_cover() {
        let mut product = new_ring().into_product(3, Category::Ring);
        let patch: ProductPatch =
            serde_json::from_value(json!({ "images": ["new.jpg", "side.jpg"] })).unwrap();
        patch.apply(&mut product);

        assert_eq!(product.image.as_deref(), Some("new.jpg"));
        assert_eq!(product.images, vec!["new.jpg".to_string(), "side.jpg".to_string()]);

        let patch: ProductPatch =
            serde_json::from_value(json!({ "image": "cover.jpg", "images": ["a.jpg"] })).unwrap();
        patch.apply(&mut product);
        assert_eq!(product.image.as_deref(), Some("cover.jpg"));

        let patch: ProductPatch = serde_json::from_value(json!({ "price": 5.0 })).unwrap();
        patch.apply(&mut product);
        assert_eq!(product.image.as_deref(), Some("cover.jpg"));
    }

    #[test]
    fn test_empty_patch_rejected() {
        let patch: ProductPatch = serde_json::from_value(json!({ "id": 42 })).unwrap();
        assert_eq!(patch.validate(), Err(ValidationError::EmptyPatch));
    }

    #[test]
    fn test_reviews_untagged() {
        let count: Reviews = serde_json::from_value(json!(12)).unwrap();
        assert_eq!(count, Reviews::Count(12));

        let list: Reviews = serde_json::from_value(json!([{ "user": "a" }])).unwrap();
        assert_eq!(list.len(), 1);
    }
}
