use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::{category::Category, product::Product};

pub const MAX_ORDER_LINES: usize = 50;
pub const MAX_QUANTITY: u32 = 99;
pub const DEFAULT_PAYMENT_METHOD: &str = "cod";

#[derive(Error, Debug, PartialEq)]
pub enum OrderError {
    #[error("Order has no items")]
    Empty,

    #[error("Order has more than 50 lines")]
    TooManyLines,

    #[error("Quantity for {category}/{id} must be between 1 and 99")]
    InvalidQuantity { category: Category, id: i64 },

    #[error("Shipping {0} is required")]
    MissingShipping(&'static str),

    #[error("Unknown product {category}/{id}")]
    UnknownProduct { category: Category, id: i64 },
}

#[derive(Debug, Clone, Deserialize)]
pub struct OrderItemRequest {
    pub category: Category,
    pub id: i64,
    pub quantity: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShippingAddress {
    pub name: String,
    pub phone: String,
    pub line1: String,
    #[serde(default)]
    pub line2: Option<String>,
    pub city: String,
    pub state: String,
    pub postal_code: String,
    #[serde(default)]
    pub country: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OrderRequest {
    pub items: Vec<OrderItemRequest>,
    pub shipping: ShippingAddress,
    #[serde(default)]
    pub payment_method: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    Placed,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderLine {
    pub category: Category,
    pub product_id: i64,
    pub name: String,
    pub unit_price: f64,
    pub quantity: u32,
    pub line_total: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub order_id: String,
    pub uid: String,
    #[serde(default)]
    pub email: Option<String>,
    pub items: Vec<OrderLine>,
    pub total: f64,
    pub payment_method: String,
    pub shipping: ShippingAddress,
    pub status: OrderStatus,
    pub created_at: DateTime<Utc>,
}

impl OrderRequest {
    pub fn validate(&self) -> Result<(), OrderError> {
        if self.items.is_empty() {
            return Err(OrderError::Empty);
        }
        if self.items.len() > MAX_ORDER_LINES {
            return Err(OrderError::TooManyLines);
        }

        for item in &self.items {
            if item.quantity == 0 || item.quantity > MAX_QUANTITY {
                return Err(OrderError::InvalidQuantity {
                    category: item.category,
                    id: item.id,
                });
            }
        }

        let shipping = &self.shipping;
        for (field, value) in [
            ("name", &shipping.name),
            ("phone", &shipping.phone),
            ("line1", &shipping.line1),
            ("city", &shipping.city),
            ("state", &shipping.state),
            ("postal_code", &shipping.postal_code),
        ] {
            if value.trim().is_empty() {
                return Err(OrderError::MissingShipping(field));
            }
        }

        Ok(())
    }
}

/// Prices `request` from the catalog. `resolved` holds the looked-up product
/// for every request line, in order; `None` marks a line whose product no
/// longer exists.
pub fn price_order(
    uid: &str,
    email: Option<String>,
    request: OrderRequest,
    resolved: Vec<Option<Product>>,
) -> Result<Order, OrderError> {
    request.validate()?;

    let mut items = Vec::with_capacity(request.items.len());
    for (item, product) in request.items.iter().zip(resolved) {
        let product = product.ok_or(OrderError::UnknownProduct {
            category: item.category,
            id: item.id,
        })?;

        items.push(OrderLine {
            category: item.category,
            product_id: product.id,
            name: product.name,
            unit_price: product.price,
            quantity: item.quantity,
            line_total: round_cents(product.price * f64::from(item.quantity)),
        });
    }

    let total = round_cents(items.iter().map(|line| line.line_total).sum());

    Ok(Order {
        order_id: Uuid::new_v4().to_string(),
        uid: uid.to_string(),
        email,
        items,
        total,
        payment_method: request
            .payment_method
            .filter(|method| !method.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_PAYMENT_METHOD.to_string()),
        shipping: request.shipping,
        status: OrderStatus::Placed,
        created_at: Utc::now(),
    })
}

fn round_cents(amount: f64) -> f64 {
    (amount * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::product::NewProduct;

    fn request(items: serde_json::Value) -> OrderRequest {
        serde_json::from_value(json!({
            "items": items,
            "shipping": {
                "name": "Asha",
                "phone": "9999999999",
                "line1": "12 MG Road",
                "city": "Pune",
                "state": "MH",
                "postal_code": "411001"
            }
        }))
        .unwrap()
    }

    fn product(id: i64, price: f64) -> Product {
        NewProduct {
            name: format!("Item {id}"),
            price,
            ..Default::default()
        }
        .into_product(id, Category::Ring)
    }

    #[test]
    fn test_prices_from_catalog() {
        let request = request(json!([
            { "category": "rings", "id": 1, "quantity": 2 },
            { "category": "ring", "id": 2, "quantity": 1 },
        ]));

        let order = price_order(
            "uid-1",
            None,
            request,
            vec![Some(product(1, 10.10)), Some(product(2, 0.2))],
        )
        .unwrap();

        assert_eq!(order.items[0].line_total, 20.2);
        assert_eq!(order.total, 20.4);
        assert_eq!(order.payment_method, "cod");
        assert_eq!(order.status, OrderStatus::Placed);
        assert_eq!(order.uid, "uid-1");
    }

    #[test]
    fn test_unknown_product() {
        let request = request(json!([{ "category": "necklace", "id": 9, "quantity": 1 }]));

        assert_eq!(
            price_order("u", None, request, vec![None]),
            Err(OrderError::UnknownProduct {
                category: Category::Necklace,
                id: 9
            })
        );
    }

    #[test]
    fn test_validation() {
        assert_eq!(request(json!([])).validate(), Err(OrderError::Empty));

        let zero = request(json!([{ "category": "ring", "id": 1, "quantity": 0 }]));
        assert!(matches!(
            zero.validate(),
            Err(OrderError::InvalidQuantity { id: 1, .. })
        ));

        let mut missing = request(json!([{ "category": "ring", "id": 1, "quantity": 1 }]));
        missing.shipping.city = " ".to_string();
        assert_eq!(missing.validate(), Err(OrderError::MissingShipping("city")));
    }
}
