//! # Stores
//!
//! [`CatalogStore`] is the seam between the HTTP layer and persistence.
//!
//! - [`MongoStore`]: one collection per [`Category`], plus `orders` and `counters`
//! - [`MemoryStore`]: same semantics behind a mutex, for tests and local runs
//!
//! ## Ids
//! New products take the next value of a per-category counter. The counter
//! is first raised to the largest stored id so admin adds never collide with
//! feed ids, and every increment is atomic. Reseeding resets the counter to
//! the batch's largest id.
use async_trait::async_trait;
use catalog::{Category, NewProduct, Order, Product, ProductPatch, ProductQuery};
use thiserror::Error;

pub mod memory;
pub mod mongo;

pub use memory::MemoryStore;
pub use mongo::MongoStore;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] mongodb::error::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Id counter for {0} is corrupt")]
    Counter(Category),
}

#[async_trait]
pub trait CatalogStore: Send + Sync {
    fn backend_tag(&self) -> &'static str;

    async fn ping(&self) -> Result<(), StoreError>;

    async fn list(&self, category: Category, query: &ProductQuery)
    -> Result<Vec<Product>, StoreError>;

    async fn get(&self, category: Category, id: i64) -> Result<Option<Product>, StoreError>;

    /// Assigns the next id and stores the product.
    async fn insert(&self, category: Category, product: NewProduct)
    -> Result<Product, StoreError>;

    async fn update(
        &self,
        category: Category,
        id: i64,
        patch: ProductPatch,
    ) -> Result<Option<Product>, StoreError>;

    async fn delete(&self, category: Category, id: i64) -> Result<bool, StoreError>;

    /// Drops everything in `category` and stores `products` in its place.
    async fn replace_all(
        &self,
        category: Category,
        products: Vec<Product>,
    ) -> Result<usize, StoreError>;

    async fn insert_order(&self, order: &Order) -> Result<(), StoreError>;

    /// Orders placed by `uid`, newest first.
    async fn orders_for(&self, uid: &str) -> Result<Vec<Order>, StoreError>;
}
