use std::collections::HashMap;

use async_trait::async_trait;
use catalog::{Category, NewProduct, Order, Product, ProductPatch, ProductQuery};
use tokio::sync::Mutex;

use super::{CatalogStore, StoreError};

#[derive(Default)]
struct Inner {
    products: HashMap<Category, Vec<Product>>,
    counters: HashMap<Category, i64>,
    orders: Vec<Order>,
}

#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn with_products(category: Category, products: Vec<Product>) -> Self {
        let store = Self::new();
        store.seed(category, products).await;
        store
    }

    pub async fn seed(&self, category: Category, products: Vec<Product>) {
        let mut inner = self.inner.lock().await;
        let max = products.iter().map(|p| p.id).max().unwrap_or(0);

        inner.counters.insert(category, max);
        inner.products.insert(category, products);
    }
}

#[async_trait]
impl CatalogStore for MemoryStore {
    fn backend_tag(&self) -> &'static str {
        "memory"
    }

    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }

    async fn list(
        &self,
        category: Category,
        query: &ProductQuery,
    ) -> Result<Vec<Product>, StoreError> {
        let inner = self.inner.lock().await;
        let products = inner.products.get(&category).cloned().unwrap_or_default();

        Ok(query.apply(products))
    }

    async fn get(&self, category: Category, id: i64) -> Result<Option<Product>, StoreError> {
        let inner = self.inner.lock().await;

        Ok(inner
            .products
            .get(&category)
            .and_then(|products| products.iter().find(|p| p.id == id))
            .cloned())
    }

    async fn insert(
        &self,
        category: Category,
        product: NewProduct,
    ) -> Result<Product, StoreError> {
        let mut inner = self.inner.lock().await;

        let max = inner
            .products
            .get(&category)
            .and_then(|products| products.iter().map(|p| p.id).max())
            .unwrap_or(0);
        let counter = inner.counters.entry(category).or_insert(0);
        *counter = (*counter).max(max) + 1;
        let id = *counter;

        let product = product.into_product(id, category);
        inner
            .products
            .entry(category)
            .or_default()
            .push(product.clone());

        Ok(product)
    }

    async fn update(
        &self,
        category: Category,
        id: i64,
        patch: ProductPatch,
    ) -> Result<Option<Product>, StoreError> {
        let mut inner = self.inner.lock().await;

        let Some(product) = inner
            .products
            .get_mut(&category)
            .and_then(|products| products.iter_mut().find(|p| p.id == id))
        else {
            return Ok(None);
        };

        patch.apply(product);
        Ok(Some(product.clone()))
    }

    async fn delete(&self, category: Category, id: i64) -> Result<bool, StoreError> {
        let mut inner = self.inner.lock().await;

        let Some(products) = inner.products.get_mut(&category) else {
            return Ok(false);
        };

        let before = products.len();
        products.retain(|p| p.id != id);

        Ok(products.len() != before)
    }

    async fn replace_all(
        &self,
        category: Category,
        products: Vec<Product>,
    ) -> Result<usize, StoreError> {
        let count = products.len();
        self.seed(category, products).await;

        Ok(count)
    }

    async fn insert_order(&self, order: &Order) -> Result<(), StoreError> {
        self.inner.lock().await.orders.push(order.clone());
        Ok(())
    }

    async fn orders_for(&self, uid: &str) -> Result<Vec<Order>, StoreError> {
        let inner = self.inner.lock().await;

        let mut orders: Vec<Order> = inner
            .orders
            .iter()
            .filter(|order| order.uid == uid)
            .cloned()
            .collect();
        orders.sort_by(|a, b| b.created_at.cmp(&a.created_at));

        Ok(orders)
    }
}
