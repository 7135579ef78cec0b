use async_trait::async_trait;
use catalog::{Category, NewProduct, Order, Product, ProductPatch, ProductQuery};
use futures::TryStreamExt;
use mongodb::{
    Collection, Database, IndexModel,
    bson::{self, Bson, Document, doc},
    options::{IndexOptions, ReturnDocument},
};
use tracing::{debug, info};

use super::{CatalogStore, StoreError};

const ORDERS: &str = "orders";
const COUNTERS: &str = "counters";

#[derive(Clone)]
pub struct MongoStore {
    db: Database,
}

impl MongoStore {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    fn products(&self, category: Category) -> Collection<Product> {
        self.db.collection(category.collection())
    }

    fn orders(&self) -> Collection<Order> {
        self.db.collection(ORDERS)
    }

    fn counters(&self) -> Collection<Document> {
        self.db.collection(COUNTERS)
    }

    pub async fn ensure_indexes(&self) -> Result<(), StoreError> {
        let unique = IndexOptions::builder().unique(true).build();

        for category in Category::ALL {
            self.products(category)
                .create_index(
                    IndexModel::builder()
                        .keys(doc! { "id": 1 })
                        .options(unique.clone())
                        .build(),
                )
                .await?;
        }

        self.orders()
            .create_index(IndexModel::builder().keys(doc! { "uid": 1 }).build())
            .await?;
        self.orders()
            .create_index(
                IndexModel::builder()
                    .keys(doc! { "order_id": 1 })
                    .options(unique)
                    .build(),
            )
            .await?;

        info!("MongoDB indexes ready");
        Ok(())
    }

    async fn max_id(&self, category: Category) -> Result<i64, StoreError> {
        let top = self
            .products(category)
            .clone_with_type::<Document>()
            .find_one(doc! {})
            .sort(doc! { "id": -1 })
            .projection(doc! { "id": 1, "_id": 0 })
            .await?;

        Ok(top.and_then(|doc| doc.get("id").and_then(as_i64)).unwrap_or(0))
    }

    async fn next_id(&self, category: Category) -> Result<i64, StoreError> {
        let key = doc! { "_id": category.slug() };
        let max = self.max_id(category).await?;

        self.counters()
            .update_one(key.clone(), doc! { "$max": { "seq": max } })
            .upsert(true)
            .await?;

        let counter = self
            .counters()
            .find_one_and_update(key, doc! { "$inc": { "seq": 1_i64 } })
            .return_document(ReturnDocument::After)
            .await?
            .ok_or(StoreError::Counter(category))?;

        counter
            .get("seq")
            .and_then(as_i64)
            .ok_or(StoreError::Counter(category))
    }
}

pub fn filter_document(query: &ProductQuery) -> Document {
    let mut filter = Document::new();

    if let Some(name) = &query.name {
        filter.insert(
            "name",
            doc! { "$regex": regex::escape(name), "$options": "i" },
        );
    }

    for (field, value) in &query.exact {
        filter.insert(*field, value.clone());
    }

    let mut price = Document::new();
    if let Some(min) = query.min_price {
        price.insert("$gte", min);
    }
    if let Some(max) = query.max_price {
        price.insert("$lte", max);
    }
    if !price.is_empty() {
        filter.insert("price", price);
    }

    if let Some(min) = query.min_rating {
        filter.insert("rating", doc! { "$gte": min });
    }

    for (field, value) in &query.flags {
        // documents written before a flag existed count as false
        if *value {
            filter.insert(*field, true);
        } else {
            filter.insert(*field, doc! { "$ne": true });
        }
    }

    filter
}

/// `$set` for the fields present in `patch`.
pub fn update_document(mut patch: ProductPatch) -> Result<Document, StoreError> {
    patch.name = patch.name.map(|name| name.trim().to_string());
    patch.cover_from_images();

    let set =
        bson::to_document(&patch).map_err(|e| StoreError::Serialization(e.to_string()))?;

    Ok(doc! { "$set": set })
}

pub fn sort_document(query: &ProductQuery) -> Document {
    let mut sort = Document::new();

    if let Some(order) = query.sort {
        let (key, direction) = order.key();
        sort.insert(key, direction);
    }
    sort.insert("id", 1);

    sort
}

fn as_i64(value: &Bson) -> Option<i64> {
    match value {
        Bson::Int32(n) => Some(i64::from(*n)),
        Bson::Int64(n) => Some(*n),
        Bson::Double(f) if f.fract() == 0.0 => Some(*f as i64),
        _ => None,
    }
}

#[async_trait]
impl CatalogStore for MongoStore {
    fn backend_tag(&self) -> &'static str {
        "mongodb"
    }

    async fn ping(&self) -> Result<(), StoreError> {
        self.db.run_command(doc! { "ping": 1 }).await?;
        Ok(())
    }

    async fn list(
        &self,
        category: Category,
        query: &ProductQuery,
    ) -> Result<Vec<Product>, StoreError> {
        let filter = filter_document(query);
        debug!("Listing {category} with {filter}");

        let cursor = self
            .products(category)
            .find(filter)
            .sort(sort_document(query))
            .await?;

        Ok(cursor.try_collect().await?)
    }

    async fn get(&self, category: Category, id: i64) -> Result<Option<Product>, StoreError> {
        Ok(self.products(category).find_one(doc! { "id": id }).await?)
    }

    async fn insert(
        &self,
        category: Category,
        product: NewProduct,
    ) -> Result<Product, StoreError> {
        let id = self.next_id(category).await?;
        let product = product.into_product(id, category);

        self.products(category).insert_one(&product).await?;
        info!("Added {category} {id}");

        Ok(product)
    }

    async fn update(
        &self,
        category: Category,
        id: i64,
        patch: ProductPatch,
    ) -> Result<Option<Product>, StoreError> {
        let update = update_document(patch)?;

        Ok(self
            .products(category)
            .find_one_and_update(doc! { "id": id }, update)
            .return_document(ReturnDocument::After)
            .await?)
    }

    async fn delete(&self, category: Category, id: i64) -> Result<bool, StoreError> {
        let result = self
            .products(category)
            .delete_one(doc! { "id": id })
            .await?;

        Ok(result.deleted_count > 0)
    }

    async fn replace_all(
        &self,
        category: Category,
        products: Vec<Product>,
    ) -> Result<usize, StoreError> {
        let collection = self.products(category);
        let max = products.iter().map(|p| p.id).max().unwrap_or(0);

        let deleted = collection.delete_many(doc! {}).await?.deleted_count;
        debug!("Cleared {deleted} {category} documents");

        if !products.is_empty() {
            collection.insert_many(&products).await?;
        }

        self.counters()
            .update_one(
                doc! { "_id": category.slug() },
                doc! { "$set": { "seq": max } },
            )
            .upsert(true)
            .await?;

        Ok(products.len())
    }

    async fn insert_order(&self, order: &Order) -> Result<(), StoreError> {
        self.orders().insert_one(order).await?;
        Ok(())
    }

    async fn orders_for(&self, uid: &str) -> Result<Vec<Order>, StoreError> {
        let cursor = self.orders().find(doc! { "uid": uid }).await?;
        let mut orders: Vec<Order> = cursor.try_collect().await?;
        orders.sort_by(|a, b| b.created_at.cmp(&a.created_at));

        Ok(orders)
    }
}
