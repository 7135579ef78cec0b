//! # MongoDB
//!
//! Catalog and order storage.
//!
//! ## Layout
//!
//! - One collection per category (`bracelets`, `rings`, ...), documents keyed by a unique `id`
//! - `orders`: placed orders, indexed by `uid`
//! - `counters`: `{ _id: <category slug>, seq }`, the last id handed out per category
//!
//! ## Notes
//!
//! - The `_id` ObjectId is never exposed; clients only see the numeric `id`
//! - Reseeding replaces a whole collection, so nothing else may reference product ids
//!   except order lines, which copy name and price at order time
use std::time::Duration;

use mongodb::{Client, Database, options::ClientOptions};
use tracing::info;

use crate::store::StoreError;

pub async fn init_mongo(uri: &str, database: &str) -> Result<Database, StoreError> {
    let mut options = ClientOptions::parse(uri).await?;
    options.app_name = Some("jewel".to_string());
    options.connect_timeout = Some(Duration::from_secs(5));
    options.server_selection_timeout = Some(Duration::from_secs(5));

    let client = Client::with_options(options)?;
    let db = client.database(database);

    info!("MongoDB client ready for database {database}");
    Ok(db)
}
