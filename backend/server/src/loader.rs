use catalog::{Category, ProductFeed, SkippedRecord, normalize_feed};
use serde::Serialize;
use tracing::{info, warn};

use crate::{error::AppError, store::CatalogStore};

#[derive(Debug, Serialize)]
pub struct LoadReport {
    pub category: Category,
    pub loaded: usize,
    pub skipped: Vec<SkippedRecord>,
}

/// Fetches and normalizes the whole feed before touching the store, so a
/// failed fetch leaves the collection as it was.
pub async fn reseed(
    store: &dyn CatalogStore,
    feed: &dyn ProductFeed,
    category: Category,
) -> Result<LoadReport, AppError> {
    let raw = feed.fetch(category).await?;
    let normalized = normalize_feed(raw, category)?;

    for skipped in &normalized.skipped {
        warn!(
            "Skipping {category} record {}: {}",
            skipped.index, skipped.reason
        );
    }

    let loaded = store.replace_all(category, normalized.products).await?;
    info!(
        "Reseeded {category}: {loaded} loaded, {} skipped",
        normalized.skipped.len()
    );

    Ok(LoadReport {
        category,
        loaded,
        skipped: normalized.skipped,
    })
}

/// Fetch and normalize only.
pub async fn preview(feed: &dyn ProductFeed, category: Category) -> Result<LoadReport, AppError> {
    let normalized = normalize_feed(feed.fetch(category).await?, category)?;

    Ok(LoadReport {
        category,
        loaded: normalized.products.len(),
        skipped: normalized.skipped,
    })
}
