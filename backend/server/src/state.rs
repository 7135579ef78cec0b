use std::sync::Arc;

use anyhow::{Context, Result};
use catalog::{HttpFeed, ProductFeed};
use reqwest::Client;
use tracing::{info, warn};

use super::{
    auth::{ClaimsAdmin, FirebaseAuth, TokenVerifier},
    config::Config,
    database::init_mongo,
    store::{CatalogStore, MongoStore},
};

pub struct State {
    pub config: Config,
    pub store: Arc<dyn CatalogStore>,
    pub feed: Arc<dyn ProductFeed>,
    pub verifier: Arc<dyn TokenVerifier>,
    pub claims: Arc<dyn ClaimsAdmin>,
}

impl State {
    pub async fn new(mut config: Config) -> Result<Arc<Self>> {
        let db = init_mongo(&config.mongodb_uri, &config.mongodb_database)
            .await
            .context("configuring MongoDB client")?;

        let store = MongoStore::new(db);
        if let Err(e) = store.ensure_indexes().await {
            warn!("Could not ensure indexes yet: {e}");
        }

        let feed = HttpFeed::new(&config.feed_base_url, config.feed_timeout)
            .context("building feed client")?;

        let firebase = Arc::new(FirebaseAuth::new(
            &config.firebase_project_id,
            Client::new(),
            config.service_account.take(),
        ));
        info!(
            "Firebase project {} (custom claims {})",
            config.firebase_project_id,
            if firebase.has_service_account() {
                "enabled"
            } else {
                "disabled"
            }
        );

        Ok(Self::from_parts(
            config,
            Arc::new(store),
            Arc::new(feed),
            firebase.clone(),
            firebase,
        ))
    }

    pub fn from_parts(
        config: Config,
        store: Arc<dyn CatalogStore>,
        feed: Arc<dyn ProductFeed>,
        verifier: Arc<dyn TokenVerifier>,
        claims: Arc<dyn ClaimsAdmin>,
    ) -> Arc<Self> {
        Arc::new(Self {
            config,
            store,
            feed,
            verifier,
            claims,
        })
    }
}
