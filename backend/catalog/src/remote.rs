use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde_json::Value;
use thiserror::Error;
use tracing::debug;

use crate::category::Category;

#[derive(Error, Debug)]
pub enum FeedError {
    #[error("Feed request for {category} failed: {source}")]
    Request {
        category: Category,
        #[source]
        source: reqwest::Error,
    },

    #[error("Feed for {category} answered {status}")]
    Status {
        category: Category,
        status: StatusCode,
    },

    #[error("Feed for {category} is not valid JSON: {source}")]
    Decode {
        category: Category,
        #[source]
        source: reqwest::Error,
    },
}

/// Source of raw product JSON for a category.
#[async_trait]
pub trait ProductFeed: Send + Sync {
    async fn fetch(&self, category: Category) -> Result<Value, FeedError>;
}

/// Static JSON files served from `{base_url}/{category.feed_file()}`.
pub struct HttpFeed {
    client: Client,
    base_url: String,
}

impl HttpFeed {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = Client::builder().timeout(timeout).build()?;

        Ok(Self::with_client(client, base_url))
    }

    pub fn with_client(client: Client, base_url: &str) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn url_for(&self, category: Category) -> String {
        format!("{}/{}", self.base_url, category.feed_file())
    }
}

#[async_trait]
impl ProductFeed for HttpFeed {
    async fn fetch(&self, category: Category) -> Result<Value, FeedError> {
        let url = self.url_for(category);
        debug!("Fetching feed {url}");

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|source| FeedError::Request { category, source })?;

        let status = response.status();
        if !status.is_success() {
            return Err(FeedError::Status { category, status });
        }

        response
            .json()
            .await
            .map_err(|source| FeedError::Decode { category, source })
    }
}
