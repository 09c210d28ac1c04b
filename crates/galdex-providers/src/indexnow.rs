//! Search-index (IndexNow) ping client.
//!
//! Best-effort notification of newly-public entry URLs. Only safe-rated
//! entries are submitted; failures are logged by the caller and never
//! surfaced to the user.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use tracing::{debug, info};

use galdex_core::defaults::{INDEXNOW_API_URL, PROVIDER_TIMEOUT_SECS};
use galdex_core::{Error, Result, SearchIndex};

/// IndexNow ping client.
pub struct IndexNowClient {
    client: Client,
    endpoint: String,
    key: String,
}

impl IndexNowClient {
    /// Create a ping client with the given site verification key.
    pub fn new(key: impl Into<String>) -> Self {
        Self::with_endpoint(INDEXNOW_API_URL.to_string(), key)
    }

    /// Create a ping client against a custom endpoint.
    pub fn with_endpoint(endpoint: String, key: impl Into<String>) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(PROVIDER_TIMEOUT_SECS))
            .build()
            .expect("Failed to create HTTP client");

        info!(
            subsystem = "providers",
            provider = "indexnow",
            op = "init",
            "Initializing IndexNow client"
        );
        Self {
            client,
            endpoint,
            key: key.into(),
        }
    }

    /// Create from environment variables (`GALDEX_INDEXNOW_KEY`).
    pub fn from_env() -> Result<Self> {
        let key = std::env::var("GALDEX_INDEXNOW_KEY")
            .map_err(|_| Error::Config("GALDEX_INDEXNOW_KEY not set".to_string()))?;
        Ok(Self::new(key))
    }

    /// Submit one URL. Returns the HTTP status code.
    pub async fn ping(&self, url: &str) -> Result<u16> {
        let response = self
            .client
            .get(&self.endpoint)
            .query(&[("url", url), ("key", self.key.as_str())])
            .send()
            .await?;

        let status = response.status().as_u16();
        debug!(
            subsystem = "providers",
            provider = "indexnow",
            op = "ping",
            status = status,
            "Pinged search index: {}",
            url
        );
        Ok(status)
    }
}

#[async_trait]
impl SearchIndex for IndexNowClient {
    async fn submit(&self, url: &str) -> Result<u16> {
        self.ping(url).await
    }
}
