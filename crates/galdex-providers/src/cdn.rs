//! CDN edge-cache purge client.
//!
//! Fire-and-forget from the caller's perspective: the update path requests a
//! purge of replaced banner URLs and logs the outcome, nothing more.

use std::time::Duration;

use reqwest::Client;
use serde_json::json;
use tracing::{debug, info};

use galdex_core::defaults::PROVIDER_TIMEOUT_SECS;
use galdex_core::{Error, Result};

/// Client for a Cloudflare-style zone purge endpoint.
pub struct CdnPurgeClient {
    client: Client,
    endpoint: String,
    token: String,
}

impl CdnPurgeClient {
    /// Create a purge client for the given endpoint and bearer token.
    pub fn new(endpoint: impl Into<String>, token: impl Into<String>) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(PROVIDER_TIMEOUT_SECS))
            .build()
            .expect("Failed to create HTTP client");

        let endpoint = endpoint.into();
        info!(
            subsystem = "providers",
            provider = "cdn",
            op = "init",
            "Initializing CDN purge client: {}",
            endpoint
        );
        Self {
            client,
            endpoint,
            token: token.into(),
        }
    }

    /// Create from environment variables.
    ///
    /// | Variable | Description |
    /// |----------|-------------|
    /// | `GALDEX_CDN_PURGE_URL` | Zone purge endpoint |
    /// | `GALDEX_CDN_TOKEN` | Bearer token |
    pub fn from_env() -> Result<Self> {
        let endpoint = std::env::var("GALDEX_CDN_PURGE_URL")
            .map_err(|_| Error::Config("GALDEX_CDN_PURGE_URL not set".to_string()))?;
        let token = std::env::var("GALDEX_CDN_TOKEN")
            .map_err(|_| Error::Config("GALDEX_CDN_TOKEN not set".to_string()))?;
        Ok(Self::new(endpoint, token))
    }

    /// Request purge of the given URLs. Returns the HTTP status code.
    pub async fn purge(&self, urls: &[String]) -> Result<u16> {
        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.token)
            .json(&json!({ "files": urls }))
            .send()
            .await?;

        let status = response.status().as_u16();
        debug!(
            subsystem = "providers",
            provider = "cdn",
            op = "purge",
            url_count = urls.len(),
            status = status,
            "Requested CDN purge"
        );
        Ok(status)
    }
}
