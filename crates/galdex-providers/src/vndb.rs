//! VNDB kana API client.
//!
//! Resolves a work id to its title set and release date during interactive
//! metadata-fetch actions. Fails closed: provider errors surface to the
//! caller instead of silently degrading.

use std::time::Duration;

use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, info};

use galdex_core::defaults::{PROVIDER_TIMEOUT_SECS, VNDB_API_URL};
use galdex_core::{Error, Result};

/// Title set and release date for a VNDB work.
#[derive(Debug, Clone)]
pub struct WorkMetadata {
    /// All known titles: Japanese title first, then the primary title, then
    /// other-language titles, then aliases. De-duplicated, order preserved.
    pub titles: Vec<String>,
    pub released: Option<String>,
}

#[derive(Debug, Deserialize)]
struct VnResponse {
    results: Vec<VnRecord>,
}

#[derive(Debug, Deserialize)]
struct VnRecord {
    title: String,
    #[serde(default)]
    titles: Vec<VnTitle>,
    #[serde(default)]
    aliases: Vec<String>,
    released: Option<String>,
}

#[derive(Debug, Deserialize)]
struct VnTitle {
    lang: String,
    title: String,
}

fn assemble_titles(records: &[VnRecord]) -> Vec<String> {
    let mut titles = Vec::new();
    let mut push = |t: &str| {
        if !t.is_empty() && !titles.iter().any(|s| s == t) {
            titles.push(t.to_string());
        }
    };

    for vn in records {
        if let Some(ja) = vn.titles.iter().find(|t| t.lang == "ja") {
            push(&ja.title);
        }
        push(&vn.title);
        for t in vn.titles.iter().filter(|t| t.lang != "ja") {
            push(&t.title);
        }
        for alias in &vn.aliases {
            push(alias);
        }
    }
    titles
}

/// VNDB kana API client.
pub struct VndbClient {
    client: Client,
    base_url: String,
}

impl VndbClient {
    /// Create a client against the public VNDB endpoint.
    pub fn new() -> Self {
        Self::with_base_url(VNDB_API_URL.to_string())
    }

    /// Create a client against a custom endpoint.
    pub fn with_base_url(base_url: String) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(PROVIDER_TIMEOUT_SECS))
            .build()
            .expect("Failed to create HTTP client");

        info!(
            subsystem = "providers",
            provider = "vndb",
            op = "init",
            "Initializing VNDB client: {}",
            base_url
        );
        Self { client, base_url }
    }

    /// Create from environment variables (`GALDEX_VNDB_URL` override).
    pub fn from_env() -> Self {
        let base_url =
            std::env::var("GALDEX_VNDB_URL").unwrap_or_else(|_| VNDB_API_URL.to_string());
        Self::with_base_url(base_url)
    }

    /// Resolve a work id (`v123`) to its title set and release date.
    pub async fn fetch_work(&self, work_id: &str) -> Result<WorkMetadata> {
        let response = self
            .client
            .post(format!("{}/vn", self.base_url))
            .json(&json!({
                "filters": ["id", "=", work_id],
                "fields": "title, titles.lang, titles.title, aliases, released",
            }))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(Error::Request(format!(
                "VNDB API returned status {}",
                response.status()
            )));
        }

        let data: VnResponse = response.json().await?;
        if data.results.is_empty() {
            return Err(Error::NotFound(format!("VNDB work {work_id}")));
        }

        let released = data.results[0].released.clone();
        let titles = assemble_titles(&data.results);

        debug!(
            subsystem = "providers",
            provider = "vndb",
            op = "fetch_work",
            title_count = titles.len(),
            "Fetched VNDB work metadata"
        );
        Ok(WorkMetadata { titles, released })
    }
}

impl Default for VndbClient {
    fn default() -> Self {
        Self::new()
    }
}
