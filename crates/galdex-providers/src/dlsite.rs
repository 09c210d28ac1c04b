//! DLsite metadata API client.
//!
//! Resolves a vendor product code (`RJ123456`) to titles, release date, and
//! publisher (circle) details. Fails closed like the VNDB client.

use std::sync::OnceLock;
use std::time::Duration;

use regex::Regex;
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, info};

use galdex_core::defaults::{DLSITE_API_URL, PROVIDER_TIMEOUT_SECS};
use galdex_core::{Error, Result};

/// Normalize and validate a DLsite product code: trim, uppercase, and check
/// the `RJ`/`VJ`/`BJ` + 6–8 digit shape.
pub fn normalize_code(code: &str) -> Result<String> {
    static CODE_RE: OnceLock<Regex> = OnceLock::new();
    let re = CODE_RE.get_or_init(|| Regex::new(r"^(RJ|VJ|BJ)\d{6,8}$").unwrap());

    let normalized = code.trim().to_uppercase();
    if !re.is_match(&normalized) {
        return Err(Error::Validation(format!(
            "invalid DLsite code: {}",
            code.trim()
        )));
    }
    Ok(normalized)
}

/// Metadata for a DLsite product.
#[derive(Debug, Clone)]
pub struct DlsiteMetadata {
    pub code: String,
    /// Default title first, then language-specific variants. De-duplicated.
    pub titles: Vec<String>,
    pub released: Option<String>,
    pub circle_name: Option<String>,
    pub circle_link: Option<String>,
}

#[derive(Debug, Deserialize)]
struct DlsiteResponse {
    data: DlsiteRecord,
}

#[derive(Debug, Deserialize)]
struct DlsiteRecord {
    rj_code: String,
    title_default: String,
    title_jp: Option<String>,
    title_en: Option<String>,
    release_date: Option<String>,
    circle_name: Option<String>,
    circle_link: Option<String>,
}

/// DLsite metadata API client.
pub struct DlsiteClient {
    client: Client,
    base_url: String,
}

impl DlsiteClient {
    /// Create a client against the default metadata endpoint.
    pub fn new() -> Self {
        Self::with_base_url(DLSITE_API_URL.to_string())
    }

    /// Create a client against a custom endpoint.
    pub fn with_base_url(base_url: String) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(PROVIDER_TIMEOUT_SECS))
            .build()
            .expect("Failed to create HTTP client");

        info!(
            subsystem = "providers",
            provider = "dlsite",
            op = "init",
            "Initializing DLsite client: {}",
            base_url
        );
        Self { client, base_url }
    }

    /// Create from environment variables (`GALDEX_DLSITE_URL` override).
    pub fn from_env() -> Self {
        let base_url =
            std::env::var("GALDEX_DLSITE_URL").unwrap_or_else(|_| DLSITE_API_URL.to_string());
        Self::with_base_url(base_url)
    }

    /// Resolve a product code to its metadata. The code is normalized and
    /// validated before the request goes out.
    pub async fn fetch(&self, code: &str) -> Result<DlsiteMetadata> {
        let code = normalize_code(code)?;

        let response = self
            .client
            .get(&self.base_url)
            .query(&[("code", code.as_str())])
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(Error::Request(format!(
                "DLsite API returned status {}",
                response.status()
            )));
        }

        let data: DlsiteResponse = response.json().await?;
        let record = data.data;

        let mut titles = Vec::new();
        let mut push = |t: &Option<String>| {
            if let Some(t) = t {
                let t = t.trim();
                if !t.is_empty() && !titles.iter().any(|s| s == t) {
                    titles.push(t.to_string());
                }
            }
        };
        push(&Some(record.title_default.clone()));
        push(&record.title_jp);
        push(&record.title_en);

        debug!(
            subsystem = "providers",
            provider = "dlsite",
            op = "fetch",
            title_count = titles.len(),
            "Fetched DLsite metadata for {}",
            record.rj_code
        );
        Ok(DlsiteMetadata {
            code: record.rj_code,
            titles,
            released: record.release_date,
            circle_name: record.circle_name.map(|s| s.trim().to_string()),
            circle_link: record.circle_link.map(|s| s.trim().to_string()),
        })
    }
}

impl Default for DlsiteClient {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_code_trims_and_uppercases() {
        assert_eq!(normalize_code(" rj123456 ").unwrap(), "RJ123456");
        assert_eq!(normalize_code("vj01234567").unwrap(), "VJ01234567");
    }

    #[test]
    fn test_normalize_code_rejects_bad_shapes() {
        assert!(normalize_code("").is_err());
        assert!(normalize_code("RJ123").is_err());
        assert!(normalize_code("XX123456").is_err());
        assert!(normalize_code("RJ123456789").is_err());
        assert!(normalize_code("RJ12E456").is_err());
    }

    #[test]
    fn test_response_parsing() {
        let response: DlsiteResponse = serde_json::from_str(
            r#"{
                "data": {
                    "rj_code": "RJ999999",
                    "title_default": "Sample Product",
                    "title_jp": "サンプル",
                    "release_date": "2025-01-10",
                    "circle_name": " Example Circle ",
                    "circle_link": "https://example.dlsite/circle"
                }
            }"#,
        )
        .unwrap();
        assert_eq!(response.data.rj_code, "RJ999999");
        assert_eq!(response.data.title_en, None);
    }
}
