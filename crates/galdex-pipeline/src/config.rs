//! Pipeline configuration.
//!
//! ## Configuration
//!
//! Environment variables:
//! - `GALDEX_ASSET_URL`: Public base URL for stored objects
//!   (default: https://assets.galdex.example)
//! - `GALDEX_SITE_URL`: Public base URL for entry pages, used by
//!   search-index pings (default: https://galdex.example)

/// Public URL roots the pipeline stitches storage keys and slugs onto.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub asset_base_url: String,
    pub site_base_url: String,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            asset_base_url: "https://assets.galdex.example".to_string(),
            site_base_url: "https://galdex.example".to_string(),
        }
    }
}

impl PipelineConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            asset_base_url: std::env::var("GALDEX_ASSET_URL")
                .unwrap_or(defaults.asset_base_url),
            site_base_url: std::env::var("GALDEX_SITE_URL").unwrap_or(defaults.site_base_url),
        }
    }

    /// Public URL for a storage key.
    pub fn asset_url(&self, key: &str) -> String {
        format!("{}/{}", self.asset_base_url.trim_end_matches('/'), key)
    }

    /// Public URL for an entry page.
    pub fn entry_url(&self, slug: &str) -> String {
        format!("{}/entry/{}", self.site_base_url.trim_end_matches('/'), slug)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_asset_url_handles_trailing_slash() {
        let config = PipelineConfig {
            asset_base_url: "https://cdn.example/".to_string(),
            site_base_url: "https://site.example".to_string(),
        };
        assert_eq!(
            config.asset_url("entry/1/banner/banner.avif"),
            "https://cdn.example/entry/1/banner/banner.avif"
        );
        assert_eq!(config.entry_url("a1b2c3d4"), "https://site.example/entry/a1b2c3d4");
    }
}
