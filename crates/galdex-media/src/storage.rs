//! Object storage backends.
//!
//! Keys are hierarchical paths (`entry/{id}/banner/...`); the store treats
//! them as opaque. The HTTP backend targets an S3-style image bed exposing
//! plain PUT/DELETE; the in-memory backend is the test double.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::Client;
use tracing::{debug, info};

use galdex_core::defaults::PROVIDER_TIMEOUT_SECS;
use galdex_core::{Error, ObjectStorage, Result};

/// Object storage over an S3-style HTTP endpoint.
pub struct HttpObjectStorage {
    client: Client,
    base_url: String,
    token: Option<String>,
}

impl HttpObjectStorage {
    /// Create a storage client for the given endpoint.
    pub fn new(base_url: impl Into<String>, token: Option<String>) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(PROVIDER_TIMEOUT_SECS))
            .build()
            .expect("Failed to create HTTP client");

        let base_url = base_url.into();
        info!(
            subsystem = "media",
            component = "storage",
            op = "init",
            "Initializing object storage: {}",
            base_url
        );
        Self {
            client,
            base_url,
            token,
        }
    }

    /// Create from environment variables.
    ///
    /// | Variable | Description |
    /// |----------|-------------|
    /// | `GALDEX_STORAGE_URL` | Base URL of the image bed |
    /// | `GALDEX_STORAGE_TOKEN` | Optional bearer token |
    pub fn from_env() -> Result<Self> {
        let base_url = std::env::var("GALDEX_STORAGE_URL")
            .map_err(|_| Error::Config("GALDEX_STORAGE_URL not set".to_string()))?;
        let token = std::env::var("GALDEX_STORAGE_TOKEN").ok();
        Ok(Self::new(base_url, token))
    }

    fn object_url(&self, key: &str) -> String {
        format!("{}/{}", self.base_url.trim_end_matches('/'), key)
    }
}

#[async_trait]
impl ObjectStorage for HttpObjectStorage {
    async fn put(&self, key: &str, bytes: Bytes) -> Result<()> {
        let mut req = self.client.put(self.object_url(key)).body(bytes);
        if let Some(token) = &self.token {
            req = req.bearer_auth(token);
        }

        let response = req.send().await?;
        if !response.status().is_success() {
            return Err(Error::Storage(format!(
                "put {} failed with status {}",
                key,
                response.status()
            )));
        }
        debug!(
            subsystem = "media",
            component = "storage",
            op = "put",
            "Stored object: {}",
            key
        );
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<()> {
        let mut req = self.client.delete(self.object_url(key));
        if let Some(token) = &self.token {
            req = req.bearer_auth(token);
        }

        let response = req.send().await?;
        if !response.status().is_success() {
            return Err(Error::Storage(format!(
                "delete {} failed with status {}",
                key,
                response.status()
            )));
        }
        debug!(
            subsystem = "media",
            component = "storage",
            op = "delete",
            "Deleted object: {}",
            key
        );
        Ok(())
    }
}

/// In-memory object storage for tests.
#[derive(Default)]
pub struct MemoryObjectStorage {
    objects: Mutex<HashMap<String, Bytes>>,
}

impl MemoryObjectStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored objects.
    pub fn len(&self) -> usize {
        self.objects.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Stored payload for a key, if present.
    pub fn get(&self, key: &str) -> Option<Bytes> {
        self.objects.lock().unwrap().get(key).cloned()
    }

    /// All stored keys, sorted.
    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.objects.lock().unwrap().keys().cloned().collect();
        keys.sort();
        keys
    }
}

#[async_trait]
impl ObjectStorage for MemoryObjectStorage {
    async fn put(&self, key: &str, bytes: Bytes) -> Result<()> {
        self.objects.lock().unwrap().insert(key.to_string(), bytes);
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<()> {
        self.objects.lock().unwrap().remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_memory_storage_put_get_delete() {
        let storage = MemoryObjectStorage::new();
        assert!(storage.is_empty());

        storage
            .put("entry/1/banner/banner.avif", Bytes::from_static(b"avif"))
            .await
            .unwrap();
        assert_eq!(storage.len(), 1);
        assert_eq!(
            storage.get("entry/1/banner/banner.avif").unwrap(),
            Bytes::from_static(b"avif")
        );

        storage.delete("entry/1/banner/banner.avif").await.unwrap();
        assert!(storage.is_empty());
    }

    #[test]
    fn test_object_url_joins_cleanly() {
        let storage = HttpObjectStorage::new("https://img.example/", None);
        assert_eq!(
            storage.object_url("entry/1/banner/banner.avif"),
            "https://img.example/entry/1/banner/banner.avif"
        );
    }
}
