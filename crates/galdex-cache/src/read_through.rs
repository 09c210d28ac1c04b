//! Read-through caching with request coalescing.

use serde::de::DeserializeOwned;
use serde::Serialize;
use std::future::Future;
use tracing::warn;

use galdex_core::defaults::LIST_CACHE_TTL_SECS;
use galdex_core::{Error, Result};

use crate::kv::KvCache;
use crate::singleflight::Singleflight;

/// Cache front for listing-style reads.
///
/// Values are stored as JSON. A miss runs the fetcher at most once per key
/// across concurrent callers.
#[derive(Clone)]
pub struct ReadThroughCache {
    kv: KvCache,
    flight: Singleflight<String>,
}

impl ReadThroughCache {
    pub fn new(kv: KvCache) -> Self {
        Self {
            kv,
            flight: Singleflight::new(),
        }
    }

    /// Fetch `key` with the default listing TTL.
    pub async fn get_or_fetch<T, F, Fut>(&self, key: &str, fetcher: F) -> Result<T>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        self.get_or_fetch_with_ttl(key, LIST_CACHE_TTL_SECS, fetcher)
            .await
    }

    /// Fetch `key`, consulting the cache first and populating it on a miss.
    pub async fn get_or_fetch_with_ttl<T, F, Fut>(
        &self,
        key: &str,
        ttl_secs: u64,
        fetcher: F,
    ) -> Result<T>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let kv = self.kv.clone();
        let owned_key = key.to_string();
        let json = self
            .flight
            .run(key, || async move {
                if let Some(cached) = kv.get(&owned_key).await {
                    return Ok(cached);
                }
                let value = fetcher().await?;
                let json = serde_json::to_string(&value)?;
                kv.set_with_ttl(&owned_key, &json, ttl_secs).await;
                Ok(json)
            })
            .await?;

        serde_json::from_str(&json).map_err(|e| {
            warn!(subsystem = "cache", key, "cached payload failed to deserialize: {}", e);
            Error::Serialization(e.to_string())
        })
    }

    /// Drop a cached key after a write invalidates it.
    pub async fn invalidate(&self, key: &str) {
        self.kv.del(key).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[tokio::test]
    async fn test_disabled_cache_still_serves_the_fetcher() {
        let cache = ReadThroughCache::new(KvCache::disabled());
        let calls = Arc::new(AtomicUsize::new(0));

        for expected in [1usize, 2] {
            let counter = Arc::clone(&calls);
            let value: Vec<i64> = cache
                .get_or_fetch("entries:list", || async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    Ok(vec![1, 2, 3])
                })
                .await
                .unwrap();
            assert_eq!(value, vec![1, 2, 3]);
            assert_eq!(calls.load(Ordering::SeqCst), expected);
        }
    }

    #[tokio::test]
    async fn test_fetcher_error_propagates() {
        let cache = ReadThroughCache::new(KvCache::disabled());
        let result: Result<Vec<i64>> = cache
            .get_or_fetch("entries:list", || async {
                Err(Error::NotFound("nothing here".to_string()))
            })
            .await;
        assert!(result.is_err());
    }
}
