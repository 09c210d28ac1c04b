//! Redis-backed key-value cache.
//!
//! Advisory by contract: every provider error is logged and reported as a
//! miss or no-op so callers fall through to the authoritative source. Cache
//! unavailability is never fatal.
//!
//! ## Configuration
//!
//! Environment variables:
//! - `REDIS_ENABLED`: Set to "false" to disable caching (default: true)
//! - `REDIS_URL`: Redis connection URL (default: redis://localhost:6379)

use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, error, info, warn};

use galdex_core::defaults::CACHE_KEY_PREFIX;

/// Key-value cache backed by Redis.
#[derive(Clone)]
pub struct KvCache {
    inner: Arc<KvCacheInner>,
}

struct KvCacheInner {
    /// Redis connection manager (None if disabled).
    connection: RwLock<Option<ConnectionManager>>,
    /// Whether caching is enabled.
    enabled: bool,
    /// Cache key prefix.
    prefix: String,
}

impl KvCache {
    /// Create a cache from environment configuration.
    pub async fn from_env() -> Self {
        let enabled = std::env::var("REDIS_ENABLED")
            .map(|v| v != "false" && v != "0")
            .unwrap_or(true);

        let redis_url =
            std::env::var("REDIS_URL").unwrap_or_else(|_| "redis://localhost:6379".to_string());

        let connection = if enabled {
            match redis::Client::open(redis_url.as_str()) {
                Ok(client) => match ConnectionManager::new(client).await {
                    Ok(conn) => {
                        info!(
                            subsystem = "cache",
                            component = "kv",
                            "Redis cache enabled"
                        );
                        Some(conn)
                    }
                    Err(e) => {
                        warn!("Failed to connect to Redis, cache disabled: {}", e);
                        None
                    }
                },
                Err(e) => {
                    warn!("Invalid Redis URL, cache disabled: {}", e);
                    None
                }
            }
        } else {
            info!("Redis cache disabled via REDIS_ENABLED=false");
            None
        };

        Self {
            inner: Arc::new(KvCacheInner {
                connection: RwLock::new(connection),
                enabled,
                prefix: CACHE_KEY_PREFIX.to_string(),
            }),
        }
    }

    /// Create a disabled cache (for testing or when Redis unavailable).
    pub fn disabled() -> Self {
        Self {
            inner: Arc::new(KvCacheInner {
                connection: RwLock::new(None),
                enabled: false,
                prefix: CACHE_KEY_PREFIX.to_string(),
            }),
        }
    }

    /// Check if caching is enabled and connected.
    pub async fn is_connected(&self) -> bool {
        self.inner.enabled && self.inner.connection.read().await.is_some()
    }

    /// Namespaced cache key.
    pub fn key(&self, raw: &str) -> String {
        format!("{}{}", self.inner.prefix, raw)
    }

    /// Connection handle for one operation. `ConnectionManager` multiplexes
    /// internally, so a clone taken under the read lock is enough and
    /// concurrent cache traffic never serializes on the lock.
    async fn connection(&self) -> Option<ConnectionManager> {
        self.inner.connection.read().await.as_ref().cloned()
    }

    /// Get a cached value. Any provider error is logged and reported as a
    /// miss.
    pub async fn get(&self, key: &str) -> Option<String> {
        let key = self.key(key);
        let mut conn = self.connection().await?;

        match conn.get::<_, Option<String>>(&key).await {
            Ok(Some(value)) => {
                debug!("Cache HIT: {}", key);
                Some(value)
            }
            Ok(None) => {
                debug!("Cache MISS: {}", key);
                None
            }
            Err(e) => {
                error!("Redis GET error for {}: {}", key, e);
                None
            }
        }
    }

    /// Store a value with a TTL. Returns whether the write happened.
    pub async fn set_with_ttl(&self, key: &str, value: &str, ttl_secs: u64) -> bool {
        let key = self.key(key);
        let mut conn = match self.connection().await {
            Some(c) => c,
            None => return false,
        };

        match conn.set_ex::<_, _, ()>(&key, value, ttl_secs).await {
            Ok(_) => {
                debug!("Cache SET: {} (TTL: {}s)", key, ttl_secs);
                true
            }
            Err(e) => {
                error!("Redis SET error for {}: {}", key, e);
                false
            }
        }
    }

    /// Delete a key. Returns whether the delete was issued.
    pub async fn del(&self, key: &str) -> bool {
        let key = self.key(key);
        let mut conn = match self.connection().await {
            Some(c) => c,
            None => return false,
        };

        match conn.del::<_, ()>(&key).await {
            Ok(_) => {
                debug!("Cache DEL: {}", key);
                true
            }
            Err(e) => {
                error!("Redis DEL error for {}: {}", key, e);
                false
            }
        }
    }
}
