//! Key/value cache facade
//!
//! Every component that caches derived data (processed SEO fields, link
//! metrics) receives a `CacheClient` at construction. Values are stored as
//! JSON strings so that the in-memory and Redis backends behave the same.

pub mod memory;
#[cfg(feature = "redis-backend")]
pub mod redis;

pub use memory::MemoryCache;
#[cfg(feature = "redis-backend")]
pub use self::redis::RedisCache;

use crate::error::Result;
use async_trait::async_trait;
use serde::{de::DeserializeOwned, Serialize};
use std::sync::Arc;

/// Cache backend contract
#[async_trait]
pub trait CacheClient: Send + Sync + std::fmt::Debug {
    /// Raw value for `key`, `None` on miss or expiry
    async fn get_raw(&self, key: &str) -> Result<Option<String>>;

    /// Store `value` under `key` for `ttl_seconds`
    async fn set_raw(&self, key: &str, value: String, ttl_seconds: u64) -> Result<()>;

    /// Remove a single key, returns whether it existed
    async fn del(&self, key: &str) -> Result<bool>;

    /// Remove every key matching a glob-style `prefix*` pattern, returns the count removed
    async fn clear_by_pattern(&self, pattern: &str) -> Result<u64>;
}

/// Typed helpers on top of [`CacheClient`]
#[async_trait]
pub trait CacheExt: CacheClient {
    async fn get<T>(&self, key: &str) -> Result<Option<T>>
    where
        T: DeserializeOwned + Send,
    {
        match self.get_raw(key).await? {
            Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
            None => Ok(None),
        }
    }

    async fn set<T>(&self, key: &str, value: &T, ttl_seconds: u64) -> Result<()>
    where
        T: Serialize + Sync,
    {
        let raw = serde_json::to_string(value)?;
        self.set_raw(key, raw, ttl_seconds).await
    }
}

impl<C: CacheClient + ?Sized> CacheExt for C {}

pub type SharedCache = Arc<dyn CacheClient>;

/// Build the cache backend named in the configuration
pub async fn from_config(config: &crate::config::CacheConfig) -> Result<SharedCache> {
    match config.backend.as_str() {
        "memory" => Ok(Arc::new(MemoryCache::new())),
        #[cfg(feature = "redis-backend")]
        "redis" => {
            let url = config.redis_url.as_deref().ok_or_else(|| {
                crate::error::Error::Config("cache.redis_url is not set".to_string())
            })?;
            Ok(Arc::new(RedisCache::new(url).await?))
        }
        other => Err(crate::error::Error::Config(format!(
            "unsupported cache backend: {}",
            other
        ))),
    }
}

/// Glob match supporting a single trailing or embedded `*`
pub(crate) fn pattern_matches(pattern: &str, key: &str) -> bool {
    match pattern.split_once('*') {
        Some((prefix, suffix)) => {
            key.len() >= prefix.len() + suffix.len()
                && key.starts_with(prefix)
                && key.ends_with(suffix)
        }
        None => pattern == key,
    }
}
