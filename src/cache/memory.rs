use super::{pattern_matches, CacheClient};
use crate::error::Result;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;

#[derive(Debug, Clone)]
struct Entry {
    value: String,
    expires_at: Instant,
}

/// In-process cache with per-entry TTL.
///
/// Suitable for single-instance deployments and tests. Expired entries are
/// dropped lazily on read and on pattern clears.
#[derive(Debug, Clone, Default)]
pub struct MemoryCache {
    entries: Arc<RwLock<HashMap<String, Entry>>>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live entries
    pub async fn len(&self) -> usize {
        let now = Instant::now();
        let entries = self.entries.read().await;
        entries.values().filter(|e| e.expires_at > now).count()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[async_trait]
impl CacheClient for MemoryCache {
    async fn get_raw(&self, key: &str) -> Result<Option<String>> {
        {
            let entries = self.entries.read().await;
            match entries.get(key) {
                Some(entry) if entry.expires_at > Instant::now() => {
                    return Ok(Some(entry.value.clone()))
                }
                Some(_) => {}
                None => return Ok(None),
            }
        }

        // expired
        let mut entries = self.entries.write().await;
        entries.remove(key);
        Ok(None)
    }

    async fn set_raw(&self, key: &str, value: String, ttl_seconds: u64) -> Result<()> {
        let mut entries = self.entries.write().await;
        entries.insert(
            key.to_string(),
            Entry {
                value,
                expires_at: Instant::now() + Duration::from_secs(ttl_seconds),
            },
        );
        Ok(())
    }

    async fn del(&self, key: &str) -> Result<bool> {
        let mut entries = self.entries.write().await;
        Ok(entries.remove(key).is_some())
    }

    async fn clear_by_pattern(&self, pattern: &str) -> Result<u64> {
        let mut entries = self.entries.write().await;
        let now = Instant::now();
        let mut removed = 0u64;
        entries.retain(|key, entry| {
            if entry.expires_at <= now {
                return false;
            }
            if pattern_matches(pattern, key) {
                removed += 1;
                return false;
            }
            true
        });
        Ok(removed)
    }
}
