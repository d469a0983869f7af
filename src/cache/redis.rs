//! Redis-backed cache implementation

use super::CacheClient;
use crate::error::{Error, Result};
use async_trait::async_trait;
use redis::{aio::MultiplexedConnection, AsyncCommands, Client, RedisError, RedisResult};
use std::future::Future;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, warn};

/// Redis cache client
#[derive(Debug, Clone)]
pub struct RedisCache {
    client: Client,
    connection: Arc<RwLock<Option<MultiplexedConnection>>>,
}

impl RedisCache {
    /// Connect to `redis_url`
    pub async fn new(redis_url: &str) -> Result<Self> {
        let client = Client::open(redis_url)
            .map_err(|e| Error::Cache(format!("Failed to create Redis client: {}", e)))?;

        let connection = client
            .get_multiplexed_async_connection()
            .await
            .map_err(|e| Error::Cache(format!("Failed to connect to Redis: {}", e)))?;

        Ok(Self {
            client,
            connection: Arc::new(RwLock::new(Some(connection))),
        })
    }

    /// Shared multiplexed connection; commands on clones run concurrently
    async fn connection(&self) -> Result<MultiplexedConnection> {
        if let Some(conn) = self.connection.read().await.as_ref() {
            return Ok(conn.clone());
        }
        self.reconnect().await
    }

    async fn reconnect(&self) -> Result<MultiplexedConnection> {
        let mut conn_lock = self.connection.write().await;
        let new_conn = self
            .client
            .get_multiplexed_async_connection()
            .await
            .map_err(|e| Error::Cache(format!("Failed to reconnect to Redis: {}", e)))?;

        *conn_lock = Some(new_conn.clone());
        debug!("Successfully reconnected to Redis");
        Ok(new_conn)
    }

    /// Run `op`, reconnecting and retrying once if the connection dropped
    async fn run<T, F, Fut>(&self, op: F) -> Result<T>
    where
        F: Fn(MultiplexedConnection) -> Fut,
        Fut: Future<Output = RedisResult<T>>,
    {
        let conn = self.connection().await?;
        match op(conn).await {
            Err(e) if is_connection_error(&e) => {
                warn!(error = %e, "Redis connection lost, attempting to reconnect");
                let conn = self.reconnect().await?;
                Ok(op(conn).await?)
            }
            result => Ok(result?),
        }
    }
}

fn is_connection_error(err: &RedisError) -> bool {
    err.is_io_error() || err.is_connection_dropped() || err.is_connection_refusal()
}

#[async_trait]
impl CacheClient for RedisCache {
    async fn get_raw(&self, key: &str) -> Result<Option<String>> {
        self.run(|mut conn| async move { conn.get::<_, Option<String>>(key).await })
            .await
    }

    async fn set_raw(&self, key: &str, value: String, ttl_seconds: u64) -> Result<()> {
        // SETEX rejects a zero TTL
        let ttl = ttl_seconds.max(1);
        self.run(|mut conn| {
            let value = value.clone();
            async move { conn.set_ex::<_, _, ()>(key, value, ttl).await }
        })
        .await
    }

    async fn del(&self, key: &str) -> Result<bool> {
        let deleted: i64 = self
            .run(|mut conn| async move { conn.del::<_, i64>(key).await })
            .await?;
        Ok(deleted > 0)
    }

    async fn clear_by_pattern(&self, pattern: &str) -> Result<u64> {
        let deleted = self
            .run(|mut conn| async move {
                let mut keys = Vec::new();
                let mut cursor: u64 = 0;
                loop {
                    let (next, batch): (u64, Vec<String>) = redis::cmd("SCAN")
                        .arg(cursor)
                        .arg("MATCH")
                        .arg(pattern)
                        .arg("COUNT")
                        .arg(500)
                        .query_async(&mut conn)
                        .await?;
                    keys.extend(batch);
                    if next == 0 {
                        break;
                    }
                    cursor = next;
                }

                if keys.is_empty() {
                    return Ok(0);
                }
                conn.del::<_, u64>(&keys).await
            })
            .await?;

        debug!("Cleared {} Redis keys matching {}", deleted, pattern);
        Ok(deleted)
    }
}
