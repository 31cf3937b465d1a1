//! Redis Cache Backend
//!
//! Entries are plain string keys set with a millisecond expiry; the
//! popularity ranking is a Redis sorted set. Any Redis-compatible server
//! works, so several resolver replicas can share one hot tier and it
//! survives resolver restarts.

use crate::cache::backend::CacheBackend;
use crate::error::{Error, Result};
use async_trait::async_trait;
use bytes::Bytes;
use redis::aio::ConnectionManager;
use redis::RedisError;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{info, warn};

// =============================================================================
// Configuration
// =============================================================================

/// Configuration for the Redis backend
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RedisCacheBackendConfig {
    /// Connection URL (`redis://`, `rediss://` or `unix://`)
    pub url: String,
    /// Applied with `CONFIG SET maxmemory` plus the `allkeys-lru` policy
    /// when set. Left alone when `None`, as managed servers often refuse it.
    pub max_memory: Option<String>,
}

impl Default for RedisCacheBackendConfig {
    fn default() -> Self {
        Self {
            url: "redis://127.0.0.1:6379".to_string(),
            max_memory: None,
        }
    }
}

// =============================================================================
// Redis Backend
// =============================================================================

fn unavailable(e: RedisError) -> Error {
    Error::CacheUnavailable {
        reason: format!("redis: {}", e),
    }
}

/// Expiry for `SET .. PX`; Redis rejects a zero expiry
fn expiry_millis(ttl: Duration) -> u64 {
    u64::try_from(ttl.as_millis()).unwrap_or(u64::MAX).max(1)
}

/// `PTTL` reply to a remaining lifetime (-2 absent, -1 no expiry)
fn remaining_ttl(pttl: i64) -> Option<Duration> {
    u64::try_from(pttl).ok().map(Duration::from_millis)
}

/// Stop rank for `ZREMRANGEBYRANK set 0 <stop>` keeping the top `max` members
fn trim_stop_rank(max: usize) -> i64 {
    -(i64::try_from(max).unwrap_or(i64::MAX - 1)) - 1
}

/// Cache backend on a Redis-compatible server
pub struct RedisCacheBackend {
    conn: ConnectionManager,
    config: RedisCacheBackendConfig,
    /// Members kept per sorted set; lower ranks are trimmed on each increment
    max_members: usize,
}

impl std::fmt::Debug for RedisCacheBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisCacheBackend")
            .field("config", &self.config)
            .field("max_members", &self.max_members)
            .finish_non_exhaustive()
    }
}

impl RedisCacheBackend {
    /// Connect and, if configured, apply the memory ceiling
    pub async fn connect(config: RedisCacheBackendConfig, max_members: usize) -> Result<Self> {
        info!("Connecting to Redis at {}", config.url);

        let client = redis::Client::open(config.url.as_str()).map_err(|e| {
            Error::Configuration(format!("invalid redis url '{}': {}", config.url, e))
        })?;
        let mut conn = client
            .get_connection_manager()
            .await
            .map_err(unavailable)?;

        if let Some(max_memory) = &config.max_memory {
            let applied = async {
                redis::cmd("CONFIG")
                    .arg("SET")
                    .arg("maxmemory")
                    .arg(max_memory)
                    .query_async::<_, ()>(&mut conn)
                    .await?;
                redis::cmd("CONFIG")
                    .arg("SET")
                    .arg("maxmemory-policy")
                    .arg("allkeys-lru")
                    .query_async::<_, ()>(&mut conn)
                    .await
            }
            .await;
            if let Err(e) = applied {
                warn!(error = %e, "Could not apply Redis memory ceiling");
            }
        }

        info!("Connected to Redis");
        Ok(Self {
            conn,
            config,
            max_members: max_members.max(1),
        })
    }

    pub fn config(&self) -> &RedisCacheBackendConfig {
        &self.config
    }
}

#[async_trait]
impl CacheBackend for RedisCacheBackend {
    fn name(&self) -> &'static str {
        "redis"
    }

    async fn get(&self, key: &str) -> Result<Option<Bytes>> {
        let mut conn = self.conn.clone();
        let value: Option<Vec<u8>> = redis::cmd("GET")
            .arg(key)
            .query_async(&mut conn)
            .await
            .map_err(unavailable)?;
        Ok(value.map(Bytes::from))
    }

    async fn set(&self, key: &str, value: Bytes, ttl: Duration) -> Result<()> {
        let mut conn = self.conn.clone();
        redis::cmd("SET")
            .arg(key)
            .arg(&value[..])
            .arg("PX")
            .arg(expiry_millis(ttl))
            .query_async::<_, ()>(&mut conn)
            .await
            .map_err(unavailable)
    }

    async fn set_many(&self, entries: Vec<(String, Bytes, Duration)>) -> Result<()> {
        if entries.is_empty() {
            return Ok(());
        }

        let mut pipe = redis::pipe();
        for (key, value, ttl) in &entries {
            pipe.cmd("SET")
                .arg(key)
                .arg(&value[..])
                .arg("PX")
                .arg(expiry_millis(*ttl))
                .ignore();
        }

        let mut conn = self.conn.clone();
        pipe.query_async::<_, ()>(&mut conn)
            .await
            .map_err(unavailable)
    }

    async fn ttl(&self, key: &str) -> Result<Option<Duration>> {
        let mut conn = self.conn.clone();
        let pttl: i64 = redis::cmd("PTTL")
            .arg(key)
            .query_async(&mut conn)
            .await
            .map_err(unavailable)?;
        Ok(remaining_ttl(pttl))
    }

    async fn incr_score(&self, set: &str, member: &str, delta: f64) -> Result<f64> {
        // Increment and trim in one transaction so the set never outgrows
        // its cap. Ties at the cut are trimmed in Redis rank order.
        let mut conn = self.conn.clone();
        let (score,): (f64,) = redis::pipe()
            .atomic()
            .cmd("ZINCRBY")
            .arg(set)
            .arg(delta)
            .arg(member)
            .cmd("ZREMRANGEBYRANK")
            .arg(set)
            .arg(0)
            .arg(trim_stop_rank(self.max_members))
            .ignore()
            .query_async(&mut conn)
            .await
            .map_err(unavailable)?;
        Ok(score)
    }

    async fn score(&self, set: &str, member: &str) -> Result<Option<f64>> {
        let mut conn = self.conn.clone();
        redis::cmd("ZSCORE")
            .arg(set)
            .arg(member)
            .query_async(&mut conn)
            .await
            .map_err(unavailable)
    }

    async fn top_members(&self, set: &str, count: usize) -> Result<Vec<(String, f64)>> {
        if count == 0 {
            return Ok(Vec::new());
        }

        let mut conn = self.conn.clone();
        redis::cmd("ZREVRANGE")
            .arg(set)
            .arg(0)
            .arg(count - 1)
            .arg("WITHSCORES")
            .query_async(&mut conn)
            .await
            .map_err(unavailable)
    }

    async fn health_check(&self) -> Result<bool> {
        let mut conn = self.conn.clone();
        let pong: std::result::Result<String, RedisError> =
            redis::cmd("PING").query_async(&mut conn).await;
        Ok(pong.is_ok())
    }
}

// =============================================================================
// Tests
// =============================================================================
