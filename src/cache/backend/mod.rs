//! Cache Backends
//!
//! The hot tier needs two primitives from its backing store: a key/value map
//! with a TTL per key, and a score-sorted set used to rank popular paths.
//! Any store offering both (an in-process map, a Redis-compatible server)
//! can sit behind [`CacheBackend`].

mod memory;
mod redis;

pub use self::memory::{MemoryCacheBackend, MemoryCacheBackendConfig};
pub use self::redis::{RedisCacheBackend, RedisCacheBackendConfig};

use crate::error::Result;
use async_trait::async_trait;
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

// =============================================================================
// Backend Selection
// =============================================================================

/// Which store backs the hot tier
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CacheBackendKind {
    /// In-process, lost on restart
    #[default]
    Memory,
    /// Shared Redis-compatible server
    Redis,
}

impl std::fmt::Display for CacheBackendKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CacheBackendKind::Memory => write!(f, "memory"),
            CacheBackendKind::Redis => write!(f, "redis"),
        }
    }
}

// =============================================================================
// CacheBackend Trait
// =============================================================================

/// Trait for the store behind the hot cache tier
#[async_trait]
pub trait CacheBackend: Send + Sync {
    /// Short backend name for logs
    fn name(&self) -> &'static str;

    /// Get a live value by key
    async fn get(&self, key: &str) -> Result<Option<Bytes>>;

    /// Store a value that expires after `ttl`
    async fn set(&self, key: &str, value: Bytes, ttl: Duration) -> Result<()>;

    /// Store several values in one round trip
    async fn set_many(&self, entries: Vec<(String, Bytes, Duration)>) -> Result<()> {
        for (key, value, ttl) in entries {
            self.set(&key, value, ttl).await?;
        }
        Ok(())
    }

    /// Remaining lifetime of a key, `None` if absent or expired
    async fn ttl(&self, key: &str) -> Result<Option<Duration>>;

    /// Add `delta` to a member's score, returning the new score
    async fn incr_score(&self, set: &str, member: &str, delta: f64) -> Result<f64>;

    /// Current score of a member
    async fn score(&self, set: &str, member: &str) -> Result<Option<f64>>;

    /// Highest-scored members, descending
    async fn top_members(&self, set: &str, count: usize) -> Result<Vec<(String, f64)>>;

    /// Check if the backend is reachable
    async fn health_check(&self) -> Result<bool>;
}

/// Type alias for Arc'd cache backend
pub type CacheBackendRef = Arc<dyn CacheBackend>;
