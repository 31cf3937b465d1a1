//! Hot Cache Tier
//!
//! A popularity-tracked, TTL-bound cache of resolved payloads keyed by
//! origin-qualified request path.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │                            HotCache                                 │
//! ├─────────────────────────────────────────────────────────────────────┤
//! │  get ──► incr_score(content:popular) ──► get(content.render.<key>)  │
//! │  set ──► score ──► TtlPolicy (>5: hot 24h, else default 30m) ──► set │
//! │  prewarm ──► top_members(K) ──► loader ──► set_many(hot TTL)         │
//! ├─────────────────────────────────────────────────────────────────────┤
//! │                       CacheBackend (port)                           │
//! │        key/value with per-key TTL  +  score-sorted popularity set   │
//! │   MemoryCacheBackend: LRU over max_entries  |  RedisCacheBackend    │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Caching is best-effort: backend failures on `get` are returned for the
//! caller to treat as a miss, failures on `set` are logged and dropped.

pub mod backend;
pub mod entry;
pub mod events;
pub mod manager;
pub mod metrics;
pub mod prewarm;
pub mod tier;

// Re-export main types
pub use backend::{
    CacheBackend, CacheBackendKind, CacheBackendRef, MemoryCacheBackend, MemoryCacheBackendConfig,
    RedisCacheBackend, RedisCacheBackendConfig,
};
pub use entry::{CachedEntry, HotCacheKey};
pub use events::CacheEvent;
pub use manager::{HotCache, HotCacheConfig};
pub use metrics::{CacheMetrics, CacheStatsSnapshot};
pub use prewarm::{PrewarmConfig, PrewarmLoader, PrewarmLoaderRef, PrewarmReport, Prewarmer};
pub use tier::{TtlPolicy, TtlTier, DEFAULT_HOT_TTL_SECS, DEFAULT_POPULARITY_THRESHOLD, DEFAULT_TTL_SECS};
