//! Content Resolver
//!
//! Resolves registered video content for a requested URL. Content is
//! registered per origin under a path pattern that may contain `*`
//! segments; lookups match a concrete request path against those patterns.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                     REST API (axum)  /v1/content                         │
//! ├─────────────────────────────────────────────────────────────────────────┤
//! │                          ContentService                                  │
//! │     register_content ─────────────┐      resolve_content                 │
//! │                                   │        │                             │
//! │                                   │   ┌────┴─────────┐  miss/error       │
//! │                                   │   │  Hot Cache   │──────────┐        │
//! │                                   │   │ (popularity  │          │        │
//! │                                   │   │  TTL tiers)  │◄─ fill ──┤        │
//! │                                   │   └──────────────┘          │        │
//! │                                   ▼                             ▼        │
//! │                       ┌─────────────────────────────────────────────┐    │
//! │                       │  ContentRepository (one collection/origin)   │    │
//! │                       │  FileContentStore: JSON file, per-origin     │    │
//! │                       │  RwLock, temp-file + rename                  │    │
//! │                       └─────────────────────────────────────────────┘    │
//! │                                   │                                      │
//! │                       ContentCollection::resolve                         │
//! │                       exact key ─► best wildcard pattern                 │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Modules
//!
//! - [`domain`]: Key model, records, collections and the repository port
//! - [`store`]: Persistent content stores
//! - [`cache`]: Popularity-tiered hot cache and prewarming
//! - [`service`]: Register and resolve operations
//! - [`api`]: REST adapter
//! - [`config`]: YAML configuration
//! - [`telemetry`]: Prometheus metrics
//! - [`error`]: Error types and handling

pub mod api;
pub mod cache;
pub mod config;
pub mod domain;
pub mod error;
pub mod service;
pub mod store;
pub mod telemetry;

// Re-export commonly used types
pub use api::{ApiServer, ApiServerConfig, RestRouter};

pub use cache::{
    CacheBackend, CacheBackendKind, CacheBackendRef, HotCache, HotCacheConfig, HotCacheKey,
    MemoryCacheBackend, PrewarmConfig, PrewarmLoader, PrewarmReport, Prewarmer,
    RedisCacheBackend, TtlPolicy, TtlTier,
};

pub use config::ResolverConfig;

pub use domain::{
    derive_origin_key, derive_path_key, ContentCollection, ContentRecord, ContentRepository,
    ContentRepositoryRef, OriginKey, PathKey, VideoPayload,
};

pub use error::{Error, ErrorKind, Result};

pub use service::{ContentService, Resolution, StoreResolver};

pub use store::{FileContentStore, FileStoreConfig, MemoryContentStore};

pub use telemetry::{ResolutionSource, ResolverMetrics};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");
