//! Resolver Configuration
//!
//! One YAML document configures every component. All sections are
//! optional; missing fields take their defaults.
//!
//! ```yaml
//! store:
//!   root_path: assets/tmp
//! cache:
//!   backend: redis
//!   redis:
//!     url: "redis://127.0.0.1:6379"
//!   key_prefix: "content.render."
//!   ttl:
//!     popularity_threshold: 5
//!     hot_ttl_secs: 86400
//! prewarm:
//!   top_k: 20
//! api:
//!   listen_addr: "0.0.0.0:8080"
//! ```

use crate::api::ApiServerConfig;
use crate::cache::{CacheBackendKind, HotCacheConfig, PrewarmConfig};
use crate::error::{Error, Result};
use crate::store::FileStoreConfig;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Top-level configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResolverConfig {
    pub store: FileStoreConfig,
    pub cache: HotCacheConfig,
    pub prewarm: PrewarmConfig,
    pub api: ApiServerConfig,
}

impl ResolverConfig {
    /// Parse and validate a YAML document
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let config: Self = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a YAML file
    pub async fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let yaml = tokio::fs::read_to_string(path).await.map_err(|e| {
            Error::Configuration(format!("cannot read {}: {}", path.display(), e))
        })?;
        Self::from_yaml(&yaml)
    }

    /// Reject settings no component can run with
    pub fn validate(&self) -> Result<()> {
        if self.store.root_path.as_os_str().is_empty() {
            return Err(Error::Configuration("store.root_path is empty".into()));
        }
        if self.cache.key_prefix.is_empty() {
            return Err(Error::Configuration("cache.key_prefix is empty".into()));
        }
        if self.cache.popularity_set.is_empty() {
            return Err(Error::Configuration("cache.popularity_set is empty".into()));
        }
        if !self.cache.ttl.popularity_threshold.is_finite() {
            return Err(Error::Configuration(
                "cache.ttl.popularity_threshold must be finite".into(),
            ));
        }
        if self.cache.ttl.hot_ttl_secs == 0 || self.cache.ttl.default_ttl_secs == 0 {
            return Err(Error::Configuration("cache TTLs must be positive".into()));
        }
        if self.cache.max_entries == 0 {
            return Err(Error::Configuration("cache.max_entries must be positive".into()));
        }
        if self.cache.max_popular_members == 0 {
            return Err(Error::Configuration(
                "cache.max_popular_members must be positive".into(),
            ));
        }
        if self.cache.backend == CacheBackendKind::Redis && self.cache.redis.url.trim().is_empty() {
            return Err(Error::Configuration(
                "cache.redis.url is required for the redis backend".into(),
            ));
        }
        if self.prewarm.max_concurrent == 0 {
            return Err(Error::Configuration(
                "prewarm.max_concurrent must be positive".into(),
            ));
        }
        Ok(())
    }
}
