//! Cache Prewarming
//!
//! Refills the hot tier with the most popular paths so they survive TTL
//! expiry. A [`Prewarmer`] runs [`HotCache::prewarm`] on an interval until
//! shutdown.

use crate::cache::entry::HotCacheKey;
use crate::cache::manager::HotCache;
use crate::domain::record::VideoPayload;
use crate::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

// =============================================================================
// Prewarm Configuration
// =============================================================================

/// Configuration for prewarm runs
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PrewarmConfig {
    /// Whether the periodic task runs at all
    pub enabled: bool,
    /// Number of most popular paths refilled per run
    pub top_k: usize,
    /// Maximum concurrent loads
    pub max_concurrent: usize,
    /// Seconds between runs
    pub interval_secs: u64,
    /// Run once immediately instead of waiting a full interval
    pub run_on_start: bool,
}

impl Default for PrewarmConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            top_k: 20,
            max_concurrent: 8,
            interval_secs: 300,
            run_on_start: true,
        }
    }
}

impl PrewarmConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs.max(1))
    }
}

// =============================================================================
// Loader Port
// =============================================================================

/// Source of payloads for prewarming, normally the store + resolve pipeline
#[async_trait]
pub trait PrewarmLoader: Send + Sync {
    /// Load the payload currently resolved for `key`
    async fn load(&self, key: &HotCacheKey, cancel: &CancellationToken) -> Result<VideoPayload>;
}

/// Type alias for Arc'd loader
pub type PrewarmLoaderRef = Arc<dyn PrewarmLoader>;

// =============================================================================
// Prewarm Report
// =============================================================================

/// Outcome of one prewarm run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PrewarmReport {
    /// Popular members considered
    pub candidates: usize,
    /// Entries written with the hot TTL
    pub loaded: usize,
    /// Members skipped because loading failed
    pub failed: usize,
}

// =============================================================================
// Prewarmer
// =============================================================================

/// Periodic prewarm task
pub struct Prewarmer {
    cache: Arc<HotCache>,
    loader: PrewarmLoaderRef,
    config: PrewarmConfig,
}

impl Prewarmer {
    pub fn new(cache: Arc<HotCache>, loader: PrewarmLoaderRef, config: PrewarmConfig) -> Self {
        Self {
            cache,
            loader,
            config,
        }
    }

    /// Run a single prewarm pass
    pub async fn run_once(&self, cancel: &CancellationToken) -> Result<PrewarmReport> {
        self.cache
            .prewarm(
                self.loader.as_ref(),
                self.config.top_k,
                self.config.max_concurrent,
                cancel,
            )
            .await
    }

    /// Spawn the periodic loop; it exits when `shutdown` is cancelled
    pub fn spawn(self, shutdown: CancellationToken) -> JoinHandle<()> {
        tokio::spawn(async move {
            if !self.config.enabled {
                debug!("Prewarm disabled");
                return;
            }

            let mut ticker = tokio::time::interval(self.config.interval());
            if !self.config.run_on_start {
                // First tick completes immediately
                ticker.tick().await;
            }

            info!(
                interval_secs = self.config.interval_secs,
                top_k = self.config.top_k,
                "Prewarm task started"
            );

            loop {
                tokio::select! {
                    _ = shutdown.cancelled() => break,
                    _ = ticker.tick() => {}
                }

                match self.run_once(&shutdown).await {
                    Ok(report) => debug!(
                        candidates = report.candidates,
                        loaded = report.loaded,
                        failed = report.failed,
                        "Prewarm pass finished"
                    ),
                    Err(e) if shutdown.is_cancelled() => {
                        debug!(error = %e, "Prewarm pass interrupted by shutdown");
                    }
                    Err(e) => warn!(error = %e, "Prewarm pass failed"),
                }
            }

            info!("Prewarm task stopped");
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::backend::{CacheBackend, MemoryCacheBackend};
    use crate::cache::manager::HotCacheConfig;

    struct StaticLoader;

    #[async_trait]
    impl PrewarmLoader for StaticLoader {
        async fn load(&self, key: &HotCacheKey, _cancel: &CancellationToken) -> Result<VideoPayload> {
            Ok(VideoPayload::new(format!("V{}", key.path()), "T"))
        }
    }

    #[test]
    fn test_default_config() {
        let config = PrewarmConfig::default();
        assert_eq!(config.top_k, 20);
        assert_eq!(config.interval(), Duration::from_secs(300));

        let zero = PrewarmConfig {
            interval_secs: 0,
            ..Default::default()
        };
        assert_eq!(zero.interval(), Duration::from_secs(1));
    }

    #[tokio::test]
    async fn test_periodic_task_runs_and_stops() {
        let backend = Arc::new(MemoryCacheBackend::new());
        let cache = Arc::new(HotCache::with_config(backend.clone(), HotCacheConfig::default()));
        backend
            .incr_score("content:popular", "https://x.com/a", 10.0)
            .await
            .unwrap();

        let config = PrewarmConfig {
            interval_secs: 3600,
            ..Default::default()
        };
        let shutdown = CancellationToken::new();
        let handle = Prewarmer::new(cache.clone(), Arc::new(StaticLoader), config)
            .spawn(shutdown.clone());

        // run_on_start fills the cache without waiting an interval
        let mut filled = false;
        for _ in 0..50 {
            if backend.get("content.render.https://x.com/a").await.unwrap().is_some() {
                filled = true;
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert!(filled);

        shutdown.cancel();
        tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .unwrap()
            .unwrap();
    }

    #[tokio::test]
    async fn test_disabled_task_exits() {
        let cache = Arc::new(HotCache::new(Arc::new(MemoryCacheBackend::new())));
        let config = PrewarmConfig {
            enabled: false,
            ..Default::default()
        };
        let handle = Prewarmer::new(cache, Arc::new(StaticLoader), config)
            .spawn(CancellationToken::new());
        tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .unwrap()
            .unwrap();
    }
}
