//! Hot Cache Manager
//!
//! Popularity-aware cache in front of the persistent store. Every read bumps
//! the path's score in the popularity set; writes pick their TTL from that
//! score; prewarm refills the top-scored paths with the hot TTL.

use crate::cache::backend::{
    CacheBackendKind, CacheBackendRef, MemoryCacheBackend, MemoryCacheBackendConfig,
    RedisCacheBackend, RedisCacheBackendConfig,
};
use crate::cache::entry::{CachedEntry, HotCacheKey};
use crate::cache::events::CacheEvent;
use crate::cache::metrics::{CacheMetrics, CacheStatsSnapshot};
use crate::cache::prewarm::{PrewarmLoader, PrewarmReport};
use crate::cache::tier::{TtlPolicy, TtlTier};
use crate::domain::ports::cancellable;
use crate::domain::record::VideoPayload;
use crate::error::{Error, Result};
use bytes::Bytes;
use futures::stream::{self, StreamExt};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

// =============================================================================
// Configuration
// =============================================================================

/// Configuration for the hot cache
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HotCacheConfig {
    /// When false every lookup misses and writes are skipped
    pub enabled: bool,
    /// Prefix of every entry key in the backend
    pub key_prefix: String,
    /// Name of the popularity sorted set
    pub popularity_set: String,
    /// Tier threshold and TTLs
    pub ttl: TtlPolicy,
    /// Store behind the tier
    pub backend: CacheBackendKind,
    /// Entry capacity of the in-memory backend
    pub max_entries: usize,
    /// Members kept in the popularity set, lowest-scored dropped first
    pub max_popular_members: usize,
    /// Connection settings when `backend` is `redis`
    pub redis: RedisCacheBackendConfig,
    /// Event channel capacity
    pub event_channel_capacity: usize,
}

impl Default for HotCacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            key_prefix: "content.render.".to_string(),
            popularity_set: "content:popular".to_string(),
            ttl: TtlPolicy::default(),
            backend: CacheBackendKind::Memory,
            max_entries: 100_000,
            max_popular_members: 100_000,
            redis: RedisCacheBackendConfig::default(),
            event_channel_capacity: 1024,
        }
    }
}

// =============================================================================
// Hot Cache
// =============================================================================

/// Popularity-tiered cache of resolved payloads
pub struct HotCache {
    backend: CacheBackendRef,
    config: HotCacheConfig,
    metrics: CacheMetrics,
    event_tx: broadcast::Sender<CacheEvent>,
}

impl HotCache {
    /// Create a hot cache with default configuration
    pub fn new(backend: CacheBackendRef) -> Self {
        Self::with_config(backend, HotCacheConfig::default())
    }

    pub fn with_config(backend: CacheBackendRef, config: HotCacheConfig) -> Self {
        let (event_tx, _) = broadcast::channel(config.event_channel_capacity.max(1));

        info!(
            backend = backend.name(),
            enabled = config.enabled,
            threshold = config.ttl.popularity_threshold,
            "Hot cache initialized"
        );

        Self {
            backend,
            config,
            metrics: CacheMetrics::new(),
            event_tx,
        }
    }

    /// Build the configured backend and a cache on top of it
    pub async fn connect(config: HotCacheConfig) -> Result<Self> {
        let backend: CacheBackendRef = match config.backend {
            CacheBackendKind::Memory => {
                Arc::new(MemoryCacheBackend::with_config(MemoryCacheBackendConfig {
                    max_entries: config.max_entries,
                    max_members: config.max_popular_members,
                }))
            }
            CacheBackendKind::Redis => Arc::new(
                RedisCacheBackend::connect(config.redis.clone(), config.max_popular_members)
                    .await?,
            ),
        };
        Ok(Self::with_config(backend, config))
    }

    /// Subscribe to cache events
    pub fn subscribe(&self) -> broadcast::Receiver<CacheEvent> {
        self.event_tx.subscribe()
    }

    fn emit_event(&self, event: CacheEvent) {
        let _ = self.event_tx.send(event);
    }

    pub fn config(&self) -> &HotCacheConfig {
        &self.config
    }

    pub fn backend_name(&self) -> &'static str {
        self.backend.name()
    }

    /// Get current statistics
    pub fn stats(&self) -> CacheStatsSnapshot {
        self.metrics.snapshot()
    }

    /// Look up the payload cached for `key`.
    ///
    /// The popularity score is bumped first, hit or miss. Absent, expired and
    /// undecodable entries all surface as [`Error::CacheMiss`]; backend
    /// failures are returned as-is for the caller to treat as a miss.
    pub async fn get(&self, key: &HotCacheKey, cancel: &CancellationToken) -> Result<VideoPayload> {
        let storage_key = key.storage_key(&self.config.key_prefix);
        if !self.config.enabled {
            return Err(Error::CacheMiss { key: storage_key });
        }

        let popularity = match cancellable(
            cancel,
            self.backend
                .incr_score(&self.config.popularity_set, &key.member(), 1.0),
        )
        .await
        {
            Ok(score) => score,
            Err(Error::Canceled) => return Err(Error::Canceled),
            Err(e) => {
                debug!(key = %key, error = %e, "Popularity update failed");
                0.0
            }
        };

        let raw = match cancellable(cancel, self.backend.get(&storage_key)).await {
            Ok(raw) => raw,
            Err(Error::Canceled) => return Err(Error::Canceled),
            Err(e) => {
                self.metrics.record_error();
                self.emit_event(CacheEvent::BackendUnavailable {
                    backend: self.backend.name().to_string(),
                    reason: e.to_string(),
                });
                return Err(e);
            }
        };

        let entry = raw.and_then(|bytes| match CachedEntry::from_bytes(&bytes) {
            Ok(entry) => Some(entry),
            Err(e) => {
                warn!(key = %storage_key, error = %e, "Discarding undecodable cache entry");
                None
            }
        });

        match entry {
            Some(entry) if !entry.is_expired() => {
                self.metrics.record_hit();
                self.emit_event(CacheEvent::Hit {
                    key: storage_key,
                    popularity,
                });
                debug!(key = %key, popularity, "Hot cache hit");
                Ok(entry.payload)
            }
            _ => {
                self.metrics.record_miss();
                self.emit_event(CacheEvent::Miss {
                    key: storage_key.clone(),
                });
                Err(Error::CacheMiss { key: storage_key })
            }
        }
    }

    /// Cache `payload` for `key` with a TTL chosen from its popularity.
    ///
    /// Best-effort: failures are logged and swallowed. Returns the tier the
    /// entry was written with, or `None` if nothing was written.
    pub async fn set(
        &self,
        key: &HotCacheKey,
        payload: VideoPayload,
        cancel: &CancellationToken,
    ) -> Option<TtlTier> {
        if !self.config.enabled {
            return None;
        }

        let storage_key = key.storage_key(&self.config.key_prefix);
        let score = match cancellable(
            cancel,
            self.backend.score(&self.config.popularity_set, &key.member()),
        )
        .await
        {
            Ok(score) => score.unwrap_or(0.0),
            Err(Error::Canceled) => return None,
            Err(e) => {
                debug!(key = %key, error = %e, "Popularity lookup failed");
                0.0
            }
        };

        let tier = self.config.ttl.tier_for(score);
        let ttl = self.config.ttl.ttl(tier);

        let written = match CachedEntry::new(payload, score, tier, ttl).to_bytes() {
            Ok(bytes) => cancellable(cancel, self.backend.set(&storage_key, bytes, ttl)).await,
            Err(e) => Err(e),
        };

        match written {
            Ok(()) => {
                self.metrics.record_set(tier == TtlTier::Hot);
                self.emit_event(CacheEvent::Set {
                    key: storage_key,
                    tier,
                    ttl_secs: ttl.as_secs(),
                });
                debug!(key = %key, %tier, score, "Hot cache entry written");
                Some(tier)
            }
            Err(e) => {
                self.metrics.record_set_failure();
                warn!(key = %key, error = %e, "Hot cache write dropped");
                self.emit_event(CacheEvent::SetFailed {
                    key: storage_key,
                    error: e.to_string(),
                });
                None
            }
        }
    }

    /// Refill the `top_k` most popular paths with the hot TTL.
    ///
    /// Members whose loader fails are skipped. All loaded entries are
    /// written in one batch.
    pub async fn prewarm(
        &self,
        loader: &dyn PrewarmLoader,
        top_k: usize,
        max_concurrent: usize,
        cancel: &CancellationToken,
    ) -> Result<PrewarmReport> {
        if !self.config.enabled || top_k == 0 {
            return Ok(PrewarmReport::default());
        }

        let members = cancellable(
            cancel,
            self.backend.top_members(&self.config.popularity_set, top_k),
        )
        .await?;
        let candidates = members.len();

        let loads = stream::iter(members)
            .map(|(member, score)| async move {
                let key = HotCacheKey::parse(&member)?;
                let payload = loader.load(&key, cancel).await?;
                Ok::<_, Error>((key, payload, score))
            })
            .buffer_unordered(max_concurrent.max(1))
            .collect::<Vec<_>>()
            .await;

        if cancel.is_cancelled() {
            return Err(Error::Canceled);
        }

        let hot_ttl = self.config.ttl.ttl(TtlTier::Hot);
        let mut batch: Vec<(String, Bytes, Duration)> = Vec::with_capacity(loads.len());
        let mut failed = 0;
        for load in loads {
            let encoded = load.and_then(|(key, payload, score)| {
                let bytes = CachedEntry::new(payload, score, TtlTier::Hot, hot_ttl).to_bytes()?;
                Ok((key.storage_key(&self.config.key_prefix), bytes))
            });
            match encoded {
                Ok((storage_key, bytes)) => batch.push((storage_key, bytes, hot_ttl)),
                Err(e) => {
                    debug!(error = %e, "Skipping prewarm candidate");
                    failed += 1;
                }
            }
        }

        let loaded = batch.len();
        if !batch.is_empty() {
            cancellable(cancel, self.backend.set_many(batch)).await?;
        }

        self.metrics.record_prewarmed(loaded as u64);
        self.emit_event(CacheEvent::PrewarmComplete {
            candidates,
            loaded,
            failed,
        });
        info!(candidates, loaded, failed, "Hot cache prewarmed");

        Ok(PrewarmReport {
            candidates,
            loaded,
            failed,
        })
    }

    /// Check if the backend is reachable
    pub async fn health_check(&self) -> Result<bool> {
        self.backend.health_check().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::backend::{CacheBackend, MemoryCacheBackend};
    use crate::cache::prewarm::PrewarmLoader;
    use assert_matches::assert_matches;
    use async_trait::async_trait;
    use std::sync::Arc;

    fn test_cache() -> (HotCache, Arc<MemoryCacheBackend>) {
        let backend = Arc::new(MemoryCacheBackend::new());
        (HotCache::new(backend.clone()), backend)
    }

    fn key(url: &str) -> HotCacheKey {
        HotCacheKey::parse(url).unwrap()
    }

    struct MapLoader;

    #[async_trait]
    impl PrewarmLoader for MapLoader {
        async fn load(&self, key: &HotCacheKey, _cancel: &CancellationToken) -> Result<VideoPayload> {
            if key.path().as_str().starts_with("/broken") {
                return Err(Error::ContentNotFound {
                    origin: key.origin().to_string(),
                    path: key.path().to_string(),
                });
            }
            Ok(VideoPayload::new(format!("V{}", key.path()), "T"))
        }
    }

    #[tokio::test]
    async fn test_miss_then_hit() {
        let (cache, _backend) = test_cache();
        let cancel = CancellationToken::new();
        let k = key("https://x.com/home/camisa");

        assert_matches!(cache.get(&k, &cancel).await, Err(Error::CacheMiss { .. }));

        let tier = cache.set(&k, VideoPayload::new("V1", "T1"), &cancel).await;
        assert_eq!(tier, Some(TtlTier::Default));

        let payload = cache.get(&k, &cancel).await.unwrap();
        assert_eq!(payload, VideoPayload::new("V1", "T1"));

        let stats = cache.stats();
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.sets, 1);
    }

    #[tokio::test]
    async fn test_popularity_counts_every_read() {
        let (cache, backend) = test_cache();
        let cancel = CancellationToken::new();
        let k = key("https://x.com/a");

        let _ = cache.get(&k, &cancel).await;
        cache.set(&k, VideoPayload::new("V", "T"), &cancel).await;
        let _ = cache.get(&k, &cancel).await;

        assert_eq!(
            backend.score("content:popular", "https://x.com/a").await.unwrap(),
            Some(2.0)
        );
    }

    #[tokio::test]
    async fn test_ttl_follows_popularity() {
        let (cache, backend) = test_cache();
        let cancel = CancellationToken::new();

        let cold = key("https://x.com/cold");
        let _ = cache.get(&cold, &cancel).await;
        assert_eq!(
            cache.set(&cold, VideoPayload::new("V", "T"), &cancel).await,
            Some(TtlTier::Default)
        );
        let ttl = backend.ttl("content.render.https://x.com/cold").await.unwrap().unwrap();
        assert!(ttl <= Duration::from_secs(30 * 60));

        // Five reads sit on the threshold, the sixth crosses it
        let hot = key("https://x.com/hot");
        for _ in 0..5 {
            let _ = cache.get(&hot, &cancel).await;
        }
        assert_eq!(
            cache.set(&hot, VideoPayload::new("V", "T"), &cancel).await,
            Some(TtlTier::Default)
        );
        let _ = cache.get(&hot, &cancel).await;
        assert_eq!(
            cache.set(&hot, VideoPayload::new("V", "T"), &cancel).await,
            Some(TtlTier::Hot)
        );
        let ttl = backend.ttl("content.render.https://x.com/hot").await.unwrap().unwrap();
        assert!(ttl > Duration::from_secs(23 * 60 * 60));
        assert_eq!(cache.stats().hot_sets, 1);
    }

    #[tokio::test]
    async fn test_backend_failure() {
        let (cache, backend) = test_cache();
        let cancel = CancellationToken::new();
        let k = key("https://x.com/a");
        let mut events = cache.subscribe();

        backend.set_available(false);

        assert_matches!(
            cache.get(&k, &cancel).await,
            Err(Error::CacheUnavailable { .. })
        );
        assert_matches!(events.recv().await, Ok(CacheEvent::BackendUnavailable { .. }));

        // Writes are swallowed
        assert_eq!(cache.set(&k, VideoPayload::new("V", "T"), &cancel).await, None);
        assert_eq!(cache.stats().set_failures, 1);
        assert!(!cache.health_check().await.unwrap());
    }

    #[tokio::test]
    async fn test_canceled_get() {
        let (cache, backend) = test_cache();
        let cancel = CancellationToken::new();
        cancel.cancel();

        assert_matches!(
            cache.get(&key("https://x.com/a"), &cancel).await,
            Err(Error::Canceled)
        );
        assert_eq!(backend.score("content:popular", "https://x.com/a").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_disabled_cache() {
        let backend = Arc::new(MemoryCacheBackend::new());
        let config = HotCacheConfig {
            enabled: false,
            ..Default::default()
        };
        let cache = HotCache::with_config(backend.clone(), config);
        let cancel = CancellationToken::new();
        let k = key("https://x.com/a");

        assert_eq!(cache.set(&k, VideoPayload::new("V", "T"), &cancel).await, None);
        assert_matches!(cache.get(&k, &cancel).await, Err(Error::CacheMiss { .. }));
        assert!(backend.is_empty());
    }

    #[tokio::test]
    async fn test_connect_memory_backend() {
        let config = HotCacheConfig {
            max_popular_members: 2,
            ..Default::default()
        };
        let cache = HotCache::connect(config).await.unwrap();
        assert_eq!(cache.backend_name(), "memory");

        let cancel = CancellationToken::new();
        for url in ["https://x.com/a", "https://x.com/b", "https://x.com/c"] {
            let _ = cache.get(&key(url), &cancel).await;
        }
        let top = cache
            .backend
            .top_members(&cache.config().popularity_set, 10)
            .await
            .unwrap();
        assert_eq!(top.len(), 2);
    }

    #[tokio::test]
    async fn test_prewarm_top_k() {
        let (cache, backend) = test_cache();
        let cancel = CancellationToken::new();

        for (member, score) in [
            ("https://x.com/a", 9.0),
            ("https://x.com/b", 7.0),
            ("https://x.com/broken", 8.0),
            ("https://x.com/c", 1.0),
        ] {
            backend.incr_score("content:popular", member, score).await.unwrap();
        }

        let report = cache.prewarm(&MapLoader, 3, 2, &cancel).await.unwrap();
        assert_eq!(
            report,
            PrewarmReport {
                candidates: 3,
                loaded: 2,
                failed: 1,
            }
        );

        // Loaded entries carry the hot TTL
        let ttl = backend.ttl("content.render.https://x.com/a").await.unwrap().unwrap();
        assert!(ttl > Duration::from_secs(23 * 60 * 60));
        assert!(backend.get("content.render.https://x.com/b").await.unwrap().is_some());
        assert!(backend.get("content.render.https://x.com/c").await.unwrap().is_none());

        let payload = cache.get(&key("https://x.com/a"), &cancel).await.unwrap();
        assert_eq!(payload.video_url, "V/a");
        assert_eq!(cache.stats().prewarmed, 2);
    }

    #[tokio::test]
    async fn test_prewarm_backend_down() {
        let (cache, backend) = test_cache();
        backend.set_available(false);

        assert_matches!(
            cache
                .prewarm(&MapLoader, 20, 4, &CancellationToken::new())
                .await,
            Err(Error::CacheUnavailable { .. })
        );
    }
}
