//! Content Service
//!
//! The two operations the outside world calls: register content under a
//! (possibly wildcarded) URL, and resolve a request URL to its content.
//!
//! Reads try the hot cache first and fall back to the persistent store on
//! any cache failure. A store hit refills the cache in the background.

mod resolver;

pub use resolver::StoreResolver;

use crate::cache::{HotCache, HotCacheKey, PrewarmReport};
use crate::domain::keys::parse_url;
use crate::domain::ports::ContentRepositoryRef;
use crate::domain::record::{ContentRecord, VideoPayload};
use crate::error::{Error, Result};
use crate::telemetry::{ResolutionSource, ResolverMetrics};
use base64::engine::general_purpose::{STANDARD_NO_PAD, URL_SAFE_NO_PAD};
use base64::Engine;
use std::sync::Arc;
use std::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

// =============================================================================
// Resolution
// =============================================================================

/// A resolved payload and the tier that answered
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    pub payload: VideoPayload,
    pub source: ResolutionSource,
}

impl Resolution {
    pub fn is_cache_hit(&self) -> bool {
        self.source == ResolutionSource::Cache
    }
}

/// Decode a base64 request URL, accepting URL-safe or standard alphabets
/// with or without padding
pub fn decode_request_url(encoded: &str) -> Result<String> {
    let trimmed = encoded.trim().trim_end_matches('=');
    if trimmed.is_empty() {
        return Err(Error::Validation("encoded request URL is empty".into()));
    }

    let bytes = URL_SAFE_NO_PAD
        .decode(trimmed)
        .or_else(|_| STANDARD_NO_PAD.decode(trimmed))
        .map_err(|e| Error::Validation(format!("request URL is not valid base64: {}", e)))?;

    String::from_utf8(bytes)
        .map_err(|_| Error::Validation("decoded request URL is not UTF-8".into()))
}

// =============================================================================
// Content Service
// =============================================================================

/// Write and read paths over the repository and the hot cache
pub struct ContentService {
    repository: ContentRepositoryRef,
    resolver: StoreResolver,
    cache: Option<Arc<HotCache>>,
    metrics: ResolverMetrics,
    /// Parent token for background cache fills
    background: CancellationToken,
}

impl ContentService {
    /// Create a service; `cache == None` runs store-only
    pub fn new(
        repository: ContentRepositoryRef,
        cache: Option<Arc<HotCache>>,
        metrics: ResolverMetrics,
    ) -> Self {
        Self {
            resolver: StoreResolver::new(repository.clone()),
            repository,
            cache,
            metrics,
            background: CancellationToken::new(),
        }
    }

    /// Tie background cache fills to `shutdown`
    pub fn with_shutdown(mut self, shutdown: CancellationToken) -> Self {
        self.background = shutdown;
        self
    }

    pub fn cache(&self) -> Option<&Arc<HotCache>> {
        self.cache.as_ref()
    }

    pub fn metrics(&self) -> &ResolverMetrics {
        &self.metrics
    }

    /// Loader for prewarm runs
    pub fn resolver(&self) -> StoreResolver {
        self.resolver.clone()
    }

    /// Register content under `url`.
    ///
    /// Fails with a validation error when either payload URL is empty or
    /// `url` does not parse. Cached entries are not invalidated.
    pub async fn register_content(
        &self,
        url: &str,
        video_url: &str,
        thumbnail_url: &str,
        cancel: &CancellationToken,
    ) -> Result<ContentRecord> {
        let result = async {
            let record = ContentRecord::new(url, video_url, thumbnail_url)?;
            self.repository.save(record.clone(), cancel).await?;
            Ok::<_, Error>(record)
        }
        .await;

        match &result {
            Ok(record) => {
                self.metrics.record_registration();
                info!(
                    origin = %record.origin(),
                    path = %record.pattern(),
                    "Content registered"
                );
            }
            Err(e) => {
                self.metrics.record_failure("register", e.kind());
                debug!(url, error = %e, "Registration failed");
            }
        }
        result
    }

    /// Resolve a raw request URL.
    ///
    /// Fails with a not-found error when the origin has no collection or no
    /// pattern matches. Cache failures never surface here.
    pub async fn resolve_content(&self, raw: &str, cancel: &CancellationToken) -> Result<Resolution> {
        let started = Instant::now();
        let result = self.resolve_inner(raw, cancel).await;

        match &result {
            Ok(resolution) => self
                .metrics
                .record_resolution(resolution.source, started.elapsed().as_secs_f64()),
            Err(e) => self.metrics.record_failure("resolve", e.kind()),
        }
        if let Some(cache) = &self.cache {
            self.metrics.observe_cache(&cache.stats());
        }
        result
    }

    /// Resolve a base64-encoded request URL
    pub async fn resolve_encoded(&self, encoded: &str, cancel: &CancellationToken) -> Result<Resolution> {
        let raw = match decode_request_url(encoded) {
            Ok(raw) => raw,
            Err(e) => {
                self.metrics.record_failure("resolve", e.kind());
                return Err(e);
            }
        };
        self.resolve_content(&raw, cancel).await
    }

    async fn resolve_inner(&self, raw: &str, cancel: &CancellationToken) -> Result<Resolution> {
        let key = HotCacheKey::from_url(&parse_url(raw)?);

        if let Some(cache) = &self.cache {
            match cache.get(&key, cancel).await {
                Ok(payload) => {
                    return Ok(Resolution {
                        payload,
                        source: ResolutionSource::Cache,
                    })
                }
                Err(Error::Canceled) => return Err(Error::Canceled),
                Err(Error::CacheMiss { .. }) => {}
                Err(e) => warn!(key = %key, error = %e, "Hot cache lookup failed, using store"),
            }
        }

        let payload = self.resolver.resolve(&key, cancel).await?;

        if let Some(cache) = &self.cache {
            let cache = cache.clone();
            let fill_key = key.clone();
            let fill_payload = payload.clone();
            let cancel = self.background.child_token();
            tokio::spawn(async move {
                cache.set(&fill_key, fill_payload, &cancel).await;
            });
        }

        Ok(Resolution {
            payload,
            source: ResolutionSource::Store,
        })
    }

    /// Refill the hot cache with the most popular paths
    pub async fn prewarm(
        &self,
        top_k: usize,
        max_concurrent: usize,
        cancel: &CancellationToken,
    ) -> Result<PrewarmReport> {
        match &self.cache {
            Some(cache) => {
                cache
                    .prewarm(&self.resolver, top_k, max_concurrent, cancel)
                    .await
            }
            None => Ok(PrewarmReport::default()),
        }
    }

    /// Readiness: repository reachable and, when configured, cache reachable
    pub async fn is_ready(&self) -> bool {
        let store_ok = self.repository.health_check().await.unwrap_or(false);
        let cache_ok = match &self.cache {
            Some(cache) => cache.health_check().await.unwrap_or(false),
            None => true,
        };
        store_ok && cache_ok
    }
}
