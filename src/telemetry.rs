//! Telemetry
//!
//! Prometheus metrics for the resolver, kept in an owned registry so tests
//! and multiple instances never collide on the process-global one.

use crate::cache::CacheStatsSnapshot;
use crate::error::{Error, ErrorKind, Result};
use prometheus::{
    Encoder, Histogram, HistogramOpts, IntCounter, IntCounterVec, IntGauge, Opts, Registry,
    TextEncoder,
};

/// Where a resolved payload came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolutionSource {
    /// Hot cache tier
    Cache,
    /// Persistent store + pattern match
    Store,
}

impl ResolutionSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResolutionSource::Cache => "cache",
            ResolutionSource::Store => "store",
        }
    }
}

impl std::fmt::Display for ResolutionSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

fn metric_error(e: prometheus::Error) -> Error {
    Error::Internal(format!("metrics registry: {}", e))
}

/// Resolver metrics
#[derive(Clone)]
pub struct ResolverMetrics {
    registry: Registry,
    registrations: IntCounter,
    resolutions: IntCounterVec,
    failures: IntCounterVec,
    resolve_duration: Histogram,
    cache_hits: IntGauge,
    cache_misses: IntGauge,
    cache_errors: IntGauge,
    cache_hot_sets: IntGauge,
    cache_prewarmed: IntGauge,
}

impl ResolverMetrics {
    /// Create and register all metrics
    pub fn new() -> Result<Self> {
        let registry = Registry::new_custom(Some("content_resolver".to_string()), None)
            .map_err(metric_error)?;

        let registrations = IntCounter::new("registrations_total", "Content registrations stored")
            .map_err(metric_error)?;
        let resolutions = IntCounterVec::new(
            Opts::new("resolutions_total", "Successful resolutions by source"),
            &["source"],
        )
        .map_err(metric_error)?;
        let failures = IntCounterVec::new(
            Opts::new("failures_total", "Failed operations by error kind"),
            &["operation", "kind"],
        )
        .map_err(metric_error)?;
        let resolve_duration = Histogram::with_opts(HistogramOpts::new(
            "resolve_duration_seconds",
            "Duration of resolve operations",
        ))
        .map_err(metric_error)?;

        let gauge = |name: &str, help: &str| IntGauge::new(name, help).map_err(metric_error);
        let cache_hits = gauge("cache_hits", "Hot cache hits")?;
        let cache_misses = gauge("cache_misses", "Hot cache misses")?;
        let cache_errors = gauge("cache_errors", "Hot cache backend failures on lookup")?;
        let cache_hot_sets = gauge("cache_hot_sets", "Hot cache entries written with the long TTL")?;
        let cache_prewarmed = gauge("cache_prewarmed", "Hot cache entries loaded by prewarm")?;

        registry
            .register(Box::new(registrations.clone()))
            .map_err(metric_error)?;
        registry
            .register(Box::new(resolutions.clone()))
            .map_err(metric_error)?;
        registry
            .register(Box::new(failures.clone()))
            .map_err(metric_error)?;
        registry
            .register(Box::new(resolve_duration.clone()))
            .map_err(metric_error)?;
        for g in [
            &cache_hits,
            &cache_misses,
            &cache_errors,
            &cache_hot_sets,
            &cache_prewarmed,
        ] {
            registry.register(Box::new(g.clone())).map_err(metric_error)?;
        }

        Ok(Self {
            registry,
            registrations,
            resolutions,
            failures,
            resolve_duration,
            cache_hits,
            cache_misses,
            cache_errors,
            cache_hot_sets,
            cache_prewarmed,
        })
    }

    pub fn record_registration(&self) {
        self.registrations.inc();
    }

    pub fn record_resolution(&self, source: ResolutionSource, elapsed_secs: f64) {
        self.resolutions.with_label_values(&[source.as_str()]).inc();
        self.resolve_duration.observe(elapsed_secs);
    }

    pub fn record_failure(&self, operation: &str, kind: ErrorKind) {
        self.failures
            .with_label_values(&[operation, kind.as_str()])
            .inc();
    }

    /// Mirror the hot cache counters into gauges
    pub fn observe_cache(&self, stats: &CacheStatsSnapshot) {
        self.cache_hits.set(stats.hits as i64);
        self.cache_misses.set(stats.misses as i64);
        self.cache_errors.set(stats.errors as i64);
        self.cache_hot_sets.set(stats.hot_sets as i64);
        self.cache_prewarmed.set(stats.prewarmed as i64);
    }

    /// Render in the prometheus text format
    pub fn render(&self) -> Result<String> {
        let encoder = TextEncoder::new();
        let mut buffer = Vec::new();
        encoder
            .encode(&self.registry.gather(), &mut buffer)
            .map_err(metric_error)?;
        String::from_utf8(buffer).map_err(|e| Error::Internal(e.to_string()))
    }

    /// Content type of [`render`](Self::render) output
    pub fn content_type(&self) -> String {
        TextEncoder::new().format_type().to_string()
    }
}
