//! Cache Metrics
//!
//! Cache-line aligned counters for the hot cache tier, updated from every
//! request path without locking.

use chrono::Utc;
use std::sync::atomic::{AtomicU64, Ordering};

/// Cache line size for alignment (64 bytes on most modern CPUs)
pub const CACHE_LINE_SIZE: usize = 64;

// =============================================================================
// Request Counters (Cache-Line Aligned)
// =============================================================================

/// Lookup and write counters, aligned to prevent false sharing
#[repr(C, align(64))]
#[derive(Debug)]
pub struct CacheMetrics {
    /// Lookups answered from the cache
    pub hits: AtomicU64,
    /// Lookups with no live entry
    pub misses: AtomicU64,
    /// Lookups that failed on the backend
    pub errors: AtomicU64,
    /// Entries written
    pub sets: AtomicU64,
    /// Entries written with the hot TTL
    pub hot_sets: AtomicU64,
    /// Writes that failed and were dropped
    pub set_failures: AtomicU64,
    /// Entries loaded by prewarm runs
    pub prewarmed: AtomicU64,
    /// Last update timestamp (Unix millis)
    pub last_update_ms: AtomicU64,
}

// Verify size at compile time
const _: () = assert!(std::mem::size_of::<CacheMetrics>() <= CACHE_LINE_SIZE);

impl Default for CacheMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl CacheMetrics {
    /// Create new zeroed metrics
    pub fn new() -> Self {
        Self {
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            errors: AtomicU64::new(0),
            sets: AtomicU64::new(0),
            hot_sets: AtomicU64::new(0),
            set_failures: AtomicU64::new(0),
            prewarmed: AtomicU64::new(0),
            last_update_ms: AtomicU64::new(0),
        }
    }

    #[inline]
    pub fn record_hit(&self) {
        self.hits.fetch_add(1, Ordering::Relaxed);
        self.touch();
    }

    #[inline]
    pub fn record_miss(&self) {
        self.misses.fetch_add(1, Ordering::Relaxed);
        self.touch();
    }

    #[inline]
    pub fn record_error(&self) {
        self.errors.fetch_add(1, Ordering::Relaxed);
        self.touch();
    }

    /// Record a successful write, `hot` when the long TTL was used
    #[inline]
    pub fn record_set(&self, hot: bool) {
        self.sets.fetch_add(1, Ordering::Relaxed);
        if hot {
            self.hot_sets.fetch_add(1, Ordering::Relaxed);
        }
        self.touch();
    }

    #[inline]
    pub fn record_set_failure(&self) {
        self.set_failures.fetch_add(1, Ordering::Relaxed);
        self.touch();
    }

    #[inline]
    pub fn record_prewarmed(&self, count: u64) {
        self.prewarmed.fetch_add(count, Ordering::Relaxed);
        self.touch();
    }

    #[inline]
    fn touch(&self) {
        self.last_update_ms
            .store(Utc::now().timestamp_millis() as u64, Ordering::Release);
    }

    /// Create a snapshot of current metrics
    pub fn snapshot(&self) -> CacheStatsSnapshot {
        CacheStatsSnapshot {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            errors: self.errors.load(Ordering::Relaxed),
            sets: self.sets.load(Ordering::Relaxed),
            hot_sets: self.hot_sets.load(Ordering::Relaxed),
            set_failures: self.set_failures.load(Ordering::Relaxed),
            prewarmed: self.prewarmed.load(Ordering::Relaxed),
        }
    }
}

// =============================================================================
// Snapshot
// =============================================================================

/// Point-in-time snapshot of cache metrics
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CacheStatsSnapshot {
    pub hits: u64,
    pub misses: u64,
    pub errors: u64,
    pub sets: u64,
    pub hot_sets: u64,
    pub set_failures: u64,
    pub prewarmed: u64,
}

impl CacheStatsSnapshot {
    /// Get total lookups
    pub fn total_requests(&self) -> u64 {
        self.hits + self.misses + self.errors
    }

    /// Calculate hit ratio (0.0 to 1.0)
    pub fn hit_ratio(&self) -> f64 {
        let total = self.total_requests();
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cache_line_alignment() {
        assert_eq!(std::mem::align_of::<CacheMetrics>(), CACHE_LINE_SIZE);
        assert!(std::mem::size_of::<CacheMetrics>() <= CACHE_LINE_SIZE);
    }

    #[test]
    fn test_metrics_operations() {
        let metrics = CacheMetrics::new();

        metrics.record_hit();
        metrics.record_hit();
        metrics.record_miss();
        metrics.record_set(true);
        metrics.record_set(false);
        metrics.record_set_failure();
        metrics.record_prewarmed(3);

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.hits, 2);
        assert_eq!(snapshot.misses, 1);
        assert_eq!(snapshot.sets, 2);
        assert_eq!(snapshot.hot_sets, 1);
        assert_eq!(snapshot.set_failures, 1);
        assert_eq!(snapshot.prewarmed, 3);
        assert!((snapshot.hit_ratio() - 0.666).abs() < 0.01);
    }

    #[test]
    fn test_empty_hit_ratio() {
        assert_eq!(CacheStatsSnapshot::default().hit_ratio(), 0.0);
    }
}
