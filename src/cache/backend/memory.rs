//! In-Memory Cache Backend
//!
//! Key/value entries with per-key expiry, kept in LRU order so the oldest
//! entries are reclaimed once `max_entries` is reached, plus score maps
//! standing in for sorted sets. Each score map holds at most `max_members`
//! members; past that the lowest-scored member is dropped.

use crate::cache::backend::CacheBackend;
use crate::error::{Error, Result};
use async_trait::async_trait;
use bytes::Bytes;
use indexmap::IndexMap;
use parking_lot::{Mutex, RwLock};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::{Duration, Instant};

// =============================================================================
// Configuration
// =============================================================================

/// Configuration for the in-memory backend
#[derive(Debug, Clone)]
pub struct MemoryCacheBackendConfig {
    /// Entries kept before least-recently-used ones are reclaimed
    pub max_entries: usize,
    /// Members kept per sorted set before the lowest-scored are dropped
    pub max_members: usize,
}

impl Default for MemoryCacheBackendConfig {
    fn default() -> Self {
        Self {
            max_entries: 100_000,
            max_members: 100_000,
        }
    }
}

// =============================================================================
// Memory Backend
// =============================================================================

#[derive(Debug, Clone)]
struct StoredValue {
    value: Bytes,
    expires_at: Instant,
}

impl StoredValue {
    fn is_expired(&self, now: Instant) -> bool {
        now >= self.expires_at
    }
}

/// Cache backend living in process memory
pub struct MemoryCacheBackend {
    /// Entries in LRU order (front = oldest, back = newest)
    entries: Mutex<IndexMap<String, StoredValue>>,
    /// Sorted-set stand-ins: set name -> member -> score
    scores: RwLock<HashMap<String, HashMap<String, f64>>>,
    /// Capacity in entries
    max_entries: usize,
    /// Capacity of each sorted set
    max_members: usize,
    /// Entries reclaimed for capacity
    evictions: AtomicU64,
    /// Is backend available
    available: AtomicBool,
}

impl MemoryCacheBackend {
    /// Create a backend with default config
    pub fn new() -> Self {
        Self::with_config(MemoryCacheBackendConfig::default())
    }

    /// Create a backend holding at most `max_entries` keys
    pub fn with_capacity(max_entries: usize) -> Self {
        Self::with_config(MemoryCacheBackendConfig {
            max_entries,
            ..Default::default()
        })
    }

    pub fn with_config(config: MemoryCacheBackendConfig) -> Self {
        Self {
            entries: Mutex::new(IndexMap::new()),
            scores: RwLock::new(HashMap::new()),
            max_entries: config.max_entries.max(1),
            max_members: config.max_members.max(1),
            evictions: AtomicU64::new(0),
            available: AtomicBool::new(true),
        }
    }

    /// Set availability (for testing)
    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::Relaxed);
    }

    pub fn is_available(&self) -> bool {
        self.available.load(Ordering::Relaxed)
    }

    /// Number of stored keys, including not yet reclaimed expired ones
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Entries and members reclaimed because the backend was full
    pub fn evictions(&self) -> u64 {
        self.evictions.load(Ordering::Relaxed)
    }

    /// Members currently tracked in `set`
    pub fn member_count(&self, set: &str) -> usize {
        self.scores.read().get(set).map_or(0, HashMap::len)
    }

    fn check_available(&self) -> Result<()> {
        if self.is_available() {
            Ok(())
        } else {
            Err(Error::CacheUnavailable {
                reason: "memory backend marked unavailable".into(),
            })
        }
    }

    fn insert_locked(&self, entries: &mut IndexMap<String, StoredValue>, key: String, stored: StoredValue) {
        entries.shift_remove(&key);
        entries.insert(key, stored);

        while entries.len() > self.max_entries {
            // Prefer dropping something already dead over a live LRU entry
            let now = Instant::now();
            let victim = entries
                .iter()
                .position(|(_, v)| v.is_expired(now))
                .unwrap_or(0);
            entries.shift_remove_index(victim);
            self.evictions.fetch_add(1, Ordering::Relaxed);
        }
    }
}

/// Drop lowest-scored members until `max` remain, never dropping `keep`.
///
/// Among equal scores the member sorting last goes first, matching the
/// order `top_members` ranks ties in.
fn trim_members(members: &mut HashMap<String, f64>, keep: &str, max: usize) -> u64 {
    let mut dropped = 0;
    while members.len() > max {
        let victim = members
            .iter()
            .filter(|(m, _)| m.as_str() != keep)
            .min_by(|a, b| a.1.total_cmp(b.1).then_with(|| b.0.cmp(a.0)))
            .map(|(m, _)| m.clone());
        let Some(victim) = victim else {
            break;
        };
        members.remove(&victim);
        dropped += 1;
    }
    dropped
}

impl Default for MemoryCacheBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CacheBackend for MemoryCacheBackend {
    fn name(&self) -> &'static str {
        "memory"
    }

    async fn get(&self, key: &str) -> Result<Option<Bytes>> {
        self.check_available()?;

        let mut entries = self.entries.lock();
        let Some(stored) = entries.shift_remove(key) else {
            return Ok(None);
        };
        if stored.is_expired(Instant::now()) {
            return Ok(None);
        }

        // Reinsert at the back = most recently used
        let value = stored.value.clone();
        entries.insert(key.to_string(), stored);
        Ok(Some(value))
    }

    async fn set(&self, key: &str, value: Bytes, ttl: Duration) -> Result<()> {
        self.check_available()?;

        let stored = StoredValue {
            value,
            expires_at: Instant::now() + ttl,
        };
        let mut entries = self.entries.lock();
        self.insert_locked(&mut entries, key.to_string(), stored);
        Ok(())
    }

    async fn set_many(&self, batch: Vec<(String, Bytes, Duration)>) -> Result<()> {
        self.check_available()?;

        let now = Instant::now();
        let mut entries = self.entries.lock();
        for (key, value, ttl) in batch {
            let stored = StoredValue {
                value,
                expires_at: now + ttl,
            };
            self.insert_locked(&mut entries, key, stored);
        }
        Ok(())
    }

    async fn ttl(&self, key: &str) -> Result<Option<Duration>> {
        self.check_available()?;

        let now = Instant::now();
        let entries = self.entries.lock();
        Ok(entries
            .get(key)
            .filter(|v| !v.is_expired(now))
            .map(|v| v.expires_at.saturating_duration_since(now)))
    }

    async fn incr_score(&self, set: &str, member: &str, delta: f64) -> Result<f64> {
        self.check_available()?;

        let mut scores = self.scores.write();
        let members = scores.entry(set.to_string()).or_default();
        let score = members.entry(member.to_string()).or_insert(0.0);
        *score += delta;
        let score = *score;

        if members.len() > self.max_members {
            let dropped = trim_members(members, member, self.max_members);
            self.evictions.fetch_add(dropped, Ordering::Relaxed);
        }
        Ok(score)
    }

    async fn score(&self, set: &str, member: &str) -> Result<Option<f64>> {
        self.check_available()?;

        Ok(self
            .scores
            .read()
            .get(set)
            .and_then(|members| members.get(member).copied()))
    }

    async fn top_members(&self, set: &str, count: usize) -> Result<Vec<(String, f64)>> {
        self.check_available()?;

        let scores = self.scores.read();
        let Some(members) = scores.get(set) else {
            return Ok(Vec::new());
        };

        let mut ranked: Vec<(String, f64)> =
            members.iter().map(|(m, s)| (m.clone(), *s)).collect();
        ranked.sort_by(|a, b| b.1.total_cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        ranked.truncate(count);
        Ok(ranked)
    }

    async fn health_check(&self) -> Result<bool> {
        Ok(self.is_available())
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[tokio::test]
    async fn test_basic_operations() {
        let backend = MemoryCacheBackend::new();

        backend
            .set("k1", Bytes::from("hello"), Duration::from_secs(60))
            .await
            .unwrap();
        assert_eq!(backend.get("k1").await.unwrap(), Some(Bytes::from("hello")));
        assert_eq!(backend.get("missing").await.unwrap(), None);

        let ttl = backend.ttl("k1").await.unwrap().unwrap();
        assert!(ttl <= Duration::from_secs(60));
        assert!(ttl > Duration::from_secs(50));
    }

    #[tokio::test]
    async fn test_expiry() {
        let backend = MemoryCacheBackend::new();
        backend
            .set("k1", Bytes::from("v"), Duration::from_millis(10))
            .await
            .unwrap();

        tokio::time::sleep(Duration::from_millis(30)).await;

        assert_eq!(backend.get("k1").await.unwrap(), None);
        assert_eq!(backend.ttl("k1").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_lru_reclamation() {
        let backend = MemoryCacheBackend::with_capacity(2);
        let ttl = Duration::from_secs(60);

        backend.set("a", Bytes::from("1"), ttl).await.unwrap();
        backend.set("b", Bytes::from("2"), ttl).await.unwrap();

        // Touch "a" so "b" becomes least recently used
        backend.get("a").await.unwrap();
        backend.set("c", Bytes::from("3"), ttl).await.unwrap();

        assert_eq!(backend.len(), 2);
        assert_eq!(backend.evictions(), 1);
        assert!(backend.get("a").await.unwrap().is_some());
        assert!(backend.get("b").await.unwrap().is_none());
        assert!(backend.get("c").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_scores_and_ranking() {
        let backend = MemoryCacheBackend::new();

        for _ in 0..3 {
            backend.incr_score("popular", "/a", 1.0).await.unwrap();
        }
        backend.incr_score("popular", "/b", 1.0).await.unwrap();
        for _ in 0..5 {
            backend.incr_score("popular", "/c", 1.0).await.unwrap();
        }

        assert_eq!(backend.score("popular", "/a").await.unwrap(), Some(3.0));
        assert_eq!(backend.score("popular", "/zzz").await.unwrap(), None);

        let top = backend.top_members("popular", 2).await.unwrap();
        assert_eq!(top, vec![("/c".to_string(), 5.0), ("/a".to_string(), 3.0)]);

        assert!(backend.top_members("other", 10).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_popularity_set_is_bounded() {
        let backend = MemoryCacheBackend::with_config(MemoryCacheBackendConfig {
            max_entries: 2,
            max_members: 100,
        });

        for _ in 0..10 {
            backend.incr_score("popular", "/hot", 1.0).await.unwrap();
        }
        for i in 0..10_000 {
            backend
                .incr_score("popular", &format!("/random/{}", i), 1.0)
                .await
                .unwrap();
            assert!(backend.member_count("popular") <= 100);
        }

        assert_eq!(backend.member_count("popular"), 100);
        assert_eq!(backend.score("popular", "/hot").await.unwrap(), Some(10.0));

        // The newest member is kept even when it ties the lowest score
        assert_eq!(backend.score("popular", "/random/9999").await.unwrap(), Some(1.0));

        let top = backend.top_members("popular", 1).await.unwrap();
        assert_eq!(top, vec![("/hot".to_string(), 10.0)]);
    }

    #[test]
    fn test_trim_members_order() {
        let mut members: HashMap<String, f64> = [("a", 1.0), ("b", 1.0), ("c", 3.0), ("d", 0.5)]
            .into_iter()
            .map(|(m, s)| (m.to_string(), s))
            .collect();

        assert_eq!(trim_members(&mut members, "d", 2), 2);
        let mut kept: Vec<_> = members.keys().cloned().collect();
        kept.sort();
        assert_eq!(kept, vec!["c", "d"]);
    }

    #[tokio::test]
    async fn test_set_many() {
        let backend = MemoryCacheBackend::new();
        backend
            .set_many(vec![
                ("x".into(), Bytes::from("1"), Duration::from_secs(60)),
                ("y".into(), Bytes::from("2"), Duration::from_secs(60)),
            ])
            .await
            .unwrap();
        assert_eq!(backend.len(), 2);
    }

    #[tokio::test]
    async fn test_unavailable() {
        let backend = MemoryCacheBackend::new();
        backend.set_available(false);

        assert_matches!(backend.get("k").await, Err(Error::CacheUnavailable { .. }));
        assert_matches!(
            backend.incr_score("popular", "/a", 1.0).await,
            Err(Error::CacheUnavailable { .. })
        );
        assert!(!backend.health_check().await.unwrap());
    }
}
