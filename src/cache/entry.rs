//! Cached Entry Types
//!
//! Keys and JSON snapshots written to the cache backend for resolved paths.

use crate::cache::tier::TtlTier;
use crate::domain::keys::{parse_url, OriginKey, PathKey};
use crate::domain::record::VideoPayload;
use crate::error::Result;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use url::Url;

// =============================================================================
// Hot Cache Key
// =============================================================================

/// Origin-qualified request path the hot tier is keyed by
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct HotCacheKey {
    origin: OriginKey,
    path: PathKey,
}

impl HotCacheKey {
    pub fn new(origin: OriginKey, path: PathKey) -> Self {
        Self { origin, path }
    }

    /// Key for a request URL, wildcards kept
    pub fn from_url(url: &Url) -> Self {
        Self::new(OriginKey::from_url(url), PathKey::pattern(url))
    }

    /// Parse a popularity-set member back into a key
    pub fn parse(member: &str) -> Result<Self> {
        Ok(Self::from_url(&parse_url(member)?))
    }

    pub fn origin(&self) -> &OriginKey {
        &self.origin
    }

    pub fn path(&self) -> &PathKey {
        &self.path
    }

    /// Member name in the popularity set
    pub fn member(&self) -> String {
        format!("{}{}", self.origin, self.path)
    }

    /// Backend key under `prefix`
    pub fn storage_key(&self, prefix: &str) -> String {
        format!("{}{}{}", prefix, self.origin, self.path)
    }
}

impl fmt::Display for HotCacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.origin, self.path)
    }
}

// =============================================================================
// Cached Entry
// =============================================================================

/// Resolved content plus the bookkeeping it was cached with
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CachedEntry {
    /// Resolved payload
    pub payload: VideoPayload,
    /// Popularity score observed when the entry was written
    pub popularity: f64,
    /// Tier the TTL was chosen from
    pub tier: TtlTier,
    /// Time the entry was written
    pub cached_at: DateTime<Utc>,
    /// Deadline after which the entry is stale
    pub expires_at: DateTime<Utc>,
}

impl CachedEntry {
    /// Create an entry expiring `ttl` from now
    pub fn new(payload: VideoPayload, popularity: f64, tier: TtlTier, ttl: Duration) -> Self {
        let now = Utc::now();
        let ttl = chrono::Duration::from_std(ttl).unwrap_or_else(|_| chrono::Duration::days(36_500));
        Self {
            payload,
            popularity,
            tier,
            cached_at: now,
            expires_at: now.checked_add_signed(ttl).unwrap_or(DateTime::<Utc>::MAX_UTC),
        }
    }

    /// Check if the deadline has passed
    pub fn is_expired(&self) -> bool {
        Utc::now() >= self.expires_at
    }

    /// Get age in seconds since the entry was written
    pub fn age_seconds(&self) -> u64 {
        let age = Utc::now().signed_duration_since(self.cached_at);
        age.num_seconds().max(0) as u64
    }

    pub fn to_bytes(&self) -> Result<Bytes> {
        Ok(Bytes::from(serde_json::to_vec(self)?))
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        Ok(serde_json::from_slice(bytes)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hot_cache_key() {
        let key = HotCacheKey::parse("https://x.com//home/camisa").unwrap();
        assert_eq!(key.origin().as_str(), "https://x.com");
        assert_eq!(key.path().as_str(), "/home/camisa");
        assert_eq!(key.member(), "https://x.com/home/camisa");
        assert_eq!(
            key.storage_key("content.render."),
            "content.render.https://x.com/home/camisa"
        );

        // Members round-trip through parse
        assert_eq!(HotCacheKey::parse(&key.member()).unwrap(), key);
        assert!(HotCacheKey::parse("not a url").is_err());
    }

    #[test]
    fn test_entry_expiry() {
        let payload = VideoPayload::new("V", "T");

        let entry = CachedEntry::new(payload.clone(), 0.0, TtlTier::Default, Duration::from_secs(60));
        assert!(!entry.is_expired());
        assert_eq!(entry.age_seconds(), 0);

        let stale = CachedEntry::new(payload, 0.0, TtlTier::Default, Duration::ZERO);
        assert!(stale.is_expired());
    }

    #[test]
    fn test_entry_encoding() {
        let entry = CachedEntry::new(
            VideoPayload::new("V", "T"),
            7.0,
            TtlTier::Hot,
            Duration::from_secs(3600),
        );
        let bytes = entry.to_bytes().unwrap();

        let value: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(value["tier"], "hot");
        assert_eq!(value["payload"]["VideoUrl"], "V");

        assert_eq!(CachedEntry::from_bytes(&bytes).unwrap(), entry);
        assert!(CachedEntry::from_bytes(b"garbage").is_err());
    }
}
