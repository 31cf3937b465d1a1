//! Content Collection
//!
//! All records registered for one origin, keyed by storage path key.
//!
//! The storage key is the registered path with `*` removed, so a wildcard
//! pattern and the literal path it collapses to share one slot: `/a/*/c`
//! and `/a/c` are both stored under `/a/c`, the later registration replaces
//! the earlier one, and a request for `/a/c` exact-matches whichever is held.
//!
//! # Resolution
//!
//! 1. Exact key lookup.
//! 2. Otherwise every record's pattern is compared segment-wise with the
//!    request. A pattern `P` matches request `R` when both are non-empty,
//!    `R` is at least as long as `P`, every position of `P` is equal to the
//!    request segment or is `*`, and any request segments beyond `P` are
//!    absorbed by a trailing `*`.
//! 3. Among several matches the pattern with the most literal segments wins,
//!    then the longer pattern, then the smallest storage key.

use crate::domain::keys::{OriginKey, PathKey, WILDCARD};
use crate::domain::record::{ContentRecord, VideoPayload, RECORD_SCHEMA_VERSION};
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

// =============================================================================
// Pattern Matching
// =============================================================================

/// Specificity of a successful match, ordered so that "greater" is better
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct MatchScore {
    /// Non-wildcard segments in the pattern
    pub literal_segments: usize,
    /// Total segments in the pattern
    pub segments: usize,
}

/// Compare pattern segments with request segments
pub fn match_segments(pattern: &[&str], request: &[&str]) -> Option<MatchScore> {
    if pattern.is_empty() || request.is_empty() {
        return None;
    }
    if request.len() < pattern.len() {
        return None;
    }
    if request.len() > pattern.len() && pattern.last() != Some(&WILDCARD) {
        return None;
    }

    let matched = pattern
        .iter()
        .zip(request)
        .filter(|(p, r)| **p == WILDCARD || p == r)
        .count();

    if matched != pattern.len() {
        return None;
    }

    Some(MatchScore {
        literal_segments: pattern.iter().filter(|p| **p != WILDCARD).count(),
        segments: pattern.len(),
    })
}

// =============================================================================
// Content Collection
// =============================================================================

/// Mapping from path key to record for a single origin
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContentCollection {
    records: BTreeMap<PathKey, ContentRecord>,
}

impl ContentCollection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a collection holding a single record
    pub fn single(key: PathKey, record: ContentRecord) -> Self {
        let mut collection = Self::new();
        collection.put(key, record);
        collection
    }

    /// Insert or replace the record stored under `key`
    pub fn put(&mut self, key: PathKey, record: ContentRecord) {
        self.records.insert(key, record);
    }

    /// Insert a record under its own storage key
    pub fn insert(&mut self, record: ContentRecord) {
        self.put(record.storage_key(), record);
    }

    pub fn get(&self, key: &PathKey) -> Option<&ContentRecord> {
        self.records.get(key)
    }

    /// Resolve a request path to its payload
    pub fn resolve(&self, request: &PathKey) -> Option<&VideoPayload> {
        self.resolve_record(request).map(ContentRecord::video)
    }

    /// Resolve a request path to the winning record
    pub fn resolve_record(&self, request: &PathKey) -> Option<&ContentRecord> {
        if let Some(record) = self.records.get(request) {
            return Some(record);
        }

        let request_segments = request.to_segments();
        let mut best: Option<(MatchScore, &ContentRecord)> = None;

        // BTreeMap iterates in key order, so a strict comparison keeps the
        // smallest key on equal scores.
        for record in self.records.values() {
            let Some(score) = match_segments(&record.segments(), &request_segments) else {
                continue;
            };
            if best.map_or(true, |(current, _)| score > current) {
                best = Some((score, record));
            }
        }

        best.map(|(_, record)| record)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&PathKey, &ContentRecord)> {
        self.records.iter()
    }

    /// Decode a persisted collection, checking every record belongs to `origin`
    pub fn from_json(origin: &OriginKey, bytes: &[u8]) -> Result<Self> {
        let collection: Self = serde_json::from_slice(bytes).map_err(|e| Error::CorruptData {
            origin: origin.to_string(),
            reason: e.to_string(),
        })?;
        collection.validate(origin)?;
        Ok(collection)
    }

    /// Encode for persistence
    pub fn to_json(&self) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec_pretty(self)?)
    }

    fn validate(&self, origin: &OriginKey) -> Result<()> {
        for (key, record) in &self.records {
            if record.version() > RECORD_SCHEMA_VERSION {
                return Err(Error::CorruptData {
                    origin: origin.to_string(),
                    reason: format!(
                        "record {} has unsupported schema version {}",
                        key,
                        record.version()
                    ),
                });
            }
            if record.origin() != origin {
                return Err(Error::CorruptData {
                    origin: origin.to_string(),
                    reason: format!("record {} belongs to origin {}", key, record.origin()),
                });
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    fn record(url: &str, video: &str) -> ContentRecord {
        ContentRecord::new(url, video, &format!("{}-thumb", video)).unwrap()
    }

    fn request(path: &str) -> PathKey {
        PathKey::normalize(path, true)
    }

    #[test]
    fn test_match_segments_rules() {
        assert!(match_segments(&["a", "*", "c"], &["a", "b", "c"]).is_some());
        assert!(match_segments(&["a", "*", "c"], &["a", "b", "c", "d"]).is_none());
        assert!(match_segments(&["a", "*", "c"], &["a", "b"]).is_none());
        assert!(match_segments(&["a", "*"], &["a", "b", "c"]).is_some());
        assert!(match_segments(&["a", "b"], &["a", "b", "c"]).is_none());
        assert!(match_segments(&[], &["a"]).is_none());
        assert!(match_segments(&["*"], &[]).is_none());
    }

    #[test]
    fn test_match_score_ordering() {
        let specific = match_segments(&["a", "b", "*"], &["a", "b", "c"]).unwrap();
        let broad = match_segments(&["a", "*", "*"], &["a", "b", "c"]).unwrap();
        assert!(specific > broad);
        assert_eq!(specific.literal_segments, 2);
    }

    #[test]
    fn test_exact_match() {
        let mut collection = ContentCollection::new();
        collection.insert(record("https://x.com/home/camisa", "V1"));

        let payload = collection.resolve(&request("/home/camisa")).unwrap();
        assert_eq!(payload.video_url, "V1");
    }

    #[test]
    fn test_wildcard_scenario() {
        let mut collection = ContentCollection::new();
        collection.insert(record("https://x.com/home/camisa", "V1"));
        collection.insert(record("https://x.com/home/camisa/*", "V2"));

        assert_eq!(
            collection.resolve(&request("/home/camisa/masculina")).unwrap().video_url,
            "V2"
        );
        assert_eq!(
            collection.resolve(&request("/home/camisa")).unwrap().video_url,
            "V1"
        );
    }

    #[test]
    fn test_inner_wildcard_does_not_absorb_extra_segments() {
        let mut collection = ContentCollection::new();
        collection.insert(record("https://x.com/a/*/c", "V"));

        assert!(collection.resolve(&request("/a/b/c")).is_some());
        assert!(collection.resolve(&request("/a/b/c/d")).is_none());

        collection.insert(record("https://x.com/a/*/c/*", "W"));
        assert_eq!(collection.resolve(&request("/a/b/c/d")).unwrap().video_url, "W");
    }

    #[test]
    fn test_shorter_request_never_matches() {
        let mut collection = ContentCollection::new();
        collection.insert(record("https://x.com/home/camisa/azul", "V"));

        assert!(collection.resolve(&request("/home")).is_none());
        assert!(collection.resolve(&request("/")).is_none());
    }

    #[test]
    fn test_most_specific_pattern_wins() {
        let mut collection = ContentCollection::new();
        collection.insert(record("https://x.com/*/*/video", "BROAD"));
        collection.insert(record("https://x.com/shop/*/video", "SPECIFIC"));

        let payload = collection.resolve(&request("/shop/shoes/video")).unwrap();
        assert_eq!(payload.video_url, "SPECIFIC");
    }

    #[test]
    fn test_equal_scores_pick_smallest_key() {
        let mut collection = ContentCollection::new();
        collection.insert(record("https://x.com/*/b", "SECOND"));
        collection.insert(record("https://x.com/a/*", "FIRST"));

        // Both patterns have one literal segment; "/a/" sorts before "/b".
        for _ in 0..10 {
            let payload = collection.resolve(&request("/a/b")).unwrap();
            assert_eq!(payload.video_url, "FIRST");
        }
    }

    #[test]
    fn test_merge_and_overwrite() {
        let mut collection = ContentCollection::single(
            PathKey::normalize("/one", false),
            record("https://x.com/one", "V1"),
        );
        collection.insert(record("https://x.com/two", "V2"));
        assert_eq!(collection.len(), 2);

        collection.insert(record("https://x.com/two", "V3"));
        assert_eq!(collection.len(), 2);
        assert_eq!(collection.resolve(&request("/two")).unwrap().video_url, "V3");
        assert_eq!(collection.resolve(&request("/one")).unwrap().video_url, "V1");
    }

    #[test]
    fn test_json_roundtrip_preserves_layout() {
        let origin = OriginKey::from_url(&url::Url::parse("https://x.com").unwrap());
        let mut collection = ContentCollection::new();
        collection.insert(record("https://x.com/home/*", "V"));

        let bytes = collection.to_json().unwrap();
        let value: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(value["/home/"]["Path"], "/home/*");

        let decoded = ContentCollection::from_json(&origin, &bytes).unwrap();
        assert_eq!(decoded, collection);
    }

    #[test]
    fn test_wildcard_and_literal_share_storage_key() {
        let mut collection = ContentCollection::new();
        collection.insert(record("https://x.com/a/*/c", "PATTERN"));

        assert_eq!(collection.resolve(&request("/a/c")).unwrap().video_url, "PATTERN");
        assert_eq!(collection.resolve(&request("/a/b/c")).unwrap().video_url, "PATTERN");

        collection.insert(record("https://x.com/a/c", "LITERAL"));
        assert_eq!(collection.len(), 1);
        assert_eq!(collection.resolve(&request("/a/c")).unwrap().video_url, "LITERAL");
        assert!(collection.resolve(&request("/a/b/c")).is_none());
    }

    #[test]
    fn test_decode_url_object_layout() {
        let origin = OriginKey::from_url(&url::Url::parse("https://x.com").unwrap());
        let raw = br#"{
            "/home/camisa": {
                "Url": {"Scheme": "https", "Opaque": "", "User": null, "Host": "x.com",
                        "Path": "/home/camisa", "RawPath": "", "OmitHost": false,
                        "ForceQuery": false, "RawQuery": "", "Fragment": "", "RawFragment": ""},
                "Origin": "https://x.com",
                "Paths": ["home", "camisa"],
                "Path": "/home/camisa",
                "Video": {"VideoUrl": "V1", "TambnailUrl": "T1"}
            },
            "/home/camisa/*": {
                "Url": {"Scheme": "https", "Opaque": "", "User": null, "Host": "x.com",
                        "Path": "/home/camisa/*", "RawPath": "", "OmitHost": false,
                        "ForceQuery": false, "RawQuery": "", "Fragment": "", "RawFragment": ""},
                "Origin": "https://x.com",
                "Paths": ["home", "camisa", "*"],
                "Path": "/home/camisa/*",
                "Video": {"VideoUrl": "V2", "TambnailUrl": "T2"}
            }
        }"#;

        let collection = ContentCollection::from_json(&origin, raw).unwrap();
        assert_eq!(collection.len(), 2);
        assert_eq!(collection.resolve(&request("/home/camisa")).unwrap().video_url, "V1");
        assert_eq!(
            collection.resolve(&request("/home/camisa/masculina")).unwrap().video_url,
            "V2"
        );

        let record = collection.get(&PathKey::normalize("/home/camisa", true)).unwrap();
        assert_eq!(record.url(), "https://x.com/home/camisa");
    }

    #[test]
    fn test_decode_rejects_wrong_shape() {
        let origin = OriginKey::from_url(&url::Url::parse("https://x.com").unwrap());

        assert_matches!(
            ContentCollection::from_json(&origin, b"\"not an object\""),
            Err(Error::CorruptData { .. })
        );
        assert_matches!(
            ContentCollection::from_json(&origin, br#"{"/a": {"Url": 1}}"#),
            Err(Error::CorruptData { .. })
        );
    }

    #[test]
    fn test_decode_rejects_foreign_origin_and_future_version() {
        let origin = OriginKey::from_url(&url::Url::parse("https://x.com").unwrap());

        let mut foreign = ContentCollection::new();
        foreign.insert(record("https://y.com/a", "V"));
        let bytes = foreign.to_json().unwrap();
        assert_matches!(
            ContentCollection::from_json(&origin, &bytes),
            Err(Error::CorruptData { .. })
        );

        let future = br#"{"/a": {
            "Version": 9,
            "Url": "https://x.com/a",
            "Origin": "https://x.com",
            "Path": "/a",
            "Video": {"VideoUrl": "V", "TambnailUrl": "T"}
        }}"#;
        assert_matches!(
            ContentCollection::from_json(&origin, future),
            Err(Error::CorruptData { .. })
        );
    }
}
