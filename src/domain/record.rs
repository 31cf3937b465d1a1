//! Content Records
//!
//! A record is one registration: the URL pattern it was registered under and
//! the video payload it resolves to. Records are immutable once built; a new
//! record replaces any prior record stored under the same path key.

use crate::domain::keys::{parse_url, OriginKey, PathKey};
use crate::error::{Error, Result};
use serde::{Deserialize, Deserializer, Serialize};

/// Current on-disk record schema version
pub const RECORD_SCHEMA_VERSION: u32 = 1;

fn default_schema_version() -> u32 {
    RECORD_SCHEMA_VERSION
}

// =============================================================================
// Persisted URL
// =============================================================================

/// `Url` as found on disk: the URL string this crate writes, or the
/// component object (`Scheme`, `Host`, `Path`, ...) older collection files
/// carry.
#[derive(Deserialize)]
#[serde(untagged)]
enum PersistedUrl {
    Text(String),
    Parts(UrlParts),
}

#[derive(Deserialize)]
struct UrlParts {
    #[serde(rename = "Scheme", default)]
    scheme: String,
    #[serde(rename = "Host", default)]
    host: String,
    #[serde(rename = "Path", default)]
    path: String,
    #[serde(rename = "RawQuery", default)]
    raw_query: String,
    #[serde(rename = "Fragment", default)]
    fragment: String,
}

impl UrlParts {
    fn to_url_string(&self) -> std::result::Result<String, String> {
        if self.scheme.is_empty() || self.host.is_empty() {
            return Err("url object has no scheme or host".to_string());
        }

        let mut raw = format!("{}://{}{}", self.scheme, self.host, self.path);
        if !self.raw_query.is_empty() {
            raw.push('?');
            raw.push_str(&self.raw_query);
        }
        if !self.fragment.is_empty() {
            raw.push('#');
            raw.push_str(&self.fragment);
        }

        parse_url(&raw)
            .map(|url| url.to_string())
            .map_err(|e| e.to_string())
    }
}

fn deserialize_url<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match PersistedUrl::deserialize(deserializer)? {
        PersistedUrl::Text(url) => Ok(url),
        PersistedUrl::Parts(parts) => parts.to_url_string().map_err(serde::de::Error::custom),
    }
}

// =============================================================================
// Video Payload
// =============================================================================

/// The content a URL resolves to.
///
/// Field names follow the persisted file format shared with other tooling.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VideoPayload {
    #[serde(rename = "VideoUrl")]
    pub video_url: String,
    #[serde(rename = "TambnailUrl", alias = "ThumbnailUrl")]
    pub thumbnail_url: String,
}

impl VideoPayload {
    pub fn new(video_url: impl Into<String>, thumbnail_url: impl Into<String>) -> Self {
        Self {
            video_url: video_url.into(),
            thumbnail_url: thumbnail_url.into(),
        }
    }
}

// =============================================================================
// Content Record
// =============================================================================

/// One registration of content under a (possibly wildcarded) URL
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentRecord {
    #[serde(rename = "Version", default = "default_schema_version")]
    version: u32,
    #[serde(rename = "Url", deserialize_with = "deserialize_url")]
    url: String,
    #[serde(rename = "Origin")]
    origin: OriginKey,
    #[serde(rename = "Path")]
    path: PathKey,
    #[serde(rename = "Paths", default)]
    paths: Vec<String>,
    #[serde(rename = "Video")]
    video: VideoPayload,
}

impl ContentRecord {
    /// Build a record from registration input.
    ///
    /// Fails with a validation error when either payload URL is empty or
    /// the registration URL cannot be parsed.
    pub fn new(url: &str, video_url: &str, thumbnail_url: &str) -> Result<Self> {
        if video_url.trim().is_empty() {
            return Err(Error::Validation("video url is empty".into()));
        }
        if thumbnail_url.trim().is_empty() {
            return Err(Error::Validation("thumbnail url is empty".into()));
        }

        let parsed = parse_url(url)?;
        let path = PathKey::pattern(&parsed);
        let paths = path.to_segments().into_iter().map(String::from).collect();

        Ok(Self {
            version: RECORD_SCHEMA_VERSION,
            url: parsed.to_string(),
            origin: OriginKey::from_url(&parsed),
            path,
            paths,
            video: VideoPayload::new(video_url.trim(), thumbnail_url.trim()),
        })
    }

    /// The registered URL as given (normalized by the URL parser)
    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn origin(&self) -> &OriginKey {
        &self.origin
    }

    /// Matching pattern, wildcards kept
    pub fn pattern(&self) -> &PathKey {
        &self.path
    }

    /// Key this record is addressed by inside its collection
    pub fn storage_key(&self) -> PathKey {
        PathKey::normalize(self.path.as_str(), false)
    }

    /// Ordered pattern segments
    pub fn segments(&self) -> Vec<&str> {
        self.path.to_segments()
    }

    pub fn video(&self) -> &VideoPayload {
        &self.video
    }

    pub fn version(&self) -> u32 {
        self.version
    }
}
