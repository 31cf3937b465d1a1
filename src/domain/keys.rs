//! Key Model
//!
//! Derives the two keys every registration is addressed by:
//! - [`OriginKey`]: `scheme://host[:port]`, one content collection per origin
//! - [`PathKey`]: the normalized URL path inside that origin
//!
//! Two path normalizations coexist. The *storage* variant strips `*` so the
//! collection key is free of wildcard glyphs; the *pattern* variant keeps
//! them so matching can recognize wildcard segments.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use url::Url;

/// Wildcard segment marker
pub const WILDCARD: &str = "*";

/// Parse an absolute URL, mapping failures to [`Error::InvalidUrl`]
pub fn parse_url(input: &str) -> Result<Url> {
    Url::parse(input.trim()).map_err(|e| Error::InvalidUrl {
        input: input.to_string(),
        reason: e.to_string(),
    })
}

// =============================================================================
// Origin Key
// =============================================================================

/// Identifies one origin's ("enterprise") content collection
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OriginKey(String);

impl OriginKey {
    /// Build from a parsed URL.
    ///
    /// Explicit default ports are dropped by the URL parser, so
    /// `https://x.com:443` and `https://x.com` share a key.
    pub fn from_url(url: &Url) -> Self {
        let host = url.host_str().unwrap_or_default();
        match url.port() {
            Some(port) => Self(format!("{}://{}:{}", url.scheme(), host, port)),
            None => Self(format!("{}://{}", url.scheme(), host)),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for OriginKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&Url> for OriginKey {
    fn from(url: &Url) -> Self {
        Self::from_url(url)
    }
}

/// Derive the origin key of a raw URL string
pub fn derive_origin_key(input: &str) -> Result<OriginKey> {
    Ok(OriginKey::from_url(&parse_url(input)?))
}

// =============================================================================
// Path Key
// =============================================================================

/// Normalized URL path, optionally carrying wildcard segments
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PathKey(String);

impl PathKey {
    /// Normalize a raw path.
    ///
    /// With `keep_wildcards == false` every `*` is removed before the
    /// duplicate slashes left behind are collapsed.
    pub fn normalize(path: &str, keep_wildcards: bool) -> Self {
        let mut out = String::with_capacity(path.len());
        let mut prev_slash = false;
        for c in path.chars() {
            if c == '*' && !keep_wildcards {
                continue;
            }
            if c == '/' {
                if prev_slash {
                    continue;
                }
                prev_slash = true;
            } else {
                prev_slash = false;
            }
            out.push(c);
        }
        Self(out)
    }

    /// Storage key for a URL (wildcards stripped)
    pub fn storage(url: &Url) -> Self {
        Self::normalize(url.path(), false)
    }

    /// Matching pattern for a URL (wildcards kept)
    pub fn pattern(url: &Url) -> Self {
        Self::normalize(url.path(), true)
    }

    /// Split into path components, dropping empty segments.
    ///
    /// `/a/*/b` yields `["a", "*", "b"]`; `/` yields nothing.
    pub fn to_segments(&self) -> Vec<&str> {
        self.0.split('/').filter(|s| !s.is_empty()).collect()
    }

    /// Whether any segment is exactly the wildcard marker
    pub fn has_wildcard(&self) -> bool {
        self.0.split('/').any(|s| s == WILDCARD)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PathKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Derive the path key of a raw URL string
pub fn derive_path_key(input: &str, keep_wildcards: bool) -> Result<PathKey> {
    let url = parse_url(input)?;
    Ok(PathKey::normalize(url.path(), keep_wildcards))
}
