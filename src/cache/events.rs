//! Cache Events
//!
//! Events emitted by the hot cache for monitoring and observability.

use crate::cache::tier::TtlTier;
use serde::{Deserialize, Serialize};

/// Events emitted by the hot cache
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum CacheEvent {
    /// Live entry found
    Hit { key: String, popularity: f64 },

    /// No live entry
    Miss { key: String },

    /// Entry written
    Set {
        key: String,
        tier: TtlTier,
        ttl_secs: u64,
    },

    /// Write dropped after a backend failure
    SetFailed { key: String, error: String },

    /// Backend could not be reached
    BackendUnavailable { backend: String, reason: String },

    /// Prewarm run finished
    PrewarmComplete {
        candidates: usize,
        loaded: usize,
        failed: usize,
    },
}

impl CacheEvent {
    /// Get the key associated with this event (if any)
    pub fn key(&self) -> Option<&str> {
        match self {
            CacheEvent::Hit { key, .. } => Some(key),
            CacheEvent::Miss { key } => Some(key),
            CacheEvent::Set { key, .. } => Some(key),
            CacheEvent::SetFailed { key, .. } => Some(key),
            _ => None,
        }
    }

    /// Check if this is an error event
    pub fn is_error(&self) -> bool {
        matches!(
            self,
            CacheEvent::SetFailed { .. } | CacheEvent::BackendUnavailable { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_accessors() {
        let hit = CacheEvent::Hit {
            key: "content.render.https://x.com/a".into(),
            popularity: 2.0,
        };
        assert_eq!(hit.key(), Some("content.render.https://x.com/a"));
        assert!(!hit.is_error());

        let unavailable = CacheEvent::BackendUnavailable {
            backend: "memory".into(),
            reason: "down".into(),
        };
        assert_eq!(unavailable.key(), None);
        assert!(unavailable.is_error());
    }
}
