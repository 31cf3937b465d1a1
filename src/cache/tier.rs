//! TTL Tier Definitions
//!
//! Content is cached with one of two lifetimes depending on how often its
//! path has been read: popular paths stay for a day, everything else for
//! half an hour.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

// =============================================================================
// Defaults
// =============================================================================

/// Access count a path must exceed to be cached with the hot TTL
pub const DEFAULT_POPULARITY_THRESHOLD: f64 = 5.0;

/// Hot TTL: 24 hours
pub const DEFAULT_HOT_TTL_SECS: u64 = 24 * 60 * 60;

/// Default TTL: 30 minutes
pub const DEFAULT_TTL_SECS: u64 = 30 * 60;

// =============================================================================
// TTL Tier
// =============================================================================

/// Lifetime class of a cached entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TtlTier {
    /// Short TTL for ordinary content
    #[default]
    Default,
    /// Long TTL for frequently read content
    Hot,
}

impl fmt::Display for TtlTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TtlTier::Default => write!(f, "default"),
            TtlTier::Hot => write!(f, "hot"),
        }
    }
}

// =============================================================================
// TTL Policy
// =============================================================================

/// Maps popularity scores to tiers and tiers to lifetimes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TtlPolicy {
    /// Score strictly above which a path is hot
    pub popularity_threshold: f64,
    /// Lifetime of hot entries in seconds
    pub hot_ttl_secs: u64,
    /// Lifetime of default entries in seconds
    pub default_ttl_secs: u64,
}

impl Default for TtlPolicy {
    fn default() -> Self {
        Self {
            popularity_threshold: DEFAULT_POPULARITY_THRESHOLD,
            hot_ttl_secs: DEFAULT_HOT_TTL_SECS,
            default_ttl_secs: DEFAULT_TTL_SECS,
        }
    }
}

impl TtlPolicy {
    /// Tier for a popularity score
    pub fn tier_for(&self, score: f64) -> TtlTier {
        if score > self.popularity_threshold {
            TtlTier::Hot
        } else {
            TtlTier::Default
        }
    }

    /// Lifetime of a tier
    pub fn ttl(&self, tier: TtlTier) -> Duration {
        match tier {
            TtlTier::Hot => Duration::from_secs(self.hot_ttl_secs),
            TtlTier::Default => Duration::from_secs(self.default_ttl_secs),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tier_for_score() {
        let policy = TtlPolicy::default();

        assert_eq!(policy.tier_for(0.0), TtlTier::Default);
        assert_eq!(policy.tier_for(5.0), TtlTier::Default);
        assert_eq!(policy.tier_for(6.0), TtlTier::Hot);
        assert_eq!(policy.tier_for(1_000.0), TtlTier::Hot);
    }

    #[test]
    fn test_tier_ttls() {
        let policy = TtlPolicy::default();
        assert_eq!(policy.ttl(TtlTier::Hot), Duration::from_secs(86_400));
        assert_eq!(policy.ttl(TtlTier::Default), Duration::from_secs(1_800));
    }

    #[test]
    fn test_tier_display() {
        assert_eq!(TtlTier::Hot.to_string(), "hot");
        assert_eq!(TtlTier::Default.to_string(), "default");
    }
}
