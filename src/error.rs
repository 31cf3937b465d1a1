//! Error types for the Content Resolver
//!
//! Provides structured error types for key derivation, the persistent
//! content store, the hot cache tier and the HTTP adapter.

use thiserror::Error;

/// Unified error type for the resolver
#[derive(Error, Debug)]
pub enum Error {
    // =========================================================================
    // Internal Errors
    // =========================================================================
    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    // =========================================================================
    // Validation Errors
    // =========================================================================
    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Invalid URL '{input}': {reason}")]
    InvalidUrl { input: String, reason: String },

    // =========================================================================
    // Lookup Errors
    // =========================================================================
    #[error("No content registered for origin {origin}")]
    OriginNotFound { origin: String },

    #[error("No content matches {origin}{path}")]
    ContentNotFound { origin: String, path: String },

    // =========================================================================
    // Persistent Store Errors
    // =========================================================================
    #[error("Corrupt content collection for origin {origin}: {reason}")]
    CorruptData { origin: String, reason: String },

    #[error("Store unavailable: {store} - {reason}")]
    StoreUnavailable { store: String, reason: String },

    // =========================================================================
    // Hot Cache Errors
    // =========================================================================
    #[error("Cache miss: {key}")]
    CacheMiss { key: String },

    #[error("Cache backend unavailable: {reason}")]
    CacheUnavailable { reason: String },

    // =========================================================================
    // Cancellation
    // =========================================================================
    #[error("Operation canceled")]
    Canceled,

    // =========================================================================
    // Parse Errors
    // =========================================================================
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    // =========================================================================
    // IO Errors
    // =========================================================================
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Coarse classification a caller branches on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Malformed input; surfaced to the caller, never retried
    Validation,
    /// Normal negative result (no collection, no match, cache miss)
    NotFound,
    /// Persisted data could not be decoded
    CorruptData,
    /// A store or cache backend could not be reached
    Unavailable,
    /// Caller-initiated cancellation or timeout
    Canceled,
    /// Everything else
    Internal,
}

impl ErrorKind {
    /// Stable label for logs and metrics
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Validation => "validation",
            ErrorKind::NotFound => "not_found",
            ErrorKind::CorruptData => "corrupt_data",
            ErrorKind::Unavailable => "unavailable",
            ErrorKind::Canceled => "canceled",
            ErrorKind::Internal => "internal",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Error {
    /// Classify this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Validation(_) | Error::InvalidUrl { .. } => ErrorKind::Validation,

            Error::OriginNotFound { .. }
            | Error::ContentNotFound { .. }
            | Error::CacheMiss { .. } => ErrorKind::NotFound,

            Error::CorruptData { .. } => ErrorKind::CorruptData,

            Error::StoreUnavailable { .. } | Error::CacheUnavailable { .. } => {
                ErrorKind::Unavailable
            }

            Error::Canceled => ErrorKind::Canceled,

            Error::Internal(_)
            | Error::Configuration(_)
            | Error::Json(_)
            | Error::Yaml(_)
            | Error::Io(_) => ErrorKind::Internal,
        }
    }

    /// Check if this is a "nothing there" outcome rather than a fault
    pub fn is_not_found(&self) -> bool {
        self.kind() == ErrorKind::NotFound
    }

    /// Check if this error was caused by bad input
    pub fn is_validation(&self) -> bool {
        self.kind() == ErrorKind::Validation
    }

    /// Check if this error is transient
    pub fn is_transient(&self) -> bool {
        matches!(self.kind(), ErrorKind::Unavailable | ErrorKind::Canceled)
    }

    pub(crate) fn store_unavailable(store: &str, reason: impl std::fmt::Display) -> Self {
        Error::StoreUnavailable {
            store: store.to_string(),
            reason: reason.to_string(),
        }
    }
}

/// Result type alias for the resolver
pub type Result<T> = std::result::Result<T, Error>;
