//! Domain Ports - Core trait definitions for the content resolver
//!
//! These traits define the boundaries between the resolution logic and the
//! systems it persists to. Adapters implement these traits to provide
//! concrete storage.

use crate::domain::collection::ContentCollection;
use crate::domain::keys::OriginKey;
use crate::domain::record::ContentRecord;
use crate::error::{Error, Result};
use async_trait::async_trait;
use std::future::Future;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

// =============================================================================
// Content Repository Trait
// =============================================================================

/// Trait for durable per-origin content storage
///
/// Every I/O-bound operation takes a cancellation token. A canceled
/// operation returns [`Error::Canceled`] and leaves no partially written
/// collection behind.
#[async_trait]
pub trait ContentRepository: Send + Sync {
    /// Merge a record into its origin's collection and persist the result
    async fn save(&self, record: ContentRecord, cancel: &CancellationToken) -> Result<()>;

    /// Load the collection for an origin
    ///
    /// Fails with [`Error::OriginNotFound`] when nothing was ever saved for
    /// the origin and [`Error::CorruptData`] when the stored bytes do not
    /// decode.
    async fn get(&self, origin: &OriginKey, cancel: &CancellationToken)
        -> Result<ContentCollection>;

    /// Check if the repository is available
    async fn health_check(&self) -> Result<bool>;
}

/// Type alias for Arc'd repository
pub type ContentRepositoryRef = Arc<dyn ContentRepository>;

// =============================================================================
// Cancellation
// =============================================================================

/// Run `fut` unless `cancel` fires first
pub async fn cancellable<T, F>(cancel: &CancellationToken, fut: F) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    if cancel.is_cancelled() {
        return Err(Error::Canceled);
    }

    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(Error::Canceled),
        result = fut => result,
    }
}
