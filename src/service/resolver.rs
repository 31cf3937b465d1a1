//! Store Resolver
//!
//! The cold read path: fetch the origin's collection from the repository
//! and run pattern matching against it. Also serves as the prewarm loader.

use crate::cache::{HotCacheKey, PrewarmLoader};
use crate::domain::ports::ContentRepositoryRef;
use crate::domain::record::VideoPayload;
use crate::error::{Error, Result};
use async_trait::async_trait;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Resolves request keys against the persistent store
#[derive(Clone)]
pub struct StoreResolver {
    repository: ContentRepositoryRef,
}

impl StoreResolver {
    pub fn new(repository: ContentRepositoryRef) -> Self {
        Self { repository }
    }

    /// Resolve `key` against its origin's stored collection.
    ///
    /// Fails with [`Error::OriginNotFound`] when the origin has no
    /// collection and [`Error::ContentNotFound`] when no pattern matches.
    pub async fn resolve(&self, key: &HotCacheKey, cancel: &CancellationToken) -> Result<VideoPayload> {
        let collection = self.repository.get(key.origin(), cancel).await?;

        match collection.resolve(key.path()) {
            Some(payload) => {
                debug!(
                    origin = %key.origin(),
                    path = %key.path(),
                    candidates = collection.len(),
                    "Resolved from store"
                );
                Ok(payload.clone())
            }
            None => Err(Error::ContentNotFound {
                origin: key.origin().to_string(),
                path: key.path().to_string(),
            }),
        }
    }
}

#[async_trait]
impl PrewarmLoader for StoreResolver {
    async fn load(&self, key: &HotCacheKey, cancel: &CancellationToken) -> Result<VideoPayload> {
        self.resolve(key, cancel).await
    }
}
