//! In-Memory Content Store
//!
//! Keeps serialized collections in a map instead of on disk. Collections go
//! through the same JSON encoding as the file store so decode failures
//! surface identically.

use crate::domain::collection::ContentCollection;
use crate::domain::keys::OriginKey;
use crate::domain::ports::{cancellable, ContentRepository};
use crate::domain::record::ContentRecord;
use crate::error::{Error, Result};
use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio_util::sync::CancellationToken;

const STORE_NAME: &str = "memory";

/// In-process content store
pub struct MemoryContentStore {
    /// Serialized collections by origin
    store: RwLock<HashMap<OriginKey, Vec<u8>>>,
    /// Is backend available
    available: AtomicBool,
}

impl MemoryContentStore {
    pub fn new() -> Self {
        Self {
            store: RwLock::new(HashMap::new()),
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

    /// Replace the raw bytes stored for an origin
    pub fn insert_raw(&self, origin: OriginKey, bytes: Vec<u8>) {
        self.store.write().insert(origin, bytes);
    }

    /// Number of origins with a stored collection
    pub fn origin_count(&self) -> usize {
        self.store.read().len()
    }

    fn check_available(&self) -> Result<()> {
        if self.is_available() {
            Ok(())
        } else {
            Err(Error::store_unavailable(STORE_NAME, "backend marked unavailable"))
        }
    }
}

impl Default for MemoryContentStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ContentRepository for MemoryContentStore {
    async fn save(&self, record: ContentRecord, cancel: &CancellationToken) -> Result<()> {
        cancellable(cancel, async {
            self.check_available()?;

            let origin = record.origin().clone();
            let key = record.storage_key();

            // Whole read-modify-write under one write lock
            let mut store = self.store.write();
            let collection = match store.get(&origin) {
                Some(bytes) => {
                    let mut existing = ContentCollection::from_json(&origin, bytes)?;
                    existing.put(key, record);
                    existing
                }
                None => ContentCollection::single(key, record),
            };
            store.insert(origin, collection.to_json()?);
            Ok(())
        })
        .await
    }

    async fn get(
        &self,
        origin: &OriginKey,
        cancel: &CancellationToken,
    ) -> Result<ContentCollection> {
        cancellable(cancel, async {
            self.check_available()?;

            let store = self.store.read();
            match store.get(origin) {
                Some(bytes) => ContentCollection::from_json(origin, bytes),
                None => Err(Error::OriginNotFound {
                    origin: origin.to_string(),
                }),
            }
        })
        .await
    }

    async fn health_check(&self) -> Result<bool> {
        Ok(self.is_available())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::keys::{derive_origin_key, PathKey};
    use assert_matches::assert_matches;

    #[tokio::test]
    async fn test_basic_operations() {
        let store = MemoryContentStore::new();
        let cancel = CancellationToken::new();

        let record = ContentRecord::new("https://x.com/a/*", "V", "T").unwrap();
        store.save(record, &cancel).await.unwrap();
        assert_eq!(store.origin_count(), 1);

        let origin = derive_origin_key("https://x.com").unwrap();
        let collection = store.get(&origin, &cancel).await.unwrap();
        let payload = collection.resolve(&PathKey::normalize("/a/b", true)).unwrap();
        assert_eq!(payload.video_url, "V");
    }

    #[tokio::test]
    async fn test_unavailable() {
        let store = MemoryContentStore::new();
        store.set_available(false);

        let origin = derive_origin_key("https://x.com").unwrap();
        let result = store.get(&origin, &CancellationToken::new()).await;
        assert_matches!(result, Err(Error::StoreUnavailable { .. }));
        assert!(!store.health_check().await.unwrap());
    }

    #[tokio::test]
    async fn test_corrupt_bytes() {
        let store = MemoryContentStore::new();
        let origin = derive_origin_key("https://x.com").unwrap();
        store.insert_raw(origin.clone(), b"{\"/a\": 42}".to_vec());

        let result = store.get(&origin, &CancellationToken::new()).await;
        assert_matches!(result, Err(Error::CorruptData { .. }));
    }
}
