//! File-Backed Content Store
//!
//! One JSON file per origin under a fixed root directory. Every save is a
//! read-modify-write of the whole collection, serialized per origin, and
//! committed with a write-to-temp-then-rename so readers never observe a
//! partially written file.

use crate::domain::collection::ContentCollection;
use crate::domain::keys::OriginKey;
use crate::domain::ports::{cancellable, ContentRepository};
use crate::domain::record::ContentRecord;
use crate::error::{Error, Result};
use async_trait::async_trait;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::io::ErrorKind as IoErrorKind;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tokio::sync::RwLock;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

const STORE_NAME: &str = "file";

// =============================================================================
// File Store Configuration
// =============================================================================

/// Configuration for the file store
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileStoreConfig {
    /// Root directory for collection files
    pub root_path: PathBuf,
    /// Whether to fsync the temp file before it replaces the collection
    pub sync_writes: bool,
}

impl Default for FileStoreConfig {
    fn default() -> Self {
        Self {
            root_path: PathBuf::from("assets/tmp"),
            sync_writes: true,
        }
    }
}

// =============================================================================
// File Content Store
// =============================================================================

/// Persistent content store on the local file system
pub struct FileContentStore {
    /// Root directory for collection files
    root_path: PathBuf,
    /// Whether to sync writes
    sync_writes: bool,
    /// One reader/writer lock per origin
    locks: DashMap<OriginKey, Arc<RwLock<()>>>,
    /// Sequence for unique temp file names
    temp_seq: AtomicU64,
}

impl FileContentStore {
    /// Create a store with default config
    pub async fn new() -> Result<Self> {
        Self::with_config(FileStoreConfig::default()).await
    }

    /// Create a store rooted at `root_path`
    pub async fn with_path(root_path: impl Into<PathBuf>) -> Result<Self> {
        Self::with_config(FileStoreConfig {
            root_path: root_path.into(),
            ..Default::default()
        })
        .await
    }

    /// Create a store with full config
    pub async fn with_config(config: FileStoreConfig) -> Result<Self> {
        fs::create_dir_all(&config.root_path)
            .await
            .map_err(|e| Error::store_unavailable(STORE_NAME, e))?;

        Ok(Self {
            root_path: config.root_path,
            sync_writes: config.sync_writes,
            locks: DashMap::new(),
            temp_seq: AtomicU64::new(0),
        })
    }

    pub fn root_path(&self) -> &Path {
        &self.root_path
    }

    /// File holding the collection for `origin`
    pub fn file_path(&self, origin: &OriginKey) -> PathBuf {
        self.root_path
            .join(format!("{}.json", urlencoding::encode(origin.as_str())))
    }

    fn lock_for(&self, origin: &OriginKey) -> Arc<RwLock<()>> {
        self.locks.entry(origin.clone()).or_default().clone()
    }

    /// Drop the caller's handle and forget the lock once nobody else holds it.
    ///
    /// `lock_for` clones under the same shard lock `remove_if` checks under,
    /// so a lock is only removed while no task can be waiting on it.
    fn release_lock(&self, origin: &OriginKey, lock: Arc<RwLock<()>>) {
        drop(lock);
        self.locks
            .remove_if(origin, |_, lock| Arc::strong_count(lock) == 1);
    }

    /// Origins with a lock currently in use
    pub fn active_locks(&self) -> usize {
        self.locks.len()
    }

    async fn save_locked(
        &self,
        lock: &RwLock<()>,
        origin: &OriginKey,
        record: ContentRecord,
        cancel: &CancellationToken,
    ) -> Result<()> {
        let key = record.storage_key();
        let _guard = cancellable(cancel, async { Ok(lock.write().await) }).await?;

        let collection = match cancellable(cancel, self.read_collection(origin)).await {
            Ok(mut existing) => {
                existing.put(key.clone(), record);
                existing
            }
            Err(Error::OriginNotFound { .. }) => ContentCollection::single(key.clone(), record),
            Err(e) => return Err(e),
        };

        self.write_collection(origin, &collection, cancel).await?;

        debug!(
            origin = %origin,
            path = %key,
            records = collection.len(),
            "Saved content collection"
        );
        Ok(())
    }

    async fn read_collection(&self, origin: &OriginKey) -> Result<ContentCollection> {
        let path = self.file_path(origin);
        let bytes = match fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == IoErrorKind::NotFound => {
                return Err(Error::OriginNotFound {
                    origin: origin.to_string(),
                })
            }
            Err(e) => return Err(Error::store_unavailable(STORE_NAME, e)),
        };

        ContentCollection::from_json(origin, &bytes).map_err(|e| {
            warn!(origin = %origin, path = %path.display(), error = %e, "Corrupt collection file");
            e
        })
    }

    async fn write_temp(&self, temp_path: &Path, bytes: &[u8]) -> Result<()> {
        // The root may have been removed since startup
        if let Some(parent) = temp_path.parent() {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| Error::store_unavailable(STORE_NAME, e))?;
        }

        let mut file = fs::File::create(temp_path)
            .await
            .map_err(|e| Error::store_unavailable(STORE_NAME, e))?;
        file.write_all(bytes)
            .await
            .map_err(|e| Error::store_unavailable(STORE_NAME, e))?;
        if self.sync_writes {
            file.sync_all()
                .await
                .map_err(|e| Error::store_unavailable(STORE_NAME, e))?;
        }
        Ok(())
    }

    async fn write_collection(
        &self,
        origin: &OriginKey,
        collection: &ContentCollection,
        cancel: &CancellationToken,
    ) -> Result<()> {
        let path = self.file_path(origin);
        let seq = self.temp_seq.fetch_add(1, Ordering::Relaxed);
        let temp_path = path.with_extension(format!("json.{}.tmp", seq));
        let bytes = collection.to_json()?;

        if let Err(e) = cancellable(cancel, self.write_temp(&temp_path, &bytes)).await {
            let _ = fs::remove_file(&temp_path).await;
            return Err(e);
        }

        // The rename is the commit point and is not interrupted.
        if let Err(e) = fs::rename(&temp_path, &path).await {
            let _ = fs::remove_file(&temp_path).await;
            return Err(Error::store_unavailable(STORE_NAME, e));
        }

        Ok(())
    }
}

#[async_trait]
impl ContentRepository for FileContentStore {
    async fn save(&self, record: ContentRecord, cancel: &CancellationToken) -> Result<()> {
        let origin = record.origin().clone();
        let lock = self.lock_for(&origin);
        let result = self.save_locked(&lock, &origin, record, cancel).await;
        self.release_lock(&origin, lock);
        result
    }

    async fn get(
        &self,
        origin: &OriginKey,
        cancel: &CancellationToken,
    ) -> Result<ContentCollection> {
        let lock = self.lock_for(origin);
        let result = async {
            let _guard = cancellable(cancel, async { Ok(lock.read().await) }).await?;
            cancellable(cancel, self.read_collection(origin)).await
        }
        .await;
        self.release_lock(origin, lock);
        result
    }

    async fn health_check(&self) -> Result<bool> {
        Ok(fs::metadata(&self.root_path)
            .await
            .map(|m| m.is_dir())
            .unwrap_or(false))
    }
}
