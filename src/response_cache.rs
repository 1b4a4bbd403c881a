// Content-addressed store of raw provider responses
// Consulted before every network call so repeated searches are free. Entries are
// never expired or invalidated here; clearing the medium is an external concern.

use std::{
    collections::hash_map::DefaultHasher,
    hash::{Hash, Hasher},
    io::ErrorKind,
    path::{Path, PathBuf},
    sync::atomic::{AtomicU64, Ordering},
};

use async_trait::async_trait;
use bytes::Bytes;
use dashmap::DashMap;
use parking_lot::RwLock;
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::warn;

use crate::provider::ProviderRequest;

#[derive(Error, Debug)]
pub enum CacheError {
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct CacheStats {
    pub size_bytes: usize,
    pub items_count: usize,
    pub hit_count: usize,
    pub miss_count: usize,
    pub write_count: usize,
}

/// Structural hash of the encoded request. Run flags never reach the wire
/// request, so they never influence the key.
pub fn cache_key(request: &ProviderRequest) -> u64 {
    let mut hasher = DefaultHasher::new();
    request.hash(&mut hasher);
    hasher.finish()
}

// Minimal get/put contract. A miss must look exactly like a key never written.
#[async_trait]
pub trait ResponseCache: Send + Sync + 'static {
    async fn get(&self, key: u64) -> Option<Bytes>;

    // Same key always carries the same content, so racing writers are harmless
    async fn put(&self, key: u64, data: Bytes) -> Result<(), CacheError>;

    fn stats(&self) -> CacheStats;
}

#[derive(Debug, Default)]
pub struct MemoryCache {
    store: DashMap<u64, Bytes>,
    cache_stats: RwLock<CacheStats>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.store.len()
    }

    pub fn is_empty(&self) -> bool {
        self.store.is_empty()
    }
}

#[async_trait]
impl ResponseCache for MemoryCache {
    async fn get(&self, key: u64) -> Option<Bytes> {
        let hit = self.store.get(&key).map(|entry| entry.value().clone());

        let mut stats = self.cache_stats.write();
        match hit {
            Some(_) => stats.hit_count += 1,
            None => stats.miss_count += 1,
        }
        hit
    }

    async fn put(&self, key: u64, data: Bytes) -> Result<(), CacheError> {
        let new_len = data.len();

        // Stats lock spans the insert so size accounting never sees writes out of order
        let mut stats = self.cache_stats.write();
        let previous = self.store.insert(key, data);
        stats.write_count += 1;
        match previous {
            Some(old) => stats.size_bytes = stats.size_bytes - old.len() + new_len,
            None => {
                stats.items_count += 1;
                stats.size_bytes += new_len;
            }
        }
        Ok(())
    }

    fn stats(&self) -> CacheStats {
        self.cache_stats.read().clone()
    }
}

/// One file per entry under `dir`, named `qpx-<key>`.
#[derive(Debug)]
pub struct FileCache {
    dir: PathBuf,
    tmp_seq: AtomicU64,
    // Serializes the exists check, rename and stats update of a write
    commit: Mutex<()>,
    cache_stats: RwLock<CacheStats>,
}

impl FileCache {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            tmp_seq: AtomicU64::new(0),
            commit: Mutex::new(()),
            cache_stats: RwLock::new(CacheStats::default()),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn entry_path(&self, key: u64) -> PathBuf {
        self.dir.join(format!("qpx-{key}"))
    }
}

#[async_trait]
impl ResponseCache for FileCache {
    async fn get(&self, key: u64) -> Option<Bytes> {
        let path = self.entry_path(key);
        let hit = match tokio::fs::read(&path).await {
            Ok(data) => Some(Bytes::from(data)),
            Err(e) if e.kind() == ErrorKind::NotFound => None,
            Err(e) => {
                warn!(path = %path.display(), "Unreadable cache entry treated as miss: {e}");
                None
            }
        };

        let mut stats = self.cache_stats.write();
        match hit {
            Some(_) => stats.hit_count += 1,
            None => stats.miss_count += 1,
        }
        hit
    }

    async fn put(&self, key: u64, data: Bytes) -> Result<(), CacheError> {
        tokio::fs::create_dir_all(&self.dir).await?;

        // Readers never observe a half-written entry
        let seq = self.tmp_seq.fetch_add(1, Ordering::SeqCst);
        let tmp = self.dir.join(format!(".qpx-{key}.{seq}.tmp"));
        let path = self.entry_path(key);
        tokio::fs::write(&tmp, &data).await?;

        let _commit = self.commit.lock().await;
        let existed = tokio::fs::try_exists(&path).await.unwrap_or(false);
        tokio::fs::rename(&tmp, &path).await?;

        let mut stats = self.cache_stats.write();
        stats.write_count += 1;
        if !existed {
            stats.items_count += 1;
            stats.size_bytes += data.len();
        }
        Ok(())
    }

    fn stats(&self) -> CacheStats {
        self.cache_stats.read().clone()
    }
}
