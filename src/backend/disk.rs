//! Disk Backend
//!
//! One JSON file per key under a directory: `<dir>/<key>.json` containing a
//! [`CacheEntry`]. A missing file and an expired entry both read as a miss.
//! Writes go to a temporary file in the same directory which is then renamed
//! over the entry, so readers see either the old entry or the new one, never a
//! partial file. There is no cross-process locking; the last rename wins.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, trace};

use crate::backend::{AsyncBackend, Backend, CacheEntry};
use crate::error::Result;
use crate::key::CacheKey;

fn entry_path(directory: &Path, key: &CacheKey) -> PathBuf {
    directory.join(format!("{}.json", key.as_str()))
}

/// Unique per process and per write, so concurrent writers never share one.
fn temp_path(directory: &Path, key: &CacheKey) -> PathBuf {
    static NEXT: AtomicU64 = AtomicU64::new(0);
    let n = NEXT.fetch_add(1, Ordering::Relaxed);
    directory.join(format!(".{}.{}.{n}.tmp", key.as_str(), std::process::id()))
}

/// Decodes a file body, returning the value only if the entry is still live.
fn live_value(raw: &str, key: &CacheKey, ttl: Duration) -> Result<Option<String>> {
    let entry: CacheEntry = serde_json::from_str(raw)?;
    if entry.is_expired(ttl) {
        debug!(key = %key, age_ms = entry.age().as_millis() as u64, "disk entry expired");
        return Ok(None);
    }
    Ok(Some(entry.value))
}

// == Disk Backend ==
/// Blocking file-per-key storage.
#[derive(Debug, Clone)]
pub struct DiskBackend {
    directory: PathBuf,
    ttl: Duration,
}

impl DiskBackend {
    /// Creates a backend rooted at `directory`. The directory is created on
    /// first write if it does not exist.
    pub fn new(directory: impl Into<PathBuf>, ttl: Duration) -> Self {
        Self {
            directory: directory.into(),
            ttl,
        }
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Path of the file backing `key`.
    pub fn path_for(&self, key: &CacheKey) -> PathBuf {
        entry_path(&self.directory, key)
    }
}

impl Backend for DiskBackend {
    fn get(&self, key: &CacheKey) -> Result<Option<String>> {
        let path = self.path_for(key);
        let raw = match std::fs::read_to_string(&path) {
            Ok(raw) => raw,
            Err(err) if err.kind() == ErrorKind::NotFound => {
                trace!(path = %path.display(), "no disk entry");
                return Ok(None);
            }
            Err(err) => return Err(err.into()),
        };
        live_value(&raw, key, self.ttl)
    }

    fn write(&self, key: &CacheKey, value: &str) -> Result<()> {
        std::fs::create_dir_all(&self.directory)?;
        let body = serde_json::to_string(&CacheEntry::new(value.to_string()))?;
        let path = self.path_for(key);
        let temp = temp_path(&self.directory, key);
        let replaced = std::fs::write(&temp, body).and_then(|()| std::fs::rename(&temp, &path));
        if let Err(err) = replaced {
            let _ = std::fs::remove_file(&temp);
            return Err(err.into());
        }
        trace!(path = %path.display(), "disk entry written");
        Ok(())
    }

    fn name(&self) -> &'static str {
        "disk"
    }
}

// == Async Disk Backend ==
/// The same on-disk layout as [`DiskBackend`], using `tokio::fs`.
#[derive(Debug, Clone)]
pub struct AsyncDiskBackend {
    directory: PathBuf,
    ttl: Duration,
}

impl AsyncDiskBackend {
    pub fn new(directory: impl Into<PathBuf>, ttl: Duration) -> Self {
        Self {
            directory: directory.into(),
            ttl,
        }
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn path_for(&self, key: &CacheKey) -> PathBuf {
        entry_path(&self.directory, key)
    }
}

#[async_trait]
impl AsyncBackend for AsyncDiskBackend {
    async fn get(&self, key: &CacheKey) -> Result<Option<String>> {
        let path = self.path_for(key);
        let raw = match tokio::fs::read_to_string(&path).await {
            Ok(raw) => raw,
            Err(err) if err.kind() == ErrorKind::NotFound => {
                trace!(path = %path.display(), "no disk entry");
                return Ok(None);
            }
            Err(err) => return Err(err.into()),
        };
        live_value(&raw, key, self.ttl)
    }

    async fn write(&self, key: &CacheKey, value: &str) -> Result<()> {
        tokio::fs::create_dir_all(&self.directory).await?;
        let body = serde_json::to_string(&CacheEntry::new(value.to_string()))?;
        let path = self.path_for(key);
        let temp = temp_path(&self.directory, key);
        let replaced = match tokio::fs::write(&temp, body).await {
            Ok(()) => tokio::fs::rename(&temp, &path).await,
            Err(err) => Err(err),
        };
        if let Err(err) = replaced {
            let _ = tokio::fs::remove_file(&temp).await;
            return Err(err.into());
        }
        trace!(path = %path.display(), "disk entry written");
        Ok(())
    }

    fn name(&self) -> &'static str {
        "async-disk"
    }
}
