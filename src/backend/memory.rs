//! In-Memory Backend
//!
//! Process-local HashMap storage with per-entry TTL.

use std::collections::HashMap;
use std::sync::{RwLock, RwLockWriteGuard};
use std::time::Duration;

use async_trait::async_trait;
use tracing::trace;

use crate::backend::{AsyncBackend, Backend, CacheEntry, CacheStats};
use crate::error::{CacheError, Result};
use crate::key::CacheKey;

// == Memory Backend ==
/// In-memory storage with TTL expiration.
///
/// Implements both [`Backend`] and [`AsyncBackend`]; pick the flavour when
/// wrapping it in a [`BackendHandle`](crate::BackendHandle).
#[derive(Debug)]
pub struct MemoryBackend {
    state: RwLock<MemoryState>,
    ttl: Duration,
}

#[derive(Debug, Default)]
struct MemoryState {
    entries: HashMap<String, CacheEntry>,
    stats: CacheStats,
}

impl MemoryBackend {
    // == Constructor ==
    /// Creates an empty backend whose entries live for `ttl`.
    pub fn new(ttl: Duration) -> Self {
        Self {
            state: RwLock::new(MemoryState::default()),
            ttl,
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    fn lock(&self) -> Result<RwLockWriteGuard<'_, MemoryState>> {
        self.state
            .write()
            .map_err(|_| CacheError::Internal("memory backend lock poisoned".to_string()))
    }

    // == Get ==
    /// Returns the stored value if present and not expired.
    ///
    /// Expired entries are removed and counted as misses.
    pub fn lookup(&self, key: &CacheKey) -> Result<Option<String>> {
        let mut state = self.lock()?;
        let found = state
            .entries
            .get(key.as_str())
            .map(|entry| (entry.is_expired(self.ttl), entry.value.clone()));

        match found {
            None => {
                state.stats.record_miss();
                Ok(None)
            }
            Some((true, _)) => {
                trace!(key = %key, "memory entry expired");
                state.entries.remove(key.as_str());
                let count = state.entries.len();
                state.stats.set_total_entries(count);
                state.stats.record_expiration();
                Ok(None)
            }
            Some((false, value)) => {
                state.stats.record_hit();
                Ok(Some(value))
            }
        }
    }

    // == Set ==
    /// Stores a value, overwriting any previous entry and resetting its age.
    pub fn store(&self, key: &CacheKey, value: &str) -> Result<()> {
        let mut state = self.lock()?;
        state
            .entries
            .insert(key.to_string(), CacheEntry::new(value.to_string()));
        let count = state.entries.len();
        state.stats.set_total_entries(count);
        state.stats.record_write();
        Ok(())
    }

    // == Stats ==
    /// Returns current statistics.
    pub fn stats(&self) -> Result<CacheStats> {
        Ok(self.lock()?.stats.clone())
    }

    // == Cleanup Expired ==
    /// Removes all expired entries, returning how many were dropped.
    pub fn purge_expired(&self) -> Result<usize> {
        let mut state = self.lock()?;
        let before = state.entries.len();
        let ttl = self.ttl;
        state.entries.retain(|_, entry| !entry.is_expired(ttl));
        let count = state.entries.len();
        state.stats.set_total_entries(count);
        Ok(before - count)
    }

    pub fn len(&self) -> Result<usize> {
        Ok(self.lock()?.entries.len())
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }
}

impl Backend for MemoryBackend {
    fn get(&self, key: &CacheKey) -> Result<Option<String>> {
        self.lookup(key)
    }

    fn write(&self, key: &CacheKey, value: &str) -> Result<()> {
        self.store(key, value)
    }

    fn name(&self) -> &'static str {
        "memory"
    }
}

#[async_trait]
impl AsyncBackend for MemoryBackend {
    async fn get(&self, key: &CacheKey) -> Result<Option<String>> {
        self.lookup(key)
    }

    async fn write(&self, key: &CacheKey, value: &str) -> Result<()> {
        self.store(key, value)
    }

    fn name(&self) -> &'static str {
        "memory"
    }
}
