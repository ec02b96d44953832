//! Configuration Module
//!
//! Handles loading cache settings from environment variables.

use std::env;
use std::path::PathBuf;
use std::time::Duration;

/// Cache configuration parameters.
///
/// All values can be configured via environment variables with sensible defaults.
#[derive(Debug, Clone)]
pub struct Config {
    /// Directory holding one JSON file per cache entry
    pub cache_dir: PathBuf,
    /// Entry time-to-live in seconds
    pub default_ttl: u64,
    /// Redis connection URL, disk is used when unset
    pub redis_url: Option<String>,
}

impl Config {
    /// Creates a new Config by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `MEMO_CACHE_DIR` - Disk cache directory (default: `.memo_cache`)
    /// - `MEMO_CACHE_TTL` - Entry TTL in seconds (default: 86400)
    /// - `MEMO_CACHE_REDIS_URL` - Redis URL (default: unset)
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            cache_dir: env::var("MEMO_CACHE_DIR")
                .ok()
                .filter(|v| !v.is_empty())
                .map(PathBuf::from)
                .unwrap_or(defaults.cache_dir),
            default_ttl: env::var("MEMO_CACHE_TTL")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.default_ttl),
            redis_url: env::var("MEMO_CACHE_REDIS_URL")
                .ok()
                .filter(|v| !v.is_empty()),
        }
    }

    /// Entry time-to-live as a `Duration`.
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.default_ttl)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            cache_dir: PathBuf::from(".memo_cache"),
            default_ttl: 86_400,
            redis_url: None,
        }
    }
}
