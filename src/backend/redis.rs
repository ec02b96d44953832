//! Redis Backend
//!
//! Thin adapters over a Redis server. Expiry is enforced by Redis itself: each
//! write sets the key with a `PX` expiry equal to the backend TTL.
//!
//! ## Example
//!
//! ```ignore
//! use memo_cache::{cache, RedisBackend};
//! use std::time::Duration;
//!
//! let backend = RedisBackend::open("redis://localhost:6379", Duration::from_secs(3600))?;
//! let cached = cache(backend);
//! ```

use std::time::Duration;

use async_trait::async_trait;
use redis::{aio::MultiplexedConnection, AsyncCommands, Client, Commands, Connection};
use tracing::trace;

use crate::backend::{AsyncBackend, Backend};
use crate::error::Result;
use crate::key::CacheKey;

/// TTL in whole milliseconds, never below 1 ms since Redis rejects `PX 0`.
fn ttl_millis(ttl: Duration) -> u64 {
    let millis = ttl.as_nanos().div_ceil(1_000_000);
    u64::try_from(millis).unwrap_or(u64::MAX).max(1)
}

// == Redis Backend ==
/// Blocking Redis storage. Opens a connection per operation.
#[derive(Debug, Clone)]
pub struct RedisBackend {
    client: Client,
    ttl: Duration,
}

impl RedisBackend {
    pub fn new(client: Client, ttl: Duration) -> Self {
        Self { client, ttl }
    }

    /// Creates a backend from a connection URL such as `redis://localhost:6379`.
    pub fn open(url: &str, ttl: Duration) -> Result<Self> {
        Ok(Self::new(Client::open(url)?, ttl))
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    fn connection(&self) -> Result<Connection> {
        Ok(self.client.get_connection()?)
    }
}

impl Backend for RedisBackend {
    fn get(&self, key: &CacheKey) -> Result<Option<String>> {
        let mut conn = self.connection()?;
        let value: Option<String> = conn.get(key.as_str())?;
        trace!(key = %key, found = value.is_some(), "redis GET");
        Ok(value)
    }

    fn write(&self, key: &CacheKey, value: &str) -> Result<()> {
        let mut conn = self.connection()?;
        let _: () = conn.pset_ex(key.as_str(), value, ttl_millis(self.ttl))?;
        trace!(key = %key, "redis SET");
        Ok(())
    }

    fn name(&self) -> &'static str {
        "redis"
    }
}

// == Async Redis Backend ==
/// Non-blocking Redis storage over a multiplexed connection.
#[derive(Debug, Clone)]
pub struct AsyncRedisBackend {
    client: Client,
    ttl: Duration,
}

impl AsyncRedisBackend {
    pub fn new(client: Client, ttl: Duration) -> Self {
        Self { client, ttl }
    }

    pub fn open(url: &str, ttl: Duration) -> Result<Self> {
        Ok(Self::new(Client::open(url)?, ttl))
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    async fn connection(&self) -> Result<MultiplexedConnection> {
        Ok(self.client.get_multiplexed_async_connection().await?)
    }
}

#[async_trait]
impl AsyncBackend for AsyncRedisBackend {
    async fn get(&self, key: &CacheKey) -> Result<Option<String>> {
        let mut conn = self.connection().await?;
        let value: Option<String> = conn.get(key.as_str()).await?;
        trace!(key = %key, found = value.is_some(), "redis GET");
        Ok(value)
    }

    async fn write(&self, key: &CacheKey, value: &str) -> Result<()> {
        let mut conn = self.connection().await?;
        let _: () = conn
            .pset_ex(key.as_str(), value, ttl_millis(self.ttl))
            .await?;
        trace!(key = %key, "redis SET");
        Ok(())
    }

    fn name(&self) -> &'static str {
        "async-redis"
    }
}
