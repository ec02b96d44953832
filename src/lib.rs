//! memo_cache - Typed function-result caching
//!
//! Memoizes function results in a pluggable backend (disk, memory or Redis),
//! keyed by a SHA-256 of the serialized call arguments. Return values are
//! stored as JSON and validated against the return type's schema on the way
//! back.

pub mod backend;
pub mod codec;
pub mod config;
pub mod decorator;
pub mod error;
mod finite;
pub mod key;

pub use backend::{
    AsyncBackend, AsyncDiskBackend, Backend, BackendHandle, BackendKind, BackendSource,
    CacheEntry, CacheStats, DiskBackend, MemoryBackend,
};
#[cfg(feature = "redis")]
pub use backend::{AsyncRedisBackend, RedisBackend};
pub use codec::ResultCodec;
pub use config::Config;
pub use decorator::{cache, disk_cache, Cache, CachedAsyncFn, CachedFn};
pub use error::{CacheError, ConfigurationError, Result};
pub use key::{BoundArguments, CacheKey, Parameter, Signature};
