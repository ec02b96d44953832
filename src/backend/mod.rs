//! Backend Module
//!
//! Storage capabilities for cached results. A backend is either blocking
//! ([`Backend`]) or asynchronous ([`AsyncBackend`]); [`BackendHandle`] carries
//! which one it is so the decorator can check compatibility up front instead
//! of probing at runtime.
//!
//! Lookups use a single call: `get` returns `Ok(None)` for a key that is absent
//! or expired, so there is no separate existence check to race against.

mod disk;
mod entry;
mod memory;
#[cfg(feature = "redis")]
mod redis;
mod stats;

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::trace;

use crate::error::Result;
use crate::key::CacheKey;

// Re-export public types
pub use disk::{AsyncDiskBackend, DiskBackend};
pub use entry::CacheEntry;
pub use memory::MemoryBackend;
#[cfg(feature = "redis")]
pub use self::redis::{AsyncRedisBackend, RedisBackend};
pub use stats::CacheStats;

// == Backend Traits ==
/// Blocking key-value storage.
pub trait Backend: Send + Sync {
    /// Returns the stored value, or `None` if the key is absent or expired.
    fn get(&self, key: &CacheKey) -> Result<Option<String>>;

    /// Stores `value` under `key`, replacing any previous entry.
    fn write(&self, key: &CacheKey, value: &str) -> Result<()>;

    /// Short backend name used in logs.
    fn name(&self) -> &'static str;
}

/// Asynchronous key-value storage.
#[async_trait]
pub trait AsyncBackend: Send + Sync {
    /// Returns the stored value, or `None` if the key is absent or expired.
    async fn get(&self, key: &CacheKey) -> Result<Option<String>>;

    /// Stores `value` under `key`, replacing any previous entry.
    async fn write(&self, key: &CacheKey, value: &str) -> Result<()>;

    /// Short backend name used in logs.
    fn name(&self) -> &'static str;
}

// == Backend Kind ==
/// Which call style a backend supports.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendKind {
    Blocking,
    Async,
}

// == Backend Handle ==
/// A shareable backend tagged with its call style.
#[derive(Clone)]
pub enum BackendHandle {
    Blocking(Arc<dyn Backend>),
    Async(Arc<dyn AsyncBackend>),
}

impl BackendHandle {
    pub fn blocking(backend: impl Backend + 'static) -> Self {
        Self::Blocking(Arc::new(backend))
    }

    pub fn asynchronous(backend: impl AsyncBackend + 'static) -> Self {
        Self::Async(Arc::new(backend))
    }

    pub fn kind(&self) -> BackendKind {
        match self {
            Self::Blocking(_) => BackendKind::Blocking,
            Self::Async(_) => BackendKind::Async,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Blocking(backend) => backend.name(),
            Self::Async(backend) => backend.name(),
        }
    }
}

impl fmt::Debug for BackendHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("BackendHandle")
            .field(&self.kind())
            .field(&self.name())
            .finish()
    }
}

// == Backend Source ==
type BackendFactory = dyn Fn() -> Result<BackendHandle> + Send + Sync;

/// Where a decorated function gets its backend from.
///
/// A `Factory` is invoked on every call and its result is never reused, which
/// suits backends holding per-call resources such as a freshly opened
/// connection.
#[derive(Clone)]
pub enum BackendSource {
    Fixed(BackendHandle),
    Factory(Arc<BackendFactory>),
}

impl BackendSource {
    pub fn factory<F>(factory: F) -> Self
    where
        F: Fn() -> Result<BackendHandle> + Send + Sync + 'static,
    {
        Self::Factory(Arc::new(factory))
    }

    /// The backend kind, when it is known without invoking a factory.
    pub fn known_kind(&self) -> Option<BackendKind> {
        match self {
            Self::Fixed(handle) => Some(handle.kind()),
            Self::Factory(_) => None,
        }
    }

    /// Returns the fixed backend or builds a fresh one from the factory.
    pub fn resolve(&self) -> Result<BackendHandle> {
        match self {
            Self::Fixed(handle) => Ok(handle.clone()),
            Self::Factory(factory) => {
                trace!("resolving backend from factory");
                let handle = factory()?;
                trace!(backend = handle.name(), kind = ?handle.kind(), "factory resolved backend");
                Ok(handle)
            }
        }
    }
}

impl fmt::Debug for BackendSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Fixed(handle) => f.debug_tuple("Fixed").field(handle).finish(),
            Self::Factory(_) => f.write_str("Factory(..)"),
        }
    }
}

impl From<BackendHandle> for BackendSource {
    fn from(handle: BackendHandle) -> Self {
        Self::Fixed(handle)
    }
}

/// Lets single-flavour backends be passed straight to [`cache`](crate::cache).
macro_rules! impl_backend_conversions {
    ($($backend:ty => $ctor:ident),* $(,)?) => {
        $(
            impl From<$backend> for BackendHandle {
                fn from(backend: $backend) -> Self {
                    Self::$ctor(backend)
                }
            }

            impl From<$backend> for BackendSource {
                fn from(backend: $backend) -> Self {
                    Self::Fixed(BackendHandle::$ctor(backend))
                }
            }
        )*
    };
}

impl_backend_conversions! {
    DiskBackend => blocking,
    AsyncDiskBackend => asynchronous,
}

#[cfg(feature = "redis")]
impl_backend_conversions! {
    RedisBackend => blocking,
    AsyncRedisBackend => asynchronous,
}
