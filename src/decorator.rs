//! Cache Decorator
//!
//! Wraps a function so that its results are memoized in a backend.
//!
//! Each call resolves the backend, derives the key from the bound arguments,
//! and reads the backend. A hit is decoded and returned without running the
//! function. A miss runs the function, writes the encoded result, and returns
//! the freshly computed value as is.
//!
//! Blocking functions ([`Cache::decorate`]) only accept blocking backends.
//! Async functions ([`Cache::decorate_async`]) accept both kinds; blocking
//! backends are called inline.

use std::future::Future;
use std::marker::PhantomData;
use std::path::PathBuf;
use std::time::Duration;

use schemars::JsonSchema;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, trace};

use crate::backend::{BackendHandle, BackendKind, BackendSource, DiskBackend};
use crate::codec::ResultCodec;
use crate::config::Config;
use crate::error::{ConfigurationError, Result};
use crate::key::{CacheKey, Signature};

// == Entry Points ==
/// Builds a cache over a backend, a [`BackendHandle`], or a [`BackendSource`].
///
/// ```
/// use memo_cache::{cache, BackendHandle, MemoryBackend, Signature};
/// use std::time::Duration;
///
/// let memo = cache(BackendHandle::blocking(MemoryBackend::new(Duration::from_secs(60))));
/// let double = memo
///     .decorate(Signature::new().param("value"), |(value,): (i64,)| value * 2)
///     .unwrap();
///
/// assert_eq!(double.call((21,)).unwrap(), 42);
/// assert_eq!(double.call((21,)).unwrap(), 42);
/// ```
pub fn cache(backend: impl Into<BackendSource>) -> Cache {
    Cache::new(backend)
}

/// Builds a cache storing one JSON file per key under `directory`.
pub fn disk_cache(directory: impl Into<PathBuf>, ttl: Duration) -> Cache {
    Cache::new(DiskBackend::new(directory, ttl))
}

#[cfg(feature = "redis")]
fn network_source(config: &Config) -> Result<Option<BackendSource>> {
    config
        .redis_url
        .as_deref()
        .map(|url| crate::backend::RedisBackend::open(url, config.ttl()).map(BackendSource::from))
        .transpose()
}

#[cfg(not(feature = "redis"))]
fn network_source(config: &Config) -> Result<Option<BackendSource>> {
    if config.redis_url.is_some() {
        tracing::warn!("redis url configured but the `redis` feature is disabled, using disk");
    }
    Ok(None)
}

// == Cache ==
/// A backend source ready to decorate functions.
#[derive(Debug, Clone)]
pub struct Cache {
    source: BackendSource,
}

impl Cache {
    pub fn new(source: impl Into<BackendSource>) -> Self {
        Self {
            source: source.into(),
        }
    }

    /// Redis when a URL is configured (and the `redis` feature is on), disk otherwise.
    pub fn from_config(config: &Config) -> Result<Self> {
        if let Some(source) = network_source(config)? {
            return Ok(Self::new(source));
        }
        Ok(disk_cache(config.cache_dir.clone(), config.ttl()))
    }

    pub fn source(&self) -> &BackendSource {
        &self.source
    }

    // == Decorate ==
    /// Wraps a blocking function.
    ///
    /// # Errors
    /// - the return type cannot be cached (see [`ResultCodec::new`])
    /// - the backend is a fixed async backend; with a factory this check is
    ///   deferred to the first call
    pub fn decorate<A, R, F>(&self, signature: Signature, function: F) -> Result<CachedFn<A, R, F>>
    where
        A: Serialize,
        R: Serialize + DeserializeOwned + JsonSchema,
        F: Fn(A) -> R,
    {
        if self.source.known_kind() == Some(BackendKind::Async) {
            return Err(ConfigurationError::AsyncBackendOnSyncFunction.into());
        }
        let codec = ResultCodec::new()?;
        debug!(
            function = std::any::type_name::<F>(),
            params = signature.len(),
            "decorated blocking function"
        );
        Ok(CachedFn {
            source: self.source.clone(),
            signature,
            codec,
            function,
            _args: PhantomData,
        })
    }

    /// Wraps an async function. Both backend kinds are accepted.
    pub fn decorate_async<A, R, F, Fut>(
        &self,
        signature: Signature,
        function: F,
    ) -> Result<CachedAsyncFn<A, R, F>>
    where
        A: Serialize,
        R: Serialize + DeserializeOwned + JsonSchema,
        F: Fn(A) -> Fut,
        Fut: Future<Output = R>,
    {
        let codec = ResultCodec::new()?;
        debug!(
            function = std::any::type_name::<F>(),
            params = signature.len(),
            "decorated async function"
        );
        Ok(CachedAsyncFn {
            source: self.source.clone(),
            signature,
            codec,
            function,
            _args: PhantomData,
        })
    }
}

// == Cached Blocking Function ==
/// A blocking function with memoized results.
pub struct CachedFn<A, R, F> {
    source: BackendSource,
    signature: Signature,
    codec: ResultCodec<R>,
    function: F,
    _args: PhantomData<fn(A)>,
}

impl<A, R, F> CachedFn<A, R, F>
where
    A: Serialize,
    R: Serialize + DeserializeOwned + JsonSchema,
    F: Fn(A) -> R,
{
    /// Returns the cached result for `args`, computing and storing it on a miss.
    pub fn call(&self, args: A) -> Result<R> {
        let backend = match self.source.resolve()? {
            BackendHandle::Blocking(backend) => backend,
            BackendHandle::Async(_) => {
                return Err(ConfigurationError::AsyncBackendOnSyncFunction.into())
            }
        };
        let key = CacheKey::derive(&self.signature, &args)?;
        trace!(key = %key, backend = backend.name(), "derived cache key");

        if let Some(raw) = backend.get(&key)? {
            debug!(key = %key, "cache hit");
            return self.codec.decode(&raw);
        }

        debug!(key = %key, "cache miss");
        let result = (self.function)(args);
        backend.write(&key, &self.codec.encode(&result)?)?;
        Ok(result)
    }

    /// The key a call with `args` would use.
    pub fn cache_key(&self, args: &A) -> Result<CacheKey> {
        CacheKey::derive(&self.signature, args)
    }

    pub fn signature(&self) -> &Signature {
        &self.signature
    }
}

// == Cached Async Function ==
/// An async function with memoized results.
pub struct CachedAsyncFn<A, R, F> {
    source: BackendSource,
    signature: Signature,
    codec: ResultCodec<R>,
    function: F,
    _args: PhantomData<fn(A)>,
}

impl<A, R, F, Fut> CachedAsyncFn<A, R, F>
where
    A: Serialize,
    R: Serialize + DeserializeOwned + JsonSchema,
    F: Fn(A) -> Fut,
    Fut: Future<Output = R>,
{
    /// Returns the cached result for `args`, computing and storing it on a miss.
    ///
    /// Suspends at the backend read, the function call and the backend write,
    /// in that order.
    pub async fn call(&self, args: A) -> Result<R> {
        let backend = self.source.resolve()?;
        let key = CacheKey::derive(&self.signature, &args)?;
        trace!(key = %key, backend = backend.name(), "derived cache key");

        let stored = match &backend {
            BackendHandle::Blocking(backend) => backend.get(&key)?,
            BackendHandle::Async(backend) => backend.get(&key).await?,
        };
        if let Some(raw) = stored {
            debug!(key = %key, "cache hit");
            return self.codec.decode(&raw);
        }

        debug!(key = %key, "cache miss");
        let result = (self.function)(args).await;
        let encoded = self.codec.encode(&result)?;
        match &backend {
            BackendHandle::Blocking(backend) => backend.write(&key, &encoded)?,
            BackendHandle::Async(backend) => backend.write(&key, &encoded).await?,
        }
        Ok(result)
    }

    pub fn cache_key(&self, args: &A) -> Result<CacheKey> {
        CacheKey::derive(&self.signature, args)
    }

    pub fn signature(&self) -> &Signature {
        &self.signature
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{AsyncDiskBackend, MemoryBackend};
    use crate::error::CacheError;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn memory_cache() -> (Cache, Arc<MemoryBackend>) {
        let backend = Arc::new(MemoryBackend::new(Duration::from_secs(60)));
        let handle = BackendHandle::Blocking(backend.clone());
        (cache(handle), backend)
    }

    #[test]
    fn test_miss_then_hit() {
        let (memo, backend) = memory_cache();
        let calls = AtomicUsize::new(0);
        let square = memo
            .decorate(Signature::new().param("n"), |(n,): (u32,)| {
                calls.fetch_add(1, Ordering::SeqCst);
                n * n
            })
            .unwrap();

        assert_eq!(square.call((4,)).unwrap(), 16);
        assert_eq!(square.call((4,)).unwrap(), 16);
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        let stats = backend.stats().unwrap();
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.writes, 1);
    }

    #[test]
    fn test_stored_value_is_encoded_result() {
        let (memo, backend) = memory_cache();
        let chars = memo
            .decorate(Signature::new().param("value"), |(value,): (String,)| {
                value.chars().map(String::from).collect::<Vec<_>>()
            })
            .unwrap();

        chars.call(("foo".to_string(),)).unwrap();

        let key = chars.cache_key(&("foo".to_string(),)).unwrap();
        assert_eq!(
            backend.lookup(&key).unwrap().as_deref(),
            Some(r#"["f","o","o"]"#)
        );
    }

    #[test]
    fn test_unit_return_rejected_at_decoration() {
        let (memo, _) = memory_cache();
        let err = memo
            .decorate(Signature::new(), |(): ()| ())
            .err()
            .unwrap();
        assert!(matches!(
            err,
            CacheError::Configuration(ConfigurationError::MissingReturnType)
        ));
    }

    #[test]
    fn test_fixed_async_backend_rejected_at_decoration() {
        let memo = cache(AsyncDiskBackend::new("/tmp", Duration::from_secs(60)));
        let err = memo
            .decorate(Signature::new(), |(): ()| 1_u8)
            .err()
            .unwrap();
        assert!(matches!(
            err,
            CacheError::Configuration(ConfigurationError::AsyncBackendOnSyncFunction)
        ));
    }

    #[test]
    fn test_factory_async_backend_rejected_on_call() {
        let memo = cache(BackendSource::factory(|| {
            Ok(BackendHandle::asynchronous(MemoryBackend::new(
                Duration::from_secs(60),
            )))
        }));
        let calls = AtomicUsize::new(0);
        let one = memo
            .decorate(Signature::new(), |(): ()| {
                calls.fetch_add(1, Ordering::SeqCst);
                1_u8
            })
            .unwrap();

        let err = one.call(()).unwrap_err();
        assert!(matches!(
            err,
            CacheError::Configuration(ConfigurationError::AsyncBackendOnSyncFunction)
        ));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_binding_error_skips_function() {
        let (memo, _) = memory_cache();
        let calls = AtomicUsize::new(0);
        let add = memo
            .decorate(Signature::new().param("a").param("b"), |(a, b): (i32, i32)| {
                calls.fetch_add(1, Ordering::SeqCst);
                a + b
            })
            .unwrap();

        let short = memo
            .decorate(Signature::new().param("a"), |(a, b): (i32, i32)| a + b)
            .unwrap();

        assert!(matches!(short.call((1, 2)), Err(CacheError::Binding(_))));
        assert_eq!(add.call((1, 2)).unwrap(), 3);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_async_function_with_blocking_backend() {
        let (memo, _) = memory_cache();
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let double = memo
            .decorate_async(Signature::new().param("n"), move |(n,): (i64,)| {
                let counter = counter.clone();
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    n * 2
                }
            })
            .unwrap();

        tokio_test::block_on(async {
            assert_eq!(double.call((5,)).await.unwrap(), 10);
            assert_eq!(double.call((5,)).await.unwrap(), 10);
        });
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_async_function_with_async_backend() {
        let backend = Arc::new(MemoryBackend::new(Duration::from_secs(60)));
        let memo = cache(BackendHandle::Async(backend.clone()));
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let greet = memo
            .decorate_async(Signature::new().param("name"), move |(name,): (String,)| {
                let counter = counter.clone();
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    format!("hello {name}")
                }
            })
            .unwrap();

        tokio_test::block_on(async {
            assert_eq!(greet.call(("ada".into(),)).await.unwrap(), "hello ada");
            assert_eq!(greet.call(("ada".into(),)).await.unwrap(), "hello ada");
            assert_eq!(greet.call(("bob".into(),)).await.unwrap(), "hello bob");
        });
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(backend.stats().unwrap().writes, 2);
    }

    #[test]
    fn test_from_config_uses_disk_without_redis() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config {
            cache_dir: dir.path().to_path_buf(),
            default_ttl: 60,
            redis_url: None,
        };

        let memo = Cache::from_config(&config).unwrap();
        assert_eq!(memo.source().known_kind(), Some(BackendKind::Blocking));

        let len = memo
            .decorate(Signature::new().param("s"), |(s,): (String,)| s.len())
            .unwrap();
        assert_eq!(len.call(("abc".into(),)).unwrap(), 3);
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);
    }
}
