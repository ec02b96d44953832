//! Error types for the caching layer
//!
//! Provides unified error handling using thiserror. Only misuse detected while
//! configuring a cache gets a dedicated variant; storage and serialization
//! failures are passed through as they were raised.

use thiserror::Error;

// == Configuration Error ==
/// Misconfiguration detected at decoration time or on the first call.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigurationError {
    /// The decorated function returns `()`, so there is nothing to cache
    #[error("decorated function must declare a return type")]
    MissingReturnType,

    /// The return type has no usable schema
    #[error("function return type {type_name} does not support schema serialization: {reason}")]
    UnsupportedReturnType { type_name: String, reason: String },

    /// An async backend was paired with a blocking function
    #[error("can't use an async cache backend on a synchronous function")]
    AsyncBackendOnSyncFunction,
}

// == Cache Error Enum ==
/// Unified error type for cache operations.
#[derive(Error, Debug)]
pub enum CacheError {
    /// Cache or decorated function is misconfigured
    #[error("Configuration error: {0}")]
    Configuration(#[from] ConfigurationError),

    /// Call arguments do not fit the declared signature
    #[error("Argument binding failed: {0}")]
    Binding(String),

    /// A value could not be converted to or from JSON
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A stored value does not match the declared return type
    #[error("Stored value is not a valid {type_name}: {message}")]
    Validation { type_name: String, message: String },

    /// Disk backend failure
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Redis backend failure
    #[cfg(feature = "redis")]
    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

// == Result Type Alias ==
/// Convenience Result type for cache operations.
pub type Result<T> = std::result::Result<T, CacheError>;
