//! Cache Entry Module
//!
//! Defines the stored record for a single cache key: the serialized value and
//! the time it was written.

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// == Cache Entry ==
/// A serialized result together with its creation time.
///
/// This is also the on-disk record: `{"timestamp": "<RFC 3339>", "value": "<json>"}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry {
    /// Creation time, serialized as an ISO-8601 string
    pub timestamp: DateTime<Utc>,
    /// The stored value (a JSON document encoded as a string)
    pub value: String,
}

impl CacheEntry {
    // == Constructor ==
    /// Creates a new entry stamped with the current time.
    pub fn new(value: String) -> Self {
        Self {
            timestamp: Utc::now(),
            value,
        }
    }

    // == Age ==
    /// Time elapsed since the entry was written.
    ///
    /// Timestamps in the future (clock skew between writers) count as age zero.
    pub fn age(&self) -> Duration {
        (Utc::now() - self.timestamp)
            .to_std()
            .unwrap_or(Duration::ZERO)
    }

    // == Is Expired ==
    /// An entry expires once its age is strictly greater than `ttl`.
    pub fn is_expired(&self, ttl: Duration) -> bool {
        self.age() > ttl
    }
}
