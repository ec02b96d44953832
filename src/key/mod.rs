//! Key Module
//!
//! Derives deterministic cache keys from call arguments: bind the arguments to
//! parameter names, serialize the mapping as canonical JSON (object keys sorted
//! at every depth), and take the hex SHA-256 of the UTF-8 bytes.

mod signature;


use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use sha2::{Digest, Sha256};

use crate::error::Result;

pub use signature::{BoundArguments, Parameter, Signature};

// == Cache Key ==
/// Hex-encoded SHA-256 of a call's bound arguments.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CacheKey(String);

impl CacheKey {
    /// Hashes the canonical form of `value`.
    pub fn from_json(value: &Value) -> Result<Self> {
        let canonical = serde_json::to_string(&canonicalize(value))?;
        let digest = Sha256::digest(canonical.as_bytes());
        Ok(Self(hex::encode(digest)))
    }

    /// Binds `args` against `signature` and hashes the result.
    pub fn derive<A: Serialize + ?Sized>(signature: &Signature, args: &A) -> Result<Self> {
        signature.bind(args)?.cache_key()
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for CacheKey {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for CacheKey {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl AsRef<str> for CacheKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Rebuilds `value` with every object's keys in sorted order.
///
/// `serde_json::Map` keeps insertion order when the `preserve_order` feature is
/// enabled anywhere in the dependency graph, so sorting is done here.
fn canonicalize(value: &Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort();
            let sorted: Map<String, Value> = keys
                .into_iter()
                .map(|key| (key.clone(), canonicalize(&map[key])))
                .collect();
            Value::Object(sorted)
        }
        Value::Array(items) => Value::Array(items.iter().map(canonicalize).collect()),
        other => other.clone(),
    }
}
