//! Result Codec
//!
//! Converts a decorated function's return value to the string stored in a
//! backend and back. The return type's JSON Schema is derived with `schemars`
//! and compiled once with `jsonschema`; stored values are validated against it
//! before deserialization.

use std::any::type_name;
use std::fmt;
use std::marker::PhantomData;

use jsonschema::{Draft, JSONSchema};
use schemars::schema::{InstanceType, SingleOrVec};
use schemars::{schema_for, JsonSchema};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use crate::error::{CacheError, ConfigurationError, Result};
use crate::finite::ensure_finite;

// == Result Codec ==
/// Schema-checked serializer for values of type `R`.
pub struct ResultCodec<R> {
    validator: JSONSchema,
    _marker: PhantomData<fn() -> R>,
}

impl<R> ResultCodec<R>
where
    R: Serialize + DeserializeOwned + JsonSchema,
{
    /// Builds the codec, failing if `R` cannot be cached.
    ///
    /// # Errors
    /// - [`ConfigurationError::MissingReturnType`] when `R` is `()`
    /// - [`ConfigurationError::UnsupportedReturnType`] when any other type's
    ///   schema only admits `null` (a unit struct, say), or when the derived
    ///   schema does not compile
    pub fn new() -> Result<Self> {
        let root = schema_for!(R);
        if root.schema.instance_type == Some(SingleOrVec::Single(Box::new(InstanceType::Null))) {
            if type_name::<R>() == type_name::<()>() {
                return Err(ConfigurationError::MissingReturnType.into());
            }
            return Err(ConfigurationError::UnsupportedReturnType {
                type_name: type_name::<R>().to_string(),
                reason: "schema only admits null, nothing to cache".to_string(),
            }
            .into());
        }

        let schema = serde_json::to_value(&root)?;
        let validator = JSONSchema::options()
            .with_draft(Draft::Draft7)
            .compile(&schema)
            .map_err(|e| ConfigurationError::UnsupportedReturnType {
                type_name: type_name::<R>().to_string(),
                reason: e.to_string(),
            })?;

        Ok(Self {
            validator,
            _marker: PhantomData,
        })
    }

    pub fn type_name(&self) -> &'static str {
        type_name::<R>()
    }

    // == Encode ==
    /// Serializes `value` to a JSON string.
    ///
    /// Fails with [`CacheError::Serialization`] if `value` holds a `NaN` or
    /// infinite float, which JSON cannot carry.
    pub fn encode(&self, value: &R) -> Result<String> {
        ensure_finite(value)?;
        Ok(serde_json::to_string(value)?)
    }

    // == Decode ==
    /// Parses and validates a stored string back into `R`.
    pub fn decode(&self, raw: &str) -> Result<R> {
        let value: Value = serde_json::from_str(raw)?;
        self.validate(&value)?;
        Ok(serde_json::from_value(value)?)
    }

    fn validate(&self, value: &Value) -> Result<()> {
        let failures = match self.validator.validate(value) {
            Ok(()) => return Ok(()),
            Err(errors) => errors
                .map(|error| format!("{} at '{}'", error, error.instance_path))
                .collect::<Vec<_>>(),
        };
        Err(CacheError::Validation {
            type_name: type_name::<R>().to_string(),
            message: failures.join("; "),
        })
    }
}

impl<R> fmt::Debug for ResultCodec<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResultCodec")
            .field("type", &type_name::<R>())
            .finish()
    }
}
