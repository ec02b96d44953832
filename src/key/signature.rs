//! Signature Module
//!
//! Binds call arguments to parameter names so that the same logical call
//! always produces the same name→value mapping, whatever the call style.

use std::collections::BTreeMap;

use serde::Serialize;
use serde_json::Value;

use crate::error::{CacheError, Result};
use crate::finite::ensure_finite;
use crate::key::CacheKey;

// == Parameter ==
/// A named parameter with an optional default value.
#[derive(Debug, Clone, PartialEq)]
pub struct Parameter {
    pub name: String,
    pub default: Option<Value>,
}

// == Signature ==
/// Ordered parameter list of a decorated function.
///
/// Arguments are supplied as a tuple (bound positionally), a struct or map
/// (bound by name), or `()` for no arguments. A single argument is passed as a
/// one-element tuple: `(x,)`.
///
/// ```
/// use memo_cache::Signature;
/// use serde_json::json;
///
/// let signature = Signature::new()
///     .param("a")
///     .param("b")
///     .param_with_default("c", json!(null));
///
/// let positional = signature.bind(&(3, vec!["1", "2"])).unwrap();
/// let named = signature.bind(&json!({"b": ["1", "2"], "a": 3, "c": null})).unwrap();
/// assert_eq!(positional, named);
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Signature {
    params: Vec<Parameter>,
}

impl Signature {
    /// An empty signature: a function taking no arguments.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a required parameter.
    pub fn param(mut self, name: impl Into<String>) -> Self {
        self.params.push(Parameter {
            name: name.into(),
            default: None,
        });
        self
    }

    /// Appends a parameter that takes `default` when the caller omits it.
    pub fn param_with_default(mut self, name: impl Into<String>, default: Value) -> Self {
        self.params.push(Parameter {
            name: name.into(),
            default: Some(default),
        });
        self
    }

    pub fn params(&self) -> &[Parameter] {
        &self.params
    }

    pub fn len(&self) -> usize {
        self.params.len()
    }

    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }

    // == Bind ==
    /// Maps `args` onto the parameter names, filling in defaults.
    ///
    /// A `NaN` or infinite float anywhere in `args` is a
    /// [`CacheError::Serialization`]; JSON would otherwise collapse it to `null`.
    pub fn bind<A: Serialize + ?Sized>(&self, args: &A) -> Result<BoundArguments> {
        ensure_finite(args)?;
        let supplied = match serde_json::to_value(args)? {
            Value::Null => BTreeMap::new(),
            Value::Array(values) => self.bind_positional(values)?,
            Value::Object(map) => self.bind_named(map.into_iter())?,
            other => {
                return Err(CacheError::Binding(format!(
                    "arguments must be a tuple, a struct or (), got {}",
                    json_kind(&other)
                )))
            }
        };
        self.fill_defaults(supplied)
    }

    fn bind_positional(&self, values: Vec<Value>) -> Result<BTreeMap<String, Value>> {
        if values.len() > self.params.len() {
            return Err(CacheError::Binding(format!(
                "takes {} positional arguments but {} were given",
                self.params.len(),
                values.len()
            )));
        }
        Ok(self
            .params
            .iter()
            .zip(values)
            .map(|(param, value)| (param.name.clone(), value))
            .collect())
    }

    fn bind_named(
        &self,
        entries: impl Iterator<Item = (String, Value)>,
    ) -> Result<BTreeMap<String, Value>> {
        let mut bound = BTreeMap::new();
        for (name, value) in entries {
            if !self.params.iter().any(|param| param.name == name) {
                return Err(CacheError::Binding(format!(
                    "got an unexpected argument `{name}`"
                )));
            }
            bound.insert(name, value);
        }
        Ok(bound)
    }

    fn fill_defaults(&self, mut bound: BTreeMap<String, Value>) -> Result<BoundArguments> {
        for param in &self.params {
            if bound.contains_key(&param.name) {
                continue;
            }
            match &param.default {
                Some(default) => {
                    bound.insert(param.name.clone(), default.clone());
                }
                None => {
                    return Err(CacheError::Binding(format!(
                        "missing required argument `{}`",
                        param.name
                    )))
                }
            }
        }
        Ok(BoundArguments(bound))
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

// == Bound Arguments ==
/// Parameter name → JSON value for one call.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BoundArguments(BTreeMap<String, Value>);

impl BoundArguments {
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.0.get(name)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Derives the cache key for this mapping.
    pub fn cache_key(&self) -> Result<CacheKey> {
        let mapping = self
            .0
            .iter()
            .map(|(name, value)| (name.clone(), value.clone()))
            .collect::<serde_json::Map<String, Value>>();
        CacheKey::from_json(&Value::Object(mapping))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Serialize;
    use serde_json::json;

    fn abc() -> Signature {
        Signature::new()
            .param("a")
            .param("b")
            .param_with_default("c", json!(null))
    }

    #[derive(Serialize)]
    struct Args {
        a: i64,
        b: Vec<String>,
    }

    #[test]
    fn test_positional_binding() {
        let bound = abc().bind(&(3, vec!["1"], json!({"foo": "bar"}))).unwrap();

        assert_eq!(bound.get("a"), Some(&json!(3)));
        assert_eq!(bound.get("b"), Some(&json!(["1"])));
        assert_eq!(bound.get("c"), Some(&json!({"foo": "bar"})));
    }

    #[test]
    fn test_default_applied() {
        let bound = abc().bind(&(3, vec!["1"])).unwrap();
        assert_eq!(bound.get("c"), Some(&Value::Null));
    }

    #[test]
    fn test_struct_binding_matches_tuple() {
        let by_struct = abc()
            .bind(&Args {
                a: 3,
                b: vec!["1".to_string()],
            })
            .unwrap();
        let by_tuple = abc().bind(&(3, vec!["1"], Value::Null)).unwrap();

        assert_eq!(by_struct, by_tuple);
    }

    #[test]
    fn test_unit_binds_nothing() {
        let bound = Signature::new().bind(&()).unwrap();
        assert!(bound.is_empty());
    }

    #[test]
    fn test_too_many_positional() {
        let err = Signature::new().param("a").bind(&(1, 2)).unwrap_err();
        assert!(matches!(err, CacheError::Binding(ref msg) if msg.contains("1 positional")));
    }

    #[test]
    fn test_missing_required() {
        let err = abc().bind(&(1,)).unwrap_err();
        assert!(matches!(err, CacheError::Binding(ref msg) if msg.contains("`b`")));
    }

    #[test]
    fn test_unexpected_name() {
        let err = abc().bind(&json!({"a": 1, "b": [], "z": 0})).unwrap_err();
        assert!(matches!(err, CacheError::Binding(ref msg) if msg.contains("`z`")));
    }

    #[test]
    fn test_scalar_rejected() {
        let err = Signature::new().param("a").bind(&5).unwrap_err();
        assert!(matches!(err, CacheError::Binding(ref msg) if msg.contains("a number")));
    }

    #[test]
    fn test_non_finite_argument_rejected() {
        let signature = Signature::new().param("x");

        for x in [f64::NAN, f64::INFINITY, f64::NEG_INFINITY] {
            let err = signature.bind(&(x,)).unwrap_err();
            assert!(matches!(err, CacheError::Serialization(_)), "{x}");
        }
        assert!(signature.bind(&(None::<f64>,)).is_ok());
    }

    #[test]
    fn test_nan_does_not_alias_none() {
        let signature = Signature::new().param("x");

        let none = signature.bind(&(None::<f64>,)).unwrap().cache_key().unwrap();
        let finite = signature.bind(&(1.5_f64,)).unwrap().cache_key().unwrap();
        assert_ne!(none, finite);
        assert!(signature.bind(&(Some(f64::NAN),)).is_err());
    }
}
