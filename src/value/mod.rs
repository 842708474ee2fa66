//! Tagged configuration tree.
//!
//! Every layer, the merged view and the remote snapshot are expressed as a
//! [`ConfigValue`]. Merge and path operations match on the variant instead of
//! probing untyped data, so every case is handled explicitly.

mod path_ops;

#[cfg(test)]
mod tests;

use std::{collections::BTreeMap, fmt};

use serde::{Deserialize, Serialize};
use serde_json::{Number, Value};

pub use path_ops::{KeyPath, path_matches};

/// Keyed children of a [`ConfigValue::Mapping`].
pub type Mapping = BTreeMap<String, ConfigValue>;

/// A node of a configuration tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ConfigValue {
    /// Keyed children; key order carries no meaning.
    Mapping(Mapping),
    /// Ordered children; always replaced wholesale when merged.
    Sequence(Vec<ConfigValue>),
    /// A leaf value.
    Scalar(Scalar),
}

/// Leaf values of a configuration tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Scalar {
    /// JSON `null`
    Null,
    /// Boolean
    Bool(bool),
    /// Integer or float, kept exactly as parsed
    Number(Number),
    /// String
    String(String),
}

impl ConfigValue {
    /// An empty mapping.
    pub fn empty() -> Self {
        ConfigValue::Mapping(Mapping::new())
    }

    /// Shorthand for a string scalar.
    pub fn string(value: impl Into<String>) -> Self {
        ConfigValue::Scalar(Scalar::String(value.into()))
    }

    /// Returns the mapping if this is one.
    pub fn as_mapping(&self) -> Option<&Mapping> {
        match self {
            ConfigValue::Mapping(map) => Some(map),
            _ => None,
        }
    }

    /// Returns the string if this is a string scalar.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            ConfigValue::Scalar(Scalar::String(s)) => Some(s),
            _ => None,
        }
    }

    /// Returns the boolean if this is a boolean scalar.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            ConfigValue::Scalar(Scalar::Bool(b)) => Some(*b),
            _ => None,
        }
    }

    /// Returns the number as `i64` if it is an integral number scalar.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            ConfigValue::Scalar(Scalar::Number(n)) => n.as_i64(),
            _ => None,
        }
    }

    /// True for a `null` scalar.
    pub fn is_null(&self) -> bool {
        matches!(self, ConfigValue::Scalar(Scalar::Null))
    }

    /// Looks up a direct child of a mapping.
    pub fn get(&self, key: &str) -> Option<&ConfigValue> {
        self.as_mapping().and_then(|map| map.get(key))
    }

    /// Type name used in error messages.
    pub fn type_str(&self) -> &'static str {
        match self {
            ConfigValue::Mapping(_) => "mapping",
            ConfigValue::Sequence(_) => "sequence",
            ConfigValue::Scalar(Scalar::Null) => "null",
            ConfigValue::Scalar(Scalar::Bool(_)) => "boolean",
            ConfigValue::Scalar(Scalar::Number(_)) => "number",
            ConfigValue::Scalar(Scalar::String(_)) => "string",
        }
    }

    /// Serializes the tree as compact JSON.
    pub fn to_json_string(&self) -> String {
        Value::from(self.clone()).to_string()
    }
}

impl Default for ConfigValue {
    fn default() -> Self {
        Self::empty()
    }
}

impl fmt::Display for ConfigValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigValue::Scalar(Scalar::String(s)) => f.write_str(s),
            other => f.write_str(&other.to_json_string()),
        }
    }
}

impl From<Value> for ConfigValue {
    fn from(value: Value) -> Self {
        match value {
            Value::Object(map) => ConfigValue::Mapping(
                map.into_iter()
                    .map(|(key, value)| (key, ConfigValue::from(value)))
                    .collect(),
            ),
            Value::Array(items) => {
                ConfigValue::Sequence(items.into_iter().map(ConfigValue::from).collect())
            }
            Value::Null => ConfigValue::Scalar(Scalar::Null),
            Value::Bool(b) => ConfigValue::Scalar(Scalar::Bool(b)),
            Value::Number(n) => ConfigValue::Scalar(Scalar::Number(n)),
            Value::String(s) => ConfigValue::Scalar(Scalar::String(s)),
        }
    }
}

impl From<ConfigValue> for Value {
    fn from(value: ConfigValue) -> Self {
        match value {
            ConfigValue::Mapping(map) => Value::Object(
                map.into_iter()
                    .map(|(key, value)| (key, Value::from(value)))
                    .collect(),
            ),
            ConfigValue::Sequence(items) => {
                Value::Array(items.into_iter().map(Value::from).collect())
            }
            ConfigValue::Scalar(scalar) => Value::from(scalar),
        }
    }
}

impl From<Scalar> for Value {
    fn from(scalar: Scalar) -> Self {
        match scalar {
            Scalar::Null => Value::Null,
            Scalar::Bool(b) => Value::Bool(b),
            Scalar::Number(n) => Value::Number(n),
            Scalar::String(s) => Value::String(s),
        }
    }
}

impl From<Scalar> for ConfigValue {
    fn from(scalar: Scalar) -> Self {
        ConfigValue::Scalar(scalar)
    }
}

impl From<Mapping> for ConfigValue {
    fn from(map: Mapping) -> Self {
        ConfigValue::Mapping(map)
    }
}

impl From<&str> for ConfigValue {
    fn from(value: &str) -> Self {
        ConfigValue::string(value)
    }
}

impl From<bool> for ConfigValue {
    fn from(value: bool) -> Self {
        ConfigValue::Scalar(Scalar::Bool(value))
    }
}

impl From<i64> for ConfigValue {
    fn from(value: i64) -> Self {
        ConfigValue::Scalar(Scalar::Number(Number::from(value)))
    }
}
