use std::{collections::BTreeSet, time::Instant};

use serde::de::DeserializeOwned;

use crate::{ConflabError, Result, value::ConfigValue};

/// A field-level change between two published views.
#[derive(Debug, Clone, PartialEq)]
pub struct ConfigChange {
    /// Dotted path of the changed field, e.g. `db.host`.
    pub path: String,
    /// Value before the change; `None` when the field was added.
    pub old_value: Option<ConfigValue>,
    /// Value after the change; `None` when the field was removed.
    pub new_value: Option<ConfigValue>,
    /// When the change was published.
    pub timestamp: Instant,
}

impl ConfigChange {
    /// Deserializes the new value.
    ///
    /// # Errors
    /// * `ConflabError::Conversion` - If the field was removed or has another shape
    pub fn extract<T>(&self) -> Result<T>
    where
        T: DeserializeOwned,
    {
        let conversion = |details: String| ConflabError::Conversion {
            path: self.path.clone(),
            expected: std::any::type_name::<T>(),
            details,
        };

        let value = self
            .new_value
            .clone()
            .ok_or_else(|| conversion("field was removed".to_string()))?;

        serde_json::from_value(serde_json::Value::from(value)).map_err(|e| conversion(e.to_string()))
    }

    /// The new value if it is a string.
    pub fn as_string(&self) -> Option<String> {
        self.new_value
            .as_ref()
            .and_then(ConfigValue::as_str)
            .map(str::to_owned)
    }
}

/// Lists the leaf-level differences between `old` and `new`.
///
/// Mappings are compared key by key; any other differing node is reported
/// once at its own path.
pub fn diff_values(old: &ConfigValue, new: &ConfigValue) -> Vec<ConfigChange> {
    let mut changes = Vec::new();
    diff_at("", old, new, Instant::now(), &mut changes);
    changes
}

fn diff_at(
    path: &str,
    old: &ConfigValue,
    new: &ConfigValue,
    timestamp: Instant,
    changes: &mut Vec<ConfigChange>,
) {
    match (old, new) {
        (ConfigValue::Mapping(old_map), ConfigValue::Mapping(new_map)) => {
            let keys: BTreeSet<&String> = old_map.keys().chain(new_map.keys()).collect();

            for key in keys {
                let field_path = if path.is_empty() {
                    key.clone()
                } else {
                    format!("{path}.{key}")
                };

                match (old_map.get(key), new_map.get(key)) {
                    (Some(old_value), Some(new_value)) => {
                        diff_at(&field_path, old_value, new_value, timestamp, changes);
                    }
                    (old_value, new_value) => changes.push(ConfigChange {
                        path: field_path,
                        old_value: old_value.cloned(),
                        new_value: new_value.cloned(),
                        timestamp,
                    }),
                }
            }
        }
        _ => {
            if old != new {
                changes.push(ConfigChange {
                    path: path.to_string(),
                    old_value: Some(old.clone()),
                    new_value: Some(new.clone()),
                    timestamp,
                });
            }
        }
    }
}
