//! Deterministic deep merge of configuration trees.

#[cfg(test)]
mod tests;

use crate::{sources::SourceLayer, value::ConfigValue};

/// Folds layers lowest to highest precedence into a single tree.
///
/// Zero layers give an empty mapping.
pub fn merge_layers(layers: &[SourceLayer]) -> ConfigValue {
    merge_all(layers.iter().map(|layer| &layer.content))
}

/// Folds trees lowest to highest precedence into a single tree.
pub fn merge_all<'a>(values: impl IntoIterator<Item = &'a ConfigValue>) -> ConfigValue {
    values
        .into_iter()
        .fold(ConfigValue::empty(), |accumulated, value| {
            merge(&accumulated, value)
        })
}

/// Deep merges `overlay` on top of `base`.
///
/// Two mappings merge key by key. Anything else is replaced wholesale by the
/// overlay, so sequences are never concatenated. A `null` overlay never
/// clobbers an existing base value. Neither operand is modified.
pub fn merge(base: &ConfigValue, overlay: &ConfigValue) -> ConfigValue {
    match (base, overlay) {
        (ConfigValue::Mapping(base_map), ConfigValue::Mapping(overlay_map)) => {
            let mut merged = base_map.clone();

            for (key, overlay_value) in overlay_map {
                let merged_value = match merged.get(key) {
                    Some(base_value) => merge(base_value, overlay_value),
                    None => overlay_value.clone(),
                };
                merged.insert(key.clone(), merged_value);
            }

            ConfigValue::Mapping(merged)
        }
        (base, overlay) if overlay.is_null() => base.clone(),
        (_, overlay) => overlay.clone(),
    }
}
