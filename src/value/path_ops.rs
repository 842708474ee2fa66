use std::fmt;

use super::{ConfigValue, Mapping};
use crate::{ConflabError, Result};

/// An ordered sequence of key segments addressing a node in a tree.
///
/// Parsed from either dotted (`server.port`) or slash separated
/// (`server/port`) strings; both separators split, and empty segments are
/// dropped so leading or trailing separators are harmless.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct KeyPath(Vec<String>);

impl KeyPath {
    /// Parses a dotted or slash separated path.
    pub fn parse(path: &str) -> Self {
        Self(
            path.split(['.', '/'])
                .filter(|segment| !segment.is_empty())
                .map(str::to_owned)
                .collect(),
        )
    }

    /// Builds a path from already split segments.
    pub fn from_segments<I, S>(segments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(segments.into_iter().map(Into::into).collect())
    }

    /// The path segments in order.
    pub fn segments(&self) -> &[String] {
        &self.0
    }

    /// True for the root path.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Returns a new path with `segment` appended.
    pub fn child(&self, segment: &str) -> Self {
        let mut segments = self.0.clone();
        segments.push(segment.to_owned());
        Self(segments)
    }
}

impl fmt::Display for KeyPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0.join("."))
    }
}

impl From<&str> for KeyPath {
    fn from(path: &str) -> Self {
        Self::parse(path)
    }
}

impl ConfigValue {
    /// Navigates the tree following `path`.
    ///
    /// Sequences are addressed by numeric segments.
    ///
    /// # Errors
    /// * `ConflabError::InvalidPath` - If a segment is missing or the path
    ///   descends into a scalar
    pub fn navigate(&self, path: &KeyPath) -> Result<&ConfigValue> {
        let parts = path.segments();
        let mut current = self;

        for (i, part) in parts.iter().enumerate() {
            current = match current {
                ConfigValue::Mapping(map) => map.get(part).ok_or_else(|| {
                    ConflabError::InvalidPath(format!(
                        "Key '{}' not found at path '{}'",
                        part,
                        parts[..i].join(".")
                    ))
                })?,
                ConfigValue::Sequence(items) => {
                    let index = part.parse::<usize>().map_err(|_| {
                        ConflabError::InvalidPath(format!(
                            "Invalid sequence index '{}' at path '{}'",
                            part,
                            parts[..i].join(".")
                        ))
                    })?;

                    items.get(index).ok_or_else(|| {
                        ConflabError::InvalidPath(format!(
                            "Sequence index '{}' out of bounds at path '{}'",
                            index,
                            parts[..i].join(".")
                        ))
                    })?
                }
                ConfigValue::Scalar(_) => {
                    return Err(ConflabError::InvalidPath(format!(
                        "Cannot navigate into {} at path '{}'",
                        current.type_str(),
                        parts[..i].join(".")
                    )));
                }
            };
        }

        Ok(current)
    }

    /// Writes `value` at `path`, creating intermediate mappings as needed.
    ///
    /// A scalar or sequence standing where an intermediate mapping is needed
    /// is replaced by a fresh mapping. Setting the root path replaces the
    /// whole tree.
    pub fn set_at_path(&mut self, path: &KeyPath, value: ConfigValue) {
        let Some((last, parents)) = path.segments().split_last() else {
            *self = value;
            return;
        };

        let mut current = self;
        for segment in parents {
            current = ensure_mapping(current)
                .entry(segment.clone())
                .or_insert_with(ConfigValue::empty);
        }

        ensure_mapping(current).insert(last.clone(), value);
    }

    /// Removes the node at `path`, returning it if it existed.
    ///
    /// Mappings left empty by the removal are kept; only the addressed node
    /// goes away.
    pub fn remove_at_path(&mut self, path: &KeyPath) -> Option<ConfigValue> {
        let (last, parents) = path.segments().split_last()?;

        let mut current = self;
        for segment in parents {
            current = match current {
                ConfigValue::Mapping(map) => map.get_mut(segment)?,
                _ => return None,
            };
        }

        match current {
            ConfigValue::Mapping(map) => map.remove(last),
            _ => None,
        }
    }
}

fn ensure_mapping(value: &mut ConfigValue) -> &mut Mapping {
    if !matches!(value, ConfigValue::Mapping(_)) {
        *value = ConfigValue::empty();
    }

    match value {
        ConfigValue::Mapping(map) => map,
        _ => unreachable!("value was just replaced by a mapping"),
    }
}

/// Checks if a configuration path matches a given pattern
///
/// # Arguments
/// * `path` - The actual configuration path
/// * `pattern` - The pattern to match against (supports "*" as wildcard)
///
/// # Examples
/// * `"server.port"` matches `"server.port"`
/// * `"server.port"` matches `"server.*"`
/// * `"server.port"` matches `"server"`
/// * `"server.port"` matches `"*"`
pub fn path_matches(path: &str, pattern: &str) -> bool {
    const WILDCARD: &str = "*";

    if pattern == WILDCARD {
        return true;
    };

    let path_parts: Vec<&str> = path.split('.').collect();
    let pattern_parts: Vec<&str> = pattern.split('.').collect();

    if pattern_parts.len() > path_parts.len() {
        return false;
    }

    path_parts
        .iter()
        .zip(pattern_parts.iter())
        .all(|(path_part, pattern_part)| *pattern_part == WILDCARD || path_part == pattern_part)
}
