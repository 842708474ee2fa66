use tracing::debug;

use super::{EXPORT_MARKER, LEGACY_EXPORT_MARKER};
use crate::value::{ConfigValue, Scalar};

/// Decides whether a layer's content is mirrored to the remote store.
///
/// An explicit boolean marker in the content wins. Without one, top-level
/// layers are exported and additional files are not.
#[derive(Debug, Clone, Copy)]
pub struct ExportPolicy;

impl ExportPolicy {
    /// Applies the policy to a layer's content.
    pub fn is_eligible(content: &ConfigValue, is_additional: bool) -> bool {
        Self::explicit_marker(content).unwrap_or(!is_additional)
    }

    fn explicit_marker(content: &ConfigValue) -> Option<bool> {
        [EXPORT_MARKER, LEGACY_EXPORT_MARKER]
            .into_iter()
            .find_map(|key| match content.get(key)? {
                ConfigValue::Scalar(Scalar::Bool(flag)) => Some(*flag),
                ConfigValue::Scalar(Scalar::Null) => None,
                other => {
                    debug!(
                        marker = key,
                        found = other.type_str(),
                        "Ignoring non-boolean export marker"
                    );
                    None
                }
            })
    }
}
