//! Source layers and the loaders that produce them.
//!
//! Inline objects, candidate files (with their additional includes) and
//! command-line arguments each become a named [`SourceLayer`]. The order of
//! the returned layers is the merge precedence, lowest first.

mod additional;
pub mod argv;
mod export;
mod loader;
mod paths;
mod reader;
mod service;

#[cfg(test)]
mod tests;

use std::path::PathBuf;

pub use additional::AdditionalFileResolver;
pub use export::ExportPolicy;
pub use loader::SourceLoader;
pub use paths::{ConfigPaths, FileCandidate};
pub use reader::{FsReader, SourceReader, parse_document};
pub use service::discover_service_name;

use crate::value::ConfigValue;

/// Marker key naming files to include after the declaring file.
pub const ADDITIONAL_FILES_MARKER: &str = "CF_additionalFiles";

/// Marker key controlling whether a file is mirrored to the remote store.
pub const EXPORT_MARKER: &str = "CF_export";

/// Older spelling of [`EXPORT_MARKER`], still honoured.
pub const LEGACY_EXPORT_MARKER: &str = "CF_exportToEtcd";

/// One named contributor to the merged configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct SourceLayer {
    /// Layer name, also used as the mirror key under `files/<env>/`.
    pub name: String,
    /// Parsed content exactly as loaded.
    pub content: ConfigValue,
    /// True when the layer was pulled in through another file's include list.
    pub is_additional: bool,
    /// Whether the content is mirrored to the remote store.
    pub export_eligible: bool,
    /// File the layer was read from, if any.
    pub origin: Option<PathBuf>,
}

impl SourceLayer {
    /// Creates a non-file layer, applying the export policy to `content`.
    pub fn new(name: impl Into<String>, content: ConfigValue) -> Self {
        let export_eligible = ExportPolicy::is_eligible(&content, false);

        Self {
            name: name.into(),
            content,
            is_additional: false,
            export_eligible,
            origin: None,
        }
    }

    /// Creates a layer read from `origin`.
    pub fn from_file(
        name: impl Into<String>,
        content: ConfigValue,
        origin: PathBuf,
        is_additional: bool,
    ) -> Self {
        let export_eligible = ExportPolicy::is_eligible(&content, is_additional);

        Self {
            name: name.into(),
            content,
            is_additional,
            export_eligible,
            origin: Some(origin),
        }
    }
}
