use std::path::{Path, PathBuf};

use futures::future::BoxFuture;
use tracing::debug;

use super::{
    ADDITIONAL_FILES_MARKER, FileCandidate, SourceLayer,
    reader::{SourceReader, read_document},
};
use crate::{
    ConflabError, Result,
    value::{ConfigValue, Scalar},
};

/// Loads a candidate file and, recursively, the files it includes.
///
/// Includes are listed under [`ADDITIONAL_FILES_MARKER`] as a string or a
/// list of strings. Each include becomes its own layer placed right after
/// the file that declared it, depth first, in declaration order, so a later
/// sibling overrides an earlier one.
pub struct AdditionalFileResolver<'a> {
    reader: &'a dyn SourceReader,
    detector: CircularDetector,
}

impl<'a> AdditionalFileResolver<'a> {
    /// Creates a resolver reading through `reader`.
    pub fn new(reader: &'a dyn SourceReader) -> Self {
        Self {
            reader,
            detector: CircularDetector::new(),
        }
    }

    /// Loads `candidate` and its includes as layers.
    ///
    /// A missing candidate yields no layers.
    ///
    /// # Errors
    /// * `ConflabError::Parse` - If any file in the tree is malformed
    /// * `ConflabError::Io` - If an existing file cannot be read
    /// * `ConflabError::CircularInclude` - If includes form a cycle
    pub async fn resolve(&mut self, candidate: &FileCandidate) -> Result<Vec<SourceLayer>> {
        let mut layers = Vec::new();
        self.load_file(
            candidate.name.clone(),
            candidate.path.clone(),
            false,
            &mut layers,
        )
        .await?;
        Ok(layers)
    }

    fn load_file<'s>(
        &'s mut self,
        name: String,
        path: PathBuf,
        is_additional: bool,
        layers: &'s mut Vec<SourceLayer>,
    ) -> BoxFuture<'s, Result<()>> {
        Box::pin(async move {
            let Some(content) = read_document(self.reader, &path).await? else {
                debug!(layer = %name, path = %path.display(), "Skipping missing file");
                return Ok(());
            };

            let chain_key = tokio::fs::canonicalize(&path)
                .await
                .unwrap_or_else(|_| path.clone());
            self.detector.detect_circular_include(&chain_key)?;

            let includes = declared_includes(&content);
            debug!(layer = %name, path = %path.display(), includes = includes.len(), "Loaded file");
            layers.push(SourceLayer::from_file(
                name.clone(),
                content,
                path.clone(),
                is_additional,
            ));

            if includes.is_empty() {
                return Ok(());
            }

            self.detector.push_to_chain(&chain_key);
            for include in includes {
                let include_path = resolve_include(&path, &include);
                let include_name = format!("{}-{}", name, file_stem(&include_path));

                let result = self
                    .load_file(include_name, include_path, true, layers)
                    .await;
                if result.is_err() {
                    self.detector.pop_from_chain();
                    return result;
                }
            }
            self.detector.pop_from_chain();

            Ok(())
        })
    }
}

/// Reads the include list from a file's content.
fn declared_includes(content: &ConfigValue) -> Vec<String> {
    match content.get(ADDITIONAL_FILES_MARKER) {
        Some(ConfigValue::Scalar(Scalar::String(single))) => vec![single.clone()],
        Some(ConfigValue::Sequence(items)) => items
            .iter()
            .filter_map(ConfigValue::as_str)
            .map(str::to_owned)
            .collect(),
        _ => Vec::new(),
    }
}

/// Relative includes resolve against the declaring file's directory.
fn resolve_include(declaring_file: &Path, include: &str) -> PathBuf {
    let include = Path::new(include);
    if include.is_absolute() {
        return include.to_path_buf();
    }

    declaring_file
        .parent()
        .map(|dir| dir.join(include))
        .unwrap_or_else(|| include.to_path_buf())
}

fn file_stem(path: &Path) -> String {
    path.file_stem()
        .unwrap_or(path.as_os_str())
        .to_string_lossy()
        .into_owned()
}

/// Tracks include chains for circular detection
struct CircularDetector {
    /// Current include chain
    include_chain: Vec<PathBuf>,
}

impl CircularDetector {
    fn new() -> Self {
        Self {
            include_chain: Vec::new(),
        }
    }

    /// Returns an error if `path` is already part of the current chain
    fn detect_circular_include(&self, path: &Path) -> Result<()> {
        if !self.include_chain.iter().any(|p| p == path) {
            return Ok(());
        }

        let mut chain_display: Vec<String> =
            self.include_chain.iter().map(|p| file_name(p)).collect();
        chain_display.push(file_name(path));

        Err(ConflabError::CircularInclude {
            chain: chain_display.join(" -> "),
        })
    }

    fn push_to_chain(&mut self, path: &Path) {
        self.include_chain.push(path.to_path_buf());
    }

    fn pop_from_chain(&mut self) {
        self.include_chain.pop();
    }
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .unwrap_or(path.as_os_str())
        .to_string_lossy()
        .into_owned()
}
