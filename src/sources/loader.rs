use tracing::{debug, info, instrument};

use super::{
    AdditionalFileResolver, ConfigPaths, SourceLayer, argv, reader::SourceReader,
};
use crate::{Result, facade::LoadOptions, value::ConfigValue};

/// Produces the local layers in precedence order.
///
/// Order, lowest first: inline options, `lib-default`, `lib-environment`,
/// `default`, `environment`, `runtime`, `hostname-<host>`, command-line
/// arguments, explicit overrides. Each file is immediately followed by the
/// files it includes.
pub struct SourceLoader<'a> {
    reader: &'a dyn SourceReader,
    paths: &'a ConfigPaths,
}

impl<'a> SourceLoader<'a> {
    /// Creates a loader reading through `reader` from the resolved `paths`.
    pub fn new(reader: &'a dyn SourceReader, paths: &'a ConfigPaths) -> Self {
        Self { reader, paths }
    }

    /// Loads every local source.
    ///
    /// Missing files are skipped; the first malformed file aborts the load.
    ///
    /// # Errors
    /// * `ConflabError::Parse` - If a file is not valid JSON
    /// * `ConflabError::Io` - If an existing file cannot be read
    /// * `ConflabError::CircularInclude` - If additional files include each other
    #[instrument(skip_all, fields(environment = %self.paths.environment))]
    pub async fn load(&self, options: &LoadOptions) -> Result<Vec<SourceLayer>> {
        let mut layers = Vec::new();

        push_inline(&mut layers, "opts", options.config.as_ref());

        for candidate in self.paths.candidates() {
            let mut resolver = AdditionalFileResolver::new(self.reader);
            layers.extend(resolver.resolve(&candidate).await?);
        }

        let args = match &options.argv {
            Some(args) => argv::parse(args),
            None => argv::from_process(),
        };
        push_inline(&mut layers, "argv", Some(&args));

        push_inline(&mut layers, "overrides", options.overrides.as_ref());

        info!(
            layers = layers.len(),
            names = ?layers.iter().map(|l| l.name.as_str()).collect::<Vec<_>>(),
            "Loaded local configuration sources"
        );
        Ok(layers)
    }
}

fn push_inline(layers: &mut Vec<SourceLayer>, name: &str, content: Option<&ConfigValue>) {
    match content {
        Some(ConfigValue::Mapping(map)) if map.is_empty() => {}
        Some(content) if !content.is_null() => {
            debug!(layer = name, "Adding inline layer");
            layers.push(SourceLayer::new(name, content.clone()));
        }
        _ => {}
    }
}
