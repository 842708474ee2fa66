use std::{path::PathBuf, time::Duration};

use serde::Deserialize;

use crate::value::ConfigValue;

/// Inputs to [`Conflab::load`](super::Conflab::load).
///
/// Every field is optional. Unset locations fall back to the process
/// environment and then to defaults rooted at the working directory.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct LoadOptions {
    /// Inline defaults, merged below every file.
    pub config: Option<ConfigValue>,
    /// Explicit overrides, merged above arguments.
    pub overrides: Option<ConfigValue>,
    /// Directory holding library defaults (`CONFLAB_LIBRARY_CONFIG`).
    pub library_path: Option<PathBuf>,
    /// Directory holding application files (`CONFLAB_CONFIG`).
    pub config_path: Option<PathBuf>,
    /// Environment name (`CONFLAB_ENV`, then `RUST_ENV`).
    pub env: Option<String>,
    /// Arguments for the argv layer; `None` reads the process arguments.
    pub argv: Option<Vec<String>>,
    /// Host name selecting `<host>.json`.
    pub hostname: Option<String>,
    /// Service name rooting the remote keys (`CONFLAB_SERVICE`).
    pub service_name: Option<String>,
    /// Application root used for defaults and service discovery.
    pub root_dir: Option<PathBuf>,
    /// Root of every remote key, `/conflab` when unset.
    pub remote_prefix: Option<String>,
    /// Period between heartbeat writes, ten seconds when unset.
    pub heartbeat_interval: Option<Duration>,
}
