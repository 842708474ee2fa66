/// Default root of every key written by the loader.
pub const DEFAULT_PREFIX: &str = "/conflab";

const CANARY: &str = "__";
const MERGED: &str = "merged";

/// Key layout for one service in one environment.
///
/// ```text
/// <prefix>/<service>/config/<env>/...     live tree
/// <prefix>/<service>/files/<env>/<layer>  mirrored layers
/// <prefix>/<service>/files/<env>/merged   merged snapshot
/// <prefix>/<service>/heartbeat/<env>      liveness timestamp
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteKeys {
    prefix: String,
    service: String,
    environment: String,
}

impl RemoteKeys {
    /// Creates the layout; a trailing slash on `prefix` is ignored.
    pub fn new(prefix: &str, service: &str, environment: &str) -> Self {
        Self {
            prefix: format!("/{}", prefix.trim_matches('/')),
            service: service.to_string(),
            environment: environment.to_string(),
        }
    }

    /// Service name the keys belong to.
    pub fn service(&self) -> &str {
        &self.service
    }

    /// Environment the keys belong to.
    pub fn environment(&self) -> &str {
        &self.environment
    }

    /// Root of the live configuration tree.
    pub fn config_root(&self) -> String {
        format!(
            "{}/{}/config/{}",
            self.prefix, self.service, self.environment
        )
    }

    /// Canary written before the first fetch so the root exists and can be watched.
    pub fn canary(&self) -> String {
        format!("{}/{CANARY}", self.config_root())
    }

    /// Directory holding the mirrored layers.
    pub fn files_root(&self) -> String {
        format!(
            "{}/{}/files/{}",
            self.prefix, self.service, self.environment
        )
    }

    /// Mirror entry for one layer.
    pub fn file(&self, layer: &str) -> String {
        format!("{}/{layer}", self.files_root())
    }

    /// Mirror entry for the merged snapshot.
    pub fn merged(&self) -> String {
        self.file(MERGED)
    }

    /// Heartbeat entry.
    pub fn heartbeat(&self) -> String {
        format!(
            "{}/{}/heartbeat/{}",
            self.prefix, self.service, self.environment
        )
    }

    /// Path of `key` relative to the config root.
    ///
    /// `None` for the root itself, the canary and keys outside the root.
    pub fn relative<'k>(&self, key: &'k str) -> Option<&'k str> {
        let root = self.config_root();
        let relative = key.strip_prefix(root.as_str())?.strip_prefix('/')?;

        if relative.is_empty() || relative == CANARY {
            return None;
        }
        Some(relative)
    }
}
