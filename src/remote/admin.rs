use std::{collections::BTreeMap, path::Path, sync::Arc, time::Duration};

use chrono::Utc;
use serde::Serialize;
use tracing::instrument;

use super::{
    DEFAULT_HEARTBEAT_INTERVAL, DEFAULT_PREFIX, RemoteError, RemoteKeys, RemoteNode, RemoteStore,
    tree_from_node,
};
use crate::{
    sources::parse_document,
    value::{ConfigValue, KeyPath},
};

/// Pseudo file name addressing the live tree instead of a mirrored layer.
pub const LIVE_FILE: &str = "etcd";

const ENVIRONMENT_ORDER: [&str; 5] = ["local", "development", "test", "staging", "live"];

/// Liveness of a service environment judged from its heartbeat key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum HeartbeatStatus {
    /// Last beat is within one heartbeat interval.
    Ok,
    /// Last beat is older, or unreadable.
    Offline,
}

/// Environments a service has mirrored files for.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ServiceEnvironments {
    /// Service name
    pub service: String,
    /// Environment names, well-known ones first
    pub environments: Vec<String>,
    /// Heartbeat status per environment that has a heartbeat key
    pub heartbeats: BTreeMap<String, HeartbeatStatus>,
}

/// Mirrored files of one service environment.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EnvironmentFiles {
    /// Service name
    pub service: String,
    /// Environment name
    pub environment: String,
    /// Layer names, sorted, followed by [`LIVE_FILE`]
    pub files: Vec<String>,
}

/// Content of one mirrored file, or of the live tree.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FileConfig {
    /// Service name
    pub service: String,
    /// Environment name
    pub environment: String,
    /// Layer name or [`LIVE_FILE`]
    pub file: String,
    /// Parsed content
    pub config: ConfigValue,
}

/// Read and edit access to every service below a key prefix.
///
/// Meant for admin tooling: lists services and environments, shows the
/// mirrored files and edits the live tree that running services watch.
#[derive(Clone)]
pub struct AdminApi {
    store: Arc<dyn RemoteStore>,
    prefix: String,
    heartbeat_interval: Duration,
}

impl AdminApi {
    /// Creates an admin view over `store` using the default prefix.
    pub fn new(store: Arc<dyn RemoteStore>) -> Self {
        Self {
            store,
            prefix: DEFAULT_PREFIX.to_string(),
            heartbeat_interval: DEFAULT_HEARTBEAT_INTERVAL,
        }
    }

    /// Uses `prefix` instead of `/conflab`.
    pub fn with_prefix(mut self, prefix: &str) -> Self {
        self.prefix = format!("/{}", prefix.trim_matches('/'));
        self
    }

    /// Sets the age after which a heartbeat counts as offline.
    pub fn with_heartbeat_interval(mut self, interval: Duration) -> Self {
        self.heartbeat_interval = interval;
        self
    }

    /// Lists the services below the prefix, sorted.
    ///
    /// # Errors
    /// Returns an error if the store cannot be read.
    pub async fn services(&self) -> Result<Vec<String>, RemoteError> {
        let mut services = self.child_names(&self.prefix).await?;
        services.sort();
        Ok(services)
    }

    /// Lists the environments of `service` with their heartbeat status.
    ///
    /// # Errors
    /// Returns an error if the store cannot be read.
    #[instrument(skip(self))]
    pub async fn service_environments(
        &self,
        service: &str,
    ) -> Result<ServiceEnvironments, RemoteError> {
        let mut environments = self
            .child_names(&format!("{}/{service}/files", self.prefix))
            .await?;
        environments.sort_by(|a, b| {
            environment_rank(a)
                .cmp(&environment_rank(b))
                .then_with(|| a.cmp(b))
        });

        let now = Utc::now().timestamp_millis();
        let heartbeats = self
            .children(&format!("{}/{service}/heartbeat", self.prefix))
            .await?
            .into_iter()
            .filter(|node| !node.dir)
            .map(|node| {
                let status = heartbeat_status(node.value.as_deref(), now, self.heartbeat_interval);
                (node.name().to_string(), status)
            })
            .collect();

        Ok(ServiceEnvironments {
            service: service.to_string(),
            environments,
            heartbeats,
        })
    }

    /// Lists the mirrored files of one environment.
    ///
    /// # Errors
    /// Returns an error if the store cannot be read.
    pub async fn environment_files(
        &self,
        service: &str,
        environment: &str,
    ) -> Result<EnvironmentFiles, RemoteError> {
        let keys = self.keys(service, environment);
        let mut files = self.child_names(&keys.files_root()).await?;
        files.sort();
        files.push(LIVE_FILE.to_string());

        Ok(EnvironmentFiles {
            service: service.to_string(),
            environment: environment.to_string(),
            files,
        })
    }

    /// Reads a mirrored file, or the live tree for [`LIVE_FILE`].
    ///
    /// # Errors
    /// * `RemoteError::NotFound` - If the file was never mirrored
    /// * `RemoteError::Decode` - If the mirrored content is not JSON
    pub async fn file_config(
        &self,
        service: &str,
        environment: &str,
        file: &str,
    ) -> Result<FileConfig, RemoteError> {
        let keys = self.keys(service, environment);

        let config = if file == LIVE_FILE {
            match self.store.get(&keys.config_root()).await {
                Ok(node) => tree_from_node(&node, &keys),
                Err(RemoteError::NotFound(_)) => ConfigValue::empty(),
                Err(e) => return Err(e),
            }
        } else {
            let key = keys.file(file);
            let node = self.store.get(&key).await?;
            let raw = node.value.unwrap_or_default();
            parse_document(raw.as_bytes(), Path::new(&key))
                .map_err(|e| RemoteError::Decode(e.to_string()))?
        };

        Ok(FileConfig {
            service: service.to_string(),
            environment: environment.to_string(),
            file: file.to_string(),
            config,
        })
    }

    /// Sets `key` (dotted or slash separated) in the live tree.
    ///
    /// # Errors
    /// Returns an error if the store rejects the write.
    pub async fn update_key(
        &self,
        service: &str,
        environment: &str,
        key: &str,
        value: &str,
    ) -> Result<(), RemoteError> {
        let key = self.live_key(service, environment, key)?;
        self.store.set(&key, value).await
    }

    /// Removes `key` and anything below it from the live tree.
    ///
    /// # Errors
    /// * `RemoteError::NotFound` - If the key does not exist
    pub async fn delete_key(
        &self,
        service: &str,
        environment: &str,
        key: &str,
    ) -> Result<(), RemoteError> {
        let key = self.live_key(service, environment, key)?;
        self.store.delete(&key, true).await
    }

    fn keys(&self, service: &str, environment: &str) -> RemoteKeys {
        RemoteKeys::new(&self.prefix, service, environment)
    }

    fn live_key(&self, service: &str, environment: &str, key: &str) -> Result<String, RemoteError> {
        let path = KeyPath::parse(key);
        if path.is_empty() {
            return Err(RemoteError::NotFound(key.to_string()));
        }

        Ok(format!(
            "{}/{}",
            self.keys(service, environment).config_root(),
            path.segments().join("/")
        ))
    }

    async fn children(&self, key: &str) -> Result<Vec<RemoteNode>, RemoteError> {
        match self.store.get(key).await {
            Ok(node) => Ok(node.nodes),
            Err(RemoteError::NotFound(_)) => Ok(Vec::new()),
            Err(e) => Err(e),
        }
    }

    async fn child_names(&self, key: &str) -> Result<Vec<String>, RemoteError> {
        Ok(self
            .children(key)
            .await?
            .iter()
            .map(|node| node.name().to_string())
            .collect())
    }
}

fn environment_rank(environment: &str) -> usize {
    ENVIRONMENT_ORDER
        .iter()
        .position(|known| *known == environment)
        .unwrap_or(ENVIRONMENT_ORDER.len())
}

fn heartbeat_status(value: Option<&str>, now: i64, interval: Duration) -> HeartbeatStatus {
    let interval = i64::try_from(interval.as_millis()).unwrap_or(i64::MAX);

    match value.and_then(|v| v.parse::<i64>().ok()) {
        Some(beat) if now.saturating_sub(beat) <= interval => HeartbeatStatus::Ok,
        _ => HeartbeatStatus::Offline,
    }
}
