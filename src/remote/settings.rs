use std::sync::Arc;

use serde::Deserialize;

use super::{EtcdClient, MemoryStore, RemoteError, RemoteStore};
use crate::value::{ConfigValue, Scalar};

/// Key in the merged local view holding the remote settings.
pub const SETTINGS_KEY: &str = "etcd";

const DEFAULT_HOST: &str = "127.0.0.1";
const DEFAULT_PORT: u16 = 4001;

/// Connection settings read from the `etcd` key of the local configuration.
///
/// Accepts either a `hosts` list (or a single string) of `host:port`
/// entries, or separate `host` and `port` keys. Entries without a scheme
/// get `http://`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteSettings {
    /// Endpoints to try, in order.
    pub endpoints: Vec<String>,
}

#[derive(Debug, Default, Deserialize)]
struct RawSettings {
    #[serde(default)]
    hosts: Option<Hosts>,
    #[serde(default)]
    host: Option<String>,
    #[serde(default)]
    port: Option<PortValue>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Hosts {
    One(String),
    Many(Vec<String>),
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum PortValue {
    Number(u16),
    Text(String),
}

impl RemoteSettings {
    /// Reads settings from the merged local view.
    ///
    /// `None` when the `etcd` key is missing or holds `null`, `false`, `0`
    /// or an empty string, which disables remote sync. Any other value that
    /// is not usable falls back to the default endpoint.
    pub fn from_config(config: &ConfigValue) -> Option<Self> {
        let raw = config.get(SETTINGS_KEY)?;
        if is_switched_off(raw) {
            return None;
        }

        let raw: RawSettings =
            serde_json::from_value(serde_json::Value::from(raw.clone())).unwrap_or_default();

        Some(Self::from_raw(raw))
    }

    /// Settings for explicit `host:port` endpoints.
    pub fn from_hosts<I, S>(hosts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let endpoints: Vec<String> = hosts
            .into_iter()
            .map(|host| normalize_endpoint(host.as_ref()))
            .filter(|host| !host.is_empty())
            .collect();

        if endpoints.is_empty() {
            Self::default()
        } else {
            Self { endpoints }
        }
    }

    fn from_raw(raw: RawSettings) -> Self {
        match (raw.hosts, raw.host) {
            (Some(Hosts::Many(hosts)), _) => Self::from_hosts(hosts),
            (Some(Hosts::One(host)), _) => Self::from_hosts([host]),
            (None, Some(host)) => {
                let port = match raw.port {
                    Some(PortValue::Number(port)) => port.to_string(),
                    Some(PortValue::Text(port)) => port,
                    None => DEFAULT_PORT.to_string(),
                };
                Self::from_hosts([format!("{host}:{port}")])
            }
            (None, None) => Self::default(),
        }
    }
}

impl Default for RemoteSettings {
    fn default() -> Self {
        Self {
            endpoints: vec![format!("http://{DEFAULT_HOST}:{DEFAULT_PORT}")],
        }
    }
}

fn is_switched_off(value: &ConfigValue) -> bool {
    match value {
        ConfigValue::Scalar(Scalar::Null) | ConfigValue::Scalar(Scalar::Bool(false)) => true,
        ConfigValue::Scalar(Scalar::Number(n)) => n.as_f64() == Some(0.0),
        ConfigValue::Scalar(Scalar::String(s)) => s.is_empty(),
        _ => false,
    }
}

fn normalize_endpoint(host: &str) -> String {
    let host = host.trim().trim_end_matches('/');
    if host.is_empty() || host.contains("://") {
        host.to_string()
    } else {
        format!("http://{host}")
    }
}

/// Builds the remote client once settings are known.
pub trait RemoteConnector: Send + Sync {
    /// Creates a client for `settings`.
    ///
    /// # Errors
    /// Returns an error if the client cannot be constructed.
    fn connect(&self, settings: &RemoteSettings) -> Result<Arc<dyn RemoteStore>, RemoteError>;
}

/// Connects to etcd over HTTP.
#[derive(Debug, Clone, Copy, Default)]
pub struct EtcdConnector;

impl RemoteConnector for EtcdConnector {
    fn connect(&self, settings: &RemoteSettings) -> Result<Arc<dyn RemoteStore>, RemoteError> {
        let client = EtcdClient::new(settings.endpoints.iter().cloned())?;
        Ok(Arc::new(client))
    }
}

/// Hands out the same in-process store regardless of settings.
impl RemoteConnector for MemoryStore {
    fn connect(&self, _settings: &RemoteSettings) -> Result<Arc<dyn RemoteStore>, RemoteError> {
        Ok(Arc::new(self.clone()))
    }
}
