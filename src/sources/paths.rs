use std::{
    env,
    path::{Path, PathBuf},
};

use tracing::debug;

use crate::facade::LoadOptions;

const LIBRARY_CONFIG_VAR: &str = "CONFLAB_LIBRARY_CONFIG";
const CONFIG_VAR: &str = "CONFLAB_CONFIG";
const ENV_VARS: [&str; 2] = ["CONFLAB_ENV", "RUST_ENV"];
const DEFAULT_ENVIRONMENT: &str = "development";

/// A file the loader tries to read, with the layer name it produces.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileCandidate {
    /// Layer name for the file
    pub name: String,
    /// Location of the file
    pub path: PathBuf,
}

impl FileCandidate {
    fn new(name: impl Into<String>, path: PathBuf) -> Self {
        Self {
            name: name.into(),
            path,
        }
    }
}

/// Resolved locations and identity used to pick configuration files.
///
/// Every field is taken from [`LoadOptions`] first, then the process
/// environment, then a default.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigPaths {
    /// Directory holding library defaults; `None` skips the `lib-*` layers.
    pub library_dir: Option<PathBuf>,
    /// Directory holding the application's configuration files.
    pub config_dir: PathBuf,
    /// Environment name selecting `<env>.json`.
    pub environment: String,
    /// Short host name selecting `<host>.json`.
    pub hostname: Option<String>,
    /// Application root, used for service-name discovery.
    pub root_dir: PathBuf,
}

impl ConfigPaths {
    /// Resolves paths from options, environment variables and defaults.
    pub fn resolve(options: &LoadOptions) -> Self {
        let root_dir = options
            .root_dir
            .clone()
            .or_else(|| env::current_dir().ok())
            .unwrap_or_else(|| PathBuf::from("."));

        let library_dir = options
            .library_path
            .clone()
            .or_else(|| env::var_os(LIBRARY_CONFIG_VAR).map(PathBuf::from));

        let config_dir = options
            .config_path
            .clone()
            .or_else(|| env::var_os(CONFIG_VAR).map(PathBuf::from))
            .unwrap_or_else(|| root_dir.join("config"));

        let environment = options
            .env
            .clone()
            .or_else(|| ENV_VARS.iter().find_map(|var| env::var(var).ok()))
            .unwrap_or_else(|| DEFAULT_ENVIRONMENT.to_string());

        let hostname = options
            .hostname
            .clone()
            .or_else(system_hostname)
            .map(|host| short_hostname(&host).to_string());

        debug!(
            config_dir = %config_dir.display(),
            environment = %environment,
            "Resolved configuration paths"
        );

        Self {
            library_dir,
            config_dir,
            environment,
            hostname,
            root_dir,
        }
    }

    /// Candidate files in precedence order, lowest first.
    pub fn candidates(&self) -> Vec<FileCandidate> {
        let mut candidates = Vec::with_capacity(6);
        let env_file = format!("{}.json", self.environment);

        if let Some(library_dir) = &self.library_dir {
            candidates.push(FileCandidate::new(
                "lib-default",
                library_dir.join("default.json"),
            ));
            candidates.push(FileCandidate::new(
                "lib-environment",
                library_dir.join(&env_file),
            ));
        }

        candidates.push(FileCandidate::new(
            "default",
            self.config_dir.join("default.json"),
        ));
        candidates.push(FileCandidate::new(
            "environment",
            self.config_dir.join(&env_file),
        ));
        candidates.push(FileCandidate::new(
            "runtime",
            self.config_dir.join("runtime.json"),
        ));

        if let Some(host) = &self.hostname {
            candidates.push(FileCandidate::new(
                format!("hostname-{host}"),
                self.config_dir.join(format!("{host}.json")),
            ));
        }

        candidates
    }

    /// Application root directory.
    pub fn root_dir(&self) -> &Path {
        &self.root_dir
    }
}

fn system_hostname() -> Option<String> {
    nix::unistd::gethostname()
        .ok()
        .and_then(|name| name.into_string().ok())
}

fn short_hostname(host: &str) -> &str {
    host.split('.').next().unwrap_or(host)
}
