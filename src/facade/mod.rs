//! Load entry point and the live configuration handle.

mod changes;
mod live;
mod options;

#[cfg(test)]
mod tests;

use std::sync::Arc;

use tokio::sync::{Mutex, watch};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

pub use changes::{ConfigChange, diff_values};
pub use live::LiveConfig;
pub(crate) use live::ViewPublisher;
pub use options::LoadOptions;

use crate::{
    ConflabError, Result,
    merge::merge_layers,
    remote::{
        DEFAULT_PREFIX, EtcdConnector, RemoteConnector, RemoteKeys, RemoteSettings, RemoteStore,
        RemoteSync, SyncState,
    },
    sources::{ConfigPaths, FsReader, SourceLoader, SourceReader, discover_service_name},
};

enum LoadState {
    NotStarted,
    Loaded(LiveConfig),
    Failed(String),
}

/// Resolves layered configuration once and keeps it live.
///
/// The first successful [`load`](Self::load) is cached; later calls return
/// the same handle without touching any source. A failed load is cached
/// too and reported as `ConflabError::LoadFailed`.
pub struct Conflab {
    state: Mutex<LoadState>,
    reader: Arc<dyn SourceReader>,
    connector: Arc<dyn RemoteConnector>,
    cancel: CancellationToken,
}

impl Default for Conflab {
    fn default() -> Self {
        Self::new()
    }
}

impl Conflab {
    /// Creates a loader reading the filesystem and connecting to etcd.
    pub fn new() -> Self {
        Self {
            state: Mutex::new(LoadState::NotStarted),
            reader: Arc::new(FsReader),
            connector: Arc::new(EtcdConnector),
            cancel: CancellationToken::new(),
        }
    }

    /// Replaces the file reader.
    pub fn with_reader(mut self, reader: Arc<dyn SourceReader>) -> Self {
        self.reader = reader;
        self
    }

    /// Replaces how the remote client is built.
    pub fn with_connector(mut self, connector: Arc<dyn RemoteConnector>) -> Self {
        self.connector = connector;
        self
    }

    /// Loads every source and, when configured, connects the remote store.
    ///
    /// # Errors
    /// * `ConflabError::Parse` - If a configuration file is malformed
    /// * `ConflabError::CircularInclude` - If additional files include each other
    /// * `ConflabError::RemoteUnavailable` - If the remote store is configured but unreachable
    /// * `ConflabError::Stopped` - If [`stop`](Self::stop) was called before remote sync started
    /// * `ConflabError::LoadFailed` - If an earlier load on this instance failed
    pub async fn load(&self, options: LoadOptions) -> Result<LiveConfig> {
        let mut state = self.state.lock().await;

        match &*state {
            LoadState::Loaded(live) => return Ok(live.clone()),
            LoadState::Failed(message) => return Err(ConflabError::LoadFailed(message.clone())),
            LoadState::NotStarted => {}
        }

        match self.load_fresh(&options).await {
            Ok(live) => {
                *state = LoadState::Loaded(live.clone());
                Ok(live)
            }
            Err(e) => {
                *state = LoadState::Failed(e.to_string());
                Err(e)
            }
        }
    }

    /// Stops remote sync, including an initial fetch still in flight.
    pub fn stop(&self) {
        self.cancel.cancel();
    }

    #[instrument(skip_all)]
    async fn load_fresh(&self, options: &LoadOptions) -> Result<LiveConfig> {
        let paths = ConfigPaths::resolve(options);
        let layers = SourceLoader::new(self.reader.as_ref(), &paths)
            .load(options)
            .await?;

        let local = merge_layers(&layers);
        let publisher = ViewPublisher::new(local.clone());
        let sync_state = Arc::new(watch::channel(SyncState::Disabled).0);

        let live = |remote: Option<Arc<dyn RemoteStore>>| {
            LiveConfig::new(
                publisher.clone(),
                layers.clone(),
                paths.environment.clone(),
                remote,
                Arc::clone(&sync_state),
                self.cancel.clone(),
            )
        };

        let Some(settings) = RemoteSettings::from_config(&local) else {
            debug!("No remote settings, using local configuration only");
            return Ok(live(None));
        };

        let service =
            match discover_service_name(options.service_name.as_deref(), paths.root_dir()).await {
                Ok(service) => service,
                Err(e) => {
                    warn!(error = %e, "Skipping remote configuration");
                    return Ok(live(None));
                }
            };

        let store = self
            .connector
            .connect(&settings)
            .map_err(|e| ConflabError::remote("connect", e))?;

        let keys = RemoteKeys::new(
            options.remote_prefix.as_deref().unwrap_or(DEFAULT_PREFIX),
            &service,
            &paths.environment,
        );

        let mut sync = RemoteSync::new(
            Arc::clone(&store),
            keys,
            self.cancel.clone(),
            Arc::clone(&sync_state),
        );
        if let Some(interval) = options.heartbeat_interval {
            sync = sync.with_heartbeat_interval(interval);
        }

        if let Err(e) = sync.start(&layers, local, publisher.clone()).await {
            sync_state.send_replace(SyncState::Stopped);
            return Err(e);
        }

        info!(service = %service, environment = %paths.environment, "Configuration loaded");
        Ok(live(Some(store)))
    }
}
