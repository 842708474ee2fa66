use std::{future::Future, sync::Arc, time::Duration};

use chrono::Utc;
use futures::{StreamExt, future::join_all};
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use super::{RemoteError, RemoteKeys, RemoteStore, RemoteWatch, WatchEvent, tree_from_node};
use crate::{
    ConflabError, Result,
    facade::ViewPublisher,
    merge::merge,
    sources::SourceLayer,
    value::ConfigValue,
};

/// Default period between heartbeat writes.
pub const DEFAULT_HEARTBEAT_INTERVAL: Duration = Duration::from_secs(10);

const WATCH_RETRY_DELAY: Duration = Duration::from_secs(1);

/// Lifecycle of the remote synchronisation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncState {
    /// No remote settings, or no service name; only local layers are used.
    Disabled,
    /// Writing the canary and fetching the initial snapshot, or
    /// re-establishing a failed watch.
    Initializing,
    /// Applying remote changes as they arrive.
    Watching,
    /// Torn down by `stop()` or the end of the watch stream.
    Stopped,
}

/// Keeps the remote layer in step with the store.
///
/// [`RemoteSync::start`] starts the heartbeat, performs the initial snapshot,
/// mirrors the local layers and then hands over to a watch task. A failed
/// watch is re-registered and the tree re-read before watching resumes.
/// Both tasks end when the shared cancellation token fires.
pub struct RemoteSync {
    store: Arc<dyn RemoteStore>,
    keys: RemoteKeys,
    cancel: CancellationToken,
    state: Arc<watch::Sender<SyncState>>,
    heartbeat_interval: Duration,
}

impl RemoteSync {
    /// Creates a sync engine for one service and environment.
    pub fn new(
        store: Arc<dyn RemoteStore>,
        keys: RemoteKeys,
        cancel: CancellationToken,
        state: Arc<watch::Sender<SyncState>>,
    ) -> Self {
        Self {
            store,
            keys,
            cancel,
            state,
            heartbeat_interval: DEFAULT_HEARTBEAT_INTERVAL,
        }
    }

    /// Overrides the heartbeat period.
    pub fn with_heartbeat_interval(mut self, interval: Duration) -> Self {
        self.heartbeat_interval = interval;
        self
    }

    /// Fetches the remote layer, publishes the combined view and starts
    /// the watch and heartbeat tasks.
    ///
    /// `local` is the merge of `layers`. On success the published view is
    /// `local` overlaid with the remote layer.
    ///
    /// # Errors
    /// * `ConflabError::RemoteUnavailable` - If the canary write, watch registration or fetch fails
    /// * `ConflabError::Stopped` - If the token fires before the snapshot is in place
    #[instrument(skip_all, fields(service = %self.keys.service(), environment = %self.keys.environment()))]
    pub async fn start(
        self,
        layers: &[SourceLayer],
        local: ConfigValue,
        publisher: ViewPublisher,
    ) -> Result<()> {
        if self.cancel.is_cancelled() {
            return Err(ConflabError::Stopped);
        }
        self.state.send_replace(SyncState::Initializing);

        let heartbeat = self.cancel.child_token();
        tokio::spawn(heartbeat_loop(
            Arc::clone(&self.store),
            self.keys.heartbeat(),
            self.heartbeat_interval,
            heartbeat.clone(),
        ));
        // Cancels the heartbeat if initialisation bails out below.
        let heartbeat_guard = heartbeat.drop_guard();

        let root = self.keys.config_root();

        self.guarded("canary write", async {
            self.store
                .set(&self.keys.canary(), "Ensure config can be watched")
                .await
        })
        .await?;

        let watch = self
            .guarded("watch registration", self.store.watch(&root))
            .await?;

        let snapshot = self
            .guarded("fetch", fetch_tree(self.store.as_ref(), &self.keys))
            .await?;

        let merged = merge(&local, &snapshot);
        publisher.publish(merged.clone());
        self.state.send_replace(SyncState::Watching);
        info!(root = %root, "Remote configuration connected");

        self.mirror(layers, &merged).await;
        heartbeat_guard.disarm();

        tokio::spawn(
            WatchTask {
                store: self.store,
                keys: self.keys,
                cancel: self.cancel,
                state: self.state,
                publisher,
                local,
                remote: snapshot,
            }
            .run(watch),
        );

        Ok(())
    }

    /// Writes each export-eligible layer and the merged snapshot under `files/`.
    ///
    /// Failures are logged and otherwise ignored.
    pub async fn mirror(&self, layers: &[SourceLayer], merged: &ConfigValue) {
        let writes = layers
            .iter()
            .filter(|layer| layer.export_eligible)
            .map(|layer| {
                let key = self.keys.file(&layer.name);
                let content = layer.content.to_json_string();
                async move {
                    let result = self.store.set(&key, &content).await;
                    (key, result)
                }
            });

        for (key, result) in join_all(writes).await {
            if let Err(e) = result {
                warn!(key = %key, error = %e, "Failed to mirror layer");
            }
        }

        write_merged(self.store.as_ref(), &self.keys, merged).await;
    }

    async fn guarded<T, F>(&self, operation: &str, operation_future: F) -> Result<T>
    where
        F: Future<Output = std::result::Result<T, RemoteError>>,
    {
        if self.cancel.is_cancelled() {
            return Err(ConflabError::Stopped);
        }

        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => {
                debug!(operation, "Stopped during remote initialisation");
                Err(ConflabError::Stopped)
            }
            result = operation_future => result.map_err(|e| ConflabError::remote(operation, e)),
        }
    }
}

struct WatchTask {
    store: Arc<dyn RemoteStore>,
    keys: RemoteKeys,
    cancel: CancellationToken,
    state: Arc<watch::Sender<SyncState>>,
    publisher: ViewPublisher,
    local: ConfigValue,
    remote: ConfigValue,
}

impl WatchTask {
    async fn run(mut self, watch: RemoteWatch) {
        let mut watch = Some(watch);

        while let Some(mut stream) = watch.take() {
            let next = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => break,
                next = stream.next() => next,
            };

            match next {
                Some(Ok(event)) => {
                    if let Some(event) = WatchEvent::from_remote(&event, &self.keys) {
                        self.apply(&event).await;
                    }
                    watch = Some(stream);
                }
                Some(Err(e)) => {
                    warn!(error = %e, "Remote watch failed, re-establishing");
                    drop(stream);
                    self.set_state(SyncState::Initializing);

                    if let Some((stream, snapshot)) = self.reconnect().await {
                        self.set_state(SyncState::Watching);
                        self.replace_remote(snapshot).await;
                        watch = Some(stream);
                    }
                }
                None => {
                    info!("Remote watch stream ended");
                }
            }
        }

        self.state.send_replace(SyncState::Stopped);
        debug!("Remote watch task finished");
    }

    async fn apply(&mut self, event: &WatchEvent) {
        debug!(action = ?event.action, path = %event.path, "Applying remote change");
        event.apply(&mut self.remote);
        self.publish().await;
    }

    /// Swaps in a freshly fetched remote layer; changes missed while the
    /// watch was down surface as ordinary diffs.
    async fn replace_remote(&mut self, snapshot: ConfigValue) {
        if snapshot == self.remote {
            debug!("Remote layer unchanged after re-watch");
            return;
        }
        info!("Remote layer resynchronised after re-watch");
        self.remote = snapshot;
        self.publish().await;
    }

    async fn publish(&self) {
        let merged = merge(&self.local, &self.remote);
        self.publisher.publish(merged.clone());

        write_merged(self.store.as_ref(), &self.keys, &merged).await;
    }

    /// Registers a new watch and re-reads the tree, retrying until both
    /// succeed or the token fires.
    async fn reconnect(&self) -> Option<(RemoteWatch, ConfigValue)> {
        loop {
            tokio::select! {
                biased;
                _ = self.cancel.cancelled() => return None,
                _ = tokio::time::sleep(WATCH_RETRY_DELAY) => {}
            }

            match self.resubscribe().await {
                Ok(pair) => return Some(pair),
                Err(e) => warn!(error = %e, "Failed to re-establish remote watch"),
            }
        }
    }

    async fn resubscribe(&self) -> std::result::Result<(RemoteWatch, ConfigValue), RemoteError> {
        let watch = self.store.watch(&self.keys.config_root()).await?;
        let snapshot = fetch_tree(self.store.as_ref(), &self.keys).await?;
        Ok((watch, snapshot))
    }

    fn set_state(&self, next: SyncState) {
        self.state.send_if_modified(|state| {
            if *state == SyncState::Stopped || *state == next {
                return false;
            }
            *state = next;
            true
        });
    }
}

/// Reads the whole config root as a tree; a missing root is an empty layer.
async fn fetch_tree(
    store: &dyn RemoteStore,
    keys: &RemoteKeys,
) -> std::result::Result<ConfigValue, RemoteError> {
    match store.get(&keys.config_root()).await {
        Ok(node) => Ok(tree_from_node(&node, keys)),
        Err(RemoteError::NotFound(_)) => Ok(ConfigValue::empty()),
        Err(e) => Err(e),
    }
}

async fn write_merged(store: &dyn RemoteStore, keys: &RemoteKeys, merged: &ConfigValue) {
    if let Err(e) = store.set(&keys.merged(), &merged.to_json_string()).await {
        warn!(key = %keys.merged(), error = %e, "Failed to mirror merged configuration");
    }
}

async fn heartbeat_loop(
    store: Arc<dyn RemoteStore>,
    key: String,
    interval: Duration,
    cancel: CancellationToken,
) {
    let mut ticker = tokio::time::interval(interval);

    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            _ = ticker.tick() => {}
        }

        let now = Utc::now().timestamp_millis().to_string();
        if let Err(e) = store.set(&key, &now).await {
            warn!(key = %key, error = %e, "Heartbeat write failed");
        }
    }

    debug!(key = %key, "Heartbeat stopped");
}
