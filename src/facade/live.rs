use std::sync::Arc;

use futures::Stream;
use serde::de::DeserializeOwned;
use tokio::sync::{broadcast, watch};
use tokio_stream::wrappers::WatchStream;
use tokio_util::sync::{CancellationToken, DropGuard};
use tracing::info;

use super::{ConfigChange, diff_values};
use crate::{
    ConflabError, Result,
    remote::{RemoteStore, SyncState},
    sources::SourceLayer,
    value::{ConfigValue, KeyPath, path_matches},
};

const CHANGE_CAPACITY: usize = 1000;

/// Write side of the published view.
///
/// Held by the load pipeline and the remote watch task; every publish
/// replaces the snapshot and broadcasts the field-level diff.
#[derive(Clone)]
pub struct ViewPublisher {
    view: Arc<watch::Sender<Arc<ConfigValue>>>,
    changes: broadcast::Sender<ConfigChange>,
}

impl ViewPublisher {
    pub(crate) fn new(initial: ConfigValue) -> Self {
        let (view, _) = watch::channel(Arc::new(initial));
        let (changes, _) = broadcast::channel(CHANGE_CAPACITY);

        Self {
            view: Arc::new(view),
            changes,
        }
    }

    /// Replaces the view with `next` and broadcasts what changed.
    pub(crate) fn publish(&self, next: ConfigValue) {
        let next = Arc::new(next);
        let previous = self.view.send_replace(Arc::clone(&next));

        for change in diff_values(&previous, &next) {
            let _ = self.changes.send(change);
        }
    }

    fn current(&self) -> Arc<ConfigValue> {
        Arc::clone(&self.view.borrow())
    }
}

/// Handle to a loaded, continuously updated configuration.
///
/// Cheap to clone; every clone observes the same view. Remote sync stops
/// once the last clone is dropped.
#[derive(Clone)]
pub struct LiveConfig {
    inner: Arc<LiveInner>,
}

struct LiveInner {
    publisher: ViewPublisher,
    layers: Vec<SourceLayer>,
    environment: String,
    remote: Option<Arc<dyn RemoteStore>>,
    sync_state: Arc<watch::Sender<SyncState>>,
    cancel: DropGuard,
}

impl LiveConfig {
    pub(crate) fn new(
        publisher: ViewPublisher,
        layers: Vec<SourceLayer>,
        environment: String,
        remote: Option<Arc<dyn RemoteStore>>,
        sync_state: Arc<watch::Sender<SyncState>>,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            inner: Arc::new(LiveInner {
                publisher,
                layers,
                environment,
                remote,
                sync_state,
                cancel: cancel.drop_guard(),
            }),
        }
    }

    /// The merged view as of now.
    pub fn current(&self) -> Arc<ConfigValue> {
        self.inner.publisher.current()
    }

    /// Looks up a value by dotted or slash separated path.
    ///
    /// # Errors
    /// * `ConflabError::InvalidPath` - If nothing exists at `path`
    pub fn get_by_path(&self, path: &str) -> Result<ConfigValue> {
        self.current().navigate(&KeyPath::parse(path)).cloned()
    }

    /// Deserializes the value at `path`; an empty path addresses the whole view.
    ///
    /// # Errors
    /// * `ConflabError::InvalidPath` - If nothing exists at `path`
    /// * `ConflabError::Conversion` - If the value does not fit `T`
    pub fn extract<T>(&self, path: &str) -> Result<T>
    where
        T: DeserializeOwned,
    {
        let value = self.get_by_path(path)?;

        serde_json::from_value(serde_json::Value::from(value)).map_err(|e| {
            ConflabError::Conversion {
                path: path.to_string(),
                expected: std::any::type_name::<T>(),
                details: e.to_string(),
            }
        })
    }

    /// Streams changes whose path matches `pattern`.
    ///
    /// Patterns are dotted paths where `*` matches any one segment; a
    /// pattern also matches everything below it. Changes missed by a slow
    /// subscriber are skipped.
    pub fn subscribe_to_path(&self, pattern: &str) -> impl Stream<Item = ConfigChange> + use<> {
        let pattern = pattern.to_string();
        let receiver = self.inner.publisher.changes.subscribe();

        futures::stream::unfold(receiver, move |mut receiver| {
            let pattern = pattern.clone();
            async move {
                loop {
                    match receiver.recv().await {
                        Ok(change) => {
                            if path_matches(&change.path, &pattern) {
                                return Some((change, receiver));
                            }
                        }
                        Err(broadcast::error::RecvError::Lagged(_)) => continue,
                        Err(broadcast::error::RecvError::Closed) => return None,
                    }
                }
            }
        })
    }

    /// Streams whole snapshots, starting with the current one.
    pub fn watch(&self) -> WatchStream<Arc<ConfigValue>> {
        WatchStream::new(self.inner.publisher.view.subscribe())
    }

    /// Waits for the next re-merge and returns the new view.
    pub async fn changed(&self) -> Arc<ConfigValue> {
        let mut receiver = self.inner.publisher.view.subscribe();

        if receiver.changed().await.is_err() {
            return self.current();
        }
        Arc::clone(&receiver.borrow_and_update())
    }

    /// The remote client, when remote sync is active.
    pub fn remote(&self) -> Option<Arc<dyn RemoteStore>> {
        self.inner.remote.clone()
    }

    /// Local layers in precedence order, lowest first.
    pub fn layers(&self) -> &[SourceLayer] {
        &self.inner.layers
    }

    /// Environment the view was loaded for.
    pub fn environment(&self) -> &str {
        &self.inner.environment
    }

    /// Current state of remote synchronisation.
    pub fn sync_state(&self) -> SyncState {
        *self.inner.sync_state.borrow()
    }

    /// Stops the remote watch and heartbeat. The view stays readable.
    pub fn stop(&self) {
        let cancel = self.inner.cancel.token();
        if cancel.is_cancelled() {
            return;
        }

        cancel.cancel();
        self.inner.sync_state.send_if_modified(|state| {
            if *state == SyncState::Disabled {
                return false;
            }
            *state = SyncState::Stopped;
            true
        });
        info!(environment = %self.inner.environment, "Configuration sync stopped");
    }
}
