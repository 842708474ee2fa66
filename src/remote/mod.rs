//! Remote key-value store synchronisation.
//!
//! The merged local view names the store under its `etcd` key. When
//! present, the loader writes a canary below the service's config root,
//! fetches the live tree, overlays it on the local layers and then keeps it
//! current from a recursive watch. Export-eligible layers and the merged
//! snapshot are mirrored under `files/`, and a heartbeat marks the service
//! as alive.

mod admin;
mod etcd;
mod keys;
mod memory;
mod settings;
mod store;
mod sync;
mod tree;

pub use admin::{
    AdminApi, EnvironmentFiles, FileConfig, HeartbeatStatus, LIVE_FILE, ServiceEnvironments,
};
pub use etcd::EtcdClient;
pub use keys::{DEFAULT_PREFIX, RemoteKeys};
pub use memory::MemoryStore;
pub use settings::{EtcdConnector, RemoteConnector, RemoteSettings, SETTINGS_KEY};
pub use store::{RemoteAction, RemoteError, RemoteEvent, RemoteNode, RemoteStore, RemoteWatch};
pub use sync::{DEFAULT_HEARTBEAT_INTERVAL, SyncState};
pub(crate) use sync::RemoteSync;
pub use tree::{WatchEvent, tree_from_node};
