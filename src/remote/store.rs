use async_trait::async_trait;
use futures::stream::BoxStream;
use serde::Deserialize;
use thiserror::Error;

/// Errors reported by a remote key-value client.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RemoteError {
    /// The key does not exist
    #[error("key not found: {0}")]
    NotFound(String),

    /// The store could not be reached
    #[error("transport error: {0}")]
    Transport(String),

    /// The store answered with an error
    #[error("store returned error {code}: {message}")]
    Status {
        /// Store specific error code
        code: u64,
        /// Error message from the store
        message: String,
    },

    /// The response could not be decoded
    #[error("failed to decode response: {0}")]
    Decode(String),
}

/// A node of the store's key hierarchy as returned by a recursive get.
#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
pub struct RemoteNode {
    /// Full key, e.g. `/conflab/app/config/test/db`
    pub key: String,
    /// Leaf value; `None` for directories
    #[serde(default)]
    pub value: Option<String>,
    /// True for directories
    #[serde(default)]
    pub dir: bool,
    /// Children of a directory
    #[serde(default)]
    pub nodes: Vec<RemoteNode>,
}

impl RemoteNode {
    /// Creates a leaf node.
    pub fn leaf(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: Some(value.into()),
            dir: false,
            nodes: Vec::new(),
        }
    }

    /// Creates a directory node.
    pub fn directory(key: impl Into<String>, nodes: Vec<RemoteNode>) -> Self {
        Self {
            key: key.into(),
            value: None,
            dir: true,
            nodes,
        }
    }

    /// Last segment of the key.
    pub fn name(&self) -> &str {
        self.key.rsplit('/').next().unwrap_or(&self.key)
    }
}

/// Kind of change reported by a watch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemoteAction {
    /// A key was created or overwritten
    Set,
    /// A key or directory was removed
    Delete,
}

impl RemoteAction {
    /// Maps an etcd action name; `None` for actions that carry no change.
    pub fn from_etcd(action: &str) -> Option<Self> {
        match action {
            "set" | "create" | "update" | "compareAndSwap" => Some(Self::Set),
            "delete" | "expire" | "compareAndDelete" => Some(Self::Delete),
            _ => None,
        }
    }
}

/// A raw change notification from the store.
#[derive(Debug, Clone, PartialEq)]
pub struct RemoteEvent {
    /// What happened
    pub action: RemoteAction,
    /// Full key affected
    pub key: String,
    /// New value for `Set`
    pub value: Option<String>,
}

/// Stream of watch notifications, in delivery order.
pub type RemoteWatch = BoxStream<'static, Result<RemoteEvent, RemoteError>>;

/// A watchable key-value store.
///
/// Keys are slash separated absolute paths. Directories exist implicitly
/// once a key below them is set.
#[async_trait]
pub trait RemoteStore: Send + Sync {
    /// Writes `value` at `key`.
    ///
    /// # Errors
    /// Returns an error if the store rejects the write or cannot be reached.
    async fn set(&self, key: &str, value: &str) -> Result<(), RemoteError>;

    /// Reads `key` and, for directories, everything below it.
    ///
    /// # Errors
    /// * `RemoteError::NotFound` - If the key does not exist
    async fn get(&self, key: &str) -> Result<RemoteNode, RemoteError>;

    /// Removes `key`; `recursive` also removes a directory's contents.
    ///
    /// # Errors
    /// * `RemoteError::NotFound` - If the key does not exist
    async fn delete(&self, key: &str, recursive: bool) -> Result<(), RemoteError>;

    /// Watches `key` and everything below it.
    ///
    /// # Errors
    /// Returns an error if the watch cannot be registered.
    async fn watch(&self, key: &str) -> Result<RemoteWatch, RemoteError>;
}
