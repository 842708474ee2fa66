use std::{
    collections::BTreeMap,
    sync::{
        Arc, RwLock,
        atomic::{AtomicBool, Ordering},
    },
};

use async_trait::async_trait;
use futures::StreamExt;
use tokio::sync::broadcast;
use tokio_stream::wrappers::{BroadcastStream, errors::BroadcastStreamRecvError};

use super::{RemoteAction, RemoteError, RemoteEvent, RemoteNode, RemoteStore, RemoteWatch};

const EVENT_CAPACITY: usize = 1024;

/// An in-process [`RemoteStore`].
///
/// Keeps leaf keys in a sorted map and derives directories from key
/// prefixes. Watches see every write made through any clone of the store.
/// Useful for local development and tests; [`MemoryStore::set_unavailable`]
/// simulates an outage.
#[derive(Clone)]
pub struct MemoryStore {
    inner: Arc<MemoryInner>,
}

struct MemoryInner {
    entries: RwLock<BTreeMap<String, String>>,
    events: broadcast::Sender<RemoteEvent>,
    unavailable: AtomicBool,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);

        Self {
            inner: Arc::new(MemoryInner {
                entries: RwLock::new(BTreeMap::new()),
                events,
                unavailable: AtomicBool::new(false),
            }),
        }
    }

    /// Makes every subsequent operation fail with a transport error, or
    /// restores normal service.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.inner.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Returns the leaf value stored at `key`.
    pub fn value(&self, key: &str) -> Option<String> {
        self.read_entries().get(&normalize(key)).cloned()
    }

    /// Returns every leaf key currently stored.
    pub fn keys(&self) -> Vec<String> {
        self.read_entries().keys().cloned().collect()
    }

    fn check_available(&self) -> Result<(), RemoteError> {
        if self.inner.unavailable.load(Ordering::SeqCst) {
            return Err(RemoteError::Transport("memory store unavailable".to_string()));
        }
        Ok(())
    }

    fn read_entries(&self) -> std::sync::RwLockReadGuard<'_, BTreeMap<String, String>> {
        match self.inner.entries.read() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    fn write_entries(&self) -> std::sync::RwLockWriteGuard<'_, BTreeMap<String, String>> {
        match self.inner.entries.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    fn publish(&self, event: RemoteEvent) {
        let _ = self.inner.events.send(event);
    }
}

#[async_trait]
impl RemoteStore for MemoryStore {
    async fn set(&self, key: &str, value: &str) -> Result<(), RemoteError> {
        self.check_available()?;
        let key = normalize(key);

        self.write_entries().insert(key.clone(), value.to_string());

        self.publish(RemoteEvent {
            action: RemoteAction::Set,
            key,
            value: Some(value.to_string()),
        });
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<RemoteNode, RemoteError> {
        self.check_available()?;
        let key = normalize(key);
        let entries = self.read_entries();

        if let Some(value) = entries.get(&key) {
            return Ok(RemoteNode::leaf(key, value.clone()));
        }

        let prefix = dir_prefix(&key);
        let mut root = RemoteNode::directory(key.clone(), Vec::new());
        let mut found = false;

        for (entry_key, value) in entries.range(prefix.clone()..) {
            let Some(relative) = entry_key.strip_prefix(&prefix) else {
                break;
            };
            found = true;
            insert_leaf(&mut root, relative, value);
        }

        if found || key == "/" {
            Ok(root)
        } else {
            Err(RemoteError::NotFound(key))
        }
    }

    async fn delete(&self, key: &str, recursive: bool) -> Result<(), RemoteError> {
        self.check_available()?;
        let key = normalize(key);

        let removed = {
            let mut entries = self.write_entries();
            let mut removed = entries.remove(&key).is_some();

            if recursive {
                let prefix = dir_prefix(&key);
                let before = entries.len();
                entries.retain(|k, _| !k.starts_with(&prefix));
                removed |= entries.len() != before;
            }

            removed
        };

        if !removed {
            return Err(RemoteError::NotFound(key));
        }

        self.publish(RemoteEvent {
            action: RemoteAction::Delete,
            key,
            value: None,
        });
        Ok(())
    }

    async fn watch(&self, key: &str) -> Result<RemoteWatch, RemoteError> {
        self.check_available()?;
        let key = normalize(key);
        let prefix = dir_prefix(&key);

        let stream = BroadcastStream::new(self.inner.events.subscribe()).filter_map(move |item| {
            let result = match item {
                Ok(event) if event.key == key || event.key.starts_with(&prefix) => Some(Ok(event)),
                Ok(_) => None,
                Err(BroadcastStreamRecvError::Lagged(missed)) => Some(Err(
                    RemoteError::Transport(format!("watch lagged, {missed} events dropped")),
                )),
            };
            futures::future::ready(result)
        });

        Ok(stream.boxed())
    }
}

fn normalize(key: &str) -> String {
    let trimmed = key.trim_matches('/');
    format!("/{trimmed}")
}

fn dir_prefix(key: &str) -> String {
    if key.ends_with('/') {
        key.to_string()
    } else {
        format!("{key}/")
    }
}

/// Places a leaf below `root`, creating directory nodes on the way.
fn insert_leaf(root: &mut RemoteNode, relative: &str, value: &str) {
    let mut current = root;
    let mut segments = relative.split('/').peekable();

    while let Some(segment) = segments.next() {
        let child_key = format!("{}/{}", current.key.trim_end_matches('/'), segment);
        let is_leaf = segments.peek().is_none();

        let position = current.nodes.iter().position(|n| n.key == child_key);
        let index = match position {
            Some(index) => index,
            None => {
                current.nodes.push(if is_leaf {
                    RemoteNode::leaf(child_key, value)
                } else {
                    RemoteNode::directory(child_key, Vec::new())
                });
                current.nodes.len() - 1
            }
        };

        current = &mut current.nodes[index];
    }
}
