use super::{RemoteAction, RemoteEvent, RemoteKeys, RemoteNode};
use crate::value::{ConfigValue, KeyPath, Scalar};

/// A remote change translated into the configuration tree's terms.
#[derive(Debug, Clone, PartialEq)]
pub struct WatchEvent {
    /// What happened
    pub action: RemoteAction,
    /// Location relative to the config root
    pub path: KeyPath,
    /// New leaf value for `Set`
    pub value: Option<Scalar>,
}

impl WatchEvent {
    /// Translates a raw event; `None` for the canary, keys outside the
    /// root and sets that carry no value.
    pub fn from_remote(event: &RemoteEvent, keys: &RemoteKeys) -> Option<Self> {
        let path = KeyPath::parse(keys.relative(&event.key)?);
        if path.is_empty() {
            return None;
        }

        let value = match event.action {
            RemoteAction::Set => Some(Scalar::String(event.value.clone()?)),
            RemoteAction::Delete => None,
        };

        Some(Self {
            action: event.action,
            path,
            value,
        })
    }

    /// Applies the change to the remote layer.
    pub fn apply(&self, tree: &mut ConfigValue) {
        match (&self.action, &self.value) {
            (RemoteAction::Set, Some(value)) => {
                tree.set_at_path(&self.path, ConfigValue::Scalar(value.clone()));
            }
            (RemoteAction::Set, None) => {}
            (RemoteAction::Delete, _) => {
                tree.remove_at_path(&self.path);
            }
        }
    }
}

/// Converts a recursive fetch of the config root into a tree.
///
/// Directories become mappings and leaves become string scalars; node
/// names containing `.` nest further. The canary is left out.
pub fn tree_from_node(node: &RemoteNode, keys: &RemoteKeys) -> ConfigValue {
    let mut tree = ConfigValue::empty();
    collect_leaves(node, keys, &mut tree);
    tree
}

fn collect_leaves(node: &RemoteNode, keys: &RemoteKeys, tree: &mut ConfigValue) {
    if node.dir {
        for child in &node.nodes {
            collect_leaves(child, keys, tree);
        }
        return;
    }

    let (Some(relative), Some(value)) = (keys.relative(&node.key), &node.value) else {
        return;
    };

    let path = KeyPath::parse(relative);
    if !path.is_empty() {
        tree.set_at_path(&path, ConfigValue::string(value.clone()));
    }
}
