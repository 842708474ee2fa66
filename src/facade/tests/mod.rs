//! Unit tests for the load facade and the live view.
//! Files come from an in-memory reader; the remote store is in-process.

#![allow(clippy::panic)]

use std::{
    collections::HashMap,
    io,
    path::{Path, PathBuf},
    sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    },
    time::Duration,
};

use async_trait::async_trait;
use futures::StreamExt;
use serde::Deserialize;
use serde_json::json;

use crate::{
    ConflabError,
    facade::{Conflab, ConfigChange, LoadOptions, ViewPublisher, diff_values},
    remote::{MemoryStore, RemoteStore, SyncState},
    sources::SourceReader,
    value::ConfigValue,
};

#[derive(Default)]
struct CountingReader {
    files: HashMap<PathBuf, Vec<u8>>,
    reads: AtomicUsize,
}

impl CountingReader {
    fn with(mut self, path: &str, content: serde_json::Value) -> Self {
        self.files
            .insert(PathBuf::from(path), content.to_string().into_bytes());
        self
    }
}

#[async_trait]
impl SourceReader for CountingReader {
    async fn read(&self, path: &Path) -> io::Result<Option<Vec<u8>>> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        Ok(self.files.get(path).cloned())
    }
}

fn options() -> LoadOptions {
    LoadOptions {
        config_path: Some(PathBuf::from("/app")),
        env: Some("test".to_string()),
        hostname: Some("box".to_string()),
        root_dir: Some(PathBuf::from("/nonexistent-root")),
        argv: Some(Vec::new()),
        ..LoadOptions::default()
    }
}

fn value(json: serde_json::Value) -> ConfigValue {
    ConfigValue::from(json)
}

#[test]
fn diff_reports_added_removed_and_changed_leaves() {
    let old = value(json!({"a": 1, "b": {"c": 2, "d": 3}, "list": [1]}));
    let new = value(json!({"a": 1, "b": {"c": 5}, "e": true, "list": [1, 2]}));

    let changes = diff_values(&old, &new);
    let summary: Vec<(&str, Option<serde_json::Value>, Option<serde_json::Value>)> = changes
        .iter()
        .map(|c| {
            (
                c.path.as_str(),
                c.old_value.clone().map(serde_json::Value::from),
                c.new_value.clone().map(serde_json::Value::from),
            )
        })
        .collect();

    assert_eq!(
        summary,
        vec![
            ("b.c", Some(json!(2)), Some(json!(5))),
            ("b.d", Some(json!(3)), None),
            ("e", None, Some(json!(true))),
            ("list", Some(json!([1])), Some(json!([1, 2]))),
        ]
    );
}

#[test]
fn diff_of_identical_trees_is_empty() {
    let tree = value(json!({"a": {"b": [1, 2]}}));
    assert!(diff_values(&tree, &tree.clone()).is_empty());
}

#[test]
fn change_extract_reports_removed_fields() {
    let change = ConfigChange {
        path: "db.port".to_string(),
        old_value: Some(ConfigValue::from(5432i64)),
        new_value: None,
        timestamp: std::time::Instant::now(),
    };

    assert!(matches!(
        change.extract::<u16>(),
        Err(ConflabError::Conversion { .. })
    ));
    assert_eq!(change.as_string(), None);
}

#[tokio::test]
async fn load_merges_layers_in_order() {
    let reader = CountingReader::default()
        .with("/app/default.json", json!({"a": 1, "keep": "default"}))
        .with("/app/test.json", json!({"a": 2}))
        .with("/app/runtime.json", json!({"a": 3}));

    let live = Conflab::new()
        .with_reader(Arc::new(reader))
        .load(LoadOptions {
            config: Some(value(json!({"a": 0, "inline": true}))),
            ..options()
        })
        .await
        .unwrap();

    assert_eq!(live.extract::<i64>("a").unwrap(), 3);
    assert_eq!(live.extract::<String>("keep").unwrap(), "default");
    assert!(live.extract::<bool>("inline").unwrap());
    assert_eq!(live.environment(), "test");
    assert_eq!(live.sync_state(), SyncState::Disabled);
    assert!(live.remote().is_none());
    assert_eq!(
        live.layers().iter().map(|l| l.name.as_str()).collect::<Vec<_>>(),
        vec!["opts", "default", "environment", "runtime"]
    );
}

#[tokio::test]
async fn repeated_load_reuses_the_first_result() {
    let reader = Arc::new(CountingReader::default().with("/app/default.json", json!({"a": 1})));
    let conflab = Conflab::new().with_reader(reader.clone());

    let first = conflab.load(options()).await.unwrap();
    let reads = reader.reads.load(Ordering::SeqCst);
    let second = conflab.load(options()).await.unwrap();

    assert_eq!(reader.reads.load(Ordering::SeqCst), reads);
    assert_eq!(first.current(), second.current());
}

#[tokio::test]
async fn failed_load_is_remembered() {
    let reader = Arc::new(CountingReader {
        files: HashMap::from([(PathBuf::from("/app/default.json"), b"{oops".to_vec())]),
        ..CountingReader::default()
    });
    let conflab = Conflab::new().with_reader(reader);

    assert!(matches!(
        conflab.load(options()).await,
        Err(ConflabError::Parse { .. })
    ));
    assert!(matches!(
        conflab.load(options()).await,
        Err(ConflabError::LoadFailed(_))
    ));
}

#[tokio::test]
async fn extract_reports_shape_mismatch() {
    #[derive(Debug, Deserialize, PartialEq)]
    struct Db {
        host: String,
        port: u16,
    }

    let reader = CountingReader::default()
        .with("/app/default.json", json!({"db": {"host": "h", "port": 5432}}));
    let live = Conflab::new()
        .with_reader(Arc::new(reader))
        .load(options())
        .await
        .unwrap();

    assert_eq!(
        live.extract::<Db>("db").unwrap(),
        Db {
            host: "h".to_string(),
            port: 5432
        }
    );
    assert!(matches!(
        live.extract::<u16>("db.host"),
        Err(ConflabError::Conversion { .. })
    ));
    assert!(matches!(
        live.get_by_path("db.missing"),
        Err(ConflabError::InvalidPath(_))
    ));
}

#[tokio::test]
async fn publish_notifies_matching_subscribers() {
    let publisher = ViewPublisher::new(value(json!({"db": {"host": "a"}, "log": "info"})));
    let live = crate::facade::LiveConfig::new(
        publisher.clone(),
        Vec::new(),
        "test".to_string(),
        None,
        Arc::new(tokio::sync::watch::channel(SyncState::Disabled).0),
        tokio_util::sync::CancellationToken::new(),
    );

    let mut db_changes = Box::pin(live.subscribe_to_path("db.*"));
    let mut snapshots = live.watch();
    assert_eq!(snapshots.next().await, Some(live.current()));

    publisher.publish(value(json!({"db": {"host": "b"}, "log": "debug"})));

    let change = db_changes.next().await.unwrap();
    assert_eq!(change.path, "db.host");
    assert_eq!(change.as_string().as_deref(), Some("b"));

    let view = snapshots.next().await.unwrap();
    assert_eq!(view.get("log").and_then(ConfigValue::as_str), Some("debug"));
}

#[tokio::test]
async fn changed_resolves_on_next_publish() {
    let publisher = ViewPublisher::new(value(json!({"a": 1})));
    let live = crate::facade::LiveConfig::new(
        publisher.clone(),
        Vec::new(),
        "test".to_string(),
        None,
        Arc::new(tokio::sync::watch::channel(SyncState::Disabled).0),
        tokio_util::sync::CancellationToken::new(),
    );

    let waiter = tokio::spawn({
        let live = live.clone();
        async move { live.changed().await }
    });
    tokio::task::yield_now().await;

    publisher.publish(value(json!({"a": 2})));

    let view = tokio::time::timeout(Duration::from_secs(1), waiter)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(view.get("a").and_then(ConfigValue::as_i64), Some(2));
}

#[tokio::test]
async fn remote_layer_overrides_files() {
    let store = MemoryStore::new();
    store
        .set("/conflab/svc/config/test/db/host", "remote")
        .await
        .unwrap();

    let reader = CountingReader::default().with(
        "/app/default.json",
        json!({"etcd": {"hosts": ["127.0.0.1:4001"]}, "db": {"host": "file", "port": 1}}),
    );

    let live = Conflab::new()
        .with_reader(Arc::new(reader))
        .with_connector(Arc::new(store.clone()))
        .load(LoadOptions {
            service_name: Some("svc".to_string()),
            heartbeat_interval: Some(Duration::from_millis(20)),
            ..options()
        })
        .await
        .unwrap();

    assert_eq!(live.extract::<String>("db.host").unwrap(), "remote");
    assert_eq!(live.extract::<i64>("db.port").unwrap(), 1);
    assert_eq!(live.sync_state(), SyncState::Watching);
    assert!(store.value("/conflab/svc/config/test/__").is_some());
    assert!(store.value("/conflab/svc/files/test/merged").is_some());

    live.stop();
    assert_eq!(live.sync_state(), SyncState::Stopped);
}

#[tokio::test]
async fn missing_service_name_keeps_local_view() {
    let reader = CountingReader::default()
        .with("/app/default.json", json!({"etcd": {}, "a": 1}));
    let store = MemoryStore::new();

    let live = Conflab::new()
        .with_reader(Arc::new(reader))
        .with_connector(Arc::new(store.clone()))
        .load(options())
        .await;

    // CONFLAB_SERVICE may name a service in the test environment.
    if std::env::var("CONFLAB_SERVICE").is_err() {
        let live = live.unwrap();
        assert_eq!(live.sync_state(), SyncState::Disabled);
        assert!(store.keys().is_empty());
    }
}

#[tokio::test]
async fn unreachable_store_fails_the_load() {
    let store = MemoryStore::new();
    store.set_unavailable(true);
    let reader = CountingReader::default().with("/app/default.json", json!({"etcd": {}}));

    let result = Conflab::new()
        .with_reader(Arc::new(reader))
        .with_connector(Arc::new(store))
        .load(LoadOptions {
            service_name: Some("svc".to_string()),
            ..options()
        })
        .await;

    assert!(matches!(
        result,
        Err(ConflabError::RemoteUnavailable { .. })
    ));
}

#[tokio::test]
async fn stop_before_remote_stage_fails_with_stopped() {
    let reader = CountingReader::default().with("/app/default.json", json!({"etcd": {}}));
    let conflab = Conflab::new()
        .with_reader(Arc::new(reader))
        .with_connector(Arc::new(MemoryStore::new()));

    conflab.stop();
    let result = conflab
        .load(LoadOptions {
            service_name: Some("svc".to_string()),
            ..options()
        })
        .await;

    assert!(matches!(result, Err(ConflabError::Stopped)));
}
