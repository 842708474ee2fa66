//! Unit tests for source loading.
//! Files are served from memory; no filesystem access.

#![allow(clippy::panic)]

use std::{
    collections::HashMap,
    io,
    path::{Path, PathBuf},
};

use async_trait::async_trait;
use serde_json::json;

use crate::{
    ConflabError,
    facade::LoadOptions,
    sources::{
        AdditionalFileResolver, ConfigPaths, ExportPolicy, FileCandidate, SourceLoader,
        SourceReader, parse_document,
    },
    value::ConfigValue,
};

#[derive(Default)]
struct MemoryReader {
    files: HashMap<PathBuf, Vec<u8>>,
}

impl MemoryReader {
    fn with(mut self, path: &str, content: &str) -> Self {
        self.files
            .insert(PathBuf::from(path), content.as_bytes().to_vec());
        self
    }
}

#[async_trait]
impl SourceReader for MemoryReader {
    async fn read(&self, path: &Path) -> io::Result<Option<Vec<u8>>> {
        Ok(self.files.get(path).cloned())
    }
}

fn paths() -> ConfigPaths {
    ConfigPaths {
        library_dir: Some(PathBuf::from("/lib")),
        config_dir: PathBuf::from("/app"),
        environment: "test".to_string(),
        hostname: Some("box".to_string()),
        root_dir: PathBuf::from("/"),
    }
}

fn options() -> LoadOptions {
    LoadOptions {
        argv: Some(Vec::new()),
        ..LoadOptions::default()
    }
}

fn candidate(name: &str, path: &str) -> FileCandidate {
    FileCandidate {
        name: name.to_string(),
        path: PathBuf::from(path),
    }
}

#[test]
fn candidates_follow_precedence_order() {
    let names: Vec<String> = paths().candidates().into_iter().map(|c| c.name).collect();

    assert_eq!(
        names,
        [
            "lib-default",
            "lib-environment",
            "default",
            "environment",
            "runtime",
            "hostname-box"
        ]
    );
}

#[test]
fn library_layers_need_a_library_dir() {
    let paths = ConfigPaths {
        library_dir: None,
        hostname: None,
        ..paths()
    };

    let files: Vec<PathBuf> = paths.candidates().into_iter().map(|c| c.path).collect();

    assert_eq!(
        files,
        [
            PathBuf::from("/app/default.json"),
            PathBuf::from("/app/test.json"),
            PathBuf::from("/app/runtime.json"),
        ]
    );
}

#[test]
fn parse_strips_byte_order_mark() {
    let value = parse_document(b"\xEF\xBB\xBF{\"a\": 1}", Path::new("/x.json")).unwrap();

    assert_eq!(value, ConfigValue::from(json!({"a": 1})));
}

#[test]
fn parse_error_carries_location() {
    let err = parse_document(b"{ nope", Path::new("/does/not/exist/bad.json")).unwrap_err();

    match err {
        ConflabError::Parse { location, .. } => {
            assert_eq!(location, PathBuf::from("/does/not/exist/bad.json"));
        }
        other => panic!("expected parse error, got {other:?}"),
    }
}

#[test]
fn export_policy_defaults_by_layer_kind() {
    let plain = ConfigValue::from(json!({"a": 1}));

    assert!(ExportPolicy::is_eligible(&plain, false));
    assert!(!ExportPolicy::is_eligible(&plain, true));
}

#[test]
fn export_policy_explicit_marker_wins() {
    let opted_in = ConfigValue::from(json!({"CF_export": true}));
    let opted_out = ConfigValue::from(json!({"CF_export": false}));
    let legacy = ConfigValue::from(json!({"CF_exportToEtcd": true}));
    let garbage = ConfigValue::from(json!({"CF_export": "yes"}));

    assert!(ExportPolicy::is_eligible(&opted_in, true));
    assert!(!ExportPolicy::is_eligible(&opted_out, false));
    assert!(ExportPolicy::is_eligible(&legacy, true));
    assert!(!ExportPolicy::is_eligible(&garbage, true));
}

#[tokio::test]
async fn includes_follow_their_parent_in_declaration_order() {
    let reader = MemoryReader::default()
        .with(
            "/app/default.json",
            r#"{"a": "parent", "CF_additionalFiles": ["one.json", "sub/two.json"]}"#,
        )
        .with("/app/one.json", r#"{"a": "one", "CF_additionalFiles": "three.json"}"#)
        .with("/app/three.json", r#"{"a": "three"}"#)
        .with("/app/sub/two.json", r#"{"a": "two", "CF_export": true}"#);

    let layers = AdditionalFileResolver::new(&reader)
        .resolve(&candidate("default", "/app/default.json"))
        .await
        .unwrap();

    let summary: Vec<(&str, bool, bool)> = layers
        .iter()
        .map(|l| (l.name.as_str(), l.is_additional, l.export_eligible))
        .collect();
    assert_eq!(
        summary,
        [
            ("default", false, true),
            ("default-one", true, false),
            ("default-one-three", true, false),
            ("default-two", true, true),
        ]
    );
    assert_eq!(
        layers[3].origin.as_deref(),
        Some(Path::new("/app/sub/two.json"))
    );
}

#[tokio::test]
async fn absolute_includes_are_used_as_is() {
    let reader = MemoryReader::default()
        .with("/app/default.json", r#"{"CF_additionalFiles": "/shared/extra.json"}"#)
        .with("/shared/extra.json", r#"{"serviceKey1_1": "additional"}"#);

    let layers = AdditionalFileResolver::new(&reader)
        .resolve(&candidate("default", "/app/default.json"))
        .await
        .unwrap();

    assert_eq!(layers.len(), 2);
    assert_eq!(layers[1].name, "default-extra");
}

#[tokio::test]
async fn missing_includes_are_skipped() {
    let reader = MemoryReader::default()
        .with("/app/default.json", r#"{"CF_additionalFiles": ["gone.json"]}"#);

    let layers = AdditionalFileResolver::new(&reader)
        .resolve(&candidate("default", "/app/default.json"))
        .await
        .unwrap();

    assert_eq!(layers.len(), 1);
}

#[tokio::test]
async fn circular_includes_are_rejected() {
    let reader = MemoryReader::default()
        .with("/app/a.json", r#"{"CF_additionalFiles": "b.json"}"#)
        .with("/app/b.json", r#"{"CF_additionalFiles": "a.json"}"#);

    let err = AdditionalFileResolver::new(&reader)
        .resolve(&candidate("default", "/app/a.json"))
        .await
        .unwrap_err();

    match err {
        ConflabError::CircularInclude { chain } => {
            assert_eq!(chain, "a.json -> b.json -> a.json");
        }
        other => panic!("expected circular include, got {other:?}"),
    }
}

#[tokio::test]
async fn loader_orders_inline_files_argv_and_overrides() {
    let reader = MemoryReader::default()
        .with("/lib/default.json", r#"{"lib": 1}"#)
        .with("/app/default.json", r#"{"a": 1}"#)
        .with("/app/test.json", r#"{"a": 2}"#)
        .with("/app/runtime.json", r#"{"a": 3}"#)
        .with("/app/box.json", r#"{"host": true}"#);
    let options = LoadOptions {
        config: Some(ConfigValue::from(json!({"inline": true}))),
        overrides: Some(ConfigValue::from(json!({"a": 5}))),
        argv: Some(vec!["--a=4".to_string()]),
        ..LoadOptions::default()
    };
    let paths = paths();

    let layers = SourceLoader::new(&reader, &paths)
        .load(&options)
        .await
        .unwrap();

    let names: Vec<&str> = layers.iter().map(|l| l.name.as_str()).collect();
    assert_eq!(
        names,
        [
            "opts",
            "lib-default",
            "default",
            "environment",
            "runtime",
            "hostname-box",
            "argv",
            "overrides"
        ]
    );
}

#[tokio::test]
async fn loader_skips_empty_inline_layers() {
    let reader = MemoryReader::default();
    let options = LoadOptions {
        config: Some(ConfigValue::empty()),
        ..options()
    };
    let paths = paths();

    let layers = SourceLoader::new(&reader, &paths)
        .load(&options)
        .await
        .unwrap();

    assert!(layers.is_empty());
}

#[tokio::test]
async fn loader_aborts_on_malformed_file() {
    let reader = MemoryReader::default()
        .with("/app/default.json", r#"{"a": 1}"#)
        .with("/app/runtime.json", "{ broken");
    let paths = paths();

    let err = SourceLoader::new(&reader, &paths)
        .load(&options())
        .await
        .unwrap_err();

    assert!(matches!(err, ConflabError::Parse { location, .. } if location.ends_with("runtime.json")));
}
