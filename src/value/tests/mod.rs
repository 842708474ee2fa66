//! Unit tests for the value model and path addressing.
//! No filesystem or async dependencies.

#![allow(clippy::panic)]

use serde_json::json;

use crate::value::{ConfigValue, KeyPath, Scalar, path_matches};

fn tree(value: serde_json::Value) -> ConfigValue {
    ConfigValue::from(value)
}

#[test]
fn json_conversion_keeps_variants() {
    let value = tree(json!({"a": [1, 2.5, "x"], "b": null, "c": true}));

    let ConfigValue::Mapping(map) = &value else {
        panic!("expected mapping, got {}", value.type_str());
    };
    assert!(matches!(map.get("a"), Some(ConfigValue::Sequence(items)) if items.len() == 3));
    assert!(map.get("b").is_some_and(ConfigValue::is_null));
    assert_eq!(map.get("c").and_then(ConfigValue::as_bool), Some(true));

    let back = serde_json::Value::from(value);
    assert_eq!(back, json!({"a": [1, 2.5, "x"], "b": null, "c": true}));
}

#[test]
fn deserializes_from_plain_json() {
    let value: ConfigValue = serde_json::from_str(r#"{"port": 8080, "tags": ["a"]}"#).unwrap();

    assert_eq!(value.get("port").and_then(ConfigValue::as_i64), Some(8080));
    assert_eq!(
        value.get("tags"),
        Some(&ConfigValue::Sequence(vec![ConfigValue::string("a")]))
    );
}

#[test]
fn key_path_splits_on_dots_and_slashes() {
    let path = KeyPath::parse("/k1/k2.k3/");

    assert_eq!(path.segments(), ["k1", "k2", "k3"]);
    assert_eq!(path.to_string(), "k1.k2.k3");
    assert!(KeyPath::parse("").is_empty());
}

#[test]
fn navigate_reads_nested_values_and_sequence_indices() {
    let value = tree(json!({"server": {"hosts": ["a", "b"]}}));

    let host = value.navigate(&KeyPath::parse("server.hosts.1")).unwrap();
    assert_eq!(host.as_str(), Some("b"));
}

#[test]
fn navigate_reports_missing_keys() {
    let value = tree(json!({"server": {"port": 1}}));

    let err = value.navigate(&KeyPath::parse("server.host")).unwrap_err();
    assert!(err.to_string().contains("'host'"));

    let err = value.navigate(&KeyPath::parse("server.port.x")).unwrap_err();
    assert!(err.to_string().contains("number"));
}

#[test]
fn set_creates_intermediate_mappings() {
    let mut value = ConfigValue::empty();

    value.set_at_path(&KeyPath::parse("a.b.c"), ConfigValue::string("x"));

    assert_eq!(value, tree(json!({"a": {"b": {"c": "x"}}})));
}

#[test]
fn set_replaces_scalar_standing_in_the_way() {
    let mut value = tree(json!({"a": 1}));

    value.set_at_path(&KeyPath::parse("a.b"), ConfigValue::from(true));

    assert_eq!(value, tree(json!({"a": {"b": true}})));
}

#[test]
fn remove_only_touches_addressed_node() {
    let mut value = tree(json!({"a": {"b": 1, "c": 2}}));

    let removed = value.remove_at_path(&KeyPath::parse("a.b"));

    assert_eq!(removed, Some(ConfigValue::from(1i64)));
    assert_eq!(value, tree(json!({"a": {"c": 2}})));
    assert_eq!(value.remove_at_path(&KeyPath::parse("a.zzz.q")), None);
}

#[test]
fn display_prints_strings_raw_and_others_as_json() {
    assert_eq!(ConfigValue::string("hi").to_string(), "hi");
    assert_eq!(ConfigValue::Scalar(Scalar::Null).to_string(), "null");
    assert_eq!(tree(json!({"a": [1]})).to_string(), r#"{"a":[1]}"#);
}

#[test]
fn path_matching_supports_wildcards_and_prefixes() {
    assert!(path_matches("server.port", "server.port"));
    assert!(path_matches("server.port", "server.*"));
    assert!(path_matches("server.port", "server"));
    assert!(path_matches("server.port", "*"));
    assert!(!path_matches("server.port", "client.*"));
    assert!(!path_matches("server", "server.port"));
}
