//! Unit tests for the merge engine.

use serde_json::json;

use super::{merge, merge_all, merge_layers};
use crate::{sources::SourceLayer, value::ConfigValue};

fn tree(value: serde_json::Value) -> ConfigValue {
    ConfigValue::from(value)
}

#[test]
fn merges_empty_mappings() {
    assert_eq!(merge(&tree(json!({})), &tree(json!({}))), tree(json!({})));
}

#[test]
fn merges_flat_mappings() {
    let merged = merge(&tree(json!({"a": 1, "b": 20})), &tree(json!({"b": 2, "c": 3})));

    assert_eq!(merged, tree(json!({"a": 1, "b": 2, "c": 3})));
}

#[test]
fn deep_merge_preserves_untouched_siblings() {
    let base = tree(json!({"k1": {"k2": {"k3": "x"}, "a2": "y"}}));
    let overlay = tree(json!({"k1": {"k2": {"k3": "z"}}}));

    let merged = merge(&base, &overlay);

    assert_eq!(merged, tree(json!({"k1": {"k2": {"k3": "z"}, "a2": "y"}})));
}

#[test]
fn sequences_are_replaced_not_merged() {
    let merged = merge(&tree(json!({"arr": [1, 2]})), &tree(json!({"arr": [9]})));

    assert_eq!(merged, tree(json!({"arr": [9]})));
}

#[test]
fn type_mismatches_take_the_overlay() {
    assert_eq!(
        merge(&tree(json!({"a": {"b": 1}})), &tree(json!({"a": 10}))),
        tree(json!({"a": 10}))
    );
    assert_eq!(
        merge(&tree(json!({"a": 10})), &tree(json!({"a": {"b": 1}}))),
        tree(json!({"a": {"b": 1}}))
    );
    assert_eq!(
        merge(&tree(json!({"a": {"b": 1}})), &tree(json!({"a": [10, 20]}))),
        tree(json!({"a": [10, 20]}))
    );
    assert_eq!(
        merge(&tree(json!({"a": [10, 20]})), &tree(json!({"a": {"b": 1}}))),
        tree(json!({"a": {"b": 1}}))
    );
}

#[test]
fn null_overlay_does_not_override() {
    let merged = merge(
        &tree(json!({"a": 1, "b": {"c": 2}})),
        &tree(json!({"a": null, "b": {"c": null}, "d": null})),
    );

    assert_eq!(merged, tree(json!({"a": 1, "b": {"c": 2}, "d": null})));
}

#[test]
fn does_not_mutate_operands() {
    let left = tree(json!({"a": {"b": 1, "c": 2}}));
    let right = tree(json!({"a": {"b": 20, "d": 30}}));
    let left_before = left.clone();
    let right_before = right.clone();

    let merged = merge(&left, &right);

    assert_eq!(left, left_before);
    assert_eq!(right, right_before);
    assert_eq!(merged, tree(json!({"a": {"b": 20, "c": 2, "d": 30}})));
}

#[test]
fn later_layers_take_precedence() {
    let layers = vec![
        SourceLayer::new("default", tree(json!({"a": 1, "only_default": true}))),
        SourceLayer::new("environment", tree(json!({"a": 2}))),
        SourceLayer::new("runtime", tree(json!({"a": 3}))),
    ];

    let merged = merge_layers(&layers);

    assert_eq!(merged, tree(json!({"a": 3, "only_default": true})));
}

#[test]
fn merging_nothing_yields_empty_mapping() {
    assert_eq!(merge_all(std::iter::empty()), ConfigValue::empty());
    assert_eq!(merge_layers(&[]), ConfigValue::empty());
}
