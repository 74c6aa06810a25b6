//! Query Node Invariant Tests
//!
//! - Dictionary round trip preserves evaluation for every node variant
//! - Empty `and_` is true, empty `or_` is false
//! - Coercion failures evaluate to false, never panic
//! - Unknown tags are rejected on decode

use chrono::{NaiveDate, TimeZone, Utc};
use deltastore::canonical::Record;
use deltastore::query::{QueryError, QueryNode, Timestamp, ValueType};
use serde_json::{json, Value};

// =============================================================================
// Helper Functions
// =============================================================================

fn record(v: Value) -> Record {
    v.as_object().cloned().unwrap()
}

fn sample_records() -> Vec<Record> {
    vec![
        record(json!({})),
        record(json!({"name": "Alice", "age": 30, "score": 1.0000000000001})),
        record(json!({"name": "bob", "age": "25", "tags": ["x", "y"], "active": "TRUE"})),
        record(json!({"name": null, "age": 40.5, "bio": "likes rust", "created": "2024-03-01T10:00:00+00:00"})),
        record(json!({"address": {"city": "Kyoto", "zip": 60100}, "created": "2023-12-31T23:00:00"})),
    ]
}

fn every_variant() -> Vec<QueryNode> {
    let cutoff = Timestamp::from(Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap());
    let naive = NaiveDate::from_ymd_opt(2024, 1, 1)
        .unwrap()
        .and_hms_opt(0, 0, 0)
        .unwrap();
    vec![
        QueryNode::and(vec![
            QueryNode::equals("name", json!("Alice")),
            QueryNode::greater_than("age", json!(18)),
        ]),
        QueryNode::or(vec![
            QueryNode::less_than("age", json!(26)).with_value_type(ValueType::Int),
            QueryNode::starts_with("name", "b"),
        ]),
        QueryNode::not(QueryNode::is_in("name", vec![Value::Null, json!("bob")])),
        QueryNode::not_equals("age", json!(30)),
        QueryNode::greater_or_equal("age", json!("30")).with_value_type(ValueType::FloatStrict),
        QueryNode::less_or_equal("created", cutoff),
        QueryNode::greater_than("created", naive),
        QueryNode::equals("score", json!(1.0)).with_value_type(ValueType::FloatEpsilon),
        QueryNode::equals("active", json!(true)).with_value_type(ValueType::Boolean),
        QueryNode::equals("address.zip", json!("60100")).with_value_type(ValueType::String),
        QueryNode::matches_regex("bio", r"\brust$"),
        QueryNode::contains("tags", json!("y")),
        QueryNode::contains("bio", json!("rust")),
        QueryNode::not_in("address.city", vec![json!("Osaka")]),
        QueryNode::ends_with("name", "ce"),
    ]
}

// =============================================================================
// Round Trip Tests
// =============================================================================

/// Decoding an encoded node evaluates identically on every record.
#[test]
fn test_round_trip_preserves_evaluation() {
    for node in every_variant() {
        let restored = QueryNode::from_dict(&node.to_dict()).unwrap();
        for r in sample_records() {
            assert_eq!(
                restored.evaluate(&r),
                node.evaluate(&r),
                "node {:?} on {:?}",
                node,
                r
            );
        }
    }
}

/// The restored tree is structurally equal to the encoded one.
#[test]
fn test_round_trip_preserves_structure() {
    let tree = QueryNode::and(every_variant());
    let restored = QueryNode::from_dict(&tree.to_dict()).unwrap();
    assert_eq!(restored, tree);
}

/// A decoded tree can be encoded again to the same dictionary.
#[test]
fn test_encoding_is_stable() {
    let tree = QueryNode::or(every_variant());
    let first = tree.to_dict();
    let second = QueryNode::from_dict(&first).unwrap().to_dict();
    assert_eq!(first, second);
}

// =============================================================================
// Logical Identity Tests
// =============================================================================

/// `and_([])` is true and `or_([])` is false for any record.
#[test]
fn test_empty_logical_nodes() {
    for r in sample_records() {
        assert!(QueryNode::and(vec![]).evaluate(&r));
        assert!(!QueryNode::or(vec![]).evaluate(&r));
    }
}

// =============================================================================
// Coercion Tests
// =============================================================================

/// floatEpsilon treats a 1e-13 difference as equal and 1e-5 as unequal.
#[test]
fn test_float_epsilon_threshold() {
    let node = QueryNode::equals("v", json!(1.0)).with_value_type(ValueType::FloatEpsilon);
    assert!(node.evaluate(&record(json!({"v": 1.0000000000001}))));
    assert!(!node.evaluate(&record(json!({"v": 1.00001}))));
}

/// A timestamp literal forces the datetime value type.
#[test]
fn test_timestamp_literal_forces_datetime() {
    let ts = Timestamp::parse("2024-01-01T00:00:00Z").unwrap();
    let node = QueryNode::equals("at", ts).with_value_type(ValueType::Int);
    assert_eq!(node.to_dict()["vType"], json!("datetime_"));
}

/// Aware and naive timestamps are unequal and have no ordering.
#[test]
fn test_mixed_timestamp_kinds() {
    let aware = Timestamp::parse("2024-01-01T00:00:00+00:00").unwrap();
    let r = record(json!({"at": "2024-01-01T00:00:00"}));
    assert!(!QueryNode::equals("at", aware).evaluate(&r));
    assert!(QueryNode::not_equals("at", aware).evaluate(&r));
    assert!(!QueryNode::greater_than("at", aware).evaluate(&r));
    assert!(!QueryNode::less_or_equal("at", aware).evaluate(&r));
}

/// Ordering comparisons under boolean are always false.
#[test]
fn test_boolean_ordering_undefined() {
    let r = record(json!({"flag": "true"}));
    for node in [
        QueryNode::greater_than("flag", json!(false)),
        QueryNode::less_than("flag", json!(false)),
        QueryNode::greater_or_equal("flag", json!(true)),
        QueryNode::less_or_equal("flag", json!(true)),
    ] {
        assert!(!node.with_value_type(ValueType::Boolean).evaluate(&r));
    }
}

/// Unparsable values make typed comparisons false in both polarities.
#[test]
fn test_unparsable_values_are_false() {
    let r = record(json!({"n": "abc"}));
    for vt in [ValueType::Int, ValueType::FloatStrict, ValueType::Datetime] {
        assert!(!QueryNode::equals("n", json!(1)).with_value_type(vt).evaluate(&r));
        assert!(!QueryNode::not_equals("n", json!(1)).with_value_type(vt).evaluate(&r));
        assert!(!QueryNode::greater_than("n", json!(1)).with_value_type(vt).evaluate(&r));
    }
}

// =============================================================================
// Decode Error Tests
// =============================================================================

/// Unknown node type tags are a hard error.
#[test]
fn test_unknown_node_type_rejected() {
    let src = record(json!({"type": "between_", "field": "a", "version": "1"}));
    assert_eq!(
        QueryNode::from_dict(&src).unwrap_err(),
        QueryError::UnknownNodeType("between_".into())
    );
}

/// Unknown value type tags are a hard error.
#[test]
fn test_unknown_value_type_rejected() {
    let src = record(json!({
        "type": "equals_",
        "field": "a",
        "value": 1,
        "vType": "decimal_",
        "version": "2"
    }));
    assert_eq!(
        QueryNode::from_dict(&src).unwrap_err(),
        QueryError::UnknownValueType("decimal_".into())
    );
}

/// Missing required fields are reported with the node type.
#[test]
fn test_missing_field_rejected() {
    let src = record(json!({"type": "regex_", "field": "a", "version": "1"}));
    let err = QueryNode::from_dict(&src).unwrap_err();
    assert_eq!(err.code(), "DELTA_MALFORMED_DICT");
    assert!(err.to_string().contains("pattern"));
}
