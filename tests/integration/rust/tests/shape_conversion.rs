//! Shape Conversion Integration Tests
//!
//! Guest aggregates are classified and deep-converted into host arrays and
//! objects, honoring capability metamethods.

use std::collections::HashSet;

use bridge::{classify, Shape};
use guest_runtime::{GuestValue, Table};
use host_types::HostValue;
use integration_tests::fixtures::{new_bridge, table_with_meta};

/// Test: {10, 20, 30} becomes a host array of length 3
#[test]
fn test_sequence_to_array() {
    let (state, bridge) = new_bridge();
    let seq = GuestValue::Table(Table::from_sequence(vec![10.into(), 20.into(), 30.into()]));
    assert_eq!(classify(&state, &seq), Some(Shape::Array));

    let host = bridge.to_host(&seq);
    assert!(host.is_array());
    assert_eq!(host.array_length(), 3);
    assert_eq!(host.get_index(0), HostValue::number(10.0));
    assert_eq!(host.get_index(2), HostValue::number(30.0));
}

/// Test: keys {1, 2, 4} become an object with string keys
#[test]
fn test_gap_to_object() {
    let (state, bridge) = new_bridge();
    let gap = GuestValue::Table(Table::from_pairs(vec![(1, 10), (2, 20), (4, 40)]));
    assert_eq!(classify(&state, &gap), Some(Shape::Object));

    let host = bridge.to_host(&gap);
    assert!(host.is_object());
    let keys: HashSet<String> = host.keys().into_iter().collect();
    let expected: HashSet<String> = ["1", "2", "4"].iter().map(|s| s.to_string()).collect();
    assert_eq!(keys, expected);
    assert_eq!(host.get("4"), HostValue::number(40.0));
}

/// Test: an empty table becomes an empty object
#[test]
fn test_empty_table_to_object() {
    let (_state, bridge) = new_bridge();
    let host = bridge.to_host(&GuestValue::Table(Table::new()));
    assert!(host.is_object());
    assert!(host.keys().is_empty());
}

/// Test: a length hook reporting 0 still yields an (empty) array
#[test]
fn test_zero_length_hook_is_empty_array() {
    let (state, bridge) = new_bridge();
    let value = table_with_meta(
        "__len",
        GuestValue::function("len", |_, _| Ok(vec![0.into()])),
    );
    assert_eq!(classify(&state, &value), Some(Shape::Array));

    let host = bridge.to_host(&value);
    assert!(host.is_array());
    assert_eq!(host.array_length(), 0);
}

/// Test: array elements are read through __index, not raw access
#[test]
fn test_array_reads_through_index_hook() {
    let (_state, bridge) = new_bridge();
    let value = table_with_meta(
        "__len",
        GuestValue::function("len", |_, _| Ok(vec![3.into()])),
    );
    let mt = value.as_table().unwrap().metatable().unwrap();
    mt.raw_set_str(
        "__index",
        GuestValue::function("index", |_, args| {
            let i = args.get(1).and_then(|v| v.as_number()).unwrap_or(0.0);
            Ok(vec![GuestValue::Number(i * 100.0)])
        }),
    );

    let host = bridge.to_host(&value);
    assert_eq!(host.to_js_string(), "100,200,300");
}

/// Test: a __pairs hook drives object enumeration
#[test]
fn test_pairs_hook_to_object() {
    let (state, bridge) = new_bridge();
    let iter = GuestValue::function("iter", |_, args| {
        let control = args.get(1).cloned().unwrap_or_default();
        let next = match control.as_str() {
            None => vec!["x".into(), 1.into()],
            Some("x") => vec!["y".into(), 2.into()],
            _ => vec![GuestValue::Nil],
        };
        Ok(next)
    });
    let value = table_with_meta(
        "__pairs",
        GuestValue::function("pairs", move |_, args| {
            Ok(vec![iter.clone(), args[0].clone(), GuestValue::Nil])
        }),
    );
    // raw contents are ignored in favor of the hook
    value.as_table().unwrap().raw_set_str("hidden", true.into());
    assert_eq!(classify(&state, &value), Some(Shape::Object));

    let host = bridge.to_host(&value);
    assert_eq!(host.get("x"), HostValue::number(1.0));
    assert_eq!(host.get("y"), HostValue::number(2.0));
    assert!(!host.has_own("hidden"));
}

/// Test: {"a": 1, "b": 2} survives host conversion and guest read-back
#[test]
fn test_map_pairs_preserved() {
    let (state, bridge) = new_bridge();
    let map = GuestValue::Table(Table::from_pairs(vec![("a", 1), ("b", 2)]));

    let host = bridge.to_host(&map);
    let keys: HashSet<String> = host.keys().into_iter().collect();
    assert_eq!(keys.len(), 2);

    let back = bridge.to_guest(&host);
    for (key, value) in [("a", 1.0), ("b", 2.0)] {
        let seen = state.get(&back, &GuestValue::from(key)).unwrap();
        assert_eq!(seen, GuestValue::Number(value));
    }
}

/// Test: boolean keys are coerced to their string form
#[test]
fn test_boolean_keys_coerced() {
    let (_state, bridge) = new_bridge();
    let t = Table::new();
    t.raw_set(true.into(), "yes".into()).unwrap();
    let host = bridge.to_host(&GuestValue::Table(t));
    assert_eq!(host.get("true"), HostValue::string("yes"));
}

/// Test: a throwing length hook degrades to an empty array
#[test]
fn test_failing_length_hook_degrades() {
    let (_state, bridge) = new_bridge();
    let value = table_with_meta(
        "__len",
        GuestValue::function("len", |_, _| {
            Err(guest_runtime::GuestError::runtime("no length"))
        }),
    );
    let host = bridge.to_host(&value);
    assert!(host.is_array());
    assert_eq!(host.array_length(), 0);
}

/// Test: each conversion produces a fresh host aggregate
#[test]
fn test_conversion_copies_tables() {
    let (_state, bridge) = new_bridge();
    let t = GuestValue::Table(Table::from_sequence(vec![1.into()]));
    let a = bridge.to_host(&t);
    let b = bridge.to_host(&t);
    assert!(!a.same_ref(&b));
}
