//! Unit tests for the host object model

use host_types::{HostError, HostKind, HostValue, MAX_ARRAY_LENGTH};

// ============================================================================
// Kind queries
// ============================================================================

#[test]
fn test_kind_of_primitives() {
    assert_eq!(HostValue::Undefined.kind(), HostKind::Undefined);
    assert_eq!(HostValue::Null.kind(), HostKind::Null);
    assert_eq!(HostValue::boolean(false).kind(), HostKind::Boolean);
    assert_eq!(HostValue::number(0.0).kind(), HostKind::Number);
    assert_eq!(HostValue::string("").kind(), HostKind::String);
}

#[test]
fn test_array_is_object_kind() {
    let arr = HostValue::array();
    assert_eq!(arr.kind(), HostKind::Object);
    assert!(arr.is_array());
    assert_eq!(arr.type_of(), "object");
}

#[test]
fn test_function_kind() {
    let f = HostValue::function(|_, _| Ok(HostValue::Undefined));
    assert_eq!(f.kind(), HostKind::Function);
    assert_eq!(f.type_of(), "function");
}

// ============================================================================
// Property access
// ============================================================================

#[test]
fn test_array_with_length_has_holes() {
    let arr = HostValue::array_with_length(3).unwrap();
    assert_eq!(arr.array_length(), 3);
    for i in 0..3 {
        assert!(arr.get_index(i).is_undefined());
    }
}

#[test]
fn test_array_with_length_past_max_fails() {
    let err = HostValue::array_with_length(MAX_ARRAY_LENGTH + 1).unwrap_err();
    assert_eq!(err, HostError::range_error("Invalid array length"));
    assert!(HostValue::array_with_length(usize::MAX).is_err());
}

#[test]
fn test_array_huge_string_key_is_not_an_index() {
    let arr = HostValue::array();
    arr.set("4294967295", HostValue::number(1.0));
    arr.set("99999999999999999999999", HostValue::number(1.0));
    assert_eq!(arr.array_length(), 0);
    assert!(arr.get("4294967295").is_undefined());
}

#[test]
fn test_array_string_index_access() {
    let arr = HostValue::array_from(vec![HostValue::number(10.0), HostValue::number(20.0)]);
    assert_eq!(arr.get("1"), HostValue::number(20.0));
    arr.set("0", HostValue::string("a"));
    assert_eq!(arr.get_index(0), HostValue::string("a"));
    assert!(arr.get("foo").is_undefined());
}

#[test]
fn test_object_keys() {
    let obj = HostValue::object();
    obj.set("a", HostValue::number(1.0));
    obj.set("b", HostValue::number(2.0));
    let mut keys = obj.keys();
    keys.sort();
    assert_eq!(keys, vec!["a".to_string(), "b".to_string()]);
}

#[test]
fn test_set_on_primitive_is_ignored() {
    let n = HostValue::number(1.0);
    n.set("x", HostValue::number(2.0));
    assert!(n.get("x").is_undefined());
}

// ============================================================================
// Calls
// ============================================================================

#[test]
fn test_call_receives_this_and_args() {
    let f = HostValue::function(|this, args| {
        let base = this.get("base").as_number().unwrap_or(0.0);
        let sum: f64 = args.iter().filter_map(|a| a.as_number()).sum();
        Ok(HostValue::number(base + sum))
    });
    let receiver = HostValue::object();
    receiver.set("base", HostValue::number(100.0));
    let out = f
        .call(receiver, vec![HostValue::number(1.0), HostValue::number(2.0)])
        .unwrap();
    assert_eq!(out, HostValue::number(103.0));
}

#[test]
fn test_call_non_function_is_type_error() {
    let err = HostValue::object().call(HostValue::Undefined, vec![]).unwrap_err();
    assert!(err.message.starts_with("TypeError"));
}

#[test]
fn test_call_propagates_error() {
    let f = HostValue::function(|_, _| Err(HostError::range_error("too deep")));
    let err = f.call(HostValue::Undefined, vec![]).unwrap_err();
    assert_eq!(err, HostError::range_error("too deep"));
}

// ============================================================================
// Equality
// ============================================================================

#[test]
fn test_equality_by_value_and_identity() {
    assert_eq!(HostValue::string("é"), HostValue::string("é"));
    assert_ne!(HostValue::number(f64::NAN), HostValue::number(f64::NAN));
    assert_ne!(HostValue::object(), HostValue::object());
    let a = HostValue::array();
    assert_eq!(a, a.clone());
}
