//! Shape classification of guest aggregates.
//!
//! Decides how a guest value should appear on the host side by inspecting
//! its capabilities, in this order, first match wins:
//!
//! 1. callable (a function, or a `__call` metamethod) → [`Shape::Function`]
//! 2. `__pairs` metamethod → [`Shape::Object`]
//! 3. `__len` metamethod → [`Shape::Array`]
//! 4. plain table: a non-empty table whose entry count equals its raw
//!    border length is an [`Shape::Array`], anything else an [`Shape::Object`]
//!
//! Classification only reads metatables and raw table layout; it never runs
//! guest code.

use guest_runtime::{GuestState, GuestValue};

/// Host-side representation chosen for a guest aggregate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Shape {
    /// Host function proxying the guest value
    Function,
    /// Map-like host object
    Object,
    /// Index-based host array
    Array,
}

/// Classify a guest value
///
/// Returns `None` for scalars and for userdata without any capability,
/// which the converter turns into `undefined`.
///
/// # Examples
///
/// ```
/// use bridge::{classify, Shape};
/// use guest_runtime::{GuestState, GuestValue, Table};
///
/// let state = GuestState::new();
/// let seq = Table::from_sequence(vec![10.into(), 20.into(), 30.into()]);
/// assert_eq!(classify(&state, &GuestValue::Table(seq)), Some(Shape::Array));
/// assert_eq!(classify(&state, &GuestValue::Table(Default::default())), Some(Shape::Object));
/// assert_eq!(classify(&state, &GuestValue::from(1.0)), None);
/// ```
pub fn classify(state: &GuestState, value: &GuestValue) -> Option<Shape> {
    if let GuestValue::Function(_) = value {
        return Some(Shape::Function);
    }
    if state.has_meta_field(value, "__call") {
        return Some(Shape::Function);
    }
    if state.has_meta_field(value, "__pairs") {
        return Some(Shape::Object);
    }
    if state.has_meta_field(value, "__len") {
        return Some(Shape::Array);
    }
    match value {
        GuestValue::Table(t) => {
            let n = t.count();
            if n > 0 && n == t.raw_len() {
                Some(Shape::Array)
            } else {
                Some(Shape::Object)
            }
        }
        _ => None,
    }
}
