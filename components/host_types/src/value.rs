//! Host value representation
//!
//! This module provides the value type of the host object system: primitives
//! are stored inline, objects, arrays and functions are shared references.

use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use crate::error::{HostError, HostResult};

/// Largest length a host array can have (`2^32 - 1`)
pub const MAX_ARRAY_LENGTH: usize = 4_294_967_295;

/// Signature of a native host function: `(this, args) -> result`
pub type NativeFn = dyn Fn(HostValue, Vec<HostValue>) -> HostResult<HostValue>;

/// Internal object data
#[derive(Debug, Clone, Default)]
pub struct ObjectData {
    /// Object properties map
    pub properties: HashMap<String, HostValue>,
}

/// Internal array data
#[derive(Debug, Clone, Default)]
pub struct ArrayData {
    /// Array elements
    pub elements: Vec<HostValue>,
}

/// Internal function data
///
/// The callable itself is immutable; named properties live in their own
/// cell so a function can be tagged while it is running.
pub struct FunctionData {
    /// The function implementation
    pub func: Box<NativeFn>,
    /// Named properties attached to the function object
    pub properties: RefCell<HashMap<String, HostValue>>,
}

impl fmt::Debug for FunctionData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FunctionData")
            .field("properties", &self.properties.borrow().keys().collect::<Vec<_>>())
            .finish()
    }
}

/// The runtime kind of a host value, as the host's own type query reports it.
///
/// Arrays report [`HostKind::Object`], matching `typeof`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HostKind {
    /// `undefined`
    Undefined,
    /// `null`
    Null,
    /// `boolean`
    Boolean,
    /// `number`
    Number,
    /// `string`
    String,
    /// Any object-like value that is not callable
    Object,
    /// Callable object
    Function,
}

/// Host value representation
#[derive(Debug, Clone)]
pub enum HostValue {
    /// undefined
    Undefined,
    /// null
    Null,
    /// Boolean value
    Boolean(bool),
    /// Number (IEEE 754 double)
    Number(f64),
    /// String value
    String(String),
    /// Object with properties
    Object(Rc<RefCell<ObjectData>>),
    /// Array
    Array(Rc<RefCell<ArrayData>>),
    /// Function object
    Function(Rc<FunctionData>),
}

impl HostValue {
    /// Create undefined value
    pub fn undefined() -> Self {
        HostValue::Undefined
    }

    /// Create null value
    pub fn null() -> Self {
        HostValue::Null
    }

    /// Create boolean value
    pub fn boolean(v: bool) -> Self {
        HostValue::Boolean(v)
    }

    /// Create number value
    pub fn number(v: f64) -> Self {
        HostValue::Number(v)
    }

    /// Create string value
    pub fn string(s: impl Into<String>) -> Self {
        HostValue::String(s.into())
    }

    /// Create empty object
    pub fn object() -> Self {
        HostValue::Object(Rc::new(RefCell::new(ObjectData::default())))
    }

    /// Create empty array
    pub fn array() -> Self {
        HostValue::Array(Rc::new(RefCell::new(ArrayData::default())))
    }

    /// Create an array of `len` undefined slots (`new Array(len)`)
    ///
    /// Fails with a RangeError past [`MAX_ARRAY_LENGTH`] or when the slots
    /// cannot be allocated.
    pub fn array_with_length(len: usize) -> HostResult<Self> {
        if len > MAX_ARRAY_LENGTH {
            return Err(HostError::range_error("Invalid array length"));
        }
        let mut elements = Vec::new();
        elements
            .try_reserve_exact(len)
            .map_err(|_| HostError::range_error("Invalid array length"))?;
        elements.resize(len, HostValue::Undefined);
        Ok(HostValue::array_from(elements))
    }

    /// Create array from values
    pub fn array_from(values: Vec<HostValue>) -> Self {
        HostValue::Array(Rc::new(RefCell::new(ArrayData { elements: values })))
    }

    /// Create a function value backed by a native handler
    pub fn function<F>(func: F) -> Self
    where
        F: Fn(HostValue, Vec<HostValue>) -> HostResult<HostValue> + 'static,
    {
        HostValue::Function(Rc::new(FunctionData {
            func: Box::new(func),
            properties: RefCell::new(HashMap::new()),
        }))
    }

    /// Runtime kind of this value
    pub fn kind(&self) -> HostKind {
        match self {
            HostValue::Undefined => HostKind::Undefined,
            HostValue::Null => HostKind::Null,
            HostValue::Boolean(_) => HostKind::Boolean,
            HostValue::Number(_) => HostKind::Number,
            HostValue::String(_) => HostKind::String,
            HostValue::Object(_) | HostValue::Array(_) => HostKind::Object,
            HostValue::Function(_) => HostKind::Function,
        }
    }

    /// Check if value is undefined
    pub fn is_undefined(&self) -> bool {
        matches!(self, HostValue::Undefined)
    }

    /// Check if value is null
    pub fn is_null(&self) -> bool {
        matches!(self, HostValue::Null)
    }

    /// Check if value is boolean
    pub fn is_boolean(&self) -> bool {
        matches!(self, HostValue::Boolean(_))
    }

    /// Check if value is number
    pub fn is_number(&self) -> bool {
        matches!(self, HostValue::Number(_))
    }

    /// Check if value is string
    pub fn is_string(&self) -> bool {
        matches!(self, HostValue::String(_))
    }

    /// Check if value is a plain object
    pub fn is_object(&self) -> bool {
        matches!(self, HostValue::Object(_))
    }

    /// Check if value is array
    pub fn is_array(&self) -> bool {
        matches!(self, HostValue::Array(_))
    }

    /// Check if value is a function
    pub fn is_function(&self) -> bool {
        matches!(self, HostValue::Function(_))
    }

    /// Check if value is a reference type (object, array or function)
    pub fn is_reference(&self) -> bool {
        self.object_identity().is_some()
    }

    /// Get the object pointer identity
    ///
    /// Returns Some(address) for reference types, None for primitives.
    pub fn object_identity(&self) -> Option<usize> {
        match self {
            HostValue::Object(rc) => Some(Rc::as_ptr(rc) as *const () as usize),
            HostValue::Array(rc) => Some(Rc::as_ptr(rc) as *const () as usize),
            HostValue::Function(rc) => Some(Rc::as_ptr(rc) as *const () as usize),
            HostValue::Undefined
            | HostValue::Null
            | HostValue::Boolean(_)
            | HostValue::Number(_)
            | HostValue::String(_) => None,
        }
    }

    /// Whether both values are the very same host reference
    pub fn same_ref(&self, other: &HostValue) -> bool {
        match (self, other) {
            (HostValue::Object(a), HostValue::Object(b)) => Rc::ptr_eq(a, b),
            (HostValue::Array(a), HostValue::Array(b)) => Rc::ptr_eq(a, b),
            (HostValue::Function(a), HostValue::Function(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }

    /// Get as boolean
    pub fn as_boolean(&self) -> Option<bool> {
        match self {
            HostValue::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    /// Get as number
    pub fn as_number(&self) -> Option<f64> {
        match self {
            HostValue::Number(n) => Some(*n),
            _ => None,
        }
    }

    /// Get as string
    pub fn as_string(&self) -> Option<String> {
        match self {
            HostValue::String(s) => Some(s.clone()),
            _ => None,
        }
    }

    /// Get array length
    pub fn array_length(&self) -> usize {
        match self {
            HostValue::Array(arr) => arr.borrow().elements.len(),
            _ => 0,
        }
    }

    /// Get a named property
    ///
    /// Missing properties read as `undefined`. Arrays answer `length` and
    /// canonical index keys.
    pub fn get(&self, key: &str) -> HostValue {
        match self {
            HostValue::Object(obj) => obj
                .borrow()
                .properties
                .get(key)
                .cloned()
                .unwrap_or(HostValue::Undefined),
            HostValue::Array(arr) => {
                if key == "length" {
                    return HostValue::Number(arr.borrow().elements.len() as f64);
                }
                match array_index(key) {
                    Some(index) => self.get_index(index),
                    None => HostValue::Undefined,
                }
            }
            HostValue::Function(func) => func
                .properties
                .borrow()
                .get(key)
                .cloned()
                .unwrap_or(HostValue::Undefined),
            _ => HostValue::Undefined,
        }
    }

    /// Set a named property
    ///
    /// Setting on a primitive is silently ignored, as in sloppy mode. Arrays
    /// only take index keys, and a write that cannot grow the array is
    /// dropped.
    pub fn set(&self, key: &str, value: HostValue) {
        match self {
            HostValue::Object(obj) => {
                obj.borrow_mut().properties.insert(key.to_string(), value);
            }
            HostValue::Array(_) => {
                if let Some(index) = array_index(key) {
                    let _ = self.set_index(index, value);
                }
            }
            HostValue::Function(func) => {
                func.properties.borrow_mut().insert(key.to_string(), value);
            }
            _ => {}
        }
    }

    /// Check if object has own property
    pub fn has_own(&self, key: &str) -> bool {
        match self {
            HostValue::Object(obj) => obj.borrow().properties.contains_key(key),
            HostValue::Function(func) => func.properties.borrow().contains_key(key),
            _ => false,
        }
    }

    /// Own property names of an object
    pub fn keys(&self) -> Vec<String> {
        match self {
            HostValue::Object(obj) => obj.borrow().properties.keys().cloned().collect(),
            HostValue::Array(arr) => (0..arr.borrow().elements.len())
                .map(|i| i.to_string())
                .collect(),
            _ => Vec::new(),
        }
    }

    /// Read an array element; out of range reads as `undefined`
    pub fn get_index(&self, index: usize) -> HostValue {
        match self {
            HostValue::Array(arr) => arr
                .borrow()
                .elements
                .get(index)
                .cloned()
                .unwrap_or(HostValue::Undefined),
            _ => self.get(&index.to_string()),
        }
    }

    /// Write an array element, growing the array with `undefined` holes
    ///
    /// Growing past [`MAX_ARRAY_LENGTH`], or beyond what can be allocated,
    /// fails with a RangeError and leaves the array unchanged.
    pub fn set_index(&self, index: usize, value: HostValue) -> HostResult<()> {
        match self {
            HostValue::Array(arr) => {
                let len = index
                    .checked_add(1)
                    .filter(|&len| len <= MAX_ARRAY_LENGTH)
                    .ok_or_else(|| HostError::range_error("Invalid array length"))?;
                let mut arr = arr.borrow_mut();
                if len > arr.elements.len() {
                    let additional = len - arr.elements.len();
                    arr.elements
                        .try_reserve_exact(additional)
                        .map_err(|_| HostError::range_error("Invalid array length"))?;
                    arr.elements.resize(len, HostValue::Undefined);
                }
                arr.elements[index] = value;
            }
            _ => self.set(&index.to_string(), value),
        }
        Ok(())
    }

    /// Invoke a function value with a receiver and arguments
    pub fn call(&self, this: HostValue, args: Vec<HostValue>) -> HostResult<HostValue> {
        match self {
            HostValue::Function(func) => {
                let func = Rc::clone(func);
                (func.func)(this, args)
            }
            other => Err(HostError::type_error(format!(
                "{} is not a function",
                other.type_of()
            ))),
        }
    }

    /// Convert to string representation
    ///
    /// An array reached again while it is being joined prints as the empty
    /// string.
    pub fn to_js_string(&self) -> String {
        self.to_js_string_guarded(&mut Vec::new())
    }

    fn to_js_string_guarded(&self, joining: &mut Vec<usize>) -> String {
        match self {
            HostValue::Undefined => "undefined".to_string(),
            HostValue::Null => "null".to_string(),
            HostValue::Boolean(b) => b.to_string(),
            HostValue::Number(n) => number_to_string(*n),
            HostValue::String(s) => s.clone(),
            HostValue::Object(_) => "[object Object]".to_string(),
            HostValue::Array(arr) => {
                let id = Rc::as_ptr(arr) as *const () as usize;
                if joining.contains(&id) {
                    return String::new();
                }
                joining.push(id);
                // snapshot so element conversion never holds the borrow
                let elements = arr.borrow().elements.clone();
                let joined = elements
                    .iter()
                    .map(|e| match e {
                        HostValue::Undefined | HostValue::Null => String::new(),
                        other => other.to_js_string_guarded(joining),
                    })
                    .collect::<Vec<_>>()
                    .join(",");
                joining.pop();
                joined
            }
            HostValue::Function(_) => "function() { [native code] }".to_string(),
        }
    }

    /// Get the type of the value (as `typeof` would return)
    pub fn type_of(&self) -> &'static str {
        match self {
            HostValue::Undefined => "undefined",
            HostValue::Null => "object", // typeof null === "object"
            HostValue::Boolean(_) => "boolean",
            HostValue::Number(_) => "number",
            HostValue::String(_) => "string",
            HostValue::Object(_) => "object",
            HostValue::Array(_) => "object",
            HostValue::Function(_) => "function",
        }
    }

    /// Strict equality: primitives by value, references by identity
    pub fn equals(&self, other: &HostValue) -> bool {
        match (self, other) {
            (HostValue::Undefined, HostValue::Undefined) => true,
            (HostValue::Null, HostValue::Null) => true,
            (HostValue::Boolean(a), HostValue::Boolean(b)) => a == b,
            (HostValue::Number(a), HostValue::Number(b)) => a == b,
            (HostValue::String(a), HostValue::String(b)) => a == b,
            _ => self.same_ref(other),
        }
    }
}

/// Index named by an array key: a decimal below [`MAX_ARRAY_LENGTH`]
fn array_index(key: &str) -> Option<usize> {
    key.parse::<usize>()
        .ok()
        .filter(|&index| index < MAX_ARRAY_LENGTH)
}

fn number_to_string(n: f64) -> String {
    if n.is_nan() {
        "NaN".to_string()
    } else if n.is_infinite() {
        if n > 0.0 {
            "Infinity".to_string()
        } else {
            "-Infinity".to_string()
        }
    } else if n == n.trunc() && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        n.to_string()
    }
}

impl PartialEq for HostValue {
    fn eq(&self, other: &Self) -> bool {
        self.equals(other)
    }
}

impl fmt::Display for HostValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_js_string())
    }
}

impl Default for HostValue {
    fn default() -> Self {
        HostValue::Undefined
    }
}

impl From<bool> for HostValue {
    fn from(v: bool) -> Self {
        HostValue::Boolean(v)
    }
}

impl From<f64> for HostValue {
    fn from(v: f64) -> Self {
        HostValue::Number(v)
    }
}

impl From<&str> for HostValue {
    fn from(v: &str) -> Self {
        HostValue::String(v.to_string())
    }
}

impl From<String> for HostValue {
    fn from(v: String) -> Self {
        HostValue::String(v)
    }
}
