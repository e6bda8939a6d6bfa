//! Interpreter state: value stack, registry and the metamethod-aware
//! operations the bridge drives.
//!
//! [`GuestState`] is a cheap handle. Every operation borrows the internals
//! only for as long as it touches them, so closures may re-enter the state
//! freely while a call is in progress.

use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

use log::warn;

use crate::error::{GuestError, GuestResult};
use crate::table::Table;
use crate::value::GuestValue;

/// Default limit on nested guest calls
pub const DEFAULT_MAX_CALL_DEPTH: usize = 200;

struct StateInner {
    stack: RefCell<Vec<GuestValue>>,
    registry: Table,
    depth: Cell<usize>,
    max_call_depth: usize,
}

/// Handle to a guest interpreter state
#[derive(Clone)]
pub struct GuestState {
    inner: Rc<StateInner>,
}

/// Non-owning handle to a guest interpreter state
#[derive(Clone)]
pub struct WeakGuestState {
    inner: Weak<StateInner>,
}

impl WeakGuestState {
    /// Upgrade to a usable handle if the state is still alive
    pub fn upgrade(&self) -> Option<GuestState> {
        self.inner.upgrade().map(|inner| GuestState { inner })
    }
}

/// Decrements the call depth when a call frame unwinds
struct DepthGuard<'a>(&'a Cell<usize>);

impl Drop for DepthGuard<'_> {
    fn drop(&mut self) {
        self.0.set(self.0.get() - 1);
    }
}

impl Default for GuestState {
    fn default() -> Self {
        Self::new()
    }
}

impl GuestState {
    /// Create a fresh state with an empty stack and registry
    pub fn new() -> Self {
        Self::with_max_call_depth(DEFAULT_MAX_CALL_DEPTH)
    }

    /// Create a state that fails calls nested deeper than `max_call_depth`
    pub fn with_max_call_depth(max_call_depth: usize) -> Self {
        GuestState {
            inner: Rc::new(StateInner {
                stack: RefCell::new(Vec::new()),
                registry: Table::new(),
                depth: Cell::new(0),
                max_call_depth,
            }),
        }
    }

    /// Non-owning handle, for closures stored outside the state
    pub fn downgrade(&self) -> WeakGuestState {
        WeakGuestState {
            inner: Rc::downgrade(&self.inner),
        }
    }

    /// Whether both handles refer to the same state
    pub fn ptr_eq(&self, other: &GuestState) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    // ========================================================================
    // Value stack
    // ========================================================================

    /// Push a value onto the stack
    pub fn push(&self, value: impl Into<GuestValue>) {
        self.inner.stack.borrow_mut().push(value.into());
    }

    /// Pop the top value
    pub fn pop(&self) -> GuestResult<GuestValue> {
        self.inner
            .stack
            .borrow_mut()
            .pop()
            .ok_or(GuestError::StackUnderflow {
                needed: 1,
                available: 0,
            })
    }

    /// Pop the top `n` values, returned bottom-first
    pub fn pop_n(&self, n: usize) -> GuestResult<Vec<GuestValue>> {
        let mut stack = self.inner.stack.borrow_mut();
        if stack.len() < n {
            return Err(GuestError::StackUnderflow {
                needed: n,
                available: stack.len(),
            });
        }
        let at = stack.len() - n;
        Ok(stack.split_off(at))
    }

    /// Number of values on the stack
    pub fn top(&self) -> usize {
        self.inner.stack.borrow().len()
    }

    /// Copy of the value `offset` slots below the top (0 is the top)
    pub fn peek(&self, offset: usize) -> Option<GuestValue> {
        let stack = self.inner.stack.borrow();
        stack.len().checked_sub(offset + 1).map(|i| stack[i].clone())
    }

    /// Call the function below `nargs` arguments on the stack
    ///
    /// Pops the function and its arguments, then pushes exactly `nresults`
    /// values, padding with nil or dropping extras.
    pub fn call(&self, nargs: usize, nresults: usize) -> GuestResult<()> {
        let mut popped = self.pop_n(nargs + 1)?;
        let args = popped.split_off(1);
        let func = popped.pop().unwrap_or_default();
        let mut results = self.call_value(&func, args)?;
        results.resize(nresults, GuestValue::Nil);
        self.inner.stack.borrow_mut().extend(results);
        Ok(())
    }

    // ========================================================================
    // Registry
    // ========================================================================

    /// Read a named registry slot
    pub fn registry_get(&self, key: &str) -> GuestValue {
        self.inner.registry.raw_get_str(key)
    }

    /// Write a named registry slot
    pub fn registry_set(&self, key: &str, value: GuestValue) {
        self.inner.registry.raw_set_str(key, value);
    }

    // ========================================================================
    // Metatables
    // ========================================================================

    /// Metatable of a table or userdata
    pub fn get_metatable(&self, value: &GuestValue) -> Option<Table> {
        match value {
            GuestValue::Table(t) => t.metatable(),
            GuestValue::UserData(u) => u.metatable(),
            _ => None,
        }
    }

    /// Set the metatable of a table or userdata
    pub fn set_metatable(&self, value: &GuestValue, metatable: Option<Table>) -> GuestResult<()> {
        match value {
            GuestValue::Table(t) => t.set_metatable(metatable),
            GuestValue::UserData(u) => u.set_metatable(metatable),
            other => {
                return Err(GuestError::runtime(format!(
                    "cannot set metatable of a {} value",
                    other.type_name()
                )))
            }
        }
        Ok(())
    }

    /// Raw lookup of `event` in the value's metatable; nil if absent
    pub fn get_meta_field(&self, value: &GuestValue, event: &str) -> GuestValue {
        self.get_metatable(value)
            .map(|mt| mt.raw_get_str(event))
            .unwrap_or_default()
    }

    /// Whether the value's metatable defines `event`
    pub fn has_meta_field(&self, value: &GuestValue, event: &str) -> bool {
        !self.get_meta_field(value, event).is_nil()
    }

    // ========================================================================
    // Calls
    // ========================================================================

    /// Call a value with arguments, honoring `__call`
    pub fn call_value(&self, func: &GuestValue, args: Vec<GuestValue>) -> GuestResult<Vec<GuestValue>> {
        match func {
            GuestValue::Function(f) => {
                let depth = &self.inner.depth;
                if depth.get() >= self.inner.max_call_depth {
                    warn!("guest call depth limit {} reached", self.inner.max_call_depth);
                    return Err(GuestError::CallDepthExceeded(self.inner.max_call_depth));
                }
                depth.set(depth.get() + 1);
                let _guard = DepthGuard(depth);
                f.invoke(self, args)
            }
            other => {
                let handler = self.get_meta_field(other, "__call");
                if handler.is_nil() {
                    return Err(GuestError::NotCallable(other.type_name()));
                }
                let mut full = Vec::with_capacity(args.len() + 1);
                full.push(other.clone());
                full.extend(args);
                self.call_value(&handler, full)
            }
        }
    }

    /// Call a value and keep only its first result
    pub fn call_single(&self, func: &GuestValue, args: Vec<GuestValue>) -> GuestResult<GuestValue> {
        Ok(self.call_value(func, args)?.into_iter().next().unwrap_or_default())
    }

    // ========================================================================
    // Indexing
    // ========================================================================

    /// `obj[key]`, honoring `__index`
    pub fn get(&self, obj: &GuestValue, key: &GuestValue) -> GuestResult<GuestValue> {
        if let GuestValue::Table(t) = obj {
            let raw = t.raw_get(key);
            if !raw.is_nil() {
                return Ok(raw);
            }
        }
        let handler = self.get_meta_field(obj, "__index");
        match (&handler, obj) {
            (GuestValue::Nil, GuestValue::Table(_)) => Ok(GuestValue::Nil),
            (GuestValue::Nil, other) => Err(GuestError::NotIndexable(other.type_name())),
            (GuestValue::Function(_), _) => self.call_single(&handler, vec![obj.clone(), key.clone()]),
            _ => self.get(&handler, key),
        }
    }

    /// `obj[key] = value`, honoring `__newindex`
    pub fn set(&self, obj: &GuestValue, key: GuestValue, value: GuestValue) -> GuestResult<()> {
        let handler = self.get_meta_field(obj, "__newindex");
        if let GuestValue::Table(t) = obj {
            if handler.is_nil() || !t.raw_get(&key).is_nil() {
                return t.raw_set(key, value);
            }
        }
        match &handler {
            GuestValue::Nil => Err(GuestError::NotIndexable(obj.type_name())),
            GuestValue::Function(_) => {
                self.call_value(&handler, vec![obj.clone(), key, value])?;
                Ok(())
            }
            _ => self.set(&handler, key, value),
        }
    }

    // ========================================================================
    // Length, enumeration, tostring
    // ========================================================================

    /// `#obj`, honoring `__len`
    pub fn len(&self, obj: &GuestValue) -> GuestResult<GuestValue> {
        let handler = self.get_meta_field(obj, "__len");
        if !handler.is_nil() {
            return self.call_single(&handler, vec![obj.clone()]);
        }
        match obj {
            GuestValue::String(s) => Ok(GuestValue::Number(s.len() as f64)),
            GuestValue::Table(t) => Ok(GuestValue::Number(t.raw_len() as f64)),
            other => Err(GuestError::runtime(format!(
                "attempt to get length of a {} value",
                other.type_name()
            ))),
        }
    }

    /// All key/value pairs `pairs(obj)` would produce, honoring `__pairs`
    pub fn pairs(&self, obj: &GuestValue) -> GuestResult<Vec<(GuestValue, GuestValue)>> {
        let handler = self.get_meta_field(obj, "__pairs");
        if handler.is_nil() {
            return match obj {
                GuestValue::Table(t) => Ok(t.entries()),
                other => Err(GuestError::runtime(format!(
                    "bad argument to 'pairs' (table expected, got {})",
                    other.type_name()
                ))),
            };
        }

        let mut triple = self.call_value(&handler, vec![obj.clone()])?.into_iter();
        let iter = triple.next().unwrap_or_default();
        let invariant = triple.next().unwrap_or_default();
        let mut control = triple.next().unwrap_or_default();

        let mut out = Vec::new();
        loop {
            let mut step = self
                .call_value(&iter, vec![invariant.clone(), control.clone()])?
                .into_iter();
            let key = step.next().unwrap_or_default();
            if key.is_nil() {
                break;
            }
            let value = step.next().unwrap_or_default();
            control = key.clone();
            out.push((key, value));
        }
        Ok(out)
    }

    /// `tostring(obj)`, honoring `__tostring`
    pub fn tostring(&self, obj: &GuestValue) -> GuestResult<String> {
        let handler = self.get_meta_field(obj, "__tostring");
        if handler.is_nil() {
            return Ok(obj.to_string());
        }
        match self.call_single(&handler, vec![obj.clone()])? {
            GuestValue::String(s) => Ok(s),
            _ => Err(GuestError::runtime("'__tostring' must return a string")),
        }
    }
}
