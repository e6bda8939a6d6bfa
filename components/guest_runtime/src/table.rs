//! Guest tables.
//!
//! A table keeps its entries in a dense vector with a hash index from
//! normalized key to slot. Removing an entry swaps the last slot into its
//! place, so enumeration order is an implementation detail and callers must
//! not depend on it.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use crate::error::{GuestError, GuestResult};
use crate::value::GuestValue;

/// Hashable normalization of a guest key
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum TableKey {
    Boolean(bool),
    Number(u64),
    String(String),
    Ref(usize),
}

impl TableKey {
    fn from_value(key: &GuestValue) -> GuestResult<Self> {
        match key {
            GuestValue::Nil => Err(GuestError::InvalidKey("nil")),
            GuestValue::Boolean(b) => Ok(TableKey::Boolean(*b)),
            GuestValue::Number(n) if n.is_nan() => Err(GuestError::InvalidKey("NaN")),
            // -0 and +0 are the same key
            GuestValue::Number(n) => Ok(TableKey::Number((*n + 0.0).to_bits())),
            GuestValue::String(s) => Ok(TableKey::String(s.clone())),
            other => Ok(TableKey::Ref(other.ref_addr().unwrap_or_default())),
        }
    }
}

#[derive(Default)]
struct TableData {
    entries: Vec<(GuestValue, GuestValue)>,
    index: HashMap<TableKey, usize>,
    metatable: Option<Table>,
}

/// A guest table reference
#[derive(Clone, Default)]
pub struct Table(Rc<RefCell<TableData>>);

impl Table {
    /// Create an empty table
    pub fn new() -> Self {
        Table::default()
    }

    /// Create a sequence `{v1, v2, ...}` keyed from 1
    pub fn from_sequence<I>(values: I) -> Self
    where
        I: IntoIterator<Item = GuestValue>,
    {
        let table = Table::new();
        for (i, value) in values.into_iter().enumerate() {
            // integer keys are always valid
            let _ = table.raw_set(GuestValue::Number((i + 1) as f64), value);
        }
        table
    }

    /// Create a table from key/value pairs; nil keys are skipped
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<GuestValue>,
        V: Into<GuestValue>,
    {
        let table = Table::new();
        for (k, v) in pairs {
            let _ = table.raw_set(k.into(), v.into());
        }
        table
    }

    /// Read a field without invoking metamethods
    pub fn raw_get(&self, key: &GuestValue) -> GuestValue {
        let Ok(key) = TableKey::from_value(key) else {
            return GuestValue::Nil;
        };
        let data = self.0.borrow();
        data.index
            .get(&key)
            .map(|&slot| data.entries[slot].1.clone())
            .unwrap_or_default()
    }

    /// Read a string-keyed field without invoking metamethods
    pub fn raw_get_str(&self, key: &str) -> GuestValue {
        self.raw_get(&GuestValue::string(key))
    }

    /// Write a field without invoking metamethods; assigning nil removes it
    pub fn raw_set(&self, key: GuestValue, value: GuestValue) -> GuestResult<()> {
        let normalized = TableKey::from_value(&key)?;
        let mut data = self.0.borrow_mut();
        match (data.index.get(&normalized).copied(), value.is_nil()) {
            (Some(slot), false) => data.entries[slot].1 = value,
            (Some(slot), true) => {
                data.index.remove(&normalized);
                data.entries.swap_remove(slot);
                if slot < data.entries.len() {
                    let moved = TableKey::from_value(&data.entries[slot].0)?;
                    data.index.insert(moved, slot);
                }
            }
            (None, false) => {
                let slot = data.entries.len();
                data.entries.push((key, value));
                data.index.insert(normalized, slot);
            }
            (None, true) => {}
        }
        Ok(())
    }

    /// Write a string-keyed field without invoking metamethods
    pub fn raw_set_str(&self, key: &str, value: GuestValue) {
        // string keys are always valid
        let _ = self.raw_set(GuestValue::string(key), value);
    }

    /// Number of non-nil entries
    pub fn count(&self) -> usize {
        self.0.borrow().entries.len()
    }

    /// Length of the contiguous non-nil prefix `1..=n` (the raw border)
    pub fn raw_len(&self) -> usize {
        let data = self.0.borrow();
        let mut n = 0usize;
        while data
            .index
            .contains_key(&TableKey::Number(((n + 1) as f64).to_bits()))
        {
            n += 1;
        }
        n
    }

    /// Snapshot of all entries in enumeration order
    pub fn entries(&self) -> Vec<(GuestValue, GuestValue)> {
        self.0.borrow().entries.clone()
    }

    /// Current metatable
    pub fn metatable(&self) -> Option<Table> {
        self.0.borrow().metatable.clone()
    }

    /// Replace the metatable
    pub fn set_metatable(&self, metatable: Option<Table>) {
        self.0.borrow_mut().metatable = metatable;
    }

    /// Identity comparison
    pub fn ptr_eq(&self, other: &Table) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    pub(crate) fn addr(&self) -> usize {
        Rc::as_ptr(&self.0) as *const () as usize
    }
}
