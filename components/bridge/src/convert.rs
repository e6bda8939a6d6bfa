//! Value conversion across the boundary.
//!
//! `to_host` deep-converts guest aggregates: tables become fresh host arrays
//! or objects according to their [`Shape`], closures become proxies.
//! `to_guest` never recurses: host references always cross as foreign
//! handles. Both directions are total and never fail; anything that cannot
//! be represented degrades to `undefined` on the host side.

use guest_runtime::{GuestValue, GuestState};
use host_types::{HostValue, MAX_ARRAY_LENGTH};
use log::warn;

use crate::bridge::Bridge;
use crate::handle::{host_value_of, new_handle};
use crate::shape::{classify, Shape};

impl Bridge {
    /// Convert a guest value into a host value
    ///
    /// # Examples
    ///
    /// ```
    /// use bridge::Bridge;
    /// use guest_runtime::{GuestState, GuestValue, Table};
    ///
    /// let state = GuestState::new();
    /// let bridge = Bridge::install_default(&state).unwrap();
    ///
    /// let seq = Table::from_sequence(vec![10.into(), 20.into(), 30.into()]);
    /// let arr = bridge.to_host(&GuestValue::Table(seq));
    /// assert!(arr.is_array());
    /// assert_eq!(arr.array_length(), 3);
    /// assert_eq!(arr.get_index(2).as_number(), Some(30.0));
    /// ```
    pub fn to_host(&self, value: &GuestValue) -> HostValue {
        self.to_host_at(value, 0)
    }

    fn to_host_at(&self, value: &GuestValue, depth: usize) -> HostValue {
        match value {
            GuestValue::Nil => return HostValue::Undefined,
            GuestValue::Boolean(b) => return HostValue::Boolean(*b),
            GuestValue::Number(n) => return HostValue::Number(*n),
            GuestValue::String(s) => return HostValue::String(s.clone()),
            GuestValue::UserData(_) => {
                if let Some(host) = host_value_of(value) {
                    return host;
                }
            }
            GuestValue::Function(_) | GuestValue::Table(_) => {}
        }

        match classify(&self.state, value) {
            Some(Shape::Function) => self.wrap(value),
            Some(shape) if depth >= self.slot.config.max_depth => {
                warn!(
                    "{:?} nested deeper than {} levels converted to undefined",
                    shape, self.slot.config.max_depth
                );
                HostValue::Undefined
            }
            Some(Shape::Array) => self.array_to_host(value, depth),
            Some(Shape::Object) => self.object_to_host(value, depth),
            None => HostValue::Undefined,
        }
    }

    fn array_to_host(&self, value: &GuestValue, depth: usize) -> HostValue {
        let len = guest_length(&self.state, value);
        let array = match HostValue::array_with_length(len) {
            Ok(array) => array,
            Err(e) => {
                warn!("allocating array of length {} failed: {}", len, e);
                return HostValue::array();
            }
        };
        for i in 1..=len {
            let element = self
                .state
                .get(value, &GuestValue::Number(i as f64))
                .unwrap_or_else(|e| {
                    warn!("reading element {} during conversion failed: {}", i, e);
                    GuestValue::Nil
                });
            if let Err(e) = array.set_index(i - 1, self.to_host_at(&element, depth + 1)) {
                warn!("writing element {} during conversion failed: {}", i, e);
            }
        }
        array
    }

    fn object_to_host(&self, value: &GuestValue, depth: usize) -> HostValue {
        let object = HostValue::object();
        let pairs = self.state.pairs(value).unwrap_or_else(|e| {
            warn!("enumerating {} during conversion failed: {}", value.type_name(), e);
            Vec::new()
        });
        for (key, item) in pairs {
            object.set(&key.to_string(), self.to_host_at(&item, depth + 1));
        }
        object
    }

    /// Convert a host value into a guest value
    ///
    /// Primitives are copied; objects, arrays and functions are wrapped in a
    /// foreign handle sharing the bridge's handle metatable.
    pub fn to_guest(&self, value: &HostValue) -> GuestValue {
        match value {
            HostValue::Undefined | HostValue::Null => GuestValue::Nil,
            HostValue::Boolean(b) => GuestValue::Boolean(*b),
            HostValue::Number(n) => GuestValue::Number(*n),
            HostValue::String(s) => GuestValue::String(s.clone()),
            HostValue::Object(_) | HostValue::Array(_) | HostValue::Function(_) => {
                new_handle(value.clone(), &self.slot.handle_metatable)
            }
        }
    }
}

/// Length through `__len` when present, otherwise the raw border
///
/// Anything but a non-negative number up to the host array limit counts as
/// zero.
fn guest_length(state: &GuestState, value: &GuestValue) -> usize {
    match state.len(value) {
        Ok(GuestValue::Number(n)) if n >= 0.0 && n <= MAX_ARRAY_LENGTH as f64 => n as usize,
        Ok(GuestValue::Number(n)) if n > 0.0 => {
            warn!(
                "length {} of {} exceeds the host array limit, using 0",
                n,
                value.type_name()
            );
            0
        }
        Ok(other) => {
            warn!("length of {} is a {}, using 0", value.type_name(), other.type_name());
            0
        }
        Err(e) => {
            warn!("length of {} failed: {}", value.type_name(), e);
            0
        }
    }
}
