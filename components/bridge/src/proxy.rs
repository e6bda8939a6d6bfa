//! Function proxy registry.
//!
//! Wrapping a guest closure allocates a fresh id, stores a strong reference
//! to the closure under that id and returns a host function that calls back
//! into the guest through the registry. The entry stays until it is
//! released explicitly; neither runtime's collector sees across the
//! boundary.
//!
//! Ids are never reused, so a stale host function can never reach a newer
//! closure. Wrapping the same closure twice creates two independent
//! entries: callers that wrap repeatedly must release each proxy or cache
//! the host function they got back.

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::fmt;

use guest_runtime::GuestValue;
use host_types::HostValue;
use log::{debug, trace, warn};

use crate::bridge::Bridge;
use crate::error::{BridgeError, BridgeResult};

/// Identifier of a proxy registry entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ProxyId(pub i64);

impl fmt::Display for ProxyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A live registry entry
struct ProxyEntry {
    /// Keeps the guest closure alive until release
    closure: GuestValue,
    /// The host function handed out for this entry
    host_function: HostValue,
}

/// Monotonic id allocator plus the id → entry map
pub(crate) struct ProxyRegistry {
    last_id: Cell<i64>,
    entries: RefCell<HashMap<ProxyId, ProxyEntry>>,
}

impl ProxyRegistry {
    pub(crate) fn new() -> Self {
        ProxyRegistry {
            last_id: Cell::new(0),
            entries: RefCell::new(HashMap::new()),
        }
    }

    fn allocate(&self) -> ProxyId {
        let id = self.last_id.get() + 1;
        self.last_id.set(id);
        ProxyId(id)
    }

    fn insert(&self, id: ProxyId, entry: ProxyEntry) {
        self.entries.borrow_mut().insert(id, entry);
    }

    fn closure(&self, id: ProxyId) -> Option<GuestValue> {
        self.entries.borrow().get(&id).map(|e| e.closure.clone())
    }

    fn host_function(&self, id: ProxyId) -> Option<HostValue> {
        self.entries.borrow().get(&id).map(|e| e.host_function.clone())
    }

    fn remove(&self, id: ProxyId) -> bool {
        // dropped outside the borrow: releasing the closure may run guest code
        let removed = self.entries.borrow_mut().remove(&id);
        removed.is_some()
    }

    fn len(&self) -> usize {
        self.entries.borrow().len()
    }
}

impl Bridge {
    /// Wrap a guest callable in a host function
    ///
    /// Every call allocates a new id and a new registry entry, even for a
    /// closure that has been wrapped before.
    ///
    /// # Examples
    ///
    /// ```
    /// use bridge::Bridge;
    /// use guest_runtime::{GuestState, GuestValue};
    /// use host_types::HostValue;
    ///
    /// let state = GuestState::new();
    /// let bridge = Bridge::install_default(&state).unwrap();
    ///
    /// // receives (this, x)
    /// let double = GuestValue::function("double", |_, args| {
    ///     let n = args.get(1).and_then(|v| v.as_number()).unwrap_or(0.0);
    ///     Ok(vec![GuestValue::Number(n * 2.0)])
    /// });
    /// let f = bridge.wrap(&double);
    /// let out = f.call(HostValue::Undefined, vec![HostValue::number(21.0)]).unwrap();
    /// assert_eq!(out, HostValue::number(42.0));
    /// ```
    pub fn wrap(&self, closure: &GuestValue) -> HostValue {
        let id = self.slot.proxies.allocate();
        let weak = self.state.downgrade();
        let registry_key = self.slot.config.registry_key.clone();

        let function = HostValue::function(move |this, args| {
            let state = weak.upgrade().ok_or(BridgeError::GuestDropped)?;
            let bridge = Bridge::attach(&state, &registry_key)?;
            Ok(bridge.invoke(id, this, args)?)
        });
        function.set(&self.slot.config.tag_key, HostValue::Number(id.0 as f64));

        self.slot.proxies.insert(
            id,
            ProxyEntry {
                closure: closure.clone(),
                host_function: function.clone(),
            },
        );
        debug!("created proxy {} for guest {}", id, closure.type_name());
        function
    }

    /// Invoke the closure registered under `id` with host arguments
    ///
    /// The closure receives the converted receiver followed by the converted
    /// arguments and must produce one result; extra results are dropped and
    /// a missing result reads as nil.
    pub fn invoke(&self, id: ProxyId, this: HostValue, args: Vec<HostValue>) -> BridgeResult<HostValue> {
        let Some(closure) = self.slot.proxies.closure(id) else {
            warn!("host called released proxy {}", id);
            return Err(BridgeError::ReleasedFunction(id));
        };
        trace!("invoking proxy {} with {} argument(s)", id, args.len());

        let nargs = args.len() + 1;
        self.state.push(closure);
        self.state.push(self.to_guest(&this));
        for arg in &args {
            self.state.push(self.to_guest(arg));
        }
        self.state.call(nargs, 1)?;
        let result = self.state.pop()?;
        Ok(self.to_host(&result))
    }

    /// Release the proxy registered under `id`
    ///
    /// Idempotent. Returns whether a live entry was removed. The host
    /// function stays valid as an object but every later call fails.
    pub fn release(&self, id: ProxyId) -> bool {
        let removed = self.slot.proxies.remove(id);
        if removed {
            debug!("released proxy {}", id);
        }
        removed
    }

    /// Release the proxy behind a host function produced by [`Bridge::wrap`]
    ///
    /// Returns the released id; `None` for values that carry no proxy tag.
    pub fn release_function(&self, function: &HostValue) -> Option<ProxyId> {
        let id = self.proxy_id(function)?;
        self.release(id);
        Some(id)
    }

    /// Read the proxy id tag of a host function
    ///
    /// A tag that is no longer an integral number names no proxy.
    pub fn proxy_id(&self, function: &HostValue) -> Option<ProxyId> {
        if !function.is_function() {
            return None;
        }
        function
            .get(&self.slot.config.tag_key)
            .as_number()
            .filter(|n| n.is_finite() && n.fract() == 0.0)
            .map(|n| ProxyId(n as i64))
    }

    /// Whether `id` still has a live entry
    pub fn is_live(&self, id: ProxyId) -> bool {
        self.slot.proxies.closure(id).is_some()
    }

    /// Host function registered under `id`, if not released
    pub fn proxy_function(&self, id: ProxyId) -> Option<HostValue> {
        self.slot.proxies.host_function(id)
    }

    /// Number of unreleased proxies
    pub fn live_proxies(&self) -> usize {
        self.slot.proxies.len()
    }
}
