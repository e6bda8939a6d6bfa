//! Foreign handles: host references carried opaquely through the guest.
//!
//! A handle is a userdata whose payload is a [`ForeignHandle`] and whose
//! metatable is the bridge's shared handle metatable. Guest code reads,
//! writes and calls through the handle; the host reference inside is never
//! copied.

use guest_runtime::{GuestError, GuestResult, GuestValue, Table, UserData};
use host_types::{HostValue, MAX_ARRAY_LENGTH};

use crate::bridge::Bridge;

/// Value of the `__name` field on the shared handle metatable
pub const HANDLE_TYPE_NAME: &str = "js.value";

/// Payload of a guest userdata that stands for a host reference
#[derive(Debug, Clone)]
pub struct ForeignHandle {
    value: HostValue,
}

impl ForeignHandle {
    /// The wrapped host reference
    pub fn host_value(&self) -> &HostValue {
        &self.value
    }
}

/// Wrap a host value in a new guest userdata carrying `metatable`
pub(crate) fn new_handle(value: HostValue, metatable: &Table) -> GuestValue {
    let ud = UserData::new(ForeignHandle { value });
    ud.set_metatable(Some(metatable.clone()));
    GuestValue::UserData(ud)
}

/// The host reference inside a foreign handle, if `value` is one
pub fn host_value_of(value: &GuestValue) -> Option<HostValue> {
    value
        .as_userdata()
        .and_then(|ud| ud.downcast_ref::<ForeignHandle>())
        .map(|handle| handle.value.clone())
}

/// Whether `value` is a foreign handle
pub fn is_handle(value: &GuestValue) -> bool {
    value
        .as_userdata()
        .map(|ud| ud.is::<ForeignHandle>())
        .unwrap_or(false)
}

/// Property addressed by a guest key on a host value
enum PropertyKey {
    Index(usize),
    Name(String),
}

impl PropertyKey {
    /// Guest arrays count from 1, host arrays from 0
    ///
    /// Numbers past the host array limit are not indices.
    fn resolve(target: &HostValue, key: &GuestValue) -> PropertyKey {
        if let (HostValue::Array(_), GuestValue::Number(n)) = (target, key) {
            if *n >= 1.0 && n.fract() == 0.0 && *n <= MAX_ARRAY_LENGTH as f64 {
                return PropertyKey::Index(*n as usize - 1);
            }
        }
        PropertyKey::Name(key.to_string())
    }
}

/// Build the metatable shared by every handle of the bridge under `registry_key`
pub(crate) fn shared_metatable(registry_key: &str) -> Table {
    let mt = Table::new();
    mt.raw_set_str("__name", GuestValue::string(HANDLE_TYPE_NAME));

    mt.raw_set_str(
        "__index",
        metamethod(registry_key, "__index", |bridge, target, args| {
            let key = args.into_iter().next().unwrap_or_default();
            let value = match PropertyKey::resolve(&target, &key) {
                PropertyKey::Index(i) => target.get_index(i),
                PropertyKey::Name(name) => target.get(&name),
            };
            Ok(bridge.to_guest(&value))
        }),
    );

    mt.raw_set_str(
        "__newindex",
        metamethod(registry_key, "__newindex", |bridge, target, args| {
            let mut args = args.into_iter();
            let key = args.next().unwrap_or_default();
            let value = bridge.to_host(&args.next().unwrap_or_default());
            match PropertyKey::resolve(&target, &key) {
                PropertyKey::Index(i) => target
                    .set_index(i, value)
                    .map_err(|e| GuestError::Runtime(e.message))?,
                PropertyKey::Name(name) => target.set(&name, value),
            }
            Ok(GuestValue::Nil)
        }),
    );

    mt.raw_set_str(
        "__call",
        metamethod(registry_key, "__call", |bridge, target, args| {
            if !target.is_function() {
                return Err(GuestError::NotCallable(target.type_of()));
            }
            let args = args.iter().map(|arg| bridge.to_host(arg)).collect();
            let result = target
                .call(HostValue::Undefined, args)
                .map_err(|e| GuestError::Runtime(e.message))?;
            Ok(bridge.to_guest(&result))
        }),
    );

    mt.raw_set_str(
        "__len",
        metamethod(registry_key, "__len", |_, target, _| {
            Ok(GuestValue::Number(target.array_length() as f64))
        }),
    );

    mt.raw_set_str(
        "__tostring",
        metamethod(registry_key, "__tostring", |_, target, _| {
            Ok(GuestValue::String(target.to_js_string()))
        }),
    );

    mt
}

/// Guest closure that unwraps its `self` handle and re-attaches to the bridge
fn metamethod<F>(registry_key: &str, name: &'static str, body: F) -> GuestValue
where
    F: Fn(&Bridge, HostValue, Vec<GuestValue>) -> GuestResult<GuestValue> + 'static,
{
    let key = registry_key.to_string();
    GuestValue::function(name, move |state, mut args| {
        let bridge = Bridge::attach(state, &key)?;
        if args.is_empty() {
            return Err(GuestError::runtime(format!("'{}' called without a handle", name)));
        }
        let target = host_value_of(&args.remove(0)).ok_or_else(|| {
            GuestError::runtime(format!("bad self to '{}' (host value expected)", name))
        })?;
        Ok(vec![body(&bridge, target, args)?])
    })
}
