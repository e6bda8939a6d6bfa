//! Bridge installation and lookup
//!
//! All bridge state for one guest state lives under a single registry slot.
//! Proxies and handle metamethods find it again through that slot, so they
//! only ever hold a weak reference to the guest.

use std::rc::Rc;

use guest_runtime::{GuestState, GuestValue, Table};
use log::debug;

use crate::config::BridgeConfig;
use crate::error::{BridgeError, BridgeResult};
use crate::handle;
use crate::proxy::ProxyRegistry;

/// State stored in the reserved registry slot
pub(crate) struct BridgeSlot {
    pub(crate) config: BridgeConfig,
    pub(crate) proxies: ProxyRegistry,
    /// Shared metatable of every foreign handle, immutable after install
    pub(crate) handle_metatable: Table,
}

/// Handle to a bridge installed on a guest state
///
/// Cloning is cheap; all clones share the same registry slot.
#[derive(Clone)]
pub struct Bridge {
    pub(crate) state: GuestState,
    pub(crate) slot: Rc<BridgeSlot>,
}

impl Bridge {
    /// Install a bridge on `state` under `config.registry_key`
    ///
    /// Fails with [`BridgeError::AlreadyInstalled`] if the slot is taken.
    pub fn install(state: &GuestState, config: BridgeConfig) -> BridgeResult<Bridge> {
        let key = config.registry_key.clone();
        if !state.registry_get(&key).is_nil() {
            return Err(BridgeError::AlreadyInstalled(key));
        }

        let slot = Rc::new(BridgeSlot {
            handle_metatable: handle::shared_metatable(&key),
            proxies: ProxyRegistry::new(),
            config,
        });
        state.registry_set(&key, GuestValue::userdata(Rc::clone(&slot)));
        debug!("bridge installed under registry key '{}'", key);

        Ok(Bridge {
            state: state.clone(),
            slot,
        })
    }

    /// Install with the default configuration
    pub fn install_default(state: &GuestState) -> BridgeResult<Bridge> {
        Bridge::install(state, BridgeConfig::default())
    }

    /// Re-attach to the bridge installed under `registry_key`
    pub fn attach(state: &GuestState, registry_key: &str) -> BridgeResult<Bridge> {
        let value = state.registry_get(registry_key);
        let slot = value
            .as_userdata()
            .and_then(|ud| ud.downcast_ref::<Rc<BridgeSlot>>())
            .cloned()
            .ok_or_else(|| BridgeError::NotInstalled(registry_key.to_string()))?;
        Ok(Bridge {
            state: state.clone(),
            slot,
        })
    }

    /// Re-attach to a bridge installed under the default registry key
    pub fn from_state(state: &GuestState) -> BridgeResult<Bridge> {
        Bridge::attach(state, crate::config::DEFAULT_REGISTRY_KEY)
    }

    /// The guest state this bridge is installed on
    pub fn state(&self) -> &GuestState {
        &self.state
    }

    /// Configuration given at install time
    pub fn config(&self) -> &BridgeConfig {
        &self.slot.config
    }

    /// The metatable shared by all foreign handles
    pub fn handle_metatable(&self) -> Table {
        self.slot.handle_metatable.clone()
    }
}
