//! Integration test suite for the guest/host value bridge
//!
//! This crate provides end-to-end tests that drive values and calls across
//! the boundary in both directions.

/// Re-export components for test convenience
pub mod components {
    pub use bridge;
    pub use guest_runtime;
    pub use host_types;
}

/// Shared fixtures for the integration tests
pub mod fixtures {
    use bridge::Bridge;
    use guest_runtime::{GuestState, GuestValue, Table};

    /// Fresh guest state with a bridge installed under the default key
    pub fn new_bridge() -> (GuestState, Bridge) {
        let state = GuestState::new();
        let bridge = Bridge::install_default(&state).expect("bridge install");
        (state, bridge)
    }

    /// Guest closure `function(this, x) return x * factor end`
    pub fn multiplier(factor: f64) -> GuestValue {
        GuestValue::function("multiplier", move |_, args| {
            let x = args.get(1).and_then(|v| v.as_number()).unwrap_or(0.0);
            Ok(vec![GuestValue::Number(x * factor)])
        })
    }

    /// Table whose metatable carries `event = handler`
    pub fn table_with_meta(event: &str, handler: GuestValue) -> GuestValue {
        let table = Table::new();
        let mt = Table::new();
        mt.raw_set_str(event, handler);
        table.set_metatable(Some(mt));
        GuestValue::Table(table)
    }
}
