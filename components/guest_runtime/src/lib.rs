//! Embedded interpreter surface for the guest side of the bridge.
//!
//! This crate models the services a host-embedded dynamic-language
//! interpreter offers to native code: tagged values, tables with
//! metatables, userdata with opaque payloads, native closures, an explicit
//! value stack and a registry table reserved for native extensions.
//!
//! # Overview
//!
//! - [`GuestValue`] - Tagged representation of guest values
//! - [`Table`] - Shared table with an optional metatable
//! - [`UserData`] - Opaque payload with an optional metatable
//! - [`GuestState`] - Stack, registry and metamethod-aware operations
//! - [`GuestError`] - Errors raised by guest operations
//!
//! # Examples
//!
//! ```
//! use guest_runtime::{GuestState, GuestValue, Table};
//!
//! let state = GuestState::new();
//! let double = GuestValue::function("double", |_, args| {
//!     let n = args.first().and_then(|v| v.as_number()).unwrap_or(0.0);
//!     Ok(vec![GuestValue::Number(n * 2.0)])
//! });
//!
//! state.push(double);
//! state.push(21.0);
//! state.call(1, 1).unwrap();
//! assert_eq!(state.pop().unwrap(), GuestValue::Number(42.0));
//!
//! let t = Table::from_sequence(vec![GuestValue::from(1.0), GuestValue::from(2.0)]);
//! assert_eq!(state.len(&GuestValue::Table(t)).unwrap(), GuestValue::Number(2.0));
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(unsafe_code)]

mod error;
mod state;
mod table;
mod value;

pub use error::{GuestError, GuestResult};
pub use state::{GuestState, WeakGuestState, DEFAULT_MAX_CALL_DEPTH};
pub use table::Table;
pub use value::{format_number, GuestFunction, GuestKind, GuestValue, NativeClosure, UserData};
