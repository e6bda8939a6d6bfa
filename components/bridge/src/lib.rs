//! Bidirectional value bridge between an embedded guest interpreter and a
//! host object system.
//!
//! The bridge lets guest code read, write and call host objects, and lets
//! host code call guest closures as if they were native host functions.
//!
//! # Overview
//!
//! - [`classify`] / [`Shape`] - Decide whether a guest aggregate crosses as
//!   a function, an object or an array
//! - [`Bridge::to_host`] / [`Bridge::to_guest`] - Value conversion; deep
//!   guest-to-host, shallow (handle-wrapping) host-to-guest
//! - [`Bridge::wrap`] / [`Bridge::release`] - Function proxy registry
//! - [`ForeignHandle`] - Host reference carried opaquely through the guest
//!
//! # Examples
//!
//! ```
//! use bridge::Bridge;
//! use guest_runtime::{GuestState, GuestValue};
//! use host_types::HostValue;
//!
//! let state = GuestState::new();
//! let bridge = Bridge::install_default(&state).unwrap();
//!
//! // Host aggregates cross as handles and come back untouched
//! let obj = HostValue::object();
//! let handle = bridge.to_guest(&obj);
//! assert!(bridge.to_host(&handle).same_ref(&obj));
//!
//! // Guest code reads host properties through the handle
//! obj.set("answer", HostValue::number(42.0));
//! let answer = state.get(&handle, &GuestValue::from("answer")).unwrap();
//! assert_eq!(answer, GuestValue::Number(42.0));
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(unsafe_code)]

mod bridge;
mod config;
mod convert;
mod error;
mod handle;
mod proxy;
mod shape;

pub use bridge::Bridge;
pub use config::{BridgeConfig, DEFAULT_MAX_DEPTH, DEFAULT_REGISTRY_KEY, DEFAULT_TAG_KEY};
pub use error::{BridgeError, BridgeResult};
pub use handle::{host_value_of, is_handle, ForeignHandle, HANDLE_TYPE_NAME};
pub use proxy::ProxyId;
pub use shape::{classify, Shape};
