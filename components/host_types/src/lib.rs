//! Host object model for the guest/host value bridge.
//!
//! This crate provides the host side of the boundary: a small object system
//! with primitive values, shared objects, arrays and native functions.
//!
//! # Overview
//!
//! - [`HostValue`] - Tagged representation of host values
//! - [`HostKind`] - Runtime kind query result
//! - [`HostError`] - Error thrown out of host calls
//!
//! # Examples
//!
//! ```
//! use host_types::{HostValue, HostKind};
//!
//! let obj = HostValue::object();
//! obj.set("answer", HostValue::number(42.0));
//! assert_eq!(obj.get("answer").as_number(), Some(42.0));
//! assert_eq!(obj.kind(), HostKind::Object);
//!
//! let double = HostValue::function(|_this, args| {
//!     let n = args.first().and_then(|v| v.as_number()).unwrap_or(0.0);
//!     Ok(HostValue::number(n * 2.0))
//! });
//! let out = double.call(HostValue::Undefined, vec![HostValue::number(4.0)]).unwrap();
//! assert_eq!(out.as_number(), Some(8.0));
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(unsafe_code)]

mod error;
mod value;

pub use error::{HostError, HostResult};
pub use value::{ArrayData, FunctionData, HostKind, HostValue, NativeFn, ObjectData, MAX_ARRAY_LENGTH};
