//! Bidirectional value conversion for the Nebula runtime.
//!
//! For each direction the bridge enumerates a closed set of supported
//! shapes. Native → script covers small integers, `u64` as bigint, `f32`,
//! booleans, raw byte buffers, UTF-8 strings, structured records over
//! pre-registered templates (`instanceof`-checkable), optionals, error
//! values with numeric codes, opaque passthrough values, generic records,
//! and string-sum enums. Script → native is the inverse, with explicit
//! `CantConvert` failures, range-checked numeric narrowing, weak-handle
//! validation, and case-insensitive enum lookup.
//!
//! String conversion appends into a reusable scratch buffer; a `&str`
//! returned from the bridge is valid only until the next bridge call.

#![warn(missing_docs)]
#![warn(clippy::all)]

mod convert;
mod enums;
mod slice;

pub use convert::ValueBridge;
pub use enums::{enum_from_script, enum_to_script, ScriptEnum};
pub use slice::resolve_slice;
