//! Native handle tables for the Nebula runtime.
//!
//! Two tables with different lifetimes live here:
//!
//! - [`ResourceTable`] - strong handles enumerated by type (the frame loop
//!   iterates windows), held in intrusive lists with two-phase release and a
//!   stable [`ExternalHandle`] back-pointer per slot for engine finalizers.
//! - [`WeakHandles`] - a flat slot allocator for native objects whose slot
//!   release is driven by the script engine's garbage collector.
//!
//! Invariants maintained here:
//!
//! 1. every live resource id maps to a handle whose `external.resource_id`
//!    equals that id;
//! 2. a slot is freed only from the finalizer path (`destroy`), and always
//!    with `deinited` set first;
//! 3. when `window_count > 0`, the active window is a live window.

#![warn(missing_docs)]
#![warn(clippy::all)]

mod resources;
mod weak;

pub use resources::{
    ExternalHandle, ResourcePayload, ResourceTable, ServerResource, WindowResource,
};
pub use weak::WeakHandles;
