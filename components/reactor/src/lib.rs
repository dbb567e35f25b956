//! Reactor seam and poller thread for the Nebula runtime.
//!
//! The reactor is a single-threaded multiplexed I/O system that dispatches
//! completion callbacks. This crate provides:
//!
//! - [`Reactor`] - the seam trait the runtime drives ("run once, without
//!   blocking"), with [`ReactorWake`] as the only piece other threads touch
//! - [`PipeReactor`] - the self-pipe reference implementation (unix)
//! - [`Poller`] - the dedicated thread that blocks on the reactor's backend
//!   descriptor and signals the main thread when I/O is ready
//! - [`WakeEvent`] - the condvar-backed manual-reset event used for all
//!   cross-thread signaling in the runtime
//!
//! The poller exists because the script engine is single-threaded and must
//! not block on I/O, while the reactor wants its blocking wait to be
//! efficient. Per-OS waits live behind one interface whose contract is
//! "block until ready or timeout expires".

#![warn(missing_docs)]
#![warn(clippy::all)]

mod event;
mod poller;
#[allow(clippy::module_inception)]
mod reactor;

pub use event::WakeEvent;
pub use poller::Poller;
pub use reactor::{
    BackendHandle, Reactor, ReactorError, ReactorHandleId, ReactorWake, TIMEOUT_INFINITE,
};

#[cfg(unix)]
pub use reactor::{PipeNotifier, PipeReactor};
