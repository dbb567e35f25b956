//! Runtime orchestration for the Nebula desktop runtime.
//!
//! This crate owns the interleaving of three concurrency regimes: the script
//! engine's cooperative microtask queue, the reactor for native I/O, and the
//! parallel worker pool. The [`Runtime`] context exclusively owns the engine
//! and every native table; the event loop driver sequences platform events,
//! frame stepping, and the contractual drain order (worker completions, then
//! the reactor once, then microtasks to fixed point).
//!
//! # Overview
//!
//! - [`Runtime`] / [`RuntimeOptions`] - the context and its construction
//! - [`RunOutcome`] - why the frame loop stopped
//! - [`DevSession`] - file watching, chrome window, hot restart
//! - [`Platform`] / [`HeadlessPlatform`] - the window backend seam
//! - [`PromiseRegistry`] / [`RejectionLedger`] - async bookkeeping
//! - [`ModuleLoader`] - module registration and import resolution
//! - [`TestReport`] - isolated test execution

#![warn(missing_docs)]
#![warn(clippy::all)]

mod dev_mode;
mod event_loop;
mod module_loader;
mod platform;
mod promises;
mod rejections;
mod runtime;
mod test_runner;

pub use dev_mode::{DevOptions, DevSession, EngineFactory, ReactorFactory};
pub use event_loop::RunOutcome;
pub use module_loader::{ModuleInfo, ModuleLoader};
pub use platform::{HeadlessHandle, HeadlessPlatform, Platform, PlatformEvent};
pub use promises::{PromiseId, PromiseRegistry};
pub use rejections::RejectionLedger;
pub use runtime::{Runtime, RuntimeOptions};
pub use test_runner::{IsolatedTest, TestReport};
