//! Script engine seam for the Nebula runtime.
//!
//! The orchestration layer never names a concrete engine; it is written
//! against the [`Engine`] trait defined here. The trait covers exactly the
//! surface the runtime needs: object and byte-array construction, templates
//! for `instanceof`-checkable records, native functions, promise resolvers,
//! microtask draining, module compile/instantiate/evaluate with a resolver
//! callback, and finalizer plumbing for wrapper lifetimes.
//!
//! # Overview
//!
//! - [`Engine`] - The seam trait (object-safe; stored as `Box<dyn Engine>`)
//! - [`Scope`] - RAII guard for the enter/exit scope discipline
//! - [`EngineConfig`] - Startup knobs (stack trace depth, microtask policy)
//! - [`StubEngine`] - Deterministic implementation for wiring and tests
//!
//! # Examples
//!
//! ```
//! use script_engine::{Engine, StubEngine};
//! use core_types::ScriptValue;
//!
//! let mut engine = StubEngine::default();
//! let resolver = engine.new_resolver();
//! engine.resolve(resolver, ScriptValue::Int(42));
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

mod engine;
mod scope;
mod stub;

pub use engine::{
    Engine, EngineConfig, FinalizerPayload, Microtask, ModuleResolver, NativeFn, PromiseState,
    RejectionEvent, ResolverId, TemplateId,
};
pub use scope::Scope;
pub use stub::StubEngine;
