//! The engine trait the orchestration layer is written against.
//!
//! The runtime never talks to a concrete script engine directly; every
//! interaction goes through [`Engine`]. A production embedding implements
//! this trait over the real engine's isolate/context API; the in-repo
//! [`StubEngine`](crate::StubEngine) implements it deterministically for the
//! CLI wiring and the test suite.

use core_types::{JsException, ObjectId, ResourceId, ScriptId, ScriptValue, WeakId};

/// Identifier for a pre-registered object template (class).
pub type TemplateId = u32;

/// Identifier for an outstanding promise resolver inside the engine.
pub type ResolverId = u32;

/// A native function callable from script.
///
/// The closure receives the engine so it can mint values or schedule work
/// while executing. Engine implementations must make the engine re-entrant
/// for the duration of the call.
pub type NativeFn =
    Box<dyn FnMut(&mut dyn Engine, Vec<ScriptValue>) -> Result<ScriptValue, JsException>>;

/// A microtask enqueued on the engine's internal queue.
pub type Microtask = Box<dyn FnOnce(&mut dyn Engine)>;

/// Module resolver callback: given the referrer script and a specifier,
/// produce the compiled dependency.
pub type ModuleResolver<'a> =
    &'a mut dyn FnMut(&mut dyn Engine, ScriptId, &str) -> Result<ScriptId, JsException>;

/// Settlement state of a promise object.
#[derive(Debug, Clone, PartialEq)]
pub enum PromiseState {
    /// Not yet settled
    Pending,
    /// Settled with a value
    Fulfilled(ScriptValue),
    /// Settled with a rejection value
    Rejected(ScriptValue),
}

/// Finalizer context handed to the engine when a wrapper object is created.
///
/// The engine returns the payload verbatim when the wrapper is collected.
/// Payloads are slot ids, never raw native pointers: the runtime re-validates
/// the id against its tables, so a finalizer that outlives a restart is a
/// harmless no-op.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FinalizerPayload {
    /// Back-pointer to a resource-table slot
    Resource(ResourceId),
    /// Back-pointer to a weak-handle slot
    Weak(WeakId),
}

/// Promise-rejection bookkeeping events emitted by the engine.
#[derive(Debug, Clone, PartialEq)]
pub enum RejectionEvent {
    /// A promise was rejected with no handler attached
    Unhandled {
        /// Identity of the rejected promise
        promise: ObjectId,
        /// The rejection value
        value: ScriptValue,
    },
    /// A handler was later attached to a previously unhandled promise
    HandlerAdded {
        /// Identity of the now-handled promise
        promise: ObjectId,
    },
}

/// Engine construction parameters.
///
/// Mirrors the knobs the runtime sets on the real engine at startup: stack
/// trace capture depth for uncaught exceptions, automatic microtask policy,
/// and optional heap limits.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Frames captured for uncaught exceptions
    pub stack_trace_limit: usize,
    /// Whether the engine drains microtasks automatically after each call
    pub auto_microtasks: bool,
    /// Optional heap ceiling in bytes
    pub heap_limit: Option<usize>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            stack_trace_limit: 10,
            auto_microtasks: true,
            heap_limit: None,
        }
    }
}

/// The script engine seam.
///
/// Only the main thread may call these methods, and every call site must
/// hold an entered [`Scope`](crate::Scope). The trait is object-safe; the
/// runtime stores a `Box<dyn Engine>`.
pub trait Engine {
    // --- scope discipline -------------------------------------------------

    /// Enters the engine (isolate + handle scope + context).
    fn enter(&mut self);

    /// Exits the engine. Must be balanced with [`Engine::enter`].
    fn exit(&mut self);

    // --- objects and values ----------------------------------------------

    /// Creates a plain object.
    fn new_object(&mut self) -> ScriptValue;

    /// Registers a named object template; instances report the class name.
    fn register_template(&mut self, class_name: &str) -> TemplateId;

    /// Instantiates a registered template.
    fn new_instance(&mut self, template: TemplateId) -> ScriptValue;

    /// Returns the class name of an instance created from a template.
    fn class_of(&self, value: &ScriptValue) -> Option<String>;

    /// Sets a named property.
    fn set_property(&mut self, object: &ScriptValue, key: &str, value: ScriptValue);

    /// Reads a named property.
    fn get_property(&self, object: &ScriptValue, key: &str) -> Option<ScriptValue>;

    /// Enumerates own property names in insertion order.
    fn property_names(&self, object: &ScriptValue) -> Vec<String>;

    /// Creates an array from the given elements.
    fn new_array(&mut self, items: Vec<ScriptValue>) -> ScriptValue;

    /// Copies out the elements of an array value.
    fn array_items(&self, value: &ScriptValue) -> Option<Vec<ScriptValue>>;

    /// Creates a typed byte array over a copy of `bytes`.
    fn new_byte_array(&mut self, bytes: &[u8]) -> ScriptValue;

    /// Borrows the contents of a typed byte array.
    fn byte_array(&self, value: &ScriptValue) -> Option<&[u8]>;

    /// Creates an error object carrying `message`.
    fn new_error(&mut self, message: &str) -> ScriptValue;

    // --- functions --------------------------------------------------------

    /// Wraps a native closure as a callable function object.
    fn new_function(&mut self, f: NativeFn) -> ScriptValue;

    /// Calls a function value with arguments.
    fn call(
        &mut self,
        function: &ScriptValue,
        args: Vec<ScriptValue>,
    ) -> Result<ScriptValue, JsException>;

    // --- promises and microtasks -----------------------------------------

    /// Creates a resolver and its associated promise.
    fn new_resolver(&mut self) -> ResolverId;

    /// Returns the promise controlled by a resolver.
    fn resolver_promise(&self, id: ResolverId) -> ScriptValue;

    /// Resolves the promise behind `id`.
    fn resolve(&mut self, id: ResolverId, value: ScriptValue);

    /// Rejects the promise behind `id`.
    fn reject(&mut self, id: ResolverId, value: ScriptValue);

    /// Inspects the settlement state of a promise value.
    fn promise_state(&self, value: &ScriptValue) -> Option<PromiseState>;

    /// Marks a rejected promise as handled (a handler was attached).
    fn attach_rejection_handler(&mut self, promise: &ScriptValue);

    /// Enqueues a microtask on the engine's internal queue.
    fn enqueue_microtask(&mut self, task: Microtask);

    /// Drains the microtask queue to fixed point.
    fn run_microtasks(&mut self);

    /// Whether microtasks are pending.
    fn has_pending_microtasks(&self) -> bool;

    /// Drains promise-rejection bookkeeping events.
    fn drain_rejection_events(&mut self) -> Vec<RejectionEvent>;

    // --- modules ----------------------------------------------------------

    /// Compiles `source` as a module; `origin` is the absolute script path.
    fn compile_module(&mut self, origin: &str, source: &str) -> Result<ScriptId, JsException>;

    /// Instantiates a compiled module, resolving imports through `resolver`.
    ///
    /// Returns a captured stack trace string on failure.
    fn instantiate_module(
        &mut self,
        id: ScriptId,
        resolver: ModuleResolver<'_>,
    ) -> Result<(), String>;

    /// Evaluates an instantiated module.
    ///
    /// Returns a captured stack trace string on failure.
    fn evaluate_module(&mut self, id: ScriptId) -> Result<ScriptValue, String>;

    /// Returns the namespace object of an evaluated module.
    fn module_namespace(&self, id: ScriptId) -> Option<ScriptValue>;

    // --- lifetime and collection -----------------------------------------

    /// Attaches a finalizer payload to a wrapper object.
    fn set_finalizer(&mut self, object: &ScriptValue, payload: FinalizerPayload);

    /// Pins a value so collection never reclaims it.
    fn make_persistent(&mut self, value: &ScriptValue);

    /// Releases a pin taken with [`Engine::make_persistent`].
    fn release_persistent(&mut self, value: &ScriptValue);

    /// Requests a collection cycle; finalizers for unreachable wrappers fire.
    fn collect_garbage(&mut self);

    /// Drains finalizer payloads for wrappers collected since the last call.
    fn take_finalized(&mut self) -> Vec<FinalizerPayload>;
}
