//! The runtime context.
//!
//! `Runtime` is the process singleton that exclusively owns the script
//! engine, the reactor and its poller, the worker pool, the handle tables,
//! the promise registry, and the module registry. Lifecycle:
//! `new → enter → (load, run) → exit → shutdown`, with drop as final deinit.

use crate::module_loader::ModuleLoader;
use crate::platform::Platform;
use crate::promises::{PromiseId, PromiseRegistry};
use crate::rejections::RejectionLedger;
use crate::test_runner::IsolatedTest;
use core_types::{
    HandleTag, JsException, LoadError, ResourceId, RuntimeError, ScriptId, ScriptValue, WeakId,
};
use handle_table::{ResourcePayload, ResourceTable, ServerResource, WeakHandles, WindowResource};
use reactor::{Poller, Reactor, WakeEvent};
use script_engine::{Engine, FinalizerPayload};
use std::any::Any;
use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use tracing::{debug, error, info, warn};
use value_bridge::ValueBridge;
use work_queue::{Task, TaskOutput, WorkFn, WorkQueue};

/// Construction parameters for [`Runtime`].
pub struct RuntimeOptions {
    /// The script engine behind the seam.
    pub engine: Box<dyn Engine>,
    /// The reactor behind the seam.
    pub reactor: Box<dyn Reactor>,
    /// The platform window backend.
    pub platform: Box<dyn Platform>,
    /// Worker pool size.
    pub workers: usize,
    /// Whether dev mode is active (errors enter the JS-error state instead
    /// of terminating).
    pub dev_mode: bool,
}

#[cfg(unix)]
impl RuntimeOptions {
    /// Stub-engine options over a self-pipe reactor.
    pub fn with_stub_engine(platform: Box<dyn Platform>, workers: usize) -> Result<Self, RuntimeError> {
        let reactor = reactor::PipeReactor::new().map_err(|e| RuntimeError::Io(e.to_string()))?;
        Ok(Self {
            engine: Box::new(script_engine::StubEngine::new(
                script_engine::EngineConfig::default(),
            )),
            reactor: Box::new(reactor),
            platform,
            workers,
            dev_mode: false,
        })
    }
}

#[derive(Default)]
pub(crate) struct WindowCallbacks {
    pub(crate) on_update: Option<ScriptValue>,
    pub(crate) on_event: Option<ScriptValue>,
}

/// The runtime context. See the crate docs for the ownership story.
pub struct Runtime {
    pub(crate) engine: Box<dyn Engine>,
    pub(crate) bridge: ValueBridge,
    pub(crate) reactor: Box<dyn Reactor>,
    pub(crate) poller: Option<Poller>,
    pub(crate) work_queue: WorkQueue<Runtime>,
    pub(crate) resources: ResourceTable,
    pub(crate) weak: WeakHandles,
    pub(crate) promises: PromiseRegistry,
    pub(crate) loader: ModuleLoader,
    pub(crate) platform: Box<dyn Platform>,
    pub(crate) main_event: Arc<WakeEvent>,
    pub(crate) window_map: HashMap<u32, ResourceId>,
    pub(crate) callbacks: HashMap<ResourceId, WindowCallbacks>,
    pub(crate) rejections: RejectionLedger,
    pub(crate) isolated_tests: Vec<IsolatedTest>,
    pub(crate) uncaught: Option<JsException>,
    pub(crate) restart_flag: Arc<AtomicBool>,
    pub(crate) js_error_state: bool,
    pub(crate) dev_mode: bool,
    entered: bool,
    main_script: Option<ScriptId>,
}

impl Runtime {
    /// Initializes the runtime: registers bridge templates, spawns the
    /// reactor poller and the worker pool.
    pub fn new(options: RuntimeOptions) -> Result<Self, RuntimeError> {
        let mut engine = options.engine;
        let bridge = ValueBridge::new(engine.as_mut());
        let reactor = options.reactor;
        let main_event = Arc::new(WakeEvent::new());
        let poller = Poller::spawn(
            reactor.backend(),
            reactor.advertised_timeout(),
            main_event.clone(),
        )
        .map_err(|e| RuntimeError::Io(e.to_string()))?;
        let work_queue = WorkQueue::new(options.workers, main_event.clone(), reactor.wake_handle());

        info!(workers = options.workers, dev = options.dev_mode, "runtime initialized");
        Ok(Self {
            engine,
            bridge,
            reactor,
            poller: Some(poller),
            work_queue,
            resources: ResourceTable::new(),
            weak: WeakHandles::new(),
            promises: PromiseRegistry::new(),
            loader: ModuleLoader::new(),
            platform: options.platform,
            main_event,
            window_map: HashMap::new(),
            callbacks: HashMap::new(),
            rejections: RejectionLedger::new(),
            isolated_tests: Vec::new(),
            uncaught: None,
            restart_flag: Arc::new(AtomicBool::new(false)),
            js_error_state: false,
            dev_mode: options.dev_mode,
            entered: false,
            main_script: None,
        })
    }

    // --- scope discipline -------------------------------------------------

    /// Enters the script scope; must precede any script execution.
    pub fn enter(&mut self) {
        if !self.entered {
            self.engine.enter();
            self.entered = true;
        }
    }

    /// Exits the script scope.
    pub fn exit(&mut self) {
        if self.entered {
            self.engine.exit();
            self.entered = false;
        }
    }

    // --- accessors --------------------------------------------------------

    /// The engine behind the seam.
    pub fn engine_mut(&mut self) -> &mut dyn Engine {
        self.engine.as_mut()
    }

    /// The value bridge.
    pub fn bridge(&self) -> &ValueBridge {
        &self.bridge
    }

    /// The resource table.
    pub fn resources(&self) -> &ResourceTable {
        &self.resources
    }

    /// The weak-handle table.
    pub fn weak_handles(&self) -> &WeakHandles {
        &self.weak
    }

    /// Outstanding (unsettled) registered promises.
    pub fn outstanding_promises(&self) -> usize {
        self.promises.outstanding()
    }

    /// The event the poller and workers signal to wake the main thread.
    pub fn main_event(&self) -> Arc<WakeEvent> {
        self.main_event.clone()
    }

    /// Flag that asks the frame loop to stop for a dev-mode restart.
    pub fn restart_flag(&self) -> Arc<AtomicBool> {
        self.restart_flag.clone()
    }

    /// The engine id of the loaded main script.
    pub fn main_script(&self) -> Option<ScriptId> {
        self.main_script
    }

    /// The first uncaught script exception, if any.
    pub fn uncaught(&self) -> Option<&JsException> {
        self.uncaught.as_ref()
    }

    /// Whether dev mode has entered the JS-error state.
    pub fn in_js_error_state(&self) -> bool {
        self.js_error_state
    }

    /// Clears the JS-error state (after a successful dev reload).
    pub fn clear_js_error_state(&mut self) {
        self.js_error_state = false;
    }

    /// Marks the runtime as being in the JS-error state.
    pub fn set_js_error_state(&mut self) {
        self.js_error_state = true;
    }

    // --- windows ----------------------------------------------------------

    /// Opens a native window, registers it as a resource, and creates its
    /// script wrapper with a finalizer back-pointer.
    pub fn open_window(
        &mut self,
        title: &str,
        width: u32,
        height: u32,
        fps: u32,
    ) -> (ResourceId, ScriptValue) {
        let native = self.platform.create_window(title, width, height, fps);
        let platform_id = native.platform_id();
        let id = self.resources.create(ResourcePayload::Window(native));
        self.window_map.insert(platform_id, id);

        let wrapper = self.bridge.from_weak(self.engine.as_mut(), "Window", id);
        self.engine
            .set_finalizer(&wrapper, FinalizerPayload::Resource(id));
        debug!(id, platform_id, title, "window opened");
        (id, wrapper)
    }

    /// Re-registers a native window preserved across a dev-mode restart.
    pub fn adopt_window(&mut self, native: Box<dyn WindowResource>) -> ResourceId {
        let platform_id = native.platform_id();
        let id = self.resources.create(ResourcePayload::Window(native));
        self.window_map.insert(platform_id, id);
        debug!(id, platform_id, "window adopted");
        id
    }

    /// Detaches a window's native object without destroying it.
    pub fn take_window(&mut self, id: ResourceId) -> Option<Box<dyn WindowResource>> {
        self.callbacks.remove(&id);
        match self.resources.detach(id)? {
            ResourcePayload::Window(native) => {
                self.window_map.remove(&native.platform_id());
                Some(native)
            }
            _ => None,
        }
    }

    /// Starts the two-phase close of a window.
    pub fn close_window(&mut self, id: ResourceId) {
        self.resources.start_deinit(id);
    }

    /// Installs the per-frame update callback for a window.
    pub fn set_on_update(&mut self, id: ResourceId, callback: ScriptValue) {
        self.callbacks.entry(id).or_default().on_update = Some(callback);
    }

    /// Installs the input-event callback for a window.
    pub fn set_on_event(&mut self, id: ResourceId, callback: ScriptValue) {
        self.callbacks.entry(id).or_default().on_event = Some(callback);
    }

    // --- servers ----------------------------------------------------------

    /// Registers an embedded server as a resource.
    pub fn register_server(&mut self, server: Box<dyn ServerResource>) -> (ResourceId, ScriptValue) {
        let id = self.resources.create(ResourcePayload::Server(server));
        let wrapper = self.bridge.from_weak(self.engine.as_mut(), "HttpServer", id);
        self.engine
            .set_finalizer(&wrapper, FinalizerPayload::Resource(id));
        (id, wrapper)
    }

    /// Registers an `on_deinit` observer for a resource.
    pub fn set_on_deinit(&mut self, id: ResourceId, callback: Box<dyn FnOnce()>) {
        self.resources.set_on_deinit(id, callback);
    }

    /// Starts the two-phase teardown of any resource.
    pub fn start_deinit(&mut self, id: ResourceId) {
        self.resources.start_deinit(id);
    }

    // --- weak handles -----------------------------------------------------

    /// Allocates a weak-handle slot and its script wrapper.
    pub fn create_weak(
        &mut self,
        tag: HandleTag,
        class_name: &str,
        payload: Box<dyn Any>,
    ) -> (WeakId, ScriptValue) {
        let id = self.weak.create(tag, payload);
        let wrapper = self.bridge.from_weak(self.engine.as_mut(), class_name, id);
        self.engine
            .set_finalizer(&wrapper, FinalizerPayload::Weak(id));
        (id, wrapper)
    }

    /// Explicit native-side deinit of a weak handle; the slot survives until
    /// the finalizer fires, but lookups now fail with `HandleExpired`.
    pub fn deinit_weak(&mut self, id: WeakId) {
        self.weak.deinit(id);
    }

    /// Validates a weak wrapper against the table.
    pub fn lookup_weak(
        &self,
        wrapper: &ScriptValue,
        expected: HandleTag,
    ) -> Result<WeakId, RuntimeError> {
        self.bridge
            .to_weak(self.engine.as_ref(), &self.weak, wrapper, expected)
    }

    // --- promises ---------------------------------------------------------

    /// Creates a registered promise; returns its entry id and the promise
    /// value handed to script.
    pub fn create_promise(&mut self) -> (PromiseId, ScriptValue) {
        let resolver = self.engine.new_resolver();
        let id = self.promises.add(resolver);
        let promise = self.engine.resolver_promise(resolver);
        (id, promise)
    }

    /// Resolves a registered promise with a native task output.
    pub fn resolve_promise(&mut self, id: PromiseId, output: TaskOutput) {
        let Some(resolver) = self.promises.take(id) else {
            return;
        };
        let value = self.output_to_value(output);
        self.engine.resolve(resolver, value);
    }

    /// Resolves a registered promise with an already-bridged value.
    pub fn resolve_promise_with(&mut self, id: PromiseId, value: ScriptValue) {
        if let Some(resolver) = self.promises.take(id) {
            self.engine.resolve(resolver, value);
        }
    }

    /// Rejects a registered promise. Known error values carry both the
    /// message and the numeric `code` property.
    pub fn reject_promise(&mut self, id: PromiseId, error: RuntimeError) {
        let Some(resolver) = self.promises.take(id) else {
            return;
        };
        let value = self.bridge.from_error(self.engine.as_mut(), &error);
        self.engine.reject(resolver, value);
    }

    /// Rejects a registered promise with an arbitrary (stringifiable)
    /// value; used when the error is not a known error enum.
    pub fn reject_promise_with(&mut self, id: PromiseId, value: ScriptValue) {
        if let Some(resolver) = self.promises.take(id) {
            self.engine.reject(resolver, value);
        }
    }

    /// Unhandled rejections currently recorded (and not yet retracted).
    pub fn pending_rejections(&self) -> usize {
        self.rejections.len()
    }

    fn output_to_value(&mut self, output: TaskOutput) -> ScriptValue {
        match output {
            TaskOutput::Unit => ScriptValue::Undefined,
            TaskOutput::Bytes(bytes) => self.bridge.from_bytes(self.engine.as_mut(), &bytes),
            TaskOutput::Text(text) => self.bridge.from_str(&text),
            TaskOutput::Int(n) => {
                if let Ok(small) = i32::try_from(n) {
                    ScriptValue::Int(small)
                } else {
                    ScriptValue::Number(n as f64)
                }
            }
            TaskOutput::Entries(entries) => {
                self.bridge.from_file_entries(self.engine.as_mut(), &entries)
            }
            TaskOutput::Http(response) => {
                self.bridge.from_http_response(self.engine.as_mut(), &response)
            }
        }
    }

    // --- async work -------------------------------------------------------

    /// Submits a task with explicit continuations.
    pub fn submit_task(&mut self, task: Task<Runtime>) {
        self.work_queue.submit(task);
    }

    /// Submits work to the pool and returns the promise that its completion
    /// will settle on the main thread.
    pub fn spawn_async(&mut self, work: WorkFn) -> ScriptValue {
        let (id, promise) = self.create_promise();
        self.work_queue.submit(Task::new(
            work,
            Box::new(move |rt: &mut Runtime, output| rt.resolve_promise(id, output)),
            Box::new(move |rt: &mut Runtime, error| rt.reject_promise(id, error)),
        ));
        promise
    }

    /// Asynchronous whole-file read resolving to a byte array.
    pub fn read_file_async(&mut self, path: std::path::PathBuf) -> ScriptValue {
        self.spawn_async(Box::new(move || {
            Ok(TaskOutput::Bytes(std::fs::read(&path)?))
        }))
    }

    // --- script loading ---------------------------------------------------

    /// Loads the main script as a module (compile, instantiate, evaluate).
    pub fn load_main(&mut self, path: &Path) -> Result<ScriptId, LoadError> {
        let id = self.loader.load_main(self.engine.as_mut(), path)?;
        self.main_script = Some(id);
        Ok(id)
    }

    // --- errors -----------------------------------------------------------

    /// Records an uncaught script exception.
    ///
    /// Only the first exception is recorded. In dev mode the runtime enters
    /// the JS-error state instead of terminating.
    pub fn record_uncaught(&mut self, exception: JsException) {
        if self.dev_mode {
            self.js_error_state = true;
            warn!("script error (dev): {}", exception.render());
            if self.uncaught.is_none() {
                self.uncaught = Some(exception);
            }
            return;
        }
        if self.uncaught.is_none() {
            error!("Uncaught {}", exception.render());
            self.uncaught = Some(exception);
        }
    }

    // --- shutdown ---------------------------------------------------------

    /// Graceful shutdown, in dependency order: poller handshake, worker
    /// close flags, reactor close-and-drain, worker join and final drain,
    /// then the unhandled-rejection report.
    pub fn shutdown(&mut self) -> Result<(), RuntimeError> {
        self.exit();

        if let Some(mut poller) = self.poller.take() {
            poller.shutdown(self.reactor.wake_handle().as_ref());
        }

        self.work_queue.begin_shutdown();

        self.reactor.close_all();
        while self.reactor.run_nowait() > 0 {}
        self.reactor
            .stop()
            .map_err(|e| RuntimeError::Internal(e.to_string()))?;

        self.work_queue.finish_shutdown();

        self.rejections.observe(self.engine.drain_rejection_events());
        for report in self.rejections.drain_reports() {
            eprintln!("{}", report);
        }
        info!("runtime shut down");
        Ok(())
    }

    /// Whether the pool and reactor report quiescence (for diagnostics).
    pub fn is_quiescent(&self) -> bool {
        self.work_queue.is_quiescent() && self.reactor.live_handles() == 0
    }

    /// Consumes the runtime, handing back the platform for a restart.
    pub fn into_platform(mut self) -> Box<dyn Platform> {
        std::mem::replace(&mut self.platform, Box::new(NullPlatform))
    }
}

impl Drop for Runtime {
    fn drop(&mut self) {
        if let Some(mut poller) = self.poller.take() {
            poller.shutdown(self.reactor.wake_handle().as_ref());
        }
    }
}

/// Placeholder platform left behind by [`Runtime::into_platform`].
struct NullPlatform;

impl Platform for NullPlatform {
    fn create_window(
        &mut self,
        _title: &str,
        _width: u32,
        _height: u32,
        _fps: u32,
    ) -> Box<dyn WindowResource> {
        unreachable!("platform was moved out of the runtime")
    }

    fn poll_events(&mut self) -> Vec<crate::platform::PlatformEvent> {
        Vec::new()
    }
}
