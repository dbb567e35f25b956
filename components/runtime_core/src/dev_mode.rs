//! Dev mode: file watching, the chrome window, and hot restart.
//!
//! Dev mode creates a chrome window up front and watches the main script.
//! On restart the platform handle and the chrome window's native window are
//! preserved; everything script-side is dropped and rebuilt. A script error
//! enters the JS-error state: the chrome keeps rendering, user callbacks are
//! suppressed, and the next file change restarts again.

use crate::event_loop::RunOutcome;
use crate::platform::Platform;
use crate::runtime::{Runtime, RuntimeOptions};
use core_types::{ResourceId, RuntimeError};
use notify::{RecommendedWatcher, RecursiveMode, Watcher};
use script_engine::Engine;
use reactor::Reactor;
use std::path::PathBuf;
use std::sync::atomic::Ordering;
use tracing::{info, warn};

/// Builds a fresh engine for each (re)start.
pub type EngineFactory = Box<dyn Fn() -> Box<dyn Engine>>;

/// Builds a fresh reactor for each (re)start.
pub type ReactorFactory = Box<dyn Fn() -> Result<Box<dyn Reactor>, RuntimeError>>;

/// Construction parameters for a [`DevSession`].
pub struct DevOptions {
    /// The watched main script.
    pub script: PathBuf,
    /// Worker pool size.
    pub workers: usize,
    /// Engine builder (a restart gets a fresh engine).
    pub engine_factory: EngineFactory,
    /// Reactor builder (a restart gets a fresh reactor).
    pub reactor_factory: ReactorFactory,
    /// The platform backend, preserved across restarts.
    pub platform: Box<dyn Platform>,
}

impl DevOptions {
    /// Overrides the worker pool size.
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers;
        self
    }
}

#[cfg(unix)]
impl DevOptions {
    /// Stub-engine options over a self-pipe reactor, with the default
    /// worker pool size.
    pub fn with_stub_engine(script: PathBuf, platform: Box<dyn Platform>) -> Self {
        Self {
            script,
            workers: 4,
            engine_factory: Box::new(|| {
                Box::new(script_engine::StubEngine::new(
                    script_engine::EngineConfig::default(),
                ))
            }),
            reactor_factory: Box::new(|| {
                reactor::PipeReactor::new()
                    .map(|r| Box::new(r) as Box<dyn Reactor>)
                    .map_err(|e| RuntimeError::Io(e.to_string()))
            }),
            platform,
        }
    }
}

/// A dev-mode run: runtime + chrome window + file watcher.
pub struct DevSession {
    runtime: Option<Runtime>,
    script: PathBuf,
    workers: usize,
    engine_factory: EngineFactory,
    reactor_factory: ReactorFactory,
    chrome: ResourceId,
    watcher: Option<RecommendedWatcher>,
}

impl DevSession {
    /// Starts dev mode: runtime up, chrome window open, watcher attached,
    /// script loaded (a load error enters the JS-error state rather than
    /// failing construction).
    pub fn new(options: DevOptions) -> Result<Self, RuntimeError> {
        let mut runtime = Runtime::new(RuntimeOptions {
            engine: (options.engine_factory)(),
            reactor: (options.reactor_factory)()?,
            platform: options.platform,
            workers: options.workers,
            dev_mode: true,
        })?;
        runtime.enter();
        let (chrome, _wrapper) = runtime.open_window("nebula dev", 960, 600, 30);

        let mut session = Self {
            runtime: Some(runtime),
            script: options.script,
            workers: options.workers,
            engine_factory: options.engine_factory,
            reactor_factory: options.reactor_factory,
            chrome,
            watcher: None,
        };
        session.attach_watcher();
        session.load();
        Ok(session)
    }

    /// The chrome window's resource id in the current runtime.
    pub fn chrome_window(&self) -> ResourceId {
        self.chrome
    }

    /// The current runtime.
    pub fn runtime(&self) -> &Runtime {
        self.runtime.as_ref().expect("runtime present outside restart")
    }

    /// The current runtime, mutably.
    pub fn runtime_mut(&mut self) -> &mut Runtime {
        self.runtime.as_mut().expect("runtime present outside restart")
    }

    /// Asks the frame loop to stop for a restart (what the watcher does on
    /// a file change).
    pub fn request_restart(&self) {
        let runtime = self.runtime();
        runtime.restart_flag().store(true, Ordering::SeqCst);
        runtime.main_event().set();
    }

    /// Runs until the chrome window closes, restarting on request.
    pub fn run(&mut self) -> Result<(), RuntimeError> {
        loop {
            match self.runtime_mut().run() {
                RunOutcome::RestartRequested => self.restart_now()?,
                RunOutcome::WindowsClosed => break,
                // Dev mode records errors instead of terminating, but an
                // embedder can still force this outcome; treat it as close.
                RunOutcome::UncaughtException => break,
            }
        }
        self.runtime_mut().shutdown()
    }

    /// Performs the restart: preserve the chrome native window and the
    /// platform, tear the runtime down, rebuild, re-attach, re-load.
    pub fn restart_now(&mut self) -> Result<(), RuntimeError> {
        info!(script = %self.script.display(), "dev restart");
        let mut old = self.runtime.take().expect("runtime present before restart");
        let chrome_native = old
            .take_window(self.chrome)
            .ok_or_else(|| RuntimeError::Internal("chrome window missing".into()))?;
        old.shutdown()?;
        let platform = old.into_platform();

        let mut runtime = Runtime::new(RuntimeOptions {
            engine: (self.engine_factory)(),
            reactor: (self.reactor_factory)()?,
            platform,
            workers: self.workers,
            dev_mode: true,
        })?;
        runtime.enter();
        self.chrome = runtime.adopt_window(chrome_native);
        self.runtime = Some(runtime);

        self.watcher = None;
        self.attach_watcher();
        self.load();
        Ok(())
    }

    fn load(&mut self) {
        let script = self.script.clone();
        let runtime = self.runtime_mut();
        runtime.clear_js_error_state();
        match runtime.load_main(&script) {
            Ok(_) => info!(script = %script.display(), "script loaded"),
            Err(err) => {
                warn!(script = %script.display(), "script error: {}", err);
                runtime.set_js_error_state();
            }
        }
    }

    fn attach_watcher(&mut self) {
        let flag = self.runtime().restart_flag();
        let wake = self.runtime().main_event();
        let result = notify::recommended_watcher(
            move |event: Result<notify::Event, notify::Error>| {
                if let Ok(event) = event {
                    if event.kind.is_modify() || event.kind.is_create() {
                        flag.store(true, Ordering::SeqCst);
                        wake.set();
                    }
                }
            },
        );
        match result {
            Ok(mut watcher) => {
                if let Err(err) = watcher.watch(&self.script, RecursiveMode::NonRecursive) {
                    warn!("file watcher unavailable: {}", err);
                    return;
                }
                self.watcher = Some(watcher);
            }
            Err(err) => warn!("file watcher unavailable: {}", err),
        }
    }
}
