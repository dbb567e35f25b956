//! The event loop driver.
//!
//! One iteration of the frame loop: poll platform window events and dispatch
//! them through per-window callbacks, check termination conditions, step the
//! frame with FPS limiting, then — if the poller has signaled — run the main
//! event pump. The pump's draining order is contractual: worker completions
//! first (they may resolve promises), the reactor exactly once in
//! non-blocking mode (its callbacks may queue more microtasks), script
//! microtasks last, drained to fixed point.

use crate::platform::{Platform, PlatformEvent};
use crate::runtime::Runtime;
use core_types::{ExceptionKind, JsException, RuntimeError, ScriptValue, WindowEventKind};
use handle_table::WindowResource;
use reactor::Reactor;
use script_engine::{Engine, FinalizerPayload, Scope};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::Ordering;
use std::time::Duration;
use tracing::{debug, trace};
use work_queue::panic_message;

/// Why the frame loop stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    /// The last window closed.
    WindowsClosed,
    /// An uncaught exception terminated a non-dev run.
    UncaughtException,
    /// Dev mode asked for a hot restart.
    RestartRequested,
}

/// Bound on the main wakeup wait; exists so the loop can run periodic
/// liveness checks even when nothing signals.
pub(crate) const MAIN_WAIT: Duration = Duration::from_secs(4);

impl Runtime {
    /// Runs the frame loop until a termination condition holds.
    pub fn run(&mut self) -> RunOutcome {
        self.enter();
        loop {
            let events = self.platform.poll_events();
            for event in events {
                self.dispatch_window_event(&event);
            }

            if self.restart_flag.load(Ordering::SeqCst) {
                debug!("frame loop stopping: restart requested");
                return RunOutcome::RestartRequested;
            }
            if self.uncaught.is_some() && !self.dev_mode {
                debug!("frame loop stopping: uncaught exception");
                return RunOutcome::UncaughtException;
            }
            if self.resources.window_count() == 0 {
                debug!("frame loop stopping: all windows closed");
                return RunOutcome::WindowsClosed;
            }

            self.frame_step();

            let signaled = self.poller.as_ref().map(|p| p.signaled()).unwrap_or(false);
            if signaled {
                self.process_main_event_loop();
                if let Some(poller) = &self.poller {
                    poller.clear_signal();
                    poller.resume();
                }
            } else if self.work_queue.has_completions() || self.engine.has_pending_microtasks() {
                self.process_main_event_loop();
            }
        }
    }

    /// Drains completions, the reactor, and microtasks until no work remains
    /// and no registered promise is outstanding. Used by windowless runs and
    /// the test runner.
    pub fn drain_until_idle(&mut self) {
        self.enter();
        let mut stale_waits = 0;
        loop {
            self.process_main_event_loop();
            if let Some(poller) = &self.poller {
                if poller.signaled() {
                    poller.clear_signal();
                    poller.resume();
                }
            }
            if self.work_queue.has_completions() || self.engine.has_pending_microtasks() {
                continue;
            }
            if self.promises.outstanding() == 0 {
                break;
            }
            if self.main_event.wait_timeout(MAIN_WAIT) {
                self.main_event.clear();
                stale_waits = 0;
            } else {
                stale_waits += 1;
                if stale_waits >= 2 {
                    debug!(
                        outstanding = self.promises.outstanding(),
                        "giving up on promises that can no longer settle"
                    );
                    break;
                }
            }
        }
    }

    /// The main event pump. Draining order is contractual; see module docs.
    pub fn process_main_event_loop(&mut self) {
        let completions = self.work_queue.drain_completions();
        trace!(count = completions.len(), "dispatching completions");
        for completion in completions {
            completion.run(self);
        }

        self.reactor.run_nowait();

        self.engine.run_microtasks();

        let events = self.engine.drain_rejection_events();
        self.rejections.observe(events);

        self.drain_finalizers();
    }

    /// Applies finalizer payloads collected by the engine since the last
    /// pump: resource payloads free their table slot, weak payloads free
    /// theirs.
    pub fn drain_finalizers(&mut self) {
        for payload in self.engine.take_finalized() {
            match payload {
                FinalizerPayload::Resource(id) => self.resources.destroy(id),
                FinalizerPayload::Weak(id) => self.weak.destroy(id),
            }
        }
    }

    fn dispatch_window_event(&mut self, event: &PlatformEvent) {
        let Some(&resource) = self.window_map.get(&event.window) else {
            return;
        };
        match &event.kind {
            WindowEventKind::CloseRequested => {
                debug!(resource, "window close requested");
                self.resources.start_deinit(resource);
            }
            kind => {
                if self.js_error_state {
                    return;
                }
                let Some(callback) = self
                    .callbacks
                    .get(&resource)
                    .and_then(|c| c.on_event.clone())
                else {
                    return;
                };
                let argument = self.event_to_object(kind);
                self.call_callback(&callback, vec![argument]);
            }
        }
    }

    /// Invokes a script callback behind a panic boundary.
    ///
    /// A panic in a native path unwinds only to here; its message is
    /// captured as an internal error and recorded like any other uncaught
    /// exception. The engine scope releases during the unwind.
    fn call_callback(&mut self, callback: &ScriptValue, args: Vec<ScriptValue>) {
        let result = catch_unwind(AssertUnwindSafe(|| {
            let mut scope = Scope::enter(self.engine.as_mut());
            scope.call(callback, args)
        }));
        match result {
            Ok(Ok(_)) => {}
            Ok(Err(exception)) => self.record_uncaught(exception),
            Err(payload) => {
                let internal = RuntimeError::Internal(panic_message(payload.as_ref()));
                self.record_uncaught(JsException::new(
                    ExceptionKind::InternalError,
                    internal.to_string(),
                ));
            }
        }
    }

    fn event_to_object(&mut self, kind: &WindowEventKind) -> ScriptValue {
        let fields: Vec<(&str, ScriptValue)> = match kind {
            WindowEventKind::CloseRequested => vec![("type", self.bridge.from_str("close"))],
            WindowEventKind::Resized { width, height } => vec![
                ("type", self.bridge.from_str("resize")),
                ("width", self.bridge.from_u32(*width)),
                ("height", self.bridge.from_u32(*height)),
            ],
            WindowEventKind::Key { code, pressed } => vec![
                ("type", self.bridge.from_str("key")),
                ("code", self.bridge.from_u32(*code)),
                ("pressed", self.bridge.from_bool(*pressed)),
            ],
            WindowEventKind::MouseDown { button, x, y } => vec![
                ("type", self.bridge.from_str("mousedown")),
                ("button", self.bridge.from_enum(*button)),
                ("x", self.bridge.from_f32(*x)),
                ("y", self.bridge.from_f32(*y)),
            ],
            WindowEventKind::MouseUp { button, x, y } => vec![
                ("type", self.bridge.from_str("mouseup")),
                ("button", self.bridge.from_enum(*button)),
                ("x", self.bridge.from_f32(*x)),
                ("y", self.bridge.from_f32(*y)),
            ],
            WindowEventKind::MouseMoved { x, y } => vec![
                ("type", self.bridge.from_str("mousemove")),
                ("x", self.bridge.from_f32(*x)),
                ("y", self.bridge.from_f32(*y)),
            ],
        };
        self.bridge.from_fields(self.engine.as_mut(), fields)
    }

    /// One frame: user update callbacks, then end-of-frame with FPS
    /// limiting. A single window uses its own delay; multiple windows use
    /// the minimum delay across them.
    fn frame_step(&mut self) {
        let windows = self.resources.live_windows();
        if windows.is_empty() {
            return;
        }

        if !self.js_error_state {
            for &id in &windows {
                let Some(callback) = self
                    .callbacks
                    .get(&id)
                    .and_then(|c| c.on_update.clone())
                else {
                    continue;
                };
                self.call_callback(&callback, Vec::new());
            }
        }

        if windows.len() == 1 {
            let id = windows[0];
            if let Some(window) = self.resources.window_mut(id) {
                let delay = window.frame_delay_ms();
                window.end_frame(delay);
            }
        } else {
            let min_delay = windows
                .iter()
                .filter_map(|&id| self.resources.window_mut(id).map(|w| w.frame_delay_ms()))
                .min()
                .unwrap_or(0);
            for &id in &windows {
                if let Some(window) = self.resources.window_mut(id) {
                    window.end_frame(min_delay);
                }
            }
        }
    }
}
