//! Frame loop and window lifetime scenarios.

use core_types::{ScriptValue, WindowEventKind};
use runtime_core::{HeadlessHandle, HeadlessPlatform, RunOutcome, Runtime, RuntimeOptions};
use script_engine::Engine;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

fn headless_runtime() -> (Runtime, HeadlessHandle) {
    let (platform, handle) = HeadlessPlatform::new();
    let runtime =
        Runtime::new(RuntimeOptions::with_stub_engine(Box::new(platform), 2).unwrap()).unwrap();
    (runtime, handle)
}

#[test]
fn os_close_event_ends_the_loop() {
    let (mut runtime, handle) = headless_runtime();
    runtime.enter();
    let (window, _wrapper) = runtime.open_window("main", 640, 480, 0);

    // The update callback closes the window after the first frame, the way
    // an OS close event arriving mid-run would.
    let frames = Arc::new(AtomicU64::new(0));
    let counter = frames.clone();
    let pusher = handle.clone();
    let on_update = runtime.engine_mut().new_function(Box::new(move |_engine, _args| {
        if counter.fetch_add(1, Ordering::SeqCst) == 0 {
            pusher.push_event(1, WindowEventKind::CloseRequested);
        }
        Ok(ScriptValue::Undefined)
    }));
    runtime.set_on_update(window, on_update);

    let outcome = runtime.run();
    assert_eq!(outcome, RunOutcome::WindowsClosed);
    assert!(frames.load(Ordering::SeqCst) >= 1);
    assert_eq!(runtime.resources().window_count(), 0);
    assert_eq!(handle.alive_count(), 0);
    runtime.shutdown().unwrap();
}

#[test]
fn input_events_reach_the_window_callback() {
    let (mut runtime, handle) = headless_runtime();
    runtime.enter();
    let (window, _wrapper) = runtime.open_window("main", 640, 480, 0);

    let seen = Arc::new(std::sync::Mutex::new(Vec::new()));
    let sink = seen.clone();
    let on_event = runtime.engine_mut().new_function(Box::new(move |engine, args| {
        let event = &args[0];
        let kind = match engine.get_property(event, "type") {
            Some(ScriptValue::String(s)) => s,
            other => panic!("missing event type: {:?}", other),
        };
        sink.lock().unwrap().push(kind);
        Ok(ScriptValue::Undefined)
    }));
    runtime.set_on_event(window, on_event);

    handle.push_event(
        1,
        WindowEventKind::MouseDown {
            button: core_types::MouseButton::Left,
            x: 10.0,
            y: 12.0,
        },
    );
    handle.push_event(1, WindowEventKind::Key { code: 32, pressed: true });
    handle.push_event(1, WindowEventKind::CloseRequested);

    let outcome = runtime.run();
    assert_eq!(outcome, RunOutcome::WindowsClosed);
    assert_eq!(*seen.lock().unwrap(), vec!["mousedown", "key"]);
    runtime.shutdown().unwrap();
}

#[test]
fn uncaught_callback_error_terminates_non_dev_run() {
    let (mut runtime, _handle) = headless_runtime();
    runtime.enter();
    let (window, _wrapper) = runtime.open_window("main", 640, 480, 0);

    let on_update = runtime.engine_mut().new_function(Box::new(|_engine, _args| {
        Err(core_types::JsException::new(
            core_types::ExceptionKind::TypeError,
            "update exploded",
        ))
    }));
    runtime.set_on_update(window, on_update);

    let outcome = runtime.run();
    assert_eq!(outcome, RunOutcome::UncaughtException);
    assert_eq!(runtime.uncaught().unwrap().message, "update exploded");
    runtime.shutdown().unwrap();
}

#[test]
fn panicking_native_callback_is_captured_as_internal_error() {
    let (mut runtime, _handle) = headless_runtime();
    runtime.enter();
    let (window, _wrapper) = runtime.open_window("main", 640, 480, 0);

    let on_update = runtime.engine_mut().new_function(Box::new(|_engine, _args| {
        panic!("handle table corrupted");
    }));
    runtime.set_on_update(window, on_update);

    let outcome = runtime.run();
    assert_eq!(outcome, RunOutcome::UncaughtException);
    let message = &runtime.uncaught().unwrap().message;
    assert!(
        message.contains("handle table corrupted"),
        "message: {}",
        message
    );
    runtime.shutdown().unwrap();
}

#[test]
fn second_window_inherits_focus_after_active_closes() {
    let (mut runtime, _handle) = headless_runtime();
    runtime.enter();
    let (first, _w1) = runtime.open_window("one", 320, 200, 0);
    let (second, _w2) = runtime.open_window("two", 320, 200, 0);
    assert_eq!(runtime.resources().active_window(), Some(first));

    runtime.close_window(first);
    assert_eq!(runtime.resources().active_window(), Some(second));
    assert_eq!(runtime.resources().window_count(), 1);

    runtime.close_window(second);
    assert_eq!(runtime.resources().active_window(), None);
    runtime.shutdown().unwrap();
}
