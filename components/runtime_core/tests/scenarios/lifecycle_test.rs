//! Lifecycle, draining-order, and handle-lifetime scenarios.

use core_types::{RuntimeError, ScriptValue};
use reactor::PipeReactor;
use runtime_core::{HeadlessPlatform, Runtime, RuntimeOptions};
use script_engine::{Engine, EngineConfig, PromiseState, StubEngine};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use work_queue::{Task, TaskOutput};

fn headless_runtime() -> Runtime {
    let (platform, _handle) = HeadlessPlatform::new();
    Runtime::new(RuntimeOptions::with_stub_engine(Box::new(platform), 2).unwrap()).unwrap()
}

#[test]
fn pump_drains_completions_then_reactor_then_microtasks() {
    let order: Arc<Mutex<Vec<&'static str>>> = Arc::new(Mutex::new(Vec::new()));

    let mut reactor = PipeReactor::new().unwrap();
    let log = order.clone();
    let handle_id = reactor.register(Box::new(move || log.lock().unwrap().push("reactor")));
    let notifier = reactor.notifier();

    let (platform, _handle) = HeadlessPlatform::new();
    let mut runtime = Runtime::new(RuntimeOptions {
        engine: Box::new(StubEngine::new(EngineConfig::default())),
        reactor: Box::new(reactor),
        platform: Box::new(platform),
        workers: 1,
        dev_mode: false,
    })
    .unwrap();
    runtime.enter();

    let log = order.clone();
    runtime.engine_mut().enqueue_microtask(Box::new(move |_engine| {
        log.lock().unwrap().push("microtask");
    }));
    notifier.make_ready(handle_id);

    let log = order.clone();
    let main_event = runtime.main_event();
    runtime.submit_task(Task::new(
        Box::new(|| Ok(TaskOutput::Unit)),
        Box::new(move |_rt: &mut Runtime, _out| log.lock().unwrap().push("completion")),
        Box::new(|_rt, _err| {}),
    ));

    assert!(main_event.wait_timeout(Duration::from_secs(5)));
    runtime.process_main_event_loop();

    assert_eq!(
        *order.lock().unwrap(),
        vec!["completion", "reactor", "microtask"]
    );
    runtime.shutdown().unwrap();
}

#[test]
fn rejection_with_known_error_carries_code() {
    let mut runtime = headless_runtime();
    runtime.enter();

    let (id, promise) = runtime.create_promise();
    runtime.reject_promise(id, RuntimeError::IndexOutOfBounds);

    match runtime.engine_mut().promise_state(&promise) {
        Some(PromiseState::Rejected(value)) => {
            assert_eq!(
                runtime.engine_mut().get_property(&value, "code"),
                Some(ScriptValue::Int(4))
            );
            assert_eq!(
                runtime.engine_mut().get_property(&value, "message"),
                Some(ScriptValue::String("index out of bounds".into()))
            );
        }
        other => panic!("expected rejection, got {:?}", other),
    }

    // The entry was consumed; a second settlement is a no-op.
    runtime.resolve_promise(id, TaskOutput::Int(5));
    assert!(matches!(
        runtime.engine_mut().promise_state(&promise),
        Some(PromiseState::Rejected(_))
    ));
    runtime.shutdown().unwrap();
}

#[test]
fn window_slot_is_freed_only_by_the_finalizer() {
    let mut runtime = headless_runtime();
    runtime.enter();
    let (id, _wrapper) = runtime.open_window("short-lived", 100, 100, 0);

    let fired = Arc::new(AtomicU32::new(0));
    let counter = fired.clone();
    runtime.set_on_deinit(id, Box::new(move || {
        counter.fetch_add(1, Ordering::SeqCst);
    }));

    runtime.close_window(id);
    assert!(runtime.resources().contains(id), "slot survives deinit");
    assert_eq!(fired.load(Ordering::SeqCst), 0);

    runtime.engine_mut().collect_garbage();
    runtime.drain_finalizers();

    assert!(!runtime.resources().contains(id));
    assert_eq!(fired.load(Ordering::SeqCst), 1);
    runtime.shutdown().unwrap();
}

#[test]
fn weak_handle_expires_after_explicit_deinit() {
    let mut runtime = headless_runtime();
    runtime.enter();
    let (id, wrapper) = runtime.create_weak(
        core_types::HandleTag::HttpServer,
        "HttpServer",
        Box::new(0x5eu8),
    );

    assert_eq!(
        runtime.lookup_weak(&wrapper, core_types::HandleTag::HttpServer),
        Ok(id)
    );

    runtime.deinit_weak(id);
    assert_eq!(
        runtime.lookup_weak(&wrapper, core_types::HandleTag::HttpServer),
        Err(RuntimeError::HandleExpired)
    );

    runtime.engine_mut().collect_garbage();
    runtime.drain_finalizers();
    assert!(runtime.weak_handles().is_empty());
    runtime.shutdown().unwrap();
}

#[test]
fn unhandled_rejection_is_tracked_and_retracted() {
    let mut runtime = headless_runtime();
    runtime.enter();

    let (id, promise) = runtime.create_promise();
    runtime.reject_promise_with(id, ScriptValue::String("nobody listening".into()));
    runtime.process_main_event_loop();
    assert_eq!(runtime.pending_rejections(), 1);

    runtime.engine_mut().attach_rejection_handler(&promise);
    runtime.process_main_event_loop();
    assert_eq!(runtime.pending_rejections(), 0);
    runtime.shutdown().unwrap();
}

#[test]
fn module_with_rejection_directive_reports_at_shutdown() {
    let dir = tempfile::tempdir().unwrap();
    let script = dir.path().join("main.js");
    std::fs::write(
        &script,
        "// @emit: unhandled-rejection boom\nexport const loaded = true;\n",
    )
    .unwrap();

    let mut runtime = headless_runtime();
    runtime.enter();
    runtime.load_main(&script).unwrap();
    runtime.process_main_event_loop();
    assert_eq!(runtime.pending_rejections(), 1);
    runtime.shutdown().unwrap();
    assert_eq!(runtime.pending_rejections(), 0);
}

#[test]
fn shutdown_leaves_workers_and_reactor_quiescent() {
    let mut runtime = headless_runtime();
    runtime.enter();
    let _promise = runtime.spawn_async(Box::new(|| {
        std::thread::sleep(Duration::from_millis(20));
        Ok(TaskOutput::Unit)
    }));
    runtime.shutdown().unwrap();
    assert!(runtime.is_quiescent());
}
