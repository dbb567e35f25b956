//! Isolated test runner scenarios.

use core_types::{RuntimeError, ScriptValue};
use runtime_core::{HeadlessPlatform, Runtime, RuntimeOptions};
use script_engine::Engine;
use work_queue::TaskOutput;

fn headless_runtime() -> Runtime {
    let (platform, _handle) = HeadlessPlatform::new();
    Runtime::new(RuntimeOptions::with_stub_engine(Box::new(platform), 2).unwrap()).unwrap()
}

#[test]
fn failing_test_is_reported_and_counted() {
    let mut runtime = headless_runtime();
    runtime.enter();

    runtime.register_isolated_test("arithmetic", |rt| {
        let (id, promise) = rt.create_promise();
        rt.resolve_promise(id, TaskOutput::Int(4));
        promise
    });
    runtime.register_isolated_test("exploding", |rt| {
        let (id, promise) = rt.create_promise();
        rt.reject_promise_with(id, ScriptValue::String("boom".into()));
        promise
    });

    let report = runtime.run_isolated_tests();
    assert_eq!(report.total, 2);
    assert_eq!(report.passed, 1);
    assert!(!report.all_passed());
    runtime.shutdown().unwrap();
}

#[test]
fn async_test_is_awaited_before_the_next_runs() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("data.bin");
    std::fs::write(&path, [1, 2, 3]).unwrap();

    let mut runtime = headless_runtime();
    runtime.enter();

    let read_path = path.clone();
    runtime.register_isolated_test("reads file", move |rt| rt.read_file_async(read_path));
    runtime.register_isolated_test("missing file", |rt| {
        rt.read_file_async("/nowhere/gone.bin".into())
    });

    let report = runtime.run_isolated_tests();
    assert_eq!(report.total, 2);
    assert_eq!(report.passed, 1);
    runtime.shutdown().unwrap();
}

#[test]
fn plain_values_count_as_fulfilled() {
    let mut runtime = headless_runtime();
    runtime.enter();
    runtime.register_isolated_test("sync", |_rt| ScriptValue::Boolean(true));
    let report = runtime.run_isolated_tests();
    assert!(report.all_passed());
    runtime.shutdown().unwrap();
}

#[test]
fn failed_async_work_carries_the_error_code() {
    let mut runtime = headless_runtime();
    runtime.enter();
    let promise = runtime.spawn_async(Box::new(|| Err(RuntimeError::OutOfBounds)));
    match runtime.await_settlement(&promise) {
        script_engine::PromiseState::Rejected(value) => {
            assert_eq!(
                runtime.engine_mut().get_property(&value, "code"),
                Some(ScriptValue::Int(3))
            );
        }
        other => panic!("expected rejection, got {:?}", other),
    }
    runtime.shutdown().unwrap();
}
