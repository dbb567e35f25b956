//! Async file read resolving a script promise through the worker pool.

use runtime_core::{HeadlessPlatform, Runtime, RuntimeOptions};
use script_engine::{Engine, PromiseState};
use std::io::Write;

fn headless_runtime(workers: usize) -> Runtime {
    let (platform, _handle) = HeadlessPlatform::new();
    Runtime::new(RuntimeOptions::with_stub_engine(Box::new(platform), workers).unwrap()).unwrap()
}

#[test]
fn awaited_read_resolves_to_file_bytes() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("a.txt");
    std::fs::File::create(&path)
        .unwrap()
        .write_all(&[0x61, 0x62])
        .unwrap();

    let mut runtime = headless_runtime(2);
    runtime.enter();
    let promise = runtime.read_file_async(path);

    match runtime.await_settlement(&promise) {
        PromiseState::Fulfilled(value) => {
            let bytes = runtime.engine_mut().byte_array(&value).unwrap().to_vec();
            assert_eq!(bytes, vec![0x61, 0x62]);
            assert_eq!(String::from_utf8(bytes).unwrap(), "ab");
        }
        other => panic!("expected fulfillment, got {:?}", other),
    }

    assert_eq!(runtime.outstanding_promises(), 0);
    runtime.shutdown().unwrap();
    assert!(runtime.is_quiescent());
}

#[test]
fn read_of_missing_file_rejects_with_io_code() {
    let mut runtime = headless_runtime(1);
    runtime.enter();
    let promise = runtime.read_file_async("/definitely/not/here.txt".into());

    match runtime.await_settlement(&promise) {
        PromiseState::Rejected(value) => {
            let code = runtime.engine_mut().get_property(&value, "code");
            assert_eq!(code, Some(core_types::ScriptValue::Int(5)));
        }
        other => panic!("expected rejection, got {:?}", other),
    }
    runtime.shutdown().unwrap();
}

#[test]
fn many_reads_all_settle() {
    let dir = tempfile::tempdir().unwrap();
    let mut promises = Vec::new();

    let mut runtime = headless_runtime(4);
    runtime.enter();
    for n in 0..16 {
        let path = dir.path().join(format!("f{}.bin", n));
        std::fs::write(&path, vec![n as u8; 3]).unwrap();
        promises.push((n as u8, runtime.read_file_async(path)));
    }

    for (n, promise) in promises {
        match runtime.await_settlement(&promise) {
            PromiseState::Fulfilled(value) => {
                let bytes = runtime.engine_mut().byte_array(&value).unwrap();
                assert_eq!(bytes, &[n, n, n]);
            }
            other => panic!("read {} failed: {:?}", n, other),
        }
    }
    runtime.shutdown().unwrap();
}
