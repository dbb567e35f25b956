//! Dev-mode hot restart scenarios.

use core_types::WindowEventKind;
use runtime_core::{DevOptions, DevSession, HeadlessPlatform, RunOutcome};
use std::path::PathBuf;

fn write_script(dir: &std::path::Path, body: &str) -> PathBuf {
    let path = dir.join("app.js");
    std::fs::write(&path, body).unwrap();
    path
}

#[test]
fn restart_preserves_the_chrome_window() {
    let dir = tempfile::tempdir().unwrap();
    let script = write_script(dir.path(), "export const version = 1;\n");

    let (platform, handle) = HeadlessPlatform::new();
    let mut session =
        DevSession::new(DevOptions::with_stub_engine(script.clone(), Box::new(platform))).unwrap();

    assert_eq!(handle.alive_count(), 1);
    assert!(session.runtime().main_script().is_some());

    std::fs::write(&script, "export const version = 2;\n").unwrap();
    session.request_restart();
    assert_eq!(session.runtime_mut().run(), RunOutcome::RestartRequested);
    session.restart_now().unwrap();

    // The chrome's OS window survived; no duplicate window appeared; the
    // script re-executed in a fresh engine.
    assert_eq!(handle.alive_count(), 1);
    assert!(handle.window_alive(1));
    assert!(session.runtime().main_script().is_some());
    assert!(!session.runtime().in_js_error_state());

    handle.push_event(1, WindowEventKind::CloseRequested);
    assert_eq!(session.runtime_mut().run(), RunOutcome::WindowsClosed);
    session.runtime_mut().shutdown().unwrap();
}

#[test]
fn script_error_enters_js_error_state_without_killing_the_chrome() {
    let dir = tempfile::tempdir().unwrap();
    let script = write_script(dir.path(), "// @fail: parse\n");

    let (platform, handle) = HeadlessPlatform::new();
    let mut session =
        DevSession::new(DevOptions::with_stub_engine(script.clone(), Box::new(platform))).unwrap();

    assert!(session.runtime().in_js_error_state());
    assert_eq!(handle.alive_count(), 1);

    // A fixed script restarts out of the error state.
    std::fs::write(&script, "export const fixed = true;\n").unwrap();
    session.request_restart();
    assert_eq!(session.runtime_mut().run(), RunOutcome::RestartRequested);
    session.restart_now().unwrap();
    assert!(!session.runtime().in_js_error_state());
    assert!(session.runtime().main_script().is_some());

    handle.push_event(1, WindowEventKind::CloseRequested);
    assert_eq!(session.runtime_mut().run(), RunOutcome::WindowsClosed);
    session.runtime_mut().shutdown().unwrap();
}

#[test]
fn evaluation_failure_is_contained_to_the_error_state() {
    let dir = tempfile::tempdir().unwrap();
    let script = write_script(dir.path(), "// @fail: evaluate startup crashed\n");

    let (platform, handle) = HeadlessPlatform::new();
    let session =
        DevSession::new(DevOptions::with_stub_engine(script, Box::new(platform))).unwrap();

    assert!(session.runtime().in_js_error_state());
    assert_eq!(handle.alive_count(), 1);
}
