//! Integration test runner for the end-to-end runtime scenarios
//! This file makes cargo test discover the scenario test modules

#![cfg(unix)]

#[path = "scenarios/async_read_test.rs"]
mod async_read_test;

#[path = "scenarios/window_close_test.rs"]
mod window_close_test;

#[path = "scenarios/lifecycle_test.rs"]
mod lifecycle_test;

#[path = "scenarios/dev_restart_test.rs"]
mod dev_restart_test;

#[path = "scenarios/test_runner_test.rs"]
mod test_runner_test;
