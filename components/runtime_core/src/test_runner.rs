//! Isolated test execution.
//!
//! An isolated test is a named, deferred test case run sequentially on its
//! own: the runner invokes it, awaits the promise it returns before moving
//! to the next, and reports failures as `Test Failed: "<name>" <value>`.

use crate::event_loop::MAIN_WAIT;
use crate::runtime::Runtime;
use core_types::ScriptValue;
use script_engine::{Engine, PromiseState};
use std::time::Instant;
use tracing::info;

/// A deferred, sequentially executed asynchronous test case.
pub struct IsolatedTest {
    pub(crate) name: String,
    pub(crate) run: Box<dyn FnOnce(&mut Runtime) -> ScriptValue>,
}

/// Aggregate result of a test run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TestReport {
    /// Tests that settled successfully
    pub passed: usize,
    /// Tests executed
    pub total: usize,
}

impl TestReport {
    /// Whether every test passed.
    pub fn all_passed(&self) -> bool {
        self.passed == self.total
    }
}

impl Runtime {
    /// Defers a test case for [`Runtime::run_isolated_tests`].
    pub fn register_isolated_test(
        &mut self,
        name: impl Into<String>,
        run: impl FnOnce(&mut Runtime) -> ScriptValue + 'static,
    ) {
        self.isolated_tests.push(IsolatedTest {
            name: name.into(),
            run: Box::new(run),
        });
    }

    /// Number of deferred tests.
    pub fn isolated_test_count(&self) -> usize {
        self.isolated_tests.len()
    }

    /// Runs every deferred test one at a time, awaiting each before the
    /// next starts.
    pub fn run_isolated_tests(&mut self) -> TestReport {
        self.enter();
        let tests = std::mem::take(&mut self.isolated_tests);
        let total = tests.len();
        let mut passed = 0;

        for test in tests {
            let value = (test.run)(self);
            match self.await_settlement(&value) {
                PromiseState::Fulfilled(_) => {
                    passed += 1;
                    info!(name = %test.name, "test passed");
                }
                PromiseState::Rejected(reason) => {
                    println!("Test Failed: \"{}\" {}", test.name, reason);
                }
                PromiseState::Pending => unreachable!("await_settlement never returns pending"),
            }
        }
        TestReport { passed, total }
    }

    /// Drives the event loop until `value` settles.
    ///
    /// Non-promise values count as already fulfilled. A promise that stops
    /// making progress is failed rather than awaited forever.
    pub fn await_settlement(&mut self, value: &ScriptValue) -> PromiseState {
        let Some(state) = self.engine.promise_state(value) else {
            return PromiseState::Fulfilled(value.clone());
        };
        if state != PromiseState::Pending {
            return state;
        }

        let deadline = Instant::now() + MAIN_WAIT + MAIN_WAIT;
        loop {
            self.process_main_event_loop();
            if let Some(poller) = &self.poller {
                if poller.signaled() {
                    poller.clear_signal();
                    poller.resume();
                }
            }
            match self.engine.promise_state(value) {
                Some(PromiseState::Pending) | None => {}
                Some(settled) => return settled,
            }
            if Instant::now() >= deadline {
                return PromiseState::Rejected(ScriptValue::String(
                    "timed out awaiting settlement".into(),
                ));
            }
            self.main_event
                .wait_timeout(std::time::Duration::from_millis(20));
            self.main_event.clear();
        }
    }
}
