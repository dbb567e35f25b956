//! Task and completion types.
//!
//! A task is an owned closure executed on a worker thread, paired with two
//! continuations that run back on the main thread. Closure payloads are
//! moved across the thread boundary, never shared.

use core_types::{FileEntry, HttpResponse, RuntimeError};
use std::any::Any;

/// Typed output of a completed task.
///
/// Native async operations produce one of a closed set of shapes; the
/// success continuation matches on the variant it expects.
#[derive(Debug, Clone, PartialEq)]
pub enum TaskOutput {
    /// No payload
    Unit,
    /// Raw bytes (file reads, response bodies)
    Bytes(Vec<u8>),
    /// UTF-8 text
    Text(String),
    /// An integer result (sizes, counts)
    Int(i64),
    /// Directory listing
    Entries(Vec<FileEntry>),
    /// HTTP exchange result
    Http(HttpResponse),
}

/// Work function executed on a worker thread.
pub type WorkFn = Box<dyn FnOnce() -> Result<TaskOutput, RuntimeError> + Send>;

/// Success continuation, run on the main thread.
pub type OnSuccess<C> = Box<dyn FnOnce(&mut C, TaskOutput) + Send>;

/// Failure continuation, run on the main thread.
pub type OnFailure<C> = Box<dyn FnOnce(&mut C, RuntimeError) + Send>;

/// Extracts the human-readable message from a panic payload.
///
/// Native paths run behind a `catch_unwind` boundary; a panic unwinds only
/// to that boundary and its message is captured for diagnostics.
pub fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "native panic".to_string()
    }
}

/// An owned unit of work plus its main-thread continuations.
pub struct Task<C> {
    pub(crate) work: WorkFn,
    pub(crate) on_success: OnSuccess<C>,
    pub(crate) on_failure: OnFailure<C>,
}

impl<C> Task<C> {
    /// Creates a task from a work closure and its continuations.
    pub fn new(work: WorkFn, on_success: OnSuccess<C>, on_failure: OnFailure<C>) -> Self {
        Self {
            work,
            on_success,
            on_failure,
        }
    }
}

impl<C> std::fmt::Debug for Task<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Task {{ ... }}")
    }
}

/// A finished task waiting to run its continuation on the main thread.
pub struct Completion<C> {
    pub(crate) on_success: OnSuccess<C>,
    pub(crate) on_failure: OnFailure<C>,
    pub(crate) result: Result<TaskOutput, RuntimeError>,
}

impl<C> Completion<C> {
    /// Runs the matching continuation.
    pub fn run(self, ctx: &mut C) {
        match self.result {
            Ok(output) => (self.on_success)(ctx, output),
            Err(err) => (self.on_failure)(ctx, err),
        }
    }

    /// Whether the task succeeded.
    pub fn is_success(&self) -> bool {
        self.result.is_ok()
    }
}

impl<C> std::fmt::Debug for Completion<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.result {
            Ok(output) => write!(f, "Completion {{ ok: {:?} }}", output),
            Err(err) => write!(f, "Completion {{ err: {} }}", err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn completion_runs_success_continuation() {
        let completion: Completion<Vec<&'static str>> = Completion {
            on_success: Box::new(|log, out| {
                assert_eq!(out, TaskOutput::Int(3));
                log.push("ok");
            }),
            on_failure: Box::new(|log, _| log.push("err")),
            result: Ok(TaskOutput::Int(3)),
        };
        let mut log = Vec::new();
        completion.run(&mut log);
        assert_eq!(log, vec!["ok"]);
    }

    #[test]
    fn completion_runs_failure_continuation() {
        let completion: Completion<Vec<&'static str>> = Completion {
            on_success: Box::new(|log, _| log.push("ok")),
            on_failure: Box::new(|log, err| {
                assert_eq!(err, RuntimeError::OutOfBounds);
                log.push("err");
            }),
            result: Err(RuntimeError::OutOfBounds),
        };
        let mut log = Vec::new();
        completion.run(&mut log);
        assert_eq!(log, vec!["err"]);
    }
}
