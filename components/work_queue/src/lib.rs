//! Parallel worker pool for the Nebula runtime.
//!
//! Native functions that perform long or blocking work submit a [`Task`] —
//! an owned closure returning `Result<TaskOutput, RuntimeError>` plus typed
//! success/failure continuations. A worker executes the closure and pushes
//! the completion onto a locked done-queue; the main thread drains
//! completions strictly in FIFO dequeue order and runs each continuation
//! against its own context.
//!
//! Ordering guarantee: within a single worker, completions are enqueued in
//! execution order; across workers no ordering is guaranteed.
//!
//! A panicking task unwinds only to the worker's panic boundary: the worker
//! survives, and the failure continuation receives an internal error
//! carrying the captured panic message.
//!
//! # Examples
//!
//! ```
//! use std::sync::Arc;
//! use reactor::{ReactorWake, WakeEvent};
//! use work_queue::{Task, TaskOutput, WorkQueue};
//!
//! struct NoWake;
//! impl ReactorWake for NoWake { fn wake(&self) {} }
//!
//! let main_event = Arc::new(WakeEvent::new());
//! let mut queue: WorkQueue<Vec<i64>> = WorkQueue::new(2, main_event.clone(), Arc::new(NoWake));
//! queue.submit(Task::new(
//!     Box::new(|| Ok(TaskOutput::Int(42))),
//!     Box::new(|sink: &mut Vec<i64>, out| {
//!         if let TaskOutput::Int(n) = out { sink.push(n); }
//!     }),
//!     Box::new(|_, _| {}),
//! ));
//! main_event.wait();
//! let mut sink = Vec::new();
//! for completion in queue.drain_completions() {
//!     completion.run(&mut sink);
//! }
//! assert_eq!(sink, vec![42]);
//! queue.shutdown();
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

mod queue;
mod task;

pub use queue::WorkQueue;
pub use task::{panic_message, Completion, OnFailure, OnSuccess, Task, TaskOutput, WorkFn};
