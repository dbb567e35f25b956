//! The worker pool.
//!
//! A fixed pool of named worker threads pulls tasks from a shared pending
//! queue. Each worker owns a wakeup event and a close flag. Completions are
//! pushed onto the locked done-queue in execution order, then the worker
//! signals the main event and posts a dummy reactor event so the event loop
//! driver wakes.

use crate::task::{panic_message, Completion, Task};
use core_types::RuntimeError;
use reactor::{ReactorWake, WakeEvent};
use std::collections::VecDeque;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;
use tracing::{debug, trace};

struct Shared<C> {
    pending: Mutex<VecDeque<Task<C>>>,
    done: Mutex<VecDeque<Completion<C>>>,
    main_event: Arc<WakeEvent>,
    reactor_wake: Arc<dyn ReactorWake>,
}

struct WorkerHandle {
    close: Arc<AtomicBool>,
    wake: Arc<WakeEvent>,
    thread: Option<JoinHandle<()>>,
}

/// Fixed pool of worker threads with main-thread completion dispatch.
///
/// `C` is the main-thread context continuations run against; it never
/// crosses a thread boundary.
pub struct WorkQueue<C> {
    shared: Arc<Shared<C>>,
    workers: Vec<WorkerHandle>,
    next_worker: usize,
}

impl<C: 'static> WorkQueue<C> {
    /// Spawns `worker_count` workers.
    ///
    /// `main_event` is signaled and a dummy reactor event posted whenever a
    /// completion lands, so the driver wakes even while blocked.
    pub fn new(
        worker_count: usize,
        main_event: Arc<WakeEvent>,
        reactor_wake: Arc<dyn ReactorWake>,
    ) -> Self {
        let shared = Arc::new(Shared {
            pending: Mutex::new(VecDeque::new()),
            done: Mutex::new(VecDeque::new()),
            main_event,
            reactor_wake,
        });

        let workers = (0..worker_count.max(1))
            .map(|index| {
                let close = Arc::new(AtomicBool::new(false));
                let wake = Arc::new(WakeEvent::new());
                let thread = spawn_worker(index, shared.clone(), close.clone(), wake.clone());
                WorkerHandle {
                    close,
                    wake,
                    thread: Some(thread),
                }
            })
            .collect();

        Self {
            shared,
            workers,
            next_worker: 0,
        }
    }

    /// Number of workers in the pool.
    pub fn worker_count(&self) -> usize {
        self.workers.len()
    }

    /// Enqueues a task and wakes one worker.
    pub fn submit(&mut self, task: Task<C>) {
        self.shared.pending.lock().unwrap().push_back(task);
        let worker = &self.workers[self.next_worker % self.workers.len()];
        self.next_worker = self.next_worker.wrapping_add(1);
        worker.wake.set();
    }

    /// Whether completions are waiting to be dispatched.
    pub fn has_completions(&self) -> bool {
        !self.shared.done.lock().unwrap().is_empty()
    }

    /// Dequeues all pending completions in FIFO order.
    ///
    /// The caller runs each against the main-thread context; splitting the
    /// drain from the dispatch keeps the done-queue lock out of continuation
    /// code.
    pub fn drain_completions(&mut self) -> Vec<Completion<C>> {
        let mut done = self.shared.done.lock().unwrap();
        done.drain(..).collect()
    }

    /// Whether every worker has exited and cleared its close flag.
    pub fn is_quiescent(&self) -> bool {
        self.workers
            .iter()
            .all(|w| w.thread.is_none() && !w.close.load(Ordering::SeqCst))
    }

    /// First shutdown phase: sets every worker's close flag and signals its
    /// wakeup event. Workers finish their in-flight task and exit.
    pub fn begin_shutdown(&mut self) {
        for worker in &self.workers {
            worker.close.store(true, Ordering::SeqCst);
            worker.wake.set();
        }
    }

    /// Second shutdown phase: joins each worker, then discards whatever
    /// remains queued. In-flight tasks ran to completion; their completions
    /// (and any never-started tasks) are dropped, which is what cancels
    /// pending continuations.
    pub fn finish_shutdown(&mut self) {
        for worker in &mut self.workers {
            if let Some(thread) = worker.thread.take() {
                let _ = thread.join();
            }
        }
        let dropped_tasks = self.shared.pending.lock().unwrap().len();
        let dropped_completions = self.shared.done.lock().unwrap().len();
        self.shared.pending.lock().unwrap().clear();
        self.shared.done.lock().unwrap().clear();
        if dropped_tasks > 0 || dropped_completions > 0 {
            debug!(
                dropped_tasks,
                dropped_completions, "work queue discarded work at shutdown"
            );
        }
    }

    /// Both shutdown phases back to back.
    pub fn shutdown(&mut self) {
        self.begin_shutdown();
        self.finish_shutdown();
    }
}

impl<C> Drop for WorkQueue<C> {
    fn drop(&mut self) {
        for worker in &self.workers {
            worker.close.store(true, Ordering::SeqCst);
            worker.wake.set();
        }
        for worker in &mut self.workers {
            if let Some(thread) = worker.thread.take() {
                let _ = thread.join();
            }
        }
    }
}

fn spawn_worker<C: 'static>(
    index: usize,
    shared: Arc<Shared<C>>,
    close: Arc<AtomicBool>,
    wake: Arc<WakeEvent>,
) -> JoinHandle<()> {
    std::thread::Builder::new()
        .name(format!("nebula-worker-{}", index))
        .spawn(move || {
            loop {
                if close.load(Ordering::SeqCst) {
                    break;
                }
                let task = shared.pending.lock().unwrap().pop_front();
                match task {
                    Some(task) => {
                        // Panic boundary for the native path: a panicking
                        // task unwinds only to here and surfaces as an
                        // internal error through the failure continuation.
                        let result = catch_unwind(AssertUnwindSafe(task.work))
                            .unwrap_or_else(|payload| {
                                Err(RuntimeError::Internal(panic_message(payload.as_ref())))
                            });
                        trace!(worker = index, ok = result.is_ok(), "task finished");
                        shared.done.lock().unwrap().push_back(Completion {
                            on_success: task.on_success,
                            on_failure: task.on_failure,
                            result,
                        });
                        shared.main_event.set();
                        shared.reactor_wake.wake();
                    }
                    None => wake.wait_and_clear(),
                }
            }
            // Clearing the flag acknowledges shutdown.
            close.store(false, Ordering::SeqCst);
        })
        .expect("failed to spawn worker thread")
}
