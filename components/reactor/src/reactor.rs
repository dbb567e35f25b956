//! The reactor seam and the self-pipe reference reactor.
//!
//! The orchestration layer treats the reactor as a black box with the
//! contract "block until ready or timeout expires, then dispatch completion
//! callbacks". The [`Reactor`] trait captures the slice of that contract the
//! runtime needs; [`PipeReactor`] is the in-repo implementation backing the
//! CLI and tests.

use crate::WakeEvent;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use thiserror::Error;
use tracing::debug;

/// The descriptor the poller thread blocks on.
#[cfg(unix)]
pub type BackendHandle = std::os::unix::io::RawFd;
/// The completion port the poller thread blocks on.
#[cfg(windows)]
pub type BackendHandle = isize;

/// Timeout cell value meaning "block indefinitely".
pub const TIMEOUT_INFINITE: u64 = u64::MAX;

/// Id of a handle registered with the reactor.
pub type ReactorHandleId = u32;

/// Errors surfaced by reactor teardown.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ReactorError {
    /// The reactor still has live handles or requests after draining.
    #[error("reactor refused to close: {live} handles still live")]
    Busy {
        /// Handles remaining
        live: usize,
    },
}

/// Cross-thread wakeup for a reactor.
///
/// Worker threads and the shutdown path use this to post a dummy async event
/// that unblocks the poller's wait.
pub trait ReactorWake: Send + Sync {
    /// Posts a dummy event to the reactor's backend.
    fn wake(&self);
}

/// The reactor seam.
///
/// Implementations live on the main thread; only [`Reactor::wake_handle`]
/// escapes to other threads.
pub trait Reactor {
    /// The backend descriptor the poller blocks on.
    fn backend(&self) -> BackendHandle;

    /// Shared cell holding the advertised poll timeout in milliseconds.
    ///
    /// [`TIMEOUT_INFINITE`] means block until an event arrives.
    fn advertised_timeout(&self) -> Arc<AtomicU64>;

    /// A cloneable cross-thread wakeup for this reactor.
    fn wake_handle(&self) -> Arc<dyn ReactorWake>;

    /// Runs ready callbacks without blocking. Returns how many fired.
    fn run_nowait(&mut self) -> usize;

    /// Number of live (registered, not yet closed) handles.
    fn live_handles(&self) -> usize;

    /// Walks live handles and closes any not already closing.
    fn close_all(&mut self);

    /// Final teardown: drains until quiet, then verifies nothing is live.
    fn stop(&mut self) -> Result<(), ReactorError>;
}

// ---------------------------------------------------------------------------
// PipeReactor (unix)
// ---------------------------------------------------------------------------

/// Shared notifier half of a [`PipeReactor`].
#[cfg(unix)]
pub struct PipeNotifier {
    write_fd: BackendHandle,
    ready: Arc<Mutex<VecDeque<ReactorHandleId>>>,
}

#[cfg(unix)]
impl PipeNotifier {
    /// Marks a registered handle ready and wakes the poller.
    pub fn make_ready(&self, id: ReactorHandleId) {
        self.ready.lock().unwrap().push_back(id);
        self.wake();
    }
}

#[cfg(unix)]
impl ReactorWake for PipeNotifier {
    fn wake(&self) {
        let byte = [1u8];
        // EAGAIN just means the pipe already holds a pending wakeup.
        unsafe {
            libc::write(self.write_fd, byte.as_ptr() as *const libc::c_void, 1);
        }
    }
}

#[cfg(unix)]
struct PipeHandle {
    callback: Box<dyn FnMut()>,
    closing: bool,
}

/// Self-pipe reactor: completion callbacks keyed by handle id, readiness
/// queued cross-thread, wakeups delivered by writing to the pipe.
///
/// # Examples
///
/// ```
/// use reactor::{PipeReactor, Reactor};
///
/// let mut reactor = PipeReactor::new().unwrap();
/// let fired = std::rc::Rc::new(std::cell::Cell::new(false));
/// let flag = fired.clone();
/// let id = reactor.register(Box::new(move || flag.set(true)));
/// reactor.notifier().make_ready(id);
/// reactor.run_nowait();
/// assert!(fired.get());
/// # reactor.close_handle(id);
/// # reactor.stop().unwrap();
/// ```
#[cfg(unix)]
pub struct PipeReactor {
    read_fd: BackendHandle,
    write_fd: BackendHandle,
    handles: Vec<Option<PipeHandle>>,
    ready: Arc<Mutex<VecDeque<ReactorHandleId>>>,
    timeout: Arc<AtomicU64>,
}

#[cfg(unix)]
impl PipeReactor {
    /// Creates the reactor with a non-blocking self-pipe.
    pub fn new() -> std::io::Result<Self> {
        let mut fds = [0i32; 2];
        if unsafe { libc::pipe(fds.as_mut_ptr()) } != 0 {
            return Err(std::io::Error::last_os_error());
        }
        for fd in fds {
            unsafe {
                let flags = libc::fcntl(fd, libc::F_GETFL);
                libc::fcntl(fd, libc::F_SETFL, flags | libc::O_NONBLOCK);
            }
        }
        Ok(Self {
            read_fd: fds[0],
            write_fd: fds[1],
            handles: Vec::new(),
            ready: Arc::new(Mutex::new(VecDeque::new())),
            timeout: Arc::new(AtomicU64::new(TIMEOUT_INFINITE)),
        })
    }

    /// Registers a completion callback; returns its handle id.
    pub fn register(&mut self, callback: Box<dyn FnMut()>) -> ReactorHandleId {
        let handle = PipeHandle {
            callback,
            closing: false,
        };
        if let Some(slot) = self.handles.iter().position(|h| h.is_none()) {
            self.handles[slot] = Some(handle);
            slot as ReactorHandleId
        } else {
            self.handles.push(Some(handle));
            (self.handles.len() - 1) as ReactorHandleId
        }
    }

    /// Closes a handle; its callback will not fire again.
    pub fn close_handle(&mut self, id: ReactorHandleId) {
        if let Some(slot) = self.handles.get_mut(id as usize) {
            *slot = None;
        }
    }

    /// Returns the cloneable notifier half.
    pub fn notifier(&self) -> Arc<PipeNotifier> {
        Arc::new(PipeNotifier {
            write_fd: self.write_fd,
            ready: self.ready.clone(),
        })
    }

    fn drain_pipe(&self) {
        let mut buf = [0u8; 64];
        loop {
            let n = unsafe {
                libc::read(self.read_fd, buf.as_mut_ptr() as *mut libc::c_void, buf.len())
            };
            if n <= 0 {
                break;
            }
        }
    }
}

#[cfg(unix)]
impl Reactor for PipeReactor {
    fn backend(&self) -> BackendHandle {
        self.read_fd
    }

    fn advertised_timeout(&self) -> Arc<AtomicU64> {
        self.timeout.clone()
    }

    fn wake_handle(&self) -> Arc<dyn ReactorWake> {
        self.notifier()
    }

    fn run_nowait(&mut self) -> usize {
        self.drain_pipe();
        let mut fired = 0;
        loop {
            let next = self.ready.lock().unwrap().pop_front();
            let Some(id) = next else { break };
            if let Some(Some(handle)) = self.handles.get_mut(id as usize) {
                if !handle.closing {
                    (handle.callback)();
                    fired += 1;
                }
            }
        }
        fired
    }

    fn live_handles(&self) -> usize {
        self.handles
            .iter()
            .filter(|h| matches!(h, Some(handle) if !handle.closing))
            .count()
    }

    fn close_all(&mut self) {
        for slot in self.handles.iter_mut() {
            if let Some(handle) = slot {
                if !handle.closing {
                    handle.closing = true;
                }
            }
        }
    }

    fn stop(&mut self) -> Result<(), ReactorError> {
        // Drain anything already queued, then drop closing handles.
        while self.run_nowait() > 0 {}
        for slot in self.handles.iter_mut() {
            if matches!(slot, Some(handle) if handle.closing) {
                *slot = None;
            }
        }
        let live = self.handles.iter().filter(|h| h.is_some()).count();
        if live > 0 {
            return Err(ReactorError::Busy { live });
        }
        self.ready.lock().unwrap().clear();
        debug!("reactor stopped");
        Ok(())
    }
}

#[cfg(unix)]
impl Drop for PipeReactor {
    fn drop(&mut self) {
        unsafe {
            libc::close(self.read_fd);
            libc::close(self.write_fd);
        }
    }
}
