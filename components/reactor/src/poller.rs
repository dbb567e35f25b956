//! The dedicated reactor poller thread.
//!
//! The script engine is single-threaded and must never block on I/O, yet the
//! reactor wants an efficient blocking wait. The poller is that wait: a
//! dedicated OS thread that blocks on the reactor's backend descriptor with
//! the reactor-advertised timeout, signals the main thread, then parks until
//! the main thread has drained the reactor before polling again.

use crate::{BackendHandle, ReactorWake, WakeEvent, TIMEOUT_INFINITE};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use tracing::debug;

struct PollerShared {
    close: AtomicBool,
    signaled: AtomicBool,
    resume: WakeEvent,
    main_event: Arc<WakeEvent>,
    timeout: Arc<AtomicU64>,
}

/// Handle to the running poller thread.
pub struct Poller {
    shared: Arc<PollerShared>,
    thread: Option<JoinHandle<()>>,
}

impl Poller {
    /// Spawns the poller thread over the reactor's backend descriptor.
    pub fn spawn(
        backend: BackendHandle,
        timeout: Arc<AtomicU64>,
        main_event: Arc<WakeEvent>,
    ) -> std::io::Result<Self> {
        let shared = Arc::new(PollerShared {
            close: AtomicBool::new(false),
            signaled: AtomicBool::new(false),
            resume: WakeEvent::new(),
            main_event,
            timeout,
        });
        let wait = OsWait::new(backend)?;
        let remote = shared.clone();
        let thread = std::thread::Builder::new()
            .name("nebula-reactor-poller".to_string())
            .spawn(move || poller_main(wait, remote))?;
        Ok(Self {
            shared,
            thread: Some(thread),
        })
    }

    /// Whether the poller has signaled readiness since the last clear.
    pub fn signaled(&self) -> bool {
        self.shared.signaled.load(Ordering::SeqCst)
    }

    /// Clears the readiness signal after the driver has drained the reactor.
    pub fn clear_signal(&self) {
        self.shared.signaled.store(false, Ordering::SeqCst);
    }

    /// Lets the poller block on the backend again.
    pub fn resume(&self) {
        self.shared.resume.set();
    }

    /// Shuts the poller down.
    ///
    /// Sets the close flag, posts a dummy reactor event to unblock the OS
    /// wait, signals the resume event, then spins until the poller clears
    /// the flag on exit.
    pub fn shutdown(&mut self, wake: &dyn ReactorWake) {
        self.shared.close.store(true, Ordering::SeqCst);
        wake.wake();
        self.shared.resume.set();
        while self.shared.close.load(Ordering::SeqCst) {
            std::thread::yield_now();
        }
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
        debug!("reactor poller stopped");
    }
}

fn poller_main(wait: OsWait, shared: Arc<PollerShared>) {
    loop {
        if shared.close.load(Ordering::SeqCst) {
            break;
        }
        wait.wait(shared.timeout.load(Ordering::SeqCst));
        if shared.close.load(Ordering::SeqCst) {
            break;
        }
        shared.signaled.store(true, Ordering::SeqCst);
        shared.main_event.set();
        shared.resume.wait_and_clear();
    }
    // Clearing the flag acknowledges shutdown to the main thread.
    shared.close.store(false, Ordering::SeqCst);
}

// ---------------------------------------------------------------------------
// Per-OS blocking waits
// ---------------------------------------------------------------------------

#[cfg(target_os = "linux")]
struct OsWait {
    epfd: BackendHandle,
    backend: BackendHandle,
}

#[cfg(target_os = "linux")]
impl OsWait {
    fn new(backend: BackendHandle) -> std::io::Result<Self> {
        let epfd = unsafe { libc::epoll_create1(libc::EPOLL_CLOEXEC) };
        if epfd < 0 {
            return Err(std::io::Error::last_os_error());
        }
        // Level-triggered read interest: the main thread drains the backend.
        let mut event = libc::epoll_event {
            events: libc::EPOLLIN as u32,
            u64: backend as u64,
        };
        let rc = unsafe { libc::epoll_ctl(epfd, libc::EPOLL_CTL_ADD, backend, &mut event) };
        if rc != 0 {
            let err = std::io::Error::last_os_error();
            unsafe { libc::close(epfd) };
            return Err(err);
        }
        Ok(Self { epfd, backend })
    }

    fn wait(&self, timeout_ms: u64) {
        let timeout = if timeout_ms == TIMEOUT_INFINITE {
            -1
        } else {
            timeout_ms.min(i32::MAX as u64) as i32
        };
        let mut event = libc::epoll_event {
            events: 0,
            u64: self.backend as u64,
        };
        loop {
            let n = unsafe { libc::epoll_wait(self.epfd, &mut event, 1, timeout) };
            if n >= 0 {
                break;
            }
            if std::io::Error::last_os_error().raw_os_error() != Some(libc::EINTR) {
                break;
            }
        }
    }
}

#[cfg(target_os = "linux")]
impl Drop for OsWait {
    fn drop(&mut self) {
        unsafe { libc::close(self.epfd) };
    }
}

#[cfg(all(unix, not(target_os = "linux")))]
struct OsWait {
    backend: BackendHandle,
}

#[cfg(all(unix, not(target_os = "linux")))]
impl OsWait {
    fn new(backend: BackendHandle) -> std::io::Result<Self> {
        Ok(Self { backend })
    }

    fn wait(&self, timeout_ms: u64) {
        loop {
            let mut readfds: libc::fd_set = unsafe { std::mem::zeroed() };
            unsafe {
                libc::FD_ZERO(&mut readfds);
                libc::FD_SET(self.backend, &mut readfds);
            }
            let mut tv = libc::timeval {
                tv_sec: (timeout_ms / 1000) as _,
                tv_usec: ((timeout_ms % 1000) * 1000) as _,
            };
            let tv_ptr = if timeout_ms == TIMEOUT_INFINITE {
                std::ptr::null_mut()
            } else {
                &mut tv as *mut libc::timeval
            };
            let n = unsafe {
                libc::select(
                    self.backend + 1,
                    &mut readfds,
                    std::ptr::null_mut(),
                    std::ptr::null_mut(),
                    tv_ptr,
                )
            };
            if n >= 0 {
                break;
            }
            if std::io::Error::last_os_error().raw_os_error() != Some(libc::EINTR) {
                break;
            }
        }
    }
}

#[cfg(windows)]
struct OsWait {
    port: BackendHandle,
}

#[cfg(windows)]
impl OsWait {
    fn new(backend: BackendHandle) -> std::io::Result<Self> {
        Ok(Self { port: backend })
    }

    fn wait(&self, timeout_ms: u64) {
        use windows_sys::Win32::System::IO::{
            GetQueuedCompletionStatus, PostQueuedCompletionStatus, OVERLAPPED,
        };
        let timeout = if timeout_ms == TIMEOUT_INFINITE {
            u32::MAX
        } else {
            timeout_ms.min(u32::MAX as u64) as u32
        };
        let mut bytes: u32 = 0;
        let mut key: usize = 0;
        let mut overlapped: *mut OVERLAPPED = std::ptr::null_mut();
        let ok = unsafe {
            GetQueuedCompletionStatus(self.port, &mut bytes, &mut key, &mut overlapped, timeout)
        };
        // Re-post so the reactor itself consumes the packet.
        if ok != 0 {
            unsafe { PostQueuedCompletionStatus(self.port, bytes, key, overlapped) };
        }
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::{PipeReactor, Reactor};
    use std::time::Duration;

    #[test]
    fn poller_signals_main_event_on_wakeup() {
        let reactor = PipeReactor::new().unwrap();
        let main_event = Arc::new(WakeEvent::new());
        let mut poller = Poller::spawn(
            reactor.backend(),
            reactor.advertised_timeout(),
            main_event.clone(),
        )
        .unwrap();

        let wake = reactor.wake_handle();
        wake.wake();
        assert!(main_event.wait_timeout(Duration::from_secs(2)));
        assert!(poller.signaled());

        poller.clear_signal();
        poller.shutdown(wake.as_ref());
    }

    #[test]
    fn shutdown_handshake_completes_while_blocked() {
        let reactor = PipeReactor::new().unwrap();
        let main_event = Arc::new(WakeEvent::new());
        let mut poller = Poller::spawn(
            reactor.backend(),
            reactor.advertised_timeout(),
            main_event,
        )
        .unwrap();
        // Poller is blocked on the backend with an infinite timeout.
        poller.shutdown(reactor.wake_handle().as_ref());
        assert!(!poller.signaled());
    }

    #[test]
    fn poller_repolls_after_resume() {
        let reactor = PipeReactor::new().unwrap();
        let main_event = Arc::new(WakeEvent::new());
        let mut poller = Poller::spawn(
            reactor.backend(),
            reactor.advertised_timeout(),
            main_event.clone(),
        )
        .unwrap();

        let wake = reactor.wake_handle();
        wake.wake();
        assert!(main_event.wait_timeout(Duration::from_secs(2)));
        main_event.clear();
        poller.clear_signal();
        poller.resume();

        // The pipe still holds the unread wakeup byte; level-triggered wait
        // reports it again.
        assert!(main_event.wait_timeout(Duration::from_secs(2)));
        poller.clear_signal();
        poller.shutdown(wake.as_ref());
    }
}
