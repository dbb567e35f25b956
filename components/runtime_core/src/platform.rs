//! The platform window seam.
//!
//! Window creation and OS event polling are external collaborators; the
//! runtime drives them through [`Platform`]. The headless implementation
//! backs the test suite and windowless CLI runs: tests inject events through
//! a [`HeadlessHandle`] and observe window lifetimes through shared state.

use core_types::WindowEventKind;
use handle_table::WindowResource;
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};

/// An OS window event, addressed by the platform's own window id.
#[derive(Debug, Clone)]
pub struct PlatformEvent {
    /// Platform-assigned window id
    pub window: u32,
    /// Translated event payload
    pub kind: WindowEventKind,
}

/// The platform seam: window creation plus event polling.
pub trait Platform {
    /// Creates a native window. `fps` of 0 disables frame pacing.
    fn create_window(&mut self, title: &str, width: u32, height: u32, fps: u32)
        -> Box<dyn WindowResource>;

    /// Polls pending OS events, translated to native records.
    fn poll_events(&mut self) -> Vec<PlatformEvent>;
}

#[derive(Default)]
struct HeadlessState {
    events: VecDeque<PlatformEvent>,
    alive: HashMap<u32, String>,
    frames: HashMap<u32, u64>,
}

/// Shared control half of the headless platform.
///
/// Clones freely; tests use it to inject events and to observe windows from
/// outside the runtime.
#[derive(Clone, Default)]
pub struct HeadlessHandle {
    state: Arc<Mutex<HeadlessState>>,
}

impl HeadlessHandle {
    /// Queues an event for the next poll.
    pub fn push_event(&self, window: u32, kind: WindowEventKind) {
        self.state
            .lock()
            .unwrap()
            .events
            .push_back(PlatformEvent { window, kind });
    }

    /// Whether the platform window still exists.
    pub fn window_alive(&self, window: u32) -> bool {
        self.state.lock().unwrap().alive.contains_key(&window)
    }

    /// Number of windows currently alive.
    pub fn alive_count(&self) -> usize {
        self.state.lock().unwrap().alive.len()
    }

    /// Frames presented by a window so far.
    pub fn frames(&self, window: u32) -> u64 {
        self.state
            .lock()
            .unwrap()
            .frames
            .get(&window)
            .copied()
            .unwrap_or(0)
    }
}

/// Headless platform for tests and windowless runs.
pub struct HeadlessPlatform {
    state: Arc<Mutex<HeadlessState>>,
    next_id: u32,
}

impl HeadlessPlatform {
    /// Creates the platform and its control handle.
    pub fn new() -> (Self, HeadlessHandle) {
        let handle = HeadlessHandle::default();
        (
            Self {
                state: handle.state.clone(),
                next_id: 1,
            },
            handle,
        )
    }
}

impl Platform for HeadlessPlatform {
    fn create_window(
        &mut self,
        title: &str,
        _width: u32,
        _height: u32,
        fps: u32,
    ) -> Box<dyn WindowResource> {
        let id = self.next_id;
        self.next_id += 1;
        self.state
            .lock()
            .unwrap()
            .alive
            .insert(id, title.to_string());
        Box::new(HeadlessWindow {
            id,
            fps,
            state: self.state.clone(),
        })
    }

    fn poll_events(&mut self) -> Vec<PlatformEvent> {
        self.state.lock().unwrap().events.drain(..).collect()
    }
}

struct HeadlessWindow {
    id: u32,
    fps: u32,
    state: Arc<Mutex<HeadlessState>>,
}

impl WindowResource for HeadlessWindow {
    fn platform_id(&self) -> u32 {
        self.id
    }

    fn destroy(&mut self) {
        self.state.lock().unwrap().alive.remove(&self.id);
    }

    fn frame_delay_ms(&self) -> u64 {
        if self.fps == 0 {
            0
        } else {
            1000 / self.fps as u64
        }
    }

    fn end_frame(&mut self, min_delay_ms: u64) {
        *self
            .state
            .lock()
            .unwrap()
            .frames
            .entry(self.id)
            .or_insert(0) += 1;
        if min_delay_ms > 0 {
            std::thread::sleep(std::time::Duration::from_millis(min_delay_ms.min(100)));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn events_drain_in_order() {
        let (mut platform, handle) = HeadlessPlatform::new();
        handle.push_event(1, WindowEventKind::CloseRequested);
        handle.push_event(2, WindowEventKind::MouseMoved { x: 1.0, y: 2.0 });
        let events = platform.poll_events();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].window, 1);
        assert!(platform.poll_events().is_empty());
    }

    #[test]
    fn windows_report_their_lifetime() {
        let (mut platform, handle) = HeadlessPlatform::new();
        let mut window = platform.create_window("main", 640, 480, 0);
        assert!(handle.window_alive(window.platform_id()));
        window.end_frame(0);
        assert_eq!(handle.frames(window.platform_id()), 1);
        window.destroy();
        assert!(!handle.window_alive(window.platform_id()));
    }

    #[test]
    fn fps_translates_to_frame_delay() {
        let (mut platform, _handle) = HeadlessPlatform::new();
        let window = platform.create_window("paced", 640, 480, 50);
        assert_eq!(window.frame_delay_ms(), 20);
        let unpaced = platform.create_window("free", 640, 480, 0);
        assert_eq!(unpaced.frame_delay_ms(), 0);
    }
}
