//! Native window event records.
//!
//! Platform window events are translated into these records before being
//! dispatched through per-window script callbacks.

use crate::ResourceId;
use serde::{Deserialize, Serialize};

/// A mouse button, bridged as a string-sum enum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MouseButton {
    /// Primary button
    Left,
    /// Secondary button
    Right,
    /// Wheel button
    Middle,
}

/// The recognized window event shapes.
#[derive(Debug, Clone, PartialEq)]
pub enum WindowEventKind {
    /// The user asked the window to close
    CloseRequested,
    /// The window was resized
    Resized {
        /// New client width in pixels
        width: u32,
        /// New client height in pixels
        height: u32,
    },
    /// A key changed state
    Key {
        /// Platform scancode
        code: u32,
        /// true on press, false on release
        pressed: bool,
    },
    /// A mouse button was pressed
    MouseDown {
        /// Which button
        button: MouseButton,
        /// Cursor x in window coordinates
        x: f32,
        /// Cursor y in window coordinates
        y: f32,
    },
    /// A mouse button was released
    MouseUp {
        /// Which button
        button: MouseButton,
        /// Cursor x in window coordinates
        x: f32,
        /// Cursor y in window coordinates
        y: f32,
    },
    /// The cursor moved
    MouseMoved {
        /// Cursor x in window coordinates
        x: f32,
        /// Cursor y in window coordinates
        y: f32,
    },
}

/// A window event routed to a specific window resource.
#[derive(Debug, Clone, PartialEq)]
pub struct WindowEvent {
    /// The target window's resource id
    pub window: ResourceId,
    /// What happened
    pub kind: WindowEventKind,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn close_event_targets_window() {
        let ev = WindowEvent {
            window: 1,
            kind: WindowEventKind::CloseRequested,
        };
        assert_eq!(ev.window, 1);
        assert_eq!(ev.kind, WindowEventKind::CloseRequested);
    }
}
