//! Structured records crossing the engine boundary.
//!
//! These are the specialized record shapes the value bridge converts with
//! pre-registered object templates, so script-side `instanceof` checks work.

use serde::{Deserialize, Serialize};

/// Response produced by the embedded HTTP client/server surface.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HttpResponse {
    /// Status code
    pub status: u16,
    /// Header name/value pairs in wire order
    pub headers: Vec<(String, String)>,
    /// Raw body bytes
    pub body: Vec<u8>,
}

/// Descriptor for a decoded image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageInfo {
    /// Width in pixels
    pub width: u32,
    /// Height in pixels
    pub height: u32,
    /// Channels per pixel (3 = RGB, 4 = RGBA)
    pub channels: u8,
}

/// An RGBA color.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Color {
    /// Red component
    pub r: u8,
    /// Green component
    pub g: u8,
    /// Blue component
    pub b: u8,
    /// Alpha component
    pub a: u8,
}

impl Default for Color {
    fn default() -> Self {
        Self {
            r: 0,
            g: 0,
            b: 0,
            a: 255,
        }
    }
}

/// Filesystem metadata for a single path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PathInfo {
    /// The queried path
    pub path: String,
    /// Whether the path exists
    pub exists: bool,
    /// Whether the path is a directory
    pub is_dir: bool,
}

/// A single directory entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileEntry {
    /// Entry name without the parent path
    pub name: String,
    /// Whether the entry is a directory
    pub is_dir: bool,
    /// Size in bytes (0 for directories)
    pub size: u64,
}

/// Window presentation mode, bridged as a string-sum enum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WindowMode {
    /// Ordinary decorated window
    Windowed,
    /// Exclusive fullscreen
    Fullscreen,
    /// Borderless window covering the screen
    Borderless,
}

impl Default for WindowMode {
    fn default() -> Self {
        WindowMode::Windowed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_color_is_opaque_black() {
        let c = Color::default();
        assert_eq!((c.r, c.g, c.b, c.a), (0, 0, 0, 255));
    }

    #[test]
    fn records_round_trip_through_serde() {
        let resp = HttpResponse {
            status: 204,
            headers: vec![("server".into(), "nebula".into())],
            body: vec![],
        };
        let json = serde_json::to_string(&resp).unwrap();
        let back: HttpResponse = serde_json::from_str(&json).unwrap();
        assert_eq!(back, resp);
    }
}
