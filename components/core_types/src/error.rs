//! Error taxonomy for the runtime orchestration layer.
//!
//! Two families live here: `RuntimeError`, returned by native operations and
//! bridged to script with a stable numeric `code`, and `JsException`, a
//! script-side exception captured with its stack trace.

use thiserror::Error;

/// Errors produced by native operations called from script.
///
/// Every variant carries a stable numeric code (see [`RuntimeError::code`])
/// so a rejected promise can expose both a human-readable message and a
/// machine-checkable `code` property.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RuntimeError {
    /// A weak handle's slot was explicitly deinited before this access.
    #[error("handle has expired")]
    HandleExpired,
    /// A script value could not be converted to the requested native shape.
    #[error("cannot convert value: {0}")]
    CantConvert(String),
    /// A value fell outside its permitted range.
    #[error("value out of bounds")]
    OutOfBounds,
    /// An index fell outside a container's bounds.
    #[error("index out of bounds")]
    IndexOutOfBounds,
    /// An underlying I/O operation failed.
    #[error("i/o error: {0}")]
    Io(String),
    /// Internal invariant violation in a native path.
    #[error("internal error: {0}")]
    Internal(String),
}

impl RuntimeError {
    /// Stable numeric code surfaced to script as the `code` property.
    pub fn code(&self) -> i32 {
        match self {
            RuntimeError::HandleExpired => 1,
            RuntimeError::CantConvert(_) => 2,
            RuntimeError::OutOfBounds => 3,
            RuntimeError::IndexOutOfBounds => 4,
            RuntimeError::Io(_) => 5,
            RuntimeError::Internal(_) => 6,
        }
    }
}

impl From<std::io::Error> for RuntimeError {
    fn from(err: std::io::Error) -> Self {
        RuntimeError::Io(err.to_string())
    }
}

/// The kind of script exception.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExceptionKind {
    /// Syntax error in script source
    SyntaxError,
    /// Type error (e.g. calling a non-function)
    TypeError,
    /// Reference to an undefined binding
    ReferenceError,
    /// Value out of allowed range
    RangeError,
    /// Internal engine error
    InternalError,
}

/// A single frame in a captured script call stack.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StackFrame {
    /// Function name, or `None` for anonymous frames
    pub function_name: Option<String>,
    /// Script origin (file path or URL), when known
    pub source: Option<String>,
    /// 1-based line number
    pub line: u32,
    /// 1-based column number
    pub column: u32,
}

/// A script exception with message and captured stack trace.
///
/// # Examples
///
/// ```
/// use core_types::{ExceptionKind, JsException};
///
/// let exc = JsException::new(ExceptionKind::TypeError, "x is not a function");
/// assert_eq!(exc.message, "x is not a function");
/// assert!(exc.stack.is_empty());
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct JsException {
    /// The exception kind
    pub kind: ExceptionKind,
    /// Human-readable message
    pub message: String,
    /// Captured call stack, outermost frame last
    pub stack: Vec<StackFrame>,
}

impl JsException {
    /// Creates an exception with an empty stack.
    pub fn new(kind: ExceptionKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            stack: Vec::new(),
        }
    }

    /// Renders the exception the way the host reports it: message first,
    /// then one indented line per stack frame.
    pub fn render(&self) -> String {
        let mut out = self.message.clone();
        for frame in &self.stack {
            let name = frame.function_name.as_deref().unwrap_or("<anonymous>");
            let source = frame.source.as_deref().unwrap_or("<unknown>");
            out.push_str(&format!(
                "\n    at {} ({}:{}:{})",
                name, source, frame.line, frame.column
            ));
        }
        out
    }
}

impl std::fmt::Display for JsException {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}: {}", self.kind, self.message)
    }
}

/// Fatal failures while loading the main script.
#[derive(Debug, Clone, PartialEq)]
pub enum LoadError {
    /// The source failed to parse.
    Parse(JsException),
    /// The module failed to compile.
    Compile(JsException),
    /// Instantiation or evaluation failed; carries the captured stack trace.
    MainScript(String),
}

impl std::fmt::Display for LoadError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LoadError::Parse(e) => write!(f, "parse error: {}", e.message),
            LoadError::Compile(e) => write!(f, "compile error: {}", e.message),
            LoadError::MainScript(stack) => write!(f, "script error: {}", stack),
        }
    }
}

impl std::error::Error for LoadError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn runtime_error_codes_are_stable() {
        assert_eq!(RuntimeError::HandleExpired.code(), 1);
        assert_eq!(RuntimeError::CantConvert("x".into()).code(), 2);
        assert_eq!(RuntimeError::OutOfBounds.code(), 3);
        assert_eq!(RuntimeError::IndexOutOfBounds.code(), 4);
    }

    #[test]
    fn exception_render_includes_frames() {
        let mut exc = JsException::new(ExceptionKind::TypeError, "boom");
        exc.stack.push(StackFrame {
            function_name: Some("main".into()),
            source: Some("/app/main.js".into()),
            line: 3,
            column: 7,
        });
        let rendered = exc.render();
        assert!(rendered.starts_with("boom"));
        assert!(rendered.contains("at main (/app/main.js:3:7)"));
    }

    #[test]
    fn io_errors_convert() {
        let err: RuntimeError =
            std::io::Error::new(std::io::ErrorKind::NotFound, "missing").into();
        assert!(matches!(err, RuntimeError::Io(_)));
    }
}
