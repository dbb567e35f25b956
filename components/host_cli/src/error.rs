//! Error types for the host CLI

use core_types::{LoadError, RuntimeError};
use std::fmt;

/// CLI-specific errors
#[derive(Debug)]
pub enum CliError {
    /// The main script failed to load (parse, compile, or evaluate).
    Load(LoadError),

    /// Runtime machinery failure (reactor, workers, I/O).
    Runtime(RuntimeError),

    /// The script terminated with an uncaught exception.
    Uncaught(String),

    /// The test run finished with failures.
    TestsFailed {
        /// Tests that passed
        passed: usize,
        /// Tests executed
        total: usize,
    },
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CliError::Load(e) => write!(f, "script load error: {}", e),
            CliError::Runtime(e) => write!(f, "runtime error: {}", e),
            CliError::Uncaught(stack) => write!(f, "uncaught exception: {}", stack),
            CliError::TestsFailed { passed, total } => {
                write!(f, "tests failed: {}/{} passed", passed, total)
            }
        }
    }
}

impl std::error::Error for CliError {}

impl From<LoadError> for CliError {
    fn from(err: LoadError) -> Self {
        CliError::Load(err)
    }
}

impl From<RuntimeError> for CliError {
    fn from(err: RuntimeError) -> Self {
        CliError::Runtime(err)
    }
}

/// Result type for CLI operations
pub type CliResult<T> = Result<T, CliError>;
