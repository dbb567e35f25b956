//! Nebula host CLI: argument parsing and the `run` / `test` drivers.
//!
//! Two modes exist. `run` loads the script as a module and enters the frame
//! loop if any window was opened, otherwise drains events until idle. `test`
//! loads the script, awaits async work, then executes isolated tests one at
//! a time; the exit code is zero iff every test passed.

#![warn(missing_docs)]
#![warn(clippy::all)]

mod error;

pub use error::{CliError, CliResult};

use clap::{Parser, Subcommand};
use runtime_core::{
    DevOptions, DevSession, HeadlessPlatform, RunOutcome, Runtime, RuntimeOptions,
};
use std::path::{Path, PathBuf};
use tracing::info;

/// Command-line interface of the `nebula` binary.
#[derive(Debug, Parser)]
#[command(name = "nebula", version, about = "Nebula desktop JavaScript runtime")]
pub struct Cli {
    /// Worker pool size for native async work.
    #[arg(long, default_value_t = 4)]
    pub workers: usize,

    /// What to do.
    #[command(subcommand)]
    pub command: Command,
}

/// CLI subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Load a script and run its application loop.
    Run {
        /// Path to the main script.
        path: PathBuf,
        /// Watch the script and hot-restart on change.
        #[arg(long)]
        dev: bool,
    },
    /// Load a script and execute its tests.
    Test {
        /// Path to the test script.
        path: PathBuf,
    },
}

fn absolute(path: &Path) -> PathBuf {
    std::fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf())
}

/// `nebula run <path>`.
pub fn run_script(path: &Path, workers: usize) -> CliResult<()> {
    let script = absolute(path);
    let (platform, _handle) = HeadlessPlatform::new();
    let mut runtime = Runtime::new(RuntimeOptions::with_stub_engine(
        Box::new(platform),
        workers,
    )?)?;

    runtime.enter();
    runtime.load_main(&script)?;

    if runtime.resources().window_count() > 0 {
        match runtime.run() {
            RunOutcome::UncaughtException => {
                let stack = runtime
                    .uncaught()
                    .map(|e| e.render())
                    .unwrap_or_else(|| "unknown error".to_string());
                runtime.shutdown()?;
                return Err(CliError::Uncaught(stack));
            }
            RunOutcome::WindowsClosed | RunOutcome::RestartRequested => {}
        }
    } else {
        runtime.drain_until_idle();
    }

    let uncaught = runtime.uncaught().map(|e| e.render());
    runtime.shutdown()?;
    match uncaught {
        Some(stack) => Err(CliError::Uncaught(stack)),
        None => Ok(()),
    }
}

/// `nebula run --dev <path>`.
pub fn run_dev(path: &Path, workers: usize) -> CliResult<()> {
    let script = absolute(path);
    let (platform, _handle) = HeadlessPlatform::new();
    let options = DevOptions::with_stub_engine(script, Box::new(platform)).with_workers(workers);
    let mut session = DevSession::new(options)?;
    session.run()?;
    Ok(())
}

/// `nebula test <path>`: exit code 0 iff `tests_passed == tests_total`.
pub fn test_script(path: &Path, workers: usize) -> CliResult<()> {
    let script = absolute(path);
    let (platform, _handle) = HeadlessPlatform::new();
    let mut runtime = Runtime::new(RuntimeOptions::with_stub_engine(
        Box::new(platform),
        workers,
    )?)?;

    runtime.enter();
    runtime.load_main(&script)?;

    // Synchronous assertions ran during evaluation; await async work next.
    runtime.drain_until_idle();

    let report = runtime.run_isolated_tests();
    info!(passed = report.passed, total = report.total, "test run finished");
    println!("Tests: {}/{} passed", report.passed, report.total);

    let uncaught = runtime.uncaught().map(|e| e.render());
    runtime.shutdown()?;

    if let Some(stack) = uncaught {
        return Err(CliError::Uncaught(stack));
    }
    if !report.all_passed() {
        return Err(CliError::TestsFailed {
            passed: report.passed,
            total: report.total,
        });
    }
    Ok(())
}
