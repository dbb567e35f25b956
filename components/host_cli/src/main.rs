//! Nebula runtime host
//!
//! Entry point for the desktop runtime. Parses CLI arguments and delegates
//! to the run/test drivers.

use clap::Parser;
use host_cli::{run_dev, run_script, test_script, Cli, Command};

fn main() {
    // Writes to closed sockets should surface as errors, not kill us.
    #[cfg(unix)]
    unsafe {
        libc::signal(libc::SIGPIPE, libc::SIG_IGN);
    }

    tracing_subscriber::fmt::init();

    let cli = Cli::parse();
    let result = match &cli.command {
        Command::Run { path, dev: false } => run_script(path, cli.workers),
        Command::Run { path, dev: true } => run_dev(path, cli.workers),
        Command::Test { path } => test_script(path, cli.workers),
    };

    if let Err(err) = result {
        eprintln!("Error: {}", err);
        std::process::exit(1);
    }
}
