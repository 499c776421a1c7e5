//! Entry point for the `relay` client binary.

use std::io;
use std::process::ExitCode;

fn main() -> ExitCode {
    // Unlocked: telemetry writes to stderr from runtime threads.
    let mut stderr = io::stderr();
    relay_client::run(std::env::args_os(), &mut stderr)
}
