//! CLI entrypoint for the p4scc checkout-state tool.
//!
//! The binary delegates to [`p4scc_cli::run`], which loads configuration,
//! parses the command, and drives the provider against the configured client.

use std::io::{self, StderrLock, StdoutLock};
use std::process::ExitCode;

fn main() -> ExitCode {
    let mut stdout: StdoutLock<'_> = io::stdout().lock();
    let mut stderr: StderrLock<'_> = io::stderr().lock();
    p4scc_cli::run(std::env::args_os(), &mut stdout, &mut stderr)
}
