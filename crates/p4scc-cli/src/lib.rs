//! Command-line runtime for the p4scc checkout-state tool.
//!
//! The module owns argument parsing, configuration bootstrapping, telemetry,
//! and result rendering. Each invocation builds an
//! [`SccProvider`](p4scc_engine::SccProvider) over the configured client,
//! applies the configured session, runs one operation, and prints the result.
//! The runtime can be exercised from the binary entrypoint and from tests
//! where configuration loading and IO streams are substituted.

use std::env;
use std::ffi::OsString;
use std::io::{self, IsTerminal, Write};
use std::process::ExitCode;

use clap::Parser;
use p4scc_config::Config;
use p4scc_engine::{ProcessRunner, SccProvider};

mod cli;
mod commands;
mod config;
mod errors;
mod output;
mod telemetry;

pub use cli::{OutputFormat, ResolvedOutputFormat};

use cli::Cli;
use config::{ConfigArgumentSplit, ConfigLoader, OrthoConfigLoader, split_config_arguments};
use errors::AppError;

/// Bundles the IO streams provided to the CLI runtime.
pub(crate) struct IoStreams<'a, W: Write, E: Write> {
    pub(crate) stdout: &'a mut W,
    pub(crate) stderr: &'a mut E,
    stdout_is_terminal: bool,
}

impl<'a, W: Write, E: Write> IoStreams<'a, W, E> {
    pub(crate) fn new(stdout: &'a mut W, stderr: &'a mut E) -> Self {
        Self {
            stdout,
            stderr,
            stdout_is_terminal: io::stdout().is_terminal(),
        }
    }

    #[cfg(test)]
    pub(crate) const fn with_terminal_status(
        stdout: &'a mut W,
        stderr: &'a mut E,
        stdout_is_terminal: bool,
    ) -> Self {
        Self {
            stdout,
            stderr,
            stdout_is_terminal,
        }
    }

    pub(crate) const fn stdout_is_terminal(&self) -> bool {
        self.stdout_is_terminal
    }
}

struct CliRunner<'a, 'io, W: Write, E: Write, L: ConfigLoader> {
    io: &'a mut IoStreams<'io, W, E>,
    loader: &'a L,
}

impl<'a, 'io, W, E, L> CliRunner<'a, 'io, W, E, L>
where
    W: Write,
    E: Write,
    L: ConfigLoader,
{
    const fn new(io: &'a mut IoStreams<'io, W, E>, loader: &'a L) -> Self {
        Self { io, loader }
    }

    fn run<I>(&mut self, args: I) -> ExitCode
    where
        I: IntoIterator<Item = OsString>,
    {
        let arguments: Vec<OsString> = args.into_iter().collect();
        let split = split_config_arguments(&arguments);
        let cli_arguments = prepare_cli_arguments(&arguments, &split);

        let result = Cli::try_parse_from(cli_arguments)
            .map_err(AppError::CliUsage)
            .and_then(|cli| {
                self.loader
                    .load(&split.config_arguments)
                    .map(|config| (cli, config))
            })
            .and_then(|(cli, config)| self.execute(&cli, &config));

        match result {
            Ok(exit_code) => exit_code,
            Err(AppError::CliUsage(error)) if !error.use_stderr() => {
                // `--help` and `--version` are successful requests for output.
                match write!(self.io.stdout, "{error}") {
                    Ok(()) => ExitCode::SUCCESS,
                    Err(_) => ExitCode::FAILURE,
                }
            }
            Err(error) => {
                drop(writeln!(self.io.stderr, "{error}"));
                ExitCode::FAILURE
            }
        }
    }

    fn execute(&mut self, cli: &Cli, config: &Config) -> Result<ExitCode, AppError> {
        telemetry::initialise(config)?;
        let dir = cli
            .command
            .settings_dir()
            .map_or_else(env::current_dir, |dir| Ok(dir.clone()))
            .map_err(AppError::WorkingDirectory)?;

        let provider = SccProvider::new(
            ProcessRunner::new(config.client_binary().as_std_path()),
            telemetry::LoggedSink::new(),
            config::policy_from(config),
        );
        let result = commands::execute(&cli.command, &provider, config, &dir);
        let format = cli.output.resolve(self.io.stdout_is_terminal());
        output::write_output(&result, format, self.io.stdout)?;

        Ok(if result.success() {
            ExitCode::SUCCESS
        } else {
            ExitCode::FAILURE
        })
    }
}

/// Runs the CLI using the provided arguments and IO handles.
///
/// Returns [`ExitCode::SUCCESS`] when the requested operation succeeded and
/// [`ExitCode::FAILURE`] for usage errors, configuration errors, and failed
/// operations.
#[must_use]
pub fn run<I, W, E>(args: I, stdout: &mut W, stderr: &mut E) -> ExitCode
where
    I: IntoIterator<Item = OsString>,
    W: Write,
    E: Write,
{
    let mut io = IoStreams::new(stdout, stderr);
    run_with_loader(args, &mut io, &OrthoConfigLoader)
}

pub(crate) fn run_with_loader<I, W, E, L>(
    args: I,
    io: &mut IoStreams<'_, W, E>,
    loader: &L,
) -> ExitCode
where
    I: IntoIterator<Item = OsString>,
    W: Write,
    E: Write,
    L: ConfigLoader,
{
    CliRunner::new(io, loader).run(args)
}

/// Program name followed by everything after the configuration flags.
fn prepare_cli_arguments(args: &[OsString], split: &ConfigArgumentSplit) -> Vec<OsString> {
    args.first()
        .into_iter()
        .chain(args.iter().skip(split.command_start.max(1)))
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests;
