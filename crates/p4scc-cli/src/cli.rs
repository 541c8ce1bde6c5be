//! CLI argument definitions for p4scc.

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

/// Output format selection for command results.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, ValueEnum)]
pub enum OutputFormat {
    /// Selects `human` for terminal output and `json` for redirected output.
    #[default]
    Auto,
    /// Always render human-readable output.
    Human,
    /// Always emit JSON documents.
    Json,
}

/// Output format after resolving `auto` based on TTY detection.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ResolvedOutputFormat {
    /// Human-readable lines.
    Human,
    /// One JSON document per invocation.
    Json,
}

impl OutputFormat {
    /// Resolves the output format based on whether stdout is a terminal.
    #[must_use]
    pub const fn resolve(self, stdout_is_terminal: bool) -> ResolvedOutputFormat {
        match self {
            Self::Auto if stdout_is_terminal => ResolvedOutputFormat::Human,
            Self::Auto | Self::Json => ResolvedOutputFormat::Json,
            Self::Human => ResolvedOutputFormat::Human,
        }
    }
}

/// Command-line interface for the p4scc checkout-state tool.
#[derive(Parser, Debug)]
#[command(name = "p4scc", disable_help_subcommand = true)]
pub(crate) struct Cli {
    /// Controls how results are rendered.
    #[arg(long, value_enum, default_value_t = OutputFormat::Auto)]
    pub(crate) output: OutputFormat,
    /// Operation to perform.
    #[command(subcommand)]
    pub(crate) command: CliCommand,
}

/// Operations exposed by the CLI.
#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub(crate) enum CliCommand {
    /// Validates the server, user, and workspace.
    Connect,
    /// Reports whether a file is opened for edit or add.
    Status {
        /// File to query.
        path: PathBuf,
    },
    /// Opens files for edit.
    Checkout {
        /// Files to check out.
        #[arg(required = true)]
        paths: Vec<PathBuf>,
    },
    /// Discards pending changes on files.
    Revert {
        /// Files to revert.
        #[arg(required = true)]
        paths: Vec<PathBuf>,
        /// Confirm the revert; without it every file is left untouched.
        #[arg(long)]
        yes: bool,
    },
    /// Lists local files opened for edit.
    Opened,
    /// Shows the session the provider would use.
    Settings {
        /// Directory to discover settings from (defaults to the current one).
        #[arg(long)]
        dir: Option<PathBuf>,
    },
    /// Asks whether editing may start, checking the file out if needed.
    QueryEdit {
        /// File about to be edited.
        path: PathBuf,
        /// Answer yes to the checkout prompt.
        #[arg(long)]
        yes: bool,
    },
    /// Asks whether saving may proceed, checking the file out if needed.
    QuerySave {
        /// File about to be saved.
        path: PathBuf,
        /// Answer yes to the checkout prompt.
        #[arg(long)]
        yes: bool,
    },
}

impl CliCommand {
    /// Directory the session is discovered from, when the command names one.
    pub(crate) const fn settings_dir(&self) -> Option<&PathBuf> {
        match self {
            Self::Settings { dir } => dir.as_ref(),
            _ => None,
        }
    }
}
