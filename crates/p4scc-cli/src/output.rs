//! Result documents and their human and JSON renderings.
//!
//! Every command produces one [`CommandOutput`]: a typed report plus the
//! timestamped messages the provider wrote to its sink while it ran. JSON
//! output serialises the whole document on a single line; human output lists
//! the messages first and then one line per result.

use std::io::Write;
use std::path::PathBuf;

use p4scc_config::ProviderMode;
use p4scc_engine::{EditVerdict, SaveVerdict, SessionContext};
use serde::Serialize;

use crate::AppError;
use crate::cli::ResolvedOutputFormat;

/// Outcome of one file in a multi-file command.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub(crate) struct FileOutcome {
    pub(crate) path: PathBuf,
    pub(crate) success: bool,
}

/// Typed result of a command.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "command", rename_all = "snake_case")]
pub(crate) enum CommandReport {
    Connect {
        ok: bool,
        no_all_write: bool,
        diagnostic: String,
    },
    Status {
        path: PathBuf,
        checked_out: bool,
    },
    Checkout {
        files: Vec<FileOutcome>,
    },
    Revert {
        confirmed: bool,
        files: Vec<FileOutcome>,
    },
    Opened {
        files: Vec<PathBuf>,
    },
    Settings {
        mode: ProviderMode,
        session: SessionContext,
        config_file: Option<PathBuf>,
    },
    QueryEdit {
        path: PathBuf,
        verdict: EditVerdict,
    },
    QuerySave {
        path: PathBuf,
        verdict: SaveVerdict,
    },
}

impl CommandReport {
    /// Whether the command should exit successfully.
    pub(crate) fn succeeded(&self) -> bool {
        match self {
            Self::Connect { ok, .. } => *ok,
            Self::Checkout { files } | Self::Revert { files, .. } => {
                files.iter().all(|outcome| outcome.success)
            }
            Self::QueryEdit { verdict, .. } => *verdict == EditVerdict::Allowed,
            Self::QuerySave { verdict, .. } => *verdict == SaveVerdict::Allowed,
            Self::Status { .. } | Self::Opened { .. } | Self::Settings { .. } => true,
        }
    }

    fn human_lines(&self) -> Vec<String> {
        match self {
            Self::Connect {
                ok: true,
                no_all_write,
                ..
            } => vec![if *no_all_write {
                String::from("connected (workspace uses noallwrite)")
            } else {
                String::from("connected")
            }],
            Self::Connect { diagnostic, .. } => vec![format!("not connected: {diagnostic}")],
            Self::Status { path, checked_out } => vec![format!(
                "{}: {}",
                path.display(),
                if *checked_out {
                    "checked out"
                } else {
                    "not checked out"
                }
            )],
            Self::Checkout { files } => outcome_lines(files, "checked out", "checkout failed"),
            Self::Revert {
                confirmed: true,
                files,
            } => outcome_lines(files, "reverted", "revert failed"),
            Self::Revert { files, .. } => {
                outcome_lines(files, "left untouched (pass --yes to revert)", "revert failed")
            }
            Self::Opened { files } if files.is_empty() => vec![String::from("no files opened")],
            Self::Opened { files } => files
                .iter()
                .map(|file| file.display().to_string())
                .collect(),
            Self::Settings {
                mode,
                session,
                config_file,
            } => vec![
                format!("mode: {mode}"),
                format!("server: {}", session.server()),
                format!("user: {}", session.user()),
                format!("workspace: {}", session.workspace()),
                format!(
                    "config file: {}",
                    config_file
                        .as_ref()
                        .map_or_else(|| String::from("none"), |file| file.display().to_string())
                ),
            ],
            Self::QueryEdit { path, verdict } => {
                vec![format!("{}: {}", path.display(), edit_verdict_text(*verdict))]
            }
            Self::QuerySave { path, verdict } => {
                vec![format!("{}: {}", path.display(), save_verdict_text(*verdict))]
            }
        }
    }
}

fn outcome_lines(files: &[FileOutcome], success: &str, failure: &str) -> Vec<String> {
    files
        .iter()
        .map(|outcome| {
            format!(
                "{}: {}",
                outcome.path.display(),
                if outcome.success { success } else { failure }
            )
        })
        .collect()
}

const fn edit_verdict_text(verdict: EditVerdict) -> &'static str {
    match verdict {
        EditVerdict::Allowed => "edit allowed",
        EditVerdict::InMemoryOnly => "checkout failed; edit in memory only",
        EditVerdict::Cancelled => "edit cancelled",
    }
}

const fn save_verdict_text(verdict: SaveVerdict) -> &'static str {
    match verdict {
        SaveVerdict::Allowed => "save allowed",
        SaveVerdict::ForceSaveAs => "checkout failed; save under another name",
        SaveVerdict::Cancelled => "save cancelled",
    }
}

/// Complete result document for one invocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub(crate) struct CommandOutput {
    success: bool,
    #[serde(flatten)]
    report: CommandReport,
    messages: Vec<String>,
}

impl CommandOutput {
    pub(crate) fn new(report: CommandReport, messages: Vec<String>) -> Self {
        Self {
            success: report.succeeded(),
            report,
            messages,
        }
    }

    pub(crate) const fn success(&self) -> bool {
        self.success
    }

    #[cfg(test)]
    pub(crate) const fn report(&self) -> &CommandReport {
        &self.report
    }

    #[cfg(test)]
    pub(crate) fn messages(&self) -> &[String] {
        &self.messages
    }
}

/// Writes `output` to `writer` in the resolved format.
pub(crate) fn write_output<W: Write>(
    output: &CommandOutput,
    format: ResolvedOutputFormat,
    writer: &mut W,
) -> Result<(), AppError> {
    match format {
        ResolvedOutputFormat::Json => {
            let document = serde_json::to_string(output).map_err(AppError::SerialiseResult)?;
            writeln!(writer, "{document}").map_err(AppError::WriteResult)
        }
        ResolvedOutputFormat::Human => {
            for line in output.messages.iter().chain(&output.report.human_lines()) {
                writeln!(writer, "{line}").map_err(AppError::WriteResult)?;
            }
            Ok(())
        }
    }
}
