//! Classification of client failures into a closed set of kinds.
//!
//! The client reports domain errors as free text on stderr. Every phrase the
//! engine depends on lives in [`KNOWN_PHRASES`]; when the client changes its
//! wording, this table is the only place to update. Text that matches no
//! phrase is classified as [`ErrorKind::Unrecognised`] and logged at `warn`
//! so that drift in client versions shows up in the logs.

use serde::Serialize;
use tracing::warn;

use crate::invocation::CommandInvocation;

/// Tracing target for classification diagnostics.
const CLASSIFY_TARGET: &str = "p4scc_engine::classify";

/// Failure category of a client invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// The path lies outside the workspace root.
    OutsideWorkspaceRoot,
    /// The path is not mapped by the workspace view.
    NotInView,
    /// The server has no record of the file.
    NoSuchFile,
    /// A requested `fstat` field is absent, e.g. no pending action.
    FieldMissing,
    /// The file is not opened in the workspace.
    NotOpened,
    /// The server does not know the configured user.
    UnknownUser,
    /// The server could not be reached.
    ServerUnreachable,
    /// The user has no valid ticket or password.
    LoginRequired,
    /// The invocation was killed by the hard timeout.
    TimedOut,
    /// The client executable could not be run.
    ClientUnavailable,
    /// Stderr text that matches no known phrase.
    Unrecognised,
}

impl ErrorKind {
    /// Whether the kind means "this file is not under source control here".
    ///
    /// Callers treat these as success: there is nothing to check out or
    /// revert.
    #[must_use]
    pub const fn is_not_in_source_control(self) -> bool {
        matches!(
            self,
            Self::OutsideWorkspaceRoot | Self::NotInView | Self::NoSuchFile
        )
    }
}

/// Stderr phrases and the kind each one denotes, checked in order.
///
/// Matching is case-insensitive on a substring of the stderr text.
pub const KNOWN_PHRASES: &[(&str, ErrorKind)] = &[
    ("is not under client's root", ErrorKind::OutsideWorkspaceRoot),
    ("not in client view", ErrorKind::NotInView),
    ("no such file", ErrorKind::NoSuchFile),
    ("field does not exist", ErrorKind::FieldMissing),
    ("no such field", ErrorKind::FieldMissing),
    ("file(s) not opened", ErrorKind::NotOpened),
    ("no such user", ErrorKind::UnknownUser),
    ("connect to server failed", ErrorKind::ServerUnreachable),
    ("invalid or unset", ErrorKind::LoginRequired),
    ("session has expired", ErrorKind::LoginRequired),
];

/// A classified failure together with the text it was derived from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Diagnosis {
    kind: ErrorKind,
    message: String,
}

impl Diagnosis {
    /// Failure category.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// Client text (or process error) the kind was derived from.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }
}

/// Maps raw stderr text to a kind using [`KNOWN_PHRASES`].
///
/// Returns [`ErrorKind::Unrecognised`] when no phrase matches; the caller
/// decides whether that warrants a log entry.
#[must_use]
pub fn classify_text(stderr: &str) -> ErrorKind {
    let lowered = stderr.to_lowercase();
    KNOWN_PHRASES
        .iter()
        .find(|(phrase, _)| lowered.contains(phrase))
        .map_or(ErrorKind::Unrecognised, |&(_, kind)| kind)
}

/// Classifies a finished invocation, or returns `None` when it succeeded.
///
/// A timeout takes precedence over the (substituted) stderr text, and a
/// process error over empty streams.
#[must_use]
pub fn diagnose(invocation: &CommandInvocation) -> Option<Diagnosis> {
    if invocation.timed_out() {
        return Some(Diagnosis {
            kind: ErrorKind::TimedOut,
            message: invocation.stderr().to_owned(),
        });
    }

    if let Some(error) = invocation.process_error() {
        return Some(Diagnosis {
            kind: ErrorKind::ClientUnavailable,
            message: error.to_string(),
        });
    }

    let stderr = invocation.stderr().trim();
    if stderr.is_empty() {
        return None;
    }

    let kind = classify_text(stderr);
    if kind == ErrorKind::Unrecognised {
        warn!(
            target: CLASSIFY_TARGET,
            command = invocation.command_line(),
            stderr,
            "unrecognised client error text"
        );
    }
    Some(Diagnosis {
        kind,
        message: stderr.to_owned(),
    })
}
