//! Typed outcomes returned by engine operations.

use std::collections::BTreeSet;
use std::path::PathBuf;

use serde::Serialize;

use crate::classify::{Diagnosis, ErrorKind};

/// Outcome of a checkout attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckOutResult {
    /// The file was opened for edit.
    CheckedOut,
    /// The file was already opened for edit or add.
    AlreadyCheckedOut,
    /// The file is outside the workspace or unknown to the server.
    NotInSourceControl,
    /// The checkout failed.
    Error,
}

impl CheckOutResult {
    /// Whether the host may proceed as if the file were editable.
    #[must_use]
    pub const fn is_success(self) -> bool {
        !matches!(self, Self::Error)
    }
}

/// Outcome of a revert attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RevertResult {
    /// The pending change was discarded.
    Reverted,
    /// The file had no pending action.
    NotCheckedOut,
    /// The file is outside the workspace or unknown to the server.
    NotInSourceControl,
    /// The revert failed.
    Error,
}

impl RevertResult {
    /// Whether the file ends up without a pending action.
    #[must_use]
    pub const fn is_success(self) -> bool {
        !matches!(self, Self::Error)
    }
}

/// Terminal status of a multi-step operation plus its diagnostics.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OperationReport<S> {
    status: S,
    diagnosis: Option<Diagnosis>,
    transcript: String,
}

impl<S: Copy> OperationReport<S> {
    pub(crate) const fn new(status: S, diagnosis: Option<Diagnosis>, transcript: String) -> Self {
        Self {
            status,
            diagnosis,
            transcript,
        }
    }

    /// Terminal status.
    #[must_use]
    pub const fn status(&self) -> S {
        self.status
    }

    /// Classified failure of the step that decided the status, if any.
    #[must_use]
    pub const fn diagnosis(&self) -> Option<&Diagnosis> {
        self.diagnosis.as_ref()
    }

    /// Failure category, if any step failed.
    #[must_use]
    pub fn error_kind(&self) -> Option<ErrorKind> {
        self.diagnosis.as_ref().map(Diagnosis::kind)
    }

    /// Client text explaining the status; empty on clean success.
    #[must_use]
    pub fn diagnostic(&self) -> &str {
        self.diagnosis.as_ref().map_or("", Diagnosis::message)
    }

    /// Transcripts of every step, in execution order.
    #[must_use]
    pub fn transcript(&self) -> &str {
        &self.transcript
    }
}

/// Result of validating the server, user, and workspace.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConnectionValidation {
    ok: bool,
    no_all_write: bool,
    diagnostic: String,
    transcript: String,
}

impl ConnectionValidation {
    /// A connection that passed every check.
    #[must_use]
    pub fn valid(no_all_write: bool, transcript: impl Into<String>) -> Self {
        Self {
            ok: true,
            no_all_write,
            diagnostic: String::new(),
            transcript: transcript.into(),
        }
    }

    /// A connection that failed a check.
    #[must_use]
    pub fn invalid(diagnostic: impl Into<String>, transcript: impl Into<String>) -> Self {
        Self {
            ok: false,
            no_all_write: false,
            diagnostic: diagnostic.into(),
            transcript: transcript.into(),
        }
    }

    /// Whether every check passed.
    #[must_use]
    pub const fn is_ok(&self) -> bool {
        self.ok
    }

    /// Whether the workspace options contain `noallwrite`.
    #[must_use]
    pub const fn no_all_write(&self) -> bool {
        self.no_all_write
    }

    /// Reason for failure; empty when valid.
    #[must_use]
    pub fn diagnostic(&self) -> &str {
        &self.diagnostic
    }

    /// Transcripts of the validation checks.
    #[must_use]
    pub fn transcript(&self) -> &str {
        &self.transcript
    }
}

/// How a bulk listing of opened files ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "outcome")]
pub enum ListingOutcome {
    /// The listing ran to completion.
    Complete,
    /// The workspace has more opened files than the reconciliation cap.
    TooManyFiles {
        /// Item count reported by the listing.
        reported: usize,
    },
    /// The listing command itself failed.
    Failed,
}

/// Local paths of files opened for edit, as found at load time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CheckedOutListing {
    outcome: ListingOutcome,
    files: BTreeSet<PathBuf>,
    diagnostic: String,
    transcript: String,
}

impl CheckedOutListing {
    pub(crate) const fn new(
        outcome: ListingOutcome,
        files: BTreeSet<PathBuf>,
        diagnostic: String,
        transcript: String,
    ) -> Self {
        Self {
            outcome,
            files,
            diagnostic,
            transcript,
        }
    }

    /// How the listing ended.
    #[must_use]
    pub const fn outcome(&self) -> ListingOutcome {
        self.outcome
    }

    /// Whether the listing completed.
    #[must_use]
    pub const fn is_complete(&self) -> bool {
        matches!(self.outcome, ListingOutcome::Complete)
    }

    /// Resolved local paths; empty unless complete.
    #[must_use]
    pub const fn files(&self) -> &BTreeSet<PathBuf> {
        &self.files
    }

    /// Consumes the listing, returning the resolved paths.
    #[must_use]
    pub fn into_files(self) -> BTreeSet<PathBuf> {
        self.files
    }

    /// Reason for failure; empty when complete.
    #[must_use]
    pub fn diagnostic(&self) -> &str {
        &self.diagnostic
    }

    /// Transcripts of the listing and every resolution lookup.
    #[must_use]
    pub fn transcript(&self) -> &str {
        &self.transcript
    }
}
