//! Domain operations composed from client invocations.
//!
//! [`VcsEngine`] drives the small state machines behind checkout, revert,
//! connection validation, and bulk reconciliation. Each operation takes one
//! [`SessionContext`] snapshot when it starts and uses it for every step,
//! steps run strictly in sequence, and the first terminal classification
//! ends the operation. Nothing is retried and nothing panics: every outcome
//! is a typed report carrying the concatenated transcript of the steps that
//! ran.

mod report;

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tracing::debug;

pub use report::{
    CheckOutResult, CheckedOutListing, ConnectionValidation, ListingOutcome, OperationReport,
    RevertResult,
};

use crate::cache::{CheckoutStatusCache, StatusLookup};
use crate::classify::{Diagnosis, ErrorKind, diagnose};
use crate::executor::CommandExecutor;
use crate::field::extract_field;
use crate::invocation::{CommandInvocation, CommandRequest};
use crate::session::{SessionContext, SessionStore};

/// Tracing target for engine operations.
const ENGINE_TARGET: &str = "p4scc_engine::engine";

/// Most opened files reconciled at load time.
pub const MAX_OPENED_FILES: usize = 100;

/// `fstat` tag holding a file's pending action.
const ACTION_FIELD: &str = "... action";
/// `fstat` tag holding a file's local path.
const CLIENT_FILE_FIELD: &str = "... clientFile";
/// Workspace option that leaves unopened files read-only.
const NO_ALL_WRITE_OPTION: &str = "noallwrite";

/// Executes checkout-state operations against the VCS client.
///
/// # Example
///
/// ```rust,no_run
/// use std::path::Path;
/// use std::sync::Arc;
///
/// use p4scc_engine::{ProcessRunner, SessionContext, SessionStore, VcsEngine};
///
/// let sessions = Arc::new(SessionStore::new(SessionContext::new(
///     "ssl:perforce:1666",
///     "alice",
///     "alice-main",
/// )));
/// let engine = VcsEngine::new(ProcessRunner::new("p4"), sessions);
/// let report = engine.check_out_file(Path::new("/work/alice-main/src/lib.rs"));
/// println!("{:?}: {}", report.status(), report.diagnostic());
/// ```
#[derive(Debug)]
pub struct VcsEngine<E> {
    executor: E,
    sessions: Arc<SessionStore>,
    cache: CheckoutStatusCache,
    no_all_write: AtomicBool,
    writable_fast_path: AtomicBool,
}

impl<E> VcsEngine<E> {
    /// Creates an engine that reads its session from `sessions`.
    #[must_use]
    pub fn new(executor: E, sessions: Arc<SessionStore>) -> Self {
        Self {
            executor,
            sessions,
            cache: CheckoutStatusCache::new(),
            no_all_write: AtomicBool::new(false),
            writable_fast_path: AtomicBool::new(false),
        }
    }

    /// Session store shared with the host.
    #[must_use]
    pub const fn sessions(&self) -> &Arc<SessionStore> {
        &self.sessions
    }

    /// Underlying executor.
    #[must_use]
    pub const fn executor(&self) -> &E {
        &self.executor
    }

    /// Whether the last successful [`Self::server_connect`] found a
    /// `noallwrite` workspace.
    #[must_use]
    pub fn no_all_write(&self) -> bool {
        self.no_all_write.load(Ordering::Acquire)
    }

    /// Enables treating locally writable files as checked out.
    ///
    /// Only takes effect once [`Self::server_connect`] has confirmed a
    /// `noallwrite` workspace.
    pub fn set_writable_fast_path(&self, enabled: bool) {
        self.writable_fast_path.store(enabled, Ordering::Release);
    }

    fn fast_path_active(&self) -> bool {
        self.writable_fast_path.load(Ordering::Acquire) && self.no_all_write()
    }
}

impl<E: CommandExecutor> VcsEngine<E> {
    /// Opens `path` for edit.
    ///
    /// Asks whether the file is known to the server, then whether it is
    /// already open, and only then issues `edit`.
    pub fn check_out_file(&self, path: &Path) -> OperationReport<CheckOutResult> {
        let session = self.sessions.snapshot();
        let mut steps = Steps::new(&self.executor, &session);
        let file = path_argument(path);

        let known = steps.run(&fstat("clientFile", &file));
        if let Some(diagnosis) = diagnose(&known) {
            let status = if diagnosis.kind().is_not_in_source_control() {
                CheckOutResult::NotInSourceControl
            } else {
                CheckOutResult::Error
            };
            return steps.finish(path, status, Some(diagnosis));
        }

        let action = steps.run(&fstat("action", &file));
        if diagnose(&action).is_none() && has_open_action(&action) {
            return steps.finish(path, CheckOutResult::AlreadyCheckedOut, None);
        }

        let edit = steps.run(&CommandRequest::new(["edit", file.as_str()]));
        if let Some(diagnosis) = diagnose(&edit) {
            return steps.finish(path, CheckOutResult::Error, Some(diagnosis));
        }

        self.cache.invalidate(path);
        steps.finish(path, CheckOutResult::CheckedOut, None)
    }

    /// Discards the pending change on `path`.
    pub fn revert_file(&self, path: &Path) -> OperationReport<RevertResult> {
        let session = self.sessions.snapshot();
        let mut steps = Steps::new(&self.executor, &session);
        let file = path_argument(path);

        let known = steps.run(&fstat("clientFile", &file));
        if let Some(diagnosis) = diagnose(&known) {
            let status = if diagnosis.kind().is_not_in_source_control() {
                RevertResult::NotInSourceControl
            } else {
                RevertResult::Error
            };
            return steps.finish(path, status, Some(diagnosis));
        }

        let action = steps.run(&fstat("action", &file));
        if let Some(diagnosis) = diagnose(&action)
            && diagnosis.kind() == ErrorKind::FieldMissing
        {
            return steps.finish(path, RevertResult::NotCheckedOut, Some(diagnosis));
        }

        let revert = steps.run(&CommandRequest::new(["revert", file.as_str()]));
        if let Some(diagnosis) = diagnose(&revert) {
            let status = if diagnosis.kind() == ErrorKind::NotOpened {
                RevertResult::NotCheckedOut
            } else {
                RevertResult::Error
            };
            return steps.finish(path, status, Some(diagnosis));
        }

        self.cache.invalidate(path);
        steps.finish(path, RevertResult::Reverted, None)
    }

    /// Reports whether `path` is opened for edit or add.
    ///
    /// Answers are cached for [`STATUS_TTL`](crate::STATUS_TTL). With the
    /// writable fast path enabled on a confirmed `noallwrite` workspace, a
    /// locally writable file counts as checked out without asking the
    /// server.
    pub fn is_checked_out(&self, path: &Path) -> StatusLookup {
        if self.fast_path_active() && is_locally_writable(path) {
            return StatusLookup::assumed(true);
        }

        let session = self.sessions.snapshot();
        self.cache.get_or_compute(path, || {
            let invocation = self
                .executor
                .run(&fstat("action", &path_argument(path)), &session);
            let checked_out = diagnose(&invocation).is_none() && has_open_action(&invocation);
            StatusLookup::computed(
                checked_out,
                invocation.stdout(),
                invocation.stderr(),
                invocation.transcript(),
            )
        })
    }

    /// Validates the server, the user, and the workspace.
    ///
    /// Records whether the workspace uses `noallwrite` for the writable
    /// fast path.
    pub fn server_connect(&self) -> ConnectionValidation {
        let session = self.sessions.snapshot();
        let validation = validate_connection(&self.executor, &session);
        self.no_all_write
            .store(validation.is_ok() && validation.no_all_write(), Ordering::Release);
        debug!(
            target: ENGINE_TARGET,
            ok = validation.is_ok(),
            no_all_write = validation.no_all_write(),
            diagnostic = validation.diagnostic(),
            "validated connection"
        );
        validation
    }

    /// Lists files opened for edit and resolves them to local paths.
    ///
    /// Aborts without resolving anything when more than
    /// [`MAX_OPENED_FILES`] items are open. Files that fail to resolve are
    /// skipped.
    pub fn checked_out_files(&self) -> CheckedOutListing {
        let session = self.sessions.snapshot();
        let mut steps = Steps::new(&self.executor, &session);

        let listing = steps.run(&CommandRequest::new([
            "-ztag",
            "-F",
            "%action% %depotFile%",
            "opened",
        ]));
        if let Some(diagnosis) = diagnose(&listing) {
            if diagnosis.kind() == ErrorKind::NotOpened {
                return steps.listing(ListingOutcome::Complete, BTreeSet::new(), String::new());
            }
            return steps.listing(
                ListingOutcome::Failed,
                BTreeSet::new(),
                diagnosis.message().to_owned(),
            );
        }

        let reported = listing.stdout().lines().count().checked_div(2).unwrap_or(0);
        if reported > MAX_OPENED_FILES {
            debug!(
                target: ENGINE_TARGET,
                reported,
                limit = MAX_OPENED_FILES,
                "too many opened files to reconcile"
            );
            return steps.listing(
                ListingOutcome::TooManyFiles { reported },
                BTreeSet::new(),
                format!(
                    "{reported} files are opened; reconciliation is limited to {MAX_OPENED_FILES}."
                ),
            );
        }

        let mut files = BTreeSet::new();
        for depot_file in edited_depot_files(listing.stdout()) {
            let known = steps.run(&fstat("clientFile", depot_file));
            if diagnose(&known).is_some() {
                continue;
            }
            if let Some(local) = extract_field(known.stdout(), CLIENT_FILE_FIELD)
                && !local.is_empty()
            {
                files.insert(PathBuf::from(local));
            }
        }
        steps.listing(ListingOutcome::Complete, files, String::new())
    }
}

/// Runs the connection checks in order, stopping at the first failure.
fn validate_connection<E: CommandExecutor>(
    executor: &E,
    session: &SessionContext,
) -> ConnectionValidation {
    let server_only = session.server_only();
    let with_user = session.without_workspace();
    let mut steps = Steps::new(executor, session);

    let info = steps.run_as(&server_only, &CommandRequest::new(["info", "-s"]));
    if let Some(diagnosis) = diagnose(&info) {
        return ConnectionValidation::invalid(diagnosis.message(), steps.transcript);
    }

    let users = steps.run_as(&with_user, &with_optional_name(&["users"], session.user()));
    if let Some(diagnosis) = diagnose(&users) {
        return ConnectionValidation::invalid(diagnosis.message(), steps.transcript);
    }

    let client = steps.run_as(
        &with_user,
        &with_optional_name(&["client", "-o"], session.workspace()),
    );
    if let Some(diagnosis) = diagnose(&client) {
        return ConnectionValidation::invalid(diagnosis.message(), steps.transcript);
    }

    let spec = client.stdout();
    let (Some(_access), Some(root)) = (
        extract_field(spec, "Access:"),
        extract_field(spec, "Root:"),
    ) else {
        return ConnectionValidation::invalid(
            format!("workspace '{}' is not valid on server.", session.workspace()),
            steps.transcript,
        );
    };

    if !Path::new(&root).is_dir() {
        return ConnectionValidation::invalid(
            format!("workspace Root: folder '{root}' does not exist on this machine."),
            steps.transcript,
        );
    }

    let no_all_write = extract_field(spec, "Options:").is_some_and(|options| {
        options
            .split_whitespace()
            .any(|option| option == NO_ALL_WRITE_OPTION)
    });
    ConnectionValidation::valid(no_all_write, steps.transcript)
}

/// Accumulates transcripts across the steps of one operation.
struct Steps<'a, E> {
    executor: &'a E,
    session: &'a SessionContext,
    transcript: String,
}

impl<'a, E: CommandExecutor> Steps<'a, E> {
    const fn new(executor: &'a E, session: &'a SessionContext) -> Self {
        Self {
            executor,
            session,
            transcript: String::new(),
        }
    }

    fn run(&mut self, request: &CommandRequest) -> CommandInvocation {
        self.run_as(self.session, request)
    }

    /// Runs one step with a narrowed copy of the operation's session.
    fn run_as(&mut self, session: &SessionContext, request: &CommandRequest) -> CommandInvocation {
        let invocation = self.executor.run(request, session);
        self.transcript.push_str(invocation.transcript());
        invocation
    }

    fn finish<S>(self, path: &Path, status: S, diagnosis: Option<Diagnosis>) -> OperationReport<S>
    where
        S: Copy + std::fmt::Debug,
    {
        debug!(
            target: ENGINE_TARGET,
            path = %path.display(),
            ?status,
            error_kind = ?diagnosis.as_ref().map(Diagnosis::kind),
            "operation finished"
        );
        OperationReport::new(status, diagnosis, self.transcript)
    }

    fn listing(
        self,
        outcome: ListingOutcome,
        files: BTreeSet<PathBuf>,
        diagnostic: String,
    ) -> CheckedOutListing {
        debug!(
            target: ENGINE_TARGET,
            ?outcome,
            resolved = files.len(),
            "listed opened files"
        );
        CheckedOutListing::new(outcome, files, diagnostic, self.transcript)
    }
}

fn fstat(field: &str, file: &str) -> CommandRequest {
    CommandRequest::new(["fstat", "-T", field, file])
}

fn with_optional_name(command: &[&str], name: &str) -> CommandRequest {
    let mut args: Vec<&str> = command.to_vec();
    if !name.is_empty() {
        args.push(name);
    }
    CommandRequest::new(args)
}

fn path_argument(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}

/// Whether an action query reports the file opened for edit or add.
fn has_open_action(invocation: &CommandInvocation) -> bool {
    matches!(
        extract_field(invocation.stdout(), ACTION_FIELD).as_deref(),
        Some("edit" | "add")
    )
}

/// Depot paths of `edit` items in `%action% %depotFile%` listing output.
fn edited_depot_files(listing: &str) -> impl Iterator<Item = &str> {
    listing
        .lines()
        .filter_map(|line| line.trim().split_once(' '))
        .filter(|(action, _)| *action == "edit")
        .map(|(_, depot_file)| depot_file.trim())
        .filter(|depot_file| !depot_file.is_empty())
}

fn is_locally_writable(path: &Path) -> bool {
    std::fs::metadata(path).is_ok_and(|metadata| metadata.is_file() && !metadata.permissions().readonly())
}

#[cfg(test)]
mod tests;
