//! Host-facing facade over the engine.
//!
//! [`SccProvider`] is what an editor integration talks to. It applies the
//! host's [`Policy`] (a disabled provider never runs the client), turns
//! engine reports into the booleans hosts act on, keeps the set of files
//! known to be checked out, and writes status lines and, when verbose,
//! command transcripts to an [`OutputSink`].

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, RwLock};

use serde::Serialize;
use tracing::info;

use crate::cache::StatusLookup;
use crate::classify::classify_text;
use crate::discovery::discover_settings;
use crate::engine::{CheckOutResult, ConnectionValidation, RevertResult, VcsEngine};
use crate::executor::CommandExecutor;
use crate::output::{OutputSink, local_now, timestamped};
use crate::session::{SessionContext, SessionStore};

/// Tracing target for provider decisions.
const PROVIDER_TARGET: &str = "p4scc_engine::provider";

/// Local paths known to be checked out.
pub type CheckedOutFileSet = BTreeSet<PathBuf>;

/// Host switches that gate and shape provider behaviour.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[expect(
    clippy::struct_excessive_bools,
    reason = "each flag is an independent host setting"
)]
pub struct Policy {
    /// Whether the provider runs the client at all.
    pub enabled: bool,
    /// Check out when editing starts (otherwise when saving).
    pub checkout_on_edit: bool,
    /// Ask the user before checking a file out.
    pub prompt_before_checkout: bool,
    /// Treat writable files as checked out on `noallwrite` workspaces.
    pub use_no_all_write_optimization: bool,
    /// Emit command transcripts to the sink.
    pub verbose_output: bool,
}

/// Where the session comes from when settings are applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SettingsSource {
    /// No session; the provider is off.
    Disabled,
    /// Ask the client (`p4 set`) from the working directory.
    Automatic,
    /// Use the given values.
    Manual(SessionContext),
}

/// Answer to "may this file be edited?".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EditVerdict {
    /// The file is checked out or needs no checkout.
    Allowed,
    /// Checkout failed; edits may proceed in memory only.
    InMemoryOnly,
    /// The user declined the checkout.
    Cancelled,
}

/// Answer to "may this file be saved?".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SaveVerdict {
    /// The file is checked out or needs no checkout.
    Allowed,
    /// Checkout failed; the host should save elsewhere.
    ForceSaveAs,
    /// The user declined the checkout.
    Cancelled,
}

/// Source-control provider exposed to the host.
#[derive(Debug)]
pub struct SccProvider<E, S> {
    engine: VcsEngine<E>,
    sink: S,
    policy: RwLock<Policy>,
    checked_out: Mutex<CheckedOutFileSet>,
}

impl<E, S> SccProvider<E, S> {
    /// Engine driving the client.
    #[must_use]
    pub const fn engine(&self) -> &VcsEngine<E> {
        &self.engine
    }

    /// Sink receiving provider messages.
    #[must_use]
    pub const fn sink(&self) -> &S {
        &self.sink
    }

    /// Current policy.
    #[must_use]
    pub fn policy(&self) -> Policy {
        *self
            .policy
            .read()
            .unwrap_or_else(|poison| poison.into_inner())
    }

    /// Replaces the policy.
    pub fn set_policy(&self, policy: Policy) {
        self.engine
            .set_writable_fast_path(policy.use_no_all_write_optimization);
        *self
            .policy
            .write()
            .unwrap_or_else(|poison| poison.into_inner()) = policy;
    }

    /// Files recorded as checked out.
    #[must_use]
    pub fn checked_out_files(&self) -> CheckedOutFileSet {
        self.files().clone()
    }

    fn files(&self) -> MutexGuard<'_, CheckedOutFileSet> {
        self.checked_out
            .lock()
            .unwrap_or_else(|poison| poison.into_inner())
    }
}

impl<E: CommandExecutor, S: OutputSink> SccProvider<E, S> {
    /// Creates a provider with an empty session.
    #[must_use]
    pub fn new(executor: E, sink: S, policy: Policy) -> Self {
        Self::with_sessions(executor, Arc::new(SessionStore::default()), sink, policy)
    }

    /// Creates a provider sharing `sessions` with the host.
    #[must_use]
    pub fn with_sessions(
        executor: E,
        sessions: Arc<SessionStore>,
        sink: S,
        policy: Policy,
    ) -> Self {
        let engine = VcsEngine::new(executor, sessions);
        engine.set_writable_fast_path(policy.use_no_all_write_optimization);
        Self {
            engine,
            sink,
            policy: RwLock::new(policy),
            checked_out: Mutex::new(CheckedOutFileSet::new()),
        }
    }

    /// Replaces the session according to `source`, returning the new one.
    ///
    /// Automatic discovery runs `p4 set` from `dir` so that `P4CONFIG` files
    /// under it are honoured.
    pub fn apply_settings(&self, source: &SettingsSource, dir: &Path) -> SessionContext {
        let session = match source {
            SettingsSource::Disabled => SessionContext::default(),
            SettingsSource::Automatic => {
                let discovered = discover_settings(self.engine.executor(), dir);
                self.verbose(discovered.transcript());
                discovered.session()
            }
            SettingsSource::Manual(session) => session.clone(),
        };
        info!(
            target: PROVIDER_TARGET,
            server = session.server(),
            user = session.user(),
            workspace = session.workspace(),
            "session updated"
        );
        self.engine.sessions().replace(session.clone());
        session
    }

    /// Validates the configured server, user, and workspace.
    pub fn server_connect(&self) -> ConnectionValidation {
        if !self.policy().enabled {
            return ConnectionValidation::valid(false, "");
        }
        let validation = self.engine.server_connect();
        self.verbose(validation.transcript());
        if validation.is_ok() {
            self.emit("Connection to server successful.");
        } else {
            self.emit("Connection to server failed!");
            self.emit(validation.diagnostic());
        }
        validation
    }

    /// Whether `path` is opened for edit or add. Always `false` when
    /// disabled.
    pub fn is_checked_out(&self, path: &Path) -> bool {
        self.lookup(path).is_some_and(|lookup| lookup.is_checked_out())
    }

    /// Checks `path` out, returning whether the host may treat it as
    /// editable.
    ///
    /// Files that do not exist locally, already-open files, and files
    /// outside source control all count as success.
    pub fn check_out_file(&self, path: &Path) -> bool {
        if !self.policy().enabled || !path.exists() {
            return true;
        }
        let report = self.engine.check_out_file(path);
        self.verbose(report.transcript());
        match report.status() {
            CheckOutResult::NotInSourceControl => true,
            CheckOutResult::AlreadyCheckedOut => {
                self.files().insert(path.to_path_buf());
                true
            }
            CheckOutResult::CheckedOut => {
                self.emit(&format!("Check out of '{}' successful.", path.display()));
                self.files().insert(path.to_path_buf());
                true
            }
            CheckOutResult::Error => {
                self.emit(&format!("Check out of '{}' failed.", path.display()));
                self.emit(report.diagnostic());
                false
            }
        }
    }

    /// Reverts `path`, returning whether it ends up without a pending
    /// change.
    ///
    /// `confirm` is always asked first because reverting discards local
    /// edits. A declined revert runs nothing and counts as success.
    pub fn revert_file<F>(&self, path: &Path, confirm: F) -> bool
    where
        F: FnOnce(&Path) -> bool,
    {
        if !self.policy().enabled || !path.exists() {
            return true;
        }
        if !confirm(path) {
            info!(target: PROVIDER_TARGET, path = %path.display(), "revert declined");
            return true;
        }
        let report = self.engine.revert_file(path);
        self.verbose(report.transcript());
        match report.status() {
            RevertResult::NotInSourceControl => true,
            RevertResult::NotCheckedOut => {
                self.files().remove(path);
                true
            }
            RevertResult::Reverted => {
                self.emit(&format!("Revert of '{}' successful.", path.display()));
                self.files().remove(path);
                true
            }
            RevertResult::Error => {
                self.emit(&format!("Revert of '{}' failed.", path.display()));
                self.emit(report.diagnostic());
                false
            }
        }
    }

    /// Rebuilds the checked-out set from the server.
    ///
    /// Any failure, including too many opened files, leaves the set empty.
    pub fn load_checked_out_files(&self) -> CheckedOutFileSet {
        if !self.policy().enabled {
            return CheckedOutFileSet::new();
        }
        let listing = self.engine.checked_out_files();
        self.verbose(listing.transcript());
        if !listing.is_complete() {
            self.emit(listing.diagnostic());
        }
        let files = if listing.is_complete() {
            listing.into_files()
        } else {
            CheckedOutFileSet::new()
        };
        *self.files() = files.clone();
        files
    }

    /// Decides whether editing `path` may start, checking it out first when
    /// the policy checks out on edit.
    ///
    /// `confirm` is asked before checkout when the policy prompts.
    pub fn query_edit<F>(&self, path: &Path, confirm: F) -> EditVerdict
    where
        F: FnOnce(&Path) -> bool,
    {
        let policy = self.policy();
        if !policy.enabled || !policy.checkout_on_edit || !path.exists() {
            return EditVerdict::Allowed;
        }
        match self.checkout_gate(path, policy, confirm) {
            Gate::Declined => EditVerdict::Cancelled,
            Gate::Ready => EditVerdict::Allowed,
            Gate::NeedsCheckout if self.check_out_file(path) => EditVerdict::Allowed,
            Gate::NeedsCheckout => EditVerdict::InMemoryOnly,
        }
    }

    /// Decides whether saving `path` may proceed, checking it out first when
    /// the policy checks out on save.
    pub fn query_save<F>(&self, path: &Path, confirm: F) -> SaveVerdict
    where
        F: FnOnce(&Path) -> bool,
    {
        let policy = self.policy();
        if !policy.enabled || policy.checkout_on_edit || !path.exists() {
            return SaveVerdict::Allowed;
        }
        match self.checkout_gate(path, policy, confirm) {
            Gate::Declined => SaveVerdict::Cancelled,
            Gate::Ready => SaveVerdict::Allowed,
            Gate::NeedsCheckout if self.check_out_file(path) => SaveVerdict::Allowed,
            Gate::NeedsCheckout => SaveVerdict::ForceSaveAs,
        }
    }

    /// Shared status check and confirmation for edit and save queries.
    fn checkout_gate<F>(&self, path: &Path, policy: Policy, confirm: F) -> Gate
    where
        F: FnOnce(&Path) -> bool,
    {
        let Some(lookup) = self.lookup(path) else {
            return Gate::Ready;
        };
        let untracked = !lookup.stderr().trim().is_empty()
            && classify_text(lookup.stderr()).is_not_in_source_control();
        if lookup.is_checked_out() || untracked {
            return Gate::Ready;
        }
        if policy.prompt_before_checkout && !confirm(path) {
            return Gate::Declined;
        }
        Gate::NeedsCheckout
    }

    fn lookup(&self, path: &Path) -> Option<StatusLookup> {
        if !self.policy().enabled {
            return None;
        }
        let lookup = self.engine.is_checked_out(path);
        if let Some(transcript) = lookup.transcript() {
            self.verbose(transcript);
        }
        Some(lookup)
    }

    fn emit(&self, text: &str) {
        if !text.trim().is_empty() {
            self.sink.emit(&timestamped(local_now(), text));
        }
    }

    fn verbose(&self, transcript: &str) {
        if self.policy().verbose_output {
            self.emit(transcript);
        }
    }
}

enum Gate {
    Ready,
    Declined,
    NeedsCheckout,
}
