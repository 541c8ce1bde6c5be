//! Command execution and checkout-state engine for Perforce workspaces.
//!
//! The `p4scc-engine` crate lets an editor-like host treat files as version
//! controlled while deferring every decision to the `p4` command-line
//! client. It never speaks the server protocol itself: each operation spawns
//! the client, captures and timeboxes its output, and turns the text into
//! typed results.
//!
//! # Architecture
//!
//! Leaves first:
//!
//! - [`ProcessRunner`] spawns the client with session flags, drains stdout
//!   and stderr on separate threads, and kills it after a hard timeout.
//!   It implements [`CommandExecutor`], the seam everything above is
//!   generic over.
//! - [`extract_field`] reads `Label: value` and `... tag value` output.
//! - [`diagnose`] maps failures to an [`ErrorKind`] through one table of
//!   known client phrases.
//! - [`CheckoutStatusCache`] memoises checked-out queries for one second.
//! - [`VcsEngine`] runs the checkout, revert, validation, and
//!   reconciliation state machines, taking one [`SessionContext`] snapshot
//!   from a shared [`SessionStore`] per operation.
//! - [`SccProvider`] applies the host's [`Policy`], tracks the checked-out
//!   file set, and reports to an [`OutputSink`].
//!
//! # Example
//!
//! ```rust,no_run
//! use std::path::Path;
//!
//! use p4scc_engine::{BufferedSink, Policy, ProcessRunner, SccProvider, SettingsSource};
//!
//! let policy = Policy {
//!     enabled: true,
//!     checkout_on_edit: true,
//!     ..Policy::default()
//! };
//! let provider = SccProvider::new(ProcessRunner::new("p4"), BufferedSink::new(), policy);
//! provider.apply_settings(&SettingsSource::Automatic, Path::new("/work/app"));
//!
//! if provider.server_connect().is_ok() {
//!     provider.check_out_file(Path::new("/work/app/src/main.c"));
//! }
//! for line in provider.sink().take() {
//!     println!("{line}");
//! }
//! ```

pub mod cache;
pub mod classify;
pub mod discovery;
pub mod engine;
pub mod error;
pub mod executor;
pub mod field;
pub mod invocation;
pub mod output;
pub mod process;
pub mod provider;
pub mod session;

#[cfg(test)]
mod tests;

pub use cache::{CheckoutStatusCache, STATUS_TTL, StatusLookup};
pub use classify::{Diagnosis, ErrorKind, KNOWN_PHRASES, classify_text, diagnose};
pub use discovery::{DiscoveredSettings, discover_settings, find_config_file, parse_set_output};
pub use engine::{
    CheckOutResult, CheckedOutListing, ConnectionValidation, ListingOutcome, MAX_OPENED_FILES,
    OperationReport, RevertResult, VcsEngine,
};
pub use error::CommandError;
pub use executor::CommandExecutor;
pub use field::extract_field;
pub use invocation::{CommandInvocation, CommandRequest, TIMEOUT_MESSAGE, render_command_line};
pub use output::{BufferedSink, NullSink, OutputSink, local_now, timestamped};
pub use process::{DEFAULT_COMMAND_TIMEOUT, ProcessRunner, STREAM_GRACE_PERIOD};
pub use provider::{
    CheckedOutFileSet, EditVerdict, Policy, SaveVerdict, SccProvider, SettingsSource,
};
pub use session::{SessionContext, SessionStore};
