//! Automatic discovery of session settings from the client's environment.
//!
//! `p4 set` reports the effective `P4PORT`, `P4USER`, and `P4CLIENT`,
//! including values that come from a `P4CONFIG` file. It reads that file
//! relative to its working directory, so discovery runs the command from the
//! directory the host is working in.

use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::debug;

use crate::classify::diagnose;
use crate::executor::CommandExecutor;
use crate::invocation::CommandRequest;
use crate::session::SessionContext;

/// Tracing target for discovery.
const DISCOVERY_TARGET: &str = "p4scc_engine::discovery";

/// Settings reported by `p4 set`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DiscoveredSettings {
    server: String,
    user: String,
    workspace: String,
    config_file_name: Option<String>,
    #[serde(skip)]
    transcript: String,
}

impl DiscoveredSettings {
    /// Discovered `P4PORT`, empty when unset.
    #[must_use]
    pub fn server(&self) -> &str {
        &self.server
    }

    /// Discovered `P4USER`, empty when unset.
    #[must_use]
    pub fn user(&self) -> &str {
        &self.user
    }

    /// Discovered `P4CLIENT`, empty when unset.
    #[must_use]
    pub fn workspace(&self) -> &str {
        &self.workspace
    }

    /// Name of the per-directory config file (`P4CONFIG`), if set.
    #[must_use]
    pub fn config_file_name(&self) -> Option<&str> {
        self.config_file_name.as_deref()
    }

    /// Transcript of the `set` invocation; empty when parsed directly.
    #[must_use]
    pub fn transcript(&self) -> &str {
        &self.transcript
    }

    /// Session built from the discovered values.
    #[must_use]
    pub fn session(&self) -> SessionContext {
        SessionContext::new(
            self.server.clone(),
            self.user.clone(),
            self.workspace.clone(),
        )
    }
}

/// Runs `set` from `dir` and parses the result.
///
/// The command runs with an empty session so that the client reports its
/// own environment rather than echoing flags back. A failing command yields
/// empty settings.
pub fn discover_settings<E>(executor: &E, dir: &Path) -> DiscoveredSettings
where
    E: CommandExecutor + ?Sized,
{
    let invocation = executor.run(
        &CommandRequest::new(["set"]).in_dir(dir),
        &SessionContext::default(),
    );
    let mut settings = match diagnose(&invocation) {
        Some(diagnosis) => {
            debug!(
                target: DISCOVERY_TARGET,
                dir = %dir.display(),
                kind = ?diagnosis.kind(),
                "settings discovery failed"
            );
            DiscoveredSettings::default()
        }
        None => parse_set_output(invocation.stdout()),
    };
    settings.transcript = invocation.transcript().to_owned();
    debug!(
        target: DISCOVERY_TARGET,
        dir = %dir.display(),
        server = settings.server(),
        user = settings.user(),
        workspace = settings.workspace(),
        "discovered client settings"
    );
    settings
}

/// Parses `KEY=value (source)` lines as printed by `p4 set`.
///
/// The trailing parenthetical naming where a value came from is dropped.
/// Unknown keys are ignored.
///
/// # Examples
///
/// ```
/// use p4scc_engine::parse_set_output;
///
/// let settings = parse_set_output("P4CLIENT=alice-ws (config)\nP4PORT=ssl:p4:1666\n");
/// assert_eq!(settings.workspace(), "alice-ws");
/// assert_eq!(settings.server(), "ssl:p4:1666");
/// assert_eq!(settings.user(), "");
/// ```
#[must_use]
pub fn parse_set_output(stdout: &str) -> DiscoveredSettings {
    let mut settings = DiscoveredSettings::default();
    for (key, value) in stdout.lines().filter_map(|line| line.trim().split_once('=')) {
        let cleaned = strip_source_annotation(value).to_owned();
        match key.trim() {
            "P4PORT" => settings.server = cleaned,
            "P4USER" => settings.user = cleaned,
            "P4CLIENT" => settings.workspace = cleaned,
            "P4CONFIG" if !cleaned.is_empty() => settings.config_file_name = Some(cleaned),
            _ => {}
        }
    }
    settings
}

fn strip_source_annotation(value: &str) -> &str {
    value
        .split_once(" (")
        .map_or(value, |(head, _)| head)
        .trim()
}

/// Finds `name` in `start` or the nearest ancestor directory containing it.
#[must_use]
pub fn find_config_file(start: &Path, name: &str) -> Option<PathBuf> {
    if name.is_empty() {
        return None;
    }
    start
        .ancestors()
        .map(|dir| dir.join(name))
        .find(|candidate| candidate.is_file())
}
