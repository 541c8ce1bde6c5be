//! Maps parsed commands onto provider operations.

use std::path::{Path, PathBuf};

use p4scc_config::{Config, ProviderMode};
use p4scc_engine::{
    CommandExecutor, SccProvider, SessionContext, SettingsSource,
    discover_settings, find_config_file,
};

use tracing::debug;

use crate::cli::CliCommand;
use crate::config::settings_source_from;
use crate::output::{CommandOutput, CommandReport, FileOutcome};
use crate::telemetry::LoggedSink;

/// Tracing target for command dispatch.
const CLI_TARGET: &str = "p4scc_cli::commands";

/// Provider type driven by the CLI.
pub(crate) type CliProvider<E> = SccProvider<E, LoggedSink>;

/// Runs `command` from `dir` and collects its result and messages.
///
/// Every operation except `settings` first applies the configured session,
/// exactly as a host does when its settings change. Status, edit, and save
/// queries also connect first when the writable fast path is enabled.
pub(crate) fn execute<E: CommandExecutor>(
    command: &CliCommand,
    provider: &CliProvider<E>,
    config: &Config,
    dir: &Path,
) -> CommandOutput {
    let source = settings_source_from(config);
    let report = match command {
        CliCommand::Settings { .. } => settings(provider, config.mode(), &source, dir),
        CliCommand::Connect => {
            provider.apply_settings(&source, dir);
            let validation = provider.server_connect();
            CommandReport::Connect {
                ok: validation.is_ok(),
                no_all_write: validation.no_all_write(),
                diagnostic: validation.diagnostic().to_owned(),
            }
        }
        CliCommand::Status { path } => {
            provider.apply_settings(&source, dir);
            connect_for_fast_path(provider);
            CommandReport::Status {
                path: path.clone(),
                checked_out: provider.is_checked_out(path),
            }
        }
        CliCommand::Checkout { paths } => {
            provider.apply_settings(&source, dir);
            CommandReport::Checkout {
                files: each_file(paths, |path| provider.check_out_file(path)),
            }
        }
        CliCommand::Revert { paths, yes } => {
            provider.apply_settings(&source, dir);
            CommandReport::Revert {
                confirmed: *yes,
                files: each_file(paths, |path| provider.revert_file(path, |_| *yes)),
            }
        }
        CliCommand::Opened => {
            provider.apply_settings(&source, dir);
            CommandReport::Opened {
                files: provider.load_checked_out_files().into_iter().collect(),
            }
        }
        CliCommand::QueryEdit { path, yes } => {
            provider.apply_settings(&source, dir);
            connect_for_fast_path(provider);
            CommandReport::QueryEdit {
                path: path.clone(),
                verdict: provider.query_edit(path, |_| *yes),
            }
        }
        CliCommand::QuerySave { path, yes } => {
            provider.apply_settings(&source, dir);
            connect_for_fast_path(provider);
            CommandReport::QuerySave {
                path: path.clone(),
                verdict: provider.query_save(path, |_| *yes),
            }
        }
    };
    CommandOutput::new(report, provider.sink().take())
}

/// Validates the session before a status query when the writable fast path
/// is enabled.
///
/// Each CLI process starts with a fresh engine, and the fast path stays off
/// until a connection confirms a `noallwrite` workspace.
fn connect_for_fast_path<E: CommandExecutor>(provider: &CliProvider<E>) {
    if !provider.policy().use_no_all_write_optimization {
        return;
    }
    let validation = provider.server_connect();
    debug!(
        target: CLI_TARGET,
        ok = validation.is_ok(),
        no_all_write = validation.no_all_write(),
        "connected for writable fast path"
    );
}

fn each_file<F>(paths: &[PathBuf], mut operation: F) -> Vec<FileOutcome>
where
    F: FnMut(&Path) -> bool,
{
    paths
        .iter()
        .map(|path| FileOutcome {
            path: path.clone(),
            success: operation(path),
        })
        .collect()
}

/// Reports the session without applying it.
///
/// Automatic mode also locates the `P4CONFIG` file that backs the discovered
/// values, searching upwards from `dir`.
fn settings<E: CommandExecutor>(
    provider: &CliProvider<E>,
    mode: ProviderMode,
    source: &SettingsSource,
    dir: &Path,
) -> CommandReport {
    let (session, config_file) = match source {
        SettingsSource::Disabled => (SessionContext::default(), None),
        SettingsSource::Manual(session) => (session.clone(), None),
        SettingsSource::Automatic => {
            let discovered = discover_settings(provider.engine().executor(), dir);
            let config_file = discovered
                .config_file_name()
                .and_then(|name| find_config_file(dir, name));
            (discovered.session(), config_file)
        }
    };
    CommandReport::Settings {
        mode,
        session,
        config_file,
    }
}
