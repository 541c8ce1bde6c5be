//! Configuration loading helpers for the p4scc CLI.
//!
//! Configuration flags lead the argument list. They are split off here so
//! `ortho_config` only sees the flags it understands, while clap parses the
//! command that follows.

use std::ffi::{OsStr, OsString};

use ortho_config::OrthoConfig;

use p4scc_config::{Config, ProviderMode};
use p4scc_engine::{Policy, SessionContext, SettingsSource};

use crate::AppError;

/// CLI flags recognised by the configuration loader.
///
/// MAINTENANCE: keep in sync with the value-taking fields of
/// `p4scc_config::Config`.
pub(crate) const CONFIG_CLI_FLAGS: &[&str] = &[
    "--config-path",
    "--client-binary",
    "--mode",
    "--server",
    "--user",
    "--workspace",
    "--log-filter",
    "--log-format",
];

pub(crate) trait ConfigLoader {
    /// Loads configuration for the CLI.
    ///
    /// # Flag Ordering
    ///
    /// Configuration flags must appear before the command. Flags after it are
    /// parsed as command arguments.
    fn load(&self, args: &[OsString]) -> Result<Config, AppError>;
}

pub(crate) struct OrthoConfigLoader;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FlagAction {
    Include { needs_value: bool },
    Skip,
}

impl ConfigLoader for OrthoConfigLoader {
    fn load(&self, args: &[OsString]) -> Result<Config, AppError> {
        Config::load_from_iter(args.iter().cloned()).map_err(AppError::LoadConfiguration)
    }
}

impl OrthoConfigLoader {
    fn process_config_flag(argument: &OsStr) -> FlagAction {
        let argument_text = argument.to_string_lossy();
        let Some((flag, has_inline_value)) = split_flag(&argument_text) else {
            return FlagAction::Skip;
        };
        if CONFIG_CLI_FLAGS.contains(&flag) {
            return FlagAction::Include {
                needs_value: !has_inline_value,
            };
        }
        FlagAction::Skip
    }
}

/// Splits `--flag=value` into the flag and whether a value was inlined.
fn split_flag(argument: &str) -> Option<(&str, bool)> {
    if !argument.starts_with("--") {
        return None;
    }
    Some(
        argument
            .split_once('=')
            .map_or((argument, false), |(flag, _)| (flag, true)),
    )
}

pub(crate) struct ConfigArgumentSplit {
    pub(crate) config_arguments: Vec<OsString>,
    pub(crate) command_start: usize,
}

pub(crate) fn split_config_arguments(args: &[OsString]) -> ConfigArgumentSplit {
    let mut remaining = args.iter();
    let Some(program) = remaining.next() else {
        return ConfigArgumentSplit {
            config_arguments: Vec::new(),
            command_start: 0,
        };
    };

    let mut filtered = vec![program.clone()];
    let mut pending_value = false;
    for argument in remaining {
        if pending_value {
            filtered.push(argument.clone());
            pending_value = false;
            continue;
        }
        match OrthoConfigLoader::process_config_flag(argument.as_os_str()) {
            FlagAction::Include { needs_value } => {
                filtered.push(argument.clone());
                pending_value = needs_value;
            }
            FlagAction::Skip => break,
        }
    }

    let command_start = filtered.len();
    ConfigArgumentSplit {
        config_arguments: filtered,
        command_start,
    }
}

/// Host policy derived from the loaded configuration.
pub(crate) const fn policy_from(config: &Config) -> Policy {
    Policy {
        enabled: config.mode().is_enabled(),
        checkout_on_edit: config.checkout_on_edit,
        prompt_before_checkout: config.prompt_before_checkout,
        use_no_all_write_optimization: config.use_no_all_write_optimization,
        verbose_output: config.verbose_output,
    }
}

/// Session source selected by the configured mode.
pub(crate) fn settings_source_from(config: &Config) -> SettingsSource {
    match config.mode() {
        ProviderMode::Disabled => SettingsSource::Disabled,
        ProviderMode::Automatic => SettingsSource::Automatic,
        ProviderMode::Manual => SettingsSource::Manual(SessionContext::new(
            config.server(),
            config.user(),
            config.workspace(),
        )),
    }
}
