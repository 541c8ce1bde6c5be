//! Shared configuration for the p4scc provider.
//!
//! [`Config`] layers built-in defaults, an optional TOML file
//! (`--config-path` or `P4SCC_CONFIG_PATH`), `P4SCC_*` environment variables,
//! and command-line flags through `ortho_config`. The resulting record
//! replaces the stringly-keyed settings dictionary a host would otherwise
//! carry: it names the client executable, the provider mode, the manual
//! session triple, the checkout policy flags, and the logging setup.

use camino::{Utf8Path, Utf8PathBuf};
use ortho_config::OrthoConfig;
use serde::{Deserialize, Serialize};

mod defaults;
mod logging;
mod mode;

pub use defaults::{
    DEFAULT_CLIENT_BINARY, DEFAULT_LOG_FILTER, default_checkout_on_edit, default_client_binary,
    default_log_filter, default_log_filter_string, default_log_format, default_mode,
};
pub use logging::{LogFormat, LogFormatParseError};
pub use mode::{ProviderMode, ProviderModeParseError};

/// Resolved configuration for the CLI and any embedding host.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize, OrthoConfig)]
#[ortho_config(prefix = "P4SCC")]
pub struct Config {
    /// Client executable invoked for every operation.
    #[serde(default = "default_client_binary")]
    #[ortho_config(default = default_client_binary())]
    pub client_binary: Utf8PathBuf,
    /// Where the session settings come from.
    #[serde(default = "default_mode")]
    #[ortho_config(default = default_mode())]
    pub mode: ProviderMode,
    /// Server address used in manual mode.
    #[serde(default)]
    pub server: Option<String>,
    /// User identity used in manual mode.
    #[serde(default)]
    pub user: Option<String>,
    /// Workspace (client) name used in manual mode.
    #[serde(default)]
    pub workspace: Option<String>,
    /// Check files out when the host starts editing rather than on save.
    #[serde(default = "default_checkout_on_edit")]
    #[ortho_config(default = default_checkout_on_edit())]
    pub checkout_on_edit: bool,
    /// Ask before checking a file out.
    #[serde(default)]
    #[ortho_config(default = false)]
    pub prompt_before_checkout: bool,
    /// Treat locally writable files as checked out on `noallwrite` workspaces.
    #[serde(default)]
    #[ortho_config(default = false)]
    pub use_no_all_write_optimization: bool,
    /// Emit full command transcripts to the output sink.
    #[serde(default)]
    #[ortho_config(default = false)]
    pub verbose_output: bool,
    /// Tracing filter expression.
    #[serde(default = "default_log_filter_string")]
    #[ortho_config(default = default_log_filter_string())]
    pub log_filter: String,
    /// Tracing output format.
    #[serde(default = "default_log_format")]
    #[ortho_config(default = default_log_format())]
    pub log_format: LogFormat,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            client_binary: default_client_binary(),
            mode: default_mode(),
            server: None,
            user: None,
            workspace: None,
            checkout_on_edit: default_checkout_on_edit(),
            prompt_before_checkout: false,
            use_no_all_write_optimization: false,
            verbose_output: false,
            log_filter: default_log_filter_string(),
            log_format: default_log_format(),
        }
    }
}

impl Config {
    /// Client executable invoked for every operation.
    #[must_use]
    pub fn client_binary(&self) -> &Utf8Path {
        self.client_binary.as_path()
    }

    /// Provider mode.
    #[must_use]
    pub const fn mode(&self) -> ProviderMode {
        self.mode
    }

    /// Manual-mode server address, empty when unset.
    #[must_use]
    pub fn server(&self) -> &str {
        self.server.as_deref().unwrap_or_default()
    }

    /// Manual-mode user identity, empty when unset.
    #[must_use]
    pub fn user(&self) -> &str {
        self.user.as_deref().unwrap_or_default()
    }

    /// Manual-mode workspace name, empty when unset.
    #[must_use]
    pub fn workspace(&self) -> &str {
        self.workspace.as_deref().unwrap_or_default()
    }

    /// Tracing filter expression.
    #[must_use]
    pub fn log_filter(&self) -> &str {
        self.log_filter.as_str()
    }

    /// Tracing output format.
    #[must_use]
    pub const fn log_format(&self) -> LogFormat {
        self.log_format
    }
}
