use camino::Utf8PathBuf;

use crate::logging::LogFormat;
use crate::mode::ProviderMode;

/// Executable invoked for every VCS operation when none is configured.
pub const DEFAULT_CLIENT_BINARY: &str = "p4";

/// Default log filter expression used by the binary.
pub const DEFAULT_LOG_FILTER: &str = "warn";

/// Default client executable.
pub fn default_client_binary() -> Utf8PathBuf {
    Utf8PathBuf::from(DEFAULT_CLIENT_BINARY)
}

/// Default log filter expression used by the binary.
pub fn default_log_filter() -> &'static str {
    DEFAULT_LOG_FILTER
}

/// Owned log filter value used where allocation is required (e.g. serde).
pub fn default_log_filter_string() -> String {
    DEFAULT_LOG_FILTER.to_owned()
}

/// Default logging format for the binary.
pub fn default_log_format() -> LogFormat {
    LogFormat::Compact
}

/// Default provider mode.
pub fn default_mode() -> ProviderMode {
    ProviderMode::Automatic
}

/// Files are checked out as soon as the host starts editing them.
pub const fn default_checkout_on_edit() -> bool {
    true
}
