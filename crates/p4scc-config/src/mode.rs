//! Provider mode selection.
//!
//! The mode decides where the session triple (server, user, workspace) comes
//! from and whether the provider talks to the VCS client at all.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// How the provider obtains its session settings.
#[derive(
    Debug, Clone, Copy, Default, Deserialize, Serialize, PartialEq, Eq, EnumString, Display,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum ProviderMode {
    /// The provider is switched off; every operation is a no-op.
    Disabled,
    /// Settings are discovered by asking the client (`p4 set`).
    #[default]
    Automatic,
    /// Settings come from the `server`, `user`, and `workspace` fields.
    Manual,
}

impl ProviderMode {
    /// Returns `true` unless the provider is disabled.
    #[must_use]
    pub const fn is_enabled(self) -> bool {
        !matches!(self, Self::Disabled)
    }
}

/// Errors encountered while parsing a [`ProviderMode`] from text.
pub type ProviderModeParseError = strum::ParseError;
