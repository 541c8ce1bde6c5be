//! Process-level errors raised while running the VCS client.
//!
//! These never cross the public engine boundary as `Err` values. The runner
//! records them on the [`CommandInvocation`](crate::CommandInvocation) so the
//! engine can classify a missing client separately from a client that ran
//! and printed nothing. I/O errors are wrapped in `Arc` so invocations stay
//! cheap to clone.

use std::path::PathBuf;
use std::sync::Arc;

use thiserror::Error;

/// Errors arising while spawning or supervising the client process.
#[derive(Debug, Clone, Error)]
pub enum CommandError {
    /// The client process could not be started at all.
    #[error("failed to start '{}': {source}", .binary.display())]
    SpawnFailed {
        /// Executable that was launched.
        binary: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: Arc<std::io::Error>,
    },

    /// Waiting on the running client failed.
    #[error("failed to wait for '{}': {source}", .binary.display())]
    Wait {
        /// Executable that was launched.
        binary: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: Arc<std::io::Error>,
    },
}

impl CommandError {
    /// Returns `true` when the executable itself could not be found.
    #[must_use]
    pub fn is_binary_missing(&self) -> bool {
        match self {
            Self::SpawnFailed { source, .. } => source.kind() == std::io::ErrorKind::NotFound,
            Self::Wait { .. } => false,
        }
    }
}
