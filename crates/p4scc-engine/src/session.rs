//! Session parameters shared by every client invocation.
//!
//! A [`SessionContext`] names the server, user, and workspace passed to the
//! client as `-p`, `-u`, and `-c`. Empty fields are omitted so the client
//! falls back to its own environment defaults.
//!
//! The host replaces the session wholesale when its configuration changes.
//! [`SessionStore`] makes that replacement atomic: readers take an
//! `Arc` snapshot, and an operation that spans several client calls uses one
//! snapshot throughout, so a concurrent update can never split an operation
//! across two sessions.

use std::sync::{Arc, RwLock};

use serde::Serialize;

/// Server, user, and workspace used to parameterise client invocations.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SessionContext {
    server: String,
    user: String,
    workspace: String,
}

impl SessionContext {
    /// Creates a session from its three fields.
    #[must_use]
    pub fn new(
        server: impl Into<String>,
        user: impl Into<String>,
        workspace: impl Into<String>,
    ) -> Self {
        Self {
            server: server.into(),
            user: user.into(),
            workspace: workspace.into(),
        }
    }

    /// Server address (`P4PORT`).
    #[must_use]
    pub fn server(&self) -> &str {
        &self.server
    }

    /// User identity (`P4USER`).
    #[must_use]
    pub fn user(&self) -> &str {
        &self.user
    }

    /// Workspace name (`P4CLIENT`).
    #[must_use]
    pub fn workspace(&self) -> &str {
        &self.workspace
    }

    /// Copy that keeps only the server, for checks that must not depend on
    /// the user or workspace.
    #[must_use]
    pub fn server_only(&self) -> Self {
        Self::new(self.server.clone(), "", "")
    }

    /// Copy that drops the workspace.
    #[must_use]
    pub fn without_workspace(&self) -> Self {
        Self::new(self.server.clone(), self.user.clone(), "")
    }

    /// Global client flags for the non-empty fields, in `-p -u -c` order.
    #[must_use]
    pub fn global_arguments(&self) -> Vec<String> {
        let mut arguments = Vec::new();
        for (flag, value) in [
            ("-p", &self.server),
            ("-u", &self.user),
            ("-c", &self.workspace),
        ] {
            if !value.is_empty() {
                arguments.push(flag.to_owned());
                arguments.push(value.clone());
            }
        }
        arguments
    }
}

/// Shared, replaceable holder for the current [`SessionContext`].
#[derive(Debug, Default)]
pub struct SessionStore {
    current: RwLock<Arc<SessionContext>>,
}

impl SessionStore {
    /// Creates a store holding `session`.
    #[must_use]
    pub fn new(session: SessionContext) -> Self {
        Self {
            current: RwLock::new(Arc::new(session)),
        }
    }

    /// Returns the session current at the time of the call.
    #[must_use]
    pub fn snapshot(&self) -> Arc<SessionContext> {
        let guard = self
            .current
            .read()
            .unwrap_or_else(|poison| poison.into_inner());
        Arc::clone(&guard)
    }

    /// Replaces the session. In-flight operations keep their snapshot.
    pub fn replace(&self, session: SessionContext) {
        let mut guard = self
            .current
            .write()
            .unwrap_or_else(|poison| poison.into_inner());
        *guard = Arc::new(session);
    }
}
