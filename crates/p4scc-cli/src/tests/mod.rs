//! Unit tests for the CLI runtime.


use std::collections::VecDeque;
use std::ffi::OsString;
use std::sync::Mutex;

use p4scc_config::Config;
use p4scc_engine::{CommandExecutor, CommandInvocation, CommandRequest, SessionContext};

use crate::AppError;
use crate::config::ConfigLoader;

/// Loader that hands back a fixed configuration.
pub(super) struct StaticLoader(pub(super) Config);

impl ConfigLoader for StaticLoader {
    fn load(&self, _args: &[OsString]) -> Result<Config, AppError> {
        Ok(self.0.clone())
    }
}

/// Executor replaying canned `(stdout, stderr)` pairs in order.
///
/// Records each command line with its session flags; runs past the end of
/// the script succeed silently.
#[derive(Default)]
pub(super) struct Replay {
    replies: Mutex<VecDeque<(String, String)>>,
    commands: Mutex<Vec<String>>,
}

impl Replay {
    pub(super) fn reply(self, stdout: &str, stderr: &str) -> Self {
        self.replies
            .lock()
            .unwrap_or_else(|poison| poison.into_inner())
            .push_back((stdout.to_owned(), stderr.to_owned()));
        self
    }

    pub(super) fn commands(&self) -> Vec<String> {
        self.commands
            .lock()
            .unwrap_or_else(|poison| poison.into_inner())
            .clone()
    }
}

impl CommandExecutor for Replay {
    fn run(&self, request: &CommandRequest, session: &SessionContext) -> CommandInvocation {
        let mut words = session.global_arguments();
        words.extend(request.args().iter().cloned());
        let command_line = words.join(" ");
        self.commands
            .lock()
            .unwrap_or_else(|poison| poison.into_inner())
            .push(command_line.clone());
        let (stdout, stderr) = self
            .replies
            .lock()
            .unwrap_or_else(|poison| poison.into_inner())
            .pop_front()
            .unwrap_or_default();
        CommandInvocation::captured(command_line, stdout, stderr, false)
    }
}

pub(super) fn os_args(values: &[&str]) -> Vec<OsString> {
    values.iter().map(OsString::from).collect()
}
