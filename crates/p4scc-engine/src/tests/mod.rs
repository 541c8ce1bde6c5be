//! Crate-level test doubles and BDD scenarios.


use std::collections::VecDeque;
use std::io;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use mockall::mock;

use crate::error::CommandError;
use crate::executor::CommandExecutor;
use crate::invocation::{CommandInvocation, CommandRequest};
use crate::session::SessionContext;

mock! {
    pub(crate) Executor {}
    impl CommandExecutor for Executor {
        fn run(&self, request: &CommandRequest, session: &SessionContext) -> CommandInvocation;
    }
}

/// One client call observed by a [`ScriptedExecutor`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct RecordedCall {
    pub(crate) args: Vec<String>,
    pub(crate) session: SessionContext,
    pub(crate) dir: Option<PathBuf>,
}

impl RecordedCall {
    pub(crate) fn command(&self) -> String {
        self.args.join(" ")
    }
}

enum Reply {
    Output { stdout: String, stderr: String },
    TimedOut,
    SpawnFailure,
}

/// Executor that answers calls from a queue of canned replies.
///
/// Calls past the end of the script get empty, successful output.
#[derive(Default)]
pub(crate) struct ScriptedExecutor {
    replies: Mutex<VecDeque<Reply>>,
    calls: Mutex<Vec<RecordedCall>>,
}

impl ScriptedExecutor {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    fn push(self, reply: Reply) -> Self {
        self.replies
            .lock()
            .expect("replies lock")
            .push_back(reply);
        self
    }

    /// Queues a reply with the given streams.
    pub(crate) fn reply(self, stdout: &str, stderr: &str) -> Self {
        self.push(Reply::Output {
            stdout: stdout.to_owned(),
            stderr: stderr.to_owned(),
        })
    }

    /// Queues a successful reply.
    pub(crate) fn ok(self, stdout: &str) -> Self {
        self.reply(stdout, "")
    }

    /// Queues a failing reply.
    pub(crate) fn fail(self, stderr: &str) -> Self {
        self.reply("", stderr)
    }

    /// Queues a reply for a call killed by the timeout.
    pub(crate) fn timed_out(self) -> Self {
        self.push(Reply::TimedOut)
    }

    /// Queues a reply for a client that could not be started.
    pub(crate) fn spawn_failure(self) -> Self {
        self.push(Reply::SpawnFailure)
    }

    pub(crate) fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().expect("calls lock").clone()
    }

    pub(crate) fn commands(&self) -> Vec<String> {
        self.calls().iter().map(RecordedCall::command).collect()
    }
}

impl CommandExecutor for ScriptedExecutor {
    fn run(&self, request: &CommandRequest, session: &SessionContext) -> CommandInvocation {
        self.calls.lock().expect("calls lock").push(RecordedCall {
            args: request.args().to_vec(),
            session: session.clone(),
            dir: request.current_dir().map(PathBuf::from),
        });
        let command_line = format!("p4 {}", request.args().join(" "));
        match self.replies.lock().expect("replies lock").pop_front() {
            Some(Reply::Output { stdout, stderr }) => {
                CommandInvocation::captured(command_line, stdout, stderr, false)
            }
            Some(Reply::TimedOut) => CommandInvocation::captured(command_line, "", "", true),
            Some(Reply::SpawnFailure) => CommandInvocation::failed(
                command_line,
                CommandError::SpawnFailed {
                    binary: PathBuf::from("p4"),
                    source: Arc::new(io::Error::from(io::ErrorKind::NotFound)),
                },
            ),
            None => CommandInvocation::captured(command_line, "", "", false),
        }
    }
}

/// `fstat -T action` output for a file opened with `action`.
pub(crate) fn action_output(action: &str) -> String {
    format!("... action {action}\n")
}

/// `fstat -T clientFile` output for `local`.
pub(crate) fn client_file_output(local: &str) -> String {
    format!("... clientFile {local}\n")
}
