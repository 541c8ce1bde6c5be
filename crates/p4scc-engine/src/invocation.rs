//! Requests to and captured results from a single client invocation.

use std::path::{Path, PathBuf};

use crate::error::CommandError;

/// Replacement stderr for invocations killed by the hard timeout.
pub const TIMEOUT_MESSAGE: &str = "VCS command timed out after waiting for 5 minutes.  \
Check your configuration settings to make sure they are correct.  \
You may want to try to manually check out or add the file in your VCS client.\n";

/// Sub-command and arguments for one client invocation.
///
/// Session flags (`-p`, `-u`, `-c`) are not part of the request; the executor
/// prepends them from the [`SessionContext`](crate::SessionContext).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandRequest {
    args: Vec<String>,
    current_dir: Option<PathBuf>,
}

impl CommandRequest {
    /// Creates a request from the sub-command and its arguments.
    #[must_use]
    pub fn new<I, S>(args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            args: args.into_iter().map(Into::into).collect(),
            current_dir: None,
        }
    }

    /// Runs the client from `dir` instead of the caller's working directory.
    #[must_use]
    pub fn in_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.current_dir = Some(dir.into());
        self
    }

    /// Sub-command and arguments.
    #[must_use]
    pub fn args(&self) -> &[String] {
        &self.args
    }

    /// Working directory override, if any.
    #[must_use]
    pub fn current_dir(&self) -> Option<&Path> {
        self.current_dir.as_deref()
    }
}

/// Output captured from one client invocation.
///
/// Owned by the call that produced it; never shared across threads.
#[derive(Debug, Clone, Default)]
pub struct CommandInvocation {
    command_line: String,
    stdout: String,
    stderr: String,
    transcript: String,
    timed_out: bool,
    process_error: Option<CommandError>,
}

impl CommandInvocation {
    /// Builds an invocation from captured streams.
    ///
    /// The transcript records the text exactly as captured. When `timed_out`
    /// is set, stderr is then replaced by [`TIMEOUT_MESSAGE`] so callers see a
    /// single failure reason.
    #[must_use]
    pub fn captured(
        command_line: impl Into<String>,
        stdout: impl Into<String>,
        stderr: impl Into<String>,
        timed_out: bool,
    ) -> Self {
        let line: String = command_line.into();
        let output: String = stdout.into();
        let captured_stderr: String = stderr.into();
        let transcript = render_transcript(&line, &output, &captured_stderr);
        Self {
            command_line: line,
            stdout: output,
            stderr: if timed_out {
                TIMEOUT_MESSAGE.to_owned()
            } else {
                captured_stderr
            },
            transcript,
            timed_out,
            process_error: None,
        }
    }

    /// Builds an invocation for a process that could not be run.
    ///
    /// Both streams stay empty; the error is kept on the side.
    #[must_use]
    pub fn failed(command_line: impl Into<String>, error: CommandError) -> Self {
        Self {
            process_error: Some(error),
            ..Self::captured(command_line, "", "", false)
        }
    }

    /// Attaches a supervision error to an otherwise captured invocation.
    #[must_use]
    pub fn with_process_error(mut self, error: CommandError) -> Self {
        self.process_error = Some(error);
        self
    }

    /// Rendered command line, for diagnostics only.
    #[must_use]
    pub fn command_line(&self) -> &str {
        &self.command_line
    }

    /// Captured standard output.
    #[must_use]
    pub fn stdout(&self) -> &str {
        &self.stdout
    }

    /// Captured standard error, or [`TIMEOUT_MESSAGE`] after a timeout.
    #[must_use]
    pub fn stderr(&self) -> &str {
        &self.stderr
    }

    /// Audit transcript: command line, stdout, stderr.
    #[must_use]
    pub fn transcript(&self) -> &str {
        &self.transcript
    }

    /// Whether the hard timeout killed the process.
    #[must_use]
    pub const fn timed_out(&self) -> bool {
        self.timed_out
    }

    /// Error raised while spawning or supervising the process.
    #[must_use]
    pub const fn process_error(&self) -> Option<&CommandError> {
        self.process_error.as_ref()
    }

    /// Whether the invocation reported any failure.
    #[must_use]
    pub fn has_error(&self) -> bool {
        self.timed_out || self.process_error.is_some() || !self.stderr.trim().is_empty()
    }
}

/// Renders `binary args...` for transcripts, quoting arguments with spaces.
#[must_use]
pub fn render_command_line(binary: &Path, arguments: &[String]) -> String {
    let mut line = binary.display().to_string();
    for argument in arguments {
        line.push(' ');
        if argument.is_empty() || argument.contains(char::is_whitespace) {
            line.push('"');
            line.push_str(argument);
            line.push('"');
        } else {
            line.push_str(argument);
        }
    }
    line
}

fn render_transcript(command_line: &str, stdout: &str, stderr: &str) -> String {
    let mut transcript = String::new();
    push_terminated(&mut transcript, "command: ", command_line);
    push_terminated(&mut transcript, "response: ", stdout);
    push_terminated(&mut transcript, "error: ", stderr);
    transcript
}

fn push_terminated(buffer: &mut String, label: &str, text: &str) {
    buffer.push_str(label);
    buffer.push_str(text);
    if !text.ends_with('\n') {
        buffer.push('\n');
    }
}
