//! Subprocess execution of the VCS client.
//!
//! [`ProcessRunner`] implements [`CommandExecutor`] by spawning the client
//! binary with stdout and stderr piped. Each stream is drained by its own
//! reader thread, so a client that fills one pipe while the other is empty
//! cannot deadlock. The runner polls the child until it exits or the hard
//! timeout expires, then waits a short, bounded grace period for both
//! readers to reach end of stream before assembling the invocation.

use std::io::{BufRead, BufReader, Read};
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use tracing::{debug, warn};

use crate::error::CommandError;
use crate::executor::CommandExecutor;
use crate::invocation::{CommandInvocation, CommandRequest, render_command_line};
use crate::session::SessionContext;

/// Tracing target for client process operations.
const PROCESS_TARGET: &str = "p4scc_engine::process";

/// Hard limit on how long one client invocation may run.
pub const DEFAULT_COMMAND_TIMEOUT: Duration = Duration::from_secs(5 * 60);

/// How long to wait for the stream readers once the process has exited.
pub const STREAM_GRACE_PERIOD: Duration = Duration::from_secs(1);

const POLL_INTERVAL: Duration = Duration::from_millis(20);

/// Executes client commands as child processes.
///
/// # Example
///
/// ```rust,no_run
/// use p4scc_engine::{CommandExecutor, CommandRequest, ProcessRunner, SessionContext};
///
/// let runner = ProcessRunner::new("p4");
/// let session = SessionContext::new("ssl:perforce:1666", "alice", "alice-main");
/// let invocation = runner.run(&CommandRequest::new(["info", "-s"]), &session);
/// println!("{}", invocation.transcript());
/// ```
#[derive(Debug, Clone)]
pub struct ProcessRunner {
    binary: PathBuf,
    timeout: Duration,
    grace_period: Duration,
}

impl ProcessRunner {
    /// Creates a runner for `binary` with the default timeouts.
    #[must_use]
    pub fn new(binary: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
            timeout: DEFAULT_COMMAND_TIMEOUT,
            grace_period: STREAM_GRACE_PERIOD,
        }
    }

    /// Overrides the hard timeout.
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Overrides the post-exit grace period for the stream readers.
    #[must_use]
    pub const fn with_grace_period(mut self, grace_period: Duration) -> Self {
        self.grace_period = grace_period;
        self
    }

    /// Client executable.
    #[must_use]
    pub fn binary(&self) -> &Path {
        &self.binary
    }

    /// Hard timeout applied to each invocation.
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        self.timeout
    }

    fn build_command(&self, arguments: &[String], request: &CommandRequest) -> Command {
        let mut command = Command::new(&self.binary);
        command
            .args(arguments)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        if let Some(dir) = request.current_dir() {
            command.current_dir(dir);
        }
        command
    }

    /// Polls the child until it exits, killing it once the timeout expires.
    fn wait_for_exit(&self, child: &mut Child, command_line: &str) -> ExitOutcome {
        let started = Instant::now();
        loop {
            match child.try_wait() {
                Ok(Some(status)) => {
                    debug!(
                        target: PROCESS_TARGET,
                        command = command_line,
                        ?status,
                        "client process exited"
                    );
                    return ExitOutcome::Exited;
                }
                Ok(None) => {
                    if started.elapsed() >= self.timeout {
                        warn!(
                            target: PROCESS_TARGET,
                            command = command_line,
                            timeout_ms = u64::try_from(self.timeout.as_millis()).unwrap_or(u64::MAX),
                            "client timed out, killing process"
                        );
                        drop(child.kill());
                        drop(child.wait());
                        return ExitOutcome::TimedOut;
                    }
                    thread::sleep(POLL_INTERVAL);
                }
                Err(err) => {
                    warn!(
                        target: PROCESS_TARGET,
                        command = command_line,
                        error = %err,
                        "failed to poll client process"
                    );
                    drop(child.kill());
                    drop(child.wait());
                    return ExitOutcome::Failed(CommandError::Wait {
                        binary: self.binary.clone(),
                        source: Arc::new(err),
                    });
                }
            }
        }
    }

    /// Blocks until `pending` readers report end of stream or the grace
    /// period runs out.
    fn await_readers(&self, done: &Receiver<()>, readers: usize, command_line: &str) {
        let deadline = Instant::now() + self.grace_period;
        let mut pending = readers;
        while pending > 0 {
            let remaining = deadline.saturating_duration_since(Instant::now());
            match done.recv_timeout(remaining) {
                Ok(()) => pending -= 1,
                Err(RecvTimeoutError::Timeout) => {
                    warn!(
                        target: PROCESS_TARGET,
                        command = command_line,
                        pending,
                        "stream readers did not finish within the grace period"
                    );
                    return;
                }
                Err(RecvTimeoutError::Disconnected) => return,
            }
        }
    }
}

impl CommandExecutor for ProcessRunner {
    fn run(&self, request: &CommandRequest, session: &SessionContext) -> CommandInvocation {
        let mut arguments = session.global_arguments();
        arguments.extend(request.args().iter().cloned());
        let command_line = render_command_line(&self.binary, &arguments);

        debug!(
            target: PROCESS_TARGET,
            command = %command_line,
            dir = ?request.current_dir(),
            "spawning client process"
        );

        let mut child = match self.build_command(&arguments, request).spawn() {
            Ok(child) => child,
            Err(err) => {
                warn!(
                    target: PROCESS_TARGET,
                    command = %command_line,
                    error = %err,
                    "failed to spawn client process"
                );
                let error = CommandError::SpawnFailed {
                    binary: self.binary.clone(),
                    source: Arc::new(err),
                };
                return CommandInvocation::failed(command_line, error);
            }
        };

        let (done_tx, done_rx) = mpsc::channel();
        let stdout_buffer = Arc::new(Mutex::new(String::new()));
        let stderr_buffer = Arc::new(Mutex::new(String::new()));
        let mut readers = 0_usize;
        if let Some(stream) = child.stdout.take() {
            spawn_reader(stream, Arc::clone(&stdout_buffer), done_tx.clone());
            readers += 1;
        }
        if let Some(stream) = child.stderr.take() {
            spawn_reader(stream, Arc::clone(&stderr_buffer), done_tx.clone());
            readers += 1;
        }
        drop(done_tx);

        let outcome = self.wait_for_exit(&mut child, &command_line);
        self.await_readers(&done_rx, readers, &command_line);

        let stdout = snapshot(&stdout_buffer);
        let stderr = snapshot(&stderr_buffer);
        match outcome {
            ExitOutcome::Exited => CommandInvocation::captured(command_line, stdout, stderr, false),
            ExitOutcome::TimedOut => CommandInvocation::captured(command_line, stdout, stderr, true),
            ExitOutcome::Failed(error) => {
                CommandInvocation::captured(command_line, stdout, stderr, false)
                    .with_process_error(error)
            }
        }
    }
}

enum ExitOutcome {
    Exited,
    TimedOut,
    Failed(CommandError),
}

/// Drains `stream` line by line into `buffer`, then signals on `done`.
///
/// Lines are decoded lossily and re-terminated with `\n`, so CRLF output
/// reads the same as LF output.
fn spawn_reader<R>(stream: R, buffer: Arc<Mutex<String>>, done: Sender<()>)
where
    R: Read + Send + 'static,
{
    thread::spawn(move || {
        let mut reader = BufReader::new(stream);
        let mut raw = Vec::new();
        loop {
            raw.clear();
            match reader.read_until(b'\n', &mut raw) {
                Ok(0) | Err(_) => break,
                Ok(_) => {
                    let text = String::from_utf8_lossy(&raw);
                    let mut guard = buffer.lock().unwrap_or_else(|poison| poison.into_inner());
                    guard.push_str(text.trim_end_matches(['\r', '\n']));
                    guard.push('\n');
                }
            }
        }
        drop(done.send(()));
    });
}

/// Copies whatever a reader has captured so far.
///
/// Readers that outlive the grace period still hold the buffer, so this
/// clones rather than takes ownership.
fn snapshot(buffer: &Mutex<String>) -> String {
    buffer
        .lock()
        .unwrap_or_else(|poison| poison.into_inner())
        .clone()
}
