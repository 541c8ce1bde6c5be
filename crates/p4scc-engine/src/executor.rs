//! Execution seam between the engine and the client process.

use crate::invocation::{CommandInvocation, CommandRequest};
use crate::session::SessionContext;

/// Runs one client invocation and captures its output.
///
/// The production implementation is
/// [`ProcessRunner`](crate::process::ProcessRunner), which spawns the client
/// binary. Tests implement this trait to script client responses without
/// spawning processes.
///
/// Implementations never fail: spawn errors, timeouts, and client errors are
/// all reported through the returned [`CommandInvocation`].
///
/// # Example
///
/// ```
/// use p4scc_engine::{CommandExecutor, CommandInvocation, CommandRequest, SessionContext};
///
/// struct EchoExecutor;
///
/// impl CommandExecutor for EchoExecutor {
///     fn run(&self, request: &CommandRequest, _session: &SessionContext) -> CommandInvocation {
///         let line = format!("p4 {}", request.args().join(" "));
///         CommandInvocation::captured(line, "", "", false)
///     }
/// }
///
/// let invocation = EchoExecutor.run(&CommandRequest::new(["info", "-s"]), &SessionContext::default());
/// assert_eq!(invocation.command_line(), "p4 info -s");
/// ```
pub trait CommandExecutor {
    /// Runs `request` with the global flags derived from `session`.
    fn run(&self, request: &CommandRequest, session: &SessionContext) -> CommandInvocation;
}

impl<E: CommandExecutor + ?Sized> CommandExecutor for &E {
    fn run(&self, request: &CommandRequest, session: &SessionContext) -> CommandInvocation {
        (**self).run(request, session)
    }
}
