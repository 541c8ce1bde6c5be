//! Unit tests for the engine state machines.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use mockall::predicate::always;
use rstest::rstest;

use super::*;
use crate::cache::STATUS_TTL;
use crate::tests::{MockExecutor, ScriptedExecutor, action_output, client_file_output};

const FILE: &str = "/ws/src/main.c";

fn sessions() -> Arc<SessionStore> {
    Arc::new(SessionStore::new(SessionContext::new(
        "ssl:p4:1666",
        "alice",
        "alice-ws",
    )))
}

fn engine(executor: ScriptedExecutor) -> VcsEngine<ScriptedExecutor> {
    VcsEngine::new(executor, sessions())
}

fn client_spec(root: &str, options: &str) -> String {
    format!(
        "# A Perforce Client Specification.\n\nClient:\talice-ws\n\nAccess:\t2024/01/02 10:00:00\n\nRoot:\t{root}\n\nOptions:\t{options}\n"
    )
}

// ---------------------------------------------------------------------------
// Checkout
// ---------------------------------------------------------------------------

#[rstest]
#[case::outside_root("//ws/x - file(s) is not under client's root '/ws'.")]
#[case::not_in_view("/tmp/x - file(s) not in client view.")]
#[case::unknown_file("/ws/new.c - no such file(s).")]
fn checkout_outside_source_control_stops_after_fstat(#[case] stderr: &str) {
    let engine = engine(ScriptedExecutor::new().fail(stderr));
    let report = engine.check_out_file(Path::new(FILE));

    assert_eq!(report.status(), CheckOutResult::NotInSourceControl);
    assert!(report.status().is_success());
    assert_eq!(
        engine.executor().commands(),
        vec![format!("fstat -T clientFile {FILE}")]
    );
}

#[test]
fn checkout_fstat_failure_never_reaches_edit_command() {
    let mut executor = MockExecutor::new();
    executor
        .expect_run()
        .with(always(), always())
        .times(1)
        .returning(|request, _| {
            assert_eq!(request.args().first().map(String::as_str), Some("fstat"));
            CommandInvocation::captured(
                "p4 fstat",
                "",
                "x - file(s) is not under client's root '/ws'.\n",
                false,
            )
        });
    let engine = VcsEngine::new(executor, sessions());

    let report = engine.check_out_file(Path::new(FILE));
    assert_eq!(report.status(), CheckOutResult::NotInSourceControl);
    assert_eq!(report.error_kind(), Some(ErrorKind::OutsideWorkspaceRoot));
}

#[rstest]
#[case::edit("edit")]
#[case::add("add")]
fn checkout_short_circuits_when_already_open(#[case] action: &str) {
    let engine = engine(
        ScriptedExecutor::new()
            .ok(&client_file_output(FILE))
            .ok(&action_output(action)),
    );
    let report = engine.check_out_file(Path::new(FILE));

    assert_eq!(report.status(), CheckOutResult::AlreadyCheckedOut);
    assert_eq!(engine.executor().calls().len(), 2);
    assert!(
        !engine
            .executor()
            .commands()
            .iter()
            .any(|command| command.starts_with("edit"))
    );
}

#[test]
fn checkout_opens_file_and_concatenates_transcripts() {
    let engine = engine(
        ScriptedExecutor::new()
            .ok(&client_file_output(FILE))
            .ok("")
            .ok("//depot/src/main.c#4 - opened for edit\n"),
    );
    let report = engine.check_out_file(Path::new(FILE));

    assert_eq!(report.status(), CheckOutResult::CheckedOut);
    assert_eq!(report.diagnostic(), "");
    assert_eq!(
        engine.executor().commands(),
        vec![
            format!("fstat -T clientFile {FILE}"),
            format!("fstat -T action {FILE}"),
            format!("edit {FILE}"),
        ]
    );
    let transcript = report.transcript();
    let lookup = transcript.find("fstat -T clientFile").expect("fstat logged");
    let edit = transcript.find("command: p4 edit").expect("edit logged");
    assert!(lookup < edit);
}

#[test]
fn checkout_reports_edit_failure() {
    let engine = engine(
        ScriptedExecutor::new()
            .ok(&client_file_output(FILE))
            .ok("")
            .fail("main.c - can't edit exclusive file already opened\n"),
    );
    let report = engine.check_out_file(Path::new(FILE));

    assert_eq!(report.status(), CheckOutResult::Error);
    assert!(!report.status().is_success());
    assert!(report.diagnostic().contains("exclusive"));
}

#[rstest]
#[case::timeout(ScriptedExecutor::new().timed_out(), ErrorKind::TimedOut)]
#[case::missing_client(ScriptedExecutor::new().spawn_failure(), ErrorKind::ClientUnavailable)]
#[case::login(
    ScriptedExecutor::new().fail("Perforce password (P4PASSWD) invalid or unset."),
    ErrorKind::LoginRequired
)]
fn checkout_fstat_failures_are_errors(#[case] executor: ScriptedExecutor, #[case] kind: ErrorKind) {
    let engine = engine(executor);
    let report = engine.check_out_file(Path::new(FILE));

    assert_eq!(report.status(), CheckOutResult::Error);
    assert_eq!(report.error_kind(), Some(kind));
    assert_eq!(engine.executor().calls().len(), 1);
}

#[test]
fn operation_uses_one_session_snapshot_throughout() {
    let store = sessions();
    let seen = Arc::new(Mutex::new(Vec::new()));
    let mut executor = MockExecutor::new();
    {
        let shared_store = Arc::clone(&store);
        let shared_seen = Arc::clone(&seen);
        executor.expect_run().times(3).returning(move |request, session| {
            shared_seen
                .lock()
                .expect("seen lock")
                .push(session.clone());
            shared_store.replace(SessionContext::new("other:1666", "bob", "bob-ws"));
            let stdout = if request.args().iter().any(|arg| arg == "clientFile") {
                client_file_output(FILE)
            } else {
                String::new()
            };
            CommandInvocation::captured("p4", stdout, "", false)
        });
    }
    let engine = VcsEngine::new(executor, Arc::clone(&store));

    let report = engine.check_out_file(Path::new(FILE));

    assert_eq!(report.status(), CheckOutResult::CheckedOut);
    let sessions_seen = seen.lock().expect("seen lock").clone();
    assert_eq!(sessions_seen.len(), 3);
    assert!(
        sessions_seen
            .iter()
            .all(|session| session.user() == "alice" && session.workspace() == "alice-ws")
    );
    assert_eq!(store.snapshot().user(), "bob");
}

// ---------------------------------------------------------------------------
// Revert
// ---------------------------------------------------------------------------

#[test]
fn revert_without_pending_action_skips_revert_command() {
    let engine = engine(
        ScriptedExecutor::new()
            .ok(&client_file_output(FILE))
            .fail("fstat: field does not exist"),
    );
    let report = engine.revert_file(Path::new(FILE));

    assert_eq!(report.status(), RevertResult::NotCheckedOut);
    assert!(
        !engine
            .executor()
            .commands()
            .iter()
            .any(|command| command.starts_with("revert"))
    );
}

#[test]
fn revert_discards_pending_change() {
    let engine = engine(
        ScriptedExecutor::new()
            .ok(&client_file_output(FILE))
            .ok(&action_output("edit"))
            .ok("//depot/src/main.c#4 - was edit, reverted\n"),
    );
    let report = engine.revert_file(Path::new(FILE));

    assert_eq!(report.status(), RevertResult::Reverted);
    assert_eq!(
        engine.executor().commands().last().map(String::as_str),
        Some(format!("revert {FILE}").as_str())
    );
}

#[rstest]
#[case::not_opened("main.c - file(s) not opened on this client.", RevertResult::NotCheckedOut)]
#[case::locked("main.c - file is locked by bob", RevertResult::Error)]
fn revert_command_failures_are_classified(#[case] stderr: &str, #[case] expected: RevertResult) {
    let engine = engine(
        ScriptedExecutor::new()
            .ok(&client_file_output(FILE))
            .ok("")
            .fail(stderr),
    );
    assert_eq!(engine.revert_file(Path::new(FILE)).status(), expected);
}

#[test]
fn revert_outside_source_control_stops_after_fstat() {
    let engine = engine(ScriptedExecutor::new().fail("/ws/new.c - no such file(s)."));
    let report = engine.revert_file(Path::new(FILE));

    assert_eq!(report.status(), RevertResult::NotInSourceControl);
    assert_eq!(engine.executor().calls().len(), 1);
}

// ---------------------------------------------------------------------------
// Checked-out queries
// ---------------------------------------------------------------------------

#[test]
fn repeated_status_queries_share_one_round_trip() {
    let engine = engine(ScriptedExecutor::new().ok(&action_output("edit")));

    let first = engine.is_checked_out(Path::new(FILE));
    let second = engine.is_checked_out(Path::new(FILE));

    assert!(first.is_checked_out());
    assert!(second.is_checked_out());
    assert!(first.transcript().is_some());
    assert_eq!(second.transcript(), None);
    assert_eq!(engine.executor().calls().len(), 1);
}

/// Executor whose every round trip takes longer than the status TTL.
struct SlowExecutor {
    delay: Duration,
    calls: AtomicUsize,
}

impl CommandExecutor for SlowExecutor {
    fn run(&self, _request: &CommandRequest, _session: &SessionContext) -> CommandInvocation {
        self.calls.fetch_add(1, Ordering::SeqCst);
        thread::sleep(self.delay);
        CommandInvocation::captured("p4 fstat -T action", action_output("edit"), "", false)
    }
}

#[test]
fn slow_status_round_trip_still_serves_the_next_query() {
    let engine = VcsEngine::new(
        SlowExecutor {
            delay: STATUS_TTL + Duration::from_millis(100),
            calls: AtomicUsize::new(0),
        },
        sessions(),
    );

    let first = engine.is_checked_out(Path::new(FILE));
    let second = engine.is_checked_out(Path::new(FILE));

    assert!(first.is_checked_out());
    assert!(second.is_checked_out());
    assert_eq!(second.transcript(), None);
    assert_eq!(engine.executor().calls.load(Ordering::SeqCst), 1);
}

#[rstest]
#[case::edit(action_output("edit"), "", true)]
#[case::add(action_output("add"), "", true)]
#[case::integrate(action_output("integrate"), "", false)]
#[case::unopened(String::new(), "", false)]
#[case::error(String::new(), "no such file(s).", false)]
fn status_follows_action_field(
    #[case] stdout: String,
    #[case] stderr: &str,
    #[case] expected: bool,
) {
    let engine = engine(ScriptedExecutor::new().reply(&stdout, stderr));
    assert_eq!(engine.is_checked_out(Path::new(FILE)).is_checked_out(), expected);
}

#[test]
fn checkout_invalidates_cached_status() {
    let engine = engine(
        ScriptedExecutor::new()
            .ok("")
            .ok(&client_file_output(FILE))
            .ok("")
            .ok("opened for edit\n")
            .ok(&action_output("edit")),
    );
    assert!(!engine.is_checked_out(Path::new(FILE)).is_checked_out());
    engine.check_out_file(Path::new(FILE));
    assert!(engine.is_checked_out(Path::new(FILE)).is_checked_out());
}

#[test]
fn writable_fast_path_requires_confirmed_no_all_write() {
    let root = tempfile::tempdir().expect("workspace root");
    let file = root.path().join("writable.c");
    std::fs::write(&file, "int main;\n").expect("write file");
    let root_text = root.path().to_string_lossy().into_owned();

    let engine = engine(
        ScriptedExecutor::new()
            .ok("")
            .ok("Server address: ssl:p4:1666\n")
            .ok("alice <alice@example.com> (Alice) accessed 2024/01/02\n")
            .ok(&client_spec(&root_text, "noallwrite noclobber nocompress")),
    );
    engine.set_writable_fast_path(true);

    let before = engine.is_checked_out(&file);
    assert!(!before.is_checked_out());
    assert_eq!(engine.executor().calls().len(), 1);

    assert!(engine.server_connect().no_all_write());
    let calls_after_connect = engine.executor().calls().len();

    let after = engine.is_checked_out(&file);
    assert!(after.is_checked_out());
    assert_eq!(after.transcript(), None);
    assert_eq!(engine.executor().calls().len(), calls_after_connect);
}

// ---------------------------------------------------------------------------
// Connection validation
// ---------------------------------------------------------------------------

#[test]
fn connect_checks_with_narrowed_sessions() {
    let root = tempfile::tempdir().expect("workspace root");
    let root_text = root.path().to_string_lossy().into_owned();
    let engine = engine(
        ScriptedExecutor::new()
            .ok("Server address: ssl:p4:1666\n")
            .ok("alice <alice@example.com> (Alice)\n")
            .ok(&client_spec(&root_text, "allwrite noclobber")),
    );

    let validation = engine.server_connect();

    assert!(validation.is_ok(), "{}", validation.diagnostic());
    assert!(!validation.no_all_write());
    let calls = engine.executor().calls();
    let commands: Vec<String> = calls.iter().map(|call| call.command()).collect();
    assert_eq!(commands, vec!["info -s", "users alice", "client -o alice-ws"]);
    let sessions: Vec<&SessionContext> = calls.iter().map(|call| &call.session).collect();
    assert_eq!(sessions[0], &SessionContext::new("ssl:p4:1666", "", ""));
    assert_eq!(sessions[1], &SessionContext::new("ssl:p4:1666", "alice", ""));
    assert_eq!(sessions[2], &SessionContext::new("ssl:p4:1666", "alice", ""));
    assert!(validation.transcript().contains("command: p4 client -o alice-ws"));
}

#[test]
fn connect_stops_at_unreachable_server() {
    let engine = engine(
        ScriptedExecutor::new().fail("Connect to server failed; check $P4PORT.\n"),
    );
    let validation = engine.server_connect();

    assert!(!validation.is_ok());
    assert!(validation.diagnostic().contains("Connect to server failed"));
    assert_eq!(engine.executor().calls().len(), 1);
}

#[test]
fn connect_rejects_unknown_user() {
    let engine = engine(
        ScriptedExecutor::new()
            .ok("Server address: x\n")
            .fail("alice - no such user(s).\n"),
    );
    let validation = engine.server_connect();
    assert!(!validation.is_ok());
    assert_eq!(engine.executor().calls().len(), 2);
}

#[test]
fn connect_rejects_spec_without_access() {
    let engine = engine(
        ScriptedExecutor::new()
            .ok("Server address: x\n")
            .ok("alice <a@x>\n")
            .ok("Client:\talice-ws\nRoot:\t/ws\n"),
    );
    let validation = engine.server_connect();
    assert_eq!(
        validation.diagnostic(),
        "workspace 'alice-ws' is not valid on server."
    );
}

#[test]
fn connect_rejects_missing_local_root() {
    let engine = engine(
        ScriptedExecutor::new()
            .ok("Server address: x\n")
            .ok("alice <a@x>\n")
            .ok(&client_spec("/nonexistent/p4scc-root", "noallwrite")),
    );
    let validation = engine.server_connect();

    assert!(!validation.is_ok());
    assert!(!validation.no_all_write());
    assert!(!engine.no_all_write());
    assert_eq!(
        validation.diagnostic(),
        "workspace Root: folder '/nonexistent/p4scc-root' does not exist on this machine."
    );
}

// ---------------------------------------------------------------------------
// Bulk reconciliation
// ---------------------------------------------------------------------------

#[test]
fn oversized_listing_aborts_before_resolution() {
    let listing: String = (0..125)
        .map(|index| format!("edit //depot/file{index}.c\n\n"))
        .collect();
    assert_eq!(listing.lines().count(), 250);
    let engine = engine(ScriptedExecutor::new().ok(&listing));

    let result = engine.checked_out_files();

    assert_eq!(result.outcome(), ListingOutcome::TooManyFiles { reported: 125 });
    assert!(result.files().is_empty());
    assert_eq!(engine.executor().calls().len(), 1);
}

#[test]
fn listing_resolves_edited_files_and_skips_failures() {
    let listing = "edit //depot/a.c\n\nadd //depot/new.c\n\nedit //depot/gone.c\n\nedit //depot/b.c\n\n";
    let engine = engine(
        ScriptedExecutor::new()
            .ok(listing)
            .ok(&client_file_output("/ws/a.c"))
            .fail("//depot/gone.c - no such file(s).")
            .ok(&client_file_output("/ws/b.c")),
    );

    let result = engine.checked_out_files();

    assert!(result.is_complete());
    let files: Vec<&Path> = result.files().iter().map(PathBuf::as_path).collect();
    assert_eq!(files, vec![Path::new("/ws/a.c"), Path::new("/ws/b.c")]);
    let commands = engine.executor().commands();
    assert_eq!(commands[0], "-ztag -F %action% %depotFile% opened");
    assert_eq!(
        commands[1..],
        [
            "fstat -T clientFile //depot/a.c",
            "fstat -T clientFile //depot/gone.c",
            "fstat -T clientFile //depot/b.c",
        ]
    );
}

#[test]
fn empty_workspace_listing_is_complete() {
    let engine = engine(ScriptedExecutor::new().fail("File(s) not opened on this client."));
    let result = engine.checked_out_files();
    assert!(result.is_complete());
    assert!(result.files().is_empty());
}

#[test]
fn failed_listing_reports_diagnostic() {
    let engine = engine(ScriptedExecutor::new().fail("Your session has expired, please login again."));
    let result = engine.checked_out_files();
    assert_eq!(result.outcome(), ListingOutcome::Failed);
    assert!(result.diagnostic().contains("session has expired"));
}
