/*
 * Integration tests for the puny binary.
 *
 * stderr shapes and the exit status are the contract here: other tools
 * scrape these lines, and shell scripts branch on status 2. Each test pins
 * one shape or one way out of the process.
 */

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;

#[allow(deprecated)]
fn puny() -> Command {
    let mut cmd = Command::cargo_bin("puny").unwrap();
    /* backtraces make stderr unpredictable; tests that want one turn it back on */
    cmd.env("PUNY_STACKTRACE", "0");
    cmd
}

fn scratch_file(dir: &tempfile::TempDir, name: &str) -> std::path::PathBuf {
    let path = dir.path().join(name);
    fs::write(&path, b"partial output").unwrap();
    path
}

/* =========================================================================
 * EPRINTF - "prog: msg[ desc<errno>]", cleanup, exit 2
 * ========================================================================= */

#[test]
fn test_open_missing_file_reports_errno() {
    /*
     * The canonical trailing-colon case. The colon is the marker and is
     * replaced by the OS description and code.
     */
    puny()
        .args(["open", "/nonexistent/puny/x"])
        .assert()
        .code(2)
        .stdout("")
        .stderr("puny: open /nonexistent/puny/x No such file or directory<2>\n");
}

#[test]
fn test_open_existing_file_copies_to_stdout() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("hello.txt");
    fs::write(&path, "hello\nworld\n").unwrap();

    puny()
        .args(["open", path.to_str().unwrap()])
        .assert()
        .success()
        .stdout("hello\nworld\n")
        .stderr("");
}

#[test]
fn test_report_eprintf_without_colon_has_no_errno() {
    puny()
        .args(["report", "eprintf", "giving up"])
        .assert()
        .code(2)
        .stderr("puny: giving up\n");
}

/* =========================================================================
 * NON-FATAL SHAPES - display, warn, weprintf all return and exit 0
 * ========================================================================= */

#[test]
fn test_report_display_shape() {
    puny()
        .args(["report", "display", "loaded 3 entries"])
        .assert()
        .success()
        .stderr(predicate::str::is_match(r"^puny src/main\.rs:report<\d+> loaded 3 entries\n$").unwrap());
}

#[test]
fn test_report_warn_shape() {
    puny()
        .args(["report", "warn", "disk low"])
        .assert()
        .success()
        .stderr(predicate::str::is_match(r"^Warn puny src/main\.rs:report<\d+> disk low\n$").unwrap());
}

#[test]
fn test_report_weprintf_shape() {
    puny()
        .args(["report", "weprintf", "careful"])
        .assert()
        .success()
        .stderr("warning: puny: careful\n");
}

#[test]
fn test_report_weprintf_colon_appends_errno() {
    /* errno content is whatever the process had; the shape is what matters */
    puny()
        .args(["report", "weprintf", "careful:"])
        .assert()
        .success()
        .stderr(predicate::str::is_match(r"^warning: puny: careful .*<\d+>\n$").unwrap());
}

/* =========================================================================
 * FATAL - "Fatal prog file:func<line> msg", optional backtrace, exit 2
 * ========================================================================= */

#[test]
fn test_report_fatal_shape() {
    puny()
        .args(["report", "fatal", "corrupt header"])
        .assert()
        .code(2)
        .stderr(
            predicate::str::is_match(r"^Fatal puny src/main\.rs:report<\d+> corrupt header\n$")
                .unwrap(),
        );
}

#[test]
fn test_fatal_prints_backtrace_when_enabled() {
    puny()
        .env("PUNY_STACKTRACE", "1")
        .args(["report", "fatal", "boom"])
        .assert()
        .code(2)
        .stderr(predicate::str::starts_with("Fatal puny src/main.rs:report<"))
        .stderr(predicate::str::contains("stack backtrace:"));
}

#[test]
fn test_fatal_backtrace_on_by_default() {
    puny()
        .env_remove("PUNY_STACKTRACE")
        .args(["report", "fatal", "boom"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("stack backtrace:"));
}

/* =========================================================================
 * USAGE - "Usage: prog msg", exit 2, no cleanup
 * ========================================================================= */

#[test]
fn test_no_arguments_prints_usage() {
    puny()
        .assert()
        .code(2)
        .stderr(predicate::str::starts_with("Usage: puny open [-r FILE] PATH | run "));
}

#[test]
fn test_unknown_subcommand_warns_then_usage() {
    puny()
        .arg("frobnicate")
        .assert()
        .code(2)
        .stderr(predicate::str::starts_with(
            "warning: puny: unknown command: frobnicate\nUsage: puny ",
        ));
}

#[test]
fn test_report_usage_never_appends_errno() {
    puny()
        .args(["report", "usage", "[-v] FILE:"])
        .assert()
        .code(2)
        .stderr("Usage: puny [-v] FILE:\n");
}

/* =========================================================================
 * CLEANUP ON THE OTHER WAYS OUT - eprintf and OOM run it, usage doesn't
 * ========================================================================= */

#[test]
fn test_open_failure_runs_cleanup() {
    let dir = tempfile::tempdir().unwrap();
    let out = scratch_file(&dir, "out.o");

    puny()
        .args(["open", "-r", out.to_str().unwrap(), "/nonexistent/puny/x"])
        .assert()
        .code(2)
        .stderr("puny: open /nonexistent/puny/x No such file or directory<2>\n");

    assert!(!out.exists(), "eprintf should have run the cleanup");
}

#[test]
fn test_open_success_disarms_cleanup() {
    let dir = tempfile::tempdir().unwrap();
    let out = scratch_file(&dir, "out.o");
    let input = dir.path().join("in.txt");
    fs::write(&input, "data\n").unwrap();

    puny()
        .args(["open", "-r", out.to_str().unwrap(), input.to_str().unwrap()])
        .assert()
        .success()
        .stdout("data\n");

    assert!(out.exists());
}

#[test]
fn test_alloc_failure_runs_cleanup() {
    let dir = tempfile::tempdir().unwrap();
    let out = scratch_file(&dir, "out.o");
    let huge = (usize::MAX / 2 + 1).to_string();

    puny()
        .args(["alloc", "-r", out.to_str().unwrap(), &huge])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("allocation of"));

    assert!(!out.exists(), "allocation failure should have run the cleanup");
}

#[test]
fn test_report_eprintf_runs_cleanup() {
    let dir = tempfile::tempdir().unwrap();
    let out = scratch_file(&dir, "out.o");

    puny()
        .args(["report", "-r", out.to_str().unwrap(), "eprintf", "giving up"])
        .assert()
        .code(2)
        .stderr("puny: giving up\n");

    assert!(!out.exists());
}

#[test]
fn test_usage_keeps_cleanup_armed_file() {
    let dir = tempfile::tempdir().unwrap();
    let out = scratch_file(&dir, "out.o");

    puny()
        .args(["report", "-r", out.to_str().unwrap(), "usage", "FILE"])
        .assert()
        .code(2)
        .stderr("Usage: puny FILE\n");

    assert!(out.exists(), "usage must not run the cleanup");
    assert_eq!(fs::read(&out).unwrap(), b"partial output");
}

#[test]
fn test_nonfatal_report_keeps_file() {
    let dir = tempfile::tempdir().unwrap();
    let out = scratch_file(&dir, "out.o");

    puny()
        .args(["report", "-r", out.to_str().unwrap(), "weprintf", "careful"])
        .assert()
        .success();

    assert!(out.exists());
}

/* =========================================================================
 * SHELL COMMANDS - launch failure vs non-zero exit, cleanup on failure
 * ========================================================================= */

#[test]
fn test_run_success() {
    puny()
        .args(["run", "echo from-shell"])
        .assert()
        .success()
        .stdout("from-shell\n")
        .stderr("");
}

#[test]
fn test_run_nonzero_exit_is_fatal_with_code() {
    puny()
        .args(["run", "exit 3"])
        .assert()
        .code(2)
        .stderr(
            predicate::str::is_match(
                r"^Fatal puny src/shell\.rs:run_shell_command<\d+> system: exit 3 exit=3\n$",
            )
            .unwrap(),
        );
}

#[test]
fn test_run_killed_command_reports_signal() {
    puny()
        .args(["run", "kill -9 $$"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("system: kill -9 $$ signal=9"));
}

#[test]
fn test_run_failure_runs_cleanup() {
    let dir = tempfile::tempdir().unwrap();
    let out = scratch_file(&dir, "out.o");

    puny()
        .args(["run", "-r", out.to_str().unwrap(), "false"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("system: false exit=1"));

    assert!(!out.exists(), "cleanup should have removed the output");
}

#[test]
fn test_run_success_disarms_cleanup() {
    let dir = tempfile::tempdir().unwrap();
    let out = scratch_file(&dir, "out.o");

    puny()
        .args(["run", "-r", out.to_str().unwrap(), "true"])
        .assert()
        .success();

    assert!(out.exists(), "successful run must keep the output");
}

#[test]
fn test_run_cleanup_on_signal_from_child() {
    /*
     * The child hangs us up mid-command. The handler runs cleanup, then
     * exits 2 with nothing on stderr.
     */
    let dir = tempfile::tempdir().unwrap();
    let out = scratch_file(&dir, "out.o");

    puny()
        .args([
            "run",
            "-r",
            out.to_str().unwrap(),
            "kill -HUP $PPID; exec sleep 2 >/dev/null 2>&1",
        ])
        .assert()
        .code(2)
        .stderr("");

    assert!(!out.exists());
}

/* =========================================================================
 * SIGNALS - cleanup exactly once, then exit 2, no message
 * ========================================================================= */

#[test]
fn test_raise_with_cleanup_exits_2() {
    for sig in ["HUP", "INT", "QUIT", "PIPE", "TSTP", "SEGV", "ABRT"] {
        let dir = tempfile::tempdir().unwrap();
        let out = scratch_file(&dir, "guarded");

        puny()
            .args(["raise", "-r", out.to_str().unwrap(), sig])
            .assert()
            .code(2)
            .stdout("")
            .stderr("");

        assert!(!out.exists(), "cleanup did not run for SIG{sig}");
    }
}

#[test]
fn test_raise_without_cleanup_uses_default_disposition() {
    /* handlers only go in once a cleanup is registered */
    puny().args(["raise", "HUP"]).assert().interrupted();
}

#[test]
fn test_raise_rejects_signals_outside_set() {
    puny()
        .args(["raise", "TERM"])
        .assert()
        .code(2)
        .stderr(predicate::str::starts_with(
            "warning: puny: invalid signal: unknown signal: TERM\nUsage: puny ",
        ));
}

/* =========================================================================
 * ALLOCATION - success paths and the OOM message
 * ========================================================================= */

#[test]
fn test_alloc_zeroed() {
    puny()
        .args(["alloc", "-z", "65536"])
        .assert()
        .success()
        .stdout("65536 zeroed bytes\n");
}

#[test]
fn test_alloc_zero_bytes() {
    puny()
        .args(["alloc", "0"])
        .assert()
        .success()
        .stdout("0 bytes\n");
}

#[test]
fn test_alloc_failure_is_fatal() {
    let huge = (usize::MAX / 2 + 1).to_string();
    puny()
        .args(["alloc", &huge])
        .assert()
        .code(2)
        .stdout("")
        .stderr(predicate::str::contains(format!(
            "puny: allocation of {huge} bytes failed Cannot allocate memory<12>\n"
        )));
}

#[test]
fn test_dup_prints_copy() {
    puny()
        .args(["dup", "hello"])
        .assert()
        .success()
        .stdout("hello\n");
}
