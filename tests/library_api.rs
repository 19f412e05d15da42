/*
 * library_api.rs
 *
 * integration-style tests exercising puny as a library.
 *
 * goal: ensure the public API is usable without shelling out to the CLI.
 * nothing here may hit a terminating path - that would end the test binary.
 */

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use puny::report::render;
use puny::{
    CleanupSlot, Config, Diag, Lifecycle, OsError, PunyError, Style, TERMINATING,
    try_allocate_aligned, try_allocate_zeroed, try_duplicate_string, try_reallocate,
    try_run_shell_command,
};

fn counting_cleanup() -> (Arc<AtomicUsize>, impl FnOnce() + Send + 'static) {
    let hits = Arc::new(AtomicUsize::new(0));
    let h = Arc::clone(&hits);
    (hits, move || {
        h.fetch_add(1, Ordering::SeqCst);
    })
}

/* =========================================================================
 * LIFECYCLE GUARD
 * ========================================================================= */

#[test]
fn library_cleanup_runs_exactly_once() {
    static SLOT: CleanupSlot = CleanupSlot::new();
    let guard = Lifecycle::detached(&SLOT);
    let (hits, cleanup) = counting_cleanup();

    guard.set_cleanup(cleanup).expect("detached set_cleanup can't fail");
    assert!(guard.run_cleanup(), "first termination path runs it");
    assert!(!guard.run_cleanup(), "second sees nothing registered");
    assert_eq!(hits.load(Ordering::SeqCst), 1);
}

#[test]
fn library_clear_cleanup_disarms() {
    static SLOT: CleanupSlot = CleanupSlot::new();
    let guard = Lifecycle::detached(&SLOT);
    let (hits, cleanup) = counting_cleanup();

    guard.set_cleanup(cleanup).unwrap();
    guard.clear_cleanup();
    assert!(!guard.run_cleanup());
    assert_eq!(hits.load(Ordering::SeqCst), 0);
}

#[test]
fn library_diag_shares_lifecycle() {
    static SLOT: CleanupSlot = CleanupSlot::new();
    let diag = Diag::with_lifecycle(
        Config::default().with_progname("tool"),
        Lifecycle::detached(&SLOT),
    );
    let (hits, cleanup) = counting_cleanup();

    diag.set_cleanup(cleanup).unwrap();
    assert!(SLOT.is_set());
    assert!(diag.lifecycle().run_cleanup());
    assert!(!SLOT.is_set());
    assert_eq!(hits.load(Ordering::SeqCst), 1);
}

#[test]
fn library_terminating_set_is_complete() {
    let names: Vec<_> = TERMINATING.iter().map(|s| puny::signal_name(*s)).collect();
    assert_eq!(
        names,
        [
            "SIGHUP", "SIGINT", "SIGQUIT", "SIGILL", "SIGTRAP", "SIGABRT", "SIGBUS", "SIGFPE",
            "SIGKILL", "SIGSEGV", "SIGPIPE", "SIGSTOP", "SIGTSTP"
        ]
    );
}

#[test]
fn library_install_and_release_handlers() {
    puny::install_handlers().expect("catchable signals accept handlers");
    assert!(puny::guard::handlers_installed());
    puny::install_handlers().expect("second install is a no-op");
    puny::release_signals().expect("default dispositions restore");
    assert!(!puny::guard::handlers_installed());
}

/* =========================================================================
 * REPORTER
 * ========================================================================= */

#[test]
fn library_render_scenario() {
    let mut out = String::new();
    render(
        &mut out,
        Style::Error,
        Some("tool"),
        None,
        format_args!("open {}:", "/tmp/x"),
        Some(OsError::from_raw(libc::ENOENT)),
    )
    .unwrap();
    assert_eq!(out, "tool: open /tmp/x No such file or directory<2>\n");
}

#[test]
fn library_here_names_the_caller() {
    let loc = puny::here!();
    assert_eq!(loc.function, "library_here_names_the_caller");
    assert_eq!(loc.file, "tests/library_api.rs");
}

/* =========================================================================
 * ALLOCATION
 * ========================================================================= */

#[test]
fn library_allocate_zeroed_exact_and_clean() {
    for n in [1usize, 7, 4096, 1 << 20] {
        let block = try_allocate_zeroed(n).unwrap();
        assert_eq!(block.len(), n);
        assert!(block.iter().all(|&b| b == 0));
    }
}

#[test]
fn library_reallocate_grows() {
    let mut block = try_allocate_zeroed(4).unwrap();
    block.copy_from_slice(b"abcd");
    try_reallocate(&mut block, 6).unwrap();
    assert_eq!(&*block, b"abcd\0\0");
}

#[test]
fn library_aligned_pages() {
    let block = try_allocate_aligned(2, 4096).unwrap().zeroed();
    assert_eq!(block.as_ptr() as usize % 4096, 0);
    assert_eq!(block.len(), 8192);
}

#[test]
fn library_duplicate_string_is_independent() {
    let source = "hello";
    let mut copy = try_duplicate_string(source).unwrap();
    assert_eq!(copy, source);
    copy.replace_range(0..1, "j");
    assert_eq!(copy, "jello");
    assert_eq!(source, "hello");
}

/* =========================================================================
 * SHELL
 * ========================================================================= */

#[test]
fn library_shell_exit_code_in_error() {
    match try_run_shell_command("exit 42") {
        Err(PunyError::Exit { code, .. }) => assert_eq!(code, 42),
        other => panic!("expected Exit, got {other:?}"),
    }
}

#[test]
fn library_shell_failure_shapes_differ() {
    let launch = PunyError::Launch {
        command: "cc".into(),
        os: OsError::from_raw(libc::EAGAIN),
    };
    let exit = PunyError::Exit {
        command: "cc".into(),
        code: 1,
    };
    assert!(!launch.to_string().contains("exit="));
    assert!(exit.to_string().ends_with("exit=1"));
}
