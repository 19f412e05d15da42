/*
 * lib.rs
 *
 * Small-program plumbing: say what went wrong on stderr in a fixed shape,
 * die with status 2, and run exactly one cleanup callback on the way out -
 * whether the way out is fatal!, an allocation failure, or ^C.
 */

//! # puny
//!
//! Terse diagnostics, abort-on-OOM allocation and one-shot cleanup.
//!
//! ## Quick Start
//!
//! ```rust
//! use puny::report::{Style, render};
//! use puny::os::OsError;
//!
//! let mut line = String::new();
//! render(
//!     &mut line,
//!     Style::Error,
//!     Some("tool"),
//!     None,
//!     format_args!("open {}:", "/tmp/x"),
//!     Some(OsError::from_raw(2)),
//! )
//! .unwrap();
//! assert_eq!(line, "tool: open /tmp/x No such file or directory<2>\n");
//! ```
//!
//! A real program builds one [`Diag`] at startup and passes it around:
//!
//! ```no_run
//! use puny::{Diag, eprintf, warn};
//!
//! let diag = Diag::from_env();
//! diag.set_cleanup(|| {
//!     let _ = std::fs::remove_file("out.tmp");
//! })
//! .unwrap_or_else(|e| diag.die(&e));
//!
//! warn!(diag, "config missing, using defaults");
//! if std::fs::File::open("input").is_err() {
//!     eprintf!(diag, "open input:"); // removes out.tmp, exits 2
//! }
//! diag.clear_cleanup();
//! ```

pub mod allocator;
pub mod args;
pub mod config;
pub mod error;
pub mod guard;
pub mod io;
pub mod os;
pub mod report;
pub mod shell;
pub mod signal;
pub mod sync;

pub use allocator::{
    Block, UninitBlock, allocate, allocate_aligned, allocate_zeroed, duplicate_string, reallocate,
    try_allocate, try_allocate_aligned, try_allocate_zeroed, try_duplicate_string, try_reallocate,
};
pub use config::Config;
pub use error::{PunyError, Result, exit_codes};
pub use guard::{Lifecycle, install_handlers, release_signals};
pub use os::OsError;
pub use report::{Diag, Location, Style};
pub use shell::{run_shell_command, try_run_shell_command};
pub use signal::{Signal, TERMINATING, parse_signal, signal_name};
pub use sync::CleanupSlot;
