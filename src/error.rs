/*
 * error.rs
 *
 * One exit status for every failure: 2. It's the conventional value for
 * "execution failed" and tools scraping our output depend on it.
 *
 * Every fallible operation has a try_* form returning these. The plain form
 * reports the error through Diag and terminates. Callers pick.
 */

use core::fmt;

use crate::os::OsError;

/// exit codes. don't change these.
pub mod exit_codes {
    /// Any fatal path: fatal!, eprintf!, usage!, allocation failure, caught signal
    pub const FAILURE: u8 = 2;
}

/* everything that can go wrong */
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PunyError {
    Alloc { size: usize, os: OsError },
    Realloc { size: usize, os: OsError },
    AlignedAlloc { count: usize, size: usize, code: i32 }, // posix_memalign return code
    SizeOverflow { count: usize, size: usize },
    InvalidAlignment(usize),
    DupString { len: usize, os: OsError },
    InvalidCommand(String), // interior NUL, can't reach the shell
    Launch { command: String, os: OsError },
    Exit { command: String, code: i32 },
    Signaled { command: String, signal: i32 },
    InvalidSignal(String),
    SignalError { signal: i32, os: OsError },
    Usage(String), // bad command line, reason may be empty
}

impl fmt::Display for PunyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Alloc { size, .. } => write!(f, "allocation of {size} bytes failed"),
            Self::Realloc { size, .. } => write!(f, "reallocation of {size} bytes failed"),
            Self::AlignedAlloc { count, size, code } => {
                write!(f, "aligned allocation of {count} x {size} bytes failed {code}")
            }
            Self::SizeOverflow { count, size } => {
                write!(f, "allocation of {count} x {size} bytes overflows")
            }
            Self::InvalidAlignment(align) => write!(f, "invalid alignment: {align}"),
            Self::DupString { len, .. } => write!(f, "duplicate of {len} bytes failed"),
            Self::InvalidCommand(cmd) => write!(f, "system: invalid command: {cmd:?}"),
            Self::Launch { command, .. } => write!(f, "system: {command}"),
            Self::Exit { command, code } => write!(f, "system: {command} exit={code}"),
            Self::Signaled { command, signal } => write!(f, "system: {command} signal={signal}"),
            Self::InvalidSignal(s) => write!(f, "invalid signal: {s}"),
            Self::SignalError { signal, .. } => write!(f, "sigaction for signal {signal} failed"),
            Self::Usage(s) => f.write_str(s),
        }
    }
}

impl PunyError {
    /// The errno a variant carries, if any. Reporting appends it using the
    /// trailing-colon convention.
    #[must_use]
    pub fn os_error(&self) -> Option<OsError> {
        match self {
            Self::Alloc { os, .. }
            | Self::Realloc { os, .. }
            | Self::DupString { os, .. }
            | Self::Launch { os, .. }
            | Self::SignalError { os, .. } => Some(*os),
            Self::AlignedAlloc { .. }
            | Self::SizeOverflow { .. }
            | Self::InvalidAlignment(_)
            | Self::InvalidCommand(_)
            | Self::Exit { .. }
            | Self::Signaled { .. }
            | Self::InvalidSignal(_)
            | Self::Usage(_) => None,
        }
    }
}

impl std::error::Error for PunyError {}

pub type Result<T> = core::result::Result<T, PunyError>;
