/*
 * signal.rs
 *
 * The terminating signal set: the ones that end the process and therefore
 * have to run the cleanup callback first.
 *
 * KILL and STOP are in the set because callers name them, but the kernel
 * never lets anyone catch them. Installers skip them.
 *
 * Parse "HUP", "SIGHUP", "hup", "1". Reject "SIGFOO", "999" and anything
 * outside the set.
 */

use crate::error::{PunyError, Result};

/* POSIX signals as i32 values from libc. Copy/PartialEq for easy comparison. */
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(i32)]
pub enum Signal {
    SIGHUP = libc::SIGHUP,
    SIGINT = libc::SIGINT,
    SIGQUIT = libc::SIGQUIT,
    SIGILL = libc::SIGILL,
    SIGTRAP = libc::SIGTRAP,
    SIGABRT = libc::SIGABRT,
    SIGBUS = libc::SIGBUS,
    SIGFPE = libc::SIGFPE,
    SIGKILL = libc::SIGKILL,
    SIGSEGV = libc::SIGSEGV,
    SIGPIPE = libc::SIGPIPE,
    SIGSTOP = libc::SIGSTOP,
    SIGTSTP = libc::SIGTSTP,
}

/// Every signal that triggers cleanup, in the order handlers are installed.
pub const TERMINATING: [Signal; 13] = [
    Signal::SIGHUP,
    Signal::SIGINT,
    Signal::SIGQUIT,
    Signal::SIGILL,
    Signal::SIGTRAP,
    Signal::SIGABRT,
    Signal::SIGBUS,
    Signal::SIGFPE,
    Signal::SIGKILL,
    Signal::SIGSEGV,
    Signal::SIGPIPE,
    Signal::SIGSTOP,
    Signal::SIGTSTP,
];

impl Signal {
    /* convert from raw signal number */
    pub fn try_from_raw(num: i32) -> Option<Self> {
        TERMINATING.iter().copied().find(|s| s.as_raw() == num)
    }

    /* get raw signal number */
    #[inline]
    pub const fn as_raw(self) -> i32 {
        self as i32
    }

    /// False for KILL and STOP, which no handler can intercept.
    #[must_use]
    #[inline]
    pub const fn is_catchable(self) -> bool {
        !matches!(self, Self::SIGKILL | Self::SIGSTOP)
    }
}

/// Parse "HUP", "SIGSEGV", "2", "tstp" - all the ways to name a signal.
///
/// # Examples
///
/// ```
/// use puny::signal::{parse_signal, Signal};
///
/// assert_eq!(parse_signal("HUP").unwrap(), Signal::SIGHUP);
/// assert_eq!(parse_signal("SIGINT").unwrap(), Signal::SIGINT);
/// assert_eq!(parse_signal("segv").unwrap(), Signal::SIGSEGV);
/// assert_eq!(parse_signal("9").unwrap(), Signal::SIGKILL);
/// assert!(parse_signal("TERM").is_err());
/// ```
pub fn parse_signal(input: &str) -> Result<Signal> {
    let input = input.trim();

    /* try as number first */
    if let Ok(num) = input.parse::<i32>() {
        return Signal::try_from_raw(num)
            .ok_or_else(|| PunyError::InvalidSignal(format!("invalid signal number: {num}")));
    }

    /* strip optional SIG prefix without allocation */
    let name = input
        .strip_prefix("SIG")
        .or_else(|| input.strip_prefix("sig"))
        .or_else(|| input.strip_prefix("Sig"))
        .unwrap_or(input);

    /* ordered by likelihood: HUP and INT are what a terminal sends */
    let found = if name.eq_ignore_ascii_case("HUP") {
        Signal::SIGHUP
    } else if name.eq_ignore_ascii_case("INT") {
        Signal::SIGINT
    } else if name.eq_ignore_ascii_case("QUIT") {
        Signal::SIGQUIT
    } else if name.eq_ignore_ascii_case("PIPE") {
        Signal::SIGPIPE
    } else if name.eq_ignore_ascii_case("TSTP") {
        Signal::SIGTSTP
    } else if name.eq_ignore_ascii_case("SEGV") {
        Signal::SIGSEGV
    } else if name.eq_ignore_ascii_case("ABRT") || name.eq_ignore_ascii_case("IOT") {
        Signal::SIGABRT
    } else if name.eq_ignore_ascii_case("BUS") {
        Signal::SIGBUS
    } else if name.eq_ignore_ascii_case("FPE") {
        Signal::SIGFPE
    } else if name.eq_ignore_ascii_case("ILL") {
        Signal::SIGILL
    } else if name.eq_ignore_ascii_case("TRAP") {
        Signal::SIGTRAP
    } else if name.eq_ignore_ascii_case("KILL") {
        Signal::SIGKILL
    } else if name.eq_ignore_ascii_case("STOP") {
        Signal::SIGSTOP
    } else {
        return Err(PunyError::InvalidSignal(format!("unknown signal: {input}")));
    };
    Ok(found)
}

/* human-readable name for messages */
#[must_use]
pub const fn signal_name(signal: Signal) -> &'static str {
    match signal {
        Signal::SIGHUP => "SIGHUP",
        Signal::SIGINT => "SIGINT",
        Signal::SIGQUIT => "SIGQUIT",
        Signal::SIGILL => "SIGILL",
        Signal::SIGTRAP => "SIGTRAP",
        Signal::SIGABRT => "SIGABRT",
        Signal::SIGBUS => "SIGBUS",
        Signal::SIGFPE => "SIGFPE",
        Signal::SIGKILL => "SIGKILL",
        Signal::SIGSEGV => "SIGSEGV",
        Signal::SIGPIPE => "SIGPIPE",
        Signal::SIGSTOP => "SIGSTOP",
        Signal::SIGTSTP => "SIGTSTP",
    }
}
