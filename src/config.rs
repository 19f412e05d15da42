/*
 * config.rs
 *
 * What a Diag needs to know up front: who we are and whether fatal errors
 * print a backtrace. Built once at startup, frozen inside Diag afterwards.
 *
 * PUNY_STACKTRACE=0 turns backtraces off. Tests set it so stderr stays
 * predictable.
 */

use std::ffi::OsStr;
use std::path::Path;

/// Environment variable controlling stack traces on fatal errors.
pub const STACKTRACE_ENV: &str = "PUNY_STACKTRACE";

/// Startup settings for a [`crate::Diag`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Prefix for every message. None prints no name segment at all.
    pub progname: Option<String>,
    /// Print a stack trace before terminating on fatal!.
    pub stacktrace: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            progname: None,
            stacktrace: true,
        }
    }
}

impl Config {
    /// Program name from argv[0], stacktrace flag from `PUNY_STACKTRACE`.
    #[must_use]
    pub fn from_env() -> Self {
        let progname = std::env::args_os()
            .next()
            .and_then(|arg0| progname_from_arg0(&arg0));
        let stacktrace = std::env::var(STACKTRACE_ENV)
            .map(|v| parse_flag(&v))
            .unwrap_or(true);
        Self {
            progname,
            stacktrace,
        }
    }

    #[must_use]
    pub fn with_progname(mut self, name: impl Into<String>) -> Self {
        self.progname = Some(name.into());
        self
    }

    #[must_use]
    pub fn with_stacktrace(mut self, on: bool) -> Self {
        self.stacktrace = on;
        self
    }
}

/// "/usr/local/bin/tool" -> "tool". None for an empty argv[0].
#[must_use]
pub fn progname_from_arg0(arg0: &OsStr) -> Option<String> {
    let base = Path::new(arg0).file_name().unwrap_or(arg0);
    let name = base.to_string_lossy();
    if name.is_empty() {
        None
    } else {
        Some(name.into_owned())
    }
}

/* "0", "false", "no", "off" disable; anything else (including "") enables */
fn parse_flag(value: &str) -> bool {
    let v = value.trim();
    !(v == "0"
        || v.eq_ignore_ascii_case("false")
        || v.eq_ignore_ascii_case("no")
        || v.eq_ignore_ascii_case("off"))
}
