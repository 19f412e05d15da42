/*
 * shell.rs
 *
 * Run a command line through /bin/sh and die if it doesn't succeed.
 *
 * system() returns -1 when it couldn't even start the shell, otherwise a
 * wait status. Those are different failures and get different messages:
 *
 *   system: make                                   + errno (launch failed)
 *   system: make exit=2                            (ran, exited non-zero)
 *   system: make signal=9                          (ran, killed)
 *
 * 127 from the shell usually means "command not found" but is still a
 * normal exit as far as we're concerned.
 */

use std::ffi::CString;

use crate::error::{PunyError, Result};
use crate::here;
use crate::os::OsError;
use crate::report::Diag;

/// Decoded wait status from `system()`/`waitpid()`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WaitStatus {
    status: i32,
}

impl WaitStatus {
    #[must_use]
    pub const fn from_raw(status: i32) -> Self {
        Self { status }
    }

    /// Returns the exit code if the process exited normally
    #[inline]
    #[must_use]
    pub fn code(&self) -> Option<i32> {
        if self.exited_normally() {
            Some((self.status >> 8) & 0xFF)
        } else {
            None
        }
    }

    /// Returns the signal number if the process was killed by a signal
    #[inline]
    #[must_use]
    pub fn signal(&self) -> Option<i32> {
        if self.signaled() {
            Some(self.status & 0x7F)
        } else {
            None
        }
    }

    #[inline]
    #[must_use]
    pub fn success(&self) -> bool {
        self.code() == Some(0)
    }

    #[inline]
    fn exited_normally(&self) -> bool {
        (self.status & 0x7F) == 0
    }

    #[inline]
    fn signaled(&self) -> bool {
        ((self.status & 0x7F) + 1) >> 1 > 0
    }
}

/// Run `command` via the platform shell and wait for it.
pub fn try_run_shell_command(command: &str) -> Result<()> {
    let c_command =
        CString::new(command).map_err(|_| PunyError::InvalidCommand(command.to_string()))?;

    // SAFETY: c_command is a valid NUL-terminated string that outlives the call.
    let rc = unsafe { libc::system(c_command.as_ptr()) };
    check_system(command, rc)
}

/*
 * Classify what system() gave back. Must run straight after the call:
 * -1 reads errno. (glibc turns a failed spawn into exit 127, so -1 is
 * mostly signal-mask or fork trouble.)
 */
fn check_system(command: &str, rc: libc::c_int) -> Result<()> {
    if rc == -1 {
        return Err(PunyError::Launch {
            command: command.to_string(),
            os: OsError::last(),
        });
    }

    let status = WaitStatus::from_raw(rc);
    if status.success() {
        return Ok(());
    }
    match (status.code(), status.signal()) {
        (Some(code), _) => Err(PunyError::Exit {
            command: command.to_string(),
            code,
        }),
        (None, Some(signal)) => Err(PunyError::Signaled {
            command: command.to_string(),
            signal,
        }),
        /* stopped/continued can't come out of system(); report the raw value */
        (None, None) => Err(PunyError::Exit {
            command: command.to_string(),
            code: rc,
        }),
    }
}

/// Run `command` via the platform shell; any failure is fatal.
pub fn run_shell_command(diag: &Diag, command: &str) {
    if let Err(e) = try_run_shell_command(command) {
        diag.fatal_error(&here!(), &e);
    }
}
