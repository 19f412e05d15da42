/*
 * io.rs
 *
 * Direct writes to stderr via libc::write.
 *
 * no buffering - each write is a syscall. diagnostics are rare and must
 * land even when the heap is gone, so nothing here allocates.
 */

use core::fmt::{self, Write};
use std::io::Write as _;

const STDERR: i32 = 2;

/// Write bytes to stderr, retrying on short writes and EINTR.
pub fn write_stderr(mut s: &[u8]) {
    while !s.is_empty() {
        // SAFETY: s is a valid byte slice for s.len() bytes, STDERR is always open
        let n = unsafe { libc::write(STDERR, s.as_ptr().cast(), s.len()) };
        if n < 0 {
            if std::io::Error::last_os_error().kind() == std::io::ErrorKind::Interrupted {
                continue;
            }
            return; /* nowhere left to report a broken stderr */
        }
        #[allow(clippy::cast_sign_loss)]
        let written = n as usize;
        if written == 0 {
            return;
        }
        s = &s[written..];
    }
}

/// Push buffered stdout out before a diagnostic so the two streams interleave
/// in program order.
#[inline]
pub fn flush_stdout() {
    let _ = std::io::stdout().flush();
}

/// A writer that outputs to stderr via direct syscall.
/// Implements core::fmt::Write for use with write!/writeln! macros.
pub struct StderrWriter;

impl Write for StderrWriter {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        write_stderr(s.as_bytes());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_write_stderr() {
        /* just verify it doesn't crash */
        write_stderr(b"test stderr write\n");
        write_stderr(b"");
    }

    #[test]
    fn test_writer_fmt() {
        let mut w = StderrWriter;
        let _ = writeln!(w, "formatted: {} + {} = {}", 1, 2, 3);
    }

    #[test]
    fn test_flush_stdout() {
        print!("pending");
        flush_stdout();
    }
}
