/*
 * os.rs
 *
 * The platform's last-error state, captured as a value.
 *
 * A message whose format ends in ':' gets " <description><code>" appended.
 * The code must be read at the very start of the call: flushing stdout or
 * formatting arguments can clobber errno before we get to print it.
 *
 * strerror() isn't thread-safe, strerror_r() is. libc binds the XSI flavour
 * on glibc, so the return value is an int on every platform we care about.
 */

use core::ffi::CStr;
use core::fmt;

/* longest strerror text on glibc/darwin is well under this */
const DESCRIPTION_CAP: usize = 128;

/// An errno value captured at a specific point in time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OsError {
    code: i32,
}

impl OsError {
    /// Wrap a raw errno value.
    #[must_use]
    pub const fn from_raw(code: i32) -> Self {
        Self { code }
    }

    /// Read the calling thread's current errno.
    #[must_use]
    #[inline]
    pub fn last() -> Self {
        Self {
            code: std::io::Error::last_os_error().raw_os_error().unwrap_or(0),
        }
    }

    /// Capture errno only when `format` asks for it with a trailing colon.
    ///
    /// ```
    /// use puny::os::OsError;
    ///
    /// assert!(OsError::capture_if("open %s:").is_some());
    /// assert!(OsError::capture_if("open %s").is_none());
    /// assert!(OsError::capture_if("").is_none());
    /// ```
    #[must_use]
    #[inline]
    pub fn capture_if(format: &str) -> Option<Self> {
        if wants_os_context(format) {
            Some(Self::last())
        } else {
            None
        }
    }

    #[must_use]
    #[inline]
    pub const fn code(self) -> i32 {
        self.code
    }

    /// Write the human-readable description into `out` without allocating.
    pub fn write_description<W: fmt::Write>(self, out: &mut W) -> fmt::Result {
        let mut buf = [0 as libc::c_char; DESCRIPTION_CAP];
        // SAFETY: buf is a valid writable buffer of DESCRIPTION_CAP bytes and
        // strerror_r never writes past buflen. On success it NUL-terminates.
        let rc = unsafe { libc::strerror_r(self.code, buf.as_mut_ptr(), buf.len()) };
        if rc != 0 {
            return write!(out, "Unknown error {}", self.code);
        }
        // SAFETY: strerror_r returned 0, so buf holds a NUL-terminated string
        // that lives as long as buf.
        let text = unsafe { CStr::from_ptr(buf.as_ptr()) };
        out.write_str(&text.to_string_lossy())
    }

    /// Human-readable description, e.g. "No such file or directory".
    #[must_use]
    pub fn description(self) -> String {
        let mut s = String::new();
        let _ = self.write_description(&mut s);
        s
    }
}

/* " No such file or directory<2>" - the exact suffix scrapers look for */
impl fmt::Display for OsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(" ")?;
        self.write_description(f)?;
        write!(f, "<{}>", self.code)
    }
}

/// True when a format string ends with the OS-context marker.
#[must_use]
#[inline]
pub fn wants_os_context(format: &str) -> bool {
    format.ends_with(':')
}
