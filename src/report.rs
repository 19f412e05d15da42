/*
 * report.rs
 *
 * Formatted diagnostics on stderr. The exact shapes are a contract - tools
 * grep for them - so each one is pinned by a test below.
 *
 *   display   [prog ]file:func<line> msg[ desc<errno>]
 *   warn      Warn [prog ]file:func<line> msg[ desc<errno>]
 *   fatal     Fatal [prog ]file:func<line> msg[ desc<errno>]   -> cleanup, exit 2
 *   usage     Usage: [prog ]msg                                 -> exit 2, no cleanup
 *   eprintf   [prog: ]msg[ desc<errno>]                         -> cleanup, exit 2
 *   weprintf  warning: [prog: ]msg[ desc<errno>]
 *
 * A format ending in ':' means "append errno". The colon is the marker,
 * not part of the message: "open {}:" prints "open /tmp/x No such file or
 * directory<2>".
 *
 * Nothing on the write path allocates. We may be reporting an OOM.
 */

use core::fmt::{self, Write};
use std::backtrace::Backtrace;

use crate::config::Config;
use crate::error::{PunyError, exit_codes};
use crate::guard::Lifecycle;
use crate::io::{StderrWriter, flush_stdout};
use crate::os::OsError;

/// Where a diagnostic was raised. Build one with [`here!`](crate::here).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Location {
    pub file: &'static str,
    pub function: &'static str,
    pub line: u32,
}

impl Location {
    #[must_use]
    pub const fn new(file: &'static str, function: &'static str, line: u32) -> Self {
        Self {
            file,
            function,
            line,
        }
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}<{}>", self.file, self.function, self.line)
    }
}

/// Reduce the type name of a probe fn nested in some function to that
/// function's bare name. Closures report the function that contains them.
#[doc(hidden)]
#[must_use]
pub fn function_name(probe: &'static str) -> &'static str {
    let mut path = probe.strip_suffix("::__puny_here").unwrap_or(probe);
    while let Some(outer) = path.strip_suffix("::{{closure}}") {
        path = outer;
    }
    path.rsplit("::").next().unwrap_or(path)
}

/// The six message shapes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Style {
    Display,
    Warn,
    Fatal,
    Usage,
    /// eprintf
    Error,
    /// weprintf
    Warning,
}

impl Style {
    const fn lead(self) -> &'static str {
        match self {
            Self::Display | Self::Error => "",
            Self::Warn => "Warn ",
            Self::Fatal => "Fatal ",
            Self::Usage => "Usage: ",
            Self::Warning => "warning: ",
        }
    }

    /* located styles put a space after the name, eprintf-family a colon */
    const fn name_separator(self) -> &'static str {
        match self {
            Self::Display | Self::Warn | Self::Fatal | Self::Usage => " ",
            Self::Error | Self::Warning => ": ",
        }
    }
}

/// Write one complete diagnostic line to `out`.
///
/// `os` is appended as ` description<code>`; a trailing ':' in the message
/// is dropped in its favour. `Style::Usage` never carries OS context.
///
/// The line is always terminated, even when an argument's `Display` fails
/// part way; that error is still returned.
pub fn render<W: Write>(
    out: &mut W,
    style: Style,
    progname: Option<&str>,
    location: Option<&Location>,
    args: fmt::Arguments<'_>,
    os: Option<OsError>,
) -> fmt::Result {
    let body = render_body(out, style, progname, location, args, os);
    out.write_char('\n').and(body)
}

fn render_body<W: Write>(
    out: &mut W,
    style: Style,
    progname: Option<&str>,
    location: Option<&Location>,
    args: fmt::Arguments<'_>,
    os: Option<OsError>,
) -> fmt::Result {
    out.write_str(style.lead())?;
    if let Some(name) = progname {
        out.write_str(name)?;
        out.write_str(style.name_separator())?;
    }
    if let Some(loc) = location {
        write!(out, "{loc} ")?;
    }
    match os.filter(|_| style != Style::Usage) {
        Some(os) => {
            DropTrailingColon::new(out).write_fmt(args)?;
            write!(out, "{os}")?;
        }
        None => out.write_fmt(args)?,
    }
    Ok(())
}

/* passes text through but swallows a ':' that turns out to be the last char */
struct DropTrailingColon<'a, W: Write> {
    inner: &'a mut W,
    held: bool,
}

impl<'a, W: Write> DropTrailingColon<'a, W> {
    fn new(inner: &'a mut W) -> Self {
        Self { inner, held: false }
    }
}

impl<W: Write> Write for DropTrailingColon<'_, W> {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        if s.is_empty() {
            return Ok(());
        }
        if self.held {
            self.inner.write_char(':')?;
            self.held = false;
        }
        match s.strip_suffix(':') {
            Some(head) => {
                self.held = true;
                self.inner.write_str(head)
            }
            None => self.inner.write_str(s),
        }
    }
}

/// Diagnostic context: program name, stacktrace flag and the cleanup guard.
///
/// Built once by the entry point and handed to whatever needs to report.
/// Immutable afterwards, so the program name can't change mid-run.
#[derive(Debug)]
pub struct Diag {
    progname: Option<String>,
    stacktrace: bool,
    lifecycle: Lifecycle,
}

impl Diag {
    /// Diag bound to the process-wide cleanup guard.
    #[must_use]
    pub fn new(config: Config) -> Self {
        Self::with_lifecycle(config, Lifecycle::process())
    }

    #[must_use]
    pub fn with_lifecycle(config: Config, lifecycle: Lifecycle) -> Self {
        Self {
            progname: config.progname,
            stacktrace: config.stacktrace,
            lifecycle,
        }
    }

    /// `Diag::new(Config::from_env())`
    #[must_use]
    pub fn from_env() -> Self {
        Self::new(Config::from_env())
    }

    #[must_use]
    pub fn progname(&self) -> Option<&str> {
        self.progname.as_deref()
    }

    #[must_use]
    pub fn stacktrace(&self) -> bool {
        self.stacktrace
    }

    #[must_use]
    pub fn lifecycle(&self) -> &Lifecycle {
        &self.lifecycle
    }

    /// See [`Lifecycle::set_cleanup`].
    pub fn set_cleanup<F>(&self, callback: F) -> crate::Result<()>
    where
        F: FnOnce() + Send + 'static,
    {
        self.lifecycle.set_cleanup(callback)
    }

    /// See [`Lifecycle::clear_cleanup`].
    pub fn clear_cleanup(&self) -> bool {
        self.lifecycle.clear_cleanup()
    }

    /// Flush stdout and write one diagnostic to stderr. Never terminates.
    pub fn emit(
        &self,
        style: Style,
        location: Option<&Location>,
        args: fmt::Arguments<'_>,
        os: Option<OsError>,
    ) {
        flush_stdout();
        let _ = render(
            &mut StderrWriter,
            style,
            self.progname(),
            location,
            args,
            os,
        );
    }

    pub fn display(&self, location: &Location, args: fmt::Arguments<'_>, os: Option<OsError>) {
        self.emit(Style::Display, Some(location), args, os);
    }

    pub fn warn(&self, location: &Location, args: fmt::Arguments<'_>, os: Option<OsError>) {
        self.emit(Style::Warn, Some(location), args, os);
    }

    /// Report, dump a stack trace if enabled, run cleanup, exit 2.
    #[cold]
    pub fn fatal(&self, location: &Location, args: fmt::Arguments<'_>, os: Option<OsError>) -> ! {
        self.emit(Style::Fatal, Some(location), args, os);
        self.terminate(true)
    }

    /// Bad invocation. Exits 2 without running cleanup.
    #[cold]
    pub fn usage(&self, args: fmt::Arguments<'_>) -> ! {
        self.emit(Style::Usage, None, args, None);
        flush_stdout();
        std::process::exit(i32::from(exit_codes::FAILURE))
    }

    /// Report, run cleanup, exit 2.
    #[cold]
    pub fn eprintf(&self, args: fmt::Arguments<'_>, os: Option<OsError>) -> ! {
        self.emit(Style::Error, None, args, os);
        self.terminate(false)
    }

    pub fn weprintf(&self, args: fmt::Arguments<'_>, os: Option<OsError>) {
        self.emit(Style::Warning, None, args, os);
    }

    /// eprintf an error value, with its errno when it carries one.
    #[cold]
    pub fn die(&self, err: &PunyError) -> ! {
        self.eprintf(format_args!("{err}"), err.os_error())
    }

    /// fatal an error value, with its errno when it carries one.
    #[cold]
    pub fn fatal_error(&self, location: &Location, err: &PunyError) -> ! {
        self.fatal(location, format_args!("{err}"), err.os_error())
    }

    /// The shared tail of every fatal path.
    #[cold]
    pub fn terminate(&self, with_trace: bool) -> ! {
        if with_trace && self.stacktrace {
            let _ = write!(
                StderrWriter,
                "stack backtrace:\n{}\n",
                Backtrace::force_capture()
            );
        }
        self.lifecycle.run_cleanup();
        flush_stdout();
        std::process::exit(i32::from(exit_codes::FAILURE))
    }
}

/// Capture the current file, function and line as a [`Location`].
#[macro_export]
macro_rules! here {
    () => {
        $crate::report::Location::new(
            ::core::file!(),
            $crate::report::function_name({
                fn __puny_here() {}
                ::core::any::type_name_of_val(&__puny_here)
            }),
            ::core::line!(),
        )
    };
}

/// Debug/info message with location. Returns normally.
///
/// ```no_run
/// use puny::{Config, Diag, display};
///
/// let diag = Diag::new(Config::default().with_progname("tool"));
/// display!(diag, "loaded {} entries", 3);
/// ```
#[macro_export]
macro_rules! display {
    ($diag:expr, $fmt:literal $($arg:tt)*) => {{
        let os = $crate::os::OsError::capture_if($fmt);
        ($diag).display(&$crate::here!(), ::core::format_args!($fmt $($arg)*), os)
    }};
}

/// `Warn `-prefixed message with location. Returns normally.
#[macro_export]
macro_rules! warn {
    ($diag:expr, $fmt:literal $($arg:tt)*) => {{
        let os = $crate::os::OsError::capture_if($fmt);
        ($diag).warn(&$crate::here!(), ::core::format_args!($fmt $($arg)*), os)
    }};
}

/// `Fatal `-prefixed message with location, then cleanup and exit 2.
#[macro_export]
macro_rules! fatal {
    ($diag:expr, $fmt:literal $($arg:tt)*) => {{
        let os = $crate::os::OsError::capture_if($fmt);
        ($diag).fatal(&$crate::here!(), ::core::format_args!($fmt $($arg)*), os)
    }};
}

/// `Usage: ` line, then exit 2. Cleanup does not run.
#[macro_export]
macro_rules! usage {
    ($diag:expr, $fmt:literal $($arg:tt)*) => {
        ($diag).usage(::core::format_args!($fmt $($arg)*))
    };
}

/// `prog: ` message, then cleanup and exit 2.
///
/// ```no_run
/// use puny::{Config, Diag, eprintf};
///
/// let diag = Diag::new(Config::default().with_progname("tool"));
/// let path = "/tmp/x";
/// if std::fs::File::open(path).is_err() {
///     // tool: open /tmp/x No such file or directory<2>
///     eprintf!(diag, "open {}:", path);
/// }
/// ```
#[macro_export]
macro_rules! eprintf {
    ($diag:expr, $fmt:literal $($arg:tt)*) => {{
        let os = $crate::os::OsError::capture_if($fmt);
        ($diag).eprintf(::core::format_args!($fmt $($arg)*), os)
    }};
}

/// `warning: prog: ` message. Returns normally.
#[macro_export]
macro_rules! weprintf {
    ($diag:expr, $fmt:literal $($arg:tt)*) => {{
        let os = $crate::os::OsError::capture_if($fmt);
        ($diag).weprintf(::core::format_args!($fmt $($arg)*), os)
    }};
}
