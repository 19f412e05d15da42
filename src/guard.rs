/*
 * guard.rs
 *
 * Process lifecycle guard. Two states: nothing pending, or one cleanup
 * callback pending. Every way out of the process - fatal!, eprintf!, an
 * allocation failure, a terminating signal - runs the callback first.
 *
 * The signal side can't see any handle we pass around, so the process-wide
 * slot is a static. Everything else reaches it through a Lifecycle.
 *
 * Handlers are installed lazily, on the first set_cleanup(). Until then the
 * platform default applies and ^C kills us with the usual 128+2.
 *
 * Inside the handler the whole terminating set is blocked, so a second
 * signal can't cut a running cleanup short. The slot takes care of
 * at-most-once; the mask takes care of run-to-completion.
 */

use core::sync::atomic::{AtomicBool, Ordering};

use crate::error::{PunyError, Result, exit_codes};
use crate::os::OsError;
use crate::signal::{Signal, TERMINATING};
use crate::sync::CleanupSlot;

/* the slot signal handlers run */
static PROCESS_CLEANUP: CleanupSlot = CleanupSlot::new();

/* true once our handler owns the catchable part of the set */
static HANDLERS_INSTALLED: AtomicBool = AtomicBool::new(false);

/// Handle on a cleanup slot. Cheap to copy, pass it to whoever needs it.
#[derive(Debug, Clone, Copy)]
pub struct Lifecycle {
    slot: &'static CleanupSlot,
    catch_signals: bool,
}

impl Lifecycle {
    /// The process-wide guard. Arming it installs the signal handlers.
    #[must_use]
    pub fn process() -> Self {
        Self {
            slot: &PROCESS_CLEANUP,
            catch_signals: true,
        }
    }

    /// A guard on a private slot. Never touches signal dispositions, so
    /// signals won't run its callback - only explicit fatal paths will.
    #[must_use]
    pub const fn detached(slot: &'static CleanupSlot) -> Self {
        Self {
            slot,
            catch_signals: false,
        }
    }

    /// Register the callback to run once before termination.
    ///
    /// Replaces any earlier registration without calling it. The callback is
    /// armed even if installing a handler fails; the error says which signal
    /// couldn't be caught.
    ///
    /// The callback must tolerate running in signal context. On the process
    /// lifecycle it may run from the handler for a terminating signal, at any
    /// point in the interrupted code: a lock the interrupted thread held
    /// (the malloc lock included) stays held. Stick to async-signal-safe calls
    /// such as `unlink(2)` and `write(2)` where possible.
    pub fn set_cleanup<F>(&self, callback: F) -> Result<()>
    where
        F: FnOnce() + Send + 'static,
    {
        self.slot.set(Box::new(callback));
        if self.catch_signals {
            install_handlers()?;
        }
        Ok(())
    }

    /// Disarm without calling. Handlers stay installed; a signal now just
    /// exits with status 2.
    pub fn clear_cleanup(&self) -> bool {
        self.slot.clear()
    }

    /// Take the callback and run it. Returns whether anything ran.
    pub fn run_cleanup(&self) -> bool {
        self.slot.run()
    }

    #[must_use]
    #[inline]
    pub fn is_armed(&self) -> bool {
        self.slot.is_set()
    }

    #[must_use]
    #[inline]
    pub fn catches_signals(&self) -> bool {
        self.catch_signals
    }
}

impl Default for Lifecycle {
    fn default() -> Self {
        Self::process()
    }
}

/* runs on HUP, INT, SEGV, ... with the rest of the set blocked */
extern "C" fn caught_signal(_sig: libc::c_int) {
    PROCESS_CLEANUP.run();
    // SAFETY: _exit is async-signal-safe and has no preconditions.
    unsafe { libc::_exit(i32::from(exit_codes::FAILURE)) }
}

/// Point every catchable terminating signal at the cleanup handler.
/// Idempotent.
pub fn install_handlers() -> Result<()> {
    if HANDLERS_INSTALLED.swap(true, Ordering::SeqCst) {
        return Ok(());
    }
    let result = set_dispositions(caught_signal as *const () as libc::sighandler_t, true);
    if result.is_err() {
        HANDLERS_INSTALLED.store(false, Ordering::SeqCst);
    }
    result
}

/// Put the terminating set back to default dispositions.
///
/// Doesn't touch the process slot: a callback still armed will run on the
/// next fatal!, just not on a signal.
pub fn release_signals() -> Result<()> {
    if !HANDLERS_INSTALLED.swap(false, Ordering::SeqCst) {
        return Ok(());
    }
    set_dispositions(libc::SIG_DFL, false)
}

#[must_use]
pub fn handlers_installed() -> bool {
    HANDLERS_INSTALLED.load(Ordering::SeqCst)
}

fn set_dispositions(handler: libc::sighandler_t, block_set: bool) -> Result<()> {
    // SAFETY: sigaction struct is zeroed then properly initialized.
    // sigemptyset/sigaddset only write into sa.sa_mask which we own.
    // All ops share the invariant of building one sigaction value.
    #[allow(clippy::multiple_unsafe_ops_per_block)]
    let sa = unsafe {
        let mut sa: libc::sigaction = core::mem::zeroed();
        sa.sa_sigaction = handler;
        sa.sa_flags = libc::SA_RESTART;
        libc::sigemptyset(&raw mut sa.sa_mask);
        if block_set {
            for sig in catchable() {
                libc::sigaddset(&raw mut sa.sa_mask, sig.as_raw());
            }
        }
        sa
    };

    for sig in catchable() {
        // SAFETY: sa is fully initialized above, sig is a valid catchable
        // signal number, and a null old-action pointer is allowed.
        let rc = unsafe { libc::sigaction(sig.as_raw(), &sa, core::ptr::null_mut()) };
        if rc != 0 {
            return Err(PunyError::SignalError {
                signal: sig.as_raw(),
                os: OsError::last(),
            });
        }
    }
    Ok(())
}

fn catchable() -> impl Iterator<Item = Signal> {
    TERMINATING.into_iter().filter(|s| s.is_catchable())
}
