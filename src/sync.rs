/*
 * sync.rs
 *
 * CleanupSlot: a cell holding at most one cleanup callback.
 *
 * The whole point is take-then-invoke. The callback pointer is swapped out
 * for null in one atomic step and only then called. Whoever loses the swap
 * sees null and does nothing, so a signal landing while the callback runs,
 * or the callback itself hitting a fatal path, can't run it a second time.
 *
 * No locks: this is read from a signal handler, and a handler that blocks
 * on a mutex the interrupted code holds never comes back.
 */

use core::ptr;
use core::sync::atomic::{AtomicPtr, Ordering};

/// A registered cleanup callback.
pub type Callback = Box<dyn FnOnce() + Send + 'static>;

/// Holds zero or one [`Callback`]. Invoking it clears it.
///
/// # Invariants
///
/// - `ptr` is either null or came from `Box::into_raw(Box<Callback>)`.
/// - Ownership of a non-null pointer moves out only through `swap`, so
///   exactly one caller ever reconstructs each box.
///
/// `Sync` comes for free from `AtomicPtr`; it is sound because the boxed
/// callback is `Send` and only the thread that wins the swap touches it.
pub struct CleanupSlot {
    ptr: AtomicPtr<Callback>,
}

impl CleanupSlot {
    /// Create an empty slot. Const so it can live in a `static`.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            ptr: AtomicPtr::new(ptr::null_mut()),
        }
    }

    /// Register `callback`, replacing (and dropping, uncalled) any previous one.
    pub fn set(&self, callback: Callback) {
        let new = Box::into_raw(Box::new(callback));
        let old = self.ptr.swap(new, Ordering::AcqRel);
        // SAFETY: old is null or a pointer we created with Box::into_raw and
        // just took sole ownership of via swap.
        unsafe { drop_raw(old) };
    }

    /// Drop any registered callback without calling it. Returns whether one
    /// was registered.
    pub fn clear(&self) -> bool {
        let old = self.ptr.swap(ptr::null_mut(), Ordering::AcqRel);
        let was_set = !old.is_null();
        // SAFETY: same as set() - we own whatever the swap handed back.
        unsafe { drop_raw(old) };
        was_set
    }

    /// Remove the callback, leaving the slot empty.
    #[must_use]
    pub fn take(&self) -> Option<Callback> {
        let old = self.ptr.swap(ptr::null_mut(), Ordering::AcqRel);
        if old.is_null() {
            None
        } else {
            // SAFETY: old is non-null, came from Box::into_raw, and the swap
            // gave us exclusive ownership.
            Some(*unsafe { Box::from_raw(old) })
        }
    }

    /// Take the callback and call it. Returns whether anything ran.
    pub fn run(&self) -> bool {
        match self.take() {
            Some(callback) => {
                callback();
                true
            }
            None => false,
        }
    }

    #[must_use]
    #[inline]
    pub fn is_set(&self) -> bool {
        !self.ptr.load(Ordering::Acquire).is_null()
    }
}

impl Default for CleanupSlot {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for CleanupSlot {
    fn drop(&mut self) {
        self.clear();
    }
}

impl core::fmt::Debug for CleanupSlot {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("CleanupSlot")
            .field("armed", &self.is_set())
            .finish()
    }
}

/// # Safety
///
/// `p` must be null or an owned pointer from `Box::into_raw(Box<Callback>)`.
unsafe fn drop_raw(p: *mut Callback) {
    if !p.is_null() {
        // SAFETY: guaranteed by caller
        drop(unsafe { Box::from_raw(p) });
    }
}


/* -------------------------------------------------------------------------- */
/*                              kani proofs                                   */
/* -------------------------------------------------------------------------- */

#[cfg(kani)]
mod kani_proofs {
    use super::*;

    /*
     * after set(), the first take() yields the callback and every later
     * take() yields nothing. this is the at-most-once contract.
     */
    #[kani::proof]
    #[kani::unwind(3)]
    fn verify_take_at_most_once() {
        let slot = CleanupSlot::new();
        slot.set(Box::new(|| {}));
        let first = slot.take();
        kani::assert(first.is_some(), "first take should yield the callback");
        kani::assert(slot.take().is_none(), "second take should be empty");
        kani::assert(!slot.is_set(), "slot should be cleared after take");
    }

    /* clear() on an armed slot leaves nothing for run() */
    #[kani::proof]
    #[kani::unwind(3)]
    fn verify_clear_disarms() {
        let slot = CleanupSlot::new();
        let arm: bool = kani::any();
        if arm {
            slot.set(Box::new(|| {}));
        }
        kani::assert(slot.clear() == arm, "clear reports prior state");
        kani::assert(!slot.run(), "nothing runs after clear");
    }
}
