/*
 * allocator.rs
 *
 * Allocation that can't fail, as far as the caller is concerned. Every
 * wrapper either hands back a valid, non-null region or reports and exits 2.
 * Call sites never check for null.
 *
 * Straight to libc malloc/calloc/realloc/posix_memalign/free so that errno
 * is meaningful when we report the failure.
 *
 * Fresh malloc memory is uninitialised, and reading it through &[u8] is UB
 * in Rust. So allocate() hands out an UninitBlock; allocate_zeroed() and
 * UninitBlock::fill() are the ways to get a readable Block.
 *
 * The try_* forms return PunyError instead. They exist for code that has a
 * better answer to OOM than dying, and for tests.
 */

use core::fmt;
use core::mem::MaybeUninit;
use core::ops::{Deref, DerefMut};
use core::ptr::NonNull;

use crate::error::{PunyError, Result};
use crate::os::OsError;
use crate::report::Diag;

/* malloc's alignment guarantee on every platform we build for */
const MALLOC_ALIGN: usize = 16;

/* estrdup convention: quote at most this many chars of the failed string */
const EXCERPT_CHARS: usize = 20;

/*
 * Owned region from the libc allocator. Both public block types wrap this.
 * Never zero-sized: a request for 0 bytes gets 1 so the pointer is unique.
 */
struct Raw {
    ptr: NonNull<u8>,
    len: usize,
    align: usize,
}

// SAFETY: Raw owns its allocation exclusively; libc free() may be called from
// any thread.
unsafe impl Send for Raw {}
// SAFETY: shared access only reads through &self, no interior mutability.
unsafe impl Sync for Raw {}

impl Raw {
    fn malloc(len: usize) -> Result<Self> {
        // SAFETY: malloc is safe to call with any size.
        let p = unsafe { libc::malloc(len.max(1)) };
        Self::from_ptr(p, len, MALLOC_ALIGN).ok_or_else(|| PunyError::Alloc {
            size: len,
            os: OsError::last(),
        })
    }

    fn calloc(len: usize) -> Result<Self> {
        // SAFETY: calloc is safe with any count/size, returns zeroed memory or null.
        let p = unsafe { libc::calloc(1, len.max(1)) };
        Self::from_ptr(p, len, MALLOC_ALIGN).ok_or_else(|| PunyError::Alloc {
            size: len,
            os: OsError::last(),
        })
    }

    fn memalign(count: usize, size: usize) -> Result<Self> {
        let len = count
            .checked_mul(size)
            .ok_or(PunyError::SizeOverflow { count, size })?;
        /* posix_memalign: power of two, multiple of sizeof(void*) */
        if !size.is_power_of_two() {
            return Err(PunyError::InvalidAlignment(size));
        }
        let align = size.max(core::mem::size_of::<*mut libc::c_void>());
        let mut p: *mut libc::c_void = core::ptr::null_mut();
        // SAFETY: p is a valid out-pointer, align is a power of two and a
        // multiple of the pointer size, len is any size.
        let rc = unsafe { libc::posix_memalign(&raw mut p, align, len.max(1)) };
        if rc != 0 {
            return Err(PunyError::AlignedAlloc {
                count,
                size,
                code: rc,
            });
        }
        Self::from_ptr(p, len, align).ok_or(PunyError::AlignedAlloc {
            count,
            size,
            code: libc::ENOMEM,
        })
    }

    fn from_ptr(p: *mut libc::c_void, len: usize, align: usize) -> Option<Self> {
        NonNull::new(p.cast::<u8>()).map(|ptr| Self { ptr, len, align })
    }

    /* resize in place; on failure self is untouched */
    fn resize(&mut self, len: usize) -> Result<()> {
        if self.align > MALLOC_ALIGN {
            /* realloc only promises malloc alignment - move by hand */
            let count = len.div_ceil(self.align).max(1);
            let mut fresh = Self::memalign(count, self.align).map_err(|e| {
                let code = match e {
                    PunyError::AlignedAlloc { code, .. } => code,
                    _ => libc::ENOMEM,
                };
                PunyError::Realloc {
                    size: len,
                    os: OsError::from_raw(code),
                }
            })?;
            fresh.len = len;
            // SAFETY: both regions are valid for min(self.len, len) bytes and
            // don't overlap (fresh was just allocated).
            unsafe {
                core::ptr::copy_nonoverlapping(
                    self.ptr.as_ptr(),
                    fresh.ptr.as_ptr(),
                    self.len.min(len),
                );
            }
            core::mem::swap(self, &mut fresh);
            return Ok(()); /* fresh now holds the old region and frees it */
        }
        // SAFETY: self.ptr came from malloc/calloc and is still live.
        let p = unsafe { libc::realloc(self.ptr.as_ptr().cast(), len.max(1)) };
        match NonNull::new(p.cast::<u8>()) {
            Some(ptr) => {
                self.ptr = ptr;
                self.len = len;
                Ok(())
            }
            None => Err(PunyError::Realloc {
                size: len,
                os: OsError::last(),
            }),
        }
    }
}

impl Drop for Raw {
    fn drop(&mut self) {
        // SAFETY: ptr came from malloc/calloc/realloc/posix_memalign and is
        // freed exactly once, here.
        unsafe { libc::free(self.ptr.as_ptr().cast()) }
    }
}

/// An initialised, owned byte region. Derefs to `[u8]`.
pub struct Block {
    raw: Raw,
}

/// An owned byte region whose contents are unspecified.
pub struct UninitBlock {
    raw: Raw,
}

impl Block {
    #[must_use]
    #[inline]
    pub fn len(&self) -> usize {
        self.raw.len
    }

    #[must_use]
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.raw.len == 0
    }

    /// Alignment the region is guaranteed to have.
    #[must_use]
    #[inline]
    pub fn align(&self) -> usize {
        self.raw.align
    }

    #[must_use]
    #[inline]
    pub fn as_ptr(&self) -> *const u8 {
        self.raw.ptr.as_ptr()
    }

    #[must_use]
    #[inline]
    pub fn as_mut_ptr(&mut self) -> *mut u8 {
        self.raw.ptr.as_ptr()
    }
}

impl Deref for Block {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        // SAFETY: raw is valid for len bytes and every byte was initialised
        // before this Block was constructed.
        unsafe { core::slice::from_raw_parts(self.raw.ptr.as_ptr(), self.raw.len) }
    }
}

impl DerefMut for Block {
    fn deref_mut(&mut self) -> &mut [u8] {
        // SAFETY: as deref(), plus &mut self gives exclusive access.
        unsafe { core::slice::from_raw_parts_mut(self.raw.ptr.as_ptr(), self.raw.len) }
    }
}

impl fmt::Debug for Block {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Block")
            .field("ptr", &self.raw.ptr)
            .field("len", &self.raw.len)
            .field("align", &self.raw.align)
            .finish()
    }
}

impl UninitBlock {
    #[must_use]
    #[inline]
    pub fn len(&self) -> usize {
        self.raw.len
    }

    #[must_use]
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.raw.len == 0
    }

    #[must_use]
    #[inline]
    pub fn align(&self) -> usize {
        self.raw.align
    }

    #[must_use]
    #[inline]
    pub fn as_mut_ptr(&mut self) -> *mut u8 {
        self.raw.ptr.as_ptr()
    }

    /// The region as possibly-uninitialised bytes.
    #[must_use]
    pub fn as_uninit_mut(&mut self) -> &mut [MaybeUninit<u8>] {
        // SAFETY: raw is valid for len bytes; MaybeUninit<u8> has no validity
        // requirement, and &mut self gives exclusive access.
        unsafe {
            core::slice::from_raw_parts_mut(self.raw.ptr.as_ptr().cast(), self.raw.len)
        }
    }

    /// Set every byte to `byte`.
    #[must_use]
    pub fn fill(mut self, byte: u8) -> Block {
        // SAFETY: raw is valid for len bytes of writes.
        unsafe { core::ptr::write_bytes(self.as_mut_ptr(), byte, self.raw.len) };
        Block { raw: self.raw }
    }

    /// Set every byte to zero.
    #[must_use]
    pub fn zeroed(self) -> Block {
        self.fill(0)
    }

    /// # Safety
    ///
    /// Every byte of the region must have been written.
    #[must_use]
    pub unsafe fn assume_init(self) -> Block {
        Block { raw: self.raw }
    }
}

impl fmt::Debug for UninitBlock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UninitBlock")
            .field("ptr", &self.raw.ptr)
            .field("len", &self.raw.len)
            .field("align", &self.raw.align)
            .finish()
    }
}

/// Request `n` bytes.
pub fn try_allocate(n: usize) -> Result<UninitBlock> {
    Raw::malloc(n).map(|raw| UninitBlock { raw })
}

/// Request `n` zero-filled bytes.
pub fn try_allocate_zeroed(n: usize) -> Result<Block> {
    Raw::calloc(n).map(|raw| Block { raw })
}

/// Resize `block` to `n` bytes, zero-filling any growth. On error `block`
/// is left exactly as it was.
pub fn try_reallocate(block: &mut Block, n: usize) -> Result<()> {
    let old = block.raw.len;
    block.raw.resize(n)?;
    if n > old {
        // SAFETY: the region is now valid for n bytes; [old, n) is fresh.
        unsafe { core::ptr::write_bytes(block.raw.ptr.as_ptr().add(old), 0, n - old) };
    }
    Ok(())
}

/// Request `count * size` bytes aligned to `size` (a power of two).
pub fn try_allocate_aligned(count: usize, size: usize) -> Result<UninitBlock> {
    Raw::memalign(count, size).map(|raw| UninitBlock { raw })
}

/// Copy `s` into freshly allocated storage.
pub fn try_duplicate_string(s: &str) -> Result<String> {
    let mut out = String::new();
    out.try_reserve_exact(s.len()).map_err(|_| PunyError::DupString {
        len: s.len(),
        os: OsError::from_raw(libc::ENOMEM),
    })?;
    out.push_str(s);
    Ok(out)
}

/// `n` bytes or exit 2 with "allocation of n bytes failed <errno>".
pub fn allocate(diag: &Diag, n: usize) -> UninitBlock {
    try_allocate(n).unwrap_or_else(|e| diag.die(&e))
}

/// `n` zero bytes or exit 2.
pub fn allocate_zeroed(diag: &Diag, n: usize) -> Block {
    try_allocate_zeroed(n).unwrap_or_else(|e| diag.die(&e))
}

/// Resize or exit 2 with "reallocation of n bytes failed <errno>".
pub fn reallocate(diag: &Diag, mut block: Block, n: usize) -> Block {
    if let Err(e) = try_reallocate(&mut block, n) {
        diag.die(&e);
    }
    block
}

/// `count * size` bytes aligned to `size`, or exit 2 with the
/// posix_memalign return code.
pub fn allocate_aligned(diag: &Diag, count: usize, size: usize) -> UninitBlock {
    try_allocate_aligned(count, size).unwrap_or_else(|e| diag.die(&e))
}

/// Independent copy of `s`, or exit 2 quoting the first 20 chars of `s`.
pub fn duplicate_string(diag: &Diag, s: &str) -> String {
    match try_duplicate_string(s) {
        Ok(copy) => copy,
        Err(e) => diag.eprintf(format_args!("{}", DupFailure(s)), e.os_error()),
    }
}

/// At most the first 20 chars of `s`, cut on a char boundary.
#[must_use]
pub fn excerpt(s: &str) -> &str {
    let end = s
        .char_indices()
        .nth(EXCERPT_CHARS)
        .map_or(s.len(), |(i, _)| i);
    &s[..end]
}

/* `duplicate_string("<excerpt>") failed:` - the colon asks for errno */
struct DupFailure<'a>(&'a str);

impl fmt::Display for DupFailure<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "duplicate_string(\"{}\") failed:", excerpt(self.0))
    }
}
