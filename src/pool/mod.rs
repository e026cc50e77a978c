//! Off-heap pixel buffers mapped directly from the operating system.
//!
//! [`allocate`] and [`release`] are a direct map/unmap pair with no caching.
//! Buffers are plain handles: they are not freed on drop, and the owner must
//! hand each one back exactly once. Leaking a handle leaks the mapping.
//!
//! [`BufferPool`] layers reuse of released regions on top of the same
//! contract.

mod recycle;
mod sys;

#[cfg(test)]
mod tests;

use std::{
    fmt,
    io,
    ptr::NonNull,
    slice,
    sync::{
        RwLock,
        atomic::{AtomicU64, Ordering},
    },
};

pub use self::recycle::{BufferPool, PoolConfig, PoolStats};

/// Handle to a page-aligned, zero-initialized region of process-private memory.
///
/// The handle records the length it was mapped with, so releasing it through
/// [`release`] always unmaps exactly what was mapped.
pub struct NativeBuffer {
    ptr: NonNull<u8>,
    len: usize,
}

// SAFETY: the handle owns a private mapping that nothing else references.
unsafe impl Send for NativeBuffer {}
// SAFETY: shared access only hands out `&[u8]`.
unsafe impl Sync for NativeBuffer {}

impl NativeBuffer {
    /// Length of the region in bytes.
    #[must_use]
    #[inline]
    pub const fn len(&self) -> usize {
        self.len
    }

    /// Always `false`: zero-length requests never produce a buffer.
    #[must_use]
    #[inline]
    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Base address of the region.
    #[must_use]
    #[inline]
    pub const fn as_ptr(&self) -> *const u8 {
        self.ptr.as_ptr()
    }

    /// Mutable base address of the region.
    #[must_use]
    #[inline]
    pub const fn as_mut_ptr(&mut self) -> *mut u8 {
        self.ptr.as_ptr()
    }

    /// The region as a byte slice.
    #[must_use]
    #[inline]
    pub fn as_slice(&self) -> &[u8] {
        // SAFETY: the mapping is `len` readable bytes and outlives `self`.
        unsafe { slice::from_raw_parts(self.ptr.as_ptr(), self.len) }
    }

    /// The region as a mutable byte slice.
    #[must_use]
    #[inline]
    pub fn as_mut_slice(&mut self) -> &mut [u8] {
        // SAFETY: the mapping is `len` writable bytes and `self` is borrowed
        // uniquely.
        unsafe { slice::from_raw_parts_mut(self.ptr.as_ptr(), self.len) }
    }

    /// Consumes the handle, returning `(address, len)` for callers that keep
    /// buffers across a foreign boundary.
    #[must_use]
    #[inline]
    pub fn into_raw(self) -> (usize, usize) {
        (self.ptr.as_ptr() as usize, self.len)
    }

    /// Rebuilds a handle from [`NativeBuffer::into_raw`] parts.
    ///
    /// Returns `None` for the null address or a zero length.
    ///
    /// # Safety
    ///
    /// `address` and `len` must come from `into_raw` on a buffer that has not
    /// been released, and no other handle to it may exist.
    #[must_use]
    #[inline]
    pub unsafe fn from_raw(address: usize, len: usize) -> Option<Self> {
        if len == 0 {
            return None;
        }
        NonNull::new(address as *mut u8).map(|ptr| NativeBuffer { ptr, len })
    }
}

impl fmt::Debug for NativeBuffer {
    #[inline]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NativeBuffer")
            .field("ptr", &self.ptr)
            .field("len", &self.len)
            .finish()
    }
}

/// Maps `size` bytes of zero-initialized, read-write, process-private memory
/// that is not backed by any file.
///
/// Returns `None` when `size` is zero or the operating system refuses the
/// mapping. This never panics.
#[must_use]
#[inline]
pub fn allocate(size: usize) -> Option<NativeBuffer> {
    if size == 0 {
        return None;
    }
    sys::map(size).map(|ptr| NativeBuffer { ptr, len: size })
}

/// Unmaps a buffer obtained from [`allocate`].
///
/// A failing unmap is swallowed: it is counted (see [`release_failures`]) and
/// reported to the hook installed with [`set_release_failure_hook`], but never
/// panics, retries or logs.
#[inline]
pub fn release(buffer: NativeBuffer) {
    let NativeBuffer { ptr, len } = buffer;
    // SAFETY: the handle was the unique owner of a `len`-byte mapping.
    if let Err(e) = unsafe { sys::unmap(ptr, len) } {
        report_release_failure(&e);
    }
}

/// Unmaps a region identified by its raw address and size.
///
/// The null address is a no-op. Failures are swallowed as in [`release`].
///
/// # Safety
///
/// `size` must equal the size the region was allocated with, and the region
/// must not be used afterwards. A mismatched size is undefined behavior at the
/// operating system level and is not detected here.
#[inline]
pub unsafe fn release_raw(address: usize, size: usize) {
    let Some(ptr) = NonNull::new(address as *mut u8) else {
        return;
    };
    if let Err(e) = sys::unmap(ptr, size) {
        report_release_failure(&e);
    }
}

/// Size of a page on this system.
#[must_use]
#[inline]
pub fn page_size() -> usize {
    sys::page_size()
}

/// Callback invoked with the OS error of every swallowed release failure.
pub type ReleaseFailureHook = fn(&io::Error);

static RELEASE_FAILURES: AtomicU64 = AtomicU64::new(0);
static RELEASE_HOOK: RwLock<Option<ReleaseFailureHook>> = RwLock::new(None);

/// Number of unmap failures swallowed since the process started.
#[must_use]
#[inline]
pub fn release_failures() -> u64 {
    RELEASE_FAILURES.load(Ordering::Relaxed)
}

/// Installs (or with `None`, removes) the release failure hook, returning
/// the previous one.
#[inline]
pub fn set_release_failure_hook(hook: Option<ReleaseFailureHook>) -> Option<ReleaseFailureHook> {
    match RELEASE_HOOK.write() {
        Ok(mut slot) => std::mem::replace(&mut *slot, hook),
        Err(poisoned) => std::mem::replace(&mut *poisoned.into_inner(), hook),
    }
}

fn report_release_failure(error: &io::Error) {
    RELEASE_FAILURES.fetch_add(1, Ordering::Relaxed);
    let hook = match RELEASE_HOOK.read() {
        Ok(slot) => *slot,
        Err(poisoned) => *poisoned.into_inner(),
    };
    if let Some(hook) = hook {
        hook(error);
    }
}
