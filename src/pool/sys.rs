//! Thin layer over the platform's page allocator.

use std::{io, ptr::NonNull};

cfg_if::cfg_if! {
    if #[cfg(unix)] {
        use std::ptr;

        /// Maps `len` bytes of private, anonymous, zero-filled, read-write memory.
        pub(super) fn map(len: usize) -> Option<NonNull<u8>> {
            debug_assert!(len > 0);
            // SAFETY: an anonymous private mapping with no hint address does
            // not alias any existing memory.
            let addr = unsafe {
                libc::mmap(
                    ptr::null_mut(),
                    len,
                    libc::PROT_READ | libc::PROT_WRITE,
                    libc::MAP_PRIVATE | libc::MAP_ANONYMOUS,
                    -1,
                    0,
                )
            };
            if addr == libc::MAP_FAILED {
                return None;
            }
            NonNull::new(addr.cast::<u8>())
        }

        /// Unmaps a region previously returned by [`map`].
        ///
        /// # Safety
        ///
        /// `len` must match the mapping and nothing may use the region afterwards.
        pub(super) unsafe fn unmap(addr: NonNull<u8>, len: usize) -> io::Result<()> {
            if libc::munmap(addr.as_ptr().cast(), len) == 0 {
                Ok(())
            } else {
                Err(io::Error::last_os_error())
            }
        }

        pub(super) fn page_size() -> usize {
            // SAFETY: `sysconf` has no preconditions.
            let size = unsafe { libc::sysconf(libc::_SC_PAGESIZE) };
            usize::try_from(size)
                .ok()
                .filter(|size| size.is_power_of_two())
                .unwrap_or(FALLBACK_PAGE_SIZE)
        }
    } else {
        use std::alloc::{self, Layout};

        /// Allocates `len` zeroed bytes aligned to a page.
        pub(super) fn map(len: usize) -> Option<NonNull<u8>> {
            debug_assert!(len > 0);
            let layout = Layout::from_size_align(len, page_size()).ok()?;
            // SAFETY: `layout` has a non-zero size.
            NonNull::new(unsafe { alloc::alloc_zeroed(layout) })
        }

        /// Frees a region previously returned by [`map`].
        ///
        /// # Safety
        ///
        /// `len` must match the allocation and nothing may use the region afterwards.
        pub(super) unsafe fn unmap(addr: NonNull<u8>, len: usize) -> io::Result<()> {
            let layout = Layout::from_size_align(len, page_size())
                .map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e))?;
            if len == 0 {
                return Err(io::Error::from(io::ErrorKind::InvalidInput));
            }
            alloc::dealloc(addr.as_ptr(), layout);
            Ok(())
        }

        pub(super) const fn page_size() -> usize {
            FALLBACK_PAGE_SIZE
        }
    }
}

const FALLBACK_PAGE_SIZE: usize = 4096;
