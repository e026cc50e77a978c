use std::{
    collections::{HashMap, HashSet},
    sync::{Mutex, MutexGuard, PoisonError},
};

use log::{debug, trace};

use super::NativeBuffer;

/// Tuning for [`BufferPool`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolConfig {
    /// Maximum number of released regions kept for reuse. Regions released
    /// beyond this are unmapped immediately.
    pub max_cached: usize,
}

impl Default for PoolConfig {
    #[inline]
    fn default() -> Self {
        PoolConfig { max_cached: 120 }
    }
}

/// Counters describing a pool's activity.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PoolStats {
    /// Regions freshly mapped from the operating system.
    pub mapped: u64,
    /// Requests served from a cached region.
    pub reused: u64,
    /// Buffers handed out and not yet released to the pool.
    pub in_use: usize,
    /// Regions currently held for reuse.
    pub cached: usize,
}

/// A cache of page-rounded regions in front of [`allocate`](super::allocate).
///
/// Requests are rounded up to whole pages, and a released region is only
/// reused for a request that rounds to the same size. Reused regions are
/// zeroed before they are handed out again, so [`BufferPool::acquire`]
/// gives the same guarantees as a fresh mapping.
///
/// Buffers handed out by the pool must be returned through
/// [`BufferPool::release`]. Handing one to [`release`](super::release)
/// instead bypasses the cache and leaves it counted as in use. Dropping the
/// pool unmaps only the cached regions.
#[derive(Debug)]
pub struct BufferPool {
    config: PoolConfig,
    page_size: usize,
    inner: Mutex<PoolInner>,
}

#[derive(Debug, Default)]
struct PoolInner {
    free: HashMap<usize, Vec<NativeBuffer>>,
    /// Base addresses of the buffers `acquire` has handed out.
    outstanding: HashSet<usize>,
    stats: PoolStats,
}

impl BufferPool {
    /// Creates an empty pool.
    #[must_use]
    #[inline]
    pub fn new(config: PoolConfig) -> Self {
        BufferPool {
            config,
            page_size: super::page_size(),
            inner: Mutex::new(PoolInner::default()),
        }
    }

    /// Returns a zero-filled buffer of at least `size` bytes, rounded up to a
    /// whole number of pages.
    ///
    /// Returns `None` for a zero `size` or when the operating system refuses
    /// a new mapping.
    #[must_use]
    #[inline]
    pub fn acquire(&self, size: usize) -> Option<NativeBuffer> {
        if size == 0 {
            debug!("rejecting zero-length buffer request");
            return None;
        }
        let Some(class) = size.checked_next_multiple_of(self.page_size) else {
            debug!("buffer request of {} bytes overflows a page multiple", size);
            return None;
        };

        let cached = {
            let mut inner = self.lock();
            let buffer = inner.free.get_mut(&class).and_then(Vec::pop);
            if let Some(buffer) = &buffer {
                inner.outstanding.insert(buffer.as_ptr() as usize);
                inner.stats.cached -= 1;
                inner.stats.reused += 1;
                inner.stats.in_use += 1;
            }
            buffer
        };
        if let Some(mut buffer) = cached {
            trace!("reusing cached {}-byte region", class);
            buffer.as_mut_slice().fill(0);
            return Some(buffer);
        }

        let Some(buffer) = super::allocate(class) else {
            debug!("failed to map {} bytes", class);
            return None;
        };
        let mut inner = self.lock();
        inner.outstanding.insert(buffer.as_ptr() as usize);
        inner.stats.mapped += 1;
        inner.stats.in_use += 1;
        Some(buffer)
    }

    /// Returns a buffer to the pool, caching it for reuse while there is room.
    ///
    /// Buffers this pool did not hand out are unmapped directly and leave the
    /// counters untouched.
    #[inline]
    pub fn release(&self, buffer: NativeBuffer) {
        let overflow = {
            let mut inner = self.lock();
            if !inner.outstanding.remove(&(buffer.as_ptr() as usize)) {
                drop(inner);
                trace!("unmapping foreign {}-byte region", buffer.len());
                super::release(buffer);
                return;
            }
            inner.stats.in_use -= 1;
            if inner.stats.cached < self.config.max_cached {
                inner.stats.cached += 1;
                inner.free.entry(buffer.len()).or_default().push(buffer);
                None
            } else {
                Some(buffer)
            }
        };
        if let Some(buffer) = overflow {
            trace!("pool full, unmapping {}-byte region", buffer.len());
            super::release(buffer);
        }
    }

    /// Unmaps every cached region.
    #[inline]
    pub fn trim(&self) {
        let free = {
            let mut inner = self.lock();
            inner.stats.cached = 0;
            std::mem::take(&mut inner.free)
        };
        free.into_values().flatten().for_each(super::release);
    }

    /// A snapshot of the pool's counters.
    #[must_use]
    #[inline]
    pub fn stats(&self) -> PoolStats {
        self.lock().stats
    }

    fn lock(&self) -> MutexGuard<'_, PoolInner> {
        // No update leaves the free lists and counters half-written.
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for BufferPool {
    #[inline]
    fn default() -> Self {
        Self::new(PoolConfig::default())
    }
}

impl Drop for BufferPool {
    fn drop(&mut self) {
        self.trim();
    }
}
