#![allow(clippy::unwrap_used, reason = "allow in test files")]

use std::{
    io,
    sync::atomic::{AtomicUsize, Ordering},
    thread,
};

use quickcheck_macros::quickcheck;

use super::*;

#[test]
fn allocate_zero_is_the_sentinel() {
    assert!(allocate(0).is_none());
}

#[test]
fn fresh_buffers_are_zeroed_and_writable() {
    let size = 3 * page_size() + 17;
    let mut buffer = allocate(size).unwrap();
    assert_eq!(buffer.len(), size);
    assert!(!buffer.is_empty());
    assert!(buffer.as_slice().iter().all(|&b| b == 0));

    buffer.as_mut_slice().fill(0xA5);
    assert!(buffer.as_slice().iter().all(|&b| b == 0xA5));
    release(buffer);
}

#[test]
fn buffers_are_page_aligned() {
    let buffer = allocate(100).unwrap();
    assert_eq!(buffer.as_ptr() as usize % page_size(), 0);
    release(buffer);
}

#[test]
fn raw_round_trip_preserves_the_region() {
    let mut buffer = allocate(64).unwrap();
    buffer.as_mut_slice()[63] = 7;
    let (address, len) = buffer.into_raw();
    assert_ne!(address, 0);
    assert_eq!(len, 64);

    // SAFETY: parts come straight from `into_raw` above.
    let buffer = unsafe { NativeBuffer::from_raw(address, len) }.unwrap();
    assert_eq!(buffer.as_slice()[63], 7);
    release(buffer);
}

#[test]
fn from_raw_rejects_sentinels() {
    // SAFETY: null and zero-length parts never produce a handle.
    unsafe {
        assert!(NativeBuffer::from_raw(0, 4096).is_none());
        assert!(NativeBuffer::from_raw(4096, 0).is_none());
    }
}

#[test]
fn release_raw_of_null_is_a_no_op() {
    // SAFETY: the null address is never unmapped.
    unsafe {
        release_raw(0, 4096);
        release_raw(0, 0);
    }
}

#[test]
fn repeated_allocate_release_does_not_crash() {
    for i in 0..2000 {
        let size = 1 + (i * 7919) % (1 << 20);
        let mut buffer = allocate(size).unwrap();
        buffer.as_mut_slice()[size - 1] = 1;
        release(buffer);
    }
}

#[quickcheck]
fn release_of_allocate_never_panics(size: u16) -> bool {
    match allocate(usize::from(size)) {
        Some(buffer) => {
            let ok = buffer.len() == usize::from(size) && buffer.as_slice().iter().all(|&b| b == 0);
            release(buffer);
            ok
        }
        None => size == 0,
    }
}

static HOOK_CALLS: AtomicUsize = AtomicUsize::new(0);

fn count_hook(_: &io::Error) {
    HOOK_CALLS.fetch_add(1, Ordering::SeqCst);
}

#[cfg(unix)]
#[test]
fn failed_unmap_is_swallowed_and_reported() {
    let buffer = allocate(page_size()).unwrap();
    let (address, len) = buffer.into_raw();
    let failures = release_failures();
    let previous = set_release_failure_hook(Some(count_hook));

    // A misaligned address makes munmap fail with EINVAL without touching
    // the mapping.
    // SAFETY: the call fails before anything is unmapped.
    unsafe { release_raw(address + 1, len) };

    assert!(release_failures() > failures);
    assert!(HOOK_CALLS.load(Ordering::SeqCst) >= 1);
    set_release_failure_hook(previous);

    // SAFETY: the region is still mapped with its original size.
    unsafe { release_raw(address, len) };
}

#[test]
fn pool_rejects_zero_requests() {
    let pool = BufferPool::default();
    assert!(pool.acquire(0).is_none());
    assert_eq!(pool.stats(), PoolStats::default());
}

#[test]
fn pool_rounds_to_pages() {
    let pool = BufferPool::default();
    let buffer = pool.acquire(1).unwrap();
    assert_eq!(buffer.len(), page_size());
    pool.release(buffer);
}

#[test]
fn pool_reuses_and_rezeroes_regions() {
    let pool = BufferPool::new(PoolConfig { max_cached: 4 });
    let size = 2 * page_size();

    let mut first = pool.acquire(size).unwrap();
    first.as_mut_slice().fill(0xFF);
    let address = first.as_ptr();
    pool.release(first);
    assert_eq!(pool.stats().cached, 1);

    let second = pool.acquire(size - 5).unwrap();
    assert_eq!(second.as_ptr(), address);
    assert!(second.as_slice().iter().all(|&b| b == 0));

    let stats = pool.stats();
    assert_eq!(stats.mapped, 1);
    assert_eq!(stats.reused, 1);
    assert_eq!(stats.in_use, 1);
    assert_eq!(stats.cached, 0);
    pool.release(second);
}

#[test]
fn pool_only_reuses_matching_sizes() {
    let pool = BufferPool::default();
    let small = pool.acquire(page_size()).unwrap();
    pool.release(small);

    let large = pool.acquire(4 * page_size()).unwrap();
    let stats = pool.stats();
    assert_eq!(stats.mapped, 2);
    assert_eq!(stats.reused, 0);
    assert_eq!(stats.cached, 1);
    pool.release(large);
}

#[test]
fn pool_unmaps_beyond_capacity() {
    let pool = BufferPool::new(PoolConfig { max_cached: 2 });
    let buffers: Vec<_> = (0..5).map(|_| pool.acquire(page_size()).unwrap()).collect();
    assert_eq!(pool.stats().in_use, 5);

    buffers.into_iter().for_each(|b| pool.release(b));
    let stats = pool.stats();
    assert_eq!(stats.cached, 2);
    assert_eq!(stats.in_use, 0);

    pool.trim();
    assert_eq!(pool.stats().cached, 0);
}

#[test]
fn pool_passes_foreign_lengths_through() {
    let pool = BufferPool::default();
    let foreign = allocate(10).unwrap();
    pool.release(foreign);
    assert_eq!(pool.stats().cached, 0);
}

#[test]
fn pool_ignores_foreign_page_sized_buffers() {
    let pool = BufferPool::default();
    let held = pool.acquire(page_size()).unwrap();

    pool.release(allocate(page_size()).unwrap());
    let stats = pool.stats();
    assert_eq!(stats.in_use, 1);
    assert_eq!(stats.cached, 0);

    pool.release(held);
    let stats = pool.stats();
    assert_eq!(stats.in_use, 0);
    assert_eq!(stats.cached, 1);
}

#[test]
fn pool_is_shareable_across_threads() {
    let pool = BufferPool::new(PoolConfig { max_cached: 8 });
    thread::scope(|s| {
        for t in 0..4u8 {
            let pool = &pool;
            s.spawn(move || {
                for _ in 0..200 {
                    let mut buffer = pool.acquire(page_size() * 2).unwrap();
                    assert!(buffer.as_slice().iter().all(|&b| b == 0));
                    buffer.as_mut_slice().fill(t + 1);
                    pool.release(buffer);
                }
            });
        }
    });

    let stats = pool.stats();
    assert_eq!(stats.in_use, 0);
    assert_eq!(stats.mapped + stats.reused, 800);
    assert!(stats.cached <= 8);
}
