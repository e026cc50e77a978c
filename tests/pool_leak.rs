#![cfg(target_os = "linux")]
#![allow(clippy::unwrap_used)]

use std::fs;

use interp_kernels::{allocate, pool::BufferPool, release};

/// Virtual size of this process in KiB.
fn vm_size_kib() -> u64 {
    let status = fs::read_to_string("/proc/self/status").unwrap();
    status
        .lines()
        .find_map(|line| line.strip_prefix("VmSize:"))
        .and_then(|rest| rest.trim().trim_end_matches("kB").trim().parse().ok())
        .unwrap()
}

const REGION: usize = 8 << 20;
const LIMIT_KIB: u64 = 64 << 10;

fn assert_bounded(before: u64, after: u64) {
    assert!(
        after.saturating_sub(before) < LIMIT_KIB,
        "address space grew from {} KiB to {} KiB",
        before,
        after
    );
}

// One test per binary so no other thread maps memory while VmSize is sampled.
#[test]
fn released_regions_are_returned_to_the_os() {
    let before = vm_size_kib();
    for i in 0..1000 {
        let mut buffer = allocate(REGION).unwrap();
        let slice = buffer.as_mut_slice();
        slice[0] = i as u8;
        slice[REGION - 1] = i as u8;
        release(buffer);
    }
    assert_bounded(before, vm_size_kib());

    let pool = BufferPool::default();
    let before = vm_size_kib();
    for _ in 0..1000 {
        let buffer = pool.acquire(REGION).unwrap();
        pool.release(buffer);
    }
    assert_eq!(pool.stats().mapped, 1);
    pool.trim();
    assert_bounded(before, vm_size_kib());
}
