#[cfg(simd_x86_64)]
mod avx2;
#[cfg(simd_neon)]
mod neon;
mod rust;
#[cfg(simd_x86_64)]
mod sse2;


use std::num::NonZeroUsize;

use crate::{cpu::CpuFeatureLevel, frame::LumaFrame, motion::MotionVector};

/// Computes the sum of absolute differences between the `block_size ×
/// block_size` block at `(x, y)` in `prev` and the block at `(x + dx, y + dy)`
/// in `curr`.
///
/// Every sampled coordinate is clamped to its frame independently, so blocks
/// that hang over (or lie entirely outside) the picture repeat the edge
/// pixels instead of faulting. Any `x`, `y` and `mv` are accepted.
///
/// Both frames are expected to have the same dimensions. The total is
/// saturated at `u32::MAX`, which only a block wider than 4104 pixels can
/// reach.
///
/// Uses the fastest kernel available on this CPU; see
/// [`block_difference_with_cpu`] to pick one explicitly.
#[must_use]
#[inline]
pub fn block_difference(
    prev: &LumaFrame<'_>,
    curr: &LumaFrame<'_>,
    x: i32,
    y: i32,
    mv: MotionVector,
    block_size: NonZeroUsize,
) -> u32 {
    block_difference_with_cpu(CpuFeatureLevel::get(), prev, curr, x, y, mv, block_size)
}

/// [`block_difference`] on a specific kernel.
///
/// A level this machine cannot run falls back to the scalar kernel. All
/// kernels return identical totals.
#[must_use]
#[inline]
pub fn block_difference_with_cpu(
    cpu: CpuFeatureLevel,
    prev: &LumaFrame<'_>,
    curr: &LumaFrame<'_>,
    x: i32,
    y: i32,
    mv: MotionVector,
    block_size: NonZeroUsize,
) -> u32 {
    debug_assert!(prev.same_size(curr), "frames must share dimensions");

    let block = Block::new(x, y, mv, block_size);
    let total = match cpu.or_scalar() {
        #[cfg(simd_x86_64)]
        CpuFeatureLevel::Avx2 => {
            // SAFETY: `or_scalar` only keeps levels the CPU supports.
            block_difference_rows(prev, curr, &block, |src, dst| unsafe {
                avx2::sad_row_internal(src, dst)
            })
        }
        #[cfg(simd_x86_64)]
        CpuFeatureLevel::Sse2 => {
            // SAFETY: SSE2 is part of the `x86_64` baseline.
            block_difference_rows(prev, curr, &block, |src, dst| unsafe {
                sse2::sad_row_internal(src, dst)
            })
        }
        #[cfg(simd_neon)]
        CpuFeatureLevel::Neon => {
            // SAFETY: NEON is part of the `aarch64` baseline.
            block_difference_rows(prev, curr, &block, |src, dst| unsafe {
                neon::sad_row_internal(src, dst)
            })
        }
        _ => rust::block_difference_internal(prev, curr, &block),
    };

    u32::try_from(total).unwrap_or(u32::MAX)
}

/// A block query with coordinates widened so that no sum can overflow.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Block {
    pub x: i64,
    pub y: i64,
    pub dx: i64,
    pub dy: i64,
    pub size: i64,
}

impl Block {
    fn new(x: i32, y: i32, mv: MotionVector, size: NonZeroUsize) -> Self {
        Block {
            x: x.into(),
            y: y.into(),
            dx: mv.dx.into(),
            dy: mv.dy.into(),
            size: i64::try_from(size.get()).unwrap_or(i64::MAX),
        }
    }
}

/// Range of block columns `[lo, hi)` for which both the reference and the
/// displaced sample fall inside their rows, so no clamping is needed there.
fn interior_span(prev: &LumaFrame<'_>, curr: &LumaFrame<'_>, block: &Block) -> (i64, i64) {
    let src_x = block.x;
    let dst_x = block.x + block.dx;
    let lo = 0.max(-src_x).max(-dst_x).min(block.size);
    let hi = block
        .size
        .min(prev.width().get() as i64 - src_x)
        .min(curr.width().get() as i64 - dst_x)
        .max(lo);
    (lo, hi)
}

/// Shared driver for the lane-parallel kernels.
///
/// The columns that need clamping are read one at a time through
/// [`LumaFrame::sample`]. The contiguous interior of each row is handed to
/// `sad_row` as two equal-length slices.
fn block_difference_rows<F>(
    prev: &LumaFrame<'_>,
    curr: &LumaFrame<'_>,
    block: &Block,
    sad_row: F,
) -> u64
where
    F: Fn(&[u8], &[u8]) -> u64,
{
    let (lo, hi) = interior_span(prev, curr, block);
    let src_x = block.x;
    let dst_x = block.x + block.dx;

    (0..block.size)
        .map(|by| {
            let src_row = prev.row(prev.clamp_y(block.y + by));
            let dst_row = curr.row(curr.clamp_y(block.y + block.dy + by));

            let edge = |bx: i64| {
                let p = prev.sample(src_x + bx, block.y + by);
                let c = curr.sample(dst_x + bx, block.y + block.dy + by);
                u64::from(p.abs_diff(c))
            };
            let mut sum: u64 = (0..lo).chain(hi..block.size).map(edge).sum();

            if lo < hi {
                let src = &src_row[(src_x + lo) as usize..(src_x + hi) as usize];
                let dst = &dst_row[(dst_x + lo) as usize..(dst_x + hi) as usize];
                sum += sad_row(src, dst);
            }
            sum
        })
        .sum()
}
