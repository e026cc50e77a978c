use super::Block;
use crate::frame::LumaFrame;

/// Scalar reference: one clamped read per pixel in both frames.
pub(super) fn block_difference_internal(
    prev: &LumaFrame<'_>,
    curr: &LumaFrame<'_>,
    block: &Block,
) -> u64 {
    (0..block.size)
        .map(|by| {
            (0..block.size)
                .map(|bx| {
                    let p = prev.sample(block.x + bx, block.y + by);
                    let c = curr.sample(block.x + block.dx + bx, block.y + block.dy + by);
                    u64::from(p.abs_diff(c))
                })
                .sum::<u64>()
        })
        .sum()
}

/// SAD of two equal-length rows.
#[cfg_attr(not(any(simd_x86_64, simd_neon)), allow(dead_code))]
pub(super) fn sad_row_internal(src: &[u8], dst: &[u8]) -> u64 {
    debug_assert_eq!(src.len(), dst.len());

    src.iter()
        .zip(dst)
        .map(|(&p1, &p2)| u64::from(p1.abs_diff(p2)))
        .sum()
}
