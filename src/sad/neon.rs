use std::arch::aarch64::*;

// Each u32 lane gains at most 2 * 255 * 2 per chunk, so flush well before
// the accumulator could wrap.
const CHUNKS_PER_FLUSH: usize = 1 << 16;

/// SAD of two equal-length rows, 16 pixels per step.
///
/// # Safety
///
/// The CPU must support NEON.
#[target_feature(enable = "neon")]
pub(super) unsafe fn sad_row_internal(src: &[u8], dst: &[u8]) -> u64 {
    debug_assert_eq!(src.len(), dst.len());

    let src_chunks = src.chunks_exact(16);
    let dst_chunks = dst.chunks_exact(16);
    let (src_rem, dst_rem) = (src_chunks.remainder(), dst_chunks.remainder());

    let mut total = 0u64;
    let mut acc = vdupq_n_u32(0);
    for (i, (s, d)) in src_chunks.zip(dst_chunks).enumerate() {
        let s = vld1q_u8(s.as_ptr());
        let d = vld1q_u8(d.as_ptr());
        // |s - d| per lane, then pairwise widen u8 -> u16 -> u32.
        let diff = vabdq_u8(s, d);
        acc = vpadalq_u16(acc, vpaddlq_u8(diff));

        if (i + 1) % CHUNKS_PER_FLUSH == 0 {
            total += u64::from(vaddvq_u32(acc));
            acc = vdupq_n_u32(0);
        }
    }

    total + u64::from(vaddvq_u32(acc)) + super::rust::sad_row_internal(src_rem, dst_rem)
}
