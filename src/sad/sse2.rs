use std::{arch::x86_64::*, mem};

/// SAD of two equal-length rows, 16 pixels per step.
///
/// # Safety
///
/// The CPU must support SSE2.
#[target_feature(enable = "sse2")]
pub(super) unsafe fn sad_row_internal(src: &[u8], dst: &[u8]) -> u64 {
    debug_assert_eq!(src.len(), dst.len());

    let src_chunks = src.chunks_exact(16);
    let dst_chunks = dst.chunks_exact(16);
    let (src_rem, dst_rem) = (src_chunks.remainder(), dst_chunks.remainder());

    let mut acc = _mm_setzero_si128();
    for (s, d) in src_chunks.zip(dst_chunks) {
        let s = _mm_loadu_si128(s.as_ptr().cast());
        let d = _mm_loadu_si128(d.as_ptr().cast());
        // Two u64 lanes, each holding the SAD of 8 bytes.
        acc = _mm_add_epi64(acc, _mm_sad_epu8(s, d));
    }

    let lanes = mem::transmute::<__m128i, [u64; 2]>(acc);
    lanes.iter().sum::<u64>() + super::rust::sad_row_internal(src_rem, dst_rem)
}
