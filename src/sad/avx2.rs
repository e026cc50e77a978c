use std::{arch::x86_64::*, mem};

/// SAD of two equal-length rows, 32 pixels per step.
///
/// # Safety
///
/// The CPU must support AVX2.
#[target_feature(enable = "avx2")]
pub(super) unsafe fn sad_row_internal(src: &[u8], dst: &[u8]) -> u64 {
    debug_assert_eq!(src.len(), dst.len());

    let src_chunks = src.chunks_exact(32);
    let dst_chunks = dst.chunks_exact(32);
    let (src_rem, dst_rem) = (src_chunks.remainder(), dst_chunks.remainder());

    let mut acc = _mm256_setzero_si256();
    for (s, d) in src_chunks.zip(dst_chunks) {
        let s = _mm256_loadu_si256(s.as_ptr().cast());
        let d = _mm256_loadu_si256(d.as_ptr().cast());
        acc = _mm256_add_epi64(acc, _mm256_sad_epu8(s, d));
    }

    let lanes = mem::transmute::<__m256i, [u64; 4]>(acc);
    // Up to 31 pixels remain; the SSE2 kernel takes 16 of them.
    lanes.iter().sum::<u64>() + super::sse2::sad_row_internal(src_rem, dst_rem)
}
