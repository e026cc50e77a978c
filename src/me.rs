use std::{num::NonZeroUsize, time::Instant};

use log::debug;
use rayon::iter::{IntoParallelIterator, ParallelIterator};

use crate::{
    Error,
    cpu::CpuFeatureLevel,
    frame::LumaFrame,
    motion::MotionVector,
    sad::block_difference_with_cpu,
};

/// Options for [`estimate_motion`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MotionSearchConfig {
    /// Side of the square blocks the frame is divided into.
    pub block_size: NonZeroUsize,
    /// Largest displacement tried along each axis.
    pub search_range: u16,
    /// Kernel used to score candidates.
    pub cpu: CpuFeatureLevel,
}

impl Default for MotionSearchConfig {
    #[inline]
    fn default() -> Self {
        MotionSearchConfig {
            block_size: NonZeroUsize::new(16).unwrap_or(NonZeroUsize::MIN),
            search_range: 8,
            cpu: CpuFeatureLevel::get(),
        }
    }
}

/// Best candidate found for one block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize))]
pub struct BlockMotion {
    /// Displacement from the block in the previous frame to the current one.
    pub mv: MotionVector,
    /// SAD at that displacement.
    pub cost: u32,
}

/// One vector per block, stored row-major.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize))]
pub struct MotionField {
    /// Blocks per row.
    pub cols: usize,
    /// Block rows.
    pub rows: usize,
    /// Block side in pixels.
    pub block_size: usize,
    /// `cols * rows` results.
    pub vectors: Vec<BlockMotion>,
}

impl MotionField {
    /// The result for the block in column `col` of row `row`.
    #[must_use]
    #[inline]
    pub fn get(&self, col: usize, row: usize) -> Option<&BlockMotion> {
        if col >= self.cols {
            return None;
        }
        self.vectors.get(row * self.cols + col)
    }

    /// Average SAD over all blocks.
    #[must_use]
    #[inline]
    pub fn mean_cost(&self) -> f64 {
        if self.vectors.is_empty() {
            return 0.0;
        }
        let total: u64 = self.vectors.iter().map(|b| u64::from(b.cost)).sum();
        total as f64 / self.vectors.len() as f64
    }
}

/// Finds, for every block of `prev`, the displacement into `curr` with the
/// lowest SAD.
///
/// The frame is covered by `ceil(width / bs) × ceil(height / bs)` blocks;
/// partial blocks on the right and bottom edges are scored with edge
/// clamping. Every displacement in `[-range, range]²` is tried. Ties go to
/// the shorter vector, so a static scene yields zero vectors.
///
/// # Errors
///
/// - `GeometryMismatch` if the frames differ in size.
#[inline]
pub fn estimate_motion(
    prev: &LumaFrame<'_>,
    curr: &LumaFrame<'_>,
    cfg: &MotionSearchConfig,
) -> Result<MotionField, Error> {
    if !prev.same_size(curr) {
        return Err(Error::GeometryMismatch(
            prev.width().get(),
            prev.height().get(),
            curr.width().get(),
            curr.height().get(),
        ));
    }

    let start = Instant::now();
    let bs = cfg.block_size.get();
    let cols = prev.width().get().div_ceil(bs);
    let rows = prev.height().get().div_ceil(bs);

    let vectors = (0..rows)
        .into_par_iter()
        .map(|row| {
            (0..cols)
                .map(|col| search_block(prev, curr, col * bs, row * bs, cfg))
                .collect::<Vec<_>>()
        })
        .collect::<Vec<_>>()
        .concat();

    let field = MotionField {
        cols,
        rows,
        block_size: bs,
        vectors,
    };
    debug!(
        "[ME] {}x{} blocks of {}px, range {}, mean cost {:.1}, {:?}",
        cols,
        rows,
        bs,
        cfg.search_range,
        field.mean_cost(),
        start.elapsed()
    );
    Ok(field)
}

fn search_block(
    prev: &LumaFrame<'_>,
    curr: &LumaFrame<'_>,
    x: usize,
    y: usize,
    cfg: &MotionSearchConfig,
) -> BlockMotion {
    // Frame dimensions are bounded by `i32::MAX`, and so are block origins.
    let (x, y) = (x as i32, y as i32);
    let range = i32::from(cfg.search_range);
    let score = |mv| block_difference_with_cpu(cfg.cpu, prev, curr, x, y, mv, cfg.block_size);

    let mut best = BlockMotion {
        mv: MotionVector::ZERO,
        cost: score(MotionVector::ZERO),
    };
    if best.cost == 0 {
        return best;
    }
    for dy in -range..=range {
        for dx in -range..=range {
            let mv = MotionVector::new(dx, dy);
            let cost = score(mv);
            if cost < best.cost || (cost == best.cost && mv.l1_norm() < best.mv.l1_norm()) {
                best = BlockMotion { mv, cost };
            }
        }
    }
    best
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, reason = "allow in test files")]

    use rand::{Rng, SeedableRng};
    use rand_xoshiro::Xoshiro256PlusPlus;

    use super::*;

    fn noise(width: usize, height: usize, seed: u64) -> Vec<u8> {
        let mut rng = Xoshiro256PlusPlus::seed_from_u64(seed);
        (0..width * height).map(|_| rng.random::<u8>()).collect()
    }

    /// `curr(x, y) = prev(x - dx, y - dy)` with edge clamping.
    fn translate(src: &[u8], width: usize, height: usize, dx: i64, dy: i64) -> Vec<u8> {
        let mut out = vec![0u8; width * height];
        for y in 0..height {
            for x in 0..width {
                let sx = (x as i64 - dx).clamp(0, width as i64 - 1) as usize;
                let sy = (y as i64 - dy).clamp(0, height as i64 - 1) as usize;
                out[y * width + x] = src[sy * width + sx];
            }
        }
        out
    }

    #[test]
    fn static_scene_has_zero_vectors() {
        let (w, h) = (64, 48);
        let data = noise(w, h, 3);
        let frame = LumaFrame::new(&data, w, h).unwrap();

        let field = estimate_motion(&frame, &frame, &MotionSearchConfig::default()).unwrap();
        assert_eq!((field.cols, field.rows), (4, 3));
        assert!(
            field
                .vectors
                .iter()
                .all(|b| b.mv == MotionVector::ZERO && b.cost == 0)
        );
        assert_eq!(field.mean_cost(), 0.0);
    }

    #[test]
    fn recovers_global_translation() {
        let (w, h) = (96, 64);
        let prev_data = noise(w, h, 11);
        let curr_data = translate(&prev_data, w, h, 5, -3);
        let prev = LumaFrame::new(&prev_data, w, h).unwrap();
        let curr = LumaFrame::new(&curr_data, w, h).unwrap();

        let field = estimate_motion(&prev, &curr, &MotionSearchConfig::default()).unwrap();
        // Interior blocks see the exact shift; edge blocks may not.
        for row in 1..field.rows - 1 {
            for col in 1..field.cols - 1 {
                let block = field.get(col, row).unwrap();
                assert_eq!(block.mv, MotionVector::new(5, -3), "block ({}, {})", col, row);
                assert_eq!(block.cost, 0);
            }
        }
    }

    #[test]
    fn partial_blocks_cover_the_frame() {
        let (w, h) = (50, 20);
        let data = noise(w, h, 5);
        let frame = LumaFrame::new(&data, w, h).unwrap();
        let cfg = MotionSearchConfig {
            block_size: NonZeroUsize::new(16).unwrap(),
            search_range: 1,
            cpu: CpuFeatureLevel::Rust,
        };

        let field = estimate_motion(&frame, &frame, &cfg).unwrap();
        assert_eq!((field.cols, field.rows), (4, 2));
        assert_eq!(field.vectors.len(), 8);
        assert!(field.get(4, 0).is_none());
        assert!(field.get(0, 2).is_none());
    }

    #[test]
    fn rejects_mismatched_frames() {
        let a = vec![0u8; 16 * 16];
        let b = vec![0u8; 16 * 8];
        let prev = LumaFrame::new(&a, 16, 16).unwrap();
        let curr = LumaFrame::new(&b, 16, 8).unwrap();
        assert_eq!(
            estimate_motion(&prev, &curr, &MotionSearchConfig::default()),
            Err(Error::GeometryMismatch(16, 16, 16, 8))
        );
    }

    #[test]
    fn every_kernel_finds_the_same_field() {
        let (w, h) = (70, 38);
        let prev_data = noise(w, h, 21);
        let curr_data = translate(&noise(w, h, 21), w, h, -2, 1);
        let prev = LumaFrame::new(&prev_data, w, h).unwrap();
        let curr = LumaFrame::new(&curr_data, w, h).unwrap();

        let reference = estimate_motion(
            &prev,
            &curr,
            &MotionSearchConfig {
                cpu: CpuFeatureLevel::Rust,
                ..MotionSearchConfig::default()
            },
        )
        .unwrap();
        for cpu in CpuFeatureLevel::ALL {
            let cfg = MotionSearchConfig {
                cpu,
                ..MotionSearchConfig::default()
            };
            assert_eq!(estimate_motion(&prev, &curr, &cfg).unwrap(), reference);
        }
    }
}
