//! Entry points the interpolation pipeline expects from this crate but whose
//! behavior has not been defined yet.
//!
//! The argument checks are real; past them both functions report
//! [`Error::Unsupported`] and leave their outputs untouched.

use crate::{Error, frame::LumaFrame};

/// Refines a block match to a fractional `[dx, dy]` offset between two frames.
///
/// # Errors
///
/// - `GeometryMismatch` if the frames differ in size.
/// - `Unsupported` otherwise; no refinement method has been chosen.
#[inline]
pub fn sub_pixel_offset(prev: &LumaFrame<'_>, curr: &LumaFrame<'_>) -> Result<[f32; 2], Error> {
    check_same_size(prev, curr)?;
    Err(Error::Unsupported("sub-pixel offset estimation"))
}

/// Writes the frame at position `factor` between `prev` and `curr` into
/// `dst`, a tightly packed raster of the same dimensions.
///
/// # Errors
///
/// - `GeometryMismatch` if the frames differ in size.
/// - `BufferTooSmall` if `dst` cannot hold a frame.
/// - `Unsupported` otherwise; no blending method has been chosen.
#[inline]
pub fn interpolate_into(
    prev: &LumaFrame<'_>,
    curr: &LumaFrame<'_>,
    dst: &mut [u8],
    factor: f32,
) -> Result<(), Error> {
    check_same_size(prev, curr)?;
    let needed = prev.width().get() * prev.height().get();
    if dst.len() < needed {
        return Err(Error::BufferTooSmall {
            needed,
            actual: dst.len(),
        });
    }
    let _ = factor;
    Err(Error::Unsupported("direct frame interpolation"))
}

fn check_same_size(prev: &LumaFrame<'_>, curr: &LumaFrame<'_>) -> Result<(), Error> {
    if prev.same_size(curr) {
        Ok(())
    } else {
        Err(Error::GeometryMismatch(
            prev.width().get(),
            prev.height().get(),
            curr.width().get(),
            curr.height().get(),
        ))
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, reason = "allow in test files")]

    use super::*;

    #[test]
    fn sub_pixel_offset_is_unsupported() {
        let data = [0u8; 16];
        let frame = LumaFrame::new(&data, 4, 4).unwrap();
        assert!(matches!(
            sub_pixel_offset(&frame, &frame),
            Err(Error::Unsupported(_))
        ));
    }

    #[test]
    fn interpolation_checks_arguments_first() {
        let a = [0u8; 16];
        let b = [0u8; 8];
        let big = LumaFrame::new(&a, 4, 4).unwrap();
        let small = LumaFrame::new(&b, 4, 2).unwrap();

        let mut dst = [7u8; 16];
        assert_eq!(
            interpolate_into(&big, &small, &mut dst, 0.5),
            Err(Error::GeometryMismatch(4, 4, 4, 2))
        );
        assert_eq!(
            interpolate_into(&big, &big, &mut dst[..15], 0.5),
            Err(Error::BufferTooSmall {
                needed: 16,
                actual: 15
            })
        );
        assert!(matches!(
            interpolate_into(&big, &big, &mut dst, 0.5),
            Err(Error::Unsupported(_))
        ));
        assert!(dst.iter().all(|&b| b == 7));
    }
}
