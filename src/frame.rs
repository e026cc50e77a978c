use std::{num::NonZeroUsize, slice};

use crate::Error;

/// A borrowed, read-only view of an 8-bit luma raster.
///
/// Rows are `stride` bytes apart and the first `width` bytes of each row are
/// picture. Every read performed by the scorers goes through
/// [`LumaFrame::sample`] or [`LumaFrame::row`], so a view can never be read
/// out of bounds.
#[derive(Debug, Clone, Copy)]
pub struct LumaFrame<'a> {
    data: &'a [u8],
    width: NonZeroUsize,
    height: NonZeroUsize,
    stride: NonZeroUsize,
}

impl<'a> LumaFrame<'a> {
    /// Wraps a tightly packed `width × height` raster.
    ///
    /// # Errors
    ///
    /// - `InvalidGeometry` if either dimension is zero or exceeds `i32::MAX`.
    /// - `BufferTooSmall` if `data` holds fewer than `width * height` bytes.
    #[inline]
    pub fn new(data: &'a [u8], width: usize, height: usize) -> Result<Self, Error> {
        Self::with_stride(data, width, height, width)
    }

    /// Wraps a raster whose rows are `stride` bytes apart.
    ///
    /// # Errors
    ///
    /// - `InvalidGeometry` if either dimension is zero or exceeds `i32::MAX`,
    ///   or if `stride < width`.
    /// - `BufferTooSmall` if `data` cannot hold `height` rows.
    #[inline]
    pub fn with_stride(
        data: &'a [u8],
        width: usize,
        height: usize,
        stride: usize,
    ) -> Result<Self, Error> {
        let invalid = Error::InvalidGeometry {
            width,
            height,
            stride,
        };
        // Block coordinates are `i32`, so the frame must be addressable by them.
        let limit = i32::MAX as usize;
        if width > limit || height > limit || stride < width {
            return Err(invalid);
        }
        let (Some(width), Some(height), Some(stride)) = (
            NonZeroUsize::new(width),
            NonZeroUsize::new(height),
            NonZeroUsize::new(stride),
        ) else {
            return Err(invalid);
        };

        let needed = stride
            .get()
            .checked_mul(height.get() - 1)
            .and_then(|n| n.checked_add(width.get()))
            .ok_or(invalid)?;
        if data.len() < needed {
            return Err(Error::BufferTooSmall {
                needed,
                actual: data.len(),
            });
        }

        Ok(LumaFrame {
            data,
            width,
            height,
            stride,
        })
    }

    /// Wraps signed byte storage, reinterpreting every sample as unsigned.
    ///
    /// # Errors
    ///
    /// Same as [`LumaFrame::new`].
    #[inline]
    pub fn from_signed(data: &'a [i8], width: usize, height: usize) -> Result<Self, Error> {
        // SAFETY: `i8` and `u8` have identical size and alignment and every
        // bit pattern is valid for both.
        let data = unsafe { slice::from_raw_parts(data.as_ptr().cast::<u8>(), data.len()) };
        Self::new(data, width, height)
    }

    /// Width in pixels.
    #[must_use]
    #[inline]
    pub const fn width(&self) -> NonZeroUsize {
        self.width
    }

    /// Height in pixels.
    #[must_use]
    #[inline]
    pub const fn height(&self) -> NonZeroUsize {
        self.height
    }

    /// Distance between rows in bytes.
    #[must_use]
    #[inline]
    pub const fn stride(&self) -> NonZeroUsize {
        self.stride
    }

    /// Whether both views have the same picture dimensions.
    #[must_use]
    #[inline]
    pub fn same_size(&self, other: &LumaFrame<'_>) -> bool {
        self.width == other.width && self.height == other.height
    }

    /// The `width` picture bytes of row `y`.
    ///
    /// # Panics
    ///
    /// - If `y >= height`.
    #[must_use]
    #[inline]
    pub fn row(&self, y: usize) -> &'a [u8] {
        assert!(y < self.height.get(), "row {} out of bounds", y);
        &self.data[y * self.stride.get()..][..self.width.get()]
    }

    /// Clamps a horizontal coordinate to `[0, width - 1]`.
    #[must_use]
    #[inline]
    pub fn clamp_x(&self, x: i64) -> usize {
        x.clamp(0, self.width.get() as i64 - 1) as usize
    }

    /// Clamps a vertical coordinate to `[0, height - 1]`.
    #[must_use]
    #[inline]
    pub fn clamp_y(&self, y: i64) -> usize {
        y.clamp(0, self.height.get() as i64 - 1) as usize
    }

    /// Reads the pixel at `(x, y)` after clamping both coordinates to the
    /// frame, so positions outside the picture repeat the nearest edge pixel.
    #[must_use]
    #[inline]
    pub fn sample(&self, x: i64, y: i64) -> u8 {
        self.data[self.clamp_y(y) * self.stride.get() + self.clamp_x(x)]
    }
}
