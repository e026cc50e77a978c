//! C ABI used by the managed side of the pipeline.
//!
//! Every entry point reports failure through a sentinel instead of
//! unwinding: `0` for addresses, `-1` for invalid arguments and `-2` for
//! operations that are not implemented.

use std::{num::NonZeroUsize, slice};

use log::debug;

use crate::{
    Error,
    frame::LumaFrame,
    interp,
    motion::MotionVector,
    pool,
    sad::block_difference,
};

/// Returned for null pointers, non-positive sizes and short buffers.
pub const INVALID_ARGUMENT: i32 = -1;
/// Returned by entry points without a defined behavior.
pub const UNSUPPORTED: i32 = -2;

/// Maps `size` bytes of zeroed, private, anonymous memory.
///
/// Returns the base address, or `0` if `size` is not positive or the mapping
/// failed.
#[unsafe(no_mangle)]
pub extern "C" fn interp_alloc(size: i32) -> i64 {
    let Ok(size) = usize::try_from(size) else {
        debug!("alloc: negative size {}", size);
        return 0;
    };
    match pool::allocate(size) {
        Some(buffer) => buffer.into_raw().0 as i64,
        None => {
            debug!("alloc: no mapping for {} bytes", size);
            0
        }
    }
}

/// Unmaps a region returned by [`interp_alloc`]. `0` is ignored and unmap
/// failures are swallowed.
///
/// # Safety
///
/// `size` must be the value passed to the matching [`interp_alloc`] call and
/// the region must not be used afterwards.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn interp_free(address: i64, size: i32) {
    if address == 0 {
        return;
    }
    // A negative size cannot describe a mapping; passing 0 lets the OS
    // reject it through the normal swallowed-failure path.
    let size = usize::try_from(size).unwrap_or(0);
    pool::release_raw(address as usize, size);
}

/// SAD between the `block_size` block at `(x, y)` in `prev` and the block at
/// `(x + dx, y + dy)` in `curr`, both `width × height` luma rasters.
///
/// Returns the non-negative cost, or [`INVALID_ARGUMENT`].
///
/// # Safety
///
/// `prev` and `curr` must each point to `prev_len` / `curr_len` readable
/// bytes, or be null.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn interp_block_difference(
    prev: *const u8,
    prev_len: usize,
    curr: *const u8,
    curr_len: usize,
    x: i32,
    y: i32,
    dx: i32,
    dy: i32,
    width: i32,
    height: i32,
    block_size: i32,
) -> i32 {
    let checked = block_size_from(block_size)
        .and_then(|bs| Ok((bs, frame_pair(prev, prev_len, curr, curr_len, width, height)?)));
    let (block_size, (prev, curr)) = match checked {
        Ok(args) => args,
        Err(e) => {
            debug!("block_difference: {}", e);
            return INVALID_ARGUMENT;
        }
    };

    let sad = block_difference(&prev, &curr, x, y, MotionVector::new(dx, dy), block_size);
    i32::try_from(sad).unwrap_or(i32::MAX)
}

/// Fractional offset between two frames, written to `out[0..2]`.
///
/// Always returns [`UNSUPPORTED`] after validating its arguments, leaving
/// `out` untouched.
///
/// # Safety
///
/// Same as [`interp_block_difference`]; `out` must point to two writable
/// `f32` values or be null.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn interp_sub_pixel_offset(
    prev: *const u8,
    prev_len: usize,
    curr: *const u8,
    curr_len: usize,
    width: i32,
    height: i32,
    out: *mut f32,
) -> i32 {
    if out.is_null() {
        return INVALID_ARGUMENT;
    }
    let (prev, curr) = match frame_pair(prev, prev_len, curr, curr_len, width, height) {
        Ok(frames) => frames,
        Err(_) => return INVALID_ARGUMENT,
    };
    match interp::sub_pixel_offset(&prev, &curr) {
        Ok([ox, oy]) => {
            out.write(ox);
            out.add(1).write(oy);
            0
        }
        Err(e) => status(&e),
    }
}

/// Writes the frame at blend position `factor` into `dst`.
///
/// Always returns [`UNSUPPORTED`] after validating its arguments, leaving
/// `dst` untouched.
///
/// # Safety
///
/// Same as [`interp_block_difference`]; `dst` must point to `dst_len`
/// writable bytes or be null.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn interp_apply_interpolation(
    prev: *const u8,
    prev_len: usize,
    curr: *const u8,
    curr_len: usize,
    dst: *mut u8,
    dst_len: usize,
    width: i32,
    height: i32,
    factor: f32,
) -> i32 {
    if dst.is_null() {
        return INVALID_ARGUMENT;
    }
    let (prev, curr) = match frame_pair(prev, prev_len, curr, curr_len, width, height) {
        Ok(frames) => frames,
        Err(_) => return INVALID_ARGUMENT,
    };
    let dst = slice::from_raw_parts_mut(dst, dst_len);
    match interp::interpolate_into(&prev, &curr, dst, factor) {
        Ok(()) => 0,
        Err(e) => status(&e),
    }
}

fn status(error: &Error) -> i32 {
    match error {
        Error::Unsupported(_) => UNSUPPORTED,
        _ => INVALID_ARGUMENT,
    }
}

fn block_size_from(block_size: i32) -> Result<NonZeroUsize, Error> {
    usize::try_from(block_size)
        .ok()
        .and_then(NonZeroUsize::new)
        .ok_or(Error::InvalidBlockSize(block_size.into()))
}

/// Builds the two frame views, rejecting null pointers and bad geometry.
unsafe fn frame_pair<'a>(
    prev: *const u8,
    prev_len: usize,
    curr: *const u8,
    curr_len: usize,
    width: i32,
    height: i32,
) -> Result<(LumaFrame<'a>, LumaFrame<'a>), Error> {
    let (Ok(w), Ok(h)) = (usize::try_from(width), usize::try_from(height)) else {
        return Err(Error::InvalidGeometry {
            width: 0,
            height: 0,
            stride: 0,
        });
    };
    if prev.is_null() || curr.is_null() {
        return Err(Error::BufferTooSmall {
            needed: w.saturating_mul(h),
            actual: 0,
        });
    }
    let prev = slice::from_raw_parts(prev, prev_len);
    let curr = slice::from_raw_parts(curr, curr_len);
    Ok((LumaFrame::new(prev, w, h)?, LumaFrame::new(curr, w, h)?))
}
