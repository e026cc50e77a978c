//! Low-level kernels for a frame-interpolation pipeline.
//!
//! Two independent pieces live here:
//!
//! - [`block_difference`], the sum-of-absolute-differences cost a motion
//!   search uses to compare a block of the previous frame with a displaced
//!   block of the current one. Coordinates outside the picture are clamped to
//!   the nearest edge pixel, and lane-parallel kernels are selected at
//!   runtime that return exactly what the scalar kernel returns.
//! - [`pool`], page-backed buffers mapped straight from the operating system
//!   so large pixel buffers live outside any managed heap.
//!
//! [`estimate_motion`] is a full-search motion estimator built on the cost
//! function, and [`ffi`] exposes the pieces over a C ABI.

mod cpu;
mod error;
pub mod ffi;
mod frame;
pub mod interp;
mod me;
mod motion;
pub mod pool;
mod sad;

pub use crate::{
    cpu::{CPU_TARGET_ENV, CpuFeatureLevel},
    error::Error,
    frame::LumaFrame,
    me::{BlockMotion, MotionField, MotionSearchConfig, estimate_motion},
    motion::MotionVector,
    pool::{NativeBuffer, allocate, release},
    sad::{block_difference, block_difference_with_cpu},
};
