use thiserror::Error;

/// Errors reported by the fallible constructors and collaborator entry points.
///
/// The scoring hot path itself never fails once its frames are validated.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    /// A frame was described with a zero dimension or a stride narrower
    /// than its width.
    #[error("invalid frame geometry: {width}x{height} with stride {stride}")]
    InvalidGeometry {
        /// Requested width in pixels.
        width: usize,
        /// Requested height in pixels.
        height: usize,
        /// Requested row stride in pixels.
        stride: usize,
    },
    /// The pixel slice cannot hold the described frame.
    #[error("pixel buffer too small: need {needed} bytes, got {actual}")]
    BufferTooSmall {
        /// Bytes required by the frame geometry.
        needed: usize,
        /// Bytes actually supplied.
        actual: usize,
    },
    /// Two frames that must share dimensions do not.
    #[error("frame dimensions differ: {0}x{1} vs {2}x{3}")]
    GeometryMismatch(usize, usize, usize, usize),
    /// Block sizes must be positive.
    #[error("invalid block size {0}")]
    InvalidBlockSize(i64),
    /// A CPU level name that is not recognized.
    #[error("unknown cpu feature level `{0}`")]
    UnknownCpuLevel(String),
    /// An operation whose behavior has not been defined yet.
    #[error("{0} is not implemented")]
    Unsupported(&'static str),
}
