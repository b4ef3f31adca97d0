use thiserror::Error;

/// Error type for mask refinement operations
///
/// Most operations in this crate are total over well-formed images and
/// masks. Heuristic misjudgements (a wrong profile, an over-eager
/// segmentation) are never reported here; only malformed inputs are.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RefineError {
    /// Image and mask dimensions do not match
    ///
    /// This error occurs when an externally supplied alpha mask is paired
    /// with a raster of a different size.
    #[error("Image and mask dimensions do not match: expected {expected:?}, actual {actual:?}")]
    DimensionMismatch {
        /// Expected dimensions (width, height)
        expected: (u32, u32),
        /// Actual dimensions (width, height)
        actual: (u32, u32),
    },

    /// The image has a zero width or height
    ///
    /// Ratio computations (border sampling, foreground ratio) are undefined
    /// for such an image.
    #[error("Image dimensions must be non-zero, got {width}x{height}")]
    EmptyImage { width: u32, height: u32 },

    /// A raw pixel buffer does not have the RGBA8 length for its dimensions
    #[error("Buffer of {actual} bytes does not match {width}x{height} RGBA8 ({expected} bytes)")]
    BufferSizeMismatch {
        width: u32,
        height: u32,
        expected: usize,
        actual: usize,
    },

    /// Invalid parameter provided to the operation
    ///
    /// This error is returned when a parameter value is invalid
    /// or outside the acceptable range for the operation.
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),
}
