//! Profile-specific repairs of the coarse mask.
//!
//! Each optimizer reads colours from the untouched original raster and
//! rewrites the working alpha mask. The pipeline selects one per
//! [`ProcessingProfile`](crate::ProcessingProfile).

pub mod logo_text;
pub mod portrait;
pub mod product;

pub use logo_text::LogoTextOptimizer;
pub use portrait::PortraitOptimizer;
pub use product::ProductOptimizer;

use image::Rgb;

use crate::{AlphaMask, RasterImage};

/// Read-only inputs shared by the refinement stages.
#[derive(Debug, Clone, Copy)]
pub struct RefineContext<'a> {
    /// The raster as decoded; colours are always read from here
    pub original: &'a RasterImage,
    /// Estimated background colour
    pub background: Rgb<u8>,
}

impl<'a> RefineContext<'a> {
    pub const fn new(original: &'a RasterImage, background: Rgb<u8>) -> Self {
        Self {
            original,
            background,
        }
    }

    /// Original colour at flat index `i`.
    #[inline]
    pub fn color_at(&self, i: usize) -> Rgb<u8> {
        let raw = self.original.as_raw();
        Rgb([raw[i * 4], raw[i * 4 + 1], raw[i * 4 + 2]])
    }
}

/// A repair sequence applied to the coarse mask.
pub trait MaskOptimizer {
    /// Rewrites `mask` in place and returns the number of alpha values changed.
    fn optimize(&self, context: &RefineContext<'_>, mask: &mut AlphaMask) -> usize;
}

/// Counts positions where two equally sized masks differ.
pub(crate) fn changed_pixels(before: &AlphaMask, after: &AlphaMask) -> usize {
    before
        .as_raw()
        .iter()
        .zip(after.as_raw())
        .filter(|(a, b)| a != b)
        .count()
}
