use image::Rgb;
use tracing::debug;

use crate::{
    cutout::{
        alpha_mask::ModifyAlpha,
        color::{color_distance, rgb_of},
    },
    options::ProcessingProfile,
    AlphaMask, RasterImage,
};

/// Clears every pixel whose colour lies within `threshold` of `background`.
///
/// Pixels outside the threshold keep their current alpha. Returns the number
/// of pixels made transparent.
pub fn segment_by_background(
    original: &RasterImage,
    mask: &mut AlphaMask,
    background: Rgb<u8>,
    threshold: f32,
) -> usize {
    let mut cleared = 0;
    for (pixel, alpha) in original.pixels().zip(mask.pixels_mut()) {
        if alpha[0] != 0 && color_distance(rgb_of(*pixel), background) <= threshold {
            alpha[0] = 0;
            cleared += 1;
        }
    }
    cleared
}

/// Builds the coarse mask for `profile` from the original alpha channel.
///
/// This is the coarse step when no external segmentation is supplied.
pub fn initial_segmentation(
    original: &RasterImage,
    background: Rgb<u8>,
    profile: ProcessingProfile,
) -> AlphaMask {
    let mut mask = original.extract_alpha();
    let threshold = profile.segmentation_threshold();
    let cleared = segment_by_background(original, &mut mask, background, threshold);
    debug!(%profile, threshold, cleared, "initial colour-distance segmentation");
    mask
}
