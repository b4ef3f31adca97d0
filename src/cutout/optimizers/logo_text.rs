use tracing::debug;

use crate::{
    cutout::{
        color::{luminance, rgb_of},
        morphology::{count_neighbors, is_soft, AlphaFilter, NEAR_OPAQUE, NEAR_TRANSPARENT},
        optimizers::{changed_pixels, MaskOptimizer, RefineContext},
    },
    options::ProcessingOptions,
    utils::{for_each_neighbor, index_of, NEIGHBORS_8},
    AlphaMask,
};

/// Normalized 8-neighbour luminance contrast above which a pixel is a stroke edge.
const SHARP_EDGE_CONTRAST: f32 = 0.7;
/// Counter holes inside glyphs are small; background gaps are not.
const CHARACTER_MAX_HOLE: usize = 10;
/// Neighbours that must agree before a fringe pixel is snapped.
const FRINGE_MAJORITY: usize = 5;

/// Repairs for logos and lettering: stroke protection, counter filling and
/// anti-aliasing removal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LogoTextOptimizer {
    pub preserve_sharpness: bool,
    pub fill_character_holes: bool,
    pub remove_anti_aliasing: bool,
}

impl LogoTextOptimizer {
    pub const fn new(options: &ProcessingOptions) -> Self {
        Self {
            preserve_sharpness: options.preserve_sharpness,
            fill_character_holes: options.fill_character_holes,
            remove_anti_aliasing: options.remove_anti_aliasing,
        }
    }

    /// Forces fully opaque every pixel whose largest luminance difference to
    /// an 8-neighbour exceeds 70% of the range.
    pub fn preserve_sharp_edges(context: &RefineContext<'_>, mask: &mut AlphaMask) -> usize {
        let (width, height) = mask.dimensions();
        let luma: Vec<f32> = context
            .original
            .pixels()
            .map(|p| luminance(rgb_of(*p)) / 255.0)
            .collect();
        let alpha: &mut [u8] = mask;
        let mut protected = 0;

        for y in 0..height {
            for x in 0..width {
                let i = index_of(width, x, y);
                let mut contrast = 0.0f32;
                for_each_neighbor(&NEIGHBORS_8, width, height, x, y, |n| {
                    contrast = contrast.max((luma[n] - luma[i]).abs());
                });
                if contrast > SHARP_EDGE_CONTRAST && alpha[i] != u8::MAX {
                    alpha[i] = u8::MAX;
                    protected += 1;
                }
            }
        }
        protected
    }

    /// Snaps soft pixels to the state shared by at least five of their
    /// eight neighbours.
    pub fn remove_anti_aliasing(mask: &mut AlphaMask) -> usize {
        let (width, height) = mask.dimensions();
        let previous = mask.clone();
        let before = previous.as_raw();
        let alpha: &mut [u8] = mask;
        let mut snapped = 0;

        for y in 0..height {
            for x in 0..width {
                let i = index_of(width, x, y);
                if !is_soft(before[i]) {
                    continue;
                }
                let opaque = count_neighbors(before, width, height, x, y, |a| a > NEAR_OPAQUE);
                let transparent =
                    count_neighbors(before, width, height, x, y, |a| a < NEAR_TRANSPARENT);
                if opaque >= FRINGE_MAJORITY {
                    alpha[i] = u8::MAX;
                    snapped += 1;
                } else if transparent >= FRINGE_MAJORITY {
                    alpha[i] = 0;
                    snapped += 1;
                }
            }
        }
        snapped
    }
}

impl MaskOptimizer for LogoTextOptimizer {
    fn optimize(&self, context: &RefineContext<'_>, mask: &mut AlphaMask) -> usize {
        let before = mask.clone();

        let strokes = if self.preserve_sharpness {
            Self::preserve_sharp_edges(context, mask)
        } else {
            0
        };
        let counters = if self.fill_character_holes {
            mask.fill_holes_mut(CHARACTER_MAX_HOLE)
        } else {
            0
        };
        let fringe = if self.remove_anti_aliasing {
            Self::remove_anti_aliasing(mask)
        } else {
            0
        };

        let changed = changed_pixels(&before, mask);
        debug!(strokes, counters, fringe, changed, "logo/text optimizer");
        changed
    }
}
