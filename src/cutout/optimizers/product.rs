use tracing::debug;

use crate::{
    cutout::{
        color::{color_distance, luminance},
        morphology::{is_transition_pixel, NEAR_TRANSPARENT},
        optimizers::{changed_pixels, MaskOptimizer, RefineContext},
    },
    options::ProcessingOptions,
    utils::index_of,
    AlphaMask,
};

/// Semi-transparent pixels darker than this are treated as cast shadow.
const SHADOW_LUMINANCE: f32 = 50.0;
/// Upper alpha bound of a shadow candidate.
const SHADOW_MAX_ALPHA: u8 = 200;
/// Partially transparent pixels this close to the background are residue.
const RESIDUE_DISTANCE: f32 = 30.0;

/// Repairs for product shots: crisp edges, shadow removal and background
/// residue cleanup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProductOptimizer {
    pub sharp_edges: bool,
    pub remove_shadows: bool,
    pub clean_background: bool,
}

impl ProductOptimizer {
    pub const fn new(options: &ProcessingOptions) -> Self {
        Self {
            sharp_edges: options.sharp_edges,
            remove_shadows: options.remove_shadows,
            clean_background: options.clean_background,
        }
    }

    /// Snaps boundary pixels to 0 or 255 depending on which side of 128
    /// their alpha lies.
    pub fn sharpen_edges(mask: &mut AlphaMask) -> usize {
        let (width, height) = mask.dimensions();
        let previous = mask.clone();
        let before = previous.as_raw();
        let alpha: &mut [u8] = mask;
        let mut snapped = 0;

        for y in 0..height {
            for x in 0..width {
                if is_transition_pixel(before, width, height, x, y) {
                    let i = index_of(width, x, y);
                    alpha[i] = if before[i] >= 128 { u8::MAX } else { 0 };
                    snapped += 1;
                }
            }
        }
        snapped
    }

    /// Clears semi-transparent pixels whose original colour is dark.
    pub fn remove_shadows(context: &RefineContext<'_>, mask: &mut AlphaMask) -> usize {
        let alpha: &mut [u8] = mask;
        let mut removed = 0;
        for (i, value) in alpha.iter_mut().enumerate() {
            if *value > NEAR_TRANSPARENT
                && *value < SHADOW_MAX_ALPHA
                && luminance(context.color_at(i)) < SHADOW_LUMINANCE
            {
                *value = 0;
                removed += 1;
            }
        }
        removed
    }

    /// Clears partially transparent pixels whose original colour is close to
    /// the background.
    pub fn clean_background(context: &RefineContext<'_>, mask: &mut AlphaMask) -> usize {
        let alpha: &mut [u8] = mask;
        let mut cleaned = 0;
        for (i, value) in alpha.iter_mut().enumerate() {
            if *value > 0
                && *value < u8::MAX
                && color_distance(context.color_at(i), context.background) < RESIDUE_DISTANCE
            {
                *value = 0;
                cleaned += 1;
            }
        }
        cleaned
    }
}

impl MaskOptimizer for ProductOptimizer {
    fn optimize(&self, context: &RefineContext<'_>, mask: &mut AlphaMask) -> usize {
        let before = mask.clone();

        let snapped = if self.sharp_edges {
            Self::sharpen_edges(mask)
        } else {
            0
        };
        let shadows = if self.remove_shadows {
            Self::remove_shadows(context, mask)
        } else {
            0
        };
        let residue = if self.clean_background {
            Self::clean_background(context, mask)
        } else {
            0
        };

        let changed = changed_pixels(&before, mask);
        debug!(snapped, shadows, residue, changed, "product optimizer");
        changed
    }
}
