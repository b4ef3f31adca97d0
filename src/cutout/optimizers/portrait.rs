use tracing::debug;

use crate::{
    cutout::{
        color::{is_skin_tone, luminance, rgb_of},
        morphology::AlphaFilter,
        optimizers::{changed_pixels, MaskOptimizer, RefineContext},
    },
    options::ProcessingOptions,
    utils::{for_each_in_window, index_of},
    AlphaMask,
};

/// Skin pixels below this alpha are boosted.
const SKIN_RECOVERY_CEILING: u8 = 200;
const SKIN_ALPHA_BOOST: u8 = 100;
/// Half-size of the 5x5 hair gradient window.
const HAIR_WINDOW_RADIUS: u32 = 2;
/// Minimum luminance step for a pixel to count as a strand.
const HAIR_EDGE_THRESHOLD: f32 = 25.0;
/// Alpha boost is `HAIR_FEATHER_GAIN / strength`.
const HAIR_FEATHER_GAIN: f32 = 3_000.0;
/// A strand must have a pixel at least this opaque in its window.
const HAIR_SUBJECT_ALPHA: u8 = 200;
const PORTRAIT_MAX_HOLE: usize = 50;
const PORTRAIT_SMOOTH_RADIUS: u32 = 1;

/// Repairs for portraits: skin recovery, hair feathering, smoothing and
/// hole filling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PortraitOptimizer {
    pub protect_skin: bool,
    pub protect_hair: bool,
    pub smooth_edges: bool,
    pub fill_holes: bool,
}

impl PortraitOptimizer {
    pub const fn new(options: &ProcessingOptions) -> Self {
        Self {
            protect_skin: options.protect_skin,
            protect_hair: options.protect_hair,
            smooth_edges: options.smooth_edges,
            fill_holes: options.fill_holes,
        }
    }

    /// Raises alpha by 100 (capped at 255) for skin-toned pixels the
    /// segmenter left below 200.
    pub fn recover_skin(context: &RefineContext<'_>, mask: &mut AlphaMask) -> usize {
        let alpha: &mut [u8] = mask;
        let mut recovered = 0;
        for (i, value) in alpha.iter_mut().enumerate() {
            if *value < SKIN_RECOVERY_CEILING && is_skin_tone(context.color_at(i)) {
                *value = value.saturating_add(SKIN_ALPHA_BOOST);
                recovered += 1;
            }
        }
        recovered
    }

    /// Feathers thin strands back in near the subject.
    ///
    /// Strength is the largest luminance difference inside the 5x5 window.
    /// Weak gradients (fine wisps) receive more alpha than strong ones.
    pub fn enhance_hair(context: &RefineContext<'_>, mask: &mut AlphaMask) -> usize {
        let (width, height) = mask.dimensions();
        let luma: Vec<f32> = context
            .original
            .pixels()
            .map(|p| luminance(rgb_of(*p)))
            .collect();
        let previous = mask.clone();
        let before = previous.as_raw();
        let alpha: &mut [u8] = mask;
        let mut enhanced = 0;

        for y in 0..height {
            for x in 0..width {
                let i = index_of(width, x, y);
                if before[i] == u8::MAX {
                    continue;
                }

                let mut strength = 0.0f32;
                let mut near_subject = false;
                for_each_in_window(HAIR_WINDOW_RADIUS, width, height, x, y, |n| {
                    strength = strength.max((luma[n] - luma[i]).abs());
                    near_subject |= before[n] > HAIR_SUBJECT_ALPHA;
                });

                if near_subject && strength > HAIR_EDGE_THRESHOLD {
                    let headroom = f32::from(u8::MAX - before[i]);
                    let boost = (HAIR_FEATHER_GAIN / strength).min(headroom).round() as u8;
                    if boost > 0 {
                        alpha[i] = before[i] + boost;
                        enhanced += 1;
                    }
                }
            }
        }

        enhanced
    }
}

impl MaskOptimizer for PortraitOptimizer {
    fn optimize(&self, context: &RefineContext<'_>, mask: &mut AlphaMask) -> usize {
        let before = mask.clone();

        let skin = if self.protect_skin {
            Self::recover_skin(context, mask)
        } else {
            0
        };
        let hair = if self.protect_hair {
            Self::enhance_hair(context, mask)
        } else {
            0
        };
        if self.smooth_edges {
            *mask = mask.gaussian_blur_alpha(PORTRAIT_SMOOTH_RADIUS);
        }
        let filled = if self.fill_holes {
            mask.fill_holes_mut(PORTRAIT_MAX_HOLE)
        } else {
            0
        };

        let changed = changed_pixels(&before, mask);
        debug!(skin, hair, filled, changed, "portrait optimizer");
        changed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::create_uniform_mask;
    use crate::RasterImage;
    use image::{Luma, Rgb, Rgba};

    const SKIN: Rgba<u8> = Rgba([224, 172, 138, 255]);
    const BACKDROP: Rgba<u8> = Rgba([60, 90, 140, 255]);

    #[test]
    fn skin_alpha_is_boosted_and_capped() {
        let mut image = RasterImage::from_pixel(3, 1, SKIN);
        image.put_pixel(2, 0, BACKDROP);
        let context = RefineContext::new(&image, Rgb([60, 90, 140]));

        let mut mask = AlphaMask::new(3, 1);
        mask.put_pixel(1, 0, Luma([180]));

        assert_eq!(PortraitOptimizer::recover_skin(&context, &mut mask), 2);
        assert_eq!(mask.as_raw(), &vec![100, 255, 0]);
    }

    #[test]
    fn opaque_skin_is_left_alone() {
        let image = RasterImage::from_pixel(2, 2, SKIN);
        let context = RefineContext::new(&image, Rgb([0, 0, 0]));
        let mut mask = create_uniform_mask(2, 2, 230);
        assert_eq!(PortraitOptimizer::recover_skin(&context, &mut mask), 0);
        assert!(mask.pixels().all(|p| p[0] == 230));
    }

    #[test]
    fn strands_next_to_subject_are_feathered() {
        let mut image = RasterImage::from_pixel(12, 5, Rgba([220, 220, 220, 255]));
        let mut mask = AlphaMask::new(12, 5);
        for y in 0..5 {
            for x in 0..4 {
                image.put_pixel(x, y, Rgba([40, 30, 20, 255]));
                mask.put_pixel(x, y, Luma([255]));
            }
            // One-pixel strand the segmenter removed.
            image.put_pixel(5, y, Rgba([40, 30, 20, 255]));
        }
        let context = RefineContext::new(&image, Rgb([220, 220, 220]));

        assert!(PortraitOptimizer::enhance_hair(&context, &mut mask) > 0);
        let strand = mask.get_pixel(5, 2)[0];
        assert!(strand > 0 && strand < 255, "strand alpha {strand}");
        // Far from the subject nothing changes.
        assert_eq!(mask.get_pixel(11, 2)[0], 0);
        // The opaque subject is untouched.
        assert_eq!(mask.get_pixel(0, 0)[0], 255);
    }

    #[test]
    fn disabled_steps_do_nothing() {
        let options = ProcessingOptions {
            protect_skin: false,
            protect_hair: false,
            smooth_edges: false,
            fill_holes: false,
            ..ProcessingOptions::default()
        };
        let image = RasterImage::from_pixel(4, 4, SKIN);
        let context = RefineContext::new(&image, Rgb([0, 0, 0]));
        let mut mask = AlphaMask::new(4, 4);
        assert_eq!(PortraitOptimizer::new(&options).optimize(&context, &mut mask), 0);
    }

    #[test]
    fn full_sequence_fills_small_holes() {
        let image = RasterImage::from_pixel(12, 12, BACKDROP);
        let context = RefineContext::new(&image, Rgb([60, 90, 140]));
        let mut mask = create_uniform_mask(12, 12, 255);
        mask.put_pixel(6, 6, Luma([0]));
        mask.put_pixel(6, 7, Luma([0]));

        let optimizer = PortraitOptimizer::new(&ProcessingOptions::default());
        assert!(optimizer.optimize(&context, &mut mask) > 0);
        assert_eq!(mask.get_pixel(6, 6)[0], 255);
        assert_eq!(mask.get_pixel(6, 7)[0], 255);
    }
}
