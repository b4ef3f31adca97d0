//! Profile-independent edge cleanup run after every optimizer.

use tracing::debug;

use crate::{
    cutout::{
        color::color_distance,
        morphology::{count_neighbors, is_soft, is_transition_pixel},
        optimizers::{changed_pixels, RefineContext},
    },
    utils::{for_each_in_window, index_of},
    AlphaMask,
};

/// Halo distance at zero intensity; scaled down by `1 - intensity`.
const HALO_BASE_DISTANCE: f32 = 60.0;
/// Pixels above this alpha are speckle candidates.
const SPECKLE_MIN_ALPHA: u8 = 200;
/// Neighbours below this alpha count as empty around a speckle.
const SPECKLE_EMPTY_ALPHA: u8 = 50;
const SPECKLE_MIN_EMPTY_NEIGHBORS: usize = 6;

/// Halo removal, transition smoothing and speckle removal.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EdgeCleanup {
    /// Aggressiveness in `[0, 1]`; higher keeps more edge detail.
    pub intensity: f32,
}

impl Default for EdgeCleanup {
    fn default() -> Self {
        Self { intensity: 0.8 }
    }
}

impl EdgeCleanup {
    pub const fn new(intensity: f32) -> Self {
        Self { intensity }
    }

    /// Colour distance below which an edge pixel is considered halo.
    pub fn halo_distance(&self) -> f32 {
        HALO_BASE_DISTANCE * (1.0 - self.intensity.clamp(0.0, 1.0))
    }

    /// Clears edge pixels whose original colour is close to the background.
    pub fn remove_halo(&self, context: &RefineContext<'_>, mask: &mut AlphaMask) -> usize {
        let (width, height) = mask.dimensions();
        let limit = self.halo_distance();
        let previous = mask.clone();
        let before = previous.as_raw();
        let alpha: &mut [u8] = mask;
        let mut removed = 0;

        for y in 0..height {
            for x in 0..width {
                if !is_transition_pixel(before, width, height, x, y) {
                    continue;
                }
                let i = index_of(width, x, y);
                if color_distance(context.color_at(i), context.background) < limit {
                    alpha[i] = 0;
                    removed += 1;
                }
            }
        }
        removed
    }

    /// 3x3 mean of the surrounding alpha, written only to soft pixels.
    pub fn smooth_transitions(mask: &mut AlphaMask) -> usize {
        let (width, height) = mask.dimensions();
        let previous = mask.clone();
        let before = previous.as_raw();
        let alpha: &mut [u8] = mask;
        let mut smoothed = 0;

        for y in 0..height {
            for x in 0..width {
                let i = index_of(width, x, y);
                if !is_soft(before[i]) {
                    continue;
                }
                let (mut sum, mut count) = (0u32, 0u32);
                for_each_in_window(1, width, height, x, y, |n| {
                    sum += u32::from(before[n]);
                    count += 1;
                });
                let mean = ((sum as f32) / (count as f32)).round() as u8;
                if mean != before[i] {
                    alpha[i] = mean;
                    smoothed += 1;
                }
            }
        }
        smoothed
    }

    /// Clears isolated opaque pixels surrounded by near-transparent ones.
    pub fn remove_speckles(mask: &mut AlphaMask) -> usize {
        let (width, height) = mask.dimensions();
        let previous = mask.clone();
        let before = previous.as_raw();
        let alpha: &mut [u8] = mask;
        let mut removed = 0;

        for y in 0..height {
            for x in 0..width {
                let i = index_of(width, x, y);
                if before[i] > SPECKLE_MIN_ALPHA
                    && count_neighbors(before, width, height, x, y, |a| a < SPECKLE_EMPTY_ALPHA)
                        >= SPECKLE_MIN_EMPTY_NEIGHBORS
                {
                    alpha[i] = 0;
                    removed += 1;
                }
            }
        }
        removed
    }

    /// Runs the three steps in order and returns the number of alpha values changed.
    pub fn apply(&self, context: &RefineContext<'_>, mask: &mut AlphaMask) -> usize {
        let before = mask.clone();
        let halo = self.remove_halo(context, mask);
        let smoothed = Self::smooth_transitions(mask);
        let speckles = Self::remove_speckles(mask);

        let changed = changed_pixels(&before, mask);
        debug!(intensity = self.intensity, halo, smoothed, speckles, changed, "edge cleanup");
        changed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cutout::{background::detect_background_color, segment::initial_segmentation};
    use crate::test_utils::{create_square_on_background, create_uniform_mask};
    use crate::{ProcessingProfile, RasterImage};
    use image::{Luma, Rgb, Rgba};

    fn row_mask(values: &[u8]) -> AlphaMask {
        AlphaMask::from_raw(values.len() as u32, 1, values.to_vec()).unwrap()
    }

    #[test]
    fn halo_distance_shrinks_with_intensity() {
        assert_eq!(EdgeCleanup::new(0.0).halo_distance(), 60.0);
        assert!((EdgeCleanup::default().halo_distance() - 12.0).abs() < 1e-4);
        assert_eq!(EdgeCleanup::new(1.0).halo_distance(), 0.0);
    }

    #[test]
    fn background_coloured_fringe_is_removed() {
        let mut image = RasterImage::from_pixel(3, 1, Rgba([0, 0, 200, 255]));
        image.put_pixel(1, 0, Rgba([250, 250, 250, 255]));
        let context = RefineContext::new(&image, Rgb([255, 255, 255]));
        let mut mask = row_mask(&[0, 128, 255]);

        assert_eq!(EdgeCleanup::default().remove_halo(&context, &mut mask), 1);
        assert_eq!(mask.as_raw(), &vec![0, 0, 255]);
    }

    #[test]
    fn subject_coloured_fringe_is_kept() {
        let image = RasterImage::from_pixel(3, 1, Rgba([0, 0, 200, 255]));
        let context = RefineContext::new(&image, Rgb([255, 255, 255]));
        let mut mask = row_mask(&[0, 128, 255]);
        assert_eq!(EdgeCleanup::new(0.0).remove_halo(&context, &mut mask), 0);
    }

    #[test]
    fn smoothing_only_touches_soft_pixels() {
        let mut mask = row_mask(&[0, 100, 255, 255]);
        assert_eq!(EdgeCleanup::smooth_transitions(&mut mask), 1);
        // (0 + 100 + 255) / 3
        assert_eq!(mask.as_raw(), &vec![0, 118, 255, 255]);
    }

    #[test]
    fn isolated_opaque_pixel_is_speckle() {
        let mut mask = AlphaMask::new(5, 5);
        mask.put_pixel(2, 2, Luma([255]));
        assert_eq!(EdgeCleanup::remove_speckles(&mut mask), 1);
        assert_eq!(mask.get_pixel(2, 2)[0], 0);
    }

    #[test]
    fn solid_region_has_no_speckles() {
        let mut mask = create_uniform_mask(4, 4, 255);
        assert_eq!(EdgeCleanup::remove_speckles(&mut mask), 0);
    }

    #[test]
    fn red_square_interior_survives_cleanup() {
        let image = create_square_on_background(100, 100, 40, [255, 0, 0], [255, 255, 255]);
        let background = detect_background_color(&image).unwrap();
        assert_eq!(background, Rgb([255, 255, 255]));

        let mut mask = initial_segmentation(&image, background, ProcessingProfile::Product);
        let context = RefineContext::new(&image, background);
        EdgeCleanup::default().apply(&context, &mut mask);

        for y in 30..70 {
            for x in 30..70 {
                assert_eq!(mask.get_pixel(x, y)[0], 255, "at ({x}, {y})");
            }
        }
    }
}
