//! Conservative guard against over-removal.
//!
//! Runs after the optimizers and edge cleanup. The liberal protection masks
//! and the gross-removal fallback are only active in conservative mode; the
//! minimum-foreground top-up always runs.

use image::Rgb;
use tracing::{debug, warn};

use crate::{
    cutout::{
        classifier::classify_filename,
        color::{color_distance, luminance, rgb_of, MAX_COLOR_DISTANCE},
        edges::EdgeDetection,
        morphology::AlphaFilter,
        optimizers::RefineContext,
    },
    options::{ProcessingOptions, ProcessingProfile},
    utils::{
        centered_disk_contains, for_each_in_window, for_each_neighbor, index_of, Ellipse,
        NEIGHBORS_8,
    },
    AlphaMask,
};

/// Pixels at or above this alpha are left alone by the protection masks.
const PROTECT_BELOW_ALPHA: u8 = 200;
/// 5x5 luminance range that marks text-like contrast.
const TEXT_CONTRAST: f32 = 30.0;
const TEXT_WINDOW_RADIUS: u32 = 2;
/// Sobel magnitude that marks an edge.
const EDGE_MAGNITUDE: u16 = 40;
/// 3x3 per-channel range that marks fine detail.
const DETAIL_VARIANCE: u8 = 40;
/// Dilation applied to the union of the protection masks.
const PROTECTION_DILATION: u32 = 2;

/// Fraction of liberal skin pixels that switches on human protection.
const HUMAN_SKIN_RATIO: f32 = 0.05;
const FACE_CENTER: (f32, f32) = (0.5, 0.35);
const FACE_RADII: (f32, f32) = (0.25, 0.3);
/// Face pixels this close to the background are not protected.
const FACE_BACKGROUND_DISTANCE: f32 = 30.0;
const HAIR_REGION_SCALE: f32 = 1.5;

/// Pixels below this alpha count as removed for the gross-removal check.
const NEAR_TRANSPARENT_ALPHA: u8 = 50;
const GROSS_REMOVAL_RATIO: f32 = 0.7;
const FALLBACK_DISK_FRACTION: f32 = 0.25;

/// Pixels above this alpha count as kept foreground.
const OPAQUE_ALPHA: u8 = 128;
const PROXIMITY_WEIGHT: f32 = 0.7;
const DETAIL_WEIGHT: f32 = 0.3;
const REQUIRED_TOLERANCE: f64 = 1e-4;

/// What the safety net changed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SafetyNetOutcome {
    /// Pixels raised to full opacity by protection or top-up
    pub restored_pixels: usize,
    /// Whether the refined mask was replaced by the centred disk
    pub gross_removal_applied: bool,
}

/// Guard configuration taken from [`ProcessingOptions`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConservativeSafetyNet {
    pub conservative: bool,
    pub minimum_foreground_ratio: f32,
}

impl ConservativeSafetyNet {
    pub const fn new(options: &ProcessingOptions) -> Self {
        Self {
            conservative: options.conservative,
            minimum_foreground_ratio: options.minimum_foreground_ratio,
        }
    }

    /// Runs protection, the gross-removal check and the minimum-foreground
    /// top-up in that order.
    pub fn apply(
        &self,
        context: &RefineContext<'_>,
        mask: &mut AlphaMask,
        filename_hint: Option<&str>,
    ) -> SafetyNetOutcome {
        let mut outcome = SafetyNetOutcome::default();

        if self.conservative {
            outcome.restored_pixels += protect_details(context, mask);
            outcome.restored_pixels += protect_humans(context, mask, filename_hint);
            outcome.gross_removal_applied = gross_removal_override(mask);
        }

        let topped_up = enforce_minimum_foreground(context, mask, self.minimum_foreground_ratio);
        outcome.restored_pixels += topped_up;

        debug!(
            conservative = self.conservative,
            restored = outcome.restored_pixels,
            gross_removal = outcome.gross_removal_applied,
            "safety net"
        );
        outcome
    }
}

/// Union of the text, edge and detail tests, dilated by two pixels.
///
/// All three tests are deliberately low-threshold; anything with visible
/// structure ends up protected.
pub fn protection_mask(context: &RefineContext<'_>) -> AlphaMask {
    let original = context.original;
    let (width, height) = original.dimensions();
    let luma: Vec<f32> = original.pixels().map(|p| luminance(rgb_of(*p))).collect();
    let magnitude = original.sobel_magnitude();
    let gradients = magnitude.as_raw();

    let mut protected = AlphaMask::new(width, height);
    let target: &mut [u8] = &mut protected;

    for y in 0..height {
        for x in 0..width {
            let i = index_of(width, x, y);

            let (mut low, mut high) = (f32::MAX, f32::MIN);
            for_each_in_window(TEXT_WINDOW_RADIUS, width, height, x, y, |n| {
                low = low.min(luma[n]);
                high = high.max(luma[n]);
            });
            let text = high - low > TEXT_CONTRAST;

            let edge = gradients[i] > EDGE_MAGNITUDE;

            let mut channel_low = [u8::MAX; 3];
            let mut channel_high = [0u8; 3];
            for_each_in_window(1, width, height, x, y, |n| {
                let Rgb(color) = context.color_at(n);
                for c in 0..3 {
                    channel_low[c] = channel_low[c].min(color[c]);
                    channel_high[c] = channel_high[c].max(color[c]);
                }
            });
            let detail = (0..3).any(|c| channel_high[c] - channel_low[c] > DETAIL_VARIANCE);

            if text || edge || detail {
                target[i] = u8::MAX;
            }
        }
    }

    protected.dilate_alpha(PROTECTION_DILATION)
}

/// Restores to full opacity every pixel under `protection` whose alpha is below 200.
fn restore_under(protection: &AlphaMask, mask: &mut AlphaMask) -> usize {
    let guard = protection.as_raw();
    let alpha: &mut [u8] = mask;
    let mut restored = 0;
    for (value, &protected) in alpha.iter_mut().zip(guard) {
        if protected != 0 && *value < PROTECT_BELOW_ALPHA {
            *value = u8::MAX;
            restored += 1;
        }
    }
    restored
}

/// Applies the text/edge/detail protection mask.
pub fn protect_details(context: &RefineContext<'_>, mask: &mut AlphaMask) -> usize {
    let restored = restore_under(&protection_mask(context), mask);
    debug!(restored, "detail protection");
    restored
}

/// RGB rule that accepts a wider range of skin than the YCbCr bands.
pub fn is_liberal_skin(Rgb([red, green, blue]): Rgb<u8>) -> bool {
    red > 95
        && green > 40
        && blue > 20
        && red > green
        && red > blue
        && red.abs_diff(green) > 15
}

/// Coarse dark, brown, blond and auburn buckets.
pub fn is_hair_color(pixel: Rgb<u8>) -> bool {
    let Rgb([red, green, blue]) = pixel;
    let dark = luminance(pixel) < 60.0;
    let brown = red >= green && green >= blue && (60..=160).contains(&red) && red - blue > 15;
    let blond = red > 180 && green > 150 && blue < 140 && red - blue > 40;
    let auburn = red > 120 && green < 100 && blue < 80 && red - green > 40;
    dark || brown || blond || auburn
}

/// Skin, face and hair protection mask, or `None` when the image does not
/// look like it contains a person.
pub fn human_mask(context: &RefineContext<'_>, filename_hint: Option<&str>) -> Option<AlphaMask> {
    let original = context.original;
    let (width, height) = original.dimensions();
    let total = width as usize * height as usize;
    if total == 0 {
        return None;
    }

    let skin_pixels = original
        .pixels()
        .filter(|p| is_liberal_skin(rgb_of(**p)))
        .count();
    let hinted = filename_hint.and_then(classify_filename) == Some(ProcessingProfile::Person);
    if (skin_pixels as f32 / total as f32) <= HUMAN_SKIN_RATIO && !hinted {
        return None;
    }

    let face = Ellipse::relative(width, height, FACE_CENTER, FACE_RADII);
    let hair_region = face.scaled(HAIR_REGION_SCALE);
    let mut human = AlphaMask::new(width, height);

    for (x, y, pixel) in original.enumerate_pixels() {
        let color = rgb_of(*pixel);
        let skin = is_liberal_skin(color);
        let face_pixel = face.contains(x, y)
            && color_distance(color, context.background) > FACE_BACKGROUND_DISTANCE;
        let hair = hair_region.contains(x, y) && is_hair_color(color);
        if skin || face_pixel || hair {
            human.put_pixel(x, y, image::Luma([u8::MAX]));
        }
    }

    Some(human)
}

/// Applies the human protection mask when one is detected.
pub fn protect_humans(
    context: &RefineContext<'_>,
    mask: &mut AlphaMask,
    filename_hint: Option<&str>,
) -> usize {
    match human_mask(context, filename_hint) {
        Some(human) => {
            let restored = restore_under(&human, mask);
            debug!(restored, "human protection");
            restored
        }
        None => 0,
    }
}

/// Replaces the mask with the centred fallback disk when more than 70% of
/// it is nearly transparent. Returns whether the fallback fired.
pub fn gross_removal_override(mask: &mut AlphaMask) -> bool {
    let (width, height) = mask.dimensions();
    let total = width as usize * height as usize;
    if total == 0 {
        return false;
    }

    let removed = mask
        .as_raw()
        .iter()
        .filter(|&&a| a < NEAR_TRANSPARENT_ALPHA)
        .count();
    let ratio = removed as f32 / total as f32;
    if ratio <= GROSS_REMOVAL_RATIO {
        return false;
    }

    let radius = FALLBACK_DISK_FRACTION * width.min(height) as f32;
    warn!(removed_ratio = ratio, radius, "gross removal detected, falling back to centred disk");
    for (x, y, alpha) in mask.enumerate_pixels_mut() {
        alpha[0] = if centered_disk_contains(width, height, radius, x, y) {
            u8::MAX
        } else {
            0
        };
    }
    true
}

/// Restores the highest-scoring non-opaque pixels until at least
/// `ceil(ratio * total)` pixels have alpha above 128.
///
/// Scores favour pixels near the image centre (70%) and pixels with local
/// colour detail in the original (30%). Ties keep raster order.
pub fn enforce_minimum_foreground(
    context: &RefineContext<'_>,
    mask: &mut AlphaMask,
    ratio: f32,
) -> usize {
    let (width, height) = mask.dimensions();
    let total = width as usize * height as usize;
    if total == 0 {
        return 0;
    }

    // f32 ratios such as 0.3 sit slightly above their decimal value.
    let exact = f64::from(ratio.clamp(0.0, 1.0)) * total as f64;
    let required = (exact - REQUIRED_TOLERANCE).ceil().max(0.0) as usize;
    let opaque = mask.as_raw().iter().filter(|&&a| a > OPAQUE_ALPHA).count();
    if opaque >= required {
        return 0;
    }
    let missing = required - opaque;

    let center_x = width as f32 / 2.0;
    let center_y = height as f32 / 2.0;
    let max_distance = center_x.hypot(center_y).max(f32::EPSILON);

    let alpha = mask.as_raw();
    let mut candidates: Vec<(usize, f32)> = Vec::with_capacity(total - opaque);
    for y in 0..height {
        for x in 0..width {
            let i = index_of(width, x, y);
            if alpha[i] > OPAQUE_ALPHA {
                continue;
            }
            let distance = (x as f32 + 0.5 - center_x).hypot(y as f32 + 0.5 - center_y);
            let proximity = (1.0 - distance / max_distance).max(0.0);

            let color = context.color_at(i);
            let mut detail = 0.0f32;
            for_each_neighbor(&NEIGHBORS_8, width, height, x, y, |n| {
                detail = detail.max(color_distance(color, context.color_at(n)));
            });
            let detail = detail / MAX_COLOR_DISTANCE;

            candidates.push((i, PROXIMITY_WEIGHT * proximity + DETAIL_WEIGHT * detail));
        }
    }
    candidates.sort_by(|a, b| b.1.total_cmp(&a.1).then(a.0.cmp(&b.0)));

    let target: &mut [u8] = mask;
    for &(i, _) in candidates.iter().take(missing) {
        target[i] = u8::MAX;
    }

    warn!(
        opaque,
        required,
        restored = missing,
        "foreground below minimum ratio, restoring central pixels"
    );
    missing
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::create_uniform_mask;
    use crate::RasterImage;
    use image::{Luma, Rgba};

    fn opaque_ratio(mask: &AlphaMask) -> f32 {
        let opaque = mask.pixels().filter(|p| p[0] > 128).count();
        opaque as f32 / (mask.width() * mask.height()) as f32
    }

    #[test]
    fn flat_image_has_nothing_to_protect() {
        let image = RasterImage::from_pixel(10, 10, Rgba([40, 120, 200, 255]));
        let context = RefineContext::new(&image, Rgb([40, 120, 200]));
        assert!(protection_mask(&context).pixels().all(|p| p[0] == 0));
    }

    #[test]
    fn detail_is_protected_with_margin() {
        let mut image = RasterImage::from_pixel(20, 20, Rgba([255, 255, 255, 255]));
        image.put_pixel(10, 10, Rgba([0, 0, 0, 255]));
        let context = RefineContext::new(&image, Rgb([255, 255, 255]));

        let mut mask = AlphaMask::new(20, 20);
        let restored = protect_details(&context, &mut mask);
        assert!(restored > 0);
        assert_eq!(mask.get_pixel(10, 10)[0], 255);
        assert_eq!(mask.get_pixel(0, 0)[0], 0);
    }

    #[test]
    fn liberal_skin_and_hair_buckets() {
        assert!(is_liberal_skin(Rgb([224, 172, 138])));
        assert!(!is_liberal_skin(Rgb([60, 90, 140])));
        assert!(is_hair_color(Rgb([20, 15, 10])));
        assert!(is_hair_color(Rgb([120, 80, 50])));
        assert!(is_hair_color(Rgb([230, 200, 120])));
        assert!(!is_hair_color(Rgb([60, 90, 140])));
    }

    #[test]
    fn human_mask_needs_skin_or_hint() {
        let image = RasterImage::from_pixel(10, 10, Rgba([60, 90, 140, 255]));
        let context = RefineContext::new(&image, Rgb([60, 90, 140]));
        assert!(human_mask(&context, None).is_none());
        assert!(human_mask(&context, Some("team_portrait.png")).is_some());

        let skin = RasterImage::from_pixel(10, 10, Rgba([224, 172, 138, 255]));
        let context = RefineContext::new(&skin, Rgb([60, 90, 140]));
        let mask = human_mask(&context, None).unwrap();
        assert!(mask.pixels().all(|p| p[0] == 255));
    }

    #[test]
    fn gross_removal_replaces_mask_with_disk() {
        let mut mask = AlphaMask::new(40, 40);
        mask.put_pixel(0, 0, Luma([255]));
        assert!(gross_removal_override(&mut mask));

        for (x, y, alpha) in mask.enumerate_pixels() {
            let expected = if centered_disk_contains(40, 40, 10.0, x, y) { 255 } else { 0 };
            assert_eq!(alpha[0], expected, "at ({x}, {y})");
        }
        assert_eq!(mask.get_pixel(20, 20)[0], 255);
        assert_eq!(mask.get_pixel(0, 0)[0], 0);
    }

    #[test]
    fn mostly_kept_mask_is_not_overridden() {
        let mut mask = create_uniform_mask(10, 10, 255);
        for x in 0..10 {
            for y in 0..7 {
                mask.put_pixel(x, y, Luma([0]));
            }
        }
        let before = mask.clone();
        assert!(!gross_removal_override(&mut mask));
        assert_eq!(mask, before);
    }

    #[test]
    fn minimum_foreground_is_reached_from_the_centre() {
        let image = RasterImage::from_pixel(10, 10, Rgba([10, 20, 30, 255]));
        let context = RefineContext::new(&image, Rgb([10, 20, 30]));
        let mut mask = AlphaMask::new(10, 10);

        assert_eq!(enforce_minimum_foreground(&context, &mut mask, 0.3), 30);
        assert!(opaque_ratio(&mask) >= 0.3);
        assert_eq!(mask.get_pixel(5, 5)[0], 255);
        assert_eq!(mask.get_pixel(0, 0)[0], 0);
    }

    #[test]
    fn satisfied_ratio_changes_nothing() {
        let image = RasterImage::from_pixel(4, 4, Rgba([10, 20, 30, 255]));
        let context = RefineContext::new(&image, Rgb([10, 20, 30]));
        let mut mask = create_uniform_mask(4, 4, 255);
        assert_eq!(enforce_minimum_foreground(&context, &mut mask, 1.0), 0);
        let mut empty = AlphaMask::new(4, 4);
        assert_eq!(enforce_minimum_foreground(&context, &mut empty, 0.0), 0);
    }

    #[test]
    fn non_conservative_net_only_tops_up() {
        let options = ProcessingOptions::default().with_conservative(false);
        let mut image = RasterImage::from_pixel(10, 10, Rgba([255, 255, 255, 255]));
        image.put_pixel(2, 2, Rgba([0, 0, 0, 255]));
        let context = RefineContext::new(&image, Rgb([255, 255, 255]));
        let mut mask = AlphaMask::new(10, 10);

        let outcome = ConservativeSafetyNet::new(&options).apply(&context, &mut mask, None);
        assert!(!outcome.gross_removal_applied);
        assert_eq!(outcome.restored_pixels, 30);
    }
}
