use image::Rgb;

use crate::{
    cutout::color::rgb_of, error::RefineError, utils::validate_non_empty_image, RasterImage,
};

/// Border sampling geometry for background estimation
///
/// The band is `min(max_band, band_fraction * width)` pixels wide (at least
/// one) on all four edges, sampled every `stride` pixels in both directions.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BackgroundSampler {
    pub max_band: u32,
    pub band_fraction: f32,
    pub stride: u32,
}

impl Default for BackgroundSampler {
    fn default() -> Self {
        Self {
            max_band: 20,
            band_fraction: 0.1,
            stride: 5,
        }
    }
}

impl BackgroundSampler {
    pub fn with_stride(mut self, stride: u32) -> Self {
        self.stride = stride.max(1);
        self
    }

    /// Band width in pixels for an image of `width`.
    pub fn band(&self, width: u32) -> u32 {
        ((width as f32 * self.band_fraction) as u32)
            .min(self.max_band)
            .max(1)
    }

    /// Visits every sampled border coordinate.
    ///
    /// Corners are covered by both a horizontal and a vertical band and are
    /// visited twice.
    pub fn for_each_sample<F>(&self, width: u32, height: u32, mut f: F)
    where
        F: FnMut(u32, u32),
    {
        let band = self.band(width);
        let band_x = band.min(width);
        let band_y = band.min(height);
        let stride = self.stride.max(1) as usize;

        for y in (0..band_y).chain(height - band_y..height).step_by(stride) {
            for x in (0..width).step_by(stride) {
                f(x, y);
            }
        }
        for y in (0..height).step_by(stride) {
            for x in (0..band_x).chain(width - band_x..width).step_by(stride) {
                f(x, y);
            }
        }
    }

    /// Averages the sampled border colours.
    ///
    /// # Errors
    ///
    /// * `RefineError::EmptyImage` - When the image has no pixels to sample
    pub fn estimate(&self, image: &RasterImage) -> Result<Rgb<u8>, RefineError> {
        let (width, height) = image.dimensions();
        validate_non_empty_image(width, height)?;

        let mut sums = [0u64; 3];
        let mut count = 0u64;
        self.for_each_sample(width, height, |x, y| {
            let Rgb(rgb) = rgb_of(*image.get_pixel(x, y));
            for (sum, channel) in sums.iter_mut().zip(rgb) {
                *sum += u64::from(channel);
            }
            count += 1;
        });

        let average = |sum: u64| ((sum as f64 / count as f64).round()) as u8;
        Ok(Rgb([average(sums[0]), average(sums[1]), average(sums[2])]))
    }
}

/// Estimates the background colour from the image border with the default
/// [`BackgroundSampler`].
///
/// Non-uniform borders still produce a colour: their average.
///
/// # Errors
///
/// * `RefineError::EmptyImage` - When either dimension is zero
pub fn detect_background_color(image: &RasterImage) -> Result<Rgb<u8>, RefineError> {
    BackgroundSampler::default().estimate(image)
}
