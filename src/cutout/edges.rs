//! Gradient and edge maps over rasters and alpha masks.

use image::{GrayImage, Luma};
use imageproc::{definitions::Image, gradients::sobel_gradients, map::map_colors};

use crate::{
    cutout::color::{luminance, rgb_of},
    utils::{for_each_neighbor, index_of, NEIGHBORS_8},
    AlphaMask, RasterImage,
};

/// Value of a weak edge before hysteresis.
pub const WEAK_EDGE: u8 = 128;
/// Value of a strong edge.
pub const STRONG_EDGE: u8 = 255;

/// BT.601 grayscale derivation of the colour channels, alpha ignored.
pub fn grayscale(image: &RasterImage) -> GrayImage {
    map_colors(image, |pixel| Luma([luminance(rgb_of(pixel)).round() as u8]))
}

/// Sobel gradient magnitude `sqrt(gx^2 + gy^2)` of the grayscale image.
pub fn sobel_magnitude(image: &RasterImage) -> Image<Luma<u16>> {
    sobel_gradients(&grayscale(image))
}

/// Simplified Canny edge map with values 0 or [`STRONG_EDGE`].
///
/// Sobel magnitudes go straight into [`hysteresis`]; there is no
/// non-maximum suppression.
pub fn canny_edges(image: &RasterImage, low: f32, high: f32) -> GrayImage {
    hysteresis(&sobel_magnitude(image), low, high)
}

/// Single-pass hysteresis over a gradient magnitude map.
///
/// Magnitudes above `high` are strong and above `low` weak. A weak pixel is
/// promoted when one of its 8-neighbours was strong in the thresholded map.
/// Promotions are not visible to later pixels of the same pass, so a weak
/// pixel two hops away from a strong edge is dropped.
pub fn hysteresis(magnitude: &Image<Luma<u16>>, low: f32, high: f32) -> GrayImage {
    let (width, height) = magnitude.dimensions();

    let classified: GrayImage = map_colors(magnitude, |Luma([m])| {
        let m = f32::from(m);
        Luma([if m > high {
            STRONG_EDGE
        } else if m > low {
            WEAK_EDGE
        } else {
            0
        }])
    });

    let classes = classified.as_raw();
    let mut edges = GrayImage::new(width, height);
    let target: &mut [u8] = &mut edges;
    for y in 0..height {
        for x in 0..width {
            let i = index_of(width, x, y);
            target[i] = match classes[i] {
                STRONG_EDGE => STRONG_EDGE,
                WEAK_EDGE => {
                    let mut promoted = false;
                    for_each_neighbor(&NEIGHBORS_8, width, height, x, y, |n| {
                        promoted |= classes[n] == STRONG_EDGE;
                    });
                    if promoted {
                        STRONG_EDGE
                    } else {
                        0
                    }
                }
                _ => 0,
            };
        }
    }

    edges
}

/// Largest absolute alpha difference to any 8-neighbour, doubled and
/// clamped to 255.
pub fn alpha_edges(mask: &AlphaMask) -> AlphaMask {
    let (width, height) = mask.dimensions();
    let alpha = mask.as_raw();
    let mut edges = AlphaMask::new(width, height);
    let target: &mut [u8] = &mut edges;

    for y in 0..height {
        for x in 0..width {
            let i = index_of(width, x, y);
            let mut max_diff = 0u8;
            for_each_neighbor(&NEIGHBORS_8, width, height, x, y, |n| {
                max_diff = max_diff.max(alpha[i].abs_diff(alpha[n]));
            });
            target[i] = max_diff.saturating_mul(2);
        }
    }

    edges
}

/// Gradient and edge maps of a colour raster.
pub trait EdgeDetection {
    /// See [`sobel_magnitude`].
    fn sobel_magnitude(&self) -> Image<Luma<u16>>;

    /// See [`canny_edges`].
    fn canny_edges(&self, low: f32, high: f32) -> GrayImage;
}

impl EdgeDetection for RasterImage {
    fn sobel_magnitude(&self) -> Image<Luma<u16>> {
        sobel_magnitude(self)
    }

    fn canny_edges(&self, low: f32, high: f32) -> GrayImage {
        canny_edges(self, low, high)
    }
}
