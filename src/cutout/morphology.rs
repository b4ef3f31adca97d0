//! Filters over a single alpha channel.
//!
//! Every multi-pass operation reads from a stable copy of the previous pass
//! and writes a fresh buffer, so results never depend on scan order.

use image::Luma;
use tracing::trace;

use crate::{
    cutout::edges::alpha_edges,
    utils::{for_each_neighbor, index_of, NEIGHBORS_4, NEIGHBORS_8},
    AlphaMask,
};

/// Alpha below which a pixel counts as transparent for hole filling.
pub const HOLE_ALPHA_THRESHOLD: u8 = 128;
/// Alpha below which a pixel is treated as nearly transparent.
pub const NEAR_TRANSPARENT: u8 = 10;
/// Alpha above which a pixel is treated as nearly opaque.
pub const NEAR_OPAQUE: u8 = 245;

/// Whether `alpha` is strictly between [`NEAR_TRANSPARENT`] and [`NEAR_OPAQUE`].
#[inline]
pub const fn is_soft(alpha: u8) -> bool {
    alpha > NEAR_TRANSPARENT && alpha < NEAR_OPAQUE
}

/// A soft pixel with at least one nearly transparent and one nearly opaque
/// 8-neighbour, i.e. a pixel on the cutout boundary.
pub fn is_transition_pixel(alpha: &[u8], width: u32, height: u32, x: u32, y: u32) -> bool {
    if !is_soft(alpha[index_of(width, x, y)]) {
        return false;
    }
    let mut has_transparent = false;
    let mut has_opaque = false;
    for_each_neighbor(&NEIGHBORS_8, width, height, x, y, |n| {
        has_transparent |= alpha[n] < NEAR_TRANSPARENT;
        has_opaque |= alpha[n] > NEAR_OPAQUE;
    });
    has_transparent && has_opaque
}

/// Number of 8-neighbours of `(x, y)` whose alpha satisfies `predicate`.
pub fn count_neighbors<F>(
    alpha: &[u8],
    width: u32,
    height: u32,
    x: u32,
    y: u32,
    predicate: F,
) -> usize
where
    F: Fn(u8) -> bool,
{
    let mut count = 0;
    for_each_neighbor(&NEIGHBORS_8, width, height, x, y, |n| {
        count += usize::from(predicate(alpha[n]));
    });
    count
}

/// Normalized 1-D Gaussian kernel of size `2 * radius + 1` with `sigma = radius / 2`.
pub fn gaussian_kernel(radius: u32) -> Vec<f32> {
    if radius == 0 {
        return vec![1.0];
    }
    let sigma = radius as f32 / 2.0;
    let denominator = 2.0 * sigma * sigma;
    let r = radius as i32;

    let kernel: Vec<f32> = (-r..=r)
        .map(|x| (-((x * x) as f32) / denominator).exp())
        .collect();
    let sum: f32 = kernel.iter().sum();
    kernel.into_iter().map(|weight| weight / sum).collect()
}

/// Separable Gaussian blur of the alpha values.
///
/// Samples outside the image replicate the nearest edge pixel. A radius of
/// zero returns an identical copy.
pub fn gaussian_blur_alpha(mask: &AlphaMask, radius: u32) -> AlphaMask {
    let (width, height) = mask.dimensions();
    if radius == 0 || width == 0 || height == 0 {
        return mask.clone();
    }

    let kernel = gaussian_kernel(radius);
    let r = radius as i64;
    let (w, h) = (i64::from(width), i64::from(height));
    let source = mask.as_raw();

    let mut horizontal = vec![0.0f32; source.len()];
    for y in 0..h {
        let row = (y * w) as usize;
        for x in 0..w {
            let mut acc = 0.0;
            for (k, weight) in kernel.iter().enumerate() {
                let sx = (x + k as i64 - r).clamp(0, w - 1) as usize;
                acc += f32::from(source[row + sx]) * weight;
            }
            horizontal[row + x as usize] = acc;
        }
    }

    let mut blurred = AlphaMask::new(width, height);
    let target: &mut [u8] = &mut blurred;
    for y in 0..h {
        for x in 0..w {
            let mut acc = 0.0;
            for (k, weight) in kernel.iter().enumerate() {
                let sy = (y + k as i64 - r).clamp(0, h - 1);
                acc += horizontal[(sy * w + x) as usize] * weight;
            }
            target[(y * w + x) as usize] = acc.round().clamp(0.0, 255.0) as u8;
        }
    }

    blurred
}

/// `iterations` passes of a 3x3 maximum filter.
pub fn dilate_alpha(mask: &AlphaMask, iterations: u32) -> AlphaMask {
    rank_filter(mask, iterations, u8::max)
}

/// `iterations` passes of a 3x3 minimum filter.
pub fn erode_alpha(mask: &AlphaMask, iterations: u32) -> AlphaMask {
    rank_filter(mask, iterations, u8::min)
}

fn rank_filter(mask: &AlphaMask, iterations: u32, pick: fn(u8, u8) -> u8) -> AlphaMask {
    let (width, height) = mask.dimensions();
    let mut current = mask.clone();

    for _ in 0..iterations {
        let previous = current.as_raw();
        let mut next = AlphaMask::new(width, height);
        let target: &mut [u8] = &mut next;
        for y in 0..height {
            for x in 0..width {
                let i = index_of(width, x, y);
                let mut value = previous[i];
                for_each_neighbor(&NEIGHBORS_8, width, height, x, y, |n| {
                    value = pick(value, previous[n]);
                });
                target[i] = value;
            }
        }
        current = next;
    }

    current
}

/// Maps alpha strictly above `level` to 255 and everything else to 0.
pub fn threshold_alpha(mask: &AlphaMask, level: u8) -> AlphaMask {
    imageproc::map::map_colors(mask, |Luma([alpha])| {
        Luma([if alpha > level { u8::MAX } else { 0 }])
    })
}

pub fn invert_alpha(mask: &AlphaMask) -> AlphaMask {
    imageproc::map::map_colors(mask, |Luma([alpha])| Luma([u8::MAX - alpha]))
}

/// Collects the 4-connected component containing `seed` whose pixels satisfy
/// `predicate`, marking them in `visited`.
///
/// Uses an explicit stack, so region size is bounded by heap memory rather
/// than by call depth. Returns an empty vector when the seed is already
/// visited or fails the predicate.
pub fn flood_fill<F>(
    mask: &AlphaMask,
    visited: &mut [bool],
    seed: (u32, u32),
    predicate: F,
) -> Vec<(u32, u32)>
where
    F: Fn(u8) -> bool,
{
    let (width, height) = mask.dimensions();
    let alpha = mask.as_raw();
    let seed_index = index_of(width, seed.0, seed.1);
    if visited[seed_index] || !predicate(alpha[seed_index]) {
        return Vec::new();
    }

    let mut region = Vec::new();
    let mut stack = vec![seed];
    visited[seed_index] = true;

    while let Some((x, y)) = stack.pop() {
        region.push((x, y));
        for_each_neighbor(&NEIGHBORS_4, width, height, x, y, |n| {
            if !visited[n] && predicate(alpha[n]) {
                visited[n] = true;
                stack.push(((n % width as usize) as u32, (n / width as usize) as u32));
            }
        });
    }

    region
}

/// Fills enclosed transparent regions of at most `max_hole_size` pixels.
///
/// A region is a 4-connected set of pixels with alpha below
/// [`HOLE_ALPHA_THRESHOLD`]. Regions touching the image border are not
/// enclosed and are left untouched, as are regions larger than the limit.
/// Returns the number of pixels set to fully opaque.
pub fn fill_holes(mask: &mut AlphaMask, max_hole_size: usize) -> usize {
    let (width, height) = mask.dimensions();
    let mut visited = vec![false; mask.as_raw().len()];
    let mut filled = 0;
    let mut holes = 0;

    for y in 0..height {
        for x in 0..width {
            let region = flood_fill(mask, &mut visited, (x, y), |alpha| {
                alpha < HOLE_ALPHA_THRESHOLD
            });
            if region.is_empty() || region.len() > max_hole_size {
                continue;
            }
            let touches_border = region
                .iter()
                .any(|&(rx, ry)| rx == 0 || ry == 0 || rx == width - 1 || ry == height - 1);
            if touches_border {
                continue;
            }
            for &(rx, ry) in &region {
                mask.put_pixel(rx, ry, Luma([u8::MAX]));
            }
            filled += region.len();
            holes += 1;
        }
    }

    trace!(holes, filled, max_hole_size, "filled enclosed holes");
    filled
}

/// Alpha-channel filters as methods on [`AlphaMask`].
pub trait AlphaFilter {
    /// See [`gaussian_blur_alpha`].
    fn gaussian_blur_alpha(&self, radius: u32) -> Self;

    /// See [`dilate_alpha`].
    fn dilate_alpha(&self, iterations: u32) -> Self;

    /// See [`erode_alpha`].
    fn erode_alpha(&self, iterations: u32) -> Self;

    /// See [`threshold_alpha`].
    fn threshold_alpha(&self, level: u8) -> Self;

    /// See [`invert_alpha`].
    fn invert_alpha(&self) -> Self;

    /// See [`alpha_edges`].
    fn alpha_edges(&self) -> Self;

    /// In-place [`fill_holes`], returning the number of pixels filled.
    fn fill_holes_mut(&mut self, max_hole_size: usize) -> usize;
}

impl AlphaFilter for AlphaMask {
    fn gaussian_blur_alpha(&self, radius: u32) -> Self {
        gaussian_blur_alpha(self, radius)
    }

    fn dilate_alpha(&self, iterations: u32) -> Self {
        dilate_alpha(self, iterations)
    }

    fn erode_alpha(&self, iterations: u32) -> Self {
        erode_alpha(self, iterations)
    }

    fn threshold_alpha(&self, level: u8) -> Self {
        threshold_alpha(self, level)
    }

    fn invert_alpha(&self) -> Self {
        invert_alpha(self)
    }

    fn alpha_edges(&self) -> Self {
        alpha_edges(self)
    }

    fn fill_holes_mut(&mut self, max_hole_size: usize) -> usize {
        fill_holes(self, max_hole_size)
    }
}
