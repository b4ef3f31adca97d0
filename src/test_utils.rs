//! Test utilities for cutout-refine
//!
//! Synthetic rasters and masks shared by the unit tests.
//! It is only compiled when running tests.

use image::{Luma, Rgb, Rgba};
use imageproc::definitions::Image;

use crate::{utils::Ellipse, AlphaMask, RasterImage};

/// Creates a 2x2 RGB image with known pixel values:
/// - (0,0): [200, 150, 100]
/// - (1,0): [100, 200, 150]
/// - (0,1): [150, 100, 200]
/// - (1,1): [50, 75, 25]
pub fn create_test_rgb_image() -> Image<Rgb<u8>> {
    let mut image: Image<Rgb<u8>> = Image::new(2, 2);
    image.put_pixel(0, 0, Rgb([200, 150, 100]));
    image.put_pixel(1, 0, Rgb([100, 200, 150]));
    image.put_pixel(0, 1, Rgb([150, 100, 200]));
    image.put_pixel(1, 1, Rgb([50, 75, 25]));
    image
}

/// Creates the RGBA counterpart of [`create_test_rgb_image`] with alphas
/// 255, 128, 64 and 0.
pub fn create_test_rgba_image() -> RasterImage {
    let mut image = RasterImage::new(2, 2);
    image.put_pixel(0, 0, Rgba([200, 150, 100, 255]));
    image.put_pixel(1, 0, Rgba([100, 200, 150, 128]));
    image.put_pixel(0, 1, Rgba([150, 100, 200, 64]));
    image.put_pixel(1, 1, Rgba([50, 75, 25, 0]));
    image
}

/// Creates a 2x2 mask with alphas 255, 192, 128 and 64 in raster order.
pub fn create_test_alpha_mask() -> AlphaMask {
    let mut mask = AlphaMask::new(2, 2);
    mask.put_pixel(0, 0, Luma([255]));
    mask.put_pixel(1, 0, Luma([192]));
    mask.put_pixel(0, 1, Luma([128]));
    mask.put_pixel(1, 1, Luma([64]));
    mask
}

pub fn create_uniform_mask(width: u32, height: u32, value: u8) -> AlphaMask {
    AlphaMask::from_pixel(width, height, Luma([value]))
}

/// Opaque mask with a transparent `side` x `side` square starting at
/// `((width - side) / 2, (height - side) / 2)`.
pub fn create_mask_with_hole(width: u32, height: u32, side: u32) -> AlphaMask {
    let mut mask = create_uniform_mask(width, height, 255);
    let (x0, y0) = ((width - side) / 2, (height - side) / 2);
    for y in y0..y0 + side {
        for x in x0..x0 + side {
            mask.put_pixel(x, y, Luma([0]));
        }
    }
    mask
}

/// Opaque `side` x `side` square of `foreground` centred on `background`,
/// starting at `((width - side) / 2, (height - side) / 2)`.
pub fn create_square_on_background(
    width: u32,
    height: u32,
    side: u32,
    foreground: [u8; 3],
    background: [u8; 3],
) -> RasterImage {
    let [br, bg, bb] = background;
    let [fr, fg, fb] = foreground;
    let mut image = RasterImage::from_pixel(width, height, Rgba([br, bg, bb, 255]));
    let (x0, y0) = ((width - side) / 2, (height - side) / 2);
    for y in y0..y0 + side {
        for x in x0..x0 + side {
            image.put_pixel(x, y, Rgba([fr, fg, fb, 255]));
        }
    }
    image
}

pub const PORTRAIT_SKIN: Rgba<u8> = Rgba([224, 172, 138, 255]);
pub const PORTRAIT_BACKDROP: Rgba<u8> = Rgba([60, 90, 140, 255]);
pub const PORTRAIT_HAIR: Rgba<u8> = Rgba([40, 30, 20, 255]);

/// Head-and-shoulders silhouette on a blue backdrop: a skin face ellipse in
/// the upper third, dark hair above it and a skin torso from mid-height.
pub fn create_portrait_image(width: u32, height: u32) -> RasterImage {
    let face = Ellipse::relative(width, height, (0.5, 1.0 / 3.0), (0.25, 0.22));
    let hair = face.scaled(1.2);
    let torso_x = (width as f32 * 0.2) as u32..(width as f32 * 0.8) as u32;
    let torso_top = height / 2;

    RasterImage::from_fn(width, height, |x, y| {
        if face.contains(x, y) || (y >= torso_top && torso_x.contains(&x)) {
            PORTRAIT_SKIN
        } else if hair.contains(x, y) && (y as f32) < height as f32 / 3.0 {
            PORTRAIT_HAIR
        } else {
            PORTRAIT_BACKDROP
        }
    })
}

/// Vertical two-pixel stripes alternating between `a` and `b`.
pub fn create_stripes(width: u32, height: u32, a: [u8; 3], b: [u8; 3]) -> RasterImage {
    RasterImage::from_fn(width, height, |x, _| {
        let [r, g, bl] = if (x / 2) % 2 == 0 { a } else { b };
        Rgba([r, g, bl, 255])
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hole_and_square_are_centred() {
        let mask = create_mask_with_hole(10, 10, 4);
        assert_eq!(mask.get_pixel(3, 3)[0], 0);
        assert_eq!(mask.get_pixel(6, 6)[0], 0);
        assert_eq!(mask.get_pixel(2, 2)[0], 255);
        assert_eq!(mask.get_pixel(7, 7)[0], 255);

        let image = create_square_on_background(100, 100, 40, [255, 0, 0], [255, 255, 255]);
        assert_eq!(image.get_pixel(30, 30), &Rgba([255, 0, 0, 255]));
        assert_eq!(image.get_pixel(69, 69), &Rgba([255, 0, 0, 255]));
        assert_eq!(image.get_pixel(29, 30), &Rgba([255, 255, 255, 255]));
    }

    #[test]
    fn portrait_has_face_hair_and_backdrop() {
        let image = create_portrait_image(60, 90);
        assert_eq!(image.get_pixel(30, 30), &PORTRAIT_SKIN);
        assert_eq!(image.get_pixel(30, 85), &PORTRAIT_SKIN);
        assert_eq!(image.get_pixel(0, 0), &PORTRAIT_BACKDROP);
        assert!(image.pixels().any(|p| *p == PORTRAIT_HAIR));
    }
}
