//! Pixel-level colour math shared by every refinement stage.
//!
//! All functions are pure and total. They take `image` pixel types so callers
//! can pass `*image.get_pixel(x, y)` or values rebuilt from a flat buffer.

use image::{Rgb, Rgba};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Largest possible Euclidean distance between two RGB colours.
pub const MAX_COLOR_DISTANCE: f32 = 441.672_96;

/// Hue in degrees `[0, 360)`, saturation and lightness in `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Hsl {
    pub hue: f32,
    pub saturation: f32,
    pub lightness: f32,
}

/// ITU-R BT.601 luma, `0.299 r + 0.587 g + 0.114 b`.
///
/// Every grayscale derivation in the crate goes through this function.
#[inline]
pub fn luminance(Rgb([red, green, blue]): Rgb<u8>) -> f32 {
    0.299 * f32::from(red) + 0.587 * f32::from(green) + 0.114 * f32::from(blue)
}

/// Euclidean distance in RGB space.
#[inline]
pub fn color_distance(Rgb(a): Rgb<u8>, Rgb(b): Rgb<u8>) -> f32 {
    let dr = f32::from(a[0]) - f32::from(b[0]);
    let dg = f32::from(a[1]) - f32::from(b[1]);
    let db = f32::from(a[2]) - f32::from(b[2]);
    (dr * dr + dg * dg + db * db).sqrt()
}

/// Drops the alpha channel.
#[inline]
pub const fn rgb_of(Rgba([red, green, blue, _]): Rgba<u8>) -> Rgb<u8> {
    Rgb([red, green, blue])
}

pub fn rgb_to_hsl(Rgb([red, green, blue]): Rgb<u8>) -> Hsl {
    let r = f32::from(red) / 255.0;
    let g = f32::from(green) / 255.0;
    let b = f32::from(blue) / 255.0;

    let max = r.max(g).max(b);
    let min = r.min(g).min(b);
    let lightness = (max + min) / 2.0;
    let delta = max - min;

    if delta == 0.0 {
        return Hsl {
            hue: 0.0,
            saturation: 0.0,
            lightness,
        };
    }

    let saturation = if lightness > 0.5 {
        delta / (2.0 - max - min)
    } else {
        delta / (max + min)
    };

    let sector = if max == r {
        (g - b) / delta + if g < b { 6.0 } else { 0.0 }
    } else if max == g {
        (b - r) / delta + 2.0
    } else {
        (r - g) / delta + 4.0
    };

    Hsl {
        hue: sector * 60.0,
        saturation,
        lightness,
    }
}

pub fn hsl_to_rgb(hsl: Hsl) -> Rgb<u8> {
    let Hsl {
        hue,
        saturation,
        lightness,
    } = hsl;

    if saturation == 0.0 {
        let v = to_channel(lightness);
        return Rgb([v, v, v]);
    }

    let q = if lightness < 0.5 {
        lightness * (1.0 + saturation)
    } else {
        lightness + saturation - lightness * saturation
    };
    let p = 2.0 * lightness - q;
    let h = hue.rem_euclid(360.0) / 360.0;

    Rgb([
        to_channel(hue_to_channel(p, q, h + 1.0 / 3.0)),
        to_channel(hue_to_channel(p, q, h)),
        to_channel(hue_to_channel(p, q, h - 1.0 / 3.0)),
    ])
}

fn hue_to_channel(p: f32, q: f32, t: f32) -> f32 {
    let t = t.rem_euclid(1.0);
    if t < 1.0 / 6.0 {
        p + (q - p) * 6.0 * t
    } else if t < 0.5 {
        q
    } else if t < 2.0 / 3.0 {
        p + (q - p) * (2.0 / 3.0 - t) * 6.0
    } else {
        p
    }
}

#[inline]
fn to_channel(value: f32) -> u8 {
    (value * 255.0).round().clamp(0.0, 255.0) as u8
}

/// Empirical YCbCr bands for the skin-tone test.
///
/// These are tuning constants, not ground truth: the test deliberately
/// accepts some non-skin colours.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SkinToneBands {
    pub luma: (f32, f32),
    pub blue_difference: (f32, f32),
    pub red_difference: (f32, f32),
}

pub const DEFAULT_SKIN_BANDS: SkinToneBands = SkinToneBands {
    luma: (80.0, 220.0),
    blue_difference: (85.0, 135.0),
    red_difference: (135.0, 180.0),
};

impl Default for SkinToneBands {
    fn default() -> Self {
        DEFAULT_SKIN_BANDS
    }
}

impl SkinToneBands {
    pub fn contains(&self, Rgb([red, green, blue]): Rgb<u8>) -> bool {
        let r = f32::from(red);
        let g = f32::from(green);
        let b = f32::from(blue);

        let y = 0.299 * r + 0.587 * g + 0.114 * b;
        let cb = 128.0 - 0.168_736 * r - 0.331_264 * g + 0.5 * b;
        let cr = 128.0 + 0.5 * r - 0.418_688 * g - 0.081_312 * b;

        open_band(y, self.luma)
            && open_band(cb, self.blue_difference)
            && open_band(cr, self.red_difference)
    }
}

#[inline]
fn open_band(value: f32, (low, high): (f32, f32)) -> bool {
    value > low && value < high
}

/// YCbCr skin-tone test with [`DEFAULT_SKIN_BANDS`].
#[inline]
pub fn is_skin_tone(pixel: Rgb<u8>) -> bool {
    DEFAULT_SKIN_BANDS.contains(pixel)
}

/// Composites `top` over `bottom` (Porter-Duff "over", straight alpha).
///
/// A fully transparent result is returned as `Rgba([0, 0, 0, 0])`.
pub fn blend_colors(top: Rgba<u8>, bottom: Rgba<u8>) -> Rgba<u8> {
    let top_alpha = f32::from(top[3]) / 255.0;
    let bottom_alpha = f32::from(bottom[3]) / 255.0;
    let out_alpha = top_alpha + bottom_alpha * (1.0 - top_alpha);

    if out_alpha <= 0.0 {
        return Rgba([0, 0, 0, 0]);
    }

    let channel = |i: usize| {
        let value = (f32::from(top[i]) * top_alpha
            + f32::from(bottom[i]) * bottom_alpha * (1.0 - top_alpha))
            / out_alpha;
        value.round().clamp(0.0, 255.0) as u8
    };

    Rgba([channel(0), channel(1), channel(2), to_channel(out_alpha)])
}
