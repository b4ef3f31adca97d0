use image::{ImageBuffer, Luma, Pixel, Primitive, Rgb, Rgba};
use imageproc::{
    definitions::Image,
    map::{map_colors, map_colors2},
};

use crate::{
    error::RefineError,
    utils::{validate_matching_dimensions, validate_non_empty_image},
    RasterImage,
};

/// Wraps a caller-supplied interleaved RGBA8 buffer as a [`RasterImage`].
///
/// # Errors
///
/// * `RefineError::EmptyImage` - When either dimension is zero
/// * `RefineError::BufferSizeMismatch` - When `bytes.len() != width * height * 4`
pub fn raster_from_raw(
    width: u32,
    height: u32,
    bytes: Vec<u8>,
) -> Result<RasterImage, RefineError> {
    validate_non_empty_image(width, height)?;
    let expected = width as usize * height as usize * 4;
    let actual = bytes.len();
    ImageBuffer::from_raw(width, height, bytes).ok_or(RefineError::BufferSizeMismatch {
        width,
        height,
        expected,
        actual,
    })
}

/// Turns an opaque colour raster into a cutout by attaching a mask as its alpha.
///
/// Used for sources that arrive without an alpha channel. Rasters that already
/// carry one go through [`ModifyAlpha`] instead.
pub trait ApplyAlphaMask {
    type Subpixel: Primitive;

    /// Pairs every colour pixel with the opacity at the same position.
    ///
    /// # Errors
    ///
    /// * `RefineError::DimensionMismatch` - When the mask is not the size of the raster
    ///
    /// # Examples
    ///
    /// ```
    /// use cutout_refine::{ApplyAlphaMask, Image};
    /// use image::{Luma, Rgb};
    ///
    /// let photo: Image<Rgb<u8>> = Image::from_pixel(4, 3, Rgb([10, 20, 30]));
    /// let mask: Image<Luma<u8>> = Image::from_pixel(4, 3, Luma([128]));
    ///
    /// let cutout = photo.apply_alpha_mask(&mask).unwrap();
    /// assert_eq!(cutout.get_pixel(3, 2).0, [10, 20, 30, 128]);
    /// ```
    fn apply_alpha_mask(
        self,
        mask: &Image<Luma<Self::Subpixel>>,
    ) -> Result<Image<Rgba<Self::Subpixel>>, RefineError>
    where
        Rgba<Self::Subpixel>: Pixel<Subpixel = Self::Subpixel>;
}

/// Trait for reading and replacing the alpha channel of RGBA images
///
/// The colour channels are never touched, which is what lets the refinement
/// pipeline treat the original raster as the single source of colour.
pub trait ModifyAlpha {
    type Subpixel: Primitive;

    /// Returns the raster with its opacity taken from `mask`.
    ///
    /// # Errors
    ///
    /// * `RefineError::DimensionMismatch` - When image and mask dimensions don't match
    fn replace_alpha(self, mask: &Image<Luma<Self::Subpixel>>) -> Result<Self, RefineError>
    where
        Self: Sized;

    /// Same as [`ModifyAlpha::replace_alpha`] without reallocating.
    ///
    /// # Errors
    ///
    /// * `RefineError::DimensionMismatch` - When image and mask dimensions don't match
    fn replace_alpha_mut(
        &mut self,
        mask: &Image<Luma<Self::Subpixel>>,
    ) -> Result<&mut Self, RefineError>;

    /// Copies the current opacity out into a standalone mask.
    fn extract_alpha(&self) -> Image<Luma<Self::Subpixel>>;
}

impl<S> ApplyAlphaMask for Image<Rgb<S>>
where
    Rgb<S>: Pixel<Subpixel = S>,
    S: Primitive,
{
    type Subpixel = S;

    fn apply_alpha_mask(self, mask: &Image<Luma<S>>) -> Result<Image<Rgba<S>>, RefineError>
    where
        Rgba<S>: Pixel<Subpixel = S>,
    {
        validate_matching_dimensions(self.dimensions(), mask.dimensions())?;

        Ok(map_colors2(&self, mask, |Rgb([red, green, blue]), Luma([alpha])| {
            Rgba([red, green, blue, alpha])
        }))
    }
}

impl<S> ModifyAlpha for Image<Rgba<S>>
where
    Rgba<S>: Pixel<Subpixel = S>,
    S: Primitive,
{
    type Subpixel = S;

    fn replace_alpha(self, mask: &Image<Luma<S>>) -> Result<Self, RefineError> {
        validate_matching_dimensions(self.dimensions(), mask.dimensions())?;

        Ok(map_colors2(&self, mask, |Rgba([red, green, blue, _]), Luma([alpha])| {
            Rgba([red, green, blue, alpha])
        }))
    }

    fn replace_alpha_mut(&mut self, mask: &Image<Luma<S>>) -> Result<&mut Self, RefineError> {
        validate_matching_dimensions(self.dimensions(), mask.dimensions())?;

        self.pixels_mut()
            .zip(mask.pixels())
            .for_each(|(pixel, Luma([alpha]))| pixel[3] = *alpha);

        Ok(self)
    }

    fn extract_alpha(&self) -> Image<Luma<S>> {
        map_colors(self, |Rgba([_, _, _, alpha])| Luma([alpha]))
    }
}
