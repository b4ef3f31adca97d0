//! Background-removal mask refinement.
//!
//! The crate classifies what kind of subject a raster contains, builds or
//! accepts a coarse alpha mask, repairs it with a profile-specific optimizer,
//! cleans its edges and finally guards against over-removal. A brush editor
//! with bounded undo covers manual touch-ups.
//!
//! ```
//! use cutout_refine::{process, ProcessingOptions, RasterImage};
//! use image::Rgba;
//!
//! # fn example() -> Result<(), cutout_refine::RefineError> {
//! let original = RasterImage::from_pixel(32, 32, Rgba([255, 255, 255, 255]));
//! let refined = process(&original, None, Some("product.png"), &ProcessingOptions::default())?;
//! assert_eq!(refined.dimensions(), original.dimensions());
//! # Ok(())
//! # }
//! ```

mod cutout;
mod error;
mod options;
mod utils;

#[cfg(test)]
mod test_utils;

use image::{ImageBuffer, Luma, Pixel, Rgba};

pub use cutout::alpha_mask::{raster_from_raw, ApplyAlphaMask, ModifyAlpha};
pub use cutout::background::{detect_background_color, BackgroundSampler};
pub use cutout::classifier::{
    classify, classify_filename, detect_profile, extract_features, ClassifierThresholds,
    ImageFeatures, ProfileSource,
};
pub use cutout::cleanup::EdgeCleanup;
pub use cutout::color::{
    blend_colors, color_distance, hsl_to_rgb, is_skin_tone, luminance, rgb_to_hsl, Hsl,
    SkinToneBands, DEFAULT_SKIN_BANDS, MAX_COLOR_DISTANCE,
};
pub use cutout::edges::{
    alpha_edges, canny_edges, grayscale, hysteresis, sobel_magnitude, EdgeDetection,
};
pub use cutout::editor::{BrushMode, BrushStroke, MaskEditor, HISTORY_CAPACITY};
pub use cutout::morphology::{
    dilate_alpha, erode_alpha, fill_holes, flood_fill, gaussian_blur_alpha, invert_alpha,
    threshold_alpha, AlphaFilter,
};
pub use cutout::optimizers::{
    LogoTextOptimizer, MaskOptimizer, PortraitOptimizer, ProductOptimizer, RefineContext,
};
pub use cutout::pipeline::{
    foreground_ratio, optimize_for_profile, process, process_batch, process_with_mask,
    process_with_report, ProcessRequest, ProcessedImage, ProcessingReport,
};
pub use cutout::safety_net::{
    enforce_minimum_foreground, gross_removal_override, human_mask, protect_details, protect_humans,
    protection_mask, ConservativeSafetyNet, SafetyNetOutcome,
};
pub use cutout::segment::{initial_segmentation, segment_by_background};
pub use error::RefineError;
pub use options::{ProcessingOptions, ProcessingProfile};

pub type Image<P> = ImageBuffer<P, Vec<<P as Pixel>::Subpixel>>;
/// Interleaved RGBA8 raster, row-major.
pub type RasterImage = Image<Rgba<u8>>;
/// Single-channel opacity grid, 0 transparent to 255 opaque.
pub type AlphaMask = Image<Luma<u8>>;
