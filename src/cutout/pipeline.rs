//! The automatic refinement pipeline.
//!
//! background colour → classification → coarse mask → profile optimizer →
//! edge cleanup → safety net → alpha composed back onto the original colours.

#[cfg(feature = "rayon")]
use rayon::prelude::*;
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};

use crate::{
    cutout::{
        alpha_mask::ModifyAlpha,
        background::detect_background_color,
        classifier::{detect_profile, extract_features, ImageFeatures, ProfileSource},
        cleanup::EdgeCleanup,
        optimizers::{
            LogoTextOptimizer, MaskOptimizer, PortraitOptimizer, ProductOptimizer, RefineContext,
        },
        safety_net::ConservativeSafetyNet,
        segment::initial_segmentation,
    },
    error::RefineError,
    options::{ProcessingOptions, ProcessingProfile},
    utils::{validate_matching_dimensions, validate_non_empty_image},
    AlphaMask, RasterImage,
};

/// Alpha above which a pixel counts as kept foreground.
const FOREGROUND_ALPHA: u8 = 128;

/// What the pipeline decided and changed for one image.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
pub struct ProcessingReport {
    pub features: ImageFeatures,
    pub profile: ProcessingProfile,
    pub profile_source: ProfileSource,
    /// Estimated background colour as RGB
    pub background: [u8; 3],
    /// Fraction of pixels with alpha above 128 in the result
    pub foreground_ratio: f32,
    /// Pixels raised to full opacity by the safety net
    pub restored_pixels: usize,
    pub gross_removal_applied: bool,
}

/// A refined raster together with its report.
#[derive(Debug, Clone)]
pub struct ProcessedImage {
    pub image: RasterImage,
    pub report: ProcessingReport,
}

/// One entry of a batch.
#[derive(Debug, Clone)]
pub struct ProcessRequest {
    pub image: RasterImage,
    pub profile_hint: Option<ProcessingProfile>,
    pub filename_hint: Option<String>,
    pub options: ProcessingOptions,
}

impl ProcessRequest {
    pub fn new(image: RasterImage) -> Self {
        Self {
            image,
            profile_hint: None,
            filename_hint: None,
            options: ProcessingOptions::default(),
        }
    }

    pub fn with_profile(mut self, profile: ProcessingProfile) -> Self {
        self.profile_hint = Some(profile);
        self
    }

    pub fn with_filename(mut self, filename: impl Into<String>) -> Self {
        self.filename_hint = Some(filename.into());
        self
    }

    pub fn with_options(mut self, options: ProcessingOptions) -> Self {
        self.options = options;
        self
    }
}

/// Refines the alpha channel of `original` and returns a new raster.
///
/// `original` is never modified; its colours are carried over unchanged.
///
/// # Errors
///
/// * `RefineError::EmptyImage` - When either dimension is zero
/// * `RefineError::InvalidParameter` - When an option is out of range
pub fn process(
    original: &RasterImage,
    profile_hint: Option<ProcessingProfile>,
    filename_hint: Option<&str>,
    options: &ProcessingOptions,
) -> Result<RasterImage, RefineError> {
    process_with_report(original, profile_hint, filename_hint, options)
        .map(|processed| processed.image)
}

/// Like [`process`], also returning the [`ProcessingReport`].
///
/// # Errors
///
/// See [`process`].
#[instrument(
    skip_all,
    fields(dimensions = %format!("{}x{}", original.width(), original.height()))
)]
pub fn process_with_report(
    original: &RasterImage,
    profile_hint: Option<ProcessingProfile>,
    filename_hint: Option<&str>,
    options: &ProcessingOptions,
) -> Result<ProcessedImage, RefineError> {
    refine(original, None, profile_hint, filename_hint, options)
}

/// Refines an externally supplied coarse mask instead of running the
/// colour-distance segmenter.
///
/// # Errors
///
/// * `RefineError::DimensionMismatch` - When `coarse_mask` and `original` differ in size
/// * plus the errors of [`process`]
#[instrument(
    skip_all,
    fields(dimensions = %format!("{}x{}", original.width(), original.height()))
)]
pub fn process_with_mask(
    original: &RasterImage,
    coarse_mask: &AlphaMask,
    profile_hint: Option<ProcessingProfile>,
    filename_hint: Option<&str>,
    options: &ProcessingOptions,
) -> Result<ProcessedImage, RefineError> {
    refine(original, Some(coarse_mask), profile_hint, filename_hint, options)
}

/// Processes independent requests, in parallel with the `rayon` feature.
///
/// Results are returned in request order.
pub fn process_batch(requests: &[ProcessRequest]) -> Vec<Result<ProcessedImage, RefineError>> {
    let run = |request: &ProcessRequest| {
        process_with_report(
            &request.image,
            request.profile_hint,
            request.filename_hint.as_deref(),
            &request.options,
        )
    };

    #[cfg(feature = "rayon")]
    let results: Vec<_> = requests.par_iter().map(run).collect();
    #[cfg(not(feature = "rayon"))]
    let results: Vec<_> = requests.iter().map(run).collect();

    debug!(
        requests = requests.len(),
        failed = results.iter().filter(|r| r.is_err()).count(),
        "batch processed"
    );
    results
}

/// Runs the optimizer for `profile` and returns the number of alpha values
/// it changed. Documents share the logo/text repairs; mixed content has none.
pub fn optimize_for_profile(
    profile: ProcessingProfile,
    options: &ProcessingOptions,
    context: &RefineContext<'_>,
    mask: &mut AlphaMask,
) -> usize {
    match profile {
        ProcessingProfile::Person => PortraitOptimizer::new(options).optimize(context, mask),
        ProcessingProfile::Product => ProductOptimizer::new(options).optimize(context, mask),
        ProcessingProfile::LogoText | ProcessingProfile::Document => {
            LogoTextOptimizer::new(options).optimize(context, mask)
        }
        ProcessingProfile::Mixed => 0,
    }
}

/// Fraction of pixels whose alpha is above 128.
pub fn foreground_ratio(mask: &AlphaMask) -> f32 {
    let total = mask.as_raw().len();
    if total == 0 {
        return 0.0;
    }
    let opaque = mask.as_raw().iter().filter(|&&a| a > FOREGROUND_ALPHA).count();
    opaque as f32 / total as f32
}

fn refine(
    original: &RasterImage,
    coarse_mask: Option<&AlphaMask>,
    profile_hint: Option<ProcessingProfile>,
    filename_hint: Option<&str>,
    options: &ProcessingOptions,
) -> Result<ProcessedImage, RefineError> {
    let (width, height) = original.dimensions();
    validate_non_empty_image(width, height)?;
    options.validate()?;
    if let Some(mask) = coarse_mask {
        validate_matching_dimensions(original.dimensions(), mask.dimensions())?;
    }

    let background = detect_background_color(original)?;
    let features = extract_features(original)?;
    let (profile, profile_source) = detect_profile(&features, profile_hint, filename_hint);
    debug!(
        background = ?background.0,
        %profile,
        source = ?profile_source,
        ?features,
        "image classified"
    );

    let mut mask = match coarse_mask {
        Some(mask) => mask.clone(),
        None => initial_segmentation(original, background, profile),
    };

    let context = RefineContext::new(original, background);
    let optimized = optimize_for_profile(profile, options, &context, &mut mask);
    let cleaned = EdgeCleanup::new(options.edge_cleanup_intensity).apply(&context, &mut mask);
    let outcome = ConservativeSafetyNet::new(options).apply(&context, &mut mask, filename_hint);

    let report = ProcessingReport {
        features,
        profile,
        profile_source,
        background: background.0,
        foreground_ratio: foreground_ratio(&mask),
        restored_pixels: outcome.restored_pixels,
        gross_removal_applied: outcome.gross_removal_applied,
    };
    info!(
        %profile,
        optimized,
        cleaned,
        restored = report.restored_pixels,
        gross_removal = report.gross_removal_applied,
        foreground_ratio = report.foreground_ratio,
        "mask refined"
    );

    let image = original.clone().replace_alpha(&mask)?;
    Ok(ProcessedImage { image, report })
}
