//! Heuristic image-type classification.
//!
//! This is not a trained model: a single pass extracts a handful of scalar
//! features and [`classify`] maps them to a [`ProcessingProfile`] through the
//! fixed thresholds in [`ClassifierThresholds`]. Wrong guesses are expected;
//! callers can always force a profile.

use itertools::iproduct;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::{
    cutout::{
        background::BackgroundSampler,
        color::{is_skin_tone, luminance, rgb_of},
    },
    error::RefineError,
    options::ProcessingProfile,
    utils::{validate_non_empty_image, Ellipse},
    RasterImage,
};

/// Local gradient above which a pixel counts toward edge density.
const EDGE_GRADIENT: f32 = 50.0;
/// Local gradient above which a pixel counts toward high-contrast density.
const HIGH_CONTRAST_GRADIENT: f32 = 100.0;
/// Border colour variance that maps to zero uniformity.
const BORDER_VARIANCE_SCALE: f64 = 10_000.0;
/// Face region as fractions of the image: centre `(x, y)` and radii `(x, y)`.
const FACE_CENTER: (f32, f32) = (0.5, 1.0 / 3.0);
const FACE_RADII: (f32, f32) = (0.2, 0.2);

/// Scalar scores in `[0, 1]` describing an image.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
pub struct ImageFeatures {
    /// Fraction of pixels passing the skin-tone test
    pub skin_tone_score: f32,
    /// Skin-tone fraction inside the upper-central face ellipse
    pub face_likeness: f32,
    /// Fraction of pixels with a local gradient above 50
    pub edge_sharpness: f32,
    /// One minus the normalized variance of border colours
    pub color_uniformity: f32,
    /// Fraction of pixels with a local gradient above 100
    pub high_contrast_areas: f32,
    /// Reserved, always zero
    pub small_features: f32,
    /// Reserved, always zero
    pub text_likeness: f32,
}

/// Decision thresholds for [`classify`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClassifierThresholds {
    pub person_skin_tone: f32,
    pub person_face_likeness: f32,
    pub product_edge_sharpness: f32,
    pub product_color_uniformity: f32,
    pub logo_high_contrast: f32,
}

impl Default for ClassifierThresholds {
    fn default() -> Self {
        Self {
            person_skin_tone: 0.3,
            person_face_likeness: 0.5,
            product_edge_sharpness: 0.7,
            product_color_uniformity: 0.6,
            logo_high_contrast: 0.4,
        }
    }
}

const PERSON_KEYWORDS: &[&str] = &[
    "portrait", "person", "people", "selfie", "face", "headshot", "avatar", "human", "woman",
    "girl", "profile",
];
const PRODUCT_KEYWORDS: &[&str] = &[
    "product", "item", "shop", "merch", "catalog", "packshot", "sku",
];
const LOGO_KEYWORDS: &[&str] = &["logo", "icon", "text", "brand", "emblem", "badge", "signature"];
const DOCUMENT_KEYWORDS: &[&str] = &["document", "scan", "receipt", "invoice", "paper", "letter"];

/// Maps a filename to a profile by keyword, case-insensitively.
///
/// The name is split into alphanumeric tokens and a keyword matches a whole
/// token or its plural, so `surface.png` is not a face and `context.png` is
/// not text. Keyword groups are checked in the order person, product, logo,
/// document.
pub fn classify_filename(filename: &str) -> Option<ProcessingProfile> {
    let name = filename.to_lowercase();
    let tokens: Vec<&str> = name
        .split(|c: char| !c.is_alphanumeric())
        .filter(|token| !token.is_empty())
        .collect();
    let matches = |keywords: &[&str]| {
        tokens
            .iter()
            .any(|token| keywords.iter().any(|keyword| token_matches(token, keyword)))
    };

    [
        (PERSON_KEYWORDS, ProcessingProfile::Person),
        (PRODUCT_KEYWORDS, ProcessingProfile::Product),
        (LOGO_KEYWORDS, ProcessingProfile::LogoText),
        (DOCUMENT_KEYWORDS, ProcessingProfile::Document),
    ]
    .into_iter()
    .find(|&(keywords, _)| matches(keywords))
    .map(|(_, profile)| profile)
}

fn token_matches(token: &str, keyword: &str) -> bool {
    token == keyword || token.strip_suffix('s') == Some(keyword)
}

/// Extracts [`ImageFeatures`] in one pass over the pixels.
///
/// # Errors
///
/// * `RefineError::EmptyImage` - When either dimension is zero
pub fn extract_features(image: &RasterImage) -> Result<ImageFeatures, RefineError> {
    let (width, height) = image.dimensions();
    validate_non_empty_image(width, height)?;

    let luma_at = |x: u32, y: u32| luminance(rgb_of(*image.get_pixel(x, y)));
    let face = Ellipse::relative(width, height, FACE_CENTER, FACE_RADII);

    let mut skin = 0usize;
    let mut face_pixels = 0usize;
    let mut face_skin = 0usize;
    let mut edges = 0usize;
    let mut high_contrast = 0usize;

    for (y, x) in iproduct!(0..height, 0..width) {
        let pixel = rgb_of(*image.get_pixel(x, y));
        let is_skin = is_skin_tone(pixel);
        skin += usize::from(is_skin);

        if face.contains(x, y) {
            face_pixels += 1;
            face_skin += usize::from(is_skin);
        }

        if x + 1 < width && y + 1 < height {
            let center = luminance(pixel);
            let gradient = (luma_at(x + 1, y) - center).abs() + (luma_at(x, y + 1) - center).abs();
            edges += usize::from(gradient > EDGE_GRADIENT);
            high_contrast += usize::from(gradient > HIGH_CONTRAST_GRADIENT);
        }
    }

    let total = (width as usize * height as usize) as f32;
    let ratio = |count: usize, of: f32| if of > 0.0 { count as f32 / of } else { 0.0 };

    Ok(ImageFeatures {
        skin_tone_score: ratio(skin, total),
        face_likeness: ratio(face_skin, face_pixels as f32),
        edge_sharpness: ratio(edges, total),
        color_uniformity: border_uniformity(image),
        high_contrast_areas: ratio(high_contrast, total),
        small_features: 0.0,
        text_likeness: 0.0,
    })
}

fn border_uniformity(image: &RasterImage) -> f32 {
    let (width, height) = image.dimensions();
    let mut sums = [0f64; 3];
    let mut squares = [0f64; 3];
    let mut count = 0f64;

    BackgroundSampler::default().for_each_sample(width, height, |x, y| {
        let pixel = image.get_pixel(x, y);
        for c in 0..3 {
            let v = f64::from(pixel[c]);
            sums[c] += v;
            squares[c] += v * v;
        }
        count += 1.0;
    });

    if count == 0.0 {
        return 1.0;
    }
    let variance = (0..3)
        .map(|c| {
            let mean = sums[c] / count;
            (squares[c] / count - mean * mean).max(0.0)
        })
        .sum::<f64>()
        / 3.0;

    (1.0 - variance / BORDER_VARIANCE_SCALE).max(0.0) as f32
}

/// Maps features to a profile. Pure; the first matching rule wins.
pub fn classify(features: &ImageFeatures, thresholds: &ClassifierThresholds) -> ProcessingProfile {
    if features.skin_tone_score > thresholds.person_skin_tone
        && features.face_likeness > thresholds.person_face_likeness
    {
        ProcessingProfile::Person
    } else if features.edge_sharpness > thresholds.product_edge_sharpness
        && features.color_uniformity > thresholds.product_color_uniformity
    {
        ProcessingProfile::Product
    } else if features.high_contrast_areas > thresholds.logo_high_contrast {
        ProcessingProfile::LogoText
    } else {
        ProcessingProfile::Mixed
    }
}

/// Where the chosen profile came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "kebab-case"))]
pub enum ProfileSource {
    /// Forced by the caller
    Caller,
    /// Matched a filename keyword
    FilenameHint,
    /// Derived from image features
    Features,
}

/// Resolves the profile: caller override, then filename hint, then features.
pub fn detect_profile(
    features: &ImageFeatures,
    profile_hint: Option<ProcessingProfile>,
    filename_hint: Option<&str>,
) -> (ProcessingProfile, ProfileSource) {
    if let Some(profile) = profile_hint {
        return (profile, ProfileSource::Caller);
    }
    if let Some(profile) = filename_hint.and_then(classify_filename) {
        return (profile, ProfileSource::FilenameHint);
    }
    (
        classify(features, &ClassifierThresholds::default()),
        ProfileSource::Features,
    )
}
