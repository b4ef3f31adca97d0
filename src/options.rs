//! Processing profiles and the caller-facing option record.

use std::fmt;
use std::str::FromStr;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::error::RefineError;

/// Processing strategy chosen for an image.
///
/// The profile decides which colour-distance threshold the initial segmenter
/// uses and which optimizer repairs the coarse mask.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "kebab-case"))]
pub enum ProcessingProfile {
    /// Portraits and other images of people
    Person,
    /// Product shots on a mostly uniform backdrop
    Product,
    /// Logos, icons and lettering
    LogoText,
    /// Scanned pages and receipts
    Document,
    /// Anything else; only the profile-independent stages run
    #[default]
    Mixed,
}

impl ProcessingProfile {
    /// Every profile, in declaration order.
    pub const ALL: [Self; 5] = [
        Self::Person,
        Self::Product,
        Self::LogoText,
        Self::Document,
        Self::Mixed,
    ];

    /// Maximum RGB distance to the background colour at which the initial
    /// segmenter removes a pixel. Smaller values remove less.
    pub const fn segmentation_threshold(self) -> f32 {
        match self {
            Self::Person => 40.0,
            Self::Product => 60.0,
            Self::LogoText => 30.0,
            Self::Document | Self::Mixed => 50.0,
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Person => "person",
            Self::Product => "product",
            Self::LogoText => "logo-text",
            Self::Document => "document",
            Self::Mixed => "mixed",
        }
    }
}

impl fmt::Display for ProcessingProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProcessingProfile {
    type Err = RefineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "person" | "portrait" => Ok(Self::Person),
            "product" => Ok(Self::Product),
            "logo-text" | "logotext" | "logo_text" | "logo" => Ok(Self::LogoText),
            "document" => Ok(Self::Document),
            "mixed" => Ok(Self::Mixed),
            other => Err(RefineError::InvalidParameter(format!(
                "unknown processing profile '{other}'"
            ))),
        }
    }
}

/// Caller-supplied toggles for the refinement pipeline.
///
/// Every field has a default; override only what you need:
///
/// ```
/// use cutout_refine::ProcessingOptions;
///
/// let options = ProcessingOptions::default()
///     .with_edge_cleanup_intensity(0.5)
///     .with_minimum_foreground_ratio(0.1);
/// assert!(options.protect_hair);
/// assert!(options.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default, rename_all = "camelCase"))]
pub struct ProcessingOptions {
    /// Portrait: feather wispy hair strands back in
    pub protect_hair: bool,
    /// Portrait: recover skin-toned pixels the segmenter removed
    pub protect_skin: bool,
    /// Portrait: blur the alpha by radius 1
    pub smooth_edges: bool,
    /// Portrait: fill enclosed holes up to 50 pixels
    pub fill_holes: bool,
    /// Product: snap soft edge pixels to fully opaque or transparent
    pub sharp_edges: bool,
    /// Product: drop dark semi-transparent pixels
    pub remove_shadows: bool,
    /// Product: drop partially transparent pixels close to the background colour
    pub clean_background: bool,
    /// LogoText: force high-contrast stroke pixels opaque
    pub preserve_sharpness: bool,
    /// LogoText: fill enclosed holes up to 10 pixels
    pub fill_character_holes: bool,
    /// LogoText: snap anti-aliasing fringe to its surroundings
    pub remove_anti_aliasing: bool,
    /// Aggressiveness of halo removal in `[0, 1]`
    pub edge_cleanup_intensity: f32,
    /// Fraction of pixels in `[0, 1]` that must stay opaque
    pub minimum_foreground_ratio: f32,
    /// Enables the liberal protection masks and the gross-removal fallback
    pub conservative: bool,
}

impl Default for ProcessingOptions {
    fn default() -> Self {
        Self {
            protect_hair: true,
            protect_skin: true,
            smooth_edges: true,
            fill_holes: true,
            sharp_edges: true,
            remove_shadows: true,
            clean_background: true,
            preserve_sharpness: true,
            fill_character_holes: true,
            remove_anti_aliasing: true,
            edge_cleanup_intensity: 0.8,
            minimum_foreground_ratio: 0.3,
            conservative: true,
        }
    }
}

impl ProcessingOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_edge_cleanup_intensity(mut self, intensity: f32) -> Self {
        self.edge_cleanup_intensity = intensity;
        self
    }

    pub fn with_minimum_foreground_ratio(mut self, ratio: f32) -> Self {
        self.minimum_foreground_ratio = ratio;
        self
    }

    pub fn with_conservative(mut self, conservative: bool) -> Self {
        self.conservative = conservative;
        self
    }

    pub fn with_smooth_edges(mut self, smooth_edges: bool) -> Self {
        self.smooth_edges = smooth_edges;
        self
    }

    pub fn with_fill_holes(mut self, fill_holes: bool) -> Self {
        self.fill_holes = fill_holes;
        self
    }

    /// Checks that the numeric fields are finite and within `[0, 1]`.
    ///
    /// # Errors
    ///
    /// * `RefineError::InvalidParameter` - naming the offending field
    pub fn validate(&self) -> Result<(), RefineError> {
        validate_unit_interval("edge_cleanup_intensity", self.edge_cleanup_intensity)?;
        validate_unit_interval("minimum_foreground_ratio", self.minimum_foreground_ratio)
    }
}

fn validate_unit_interval(name: &str, value: f32) -> Result<(), RefineError> {
    if value.is_finite() && (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(RefineError::InvalidParameter(format!(
            "{name} must be within [0, 1], got {value}"
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn thresholds_follow_profile() {
        assert_eq!(ProcessingProfile::Person.segmentation_threshold(), 40.0);
        assert_eq!(ProcessingProfile::Product.segmentation_threshold(), 60.0);
        assert_eq!(ProcessingProfile::LogoText.segmentation_threshold(), 30.0);
        assert_eq!(ProcessingProfile::Document.segmentation_threshold(), 50.0);
        assert_eq!(ProcessingProfile::Mixed.segmentation_threshold(), 50.0);
    }

    #[test]
    fn profile_names_round_trip_through_from_str() {
        for profile in ProcessingProfile::ALL {
            let parsed: ProcessingProfile = profile.to_string().parse().unwrap();
            assert_eq!(parsed, profile);
        }
        assert_eq!(
            "  LOGO ".parse::<ProcessingProfile>().unwrap(),
            ProcessingProfile::LogoText
        );
        assert!("landscape".parse::<ProcessingProfile>().is_err());
    }

    #[test]
    fn default_options_are_valid() {
        let options = ProcessingOptions::default();
        assert!(options.validate().is_ok());
        assert_eq!(options.edge_cleanup_intensity, 0.8);
        assert_eq!(options.minimum_foreground_ratio, 0.3);
    }

    #[test]
    fn out_of_range_options_are_rejected() {
        let options = ProcessingOptions::default().with_edge_cleanup_intensity(1.5);
        assert!(matches!(
            options.validate(),
            Err(RefineError::InvalidParameter(message))
                if message.contains("edge_cleanup_intensity")
        ));

        let options = ProcessingOptions::default().with_minimum_foreground_ratio(f32::NAN);
        assert!(options.validate().is_err());
    }

    #[cfg(feature = "serde")]
    #[test]
    fn partial_json_overrides_only_named_fields() {
        let options: ProcessingOptions =
            serde_json::from_str(r#"{"protectHair": false, "minimumForegroundRatio": 0.5}"#)
                .unwrap();
        assert!(!options.protect_hair);
        assert!(options.protect_skin);
        assert_eq!(options.minimum_foreground_ratio, 0.5);
        assert_eq!(options.edge_cleanup_intensity, 0.8);
    }
}
