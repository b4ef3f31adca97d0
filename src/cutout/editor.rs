//! Brush-based manual mask editing with bounded undo.

use std::collections::VecDeque;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::{
    cutout::alpha_mask::ModifyAlpha, error::RefineError, utils::index_of, AlphaMask, RasterImage,
};

/// Number of snapshots kept; older ones are dropped first.
pub const HISTORY_CAPACITY: usize = 20;

/// Whether a stroke paints foreground or erases it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum BrushMode {
    Add,
    Remove,
}

impl BrushMode {
    const fn alpha(self) -> u8 {
        match self {
            Self::Add => u8::MAX,
            Self::Remove => 0,
        }
    }
}

/// A circular dab. The centre may lie outside the mask.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct BrushStroke {
    pub x: i32,
    pub y: i32,
    pub radius: u32,
    pub mode: BrushMode,
}

impl BrushStroke {
    pub const fn new(x: i32, y: i32, radius: u32, mode: BrushMode) -> Self {
        Self { x, y, radius, mode }
    }

    pub const fn add(x: i32, y: i32, radius: u32) -> Self {
        Self::new(x, y, radius, BrushMode::Add)
    }

    pub const fn remove(x: i32, y: i32, radius: u32) -> Self {
        Self::new(x, y, radius, BrushMode::Remove)
    }
}

/// One editing session: the live mask plus its undo history.
#[derive(Debug, Clone)]
pub struct MaskEditor {
    mask: AlphaMask,
    history: VecDeque<AlphaMask>,
}

impl MaskEditor {
    pub fn new(mask: AlphaMask) -> Self {
        Self {
            mask,
            history: VecDeque::with_capacity(HISTORY_CAPACITY),
        }
    }

    /// Starts a session on the alpha channel of a processed raster.
    pub fn from_image(image: &RasterImage) -> Self {
        Self::new(image.extract_alpha())
    }

    /// Replaces the mask and clears the history.
    pub fn load(&mut self, mask: AlphaMask) {
        self.mask = mask;
        self.history.clear();
    }

    pub fn mask(&self) -> &AlphaMask {
        &self.mask
    }

    pub fn into_mask(self) -> AlphaMask {
        self.mask
    }

    pub fn can_undo(&self) -> bool {
        !self.history.is_empty()
    }

    pub fn history_len(&self) -> usize {
        self.history.len()
    }

    /// Snapshots the current mask, then paints every pixel with
    /// `dx^2 + dy^2 <= radius^2`. Returns the number of pixels inside the
    /// clipped footprint.
    pub fn apply_brush_stroke(&mut self, stroke: BrushStroke) -> usize {
        if self.history.len() == HISTORY_CAPACITY {
            self.history.pop_front();
        }
        self.history.push_back(self.mask.clone());

        let (width, height) = self.mask.dimensions();
        let value = stroke.mode.alpha();
        let radius = i64::from(stroke.radius);
        let (cx, cy) = (i64::from(stroke.x), i64::from(stroke.y));

        let x0 = (cx - radius).max(0);
        let y0 = (cy - radius).max(0);
        let x1 = (cx + radius).min(i64::from(width) - 1);
        let y1 = (cy + radius).min(i64::from(height) - 1);

        // Squared offsets of a u32 radius exceed i64.
        let radius_squared = i128::from(radius).pow(2);
        let alpha: &mut [u8] = &mut self.mask;
        let mut painted = 0;
        for y in y0..=y1 {
            for x in x0..=x1 {
                let (dx, dy) = (i128::from(x - cx), i128::from(y - cy));
                if dx * dx + dy * dy <= radius_squared {
                    alpha[index_of(width, x as u32, y as u32)] = value;
                    painted += 1;
                }
            }
        }

        trace!(?stroke, painted, history = self.history.len(), "brush stroke");
        painted
    }

    /// Restores the most recent snapshot. Returns `false` when there is
    /// nothing to undo.
    pub fn undo(&mut self) -> bool {
        match self.history.pop_back() {
            Some(previous) => {
                self.mask = previous;
                true
            }
            None => false,
        }
    }

    /// Composes the edited mask onto `original`'s colours.
    ///
    /// # Errors
    ///
    /// * `RefineError::DimensionMismatch` - When `original` and the mask differ in size
    pub fn render(&self, original: &RasterImage) -> Result<RasterImage, RefineError> {
        original.clone().replace_alpha(&self.mask)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::create_uniform_mask;
    use image::Rgba;

    #[test]
    fn brush_paints_a_disk() {
        let mut editor = MaskEditor::new(AlphaMask::new(11, 11));
        // Radius 2 covers 13 pixels.
        assert_eq!(editor.apply_brush_stroke(BrushStroke::add(5, 5, 2)), 13);
        assert_eq!(editor.mask().get_pixel(5, 3)[0], 255);
        assert_eq!(editor.mask().get_pixel(7, 5)[0], 255);
        assert_eq!(editor.mask().get_pixel(7, 7)[0], 0);
    }

    #[test]
    fn footprint_is_clipped_at_the_border() {
        let mut editor = MaskEditor::new(create_uniform_mask(6, 6, 255));
        assert_eq!(editor.apply_brush_stroke(BrushStroke::remove(0, 0, 1)), 3);
        assert_eq!(editor.apply_brush_stroke(BrushStroke::remove(-10, -10, 3)), 0);
        assert_eq!(editor.mask().get_pixel(0, 0)[0], 0);
        assert_eq!(editor.mask().get_pixel(1, 1)[0], 255);
    }

    #[test]
    fn huge_radius_covers_the_whole_mask() {
        let mut editor = MaskEditor::new(AlphaMask::new(4, 4));
        assert_eq!(editor.apply_brush_stroke(BrushStroke::add(1, 1, u32::MAX)), 16);
        assert!(editor.mask().pixels().all(|p| p[0] == 255));

        // Centre about 3.04e9 away from the mask, still inside the radius.
        assert_eq!(
            editor.apply_brush_stroke(BrushStroke::remove(i32::MIN, i32::MIN, u32::MAX)),
            16
        );
        assert!(editor.mask().pixels().all(|p| p[0] == 0));
    }

    #[test]
    fn undo_walks_back_stroke_by_stroke() {
        let mut editor = MaskEditor::new(AlphaMask::new(20, 20));
        editor.apply_brush_stroke(BrushStroke::add(3, 3, 2));
        let after_first = editor.mask().clone();
        editor.apply_brush_stroke(BrushStroke::add(10, 10, 3));
        editor.apply_brush_stroke(BrushStroke::remove(3, 3, 1));

        assert!(editor.undo());
        assert!(editor.undo());
        assert_eq!(editor.mask(), &after_first);
        assert_eq!(editor.history_len(), 1);
    }

    #[test]
    fn undo_on_empty_history_is_a_no_op() {
        let mut editor = MaskEditor::new(create_uniform_mask(3, 3, 7));
        assert!(!editor.can_undo());
        assert!(!editor.undo());
        assert!(editor.mask().pixels().all(|p| p[0] == 7));
    }

    #[test]
    fn history_keeps_only_the_newest_snapshots() {
        let mut editor = MaskEditor::new(AlphaMask::new(30, 1));
        for x in 0..25 {
            editor.apply_brush_stroke(BrushStroke::add(x, 0, 0));
        }
        assert_eq!(editor.history_len(), HISTORY_CAPACITY);

        while editor.undo() {}
        // The oldest reachable state already has the first five strokes.
        let opaque = editor.mask().pixels().filter(|p| p[0] == 255).count();
        assert_eq!(opaque, 5);
    }

    #[test]
    fn load_clears_history() {
        let mut editor = MaskEditor::new(AlphaMask::new(4, 4));
        editor.apply_brush_stroke(BrushStroke::add(1, 1, 1));
        editor.load(create_uniform_mask(2, 2, 255));
        assert!(!editor.can_undo());
        assert_eq!(editor.mask().dimensions(), (2, 2));
    }

    #[test]
    fn render_keeps_original_colours() {
        let original = RasterImage::from_pixel(4, 4, Rgba([10, 20, 30, 255]));
        let mut editor = MaskEditor::from_image(&original);
        editor.apply_brush_stroke(BrushStroke::remove(0, 0, 0));

        let rendered = editor.render(&original).unwrap();
        assert_eq!(rendered.get_pixel(0, 0), &Rgba([10, 20, 30, 0]));
        assert_eq!(rendered.get_pixel(3, 3), &Rgba([10, 20, 30, 255]));

        let other = RasterImage::new(5, 4);
        assert!(matches!(
            editor.render(&other),
            Err(RefineError::DimensionMismatch { .. })
        ));
    }
}
