//! Internal utility functions for cutout-refine.
//!
//! This module contains common functionality used across the refinement stages:
//! dimension validation, neighbourhood iteration over flat buffers and the
//! ellipse geometry shared by the face heuristics.

mod geometry;
pub use geometry::{centered_disk_contains, Ellipse};

use crate::error::RefineError;

/// Offsets of the 8-connected neighbourhood, row by row.
pub const NEIGHBORS_8: [(i32, i32); 8] = [
    (-1, -1),
    (0, -1),
    (1, -1),
    (-1, 0),
    (1, 0),
    (-1, 1),
    (0, 1),
    (1, 1),
];

/// Offsets of the 4-connected neighbourhood.
pub const NEIGHBORS_4: [(i32, i32); 4] = [(0, -1), (-1, 0), (1, 0), (0, 1)];

/// Validates that an image has non-zero dimensions.
///
/// # Arguments
///
/// * `width` - The width of the image
/// * `height` - The height of the image
///
/// # Returns
///
/// `Ok(())` if the dimensions are valid, otherwise `RefineError::EmptyImage`
pub const fn validate_non_empty_image(width: u32, height: u32) -> Result<(), RefineError> {
    if width == 0 || height == 0 {
        Err(RefineError::EmptyImage { width, height })
    } else {
        Ok(())
    }
}

/// Validates that two images have matching dimensions.
///
/// `expected` is the raster the caller treats as authoritative.
pub const fn validate_matching_dimensions(
    expected: (u32, u32),
    actual: (u32, u32),
) -> Result<(), RefineError> {
    if expected.0 != actual.0 || expected.1 != actual.1 {
        Err(RefineError::DimensionMismatch { expected, actual })
    } else {
        Ok(())
    }
}

/// Flat index of `(x, y)` in a row-major single-channel buffer.
#[inline]
pub const fn index_of(width: u32, x: u32, y: u32) -> usize {
    y as usize * width as usize + x as usize
}

/// Calls `f` with the flat index of every in-bounds neighbour of `(x, y)`.
#[inline]
pub fn for_each_neighbor<F>(
    offsets: &[(i32, i32)],
    width: u32,
    height: u32,
    x: u32,
    y: u32,
    mut f: F,
) where
    F: FnMut(usize),
{
    for &(dx, dy) in offsets {
        let nx = x as i64 + i64::from(dx);
        let ny = y as i64 + i64::from(dy);
        if nx >= 0 && ny >= 0 && nx < i64::from(width) && ny < i64::from(height) {
            f(ny as usize * width as usize + nx as usize);
        }
    }
}

/// Calls `f` with the flat index of every in-bounds pixel of the square
/// window of `radius` around `(x, y)`, centre included.
#[inline]
pub fn for_each_in_window<F>(radius: u32, width: u32, height: u32, x: u32, y: u32, mut f: F)
where
    F: FnMut(usize),
{
    let x0 = x.saturating_sub(radius);
    let y0 = y.saturating_sub(radius);
    let x1 = (x + radius).min(width - 1);
    let y1 = (y + radius).min(height - 1);
    for ny in y0..=y1 {
        let row = ny as usize * width as usize;
        for nx in x0..=x1 {
            f(row + nx as usize);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_non_empty_image() {
        assert!(validate_non_empty_image(100, 100).is_ok());
        assert!(validate_non_empty_image(1, 1).is_ok());
        assert_eq!(
            validate_non_empty_image(0, 100),
            Err(RefineError::EmptyImage {
                width: 0,
                height: 100
            })
        );
        assert!(validate_non_empty_image(100, 0).is_err());
        assert!(validate_non_empty_image(0, 0).is_err());
    }

    #[test]
    fn test_validate_matching_dimensions() {
        assert!(validate_matching_dimensions((100, 100), (100, 100)).is_ok());
        assert!(validate_matching_dimensions((50, 75), (50, 75)).is_ok());
        assert_eq!(
            validate_matching_dimensions((100, 100), (100, 50)),
            Err(RefineError::DimensionMismatch {
                expected: (100, 100),
                actual: (100, 50)
            })
        );
        assert!(validate_matching_dimensions((100, 100), (50, 100)).is_err());
    }

    #[test]
    fn corner_pixel_has_three_neighbors() {
        let mut seen = Vec::new();
        for_each_neighbor(&NEIGHBORS_8, 4, 4, 0, 0, |i| seen.push(i));
        assert_eq!(seen, vec![1, 4, 5]);
    }

    #[test]
    fn interior_pixel_has_eight_neighbors() {
        let mut count = 0;
        for_each_neighbor(&NEIGHBORS_8, 4, 4, 1, 1, |_| count += 1);
        assert_eq!(count, 8);

        let mut count = 0;
        for_each_neighbor(&NEIGHBORS_4, 4, 4, 1, 1, |_| count += 1);
        assert_eq!(count, 4);
    }

    #[test]
    fn window_is_clipped_at_the_border() {
        let mut count = 0;
        for_each_in_window(2, 10, 10, 0, 0, |_| count += 1);
        assert_eq!(count, 9);

        let mut count = 0;
        for_each_in_window(2, 10, 10, 5, 5, |_| count += 1);
        assert_eq!(count, 25);
    }
}
