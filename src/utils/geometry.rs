/// Axis-aligned ellipse in pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ellipse {
    pub center_x: f32,
    pub center_y: f32,
    pub radius_x: f32,
    pub radius_y: f32,
}

impl Ellipse {
    /// Builds an ellipse from fractions of the image size.
    ///
    /// `center` and `radii` are `(x, y)` fractions of `(width, height)`.
    pub fn relative(width: u32, height: u32, center: (f32, f32), radii: (f32, f32)) -> Self {
        let (w, h) = (width as f32, height as f32);
        Self {
            center_x: w * center.0,
            center_y: h * center.1,
            radius_x: (w * radii.0).max(0.5),
            radius_y: (h * radii.1).max(0.5),
        }
    }

    /// Returns a copy scaled around the same centre.
    pub fn scaled(self, factor: f32) -> Self {
        Self {
            radius_x: self.radius_x * factor,
            radius_y: self.radius_y * factor,
            ..self
        }
    }

    /// Tests the centre of pixel `(x, y)`.
    #[inline]
    pub fn contains(&self, x: u32, y: u32) -> bool {
        let dx = (x as f32 + 0.5 - self.center_x) / self.radius_x;
        let dy = (y as f32 + 0.5 - self.center_y) / self.radius_y;
        dx * dx + dy * dy <= 1.0
    }
}

/// Tests whether the centre of pixel `(x, y)` lies in the disk of `radius`
/// centred on the image.
#[inline]
pub fn centered_disk_contains(width: u32, height: u32, radius: f32, x: u32, y: u32) -> bool {
    let dx = x as f32 + 0.5 - width as f32 / 2.0;
    let dy = y as f32 + 0.5 - height as f32 / 2.0;
    dx * dx + dy * dy <= radius * radius
}
