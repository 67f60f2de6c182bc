//! Pinhole camera model.

use kdray_math::{Point3, Vec3};
use kdray_tree::Ray;

use crate::error::{Result, SceneError};

/// A pinhole camera looking down the negative Z axis.
///
/// The image plane sits at Z = 0 in camera space and the eye sits behind
/// it at a distance derived from the horizontal field of view. Both are
/// scaled by `1 / sqrt(width * height)` so the physical screen size, and
/// with it the framing, stays stable when the resolution changes.
#[derive(Debug, Clone)]
pub struct Camera {
    width: u32,
    height: u32,
    pixel_aspect: f64,
    scale: f64,
    fov_degrees: f64,
    position: Point3,
    screen_distance: f64,
}

impl Camera {
    /// Smallest accepted field of view, in degrees.
    pub const MIN_FOV: f64 = 10.0;
    /// Largest accepted field of view, in degrees.
    pub const MAX_FOV: f64 = 160.0;

    /// Create a camera at the origin with the given resolution, square
    /// pixels, and a 90 degree horizontal field of view.
    pub fn new(width: u32, height: u32) -> Result<Self> {
        if width == 0 || height == 0 {
            return Err(SceneError::InvalidResolution { width, height });
        }
        let mut camera = Self {
            width,
            height,
            pixel_aspect: 1.0,
            scale: 1.0,
            fov_degrees: 90.0,
            position: Point3::origin(),
            screen_distance: 0.0,
        };
        camera.update_screen_distance();
        Ok(camera)
    }

    fn update_screen_distance(&mut self) {
        let half_width = self.width as f64 * self.pixel_aspect / 2.0;
        self.screen_distance = half_width / (self.fov_degrees / 2.0).to_radians().tan();
    }

    /// Image width in pixels.
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Image height in pixels.
    pub fn height(&self) -> u32 {
        self.height
    }

    /// World-space position of the eye.
    pub fn position(&self) -> Point3 {
        self.position
    }

    /// Change the image resolution, preserving the field of view.
    pub fn set_resolution(&mut self, width: u32, height: u32) -> Result<()> {
        if width == 0 || height == 0 {
            return Err(SceneError::InvalidResolution { width, height });
        }
        self.width = width;
        self.height = height;
        self.update_screen_distance();
        Ok(())
    }

    /// Set the horizontal field of view in degrees, clamped to
    /// `[MIN_FOV, MAX_FOV]`.
    pub fn set_fov(&mut self, degrees: f64) {
        self.fov_degrees = degrees.clamp(Self::MIN_FOV, Self::MAX_FOV);
        self.update_screen_distance();
    }

    /// Set the pixel width/height ratio. Values `<= 0` are ignored.
    pub fn set_pixel_aspect(&mut self, aspect: f64) {
        if aspect > 0.0 {
            self.pixel_aspect = aspect;
            self.update_screen_distance();
        }
    }

    /// Set the world-space screen scale factor. Values `<= 0` are ignored.
    pub fn set_scale(&mut self, scale: f64) {
        if scale > 0.0 {
            self.scale = scale;
        }
    }

    /// Move the eye to an absolute position.
    pub fn set_position(&mut self, x: f64, y: f64, z: f64) {
        self.position = Point3::new(x, y, z);
    }

    /// Move the eye by a relative offset.
    pub fn translate(&mut self, dx: f64, dy: f64, dz: f64) {
        self.position += Vec3::new(dx, dy, dz);
    }

    /// Primary ray through the center of pixel `(col, row)`, with row 0
    /// at the top of the image.
    pub fn get_ray(&self, col: u32, row: u32) -> Ray {
        debug_assert!(col < self.width && row < self.height);
        let (w, h) = (self.width as f64, self.height as f64);
        let norm = self.scale / (w * h).sqrt();

        let pixel = Vec3::new(
            ((col as f64 + 0.5) - w / 2.0) * self.pixel_aspect,
            -((row as f64 + 0.5) - h / 2.0),
            0.0,
        ) * norm;
        let eye = Vec3::new(0.0, 0.0, self.screen_distance * norm);

        Ray::new(self.position + eye, pixel - eye)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use kdray_math::{X, Y, Z};

    #[test]
    fn test_zero_resolution_rejected() {
        assert!(Camera::new(0, 10).is_err());
        let mut camera = Camera::new(4, 4).unwrap();
        assert!(camera.set_resolution(4, 0).is_err());
    }

    #[test]
    fn test_center_pixel_looks_down_negative_z() {
        let camera = Camera::new(3, 3).unwrap();
        let ray = camera.get_ray(1, 1);
        assert_relative_eq!(ray.direction[X], 0.0);
        assert_relative_eq!(ray.direction[Y], 0.0);
        assert_relative_eq!(ray.direction[Z], -1.0);
    }

    #[test]
    fn test_rays_fan_out_from_center() {
        let camera = Camera::new(5, 5).unwrap();
        let left = camera.get_ray(0, 2);
        let right = camera.get_ray(4, 2);
        let top = camera.get_ray(2, 0);
        assert!(left.direction[X] < 0.0);
        assert!(right.direction[X] > 0.0);
        assert!(top.direction[Y] > 0.0);
    }

    #[test]
    fn test_fov_clamped() {
        let mut camera = Camera::new(8, 8).unwrap();
        camera.set_fov(500.0);
        let wide = camera.get_ray(0, 4);
        camera.set_fov(1.0);
        let narrow = camera.get_ray(0, 4);
        // A wider field of view bends the edge ray further off axis.
        assert!(wide.direction[X] < narrow.direction[X]);
    }

    #[test]
    fn test_framing_independent_of_resolution() {
        let coarse = Camera::new(11, 11).unwrap();
        let fine = Camera::new(121, 121).unwrap();
        // Center pixel of the coarse image and of the fine image aim the
        // same way, so a resolution change only refines the sampling.
        let a = coarse.get_ray(5, 5);
        let b = fine.get_ray(60, 60);
        assert_relative_eq!(a.direction[X], b.direction[X], epsilon = 1e-12);
        assert_relative_eq!(a.direction[Y], b.direction[Y], epsilon = 1e-12);
        assert_relative_eq!(a.direction[Z], b.direction[Z], epsilon = 1e-12);
    }

    #[test]
    fn test_translate_moves_origin() {
        let mut camera = Camera::new(3, 3).unwrap();
        camera.set_position(1.0, 2.0, 3.0);
        camera.translate(0.0, 0.0, -1.0);
        assert_relative_eq!(camera.position()[Z], 2.0);
        let ray = camera.get_ray(1, 1);
        assert_relative_eq!(ray.origin[X], 1.0);
        assert_relative_eq!(ray.origin[Y], 2.0);
    }
}
