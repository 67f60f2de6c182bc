#![warn(missing_docs)]

//! Math types for the kdray ray tracer.
//!
//! Thin wrappers around nalgebra providing domain-specific types for
//! 3D rendering: points, vectors, directions, axis indices, and the
//! RGB color triple used by materials and the pixel buffer.

use nalgebra::{Unit, Vector3};

/// A point in 3D space.
pub type Point3 = nalgebra::Point3<f64>;

/// A vector in 3D space.
pub type Vec3 = Vector3<f64>;

/// A unit (normalized) direction vector in 3D space.
pub type Dir3 = Unit<Vector3<f64>>;

/// The X axis index.
pub const X: usize = 0;
/// The Y axis index.
pub const Y: usize = 1;
/// The Z axis index.
pub const Z: usize = 2;

/// All three axis indices, in sweep order.
pub const AXES: [usize; 3] = [X, Y, Z];

/// An RGB color with channels in `[0, 255]`.
///
/// Channels are stored as `f64` so shading terms accumulate without
/// quantization; [`Rgb::clamp`] snaps the result back into range before
/// it reaches the pixel buffer.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Rgb {
    /// Red channel.
    pub r: f64,
    /// Green channel.
    pub g: f64,
    /// Blue channel.
    pub b: f64,
}

impl Rgb {
    /// Pure black.
    pub const BLACK: Self = Self {
        r: 0.0,
        g: 0.0,
        b: 0.0,
    };

    /// Create a color from channel values.
    pub fn new(r: f64, g: f64, b: f64) -> Self {
        Self { r, g, b }
    }

    /// Channel-wise product, used for light/material modulation.
    pub fn modulate(&self, other: &Rgb) -> Rgb {
        Rgb::new(self.r * other.r, self.g * other.g, self.b * other.b)
    }

    /// Scale every channel by `s`.
    pub fn scale(&self, s: f64) -> Rgb {
        Rgb::new(self.r * s, self.g * s, self.b * s)
    }

    /// Channel-wise sum.
    pub fn add(&self, other: &Rgb) -> Rgb {
        Rgb::new(self.r + other.r, self.g + other.g, self.b + other.b)
    }

    /// Clamp every channel into `[0, 255]`.
    pub fn clamp(&self) -> Rgb {
        Rgb::new(
            self.r.clamp(0.0, 255.0),
            self.g.clamp(0.0, 255.0),
            self.b.clamp(0.0, 255.0),
        )
    }

    /// The largest channel value.
    pub fn max_channel(&self) -> f64 {
        self.r.max(self.g).max(self.b)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rgb_clamp() {
        let c = Rgb::new(-10.0, 128.0, 300.0).clamp();
        assert_eq!(c, Rgb::new(0.0, 128.0, 255.0));
    }

    #[test]
    fn test_rgb_modulate_scale() {
        let c = Rgb::new(100.0, 50.0, 25.0)
            .modulate(&Rgb::new(1.0, 0.5, 0.0))
            .scale(2.0);
        assert_eq!(c, Rgb::new(200.0, 50.0, 0.0));
    }

    #[test]
    fn test_axis_indexing() {
        let p = Point3::new(1.0, 2.0, 3.0);
        assert_eq!(p[X], 1.0);
        assert_eq!(p[Y], 2.0);
        assert_eq!(p[Z], 3.0);
    }
}
