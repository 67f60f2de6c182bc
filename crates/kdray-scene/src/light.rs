//! Point light sources.

use kdray_math::{Point3, Rgb};

use crate::error::{Result, SceneError};

/// An omnidirectional point light.
///
/// Intensity is a per-channel multiplier applied to the surface color,
/// so `(1, 1, 1)` is a neutral white light at full strength.
#[derive(Debug, Clone)]
pub struct Light {
    /// World-space position.
    pub position: Point3,
    /// Per-channel intensity.
    pub intensity: Rgb,
}

impl Light {
    /// Create a light, rejecting negative intensities.
    pub fn new(position: Point3, intensity: Rgb) -> Result<Self> {
        if intensity.r < 0.0 || intensity.g < 0.0 || intensity.b < 0.0 {
            return Err(SceneError::NegativeIntensity);
        }
        Ok(Self {
            position,
            intensity,
        })
    }
}
