//! Error types for scene setup.

use thiserror::Error;

/// Errors that can occur configuring a scene or camera.
#[derive(Error, Debug)]
pub enum SceneError {
    /// Camera resolution must be at least 1x1.
    #[error("resolution must be at least 1x1, got {width}x{height}")]
    InvalidResolution {
        /// Requested width.
        width: u32,
        /// Requested height.
        height: u32,
    },

    /// Light intensities must be non-negative.
    #[error("light intensity must be non-negative")]
    NegativeIntensity,
}

/// Result type for scene operations.
pub type Result<T> = std::result::Result<T, SceneError>;
