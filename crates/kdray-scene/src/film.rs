//! Rendered pixel buffer.

use kdray_math::Rgb;

/// A width x height grid of RGB pixels, stored row-major with row 0 at
/// the top.
#[derive(Debug, Clone)]
pub struct Film {
    width: u32,
    height: u32,
    pixels: Vec<Rgb>,
}

impl Film {
    /// Create an all-black film.
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            pixels: vec![Rgb::BLACK; (width as usize) * (height as usize)],
        }
    }

    /// Image width in pixels.
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Image height in pixels.
    pub fn height(&self) -> u32 {
        self.height
    }

    /// The pixel at `(col, row)`.
    pub fn pixel(&self, col: u32, row: u32) -> Rgb {
        self.pixels[(row * self.width + col) as usize]
    }

    /// All pixels, row-major.
    pub fn pixels(&self) -> &[Rgb] {
        &self.pixels
    }

    /// Mutable row slices, top to bottom. Suitable for parallel
    /// iteration with rayon.
    pub fn rows_mut(&mut self) -> std::slice::ChunksMut<'_, Rgb> {
        self.pixels.chunks_mut(self.width as usize)
    }

    /// The brightest channel value anywhere in the image.
    pub fn max_channel(&self) -> f64 {
        self.pixels
            .iter()
            .map(Rgb::max_channel)
            .fold(0.0, f64::max)
    }
}
