//! Image file output.
//!
//! The output format follows the file extension: `.png` goes through the
//! image crate, anything else is written as plain-text PPM (P3).

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use anyhow::{Context, Result};
use kdray_scene::Film;

/// Write a rendered film to disk, picking the format from the extension.
pub fn save(film: &Film, path: &Path) -> Result<()> {
    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");
    match ext.to_lowercase().as_str() {
        "png" => save_png(film, path),
        _ => save_ppm(film, path),
    }
    .with_context(|| format!("could not write {}", path.display()))?;
    log::info!("wrote {}", path.display());
    Ok(())
}

/// Plain-text PPM. The declared maximum channel value is at least 255
/// but grows if the film carries brighter values.
fn save_ppm(film: &Film, path: &Path) -> Result<()> {
    let max_color = film.max_channel().ceil().max(255.0) as u32;
    let mut out = BufWriter::new(File::create(path)?);

    writeln!(out, "P3")?;
    writeln!(out, "{} {}", film.width(), film.height())?;
    writeln!(out, "{max_color}")?;
    for pixel in film.pixels() {
        writeln!(
            out,
            "{} {} {}",
            pixel.r.round() as u32,
            pixel.g.round() as u32,
            pixel.b.round() as u32
        )?;
    }
    out.flush()?;
    Ok(())
}

fn save_png(film: &Film, path: &Path) -> Result<()> {
    let image = image::RgbImage::from_fn(film.width(), film.height(), |x, y| {
        let pixel = film.pixel(x, y).clamp();
        image::Rgb([pixel.r as u8, pixel.g as u8, pixel.b as u8])
    });
    image.save(path)?;
    Ok(())
}
