#![warn(missing_docs)]

//! Scene graph, camera, and shading for the kdray ray tracer.
//!
//! A [`Scene`] owns meshes, point lights, and a [`Camera`]; rendering
//! rebuilds the KD-tree whenever geometry changed and then casts one ray
//! per pixel, in parallel across rows, shading hits with ambient +
//! Lambert diffuse + Blinn-Phong specular terms and bias-offset shadow
//! rays.

mod camera;
mod error;
mod film;
mod light;
mod scene;

pub use camera::Camera;
pub use error::{Result, SceneError};
pub use film::Film;
pub use light::Light;
pub use scene::Scene;
