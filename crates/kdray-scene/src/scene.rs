//! Scene container and renderer.

use std::sync::Arc;
use std::time::Instant;

use kdray_math::Rgb;
use kdray_ply::TriMesh;
use kdray_tree::{Aabb, KdTree, Ray};
use rayon::prelude::*;

use crate::error::Result;
use crate::{Camera, Film, Light};

/// A renderable scene: meshes, point lights, and a camera.
///
/// Geometry edits mark the scene dirty; the KD-tree over all triangles is
/// rebuilt lazily at the start of the next render, so any number of
/// add/load operations between renders cost one rebuild.
pub struct Scene {
    /// The scene's camera. Moving it never dirties the geometry.
    pub camera: Camera,
    objects: Vec<TriMesh>,
    lights: Vec<Light>,
    tree: Option<KdTree>,
    modified: bool,
}

impl Scene {
    /// Create an empty scene with a camera at the given resolution.
    pub fn new(width: u32, height: u32) -> Result<Self> {
        Ok(Self {
            camera: Camera::new(width, height)?,
            objects: Vec::new(),
            lights: Vec::new(),
            tree: None,
            modified: false,
        })
    }

    /// Add a mesh to the scene.
    pub fn add_object(&mut self, mesh: TriMesh) {
        self.objects.push(mesh);
        self.modified = true;
    }

    /// Add a point light to the scene.
    pub fn add_light(&mut self, light: Light) {
        self.lights.push(light);
    }

    /// Number of meshes.
    pub fn num_objects(&self) -> usize {
        self.objects.len()
    }

    /// Number of lights.
    pub fn num_lights(&self) -> usize {
        self.lights.len()
    }

    /// Total triangle count across all meshes.
    pub fn num_triangles(&self) -> usize {
        self.objects.iter().map(TriMesh::len).sum()
    }

    /// The current acceleration structure, if one has been built.
    pub fn tree(&self) -> Option<&KdTree> {
        self.tree.as_ref()
    }

    /// Rebuild the KD-tree if geometry changed since the last build.
    pub fn rebuild(&mut self) {
        if !self.modified {
            return;
        }
        self.modified = false;

        let total = self.num_triangles();
        if total == 0 {
            self.tree = None;
            return;
        }

        let mut tris = Vec::with_capacity(total);
        let mut bounds = Aabb::empty();
        for mesh in &self.objects {
            tris.extend(mesh.tris.iter().cloned());
            bounds = bounds.union(&mesh.bounds);
        }

        let start = Instant::now();
        self.tree = Some(KdTree::build(Arc::new(tris), bounds));
        log::info!(
            "kd-tree rebuilt over {} triangles in {:.1?}",
            total,
            start.elapsed()
        );
    }

    /// Render the scene at the camera's resolution.
    ///
    /// One primary ray per pixel, rows shaded in parallel. Pixels whose
    /// ray misses everything stay black.
    pub fn render(&mut self) -> Film {
        self.rebuild();
        let mut film = Film::new(self.camera.width(), self.camera.height());
        let Some(tree) = self.tree.as_ref() else {
            return film;
        };

        let start = Instant::now();
        let camera = &self.camera;
        let lights = &self.lights;
        film.rows_mut()
            .enumerate()
            .par_bridge()
            .for_each(|(row, pixels)| {
                for (col, pixel) in pixels.iter_mut().enumerate() {
                    let mut ray = camera.get_ray(col as u32, row as u32);
                    if tree.intersect(&mut ray) {
                        *pixel = shade(tree, lights, &ray);
                    }
                }
            });
        log::info!(
            "rendered {}x{} in {:.1?}",
            film.width(),
            film.height(),
            start.elapsed()
        );
        film
    }

    /// Render a hit/miss silhouette as text, one character per pixel:
    /// `|` where the primary ray strikes geometry, `.` where it misses.
    pub fn render_preview(&mut self) -> String {
        self.rebuild();
        let (w, h) = (self.camera.width(), self.camera.height());
        let mut out = String::with_capacity(((w + 1) * h) as usize);
        for row in 0..h {
            for col in 0..w {
                let mut ray = self.camera.get_ray(col, row);
                let hit = match self.tree.as_ref() {
                    Some(tree) => tree.intersect(&mut ray),
                    None => false,
                };
                out.push(if hit { '|' } else { '.' });
            }
            out.push('\n');
        }
        out
    }
}

/// Shade the closest hit recorded in `tracer`.
///
/// Ambient reflectance plus, per unoccluded light, a Lambert diffuse term
/// and a Blinn-Phong specular term. Shadow rays start a small bias along
/// the surface normal to avoid re-hitting the surface they leave.
fn shade(tree: &KdTree, lights: &[Light], tracer: &Ray) -> Rgb {
    let Some(index) = tracer.hit else {
        return Rgb::BLACK;
    };
    let tri = &tree.triangles()[index as usize];
    let surface = tracer.intersection() + tri.normal * Ray::BIAS;

    let mut pixel = tri.ka;
    for light in lights {
        let to_light = light.position - surface;
        let distance = to_light.norm();

        let mut shadow = Ray::new(surface, to_light);
        tree.intersect(&mut shadow);
        if shadow.t < distance {
            continue;
        }

        let cos = shadow.direction.dot(&tri.normal);
        if cos <= 0.0 {
            continue;
        }
        let tint = tri.color.modulate(&light.intensity);
        pixel = pixel.add(&tint.scale(tri.kd * cos));

        let halfway = (shadow.direction - tracer.direction).normalize();
        let blinn = tri.ks * halfway.dot(&tri.normal).max(0.0);
        pixel = pixel.add(&tint.scale(blinn));
    }
    pixel.clamp()
}
