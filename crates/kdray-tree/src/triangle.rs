//! The triangle primitive and the Möller–Trumbore intersection test.

use kdray_math::{Point3, Rgb, Vec3};

use crate::{Aabb, Ray};

/// Rejection threshold for near-parallel rays and behind-origin hits.
const EPSILON: f64 = 1e-9;

/// A mesh triangle with a cached plane normal and material weights.
///
/// Created once at mesh-load time and immutable during rendering; the
/// KD-tree refers to triangles by index and never owns them.
#[derive(Debug, Clone)]
pub struct Triangle {
    /// Vertices in counter-clockwise order.
    pub vertices: [Point3; 3],
    /// Unit outward normal, cached at construction.
    pub normal: Vec3,
    /// Base (diffuse) color.
    pub color: Rgb,
    /// Ambient reflectance.
    pub ka: Rgb,
    /// Diffuse coefficient.
    pub kd: f64,
    /// Specular coefficient.
    pub ks: f64,
}

impl Triangle {
    /// Create a triangle from counter-clockwise vertices.
    ///
    /// The normal is derived from the winding order. Materials default to
    /// mid-grey until [`Triangle::set_color`] is called by the loader.
    pub fn new(vertices: [Point3; 3]) -> Self {
        let v1 = vertices[2] - vertices[1];
        let v2 = vertices[0] - vertices[1];
        let normal = v1.cross(&v2).normalize();
        let mut tri = Self {
            vertices,
            normal,
            color: Rgb::BLACK,
            ka: Rgb::BLACK,
            kd: 1.0,
            ks: 1.0,
        };
        tri.set_color(Rgb::new(127.0, 127.0, 127.0));
        tri
    }

    /// Set the base color; ambient reflectance follows at one tenth.
    pub fn set_color(&mut self, color: Rgb) {
        self.color = color;
        self.ka = color.scale(0.1);
        self.kd = 1.0;
        self.ks = 1.0;
    }

    /// The tightest AABB enclosing the triangle.
    pub fn bounds(&self) -> Aabb {
        Aabb::from_points(&self.vertices)
    }

    /// Möller–Trumbore ray/triangle intersection.
    ///
    /// `index` is this triangle's position in the mesh storage; on an
    /// accepted hit the ray records `(t, index)` only if `t` is strictly
    /// smaller than its current best, so the call is idempotent and
    /// order-independent. Near-parallel rays (|det| below epsilon),
    /// barycentric coordinates outside the triangle, and hits at or behind
    /// the origin are all misses.
    pub fn intersect(&self, index: u32, ray: &mut Ray) {
        let e1 = self.vertices[1] - self.vertices[0];
        let e2 = self.vertices[2] - self.vertices[0];

        let pvec = ray.direction.cross(&e2);
        let det = e1.dot(&pvec);
        if det.abs() < EPSILON {
            return;
        }
        let inv_det = 1.0 / det;

        let tvec = ray.origin - self.vertices[0];
        let u = tvec.dot(&pvec) * inv_det;
        if !(0.0..=1.0).contains(&u) {
            return;
        }

        let qvec = tvec.cross(&e1);
        let v = ray.direction.dot(&qvec) * inv_det;
        if v < 0.0 || u + v > 1.0 {
            return;
        }

        let t = e2.dot(&qvec) * inv_det;
        if t < EPSILON {
            return;
        }

        ray.record_hit(t, index);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn diagonal_ray() -> Ray {
        Ray::new(Point3::new(-1.0, 0.0, 0.0), Vec3::new(0.5, 0.5, 0.0))
    }

    #[test]
    fn test_hit_at_sqrt_two() {
        let tri = Triangle::new([
            Point3::new(0.0, 0.0, -1.0),
            Point3::new(0.0, 2.0, 1.0),
            Point3::new(0.0, 2.0, -1.0),
        ]);
        let mut ray = diagonal_ray();
        tri.intersect(0, &mut ray);
        assert_eq!(ray.hit, Some(0));
        assert_relative_eq!(ray.t, 2.0_f64.sqrt(), epsilon = 1e-12);
    }

    #[test]
    fn test_miss() {
        let tri = Triangle::new([
            Point3::new(1.0, 0.0, 1.0),
            Point3::new(1.5, 0.5, 1.0),
            Point3::new(1.25, 1.0, 1.5),
        ]);
        let mut ray = diagonal_ray();
        tri.intersect(0, &mut ray);
        assert!(ray.hit.is_none());
        assert_eq!(ray.t, f64::INFINITY);
    }

    #[test]
    fn test_behind_origin_is_miss() {
        let tri = Triangle::new([
            Point3::new(0.0, 0.0, -1.0),
            Point3::new(0.0, 2.0, 1.0),
            Point3::new(0.0, 2.0, -1.0),
        ]);
        // Same plane, ray pointing away.
        let mut ray = Ray::new(Point3::new(-1.0, 0.0, 0.0), Vec3::new(-0.5, -0.5, 0.0));
        tri.intersect(0, &mut ray);
        assert!(ray.hit.is_none());
    }

    #[test]
    fn test_parallel_ray_is_miss() {
        let tri = Triangle::new([
            Point3::new(0.0, 0.0, -1.0),
            Point3::new(0.0, 2.0, 1.0),
            Point3::new(0.0, 2.0, -1.0),
        ]);
        // Ray in the triangle's plane (x == 0 everywhere).
        let mut ray = Ray::new(Point3::new(0.0, -5.0, 0.0), Vec3::new(0.0, 1.0, 0.0));
        tri.intersect(0, &mut ray);
        assert!(ray.hit.is_none());
    }

    #[test]
    fn test_repeated_intersect_is_idempotent() {
        let tri = Triangle::new([
            Point3::new(0.0, 0.0, -1.0),
            Point3::new(0.0, 2.0, 1.0),
            Point3::new(0.0, 2.0, -1.0),
        ]);
        let mut ray = diagonal_ray();
        tri.intersect(0, &mut ray);
        let (t, hit) = (ray.t, ray.hit);
        tri.intersect(0, &mut ray);
        assert_eq!(ray.t, t);
        assert_eq!(ray.hit, hit);
    }

    #[test]
    fn test_keeps_nearest_of_two() {
        let near = Triangle::new([
            Point3::new(1.0, -1.0, -1.0),
            Point3::new(1.0, 1.0, 1.0),
            Point3::new(1.0, 1.0, -1.0),
        ]);
        let far = Triangle::new([
            Point3::new(2.0, -1.0, -1.0),
            Point3::new(2.0, 1.0, 1.0),
            Point3::new(2.0, 1.0, -1.0),
        ]);
        let mut ray = Ray::new(Point3::origin(), Vec3::new(1.0, 0.0, 0.0));
        // Test in far-to-near and near-to-far order; outcome must match.
        far.intersect(1, &mut ray);
        near.intersect(0, &mut ray);
        assert_eq!(ray.hit, Some(0));
        assert_relative_eq!(ray.t, 1.0);

        let mut ray2 = Ray::new(Point3::origin(), Vec3::new(1.0, 0.0, 0.0));
        near.intersect(0, &mut ray2);
        far.intersect(1, &mut ray2);
        assert_eq!(ray2.hit, Some(0));
        assert_relative_eq!(ray2.t, 1.0);
    }

    #[test]
    fn test_normal_is_unit() {
        let tri = Triangle::new([
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(2.0, 0.0, 0.0),
            Point3::new(0.0, 2.0, 0.0),
        ]);
        assert_relative_eq!(tri.normal.norm(), 1.0);
    }
}
