//! Ray representation with cached reciprocals and best-hit state.

use kdray_math::{Point3, Vec3, AXES};

/// A ray with origin, unit direction, and mutable "closest hit so far"
/// state.
///
/// The `t`/`hit` pair is the only mutable state threaded through tree
/// traversal: `t` starts at infinity and decreases monotonically as closer
/// intersections are recorded, so triangles may be tested in any order.
/// Per-axis direction signs and reciprocals are precomputed once to keep
/// the slab box test branch-free on direction sign.
#[derive(Debug, Clone)]
pub struct Ray {
    /// Origin point of the ray.
    pub origin: Point3,
    /// Unit direction of the ray.
    pub direction: Vec3,
    /// Distance to the closest intersection found so far.
    pub t: f64,
    /// Index of the triangle hit at `t`, if any.
    pub hit: Option<u32>,
    inv: [f64; 3],
    neg: [bool; 3],
}

impl Ray {
    /// Offset applied to shadow-ray origins to step off a surface and
    /// avoid self-intersection.
    pub const BIAS: f64 = 1e-6;

    /// Create a ray from an origin and a direction.
    ///
    /// The direction is normalized; a zero component yields an infinite
    /// reciprocal rather than NaN.
    pub fn new(origin: Point3, direction: Vec3) -> Self {
        let direction = direction.normalize();
        let mut inv = [0.0; 3];
        let mut neg = [false; 3];
        for k in AXES {
            inv[k] = if direction[k] == 0.0 {
                f64::INFINITY
            } else {
                1.0 / direction[k]
            };
            neg[k] = direction[k] < 0.0;
        }
        Self {
            origin,
            direction,
            t: f64::INFINITY,
            hit: None,
            inv,
            neg,
        }
    }

    /// Reciprocal of the direction component along axis `k`.
    #[inline]
    pub fn inv(&self, k: usize) -> f64 {
        self.inv[k]
    }

    /// Whether the direction component along axis `k` is negative.
    #[inline]
    pub fn is_neg(&self, k: usize) -> bool {
        self.neg[k]
    }

    /// Evaluate the ray at parameter `t`: `origin + t * direction`.
    #[inline]
    pub fn at(&self, t: f64) -> Point3 {
        self.origin + t * self.direction
    }

    /// The closest intersection point recorded so far.
    pub fn intersection(&self) -> Point3 {
        self.at(self.t)
    }

    /// Record a candidate hit, keeping it only if strictly closer than the
    /// current best. Repeated identical calls leave the ray unchanged.
    #[inline]
    pub fn record_hit(&mut self, t: f64, tri: u32) {
        if t < self.t {
            self.t = t;
            self.hit = Some(tri);
        }
    }
}
