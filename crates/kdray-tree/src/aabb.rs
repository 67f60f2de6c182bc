//! Axis-aligned bounding boxes.

use kdray_math::{Point3, AXES, X, Y, Z};

use crate::tree::SplitPlane;
use crate::{Ray, Triangle};

/// Axis-aligned bounding box in 3D.
///
/// A plain value type: `min[d] <= max[d]` holds on every axis for any box
/// produced by the constructors here. A box with `min[d] == max[d]` on some
/// axis is *planar* along that axis (zero volume, possibly nonzero area).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aabb {
    /// Minimum corner.
    pub min: Point3,
    /// Maximum corner.
    pub max: Point3,
}

impl Aabb {
    /// Create an AABB from min and max corners.
    pub fn new(min: Point3, max: Point3) -> Self {
        Self { min, max }
    }

    /// Create an empty (inverted) AABB suitable for expansion.
    pub fn empty() -> Self {
        Self {
            min: Point3::new(f64::INFINITY, f64::INFINITY, f64::INFINITY),
            max: Point3::new(f64::NEG_INFINITY, f64::NEG_INFINITY, f64::NEG_INFINITY),
        }
    }

    /// The tightest AABB enclosing a set of points.
    pub fn from_points(points: &[Point3]) -> Self {
        let mut aabb = Self::empty();
        for p in points {
            aabb.include_point(p);
        }
        aabb
    }

    /// The tightest AABB enclosing a set of triangles.
    pub fn from_triangles(tris: &[Triangle]) -> Self {
        let mut aabb = Self::empty();
        for tri in tris {
            aabb = aabb.union(&tri.bounds());
        }
        aabb
    }

    /// Expand this AABB to include a point.
    pub fn include_point(&mut self, p: &Point3) {
        for k in AXES {
            self.min[k] = self.min[k].min(p[k]);
            self.max[k] = self.max[k].max(p[k]);
        }
    }

    /// The smallest AABB containing both `self` and `other`.
    pub fn union(&self, other: &Aabb) -> Aabb {
        let mut out = *self;
        out.include_point(&other.min);
        out.include_point(&other.max);
        out
    }

    /// Clip this AABB to `outer`, returning their intersection.
    ///
    /// Callers guarantee the boxes overlap; the result is degenerate (not
    /// inverted) when they merely touch.
    pub fn clip(&self, outer: &Aabb) -> Aabb {
        let mut out = *self;
        for k in AXES {
            if outer.min[k] > out.min[k] {
                out.min[k] = outer.min[k];
            }
            if outer.max[k] < out.max[k] {
                out.max[k] = outer.max[k];
            }
        }
        out
    }

    /// Extent of the box along axis `k`.
    pub fn extent(&self, k: usize) -> f64 {
        self.max[k] - self.min[k]
    }

    /// Volume of the box.
    pub fn volume(&self) -> f64 {
        self.extent(X) * self.extent(Y) * self.extent(Z)
    }

    /// Surface area of the box.
    pub fn area(&self) -> f64 {
        let (dx, dy, dz) = (self.extent(X), self.extent(Y), self.extent(Z));
        2.0 * (dx * dy + dx * dz + dy * dz)
    }

    /// Whether the box has zero extent along axis `k`.
    pub fn is_planar(&self, k: usize) -> bool {
        self.extent(k) == 0.0
    }

    /// Whether `other` lies entirely within `self` (boundaries included).
    pub fn contains(&self, other: &Aabb) -> bool {
        AXES.iter()
            .all(|&k| self.min[k] <= other.min[k] && self.max[k] >= other.max[k])
    }

    /// Whether two boxes overlap (touching counts).
    pub fn overlaps(&self, other: &Aabb) -> bool {
        AXES.iter()
            .all(|&k| self.min[k] <= other.max[k] && self.max[k] >= other.min[k])
    }

    /// Divide the box in two at a split plane.
    ///
    /// The left half keeps everything below the plane along its axis, the
    /// right half everything above; both share the plane itself.
    pub fn split(&self, plane: &SplitPlane) -> (Aabb, Aabb) {
        let mut left = *self;
        let mut right = *self;
        left.max[plane.axis] = plane.offset;
        right.min[plane.axis] = plane.offset;
        debug_assert!(self.contains(&left) && self.contains(&right));
        (left, right)
    }

    /// Slab-method ray/box intersection.
    ///
    /// Returns `Some((t_min, t_max))` with the entry and exit parameters,
    /// or `None` on a miss. `t_min` is negative when the ray origin lies
    /// inside the box. Per-axis intervals are intersected in X, Y, Z order
    /// with an early exit as soon as the interval empties; a box entirely
    /// behind the origin (`t_max < 0`) is a miss. Zero direction
    /// components are safe: the ray's reciprocal is infinite, not NaN.
    pub fn intersect(&self, ray: &Ray) -> Option<(f64, f64)> {
        let lo = |k: usize| if ray.is_neg(k) { self.max[k] } else { self.min[k] };
        let hi = |k: usize| if ray.is_neg(k) { self.min[k] } else { self.max[k] };

        let mut t_min = (lo(X) - ray.origin[X]) * ray.inv(X);
        let mut t_max = (hi(X) - ray.origin[X]) * ray.inv(X);

        let ty_min = (lo(Y) - ray.origin[Y]) * ray.inv(Y);
        let ty_max = (hi(Y) - ray.origin[Y]) * ray.inv(Y);

        if ty_min > ty_max || t_min > t_max {
            return None;
        }
        t_min = t_min.max(ty_min);
        t_max = t_max.min(ty_max);

        let tz_min = (lo(Z) - ray.origin[Z]) * ray.inv(Z);
        let tz_max = (hi(Z) - ray.origin[Z]) * ray.inv(Z);

        if tz_min > tz_max || t_min > t_max {
            return None;
        }
        t_min = t_min.max(tz_min);
        t_max = t_max.min(tz_max);

        if t_max >= 0.0 && t_min <= t_max {
            Some((t_min, t_max))
        } else {
            None
        }
    }
}
