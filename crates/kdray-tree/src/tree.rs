//! The built KD-tree and its near/far recursive traversal.

use std::sync::Arc;

use crate::build::Builder;
use crate::{Aabb, Ray, Triangle};

/// An axis-aligned split plane: an axis index and an offset along it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SplitPlane {
    /// Splitting axis (0, 1, or 2).
    pub axis: usize,
    /// Coordinate of the plane along the axis.
    pub offset: f64,
}

impl SplitPlane {
    /// Create a split plane.
    pub fn new(axis: usize, offset: f64) -> Self {
        Self { axis, offset }
    }
}

/// A KD-tree node: an interior split or a terminal triangle list.
///
/// The tree is a strict binary tree; an inner node's children cover
/// exactly the two halves of its region split at the plane. Triangles
/// straddling a plane appear in both subtrees.
#[derive(Debug, Clone)]
pub enum Node {
    /// Interior node: a split plane and the two owned children
    /// (left = lower side along the axis).
    Inner {
        /// The split plane.
        plane: SplitPlane,
        /// Child covering the lower half-space.
        left: Box<Node>,
        /// Child covering the upper half-space.
        right: Box<Node>,
    },
    /// Terminal node holding triangle indices and its region's bounds.
    Leaf {
        /// Indices into the tree's triangle storage.
        tris: Vec<u32>,
        /// Bounds of the leaf's region.
        bounds: Aabb,
    },
}

impl Node {
    fn depth(&self, d: usize) -> usize {
        match self {
            Node::Leaf { .. } => d,
            Node::Inner { left, right, .. } => left.depth(d + 1).max(right.depth(d + 1)),
        }
    }
}

/// An immutable SAH KD-tree over a shared triangle list.
///
/// Built once per scene change and never mutated afterwards, so any number
/// of threads may traverse it concurrently; the only mutable state of a
/// traversal lives in the caller's [`Ray`].
#[derive(Debug, Clone)]
pub struct KdTree {
    root: Node,
    bounds: Aabb,
    tris: Arc<Vec<Triangle>>,
    num_nodes: usize,
}

impl KdTree {
    /// Build a tree over `tris` bounded by `scene_box`.
    ///
    /// Single-threaded, recursive, O(N log N) event-propagation
    /// construction. The whole tree is rebuilt from scratch whenever the
    /// scene changes.
    pub fn build(tris: Arc<Vec<Triangle>>, scene_box: Aabb) -> Self {
        let (root, num_nodes) = Builder::run(&tris, scene_box);
        let tree = Self {
            root,
            bounds: scene_box,
            tris,
            num_nodes,
        };
        log::debug!(
            "kd-tree built: {} triangles, {} nodes, depth {}",
            tree.tris.len(),
            tree.num_nodes,
            tree.depth()
        );
        tree
    }

    /// Find the nearest triangle the ray strikes, if any.
    ///
    /// Returns whether something was hit; the distance and triangle index
    /// are left in the ray's `t`/`hit` fields. Rays that miss the scene
    /// bounds never touch the tree.
    pub fn intersect(&self, ray: &mut Ray) -> bool {
        if let Some((t_min, t_max)) = self.bounds.intersect(ray) {
            traverse(&self.root, &self.tris, ray, t_min, t_max);
        }
        ray.hit.is_some()
    }

    /// The scene bounds the tree was built over.
    pub fn bounds(&self) -> &Aabb {
        &self.bounds
    }

    /// The shared triangle storage.
    pub fn triangles(&self) -> &Arc<Vec<Triangle>> {
        &self.tris
    }

    /// The root node.
    pub fn root(&self) -> &Node {
        &self.root
    }

    /// Total number of nodes.
    pub fn num_nodes(&self) -> usize {
        self.num_nodes
    }

    /// Length of the longest root-to-leaf path.
    pub fn depth(&self) -> usize {
        self.root.depth(0)
    }
}

/// Recursive near-to-far descent over `[t_min, t_max]`.
///
/// The near child (the one on the origin's side of the plane) is visited
/// first; the far child is skipped whenever the ray already has a hit
/// closer than the plane crossing (`ray.t < t_split`). Both the visit
/// order and that pruning test are what make the traversal sub-linear
/// while still always reporting the globally nearest hit.
fn traverse(node: &Node, tris: &[Triangle], ray: &mut Ray, t_min: f64, t_max: f64) {
    match node {
        Node::Leaf { tris: ids, .. } => {
            for &i in ids {
                tris[i as usize].intersect(i, ray);
            }
        }
        Node::Inner { plane, left, right } => {
            // Parameter at which the ray crosses the split plane.
            let t_split = (plane.offset - ray.origin[plane.axis]) * ray.inv(plane.axis);

            let (near, far) = if ray.origin[plane.axis] < plane.offset {
                (left, right)
            } else {
                (right, left)
            };

            if t_split > t_max || t_split < 0.0 {
                // Plane crossed beyond the exit (or behind the origin):
                // only the near side is reachable.
                traverse(near, tris, ray, t_min, t_max);
            } else if t_split < t_min {
                // Plane crossed before the entry: only the far side.
                traverse(far, tris, ray, t_min, t_max);
            } else {
                traverse(near, tris, ray, t_min, t_split);
                if ray.t < t_split {
                    return;
                }
                traverse(far, tris, ray, t_split, t_max);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use kdray_math::{Point3, Rgb, Vec3};
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    /// An axis-aligned square at `x = x0` spanning `[lo, hi]` in y and z,
    /// as two triangles.
    fn wall_x(x0: f64, lo: f64, hi: f64) -> Vec<Triangle> {
        vec![
            Triangle::new([
                Point3::new(x0, lo, lo),
                Point3::new(x0, hi, hi),
                Point3::new(x0, hi, lo),
            ]),
            Triangle::new([
                Point3::new(x0, lo, lo),
                Point3::new(x0, lo, hi),
                Point3::new(x0, hi, hi),
            ]),
        ]
    }

    fn build(tris: Vec<Triangle>) -> KdTree {
        let tris = Arc::new(tris);
        let bounds = Aabb::from_triangles(&tris);
        KdTree::build(tris, bounds)
    }

    /// Linear scan over every triangle; the correctness oracle.
    fn brute_force(tris: &[Triangle], ray: &mut Ray) -> bool {
        for (i, tri) in tris.iter().enumerate() {
            tri.intersect(i as u32, ray);
        }
        ray.hit.is_some()
    }

    #[test]
    fn test_tiny_scene_builds_single_leaf() {
        // Below the 5-triangle split minimum: the root must be a leaf.
        let mut tris = wall_x(1.0, -1.0, 1.0);
        tris.truncate(1);
        tris.push(Triangle::new([
            Point3::new(2.0, -1.0, -1.0),
            Point3::new(2.0, 1.0, 1.0),
            Point3::new(2.0, 1.0, -1.0),
        ]));
        tris.push(Triangle::new([
            Point3::new(3.0, -1.0, -1.0),
            Point3::new(3.0, 1.0, 1.0),
            Point3::new(3.0, 1.0, -1.0),
        ]));
        let tree = build(tris);
        assert!(matches!(tree.root(), Node::Leaf { .. }));
        assert_eq!(tree.num_nodes(), 1);
        assert_eq!(tree.depth(), 0);
    }

    #[test]
    fn test_nearest_of_stacked_walls() {
        // Ten parallel walls; the ray must report the closest.
        let mut tris = Vec::new();
        for i in 0..10 {
            tris.extend(wall_x(1.0 + i as f64, -1.0, 1.0));
        }
        let tree = build(tris);
        let mut ray = Ray::new(Point3::origin(), Vec3::new(1.0, 0.0, 0.0));
        assert!(tree.intersect(&mut ray));
        assert_relative_eq!(ray.t, 1.0);
    }

    #[test]
    fn test_miss_scene_bounds_leaves_ray_untouched() {
        let tree = build(wall_x(1.0, -1.0, 1.0));
        let mut ray = Ray::new(Point3::new(0.0, 50.0, 0.0), Vec3::new(1.0, 0.0, 0.0));
        assert!(!tree.intersect(&mut ray));
        assert_eq!(ray.t, f64::INFINITY);
        assert!(ray.hit.is_none());
    }

    #[test]
    fn test_ray_origin_inside_scene() {
        let mut tris = wall_x(-2.0, -1.0, 1.0);
        tris.extend(wall_x(2.0, -1.0, 1.0));
        tris.extend(wall_x(4.0, -1.0, 1.0));
        let tree = build(tris);
        let mut ray = Ray::new(Point3::origin(), Vec3::new(1.0, 0.0, 0.0));
        assert!(tree.intersect(&mut ray));
        assert_relative_eq!(ray.t, 2.0);

        let mut back = Ray::new(Point3::origin(), Vec3::new(-1.0, 0.0, 0.0));
        assert!(tree.intersect(&mut back));
        assert_relative_eq!(back.t, 2.0);
    }

    fn random_soup(rng: &mut StdRng, n: usize) -> Vec<Triangle> {
        (0..n)
            .map(|_| {
                let c = Point3::new(
                    rng.gen_range(-10.0..10.0),
                    rng.gen_range(-10.0..10.0),
                    rng.gen_range(-10.0..10.0),
                );
                let mut v = [Point3::origin(); 3];
                for p in v.iter_mut() {
                    *p = c + Vec3::new(
                        rng.gen_range(-1.0..1.0),
                        rng.gen_range(-1.0..1.0),
                        rng.gen_range(-1.0..1.0),
                    );
                }
                Triangle::new(v)
            })
            .collect()
    }

    #[test]
    fn test_matches_brute_force_on_random_soup() {
        let mut rng = StdRng::seed_from_u64(0x5eed);
        let tris = random_soup(&mut rng, 400);
        let tree = build(tris.clone());

        for _ in 0..500 {
            let origin = Point3::new(
                rng.gen_range(-20.0..20.0),
                rng.gen_range(-20.0..20.0),
                rng.gen_range(-20.0..20.0),
            );
            let dir = Vec3::new(
                rng.gen_range(-1.0..1.0),
                rng.gen_range(-1.0..1.0),
                rng.gen_range(-1.0..1.0),
            );
            if dir.norm() < 1e-6 {
                continue;
            }

            let mut tree_ray = Ray::new(origin, dir);
            let mut linear_ray = Ray::new(origin, dir);
            let tree_hit = tree.intersect(&mut tree_ray);
            let linear_hit = brute_force(&tris, &mut linear_ray);

            assert_eq!(tree_hit, linear_hit);
            if tree_hit {
                assert_relative_eq!(tree_ray.t, linear_ray.t, epsilon = 1e-9);
            }
        }
    }

    #[test]
    fn test_every_triangle_reachable_through_some_leaf() {
        let mut rng = StdRng::seed_from_u64(42);
        let tris = random_soup(&mut rng, 200);
        let tree = build(tris.clone());

        let mut seen = vec![false; tris.len()];
        let mut stack = vec![tree.root()];
        while let Some(node) = stack.pop() {
            match node {
                Node::Leaf { tris: ids, bounds } => {
                    for &i in ids {
                        seen[i as usize] = true;
                        // Leaf membership implies bounds overlap.
                        assert!(tris[i as usize].bounds().overlaps(bounds));
                    }
                }
                Node::Inner { left, right, .. } => {
                    stack.push(left);
                    stack.push(right);
                }
            }
        }
        assert!(seen.iter().all(|&s| s), "triangle dropped from every leaf");
    }

    #[test]
    fn test_leaves_hold_every_strictly_overlapping_triangle() {
        let mut rng = StdRng::seed_from_u64(9);
        let tris = random_soup(&mut rng, 150);
        let tree = build(tris.clone());
        let scene = *tree.bounds();

        // Positive-volume intersection on every axis. Triangles that only
        // touch a leaf's boundary may legitimately live on the other side.
        fn strictly_overlaps(a: &Aabb, b: &Aabb) -> bool {
            (0..3).all(|k| a.min[k].max(b.min[k]) < a.max[k].min(b.max[k]))
        }

        fn walk(node: &Node, bounds: Aabb, tris: &[Triangle], scene: &Aabb) {
            match node {
                Node::Leaf { tris: ids, .. } => {
                    for (i, tri) in tris.iter().enumerate() {
                        let clipped = tri.bounds().clip(scene);
                        if strictly_overlaps(&clipped, &bounds) {
                            assert!(
                                ids.contains(&(i as u32)),
                                "triangle {i} missing from a leaf it overlaps"
                            );
                        }
                    }
                }
                Node::Inner { plane, left, right } => {
                    let (lb, rb) = bounds.split(plane);
                    walk(left, lb, tris, scene);
                    walk(right, rb, tris, scene);
                }
            }
        }
        walk(tree.root(), scene, &tris, &scene);
    }

    #[test]
    fn test_leaf_boxes_partition_parent() {
        let mut rng = StdRng::seed_from_u64(7);
        let tris = random_soup(&mut rng, 100);
        let tree = build(tris);

        // Sum of leaf volumes equals the root volume: the split planes
        // tile the scene box exactly.
        fn leaf_volume(node: &Node, bounds: Aabb) -> f64 {
            match node {
                Node::Leaf { .. } => bounds.volume(),
                Node::Inner { plane, left, right } => {
                    let (lb, rb) = bounds.split(plane);
                    leaf_volume(left, lb) + leaf_volume(right, rb)
                }
            }
        }
        let total = leaf_volume(tree.root(), *tree.bounds());
        assert_relative_eq!(total, tree.bounds().volume(), max_relative = 1e-9);
    }

    #[test]
    fn test_traversal_prunes_far_side() {
        // A wall in front and a wall behind a split: the near hit must be
        // reported even though the far subtree holds more triangles.
        let mut tris = Vec::new();
        for i in 0..8 {
            tris.extend(wall_x(5.0 + i as f64, -2.0, 2.0));
        }
        tris.extend(wall_x(1.0, -2.0, 2.0));
        let tree = build(tris);
        let mut ray = Ray::new(Point3::origin(), Vec3::new(1.0, 0.0, 0.0));
        assert!(tree.intersect(&mut ray));
        assert_relative_eq!(ray.t, 1.0);
    }

    #[test]
    fn test_shared_storage_survives_clone() {
        let tris = Arc::new(wall_x(1.0, -1.0, 1.0));
        let bounds = Aabb::from_triangles(&tris);
        let tree = KdTree::build(Arc::clone(&tris), bounds);
        assert_eq!(Arc::strong_count(&tris), 2);
        assert_eq!(tree.triangles()[0].color, Rgb::new(127.0, 127.0, 127.0));
    }
}
