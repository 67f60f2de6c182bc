#![warn(missing_docs)]

//! SAH KD-tree construction and traversal for the kdray ray tracer.
//!
//! This crate is the spatial-acceleration core: it answers "which triangle
//! does this ray hit first" in sub-linear expected time by partitioning
//! space with axis-aligned split planes chosen by the Surface Area
//! Heuristic (SAH).
//!
//! # Architecture
//!
//! - [`Aabb`] - axis-aligned bounding box with the slab ray test
//! - [`Ray`] - ray with precomputed reciprocals and mutable best-hit state
//! - [`Triangle`] - mesh primitive owning the ray/triangle intersection
//! - [`KdTree`] - the built tree: [`KdTree::build`] + [`KdTree::intersect`]
//!
//! Construction follows Wald & Havran, "On building fast kd-trees for ray
//! tracing, and on doing that in O(N log N)" (2006): events are generated
//! once, sorted once, and propagated to children as sorted sublists merged
//! with the few freshly sorted events of plane-straddling triangles.
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use kdray_math::{Point3, Vec3};
//! use kdray_tree::{Aabb, KdTree, Ray, Triangle};
//!
//! let tris = Arc::new(vec![/* mesh triangles */]);
//! let bounds = Aabb::from_triangles(&tris);
//! let tree = KdTree::build(tris, bounds);
//!
//! let mut ray = Ray::new(Point3::new(0.0, 0.0, -5.0), Vec3::z());
//! if tree.intersect(&mut ray) {
//!     let hit = &tree.triangles()[ray.hit.unwrap() as usize];
//! }
//! ```

mod aabb;
mod build;
mod ray;
mod tree;
mod triangle;

pub use aabb::Aabb;
pub use ray::Ray;
pub use tree::{KdTree, Node, SplitPlane};
pub use triangle::Triangle;
