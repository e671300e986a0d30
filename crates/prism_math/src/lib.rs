//! Geometry primitives shared by the prism tracer.
//!
//! Vector math comes from `glam`; this crate adds the ray, the
//! axis-aligned bounding box used by the octree and the distance interval
//! used to clip ray queries.

pub use glam::*;

mod bounding_box;
mod interval;
mod ray;

pub use bounding_box::BoundingBox;
pub use interval::Interval;
pub use ray::Ray;
