//! Prism - octree-accelerated CPU path tracing
//!
//! A Monte Carlo path tracer for spheres and triangles. Primitives of each
//! kind are baked into structure-of-arrays containers indexed by an
//! octree, rays are traced in batches of up to 32 with one mask bit per
//! ray, and the image is rendered tile by tile on a rayon pool.

mod batch;
mod camera;
mod config;
mod error;
mod hit_info;
mod hit_system;
mod material;
mod octree;
mod sampling;
mod scene;
mod soa;
mod sphere;
mod tile;
mod tracer;
mod triangle;

pub use batch::{batch_mask, check_batch, lanes, record_hit, Lanes, MAX_BATCH_SIZE};
pub use camera::{Camera, CameraSettings, RayGenerator};
pub use config::TraceParams;
pub use error::{Result, TraceError};
pub use hit_info::HitInfo;
pub use hit_system::{HitSystem, IntersectKernel, Primitive, PrimitiveHitSystem};
pub use material::{
    reflect, refract, schlick, Color, Dielectric, Lambertian, Material, MaterialId, Metal, SceneMaterial,
};
pub use octree::{Bucket, BucketContent, Octree, OctreeSettings, OctreeStats};
pub use sampling::{random_in_unit_disk, random_in_unit_sphere, random_unit_vector};
pub use scene::{Scene, SceneHitSystem};
pub use soa::SoaContainer;
pub use sphere::{Sphere, SphereHitSystem, SphereSoa};
pub use tile::{generate_tiles, Tile, DEFAULT_TILE_DIMENSION};
pub use tracer::{render, render_with_progress, trace_tile, RenderOutput, RenderProgress, TileResult, TraceBatch};
pub use triangle::{Triangle, TriangleHitSystem, TriangleSoa};

/// Re-export the math types from prism_math
pub use prism_math::{BoundingBox, Interval, Ray, Vec2, Vec3};
