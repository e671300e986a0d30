//! Ray-primitive intersection record.

use crate::MaterialId;
use prism_math::Vec3;

/// Record of a ray-primitive intersection.
///
/// The normal is the primitive's outward unit normal at `point`; it is not
/// flipped to face the ray; materials that care about the side (dielectrics)
/// compare it against the incoming direction themselves.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HitInfo {
    /// Point of intersection
    pub point: Vec3,
    /// Outward unit normal at the intersection
    pub normal: Vec3,
    /// Parametric distance along the ray
    pub distance: f32,
    /// Handle of the surface material in the scene's material table
    pub material: MaterialId,
}

impl Default for HitInfo {
    fn default() -> Self {
        Self {
            point: Vec3::ZERO,
            normal: Vec3::ZERO,
            distance: f32::INFINITY,
            material: MaterialId::new(0),
        }
    }
}

impl HitInfo {
    /// Replace `self` with `candidate` if the candidate is closer.
    ///
    /// Returns true if the record changed. Several hit systems (and octree
    /// leaves holding duplicated primitives) report into the same record,
    /// so hits are always merged through this and never plainly assigned.
    #[inline]
    pub fn exchange_if_better(&mut self, candidate: &HitInfo) -> bool {
        if candidate.distance < self.distance {
            *self = *candidate;
            true
        } else {
            false
        }
    }
}
