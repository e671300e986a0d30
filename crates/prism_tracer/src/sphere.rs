//! Sphere primitive and its baked container.

use crate::hit_system::{IntersectKernel, Primitive, PrimitiveHitSystem};
use crate::soa::gather;
use crate::{HitInfo, MaterialId, SoaContainer};
use prism_math::{BoundingBox, Interval, Ray, Vec3};

/// A sphere primitive.
///
/// A negative radius keeps the same surface but flips its normals inward,
/// which turns a dielectric sphere into a hollow bubble.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sphere {
    pub center: Vec3,
    pub radius: f32,
    pub material: MaterialId,
}

impl Sphere {
    pub fn new(center: Vec3, radius: f32, material: MaterialId) -> Self {
        Self {
            center,
            radius,
            material,
        }
    }

    pub fn bounding_box(&self) -> BoundingBox {
        let rvec = Vec3::splat(self.radius.abs());
        BoundingBox::new(self.center - rvec, self.center + rvec)
    }
}

/// Baked spheres, with the squared and inverse radii precomputed.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SphereSoa {
    centers: Vec<Vec3>,
    radii_sq: Vec<f32>,
    inv_radii: Vec<f32>,
    materials: Vec<MaterialId>,
    bounds: Vec<BoundingBox>,
}

impl SoaContainer for SphereSoa {
    fn len(&self) -> usize {
        self.centers.len()
    }

    fn bounding_boxes(&self) -> &[BoundingBox] {
        &self.bounds
    }

    fn subset(&self, indices: &[u32]) -> Self {
        Self {
            centers: gather(&self.centers, indices),
            radii_sq: gather(&self.radii_sq, indices),
            inv_radii: gather(&self.inv_radii, indices),
            materials: gather(&self.materials, indices),
            bounds: gather(&self.bounds, indices),
        }
    }
}

impl IntersectKernel for SphereSoa {
    #[inline]
    fn intersect(&self, index: usize, ray: &Ray, range: Interval) -> Option<HitInfo> {
        let center = self.centers[index];
        let oc = ray.origin - center;
        let b = oc.dot(ray.direction);
        let c = oc.length_squared() - self.radii_sq[index];

        // Origin outside and moving away
        if b > 0.0 && c > 0.0 {
            return None;
        }

        let discriminant = b * b - c;
        if discriminant <= 0.0 {
            return None;
        }

        let sqrtd = discriminant.sqrt();
        let root = [-b - sqrtd, -b + sqrtd]
            .into_iter()
            .find(|&t| range.contains(t))?;

        let point = ray.at(root);
        Some(HitInfo {
            point,
            normal: (point - center) * self.inv_radii[index],
            distance: root,
            material: self.materials[index],
        })
    }
}

impl Primitive for Sphere {
    type Soa = SphereSoa;

    fn build_soa(objects: &[Self]) -> SphereSoa {
        SphereSoa {
            centers: objects.iter().map(|s| s.center).collect(),
            radii_sq: objects.iter().map(|s| s.radius * s.radius).collect(),
            inv_radii: objects.iter().map(|s| 1.0 / s.radius).collect(),
            materials: objects.iter().map(|s| s.material).collect(),
            bounds: objects.iter().map(Sphere::bounding_box).collect(),
        }
    }
}

pub type SphereHitSystem = PrimitiveHitSystem<Sphere>;
