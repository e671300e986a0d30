//! Triangle primitive and its baked container.

use crate::hit_system::{IntersectKernel, Primitive, PrimitiveHitSystem};
use crate::soa::gather;
use crate::{HitInfo, MaterialId, SoaContainer};
use prism_math::{BoundingBox, Interval, Ray, Vec3};

/// A triangle with per-vertex normals.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Triangle {
    pub vertices: [Vec3; 3],
    pub normals: [Vec3; 3],
    pub material: MaterialId,
}

impl Triangle {
    /// Flat-shaded triangle: every vertex normal is the face normal, wound
    /// counter-clockwise.
    pub fn new(v0: Vec3, v1: Vec3, v2: Vec3, material: MaterialId) -> Self {
        let normal = (v1 - v0).cross(v2 - v0).normalize_or_zero();
        Self::with_normals([v0, v1, v2], [normal; 3], material)
    }

    /// Smooth-shaded triangle with explicit vertex normals.
    pub fn with_normals(vertices: [Vec3; 3], normals: [Vec3; 3], material: MaterialId) -> Self {
        Self {
            vertices,
            normals: normals.map(Vec3::normalize_or_zero),
            material,
        }
    }

    pub fn bounding_box(&self) -> BoundingBox {
        let [a, b, c] = self.vertices;
        BoundingBox::new(a.min(b).min(c), a.max(b).max(c))
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct TriangleSoa {
    p1: Vec<Vec3>,
    p2: Vec<Vec3>,
    p3: Vec<Vec3>,
    n1: Vec<Vec3>,
    n2: Vec<Vec3>,
    n3: Vec<Vec3>,
    materials: Vec<MaterialId>,
    bounds: Vec<BoundingBox>,
}

impl SoaContainer for TriangleSoa {
    fn len(&self) -> usize {
        self.p1.len()
    }

    fn bounding_boxes(&self) -> &[BoundingBox] {
        &self.bounds
    }

    fn subset(&self, indices: &[u32]) -> Self {
        Self {
            p1: gather(&self.p1, indices),
            p2: gather(&self.p2, indices),
            p3: gather(&self.p3, indices),
            n1: gather(&self.n1, indices),
            n2: gather(&self.n2, indices),
            n3: gather(&self.n3, indices),
            materials: gather(&self.materials, indices),
            bounds: gather(&self.bounds, indices),
        }
    }
}

impl IntersectKernel for TriangleSoa {
    /// Möller-Trumbore ray-triangle intersection.
    #[inline]
    fn intersect(&self, index: usize, ray: &Ray, range: Interval) -> Option<HitInfo> {
        let p1 = self.p1[index];
        let edge1 = self.p2[index] - p1;
        let edge2 = self.p3[index] - p1;

        let h = ray.direction.cross(edge2);
        let a = edge1.dot(h);

        // Ray is parallel to triangle
        if a.abs() < f32::EPSILON {
            return None;
        }

        let f = 1.0 / a;
        let s = ray.origin - p1;
        let u = f * s.dot(h);
        if !(0.0..=1.0).contains(&u) {
            return None;
        }

        let q = s.cross(edge1);
        let v = f * ray.direction.dot(q);
        if v < 0.0 || u + v > 1.0 {
            return None;
        }

        let t = f * edge2.dot(q);
        if !range.contains(t) {
            return None;
        }

        let normal = (self.n1[index] * (1.0 - u - v) + self.n2[index] * u + self.n3[index] * v)
            .normalize_or_zero();

        Some(HitInfo {
            point: ray.at(t),
            normal,
            distance: t,
            material: self.materials[index],
        })
    }
}

impl Primitive for Triangle {
    type Soa = TriangleSoa;

    fn build_soa(objects: &[Self]) -> TriangleSoa {
        TriangleSoa {
            p1: objects.iter().map(|t| t.vertices[0]).collect(),
            p2: objects.iter().map(|t| t.vertices[1]).collect(),
            p3: objects.iter().map(|t| t.vertices[2]).collect(),
            n1: objects.iter().map(|t| t.normals[0]).collect(),
            n2: objects.iter().map(|t| t.normals[1]).collect(),
            n3: objects.iter().map(|t| t.normals[2]).collect(),
            materials: objects.iter().map(|t| t.material).collect(),
            bounds: objects.iter().map(Triangle::bounding_box).collect(),
        }
    }
}

pub type TriangleHitSystem = PrimitiveHitSystem<Triangle>;
