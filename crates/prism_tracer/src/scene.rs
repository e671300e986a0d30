//! Scene: the registered hit systems and the material table.
//!
//! A scene is built single-threaded (primitives and materials added), then
//! [`prepare_for_rendering`](Scene::prepare_for_rendering) bakes every hit
//! system once. After that it is only read, from all render threads at once.

use crate::batch::{batch_mask, check_batch};
use crate::error::{Result, TraceError};
use crate::material::SceneMaterial;
use crate::{HitInfo, HitSystem, MaterialId, SphereHitSystem, TriangleHitSystem};
use prism_math::{Interval, Ray};

/// The closed set of hit systems a scene can hold.
#[derive(Debug, Clone)]
pub enum SceneHitSystem {
    Spheres(SphereHitSystem),
    Triangles(TriangleHitSystem),
}

impl HitSystem for SceneHitSystem {
    fn prepare_for_rendering(&mut self) {
        match self {
            SceneHitSystem::Spheres(system) => system.prepare_for_rendering(),
            SceneHitSystem::Triangles(system) => system.prepare_for_rendering(),
        }
    }

    #[inline]
    fn raycast(
        &self,
        rays: &[Ray],
        hits: &mut [HitInfo],
        range: Interval,
        ray_mask: u32,
        hit_mask: &mut u32,
    ) -> Result<()> {
        match self {
            SceneHitSystem::Spheres(system) => system.raycast(rays, hits, range, ray_mask, hit_mask),
            SceneHitSystem::Triangles(system) => system.raycast(rays, hits, range, ray_mask, hit_mask),
        }
    }

    fn primitive_count(&self) -> usize {
        match self {
            SceneHitSystem::Spheres(system) => system.primitive_count(),
            SceneHitSystem::Triangles(system) => system.primitive_count(),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct Scene {
    hit_systems: Vec<SceneHitSystem>,
    materials: Vec<SceneMaterial>,
}

impl Scene {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a material, returning its handle.
    pub fn add_material(&mut self, material: impl Into<SceneMaterial>) -> MaterialId {
        let id = MaterialId::new(self.materials.len() as u32);
        self.materials.push(material.into());
        id
    }

    pub fn material(&self, id: MaterialId) -> Option<&SceneMaterial> {
        self.materials.get(id.index())
    }

    pub fn materials(&self) -> &[SceneMaterial] {
        &self.materials
    }

    /// The sphere hit system, created on first use.
    pub fn spheres_mut(&mut self) -> &mut SphereHitSystem {
        let position = self
            .hit_systems
            .iter()
            .position(|system| matches!(system, SceneHitSystem::Spheres(_)));
        let index = match position {
            Some(index) => index,
            None => {
                self.hit_systems.push(SceneHitSystem::Spheres(SphereHitSystem::new()));
                self.hit_systems.len() - 1
            }
        };

        match &mut self.hit_systems[index] {
            SceneHitSystem::Spheres(system) => system,
            SceneHitSystem::Triangles(_) => unreachable!("position matched a sphere system"),
        }
    }

    /// The triangle hit system, created on first use.
    pub fn triangles_mut(&mut self) -> &mut TriangleHitSystem {
        let position = self
            .hit_systems
            .iter()
            .position(|system| matches!(system, SceneHitSystem::Triangles(_)));
        let index = match position {
            Some(index) => index,
            None => {
                self.hit_systems.push(SceneHitSystem::Triangles(TriangleHitSystem::new()));
                self.hit_systems.len() - 1
            }
        };

        match &mut self.hit_systems[index] {
            SceneHitSystem::Triangles(system) => system,
            SceneHitSystem::Spheres(_) => unreachable!("position matched a triangle system"),
        }
    }

    /// Hit systems in registration order.
    pub fn hit_systems(&self) -> &[SceneHitSystem] {
        &self.hit_systems
    }

    pub fn primitive_count(&self) -> usize {
        self.hit_systems.iter().map(HitSystem::primitive_count).sum()
    }

    /// Bake every hit system, in registration order.
    pub fn prepare_for_rendering(&mut self) {
        for system in &mut self.hit_systems {
            system.prepare_for_rendering();
        }

        log::info!(
            "Scene prepared: {} hit systems, {} primitives, {} materials",
            self.hit_systems.len(),
            self.primitive_count(),
            self.materials.len()
        );
    }

    /// Closest-hit query of a ray batch against every hit system.
    ///
    /// `hit_mask` is reset, then lane `i` is set for every active ray that
    /// hit something within `range`, with `hits[i]` holding the closest hit.
    /// `ray_counter` grows by the number of active rays.
    pub fn raycast(
        &self,
        rays: &[Ray],
        hits: &mut [HitInfo],
        range: Interval,
        ray_mask: u32,
        hit_mask: &mut u32,
        ray_counter: &mut u64,
    ) -> Result<()> {
        check_batch(rays.len(), hits.len())?;

        *hit_mask = 0;
        let active = ray_mask & batch_mask(rays.len());
        *ray_counter += u64::from(active.count_ones());

        for system in &self.hit_systems {
            system.raycast(rays, hits, range, active, hit_mask)?;
        }

        Ok(())
    }

    /// Check that every material handle used by a primitive resolves.
    pub fn validate(&self) -> Result<()> {
        let count = self.materials.len();
        let unresolved = self.hit_systems.iter().find_map(|system| match system {
            SceneHitSystem::Spheres(s) => s.objects().iter().map(|o| o.material).find(|m| m.index() >= count),
            SceneHitSystem::Triangles(t) => t.objects().iter().map(|o| o.material).find(|m| m.index() >= count),
        });

        match unresolved {
            Some(id) => Err(TraceError::InvalidParams(format!(
                "material {} is not registered ({count} materials)",
                id.index()
            ))),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::material::Lambertian;
    use crate::{Octree, Sphere, SphereSoa, Triangle, TriangleSoa};
    use prism_math::Vec3;

    fn scene_with_sphere_and_floor() -> Scene {
        let mut scene = Scene::new();
        let white = scene.add_material(Lambertian::new(Vec3::ONE));
        let grey = scene.add_material(Lambertian::new(Vec3::splat(0.5)));

        scene
            .spheres_mut()
            .add(Sphere::new(Vec3::new(0.0, 0.0, -5.0), 1.0, white));
        scene.triangles_mut().extend([
            Triangle::new(
                Vec3::new(-10.0, -1.0, 10.0),
                Vec3::new(10.0, -1.0, 10.0),
                Vec3::new(10.0, -1.0, -10.0),
                grey,
            ),
            Triangle::new(
                Vec3::new(-10.0, -1.0, 10.0),
                Vec3::new(10.0, -1.0, -10.0),
                Vec3::new(-10.0, -1.0, -10.0),
                grey,
            ),
        ]);
        scene.prepare_for_rendering();
        scene
    }

    #[test]
    fn test_registration_order_and_reuse() {
        let mut scene = Scene::new();
        scene.triangles_mut();
        scene.spheres_mut();
        scene.triangles_mut();

        assert_eq!(scene.hit_systems().len(), 2);
        assert!(matches!(scene.hit_systems()[0], SceneHitSystem::Triangles(_)));
        assert!(matches!(scene.hit_systems()[1], SceneHitSystem::Spheres(_)));
    }

    #[test]
    fn test_material_handles() {
        let mut scene = Scene::new();
        let a = scene.add_material(Lambertian::new(Vec3::X));
        let b = scene.add_material(Lambertian::new(Vec3::Y));

        assert_eq!(a, MaterialId::new(0));
        assert_eq!(b, MaterialId::new(1));
        assert_eq!(
            scene.material(b),
            Some(&SceneMaterial::Lambertian(Lambertian::new(Vec3::Y)))
        );
        assert_eq!(scene.material(MaterialId::new(2)), None);
    }

    #[test]
    fn test_raycast_merges_across_systems() {
        let scene = scene_with_sphere_and_floor();
        let rays = [
            // Hits the sphere, the floor is behind it
            Ray::new(Vec3::ZERO, -Vec3::Z),
            // Straight down onto the floor
            Ray::new(Vec3::new(3.0, 0.0, 0.0), -Vec3::Y),
            // Up into the void
            Ray::new(Vec3::ZERO, Vec3::Y),
        ];
        let mut hits = [HitInfo::default(); 3];
        let mut mask = 0;
        let mut counter = 0;

        scene
            .raycast(&rays, &mut hits, Interval::new(0.01, f32::INFINITY), 0b111, &mut mask, &mut counter)
            .unwrap();

        assert_eq!(mask, 0b011);
        assert_eq!(counter, 3);
        assert!((hits[0].distance - 4.0).abs() < 1e-4);
        assert_eq!(hits[0].material, MaterialId::new(0));
        assert!((hits[1].distance - 1.0).abs() < 1e-4);
        assert_eq!(hits[1].material, MaterialId::new(1));
    }

    #[test]
    fn test_raycast_resets_hit_mask_and_counts_active_rays() {
        let scene = scene_with_sphere_and_floor();
        let rays = [Ray::new(Vec3::ZERO, -Vec3::Z); 4];
        let mut hits = [HitInfo::default(); 4];
        let mut mask = 0b1111;
        let mut counter = 10;

        scene
            .raycast(&rays, &mut hits, Interval::FORWARD, 0b0100, &mut mask, &mut counter)
            .unwrap();

        assert_eq!(mask, 0b0100);
        assert_eq!(counter, 11);
    }

    #[test]
    fn test_batch_size_limits() {
        let scene = scene_with_sphere_and_floor();
        let mut mask = 0;
        let mut counter = 0;

        let rays = [Ray::new(Vec3::ZERO, -Vec3::Z); 33];
        let mut hits = [HitInfo::default(); 33];
        let result = scene.raycast(&rays, &mut hits, Interval::FORWARD, u32::MAX, &mut mask, &mut counter);
        assert!(matches!(result, Err(TraceError::BatchTooLarge { count: 33 })));

        assert!(scene
            .raycast(&rays[..32], &mut hits[..32], Interval::FORWARD, u32::MAX, &mut mask, &mut counter)
            .is_ok());
        assert_eq!(mask, u32::MAX);

        let no_rays: [Ray; 0] = [];
        let mut no_hits: [HitInfo; 0] = [];
        assert!(scene
            .raycast(&no_rays, &mut no_hits, Interval::FORWARD, u32::MAX, &mut mask, &mut counter)
            .is_ok());
        assert_eq!(mask, 0);
    }

    #[derive(Debug, PartialEq)]
    enum BakedSystem {
        Spheres(Vec<Sphere>, Option<Octree<SphereSoa>>),
        Triangles(Vec<Triangle>, Option<Octree<TriangleSoa>>),
    }

    fn baked_systems(scene: &Scene) -> Vec<BakedSystem> {
        scene
            .hit_systems()
            .iter()
            .map(|system| match system {
                SceneHitSystem::Spheres(s) => BakedSystem::Spheres(s.objects().to_vec(), s.octree().cloned()),
                SceneHitSystem::Triangles(t) => BakedSystem::Triangles(t.objects().to_vec(), t.octree().cloned()),
            })
            .collect()
    }

    #[test]
    fn test_prepare_is_idempotent() {
        let mut scene = scene_with_sphere_and_floor();
        let before = baked_systems(&scene);

        scene.prepare_for_rendering();
        let after = baked_systems(&scene);

        assert_eq!(before.len(), 2);
        assert!(before.iter().all(|system| match system {
            BakedSystem::Spheres(_, octree) => octree.is_some(),
            BakedSystem::Triangles(_, octree) => octree.is_some(),
        }));
        assert_eq!(before, after);
    }

    #[test]
    fn test_unprepared_scene_fails() {
        let mut scene = Scene::new();
        let m = scene.add_material(Lambertian::new(Vec3::ONE));
        scene.spheres_mut().add(Sphere::new(Vec3::ZERO, 1.0, m));

        let mut mask = 0;
        let mut counter = 0;
        let result = scene.raycast(
            &[Ray::default()],
            &mut [HitInfo::default()],
            Interval::FORWARD,
            1,
            &mut mask,
            &mut counter,
        );
        assert!(matches!(result, Err(TraceError::SceneNotPrepared)));
    }

    #[test]
    fn test_validate_catches_unknown_material() {
        let mut scene = Scene::new();
        scene
            .spheres_mut()
            .add(Sphere::new(Vec3::ZERO, 1.0, MaterialId::new(5)));

        assert!(matches!(scene.validate(), Err(TraceError::InvalidParams(_))));
        scene.add_material(Lambertian::new(Vec3::ONE));
        assert!(scene.validate().is_err());
    }
}
