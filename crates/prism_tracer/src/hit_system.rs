//! Hit systems: one per primitive kind.
//!
//! A hit system collects primitives of one kind while the scene is built,
//! bakes them into a [`SoaContainer`] and an [`Octree`] in
//! [`prepare_for_rendering`](HitSystem::prepare_for_rendering), and then
//! answers batched raycasts from any number of threads.

use crate::batch::{batch_mask, check_batch, lanes, record_hit};
use crate::error::{Result, TraceError};
use crate::{HitInfo, Octree, OctreeSettings, SoaContainer};
use prism_math::{Interval, Ray};

/// Batched closest-hit queries against one kind of primitive.
pub trait HitSystem: Send + Sync {
    /// Bake the collected primitives into their acceleration structure.
    fn prepare_for_rendering(&mut self);

    /// Intersect every ray whose bit is set in `ray_mask` with this system.
    ///
    /// For each hit, lane `i` of `hit_mask` is set and `hits[i]` is merged
    /// through [`HitInfo::exchange_if_better`] if the bit was already set,
    /// so several systems can report into the same batch. Only hits with a
    /// distance inside `range` are reported.
    fn raycast(
        &self,
        rays: &[Ray],
        hits: &mut [HitInfo],
        range: Interval,
        ray_mask: u32,
        hit_mask: &mut u32,
    ) -> Result<()>;

    fn primitive_count(&self) -> usize;
}

/// Per-primitive intersection over a baked container.
pub trait IntersectKernel: SoaContainer + Clone + std::fmt::Debug + Send + Sync {
    /// Intersect `ray` with element `index`, returning the hit if its
    /// distance lies inside `range`.
    fn intersect(&self, index: usize, ray: &Ray, range: Interval) -> Option<HitInfo>;
}

/// A primitive that knows how to bake a list of itself into a container.
pub trait Primitive: Clone + std::fmt::Debug + Send + Sync {
    type Soa: IntersectKernel;

    fn build_soa(objects: &[Self]) -> Self::Soa;
}

/// Generic hit system over one primitive kind.
///
/// Adding primitives invalidates the baked octree; raycasting before the
/// next [`prepare_for_rendering`](HitSystem::prepare_for_rendering) fails
/// with [`TraceError::SceneNotPrepared`].
#[derive(Debug, Clone)]
pub struct PrimitiveHitSystem<P: Primitive> {
    objects: Vec<P>,
    octree: Option<Octree<P::Soa>>,
    settings: OctreeSettings,
}

impl<P: Primitive> Default for PrimitiveHitSystem<P> {
    fn default() -> Self {
        Self {
            objects: Vec::new(),
            octree: None,
            settings: OctreeSettings::default(),
        }
    }
}

impl<P: Primitive> PrimitiveHitSystem<P> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_octree_settings(mut self, settings: OctreeSettings) -> Self {
        self.settings = settings;
        self.octree = None;
        self
    }

    pub fn add(&mut self, object: P) {
        self.objects.push(object);
        self.octree = None;
    }

    pub fn extend<I: IntoIterator<Item = P>>(&mut self, objects: I) {
        self.objects.extend(objects);
        self.octree = None;
    }

    pub fn objects(&self) -> &[P] {
        &self.objects
    }

    /// The baked octree, if prepared.
    pub fn octree(&self) -> Option<&Octree<P::Soa>> {
        self.octree.as_ref()
    }

    pub fn is_prepared(&self) -> bool {
        self.octree.is_some()
    }
}

impl<P: Primitive> HitSystem for PrimitiveHitSystem<P> {
    fn prepare_for_rendering(&mut self) {
        let soa = P::build_soa(&self.objects);
        let octree = Octree::bake(&soa, self.settings);

        let stats = octree.stats();
        log::debug!(
            "Baked octree over {} primitives: {} buckets, {} leaves, depth {}, {} references",
            self.objects.len(),
            stats.buckets,
            stats.leaves,
            stats.deepest_leaf,
            stats.references
        );

        self.octree = Some(octree);
    }

    fn raycast(
        &self,
        rays: &[Ray],
        hits: &mut [HitInfo],
        range: Interval,
        ray_mask: u32,
        hit_mask: &mut u32,
    ) -> Result<()> {
        check_batch(rays.len(), hits.len())?;
        let octree = self.octree.as_ref().ok_or(TraceError::SceneNotPrepared)?;

        for lane in lanes(ray_mask & batch_mask(rays.len())) {
            let ray = &rays[lane];
            octree.raycast(ray, |leaf| {
                for index in 0..leaf.len() {
                    if let Some(hit) = leaf.intersect(index, ray, range) {
                        record_hit(hits, hit_mask, lane, hit);
                    }
                }
            });
        }

        Ok(())
    }

    fn primitive_count(&self) -> usize {
        self.objects.len()
    }
}
