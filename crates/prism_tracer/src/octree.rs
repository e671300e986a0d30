//! Octree spatial index over any [`SoaContainer`].
//!
//! The root covers the union of all primitive bounding boxes. A bucket with
//! too many primitives is split into its eight octants; a primitive goes to
//! every octant its bounding box overlaps, so primitives straddling a split
//! plane end up in several leaves. Each leaf owns a [`SoaContainer`] subset
//! holding exactly its primitives, copied from the full container by global
//! index, so the intersection kernels run over contiguous arrays.
//!
//! Traversal does no distance ordering: every leaf whose box the ray touches
//! is visited, and duplicated primitives may be tested more than once. The
//! closest-hit merge in [`HitInfo::exchange_if_better`](crate::HitInfo::exchange_if_better)
//! keeps the result correct.

use crate::SoaContainer;
use prism_math::{BoundingBox, Ray, Vec3};

/// Subdivision limits for [`Octree::bake`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OctreeSettings {
    /// A bucket with at most this many primitives is not split further.
    pub max_objects_per_bucket: usize,
    /// Buckets at this depth are never split. The root has depth 0.
    pub max_depth: u32,
}

impl Default for OctreeSettings {
    fn default() -> Self {
        Self {
            max_objects_per_bucket: 32,
            max_depth: 16,
        }
    }
}

/// Shape summary of a baked tree, for logging.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OctreeStats {
    pub buckets: usize,
    pub leaves: usize,
    pub deepest_leaf: u32,
    /// Sum of leaf primitive counts; larger than the primitive count when
    /// primitives are duplicated across leaves.
    pub references: usize,
}

/// Octree node - either a leaf with its primitive subset or a split node
/// with eight children.
#[derive(Debug, Clone, PartialEq)]
pub enum BucketContent<C> {
    Leaf(C),
    Split(Box<[Bucket<C>; 8]>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Bucket<C> {
    bounds: BoundingBox,
    /// Global primitive indices covered by this bucket.
    indices: Vec<u32>,
    depth: u32,
    content: BucketContent<C>,
}

impl<C: SoaContainer> Bucket<C> {
    fn build(
        bounds: BoundingBox,
        indices: Vec<u32>,
        depth: u32,
        global: &C,
        settings: &OctreeSettings,
    ) -> Self {
        if indices.len() <= settings.max_objects_per_bucket || depth >= settings.max_depth {
            return Self::leaf(bounds, indices, depth, global);
        }

        let octants = bounds.octants();
        let boxes = global.bounding_boxes();
        let mut child_indices: [Vec<u32>; 8] = std::array::from_fn(|octant| {
            indices
                .iter()
                .copied()
                .filter(|&index| octants[octant].overlaps(&boxes[index as usize]))
                .collect()
        });

        // Every primitive spans every octant: splitting separates nothing
        if child_indices.iter().all(|child| child.len() == indices.len()) {
            return Self::leaf(bounds, indices, depth, global);
        }

        let children = std::array::from_fn(|octant| {
            Bucket::build(
                octants[octant],
                std::mem::take(&mut child_indices[octant]),
                depth + 1,
                global,
                settings,
            )
        });

        Self {
            bounds,
            indices,
            depth,
            content: BucketContent::Split(Box::new(children)),
        }
    }

    fn leaf(bounds: BoundingBox, indices: Vec<u32>, depth: u32, global: &C) -> Self {
        let subset = global.subset(&indices);
        Self {
            bounds,
            indices,
            depth,
            content: BucketContent::Leaf(subset),
        }
    }

    fn raycast<F: FnMut(&C)>(&self, ray: &Ray, visit: &mut F) {
        if !self.bounds.ray_intersection(ray) {
            return;
        }

        match &self.content {
            BucketContent::Leaf(container) => {
                if !container.is_empty() {
                    visit(container);
                }
            }
            BucketContent::Split(children) => {
                for child in children.iter() {
                    child.raycast(ray, visit);
                }
            }
        }
    }

    fn collect_stats(&self, stats: &mut OctreeStats) {
        stats.buckets += 1;
        match &self.content {
            BucketContent::Leaf(container) => {
                stats.leaves += 1;
                stats.references += container.len();
                stats.deepest_leaf = stats.deepest_leaf.max(self.depth);
            }
            BucketContent::Split(children) => {
                for child in children.iter() {
                    child.collect_stats(stats);
                }
            }
        }
    }

    fn collect_leaves<'a>(&'a self, leaves: &mut Vec<&'a Bucket<C>>) {
        match &self.content {
            BucketContent::Leaf(_) => leaves.push(self),
            BucketContent::Split(children) => {
                for child in children.iter() {
                    child.collect_leaves(leaves);
                }
            }
        }
    }
}

impl<C> Bucket<C> {
    pub fn bounds(&self) -> &BoundingBox {
        &self.bounds
    }

    pub fn indices(&self) -> &[u32] {
        &self.indices
    }

    pub fn depth(&self) -> u32 {
        self.depth
    }

    pub fn content(&self) -> &BucketContent<C> {
        &self.content
    }

    /// The primitive subset, if this bucket is a leaf.
    pub fn container(&self) -> Option<&C> {
        match &self.content {
            BucketContent::Leaf(container) => Some(container),
            BucketContent::Split(_) => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Octree<C> {
    root: Bucket<C>,
    settings: OctreeSettings,
}

impl<C: SoaContainer> Octree<C> {
    /// Build the tree over every primitive of `container`.
    ///
    /// An empty container yields a single empty leaf at the origin.
    pub fn bake(container: &C, settings: OctreeSettings) -> Self {
        let boxes = container.bounding_boxes();
        let bounds = boxes
            .iter()
            .copied()
            .reduce(|acc, b| acc.union(&b))
            .unwrap_or(BoundingBox::new(Vec3::ZERO, Vec3::ZERO));
        let indices = (0..boxes.len() as u32).collect();

        Self {
            root: Bucket::build(bounds, indices, 0, container, &settings),
            settings,
        }
    }

    /// Call `visit` with the primitive subset of every non-empty leaf whose
    /// bounds the ray touches.
    pub fn raycast<F: FnMut(&C)>(&self, ray: &Ray, mut visit: F) {
        self.root.raycast(ray, &mut visit);
    }

    pub fn stats(&self) -> OctreeStats {
        let mut stats = OctreeStats::default();
        self.root.collect_stats(&mut stats);
        stats
    }

    /// All leaves, in depth-first octant order.
    pub fn leaves(&self) -> Vec<&Bucket<C>> {
        let mut leaves = Vec::new();
        self.root.collect_leaves(&mut leaves);
        leaves
    }
}

impl<C> Octree<C> {
    pub fn root(&self) -> &Bucket<C> {
        &self.root
    }

    pub fn settings(&self) -> &OctreeSettings {
        &self.settings
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::soa::gather;
    use proptest::prelude::*;

    /// Minimal container: each element is just its global id and box.
    #[derive(Debug, Clone, PartialEq)]
    struct BoxSoa {
        ids: Vec<u32>,
        boxes: Vec<BoundingBox>,
    }

    impl BoxSoa {
        fn new(boxes: Vec<BoundingBox>) -> Self {
            Self {
                ids: (0..boxes.len() as u32).collect(),
                boxes,
            }
        }
    }

    impl SoaContainer for BoxSoa {
        fn len(&self) -> usize {
            self.ids.len()
        }

        fn bounding_boxes(&self) -> &[BoundingBox] {
            &self.boxes
        }

        fn subset(&self, indices: &[u32]) -> Self {
            Self {
                ids: gather(&self.ids, indices),
                boxes: gather(&self.boxes, indices),
            }
        }
    }

    fn cube_at(center: Vec3, size: f32) -> BoundingBox {
        BoundingBox::from_center_size(center, Vec3::splat(size))
    }

    /// A 4x4x4 grid of small boxes spread over [0, 8]^3.
    fn grid() -> BoxSoa {
        let mut boxes = Vec::new();
        for x in 0..4 {
            for y in 0..4 {
                for z in 0..4 {
                    let center = Vec3::new(x as f32, y as f32, z as f32) * 2.0 + Vec3::splat(1.0);
                    boxes.push(cube_at(center, 0.5));
                }
            }
        }
        BoxSoa::new(boxes)
    }

    fn visited_ids(tree: &Octree<BoxSoa>, ray: &Ray) -> Vec<u32> {
        let mut ids = Vec::new();
        tree.raycast(ray, |leaf| ids.extend_from_slice(&leaf.ids));
        ids.sort_unstable();
        ids.dedup();
        ids
    }

    #[test]
    fn test_empty_container_gives_single_empty_leaf() {
        let tree = Octree::bake(&BoxSoa::new(vec![]), OctreeSettings::default());

        let leaves = tree.leaves();
        assert_eq!(leaves.len(), 1);
        assert!(leaves[0].indices().is_empty());
        assert_eq!(leaves[0].bounds().min, Vec3::ZERO);

        let mut visits = 0;
        tree.raycast(&Ray::new(Vec3::new(0.0, 0.0, -1.0), Vec3::Z), |_| visits += 1);
        assert_eq!(visits, 0);
    }

    #[test]
    fn test_small_container_stays_single_leaf() {
        let soa = BoxSoa::new(vec![cube_at(Vec3::ZERO, 1.0), cube_at(Vec3::X * 4.0, 1.0)]);
        let tree = Octree::bake(&soa, OctreeSettings::default());

        assert_eq!(tree.stats().leaves, 1);
        assert_eq!(tree.root().container(), Some(&soa));
        assert_eq!(tree.root().bounds().min, Vec3::new(-0.5, -0.5, -0.5));
        assert_eq!(tree.root().bounds().max, Vec3::new(4.5, 0.5, 0.5));
    }

    #[test]
    fn test_subdivides_past_threshold() {
        let soa = grid();
        let settings = OctreeSettings {
            max_objects_per_bucket: 4,
            max_depth: 16,
        };
        let tree = Octree::bake(&soa, settings);
        let stats = tree.stats();

        assert!(matches!(tree.root().content(), BucketContent::Split(_)));
        assert!(stats.leaves > 1);
        // Small boxes never straddle a split plane of this grid
        assert_eq!(stats.references, soa.len());
        for leaf in tree.leaves() {
            assert!(leaf.indices().len() <= 4);
            let container = leaf.container().unwrap();
            assert_eq!(container.ids, leaf.indices());
        }
    }

    #[test]
    fn test_depth_limit_stops_subdivision() {
        let settings = OctreeSettings {
            max_objects_per_bucket: 1,
            max_depth: 1,
        };
        let tree = Octree::bake(&grid(), settings);

        assert_eq!(tree.stats().deepest_leaf, 1);
        assert!(tree.leaves().iter().all(|leaf| leaf.depth() == 1));
    }

    #[test]
    fn test_straddling_primitive_is_duplicated() {
        let soa = BoxSoa::new(vec![
            cube_at(Vec3::splat(-4.0), 0.5),
            cube_at(Vec3::splat(4.0), 0.5),
            // Spans the root's center on every axis
            cube_at(Vec3::ZERO, 1.0),
        ]);
        let settings = OctreeSettings {
            max_objects_per_bucket: 2,
            max_depth: 4,
        };
        let tree = Octree::bake(&soa, settings);

        let holding_center = tree
            .leaves()
            .iter()
            .filter(|leaf| leaf.indices().contains(&2))
            .count();
        assert!(holding_center >= 8);
    }

    #[test]
    fn test_coincident_primitives_stop_splitting() {
        let soa = BoxSoa::new(vec![cube_at(Vec3::ZERO, 2.0); 40]);
        let tree = Octree::bake(&soa, OctreeSettings::default());

        // Every primitive covers every octant, so the root stays a leaf
        assert_eq!(tree.stats().buckets, 1);
    }

    #[test]
    fn test_raycast_visits_only_touched_leaves() {
        let soa = grid();
        let settings = OctreeSettings {
            max_objects_per_bucket: 4,
            max_depth: 16,
        };
        let tree = Octree::bake(&soa, settings);

        // Straight down the x = 1, y = 1 column
        let ray = Ray::new(Vec3::new(1.0, 1.0, -10.0), Vec3::Z);
        let ids = visited_ids(&tree, &ray);

        for z in 0..4u32 {
            assert!(ids.contains(&z), "column element {z} not visited");
        }
        assert!(ids.len() < soa.len());
    }

    #[test]
    fn test_bake_is_idempotent() {
        let soa = grid();
        let settings = OctreeSettings {
            max_objects_per_bucket: 3,
            max_depth: 8,
        };

        assert_eq!(Octree::bake(&soa, settings), Octree::bake(&soa, settings));
    }

    fn small_box() -> impl Strategy<Value = BoundingBox> {
        ((-50i32..50), (-50i32..50), (-50i32..50), (1u32..40)).prop_map(|(x, y, z, s)| {
            cube_at(Vec3::new(x as f32, y as f32, z as f32) * 0.1, s as f32 * 0.05)
        })
    }

    proptest! {
        #[test]
        fn leaves_cover_every_primitive(boxes in prop::collection::vec(small_box(), 0..120)) {
            let soa = BoxSoa::new(boxes);
            let settings = OctreeSettings { max_objects_per_bucket: 4, max_depth: 6 };
            let tree = Octree::bake(&soa, settings);
            let leaves = tree.leaves();

            for (id, bounds) in soa.boxes.iter().enumerate() {
                let holders: Vec<_> = leaves
                    .iter()
                    .filter(|leaf| leaf.indices().contains(&(id as u32)))
                    .collect();
                prop_assert!(!holders.is_empty(), "primitive {} lost", id);
                for leaf in holders {
                    prop_assert!(leaf.bounds().overlaps(bounds));
                }
            }
        }

        #[test]
        fn raycast_never_loses_a_hit_primitive(
            boxes in prop::collection::vec(small_box(), 1..120),
            origin in ((-80i32..80), (-80i32..80), (-80i32..80)),
            target in 0usize..120,
        ) {
            let soa = BoxSoa::new(boxes);
            let settings = OctreeSettings { max_objects_per_bucket: 4, max_depth: 6 };
            let tree = Octree::bake(&soa, settings);

            // Aim at the center of one primitive so the ray surely hits its box
            let id = target % soa.len();
            let origin = Vec3::new(origin.0 as f32, origin.1 as f32, origin.2 as f32) * 0.1;
            let direction = soa.boxes[id].center() - origin;
            prop_assume!(direction.length() > 1e-3);

            let ray = Ray::new(origin, direction);
            let ids = visited_ids(&tree, &ray);
            prop_assert!(ids.contains(&(id as u32)));
        }
    }
}
