//! Structure-of-arrays primitive storage.
//!
//! Every primitive kind keeps its baked data as parallel arrays indexed by
//! primitive. The octree only needs two things from such a container: the
//! per-primitive bounding boxes, and a way to copy out the elements at a
//! set of indices for a leaf. That is the whole [`SoaContainer`] contract,
//! which keeps [`Octree`](crate::Octree) independent of the primitive type.

use prism_math::BoundingBox;

pub trait SoaContainer: Sized {
    /// Number of primitives stored.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Bounding box of every primitive, in storage order.
    fn bounding_boxes(&self) -> &[BoundingBox];

    /// Build a new container holding only the elements at `indices`, in
    /// the order given.
    fn subset(&self, indices: &[u32]) -> Self;
}

/// Copy the elements of `source` at `indices` into a new vector.
#[inline]
pub fn gather<T: Copy>(source: &[T], indices: &[u32]) -> Vec<T> {
    indices.iter().map(|&i| source[i as usize]).collect()
}
