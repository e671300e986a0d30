use crate::{Ray, Vec3};

/// Axis-aligned bounding box.
///
/// Used both for octree bucket bounds and for per-primitive bounds.
/// `min <= max` holds component-wise for every box built through the
/// constructors below; zero-size boxes are allowed and simply behave as
/// points or planes.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct BoundingBox {
    pub min: Vec3,
    pub max: Vec3,
}

impl BoundingBox {
    /// Create a box from its corners. The corners are reordered if needed.
    pub fn new(a: Vec3, b: Vec3) -> Self {
        Self {
            min: a.min(b),
            max: a.max(b),
        }
    }

    /// Create a box of the given full `size` centered on `center`.
    pub fn from_center_size(center: Vec3, size: Vec3) -> Self {
        let half = size.abs() * 0.5;
        Self {
            min: center - half,
            max: center + half,
        }
    }

    /// Smallest box containing both boxes.
    pub fn union(&self, other: &BoundingBox) -> BoundingBox {
        BoundingBox {
            min: self.min.min(other.min),
            max: self.max.max(other.max),
        }
    }

    /// Center point of the box.
    #[inline]
    pub fn center(&self) -> Vec3 {
        (self.min + self.max) * 0.5
    }

    /// Separating-axis overlap test. Touching boxes overlap.
    #[inline]
    pub fn overlaps(&self, other: &BoundingBox) -> bool {
        self.min.cmple(other.max).all() && other.min.cmple(self.max).all()
    }

    /// Split the box at its center into eight equal octants.
    ///
    /// Octant `i` takes the upper half on x if bit 0 of `i` is set, on y
    /// for bit 1 and on z for bit 2.
    pub fn octants(&self) -> [BoundingBox; 8] {
        let center = self.center();
        std::array::from_fn(|i| {
            let pick = |bit: usize, lo: f32, mid: f32, hi: f32| {
                if i & bit == 0 {
                    (lo, mid)
                } else {
                    (mid, hi)
                }
            };
            let (x0, x1) = pick(1, self.min.x, center.x, self.max.x);
            let (y0, y1) = pick(2, self.min.y, center.y, self.max.y);
            let (z0, z1) = pick(4, self.min.z, center.z, self.max.z);
            BoundingBox {
                min: Vec3::new(x0, y0, z0),
                max: Vec3::new(x1, y1, z1),
            }
        })
    }

    /// Test if the forward half of `ray` (t >= 0) touches this box.
    ///
    /// Uses the slab method. Before any division, each axis is checked for
    /// the cheap miss: the origin lies outside that slab and the direction
    /// does not move toward it.
    pub fn ray_intersection(&self, ray: &Ray) -> bool {
        let origin = ray.origin.to_array();
        let direction = ray.direction.to_array();
        let min = self.min.to_array();
        let max = self.max.to_array();

        for axis in 0..3 {
            let (o, d) = (origin[axis], direction[axis]);
            if (o < min[axis] && d <= 0.0) || (o > max[axis] && d >= 0.0) {
                return false;
            }
        }

        let mut t_min = 0.0f32;
        let mut t_max = f32::INFINITY;
        for axis in 0..3 {
            let d = direction[axis];
            if d == 0.0 {
                // Parallel to this slab and, after the check above, inside it
                continue;
            }

            let inv = 1.0 / d;
            let mut t0 = (min[axis] - origin[axis]) * inv;
            let mut t1 = (max[axis] - origin[axis]) * inv;
            if t0 > t1 {
                std::mem::swap(&mut t0, &mut t1);
            }

            t_min = t_min.max(t0);
            t_max = t_max.min(t1);
            if t_max < t_min {
                return false;
            }
        }

        true
    }
}
