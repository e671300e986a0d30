//! Random sampling helpers.
//!
//! Everything takes the generator explicitly so each tile can own a seeded
//! generator and renders stay reproducible.

use prism_math::Vec3;
use rand::Rng;
use std::f32::consts::TAU;

/// Uniform float in [0, 1).
#[inline]
pub fn gen_f32<R: Rng + ?Sized>(rng: &mut R) -> f32 {
    rng.gen::<f32>()
}

/// Uniformly distributed point on the unit sphere.
#[inline]
pub fn random_unit_vector<R: Rng + ?Sized>(rng: &mut R) -> Vec3 {
    let z = gen_f32(rng) * 2.0 - 1.0;
    let a = gen_f32(rng) * TAU;
    let r = (1.0 - z * z).max(0.0).sqrt();
    Vec3::new(r * a.sin(), r * a.cos(), z)
}

/// Uniformly distributed point strictly inside the unit sphere.
#[inline]
pub fn random_in_unit_sphere<R: Rng + ?Sized>(rng: &mut R) -> Vec3 {
    loop {
        let p = Vec3::new(gen_f32(rng), gen_f32(rng), gen_f32(rng)) * 2.0 - Vec3::ONE;
        if p.length_squared() < 1.0 {
            return p;
        }
    }
}

/// Uniformly distributed point strictly inside the unit disk on the xy plane.
#[inline]
pub fn random_in_unit_disk<R: Rng + ?Sized>(rng: &mut R) -> Vec3 {
    loop {
        let p = Vec3::new(gen_f32(rng) * 2.0 - 1.0, gen_f32(rng) * 2.0 - 1.0, 0.0);
        if p.length_squared() < 1.0 {
            return p;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::SmallRng;
    use rand::SeedableRng;

    #[test]
    fn test_unit_vector_has_unit_length() {
        let mut rng = SmallRng::seed_from_u64(7);
        for _ in 0..1000 {
            let v = random_unit_vector(&mut rng);
            assert!((v.length() - 1.0).abs() < 1e-4, "{v:?}");
        }
    }

    #[test]
    fn test_unit_vector_covers_both_hemispheres() {
        let mut rng = SmallRng::seed_from_u64(11);
        let (mut up, mut down) = (0, 0);
        for _ in 0..1000 {
            if random_unit_vector(&mut rng).z > 0.0 {
                up += 1;
            } else {
                down += 1;
            }
        }
        assert!(up > 300 && down > 300);
    }

    #[test]
    fn test_in_unit_sphere_and_disk() {
        let mut rng = SmallRng::seed_from_u64(3);
        for _ in 0..1000 {
            assert!(random_in_unit_sphere(&mut rng).length_squared() < 1.0);

            let d = random_in_unit_disk(&mut rng);
            assert!(d.length_squared() < 1.0);
            assert_eq!(d.z, 0.0);
        }
    }

    #[test]
    fn test_same_seed_same_sequence() {
        let mut a = SmallRng::seed_from_u64(42);
        let mut b = SmallRng::seed_from_u64(42);
        for _ in 0..16 {
            assert_eq!(random_unit_vector(&mut a), random_unit_vector(&mut b));
        }
    }
}
