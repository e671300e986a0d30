//! Surface materials.
//!
//! A material decides what happens to a ray that hit its surface: it is
//! either absorbed, or scattered into a new ray with an attenuation that
//! the tracer multiplies into the path color.

use crate::sampling::{gen_f32, random_in_unit_sphere, random_unit_vector};
use crate::HitInfo;
use prism_math::{Ray, Vec3};
use rand::Rng;
use serde::{Deserialize, Serialize};

/// Color type alias (linear RGB, typically 0-1)
pub type Color = Vec3;

/// Handle of a material registered with a [`Scene`](crate::Scene).
///
/// Primitives carry the handle, the scene owns the materials.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct MaterialId(u32);

impl MaterialId {
    pub const fn new(index: u32) -> Self {
        Self(index)
    }

    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

/// Trait for materials that describe how light interacts with surfaces.
pub trait Material: Send + Sync {
    /// Scatter an incoming ray.
    ///
    /// Returns Some((attenuation, scattered_ray)) if the ray scatters,
    /// or None if the ray is absorbed. The scattered ray starts at the hit
    /// point.
    fn scatter<R: Rng + ?Sized>(&self, ray: &Ray, hit: &HitInfo, rng: &mut R) -> Option<(Color, Ray)>;
}

/// Lambertian (diffuse) material.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Lambertian {
    pub albedo: Color,
}

impl Lambertian {
    pub fn new(albedo: Color) -> Self {
        Self { albedo }
    }
}

impl Material for Lambertian {
    fn scatter<R: Rng + ?Sized>(&self, _ray: &Ray, hit: &HitInfo, rng: &mut R) -> Option<(Color, Ray)> {
        let mut direction = hit.normal + random_unit_vector(rng);

        // Sample landed opposite the normal
        if direction.length_squared() < 1e-8 {
            direction = hit.normal;
        }

        Some((self.albedo, Ray::new(hit.point, direction)))
    }
}

/// Metal (specular) material with roughness.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Metal {
    pub albedo: Color,
    /// 0.0 is a perfect mirror
    pub roughness: f32,
}

impl Metal {
    pub fn new(albedo: Color, roughness: f32) -> Self {
        Self { albedo, roughness }
    }
}

impl Material for Metal {
    fn scatter<R: Rng + ?Sized>(&self, ray: &Ray, hit: &HitInfo, rng: &mut R) -> Option<(Color, Ray)> {
        let reflected = reflect(ray.direction, hit.normal);
        let direction = (reflected + self.roughness * random_in_unit_sphere(rng)).normalize_or_zero();

        // Fuzzed below the surface: absorbed
        if direction.dot(hit.normal) > 0.0 {
            Some((self.albedo, Ray::new(hit.point, direction)))
        } else {
            None
        }
    }
}

/// Dielectric (glass) material.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Dielectric {
    /// Index of refraction (1.0 = air, 1.5 = glass, 2.4 = diamond)
    pub refraction_index: f32,
}

impl Dielectric {
    pub fn new(refraction_index: f32) -> Self {
        Self { refraction_index }
    }
}

impl Material for Dielectric {
    fn scatter<R: Rng + ?Sized>(&self, ray: &Ray, hit: &HitInfo, rng: &mut R) -> Option<(Color, Ray)> {
        let ri = self.refraction_index;
        let d = ray.direction;
        let rdn = d.dot(hit.normal);

        // The hit normal always points out of the surface
        let (outward_normal, ratio, cosine) = if rdn > 0.0 {
            (-hit.normal, ri, ri * rdn)
        } else {
            (hit.normal, 1.0 / ri, -rdn)
        };

        let refracted = refract(d, outward_normal, ratio);
        let reflect_probability = match refracted {
            Some(_) => schlick(cosine, ri),
            None => 1.0,
        };

        let direction = match refracted {
            Some(refracted) if gen_f32(rng) >= reflect_probability => refracted,
            _ => reflect(d, hit.normal),
        };

        Some((Color::ONE, Ray::new(hit.point, direction)))
    }
}

/// The closed set of materials a scene can hold.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SceneMaterial {
    Lambertian(Lambertian),
    Metal(Metal),
    Dielectric(Dielectric),
}

impl Material for SceneMaterial {
    #[inline]
    fn scatter<R: Rng + ?Sized>(&self, ray: &Ray, hit: &HitInfo, rng: &mut R) -> Option<(Color, Ray)> {
        match self {
            SceneMaterial::Lambertian(m) => m.scatter(ray, hit, rng),
            SceneMaterial::Metal(m) => m.scatter(ray, hit, rng),
            SceneMaterial::Dielectric(m) => m.scatter(ray, hit, rng),
        }
    }
}

impl From<Lambertian> for SceneMaterial {
    fn from(m: Lambertian) -> Self {
        SceneMaterial::Lambertian(m)
    }
}

impl From<Metal> for SceneMaterial {
    fn from(m: Metal) -> Self {
        SceneMaterial::Metal(m)
    }
}

impl From<Dielectric> for SceneMaterial {
    fn from(m: Dielectric) -> Self {
        SceneMaterial::Dielectric(m)
    }
}

// =============================================================================
// Helper functions
// =============================================================================

/// Reflect a vector about a normal.
#[inline]
pub fn reflect(v: Vec3, n: Vec3) -> Vec3 {
    v - 2.0 * v.dot(n) * n
}

/// Refract unit vector `v` through a surface with unit normal `n` facing
/// against it, `ratio` being the incident over transmitted index.
///
/// Returns None on total internal reflection.
#[inline]
pub fn refract(v: Vec3, n: Vec3, ratio: f32) -> Option<Vec3> {
    let dt = v.dot(n);
    let discriminant = 1.0 - ratio * ratio * (1.0 - dt * dt);
    if discriminant > 0.0 {
        Some(ratio * (v - n * dt) - n * discriminant.sqrt())
    } else {
        None
    }
}

/// Schlick's approximation of the Fresnel reflectance.
#[inline]
pub fn schlick(cosine: f32, refraction_index: f32) -> f32 {
    let r0 = (1.0 - refraction_index) / (1.0 + refraction_index);
    let r0 = r0 * r0;
    r0 + (1.0 - r0) * (1.0 - cosine).powi(5)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::SmallRng;
    use rand::SeedableRng;

    fn hit_on_floor() -> HitInfo {
        HitInfo {
            point: Vec3::new(1.0, 0.0, 2.0),
            normal: Vec3::Y,
            distance: 3.0,
            material: MaterialId::new(0),
        }
    }

    fn rng() -> SmallRng {
        SmallRng::seed_from_u64(0x5eed)
    }

    #[test]
    fn test_reflect() {
        let v = Vec3::new(1.0, -1.0, 0.0);
        assert_eq!(reflect(v, Vec3::Y), Vec3::new(1.0, 1.0, 0.0));
    }

    #[test]
    fn test_refract_straight_through() {
        let refracted = refract(-Vec3::Y, Vec3::Y, 1.0 / 1.5).unwrap();
        assert!((refracted - -Vec3::Y).length() < 1e-6);
    }

    #[test]
    fn test_refract_total_internal_reflection() {
        // Grazing exit from glass into air
        let v = Vec3::new(0.99, 0.141, 0.0).normalize();
        assert!(refract(v, -Vec3::Y, 1.5).is_none());
    }

    #[test]
    fn test_schlick_bounds() {
        let head_on = schlick(1.0, 1.5);
        assert!((head_on - 0.04).abs() < 1e-6);
        assert!((schlick(0.0, 1.5) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_lambertian_scatters_into_upper_hemisphere() {
        let material = Lambertian::new(Color::new(0.8, 0.5, 0.2));
        let hit = hit_on_floor();
        let ray = Ray::new(Vec3::new(1.0, 3.0, 2.0), -Vec3::Y);
        let mut rng = rng();

        for _ in 0..256 {
            let (attenuation, scattered) = material.scatter(&ray, &hit, &mut rng).unwrap();
            assert_eq!(attenuation, material.albedo);
            assert_eq!(scattered.origin, hit.point);
            assert!(scattered.direction.dot(hit.normal) >= 0.0);
            assert!((scattered.direction.length() - 1.0).abs() < 1e-4);
        }
    }

    #[test]
    fn test_smooth_metal_is_a_mirror() {
        let material = Metal::new(Color::splat(0.9), 0.0);
        let ray = Ray::new(Vec3::new(0.0, 1.0, 2.0), Vec3::new(1.0, -1.0, 0.0));
        let (attenuation, scattered) = material.scatter(&ray, &hit_on_floor(), &mut rng()).unwrap();

        assert_eq!(attenuation, Color::splat(0.9));
        let expected = Vec3::new(1.0, 1.0, 0.0).normalize();
        assert!((scattered.direction - expected).length() < 1e-6);
    }

    #[test]
    fn test_metal_absorbs_when_fuzzed_below_surface() {
        // Grazing incidence with full roughness pushes many samples under the surface
        let material = Metal::new(Color::ONE, 1.0);
        let ray = Ray::new(Vec3::ZERO, Vec3::new(1.0, -0.01, 0.0));
        let mut rng = rng();

        let absorbed = (0..256)
            .filter(|_| material.scatter(&ray, &hit_on_floor(), &mut rng).is_none())
            .count();
        assert!(absorbed > 0);
    }

    #[test]
    fn test_dielectric_always_scatters_without_absorption() {
        let material = Dielectric::new(1.5);
        let mut rng = rng();

        for direction in [Vec3::new(0.3, -1.0, 0.0), Vec3::new(0.3, 1.0, 0.0), Vec3::new(1.0, 0.05, 0.0)] {
            let ray = Ray::new(Vec3::ZERO, direction);
            for _ in 0..64 {
                let (attenuation, scattered) = material.scatter(&ray, &hit_on_floor(), &mut rng).unwrap();
                assert_eq!(attenuation, Color::ONE);
                assert!((scattered.direction.length() - 1.0).abs() < 1e-4);
            }
        }
    }

    #[test]
    fn test_dielectric_total_internal_reflection_always_reflects() {
        // Leaving the surface from inside at a grazing angle
        let material = Dielectric::new(1.5);
        let ray = Ray::new(Vec3::ZERO, Vec3::new(1.0, 0.141, 0.0));
        let expected = reflect(ray.direction, Vec3::Y);
        let mut rng = rng();

        for _ in 0..64 {
            let (_, scattered) = material.scatter(&ray, &hit_on_floor(), &mut rng).unwrap();
            assert!((scattered.direction - expected).length() < 1e-5);
        }
    }

    #[test]
    fn test_dielectric_mostly_refracts_head_on() {
        let material = Dielectric::new(1.5);
        let ray = Ray::new(Vec3::new(0.0, 1.0, 0.0), -Vec3::Y);
        let mut rng = rng();

        let transmitted = (0..1000)
            .filter(|_| {
                let (_, scattered) = material.scatter(&ray, &hit_on_floor(), &mut rng).unwrap();
                scattered.direction.y < 0.0
            })
            .count();
        // Schlick gives 4% reflectance head-on
        assert!(transmitted > 900);
    }

    #[test]
    fn test_scene_material_dispatch_and_serde() {
        let material: SceneMaterial = Lambertian::new(Color::splat(0.5)).into();
        let hit = hit_on_floor();
        let ray = Ray::new(Vec3::Y, -Vec3::Y);

        let (attenuation, _) = material.scatter(&ray, &hit, &mut rng()).unwrap();
        assert_eq!(attenuation, Color::splat(0.5));

        let json = serde_json::to_string(&material).unwrap();
        assert!(json.contains("\"type\":\"lambertian\""));
        let parsed: SceneMaterial = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, material);
    }
}
