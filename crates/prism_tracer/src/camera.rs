//! Thin-lens camera for primary ray generation.

use crate::sampling::{gen_f32, random_in_unit_disk};
use prism_math::{Ray, Vec2, Vec3};
use rand::Rng;
use serde::{Deserialize, Serialize};

/// Source of primary rays for the tracer.
pub trait RayGenerator: Sync {
    /// Fill `rays` with primary rays through the pixel whose lower-left
    /// corner sits at screen coordinates `(u, v)`, both in [0, 1] with
    /// `v = 0` at the bottom edge. Each ray is jittered inside the pixel
    /// footprint `pixel_size`.
    fn generate_rays<R: Rng + ?Sized>(&self, u: f32, v: f32, pixel_size: Vec2, rays: &mut [Ray], rng: &mut R);
}

/// Camera for generating rays into the scene.
///
/// Every `with_*` setter recomputes the view basis, so a camera is always
/// ready to generate rays.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "CameraSettings", into = "CameraSettings")]
pub struct Camera {
    settings: CameraSettings,

    // Derived from the settings
    origin: Vec3,
    lower_left: Vec3,
    horizontal: Vec3,
    vertical: Vec3,
    u: Vec3,
    v: Vec3,
    lens_radius: f32,
}

/// Placement and lens of a [`Camera`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraSettings {
    pub look_from: Vec3,
    pub look_at: Vec3,
    pub up: Vec3,
    /// Vertical field of view in degrees
    pub vfov: f32,
    /// Image width over height
    pub aspect: f32,
    /// Lens diameter; 0 is a pinhole
    pub aperture: f32,
    /// Distance from the lens to the plane in perfect focus
    pub focus_dist: f32,
}

impl Default for CameraSettings {
    fn default() -> Self {
        Self {
            look_from: Vec3::ZERO,
            look_at: Vec3::NEG_Z,
            up: Vec3::Y,
            vfov: 90.0,
            aspect: 1.0,
            aperture: 0.0,
            focus_dist: 1.0,
        }
    }
}

impl From<CameraSettings> for Camera {
    fn from(settings: CameraSettings) -> Self {
        let mut camera = Camera {
            settings,
            origin: Vec3::ZERO,
            lower_left: Vec3::ZERO,
            horizontal: Vec3::ZERO,
            vertical: Vec3::ZERO,
            u: Vec3::X,
            v: Vec3::Y,
            lens_radius: 0.0,
        };
        camera.update();
        camera
    }
}

impl From<Camera> for CameraSettings {
    fn from(camera: Camera) -> Self {
        camera.settings
    }
}

impl Default for Camera {
    fn default() -> Self {
        CameraSettings::default().into()
    }
}

impl Camera {
    /// Create a new camera with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set camera position.
    pub fn with_position(mut self, look_from: Vec3, look_at: Vec3, up: Vec3) -> Self {
        self.settings.look_from = look_from;
        self.settings.look_at = look_at;
        self.settings.up = up;
        self.update();
        self
    }

    /// Set lens settings.
    pub fn with_lens(mut self, vfov: f32, aperture: f32, focus_dist: f32) -> Self {
        self.settings.vfov = vfov;
        self.settings.aperture = aperture;
        self.settings.focus_dist = focus_dist;
        self.update();
        self
    }

    /// Set the image aspect ratio (width / height).
    pub fn with_aspect(mut self, aspect: f32) -> Self {
        self.settings.aspect = aspect;
        self.update();
        self
    }

    fn update(&mut self) {
        let s = &self.settings;
        let half_height = (s.vfov.to_radians() / 2.0).tan();
        let half_width = s.aspect * half_height;

        let w = (s.look_from - s.look_at).normalize_or_zero();
        let u = s.up.cross(w).normalize_or_zero();
        let v = w.cross(u);

        self.origin = s.look_from;
        self.lower_left = self.origin
            - half_width * s.focus_dist * u
            - half_height * s.focus_dist * v
            - s.focus_dist * w;
        self.horizontal = 2.0 * half_width * s.focus_dist * u;
        self.vertical = 2.0 * half_height * s.focus_dist * v;
        self.u = u;
        self.v = v;
        self.lens_radius = s.aperture / 2.0;
    }
}

impl RayGenerator for Camera {
    fn generate_rays<R: Rng + ?Sized>(&self, u: f32, v: f32, pixel_size: Vec2, rays: &mut [Ray], rng: &mut R) {
        for ray in rays.iter_mut() {
            let s = u + gen_f32(rng) * pixel_size.x;
            let t = v + gen_f32(rng) * pixel_size.y;

            let disk = random_in_unit_disk(rng) * self.lens_radius;
            let offset = self.u * disk.x + self.v * disk.y;

            let origin = self.origin + offset;
            let target = self.lower_left + s * self.horizontal + t * self.vertical;
            *ray = Ray::new(origin, target - origin);
        }
    }
}
