//! Render job configuration.

use crate::error::{Result, TraceError};
use crate::tile::DEFAULT_TILE_DIMENSION;
use crate::MAX_BATCH_SIZE;
use prism_math::Vec3;
use serde::{Deserialize, Serialize};

/// Configuration for one render.
///
/// Deserializes from partial JSON: missing fields take their defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TraceParams {
    /// Output width in pixels
    pub width: u32,
    /// Output height in pixels
    pub height: u32,
    pub samples_per_pixel: u32,
    /// Maximum scatter events per path
    pub max_bounces: u32,
    /// Hits farther than this along a ray are ignored
    pub max_depth: f32,
    /// Hits closer than this are ignored, so scattered rays do not
    /// re-hit the surface they leave
    pub min_distance: f32,
    /// Radiance of everything a path escapes to, and the starting color
    /// of every path
    pub ambient_light: Vec3,
    /// Tile edge length in pixels
    pub trace_tile_dimension: u32,
    /// Samples traced together per pixel, at most [`MAX_BATCH_SIZE`]
    pub batch_size: usize,
    pub multithreading: bool,
    /// Worker count; 0 lets rayon decide
    pub worker_threads: usize,
    /// Base seed of the per-tile random generators
    pub seed: u64,
}

impl Default for TraceParams {
    fn default() -> Self {
        Self {
            width: 320,
            height: 240,
            samples_per_pixel: 16,
            max_bounces: 8,
            max_depth: f32::INFINITY,
            min_distance: 0.01,
            ambient_light: Vec3::ONE,
            trace_tile_dimension: DEFAULT_TILE_DIMENSION,
            batch_size: MAX_BATCH_SIZE,
            multithreading: true,
            worker_threads: 0,
            seed: 0,
        }
    }
}

impl TraceParams {
    /// Parse parameters from JSON.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn with_resolution(mut self, width: u32, height: u32) -> Self {
        self.width = width;
        self.height = height;
        self
    }

    pub fn with_quality(mut self, samples_per_pixel: u32, max_bounces: u32) -> Self {
        self.samples_per_pixel = samples_per_pixel;
        self.max_bounces = max_bounces;
        self
    }

    pub fn with_ambient_light(mut self, ambient_light: Vec3) -> Self {
        self.ambient_light = ambient_light;
        self
    }

    pub fn with_multithreading(mut self, multithreading: bool) -> Self {
        self.multithreading = multithreading;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Image width over height.
    pub fn aspect(&self) -> f32 {
        self.width as f32 / self.height as f32
    }

    /// Number of sample batches traced per pixel.
    pub fn sample_batch_count(&self) -> u32 {
        self.samples_per_pixel.div_ceil(self.batch_size.max(1) as u32)
    }

    pub fn validate(&self) -> Result<()> {
        if self.batch_size > MAX_BATCH_SIZE {
            return Err(TraceError::BatchTooLarge {
                count: self.batch_size,
            });
        }

        let problem = if self.width == 0 || self.height == 0 {
            Some(format!("resolution {}x{} is empty", self.width, self.height))
        } else if self.samples_per_pixel == 0 {
            Some("samples_per_pixel must be at least 1".to_string())
        } else if self.trace_tile_dimension == 0 {
            Some("trace_tile_dimension must be at least 1".to_string())
        } else if self.batch_size == 0 {
            Some("batch_size must be at least 1".to_string())
        } else if !(self.max_depth > self.min_distance) {
            Some(format!(
                "max_depth {} must exceed min_distance {}",
                self.max_depth, self.min_distance
            ))
        } else {
            None
        };

        match problem {
            Some(message) => Err(TraceError::InvalidParams(message)),
            None => Ok(()),
        }
    }
}
