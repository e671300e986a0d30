//! Tile-parallel path integrator.
//!
//! Every pixel traces `samples_per_pixel` paths in batches of up to
//! [`MAX_BATCH_SIZE`] rays. A path starts with the ambient light as its
//! color; each scatter multiplies in the material's attenuation. A path
//! ends when it escapes the scene, is absorbed, or runs out of bounces,
//! and contributes whatever color it carries at that point.
//!
//! Tiles are the unit of parallelism. Each tile owns its random generator,
//! seeded from the render seed and the tile index, so a render is
//! reproducible whatever the worker count.

use crate::batch::{batch_mask, lanes};
use crate::error::{Result, TraceError};
use crate::material::Material;
use crate::tile::{generate_tiles, Tile};
use crate::{HitInfo, RayGenerator, Scene, TraceParams, MAX_BATCH_SIZE};
use prism_math::{DVec3, Interval, Ray, Vec2, Vec3};
use rand::rngs::SmallRng;
use rand::SeedableRng;
use rayon::prelude::*;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};

/// Progress report, sent after every finished tile.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenderProgress {
    pub tiles_total: usize,
    pub tiles_completed: usize,
}

/// Result of a render.
#[derive(Debug, Clone)]
pub struct RenderOutput {
    pub params: TraceParams,
    /// Linear RGB, row-major, 3 floats per pixel. Row 0 is the bottom of
    /// the image.
    pub backbuffer: Vec<f32>,
    /// Rays tested against the scene, all bounces included
    pub ray_count: u64,
    pub elapsed: Duration,
}

impl RenderOutput {
    /// Color of pixel `(x, y)`, `y = 0` being the bottom row.
    pub fn pixel(&self, x: u32, y: u32) -> Vec3 {
        let pixels: &[[f32; 3]] = bytemuck::cast_slice(&self.backbuffer);
        Vec3::from_array(pixels[(y * self.params.width + x) as usize])
    }

    /// Throughput in millions of rays per second.
    pub fn mrays_per_second(&self) -> f64 {
        let seconds = self.elapsed.as_secs_f64();
        if seconds > 0.0 {
            self.ray_count as f64 / seconds / 1e6
        } else {
            0.0
        }
    }

    /// Convert to an 8-bit image: gamma 2, clamped, top row first.
    pub fn to_rgb8(&self) -> image::RgbImage {
        let (width, height) = (self.params.width, self.params.height);
        image::RgbImage::from_fn(width, height, |x, y| {
            let color = self.pixel(x, height - 1 - y);
            let to_byte = |c: f32| (c.max(0.0).sqrt().min(1.0) * 255.0).round() as u8;
            image::Rgb([to_byte(color.x), to_byte(color.y), to_byte(color.z)])
        })
    }
}

/// Per-worker scratch space for one sample batch.
pub struct TraceBatch {
    rays: [Ray; MAX_BATCH_SIZE],
    hits: [HitInfo; MAX_BATCH_SIZE],
    colors: [Vec3; MAX_BATCH_SIZE],
}

impl TraceBatch {
    pub fn new() -> Self {
        Self {
            rays: [Ray::default(); MAX_BATCH_SIZE],
            hits: [HitInfo::default(); MAX_BATCH_SIZE],
            colors: [Vec3::ZERO; MAX_BATCH_SIZE],
        }
    }
}

impl Default for TraceBatch {
    fn default() -> Self {
        Self::new()
    }
}

/// Colors of one traced tile, row by row.
#[derive(Debug, Clone)]
pub struct TileResult {
    pub tile: Tile,
    pub pixels: Vec<Vec3>,
    pub ray_count: u64,
}

/// Render `scene` through `camera`.
pub fn render<G: RayGenerator>(scene: &Scene, camera: &G, params: &TraceParams) -> Result<RenderOutput> {
    render_with_progress(scene, camera, params, None)
}

/// Render `scene` through `camera`, calling `progress` after every tile.
///
/// The callback runs on the worker that finished the tile.
pub fn render_with_progress<G: RayGenerator>(
    scene: &Scene,
    camera: &G,
    params: &TraceParams,
    progress: Option<&(dyn Fn(RenderProgress) + Sync)>,
) -> Result<RenderOutput> {
    params.validate()?;
    scene.validate()?;

    let tiles = generate_tiles(params.width, params.height, params.trace_tile_dimension);
    let tiles_total = tiles.len();
    let started = Instant::now();

    log::info!(
        "Rendering {}x{} at {} spp, {} bounces: {} tiles, multithreading {}",
        params.width,
        params.height,
        params.samples_per_pixel,
        params.max_bounces,
        tiles_total,
        params.multithreading
    );

    let completed = AtomicUsize::new(0);
    let run_tile = |batch: &mut TraceBatch, tile: &Tile| -> Result<TileResult> {
        let result = trace_tile(tile, scene, camera, params, batch)?;
        let tiles_completed = completed.fetch_add(1, Ordering::Relaxed) + 1;

        log::trace!(
            "Tile {} ({}, {}) done: {} rays, {}/{}",
            tile.index,
            tile.x,
            tile.y,
            result.ray_count,
            tiles_completed,
            tiles_total
        );
        if let Some(progress) = progress {
            progress(RenderProgress {
                tiles_total,
                tiles_completed,
            });
        }

        Ok(result)
    };

    let results: Vec<TileResult> = if params.multithreading {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(params.worker_threads)
            .thread_name(|i| format!("trace-worker-{i}"))
            .build()?;
        log::debug!("Worker pool ready: {} threads", pool.current_num_threads());

        pool.install(|| {
            tiles
                .par_iter()
                .map_init(TraceBatch::new, |batch, tile| run_tile(batch, tile))
                .collect::<Result<Vec<_>>>()
        })?
    } else {
        let mut batch = TraceBatch::new();
        tiles
            .iter()
            .map(|tile| run_tile(&mut batch, tile))
            .collect::<Result<Vec<_>>>()?
    };

    let width = params.width as usize;
    let mut backbuffer = vec![0.0f32; width * params.height as usize * 3];
    let mut ray_count = 0;
    for result in &results {
        ray_count += result.ray_count;
        for ((x, y), color) in result.tile.pixels().zip(&result.pixels) {
            let index = (y as usize * width + x as usize) * 3;
            backbuffer[index..index + 3].copy_from_slice(&color.to_array());
        }
    }

    let output = RenderOutput {
        params: params.clone(),
        backbuffer,
        ray_count,
        elapsed: started.elapsed(),
    };

    log::info!(
        "Rendered in {:.2?}: {} rays, {:.2} MRays/s",
        output.elapsed,
        output.ray_count,
        output.mrays_per_second()
    );

    Ok(output)
}

/// Seed of a tile's random generator.
fn tile_seed(seed: u64, tile_index: usize) -> u64 {
    seed ^ (tile_index as u64 + 1).wrapping_mul(0x9E37_79B9_7F4A_7C15)
}

/// Trace every pixel of `tile`.
///
/// Pixel colors are summed in double precision, so a pixel whose paths all
/// escape comes out exactly equal to the ambient light.
pub fn trace_tile<G: RayGenerator>(
    tile: &Tile,
    scene: &Scene,
    camera: &G,
    params: &TraceParams,
    batch: &mut TraceBatch,
) -> Result<TileResult> {
    params.validate()?;

    let mut rng = SmallRng::seed_from_u64(tile_seed(params.seed, tile.index));
    let mut ray_count = 0;
    let mut pixels = Vec::with_capacity(tile.pixel_count());

    let pixel_size = Vec2::new(1.0 / params.width as f32, 1.0 / params.height as f32);
    let range = Interval::new(params.min_distance, params.max_depth);
    let samples = params.samples_per_pixel as usize;
    let TraceBatch { rays, hits, colors } = batch;

    for (x, y) in tile.pixels() {
        let u = x as f32 * pixel_size.x;
        let v = y as f32 * pixel_size.y;
        let mut color = DVec3::ZERO;

        for batch_index in 0..params.sample_batch_count() as usize {
            let count = (samples - batch_index * params.batch_size).min(params.batch_size);

            let rays = &mut rays[..count];
            let hits = &mut hits[..count];
            let colors = &mut colors[..count];

            camera.generate_rays(u, v, pixel_size, rays, &mut rng);
            colors.fill(params.ambient_light);

            let mut alive = batch_mask(count);
            let mut hit_mask = 0;
            let mut bounce = 0;
            while bounce < params.max_bounces && alive != 0 {
                scene.raycast(rays, hits, range, alive, &mut hit_mask, &mut ray_count)?;
                if hit_mask == 0 {
                    break;
                }

                alive = 0;
                for lane in lanes(hit_mask) {
                    let hit = &hits[lane];
                    let material = scene.material(hit.material).ok_or_else(|| {
                        TraceError::InvalidParams(format!("material {} is not registered", hit.material.index()))
                    })?;

                    // Absorbed paths keep their color
                    if let Some((attenuation, scattered)) = material.scatter(&rays[lane], hit, &mut rng) {
                        colors[lane] *= attenuation;
                        rays[lane] = scattered;
                        alive |= 1 << lane;
                    }
                }
                bounce += 1;
            }

            color += colors.iter().fold(DVec3::ZERO, |sum, c| sum + c.as_dvec3());
        }

        pixels.push((color / f64::from(params.samples_per_pixel)).as_vec3());
    }

    Ok(TileResult {
        tile: *tile,
        pixels,
        ray_count,
    })
}
