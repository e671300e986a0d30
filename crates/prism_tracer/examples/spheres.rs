//! Renders the sphere showcase scene to a PNG.
//!
//! Usage: `cargo run --release --example spheres [params.json] [out.png]`
//!
//! The optional JSON file holds `TraceParams` fields; anything missing
//! takes the defaults set below.

use anyhow::{Context, Result};
use prism_tracer::{
    render_with_progress, Camera, Dielectric, Lambertian, Metal, RenderProgress, Scene, Sphere, TraceParams,
    Triangle, Vec3,
};
use std::time::Instant;

fn showcase_scene() -> Scene {
    let mut scene = Scene::new();

    let ground = scene.add_material(Lambertian::new(Vec3::new(0.8, 0.8, 0.8)));
    let red = scene.add_material(Lambertian::new(Vec3::new(0.8, 0.4, 0.4)));
    let green = scene.add_material(Lambertian::new(Vec3::new(0.4, 0.8, 0.4)));
    let orange = scene.add_material(Lambertian::new(Vec3::new(0.8, 0.6, 0.2)));
    let mirror_blue = scene.add_material(Metal::new(Vec3::new(0.4, 0.4, 0.8), 0.0));
    let mirror_green = scene.add_material(Metal::new(Vec3::new(0.4, 0.8, 0.4), 0.0));
    let brushed = scene.add_material(Metal::new(Vec3::new(0.4, 0.8, 0.4), 0.2));
    let rough = scene.add_material(Metal::new(Vec3::new(0.4, 0.8, 0.4), 0.6));
    let glass = scene.add_material(Dielectric::new(1.5));
    let steel = scene.add_material(Metal::new(Vec3::splat(0.25), 0.4));

    scene.spheres_mut().extend([
        Sphere::new(Vec3::new(0.0, -100.5, -1.0), 100.0, ground),
        Sphere::new(Vec3::new(2.0, 0.0, -1.0), 0.5, red),
        Sphere::new(Vec3::new(0.0, 0.0, -1.0), 0.5, green),
        Sphere::new(Vec3::new(-2.0, 0.0, -1.0), 0.5, mirror_blue),
        Sphere::new(Vec3::new(2.0, 0.0, 1.0), 0.5, mirror_green),
        Sphere::new(Vec3::new(0.0, 0.0, 1.0), 0.5, brushed),
        Sphere::new(Vec3::new(-2.0, 0.0, 1.0), 0.5, rough),
        Sphere::new(Vec3::new(0.5, 1.25, 0.5), 0.5, glass),
        Sphere::new(Vec3::new(-1.5, 1.5, 0.0), 0.3, orange),
    ]);

    // A small steel pyramid hovering behind the glass ball
    let apex = Vec3::new(1.5, 1.6, -1.5);
    let base = [
        Vec3::new(1.1, 0.9, -1.1),
        Vec3::new(1.9, 0.9, -1.1),
        Vec3::new(1.9, 0.9, -1.9),
        Vec3::new(1.1, 0.9, -1.9),
    ];
    let triangles = scene.triangles_mut();
    for i in 0..base.len() {
        let next = (i + 1) % base.len();
        triangles.add(Triangle::new(base[i], base[next], apex, steel));
    }
    triangles.add(Triangle::new(base[0], base[2], base[1], steel));
    triangles.add(Triangle::new(base[0], base[3], base[2], steel));

    scene
}

fn main() -> Result<()> {
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .init();

    let mut args = std::env::args().skip(1);
    let params = match args.next() {
        Some(path) => {
            let json = std::fs::read_to_string(&path).with_context(|| format!("reading {path}"))?;
            TraceParams::from_json(&json)?
        }
        None => TraceParams {
            width: 640,
            height: 360,
            samples_per_pixel: 64,
            max_bounces: 12,
            ambient_light: Vec3::splat(0.75),
            ..TraceParams::default()
        },
    };
    let output_path = args.next().unwrap_or_else(|| "spheres.png".to_string());

    let init = Instant::now();
    let mut scene = showcase_scene();
    scene.prepare_for_rendering();
    log::info!("Scene built in {:.2?}", init.elapsed());

    let camera = Camera::new()
        .with_position(Vec3::new(0.0, 2.0, 3.0), Vec3::ZERO, Vec3::Y)
        .with_lens(70.0, 0.025, 3.0)
        .with_aspect(params.aspect());

    let report: &(dyn Fn(RenderProgress) + Sync) = &|progress: RenderProgress| {
        if progress.tiles_completed % 25 == 0 || progress.tiles_completed == progress.tiles_total {
            log::info!(
                "Completed {} tiles of {} ({:.2} %)",
                progress.tiles_completed,
                progress.tiles_total,
                progress.tiles_completed as f32 / progress.tiles_total as f32 * 100.0
            );
        }
    };

    let output = render_with_progress(&scene, &camera, &params, Some(report))?;

    println!(
        "RayCount: {:.2} MRays | {:.3} ms | {:.2} MRays/s",
        output.ray_count as f64 / 1e6,
        output.elapsed.as_secs_f64() * 1e3,
        output.mrays_per_second()
    );

    output
        .to_rgb8()
        .save(&output_path)
        .with_context(|| format!("writing {output_path}"))?;
    log::info!("Saved {output_path}");

    Ok(())
}
