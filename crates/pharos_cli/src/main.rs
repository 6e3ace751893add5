//! `pharos`: render the built-in "sphere on a plane" scene to a PPM file.

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use pharos_renderer::{
    Blend, Body, Camera, Color, Light, Material, RenderConfig, Renderer, Scene, Sphere,
    Traversal, TriangleMeshBuilder, Vec3,
};
use std::path::PathBuf;

/// Physical width of the camera film, independent of resolution.
const FILM_SIZE: f64 = 60.0;

#[derive(Parser, Debug)]
#[command(name = "pharos", version, about = "Concurrent CPU ray tracer", long_about = None)]
struct Args {
    /// Image width in pixels
    #[arg(long, default_value_t = 300)]
    width: u32,

    /// Image height in pixels
    #[arg(long, default_value_t = 300)]
    height: u32,

    /// Primary rays per pixel
    #[arg(short, long)]
    samples: Option<u32>,

    /// Worker threads (0 = all cores)
    #[arg(short, long)]
    threads: Option<usize>,

    /// Maximum mirror/glass bounces
    #[arg(long)]
    max_depth: Option<u32>,

    /// BVH query strategy
    #[arg(long, value_enum)]
    traversal: Option<TraversalArg>,

    /// How samples are merged into a pixel
    #[arg(long, value_enum)]
    blend: Option<BlendArg>,

    /// JSON render config; flags override its values
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Seed for jitter and soft shadows
    #[arg(long)]
    seed: Option<u64>,

    /// Jitter primary rays inside their pixel
    #[arg(long)]
    jitter: bool,

    /// Log debug output
    #[arg(short, long)]
    verbose: bool,

    /// Output file
    #[arg(short, long, default_value = "output.ppm")]
    output: PathBuf,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum TraversalArg {
    Nearest,
    FirstEntered,
}

impl From<TraversalArg> for Traversal {
    fn from(arg: TraversalArg) -> Self {
        match arg {
            TraversalArg::Nearest => Traversal::Nearest,
            TraversalArg::FirstEntered => Traversal::FirstEntered,
        }
    }
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum BlendArg {
    Pairwise,
    Cumulative,
}

impl From<BlendArg> for Blend {
    fn from(arg: BlendArg) -> Self {
        match arg {
            BlendArg::Pairwise => Blend::Pairwise,
            BlendArg::Cumulative => Blend::Cumulative,
        }
    }
}

impl Args {
    /// The config file (or defaults) with command-line overrides applied.
    fn render_config(&self) -> Result<RenderConfig> {
        let mut config = match &self.config {
            Some(path) => RenderConfig::load(path)
                .with_context(|| format!("Failed to load config {}", path.display()))?,
            None => RenderConfig::default(),
        };

        if let Some(samples) = self.samples {
            config.samples_per_pixel = samples;
        }
        if let Some(threads) = self.threads {
            config.threads = threads;
        }
        if let Some(depth) = self.max_depth {
            config.max_depth = depth;
        }
        if let Some(traversal) = self.traversal {
            config.traversal = traversal.into();
        }
        if let Some(blend) = self.blend {
            config.blend = blend.into();
        }
        if let Some(seed) = self.seed {
            config.seed = Some(seed);
        }
        if self.jitter {
            config.jitter = true;
        }

        config.validate().context("Invalid render configuration")?;
        Ok(config)
    }
}

/// A red sphere resting above a white floor, lit by a small spherical area
/// light overhead.
fn sphere_on_a_plane(width: u32, height: u32) -> Result<Scene> {
    let mut bodies = Vec::new();

    let sphere = Sphere::new(Vec3::new(0.0, 0.0, 1.0), 30.0)?;
    bodies.push(Body::new(sphere, Material::diffuse(Color::RED)).with_name("Red Sphere"));

    let corners = [
        Vec3::new(205.0, 205.0, -205.0),
        Vec3::new(-205.0, 205.0, -205.0),
        Vec3::new(-205.0, -205.0, -205.0),
        Vec3::new(205.0, -205.0, -205.0),
    ];
    let mut floor = TriangleMeshBuilder::new();
    floor
        .add_triangle(corners[0], corners[1], corners[2])?
        .add_triangle(corners[0], corners[2], corners[3])?;
    bodies.push(
        Body::new(floor.build()?, Material::diffuse(Color::WHITE)).with_name("White Lower Plane"),
    );

    let light_sphere = Sphere::new(Vec3::new(0.0, 0.0, 100.0), 10.0)?;
    bodies.push(
        Body::new(light_sphere.clone(), Material::diffuse(Color::YELLOW))
            .with_name("Light")
            .emissive(),
    );
    let lights = vec![Light::area(light_sphere)];

    let pixel_size = FILM_SIZE / width.max(height) as f64;
    let camera = Camera::new(
        Vec3::new(0.0, -100.0, 10.0),
        Vec3::new(0.0, 20.0, 0.0),
        Vec3::Z,
        pixel_size,
        width,
        height,
    )?;

    Ok(Scene::new(camera, lights, bodies)?)
}

fn main() -> Result<()> {
    let args = Args::parse();

    let level = if args.verbose {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Info
    };
    env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .init();

    let config = args.render_config()?;
    let scene = sphere_on_a_plane(args.width, args.height).context("Failed to build scene")?;
    let renderer = Renderer::new(scene, config).context("Failed to start renderer")?;

    let output = renderer.render().context("Render failed")?;
    output
        .film
        .save_ppm(&args.output)
        .with_context(|| format!("Failed to write {}", args.output.display()))?;

    println!(
        "Wrote {} ({} rays cast, {} hit)",
        args.output.display(),
        output.stats.rays_cast,
        output.stats.rays_hit
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flags_override_defaults() {
        let args = Args::parse_from([
            "pharos",
            "--samples",
            "4",
            "--traversal",
            "first-entered",
            "--blend",
            "cumulative",
            "--seed",
            "9",
        ]);
        let config = args.render_config().unwrap();
        assert_eq!(config.samples_per_pixel, 4);
        assert_eq!(config.traversal, Traversal::FirstEntered);
        assert_eq!(config.blend, Blend::Cumulative);
        assert_eq!(config.seed, Some(9));
        assert_eq!(config.max_depth, RenderConfig::default().max_depth);
    }

    #[test]
    fn test_invalid_override_is_rejected() {
        let args = Args::parse_from(["pharos", "--samples", "0"]);
        assert!(args.render_config().is_err());
    }

    #[test]
    fn test_demo_scene_renders() {
        let scene = sphere_on_a_plane(12, 12).unwrap();
        assert_eq!(scene.bodies().len(), 3);

        let config = RenderConfig::default()
            .with_threads(2)
            .with_shadow_differentials(1)
            .with_seed(1);
        let output = Renderer::new(scene, config).unwrap().render().unwrap();
        assert!(output.film.ready_to_develop());
        assert!(output.stats.rays_hit > 0);
    }
}
