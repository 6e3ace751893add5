//! Rendering: the shared render context, pixel tasks and the drain loop.
//!
//! Every primary ray becomes a pixel task on the worker pool. A pixel task
//! submits its own intersection task, shades the hit (which may submit
//! shadow, reflection and refraction tasks and wait on them), and merges the
//! resulting colors into the film. The calling thread only waits for pixel
//! tasks to finish, keeping a bounded window of them in flight.

use crate::error::{RenderError, Result};
use crate::film::DevelopedPixel;
use crate::scheduler::{Scheduler, TaskHandle};
use crate::{Color, Film, Intersection, PixelCoord, Ray, RenderConfig, Scene};
use pharos_math::Vec3;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Pixel tasks kept in flight per worker thread.
const IN_FLIGHT_PER_THREAD: usize = 16;

/// How often the drain loop reports progress.
const PROGRESS_INTERVAL: Duration = Duration::from_secs(2);

/// Snapshot of the ray counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RayStats {
    pub rays_cast: u64,
    pub rays_hit: u64,
}

impl RayStats {
    fn since(self, earlier: RayStats) -> RayStats {
        RayStats {
            rays_cast: self.rays_cast - earlier.rays_cast,
            rays_hit: self.rays_hit - earlier.rays_hit,
        }
    }
}

#[derive(Debug, Default)]
struct RayCounters {
    cast: AtomicU64,
    hit: AtomicU64,
}

impl RayCounters {
    fn record(&self, hit: bool) {
        self.cast.fetch_add(1, Ordering::Relaxed);
        if hit {
            self.hit.fetch_add(1, Ordering::Relaxed);
        }
    }

    fn snapshot(&self) -> RayStats {
        RayStats {
            rays_cast: self.cast.load(Ordering::Relaxed),
            rays_hit: self.hit.load(Ordering::Relaxed),
        }
    }
}

/// Everything a render task needs, shared by every task of one renderer.
pub struct RenderContext {
    scene: Arc<Scene>,
    config: RenderConfig,
    scheduler: Scheduler,
    counters: RayCounters,
    /// Base of every per-point RNG: the configured seed, or one drawn per render
    seed: u64,
}

impl RenderContext {
    pub fn new(scene: Arc<Scene>, config: RenderConfig) -> Result<Arc<Self>> {
        config.validate()?;
        let scheduler = Scheduler::new(config.threads)?;
        let seed = config.seed.unwrap_or_else(|| rand::thread_rng().gen());
        log::debug!("Render seed {seed:#018x}");
        Ok(Arc::new(Self {
            scene,
            config,
            scheduler,
            counters: RayCounters::default(),
            seed,
        }))
    }

    pub fn scene(&self) -> &Scene {
        &self.scene
    }

    pub fn config(&self) -> &RenderConfig {
        &self.config
    }

    pub fn scheduler(&self) -> &Scheduler {
        &self.scheduler
    }

    pub fn stats(&self) -> RayStats {
        self.counters.snapshot()
    }

    /// Intersect `ray` with the scene on the current thread.
    pub fn trace(&self, ray: &Ray) -> Option<Intersection> {
        let hit = self.scene.intersect(ray, self.config.traversal);
        self.counters.record(hit.is_some());
        hit
    }

    /// Submit an intersection task.
    pub fn cast_ray(self: &Arc<Self>, ray: Ray) -> TaskHandle<Option<Intersection>> {
        let ctx = Arc::clone(self);
        self.scheduler.spawn(move || ctx.trace(&ray))
    }

    /// Colors for a hit, produced by the hit body's material.
    pub fn shade(self: &Arc<Self>, hit: &Intersection, depth: u32) -> Result<Vec<Color>> {
        let body = self.scene.body(hit.body);
        body.material.color_for(hit, self, depth)
    }

    /// A hit's colors averaged into one.
    pub fn shade_mean(self: &Arc<Self>, hit: &Intersection, depth: u32) -> Result<Color> {
        let samples = self.shade(hit, depth)?;
        Ok(Color::mean(&samples).unwrap_or(self.config.background))
    }

    /// Random source for the samples taken at `point`, derived from the
    /// render seed and the point so results don't depend on scheduling.
    pub fn rng_for(&self, point: Vec3) -> StdRng {
        let mixed = self.seed
            ^ point.x.to_bits()
            ^ point.y.to_bits().rotate_left(21)
            ^ point.z.to_bits().rotate_left(42);
        StdRng::seed_from_u64(mixed)
    }

    /// Resolve one primary ray on the current thread: submit its
    /// intersection, wait for it, and shade the result.
    fn develop(self: &Arc<Self>, ray: Ray) -> Result<DevelopedPixel> {
        let pixel = ray.pixel().ok_or(RenderError::MissingPixel)?;
        let colors = match self.cast_ray(ray).join()? {
            Some(hit) => self.shade(&hit, 0)?,
            None => vec![self.config.background],
        };
        Ok(DevelopedPixel { pixel, colors })
    }

    /// Submit a pixel task for a primary ray.
    pub fn develop_pixel(self: &Arc<Self>, ray: Ray) -> TaskHandle<Result<DevelopedPixel>> {
        let ctx = Arc::clone(self);
        self.scheduler.spawn(move || ctx.develop(ray))
    }

    /// Pixel task that also merges its colors into `film`.
    fn develop_into(
        self: &Arc<Self>,
        ray: Ray,
        film: Arc<Film>,
    ) -> TaskHandle<Result<PixelCoord>> {
        let ctx = Arc::clone(self);
        self.scheduler.spawn(move || {
            let developed = ctx.develop(ray)?;
            film.capture(&developed)?;
            Ok(developed.pixel)
        })
    }
}

/// A finished render.
#[derive(Debug)]
pub struct RenderOutput {
    pub film: Film,
    /// Rays cast and hit during this render
    pub stats: RayStats,
}

/// Renders one scene with one configuration.
pub struct Renderer {
    ctx: Arc<RenderContext>,
}

impl Renderer {
    pub fn new(scene: Scene, config: RenderConfig) -> Result<Self> {
        Ok(Self {
            ctx: RenderContext::new(Arc::new(scene), config)?,
        })
    }

    pub fn context(&self) -> &Arc<RenderContext> {
        &self.ctx
    }

    /// Render the scene through its camera.
    pub fn render(&self) -> Result<RenderOutput> {
        let config = self.ctx.config();
        let mut rng = StdRng::seed_from_u64(self.ctx.seed);
        let camera = self.ctx.scene().camera();
        let rays = camera.primary_rays(config.samples_per_pixel, config.jitter, &mut rng);
        self.render_rays(rays)
    }

    /// Render externally produced primary rays. Every film pixel must be
    /// covered by at least one ray.
    pub fn render_rays<I>(&self, rays: I) -> Result<RenderOutput>
    where
        I: IntoIterator<Item = Ray>,
    {
        let ctx = &self.ctx;
        let config = ctx.config();
        let camera = ctx.scene().camera();
        let film = Arc::new(Film::new(camera.width(), camera.height(), config.blend));
        let scheduler = ctx.scheduler();
        let max_in_flight = scheduler.threads() * IN_FLIGHT_PER_THREAD;

        log::info!(
            "Rendering {}x{} film, {} samples per pixel, {} threads",
            camera.width(),
            camera.height(),
            config.samples_per_pixel,
            scheduler.threads()
        );
        let start = Instant::now();
        let stats_before = ctx.stats();

        let mut rays = rays.into_iter();
        let mut pending: VecDeque<TaskHandle<Result<PixelCoord>>> = VecDeque::new();
        let mut finished = 0usize;
        let mut last_progress = Instant::now();
        let mut last_report = Instant::now();

        loop {
            while pending.len() < max_in_flight {
                match rays.next() {
                    Some(ray) => pending.push_back(ctx.develop_into(ray, Arc::clone(&film))),
                    None => break,
                }
            }
            let Some(handle) = pending.pop_front() else {
                break;
            };

            if handle.wait_timeout(config.poll_interval()) {
                handle.join()??;
                finished += 1;
                last_progress = Instant::now();
            } else {
                pending.push_back(handle);
                if last_progress.elapsed() >= config.stall_timeout() {
                    return Err(RenderError::Stalled {
                        outstanding: scheduler.outstanding(),
                        missing: film.missing_pixels(),
                    });
                }
                log::debug!(
                    "Waiting on {} pixel tasks, {} tasks outstanding",
                    pending.len(),
                    scheduler.outstanding()
                );
            }

            if last_report.elapsed() >= PROGRESS_INTERVAL {
                let stats = ctx.stats().since(stats_before);
                log::info!(
                    "{finished} pixel samples done, {} pixels missing, {} rays cast, {} hit",
                    film.missing_pixels(),
                    stats.rays_cast,
                    stats.rays_hit
                );
                last_report = Instant::now();
            }
        }

        self.await_quiescence()?;
        let film = Arc::try_unwrap(film).map_err(|film| RenderError::Stalled {
            outstanding: scheduler.outstanding(),
            missing: film.missing_pixels(),
        })?;
        let missing = film.missing_pixels();
        if missing > 0 {
            return Err(RenderError::FilmNotReady { missing });
        }

        let stats = ctx.stats().since(stats_before);
        log::info!(
            "Rendered {finished} pixel samples in {:.2?}: {} rays cast, {} hit",
            start.elapsed(),
            stats.rays_cast,
            stats.rays_hit
        );
        Ok(RenderOutput { film, stats })
    }

    /// Wait, up to the stall timeout, for every submitted task to finish.
    fn await_quiescence(&self) -> Result<()> {
        let scheduler = self.ctx.scheduler();
        let deadline = Instant::now() + self.ctx.config().stall_timeout();
        while scheduler.outstanding() > 0 {
            if Instant::now() >= deadline {
                return Err(RenderError::Stalled {
                    outstanding: scheduler.outstanding(),
                    missing: 0,
                });
            }
            std::thread::sleep(self.ctx.config().poll_interval().min(Duration::from_millis(5)));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::material::IN_SHADOW;
    use crate::{Body, Camera, Light, Material, Sphere, TriangleMeshBuilder};

    const BACKGROUND: Color = Color::new(10, 20, 30);
    const SIZE: u32 = 24;

    /// A red sphere hovering in front of a white square, lit from above and
    /// behind the camera.
    fn sphere_on_a_plane(size: u32) -> Scene {
        sphere_on_a_plane_lit_by(size, Light::point(Vec3::new(0.0, -100.0, 100.0)).unwrap())
    }

    fn sphere_on_a_plane_lit_by(size: u32, light: Light) -> Scene {
        let camera = Camera::new(
            Vec3::new(0.0, -100.0, 0.0),
            Vec3::Y,
            Vec3::Z,
            1.2 / size as f64,
            size,
            size,
        )
        .unwrap();

        let mut plane = TriangleMeshBuilder::new();
        plane
            .add_triangle(
                Vec3::new(-100.0, 80.0, -100.0),
                Vec3::new(100.0, 80.0, -100.0),
                Vec3::new(100.0, 80.0, 100.0),
            )
            .unwrap()
            .add_triangle(
                Vec3::new(-100.0, 80.0, -100.0),
                Vec3::new(100.0, 80.0, 100.0),
                Vec3::new(-100.0, 80.0, 100.0),
            )
            .unwrap();

        let bodies = vec![
            Body::new(
                Sphere::new(Vec3::new(0.0, 0.0, 1.0), 40.0).unwrap(),
                Material::diffuse(Color::RED),
            )
            .with_name("Sphere"),
            Body::new(plane.build().unwrap(), Material::diffuse(Color::WHITE)).with_name("Plane"),
        ];
        Scene::new(camera, vec![light], bodies).unwrap()
    }

    fn config() -> RenderConfig {
        RenderConfig::default()
            .with_background(BACKGROUND)
            .with_shadow_differentials(2)
            .with_threads(2)
            .with_seed(17)
    }

    #[test]
    fn test_sphere_on_a_plane() {
        let _ = env_logger::builder().is_test(true).try_init();
        let renderer = Renderer::new(sphere_on_a_plane(SIZE), config()).unwrap();
        let output = renderer.render().unwrap();
        let film = &output.film;

        assert!(film.ready_to_develop());
        let mut ppm = Vec::new();
        film.write_ppm(&mut ppm).unwrap();
        let text = String::from_utf8(ppm).unwrap();
        assert!(text.starts_with("P3\n24 24\n255\n"));
        // Header, one line per row, trailing blank line
        assert_eq!(text.lines().count(), 3 + SIZE as usize + 1);

        let center = film.get(SIZE / 2, SIZE / 2).unwrap().unwrap();
        assert_eq!(center, Color::RED);
        // The sphere covers about 8 pixels either side of the center
        for row in SIZE / 2 - 3..=SIZE / 2 + 3 {
            for col in SIZE / 2 - 3..=SIZE / 2 + 3 {
                let pixel = film.get(row, col).unwrap().unwrap();
                assert_ne!(pixel, BACKGROUND, "pixel ({row}, {col})");
            }
        }
        for (row, col) in [(0, 0), (0, SIZE - 1), (SIZE - 1, 0), (SIZE - 1, SIZE - 1)] {
            assert_eq!(film.get(row, col).unwrap(), Some(BACKGROUND));
        }

        let stats = output.stats;
        assert!(stats.rays_hit > 0);
        assert!(stats.rays_hit <= stats.rays_cast);
        // At least one primary ray per pixel
        assert!(stats.rays_cast >= (SIZE * SIZE) as u64);
        assert_eq!(renderer.context().scheduler().outstanding(), 0);
    }

    #[test]
    fn test_plane_behind_sphere_is_shadowed() {
        // A light close in front of the sphere throws a wide shadow on the
        // plane, wider than the sphere's silhouette seen from the camera
        let light = Light::point(Vec3::new(0.0, -60.0, 0.0)).unwrap();
        let scene = sphere_on_a_plane_lit_by(SIZE, light);
        let ctx = RenderContext::new(Arc::new(scene), config()).unwrap();

        // Just outside the sphere's silhouette, still on the plane
        let ray = Ray::new(Vec3::new(0.0, -100.0, 0.0), Vec3::new(0.5, 1.0, 0.0));
        let hit = ctx.trace(&ray).unwrap();
        assert_eq!(ctx.scene().body(hit.body).label(), "Plane");
        let colors = ctx.shade(&hit, 0).unwrap();
        assert!(colors.iter().all(|&c| c == IN_SHADOW), "{colors:?}");
    }

    #[test]
    fn test_seeded_renders_repeat() {
        let config = config().with_jitter(true);
        let render = |config: RenderConfig| {
            Renderer::new(sphere_on_a_plane(8), config)
                .unwrap()
                .render()
                .unwrap()
        };
        let first = render(config.clone());
        let second = render(config);
        assert!(first.film.pixels().eq(second.film.pixels()));
        assert_eq!(first.stats, second.stats);
    }

    #[test]
    fn test_multiple_samples_per_pixel() {
        let renderer = Renderer::new(
            sphere_on_a_plane(6),
            config().with_samples_per_pixel(3).with_jitter(true),
        )
        .unwrap();
        let output = renderer.render().unwrap();
        for row in 0..6 {
            for col in 0..6 {
                assert_eq!(output.film.sample_count(row, col).unwrap(), 3);
            }
        }
    }

    #[test]
    fn test_develop_pixel() {
        let renderer = Renderer::new(sphere_on_a_plane(SIZE), config()).unwrap();
        let ctx = renderer.context();
        let camera = ctx.scene().camera();

        let pixel = PixelCoord::new(0, 0);
        let developed = ctx
            .develop_pixel(camera.ray_for(pixel, (0.5, 0.5)))
            .join()
            .unwrap()
            .unwrap();
        assert_eq!(developed.pixel, pixel);
        assert_eq!(developed.colors, vec![BACKGROUND]);

        let result = ctx.develop_pixel(Ray::new(Vec3::ZERO, Vec3::Y)).join().unwrap();
        assert!(matches!(result, Err(RenderError::MissingPixel)));
    }

    #[test]
    fn test_uncovered_pixels_fail_the_render() {
        let renderer = Renderer::new(sphere_on_a_plane(2), config()).unwrap();
        let camera = renderer.context().scene().camera().clone();
        let rays: Vec<Ray> = [(0, 0), (0, 1), (1, 0)]
            .into_iter()
            .map(|(row, col)| camera.ray_for(PixelCoord::new(row, col), (0.5, 0.5)))
            .collect();

        let result = renderer.render_rays(rays);
        assert!(matches!(result, Err(RenderError::FilmNotReady { missing: 1 })));
    }

    #[test]
    fn test_ray_outside_film_fails_the_render() {
        let renderer = Renderer::new(sphere_on_a_plane(2), config()).unwrap();
        let ray = Ray::primary(Vec3::new(0.0, -100.0, 0.0), Vec3::Y, PixelCoord::new(5, 5));
        let result = renderer.render_rays(vec![ray]);
        assert!(matches!(result, Err(RenderError::PixelOutOfRange { row: 5, col: 5, .. })));
    }

    #[test]
    fn test_liveness_across_pool_sizes() {
        for threads in 1..=3 {
            let renderer = Renderer::new(
                sphere_on_a_plane(10),
                config().with_threads(threads).with_stall_timeout(Duration::from_secs(60)),
            )
            .unwrap();
            let output = renderer.render().unwrap();
            assert!(output.film.ready_to_develop());
            assert_eq!(renderer.context().scheduler().outstanding(), 0);
        }
    }

    #[test]
    fn test_liveness_for_pool_sizes_up_to_pixel_count() {
        // From one worker up to one worker per pixel task
        let size = 4;
        for threads in 1..=(size * size) as usize {
            let renderer = Renderer::new(
                sphere_on_a_plane(size),
                config().with_threads(threads).with_stall_timeout(Duration::from_secs(60)),
            )
            .unwrap();
            let output = renderer.render().unwrap();
            assert!(output.film.ready_to_develop(), "{threads} threads");
        }
    }

    #[test]
    fn test_blocked_pool_stalls_the_render() {
        let renderer = Renderer::new(
            sphere_on_a_plane(2),
            config()
                .with_threads(1)
                .with_stall_timeout(Duration::from_millis(200)),
        )
        .unwrap();

        // Occupy the only worker until released
        let (started_tx, started) = std::sync::mpsc::channel::<()>();
        let (release, blocked) = std::sync::mpsc::channel::<()>();
        let blocker = renderer.context().scheduler().spawn(move || {
            let _ = started_tx.send(());
            blocked.recv_timeout(Duration::from_secs(5)).is_ok()
        });
        started.recv().unwrap();

        let start = Instant::now();
        let result = renderer.render();
        assert!(
            matches!(result, Err(RenderError::Stalled { outstanding, missing: 4 }) if outstanding > 0),
            "{result:?}"
        );
        assert!(start.elapsed() < Duration::from_secs(5));

        drop(release);
        assert!(!blocker.join().unwrap());
    }

    #[test]
    fn test_unseeded_context_is_consistent_per_point() {
        let ctx = RenderContext::new(
            Arc::new(sphere_on_a_plane(2)),
            RenderConfig::default().with_threads(1),
        )
        .unwrap();
        let point = Vec3::new(1.0, 2.0, 3.0);
        let a: u64 = ctx.rng_for(point).gen();
        let b: u64 = ctx.rng_for(point).gen();
        assert_eq!(a, b);

        let c: u64 = ctx.rng_for(Vec3::new(3.0, 2.0, 1.0)).gen();
        assert_ne!(a, c);
    }
}
