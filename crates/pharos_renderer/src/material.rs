//! Materials: how a hit turns into one or more sample colors.
//!
//! Shading is where the recursion happens. Diffuse materials cast shadow
//! rays, mirrors and glass cast a single derived ray and shade whatever it
//! hits. Every derived ray is submitted to the render's task pool and waited
//! on, so one pixel can fan out into many nested tasks.

use crate::error::{RenderError, Result};
use crate::hittable::Hittable;
use crate::renderer::RenderContext;
use crate::{Color, Intersection, Ray, TaskHandle};
use pharos_math::Vec3;
use std::sync::Arc;

/// Distance a derived ray's origin is moved off the surface it leaves.
const RAY_ADJUST_TIME: f64 = 0.01;

/// Color returned for shadowed samples and for derived rays that escape.
pub const IN_SHADOW: Color = Color::new(3, 3, 3);

/// What a mirror shows when the reflected ray escapes the scene.
pub const ENVIRONMENT: Color = IN_SHADOW;

/// Color used when refraction has no defined result.
pub const REFRACTION_FALLBACK: Color = Color::DARK_GRAY;

/// Chromatic channels span this range across the body's bounding box.
const CHROMATIC_MIN: f64 = 0.1;
const CHROMATIC_MAX: f64 = 0.9;

/// Indices of refraction, from "Physically Based Rendering", table 8.1.
pub mod refraction_index {
    pub const VACUUM: f64 = 1.0;
    pub const AIR_SEA_LEVEL: f64 = 1.00029;
    pub const ICE: f64 = 1.31;
    /// At 20 degrees Celsius.
    pub const WATER: f64 = 1.333;
    pub const FUSED_QUARTZ: f64 = 1.46;
    pub const GLASS: f64 = 1.55;
    pub const SAPPHIRE: f64 = 1.77;
    pub const DIAMOND: f64 = 2.42;
}

/// Surface appearance of a body.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Material {
    /// Lambertian shading of a flat color, with shadows.
    Diffuse { color: Color },
    /// Lambertian shading of a mesh's interpolated vertex colors.
    VertexColor,
    /// Perfect reflector.
    Mirror,
    /// Transparent material refracting rays entering from air.
    Refractive { index: f64 },
    /// Maps the hit position inside the body's box to RGB.
    Chromatic,
    /// Placeholder carried by BVH branches. Never shaded.
    Null,
}

impl Material {
    pub fn diffuse(color: Color) -> Self {
        Material::Diffuse { color }
    }

    /// A refractive material. The index must be a finite number >= 1.
    pub fn refractive(index: f64) -> Result<Self> {
        if !(index.is_finite() && index >= refraction_index::VACUUM) {
            return Err(RenderError::InvalidGeometry(format!(
                "index of refraction must be at least 1.0, got {index}"
            )));
        }
        Ok(Material::Refractive { index })
    }

    /// Shade a hit on a body carrying this material.
    ///
    /// `depth` counts how many mirror/glass bounces led here; once it reaches
    /// the configured maximum no further rays are cast.
    pub fn color_for(
        &self,
        hit: &Intersection,
        ctx: &Arc<RenderContext>,
        depth: u32,
    ) -> Result<Vec<Color>> {
        match self {
            Material::Diffuse { .. } | Material::VertexColor | Material::Chromatic => {
                let base = self.base_color(hit, ctx)?;
                lambertian_and_shadow(hit, base, ctx)
            }
            Material::Mirror => Ok(vec![reflection(hit, ctx, depth)?]),
            Material::Refractive { index } => Ok(vec![refraction(hit, *index, ctx, depth)?]),
            Material::Null => Err(RenderError::NullMaterial),
        }
    }

    /// Unlit surface color at the hit point.
    fn base_color(&self, hit: &Intersection, ctx: &RenderContext) -> Result<Color> {
        let body = ctx.scene().body(hit.body);
        match self {
            Material::Diffuse { color } => Ok(*color),
            Material::VertexColor => {
                let mesh = body.shape.as_mesh().ok_or_else(|| {
                    RenderError::InvalidGeometry(format!(
                        "vertex colored body {} is not a triangle mesh",
                        body.label()
                    ))
                })?;
                let index = hit.triangle.ok_or_else(|| {
                    RenderError::InvalidGeometry("mesh hit without a triangle index".to_string())
                })?;
                let colors = mesh.vertex_colors(index).ok_or_else(|| {
                    RenderError::InvalidGeometry(format!(
                        "mesh {} has no vertex colors",
                        body.label()
                    ))
                })?;
                let weights = mesh.triangles()[index].barycentric(hit.point);
                let mut rgb = [0.0; 3];
                for (color, weight) in colors.iter().zip(weights) {
                    for (channel, value) in rgb.iter_mut().zip(color.to_unit()) {
                        *channel += value * weight;
                    }
                }
                Ok(Color::from_unit(rgb[0], rgb[1], rgb[2]))
            }
            Material::Chromatic => {
                let bbox = body.bounding_box();
                let relative = (hit.point - bbox.min()) / bbox.extent();
                let span = CHROMATIC_MAX - CHROMATIC_MIN;
                let channel = |v: f64| v.clamp(0.0, 1.0) * span + CHROMATIC_MIN;
                Ok(Color::from_unit(
                    channel(relative.x),
                    channel(relative.y),
                    channel(relative.z),
                ))
            }
            Material::Mirror | Material::Refractive { .. } | Material::Null => {
                Err(RenderError::NullMaterial)
            }
        }
    }
}

/// One sample per light and per differential shadow ray.
///
/// Occluded samples are [`IN_SHADOW`]; lit samples are the base color scaled
/// by `1 - max(0, cos(incident, normal))`. A scene without lights yields a
/// single lit sample.
fn lambertian_and_shadow(
    hit: &Intersection,
    base: Color,
    ctx: &Arc<RenderContext>,
) -> Result<Vec<Color>> {
    let direction = hit.ray.direction();
    let raw = direction.dot(hit.normal).max(0.0);
    let max_value = direction.length() * hit.normal.length();
    let scaled = if max_value > 0.0 { raw / max_value } else { 0.0 };
    let lit = base.scale(1.0 - scaled);

    let lights = ctx.scene().lights();
    if lights.is_empty() {
        return Ok(vec![lit]);
    }

    let config = ctx.config();
    let mut rng = ctx.rng_for(hit.point);
    let pending: Vec<TaskHandle<Option<Intersection>>> = lights
        .iter()
        .flat_map(|light| {
            light.shadow_rays(
                hit.point,
                config.shadow_differentials,
                config.differential_spread_percent,
                &mut rng,
            )
        })
        .map(|ray| ctx.cast_ray(ray))
        .collect();

    let mut samples = Vec::with_capacity(pending.len());
    for handle in pending {
        let occluded = handle.join()?.is_some_and(|blocker| occludes(&blocker, hit, ctx));
        samples.push(if occluded { IN_SHADOW } else { lit });
    }
    Ok(samples)
}

/// A shadow ray is blocked by any non-emissive body other than the one being
/// shaded, provided it sits between the surface and the light.
fn occludes(blocker: &Intersection, shaded: &Intersection, ctx: &RenderContext) -> bool {
    blocker.body != shaded.body
        && blocker.time < 1.0
        && !ctx.scene().body(blocker.body).emissive
}

/// Mirror reflection about the normal: `2 * normal - incident`.
fn reflection(hit: &Intersection, ctx: &Arc<RenderContext>, depth: u32) -> Result<Color> {
    if depth >= ctx.config().max_depth {
        return Ok(ENVIRONMENT);
    }

    let reflected = 2.0 * hit.normal - hit.ray.direction();
    let ray = Ray::offset_from(hit.point, reflected, RAY_ADJUST_TIME);
    match ctx.cast_ray(ray).join()? {
        Some(next) => Ok(ctx.shade_mean(&next, depth + 1)?.darker()),
        None => Ok(ENVIRONMENT),
    }
}

/// Refraction from air into the material (vector form of Snell's law).
fn refraction(
    hit: &Intersection,
    index: f64,
    ctx: &Arc<RenderContext>,
    depth: u32,
) -> Result<Color> {
    if depth >= ctx.config().max_depth {
        return Ok(REFRACTION_FALLBACK);
    }

    let Some(refracted) = refract(
        hit.ray.direction(),
        hit.normal,
        refraction_index::AIR_SEA_LEVEL / index,
    ) else {
        return Ok(REFRACTION_FALLBACK);
    };

    let ray = Ray::offset_from(hit.point, refracted, RAY_ADJUST_TIME);
    match ctx.cast_ray(ray).join()? {
        Some(next) if next.body != hit.body => {
            Ok(ctx.shade_mean(&next, depth + 1)?.darker().darker())
        }
        _ => Ok(REFRACTION_FALLBACK),
    }
}

/// `r * d + (r * c - sqrt(1 - r^2 * (1 - c^2))) * n` with unit `d` and `n`,
/// `c = -n.d`. `None` on total internal reflection.
fn refract(direction: Vec3, normal: Vec3, ratio: f64) -> Option<Vec3> {
    let d = direction.try_normalize()?;
    let n = normal.try_normalize()?;
    let c = -n.dot(d);
    let discriminant = 1.0 - ratio * ratio * (1.0 - c * c);
    if discriminant < 0.0 {
        return None;
    }
    Some(ratio * d + (ratio * c - discriminant.sqrt()) * n)
}
