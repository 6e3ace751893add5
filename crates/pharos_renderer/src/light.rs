//! Lights and the shadow rays aimed at them.

use crate::error::{ensure_finite, Result};
use crate::hittable::Hittable;
use crate::{Ray, Shape};
use pharos_math::Vec3;
use rand::Rng;

#[derive(Debug, Clone, PartialEq)]
pub enum Light {
    /// Light emitted from a single point.
    Point { location: Vec3 },
    /// Light emitted by a shape; shadow rays aim at its center and the
    /// differential rays spread around it.
    Area { shape: Shape },
}

impl Light {
    pub fn point(location: Vec3) -> Result<Self> {
        ensure_finite("light location", location)?;
        Ok(Light::Point { location })
    }

    pub fn area(shape: impl Into<Shape>) -> Self {
        Light::Area {
            shape: shape.into(),
        }
    }

    /// The point shadow rays aim at.
    pub fn location(&self) -> Vec3 {
        match self {
            Light::Point { location } => *location,
            Light::Area { shape } => shape.bounding_box().centroid(),
        }
    }

    /// The exact ray from `from` to this light followed by `count` perturbed
    /// copies. Every ray reaches (roughly) the light at `t = 1`.
    pub fn shadow_rays<R: Rng + ?Sized>(
        &self,
        from: Vec3,
        count: u32,
        spread_percent: f64,
        rng: &mut R,
    ) -> Vec<Ray> {
        let exact = Ray::between(from, self.location());
        let mut rays = Vec::with_capacity(count as usize + 1);
        rays.push(exact);
        rays.extend((0..count).map(|_| perturb(&exact, spread_percent, rng)));
        rays
    }
}

/// Move the far end of `ray` by up to `spread_percent` of its length along
/// each axis, keeping the origin.
fn perturb<R: Rng + ?Sized>(ray: &Ray, spread_percent: f64, rng: &mut R) -> Ray {
    let end = ray.at(1.0);
    let radius = ray.direction().length() * (spread_percent / 100.0);
    let mut jitter = || {
        let sign = if rng.gen_bool(0.5) { 1.0 } else { -1.0 };
        sign * rng.gen::<f64>() * radius
    };
    let offset = Vec3::new(jitter(), jitter(), jitter());
    Ray::between(ray.origin(), end + offset)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Sphere;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_area_light_location_is_shape_center() {
        let light = Light::area(Sphere::new(Vec3::new(0.0, 0.0, 100.0), 10.0).unwrap());
        assert_eq!(light.location(), Vec3::new(0.0, 0.0, 100.0));
    }

    #[test]
    fn test_shadow_rays_stay_within_spread() {
        let light = Light::point(Vec3::new(0.0, 0.0, 100.0)).unwrap();
        let mut rng = StdRng::seed_from_u64(7);
        let rays = light.shadow_rays(Vec3::ZERO, 15, 3.0, &mut rng);

        assert_eq!(rays.len(), 16);
        assert_eq!(rays[0].at(1.0), light.location());
        for ray in &rays {
            assert_eq!(ray.origin(), Vec3::ZERO);
            let miss = ray.at(1.0) - light.location();
            // Each axis moves at most 3% of the 100 unit length
            assert!(miss.abs().max_element() <= 3.0 + 1e-9);
        }
    }

    #[test]
    fn test_point_light_rejects_nan() {
        assert!(Light::point(Vec3::new(f64::NAN, 0.0, 0.0)).is_err());
    }
}
