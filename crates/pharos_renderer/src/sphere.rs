//! Sphere primitive for ray tracing.

use crate::error::{ensure_finite, RenderError, Result};
use crate::hittable::{Hittable, SurfaceHit};
use crate::Ray;
use pharos_math::{Aabb, Interval, Vec3};
use std::f64::consts::PI;

/// A sphere primitive.
#[derive(Debug, Clone, PartialEq)]
pub struct Sphere {
    center: Vec3,
    radius: f64,
    bbox: Aabb,
}

impl Sphere {
    /// Create a new sphere. The radius must be finite and positive.
    pub fn new(center: Vec3, radius: f64) -> Result<Self> {
        ensure_finite("sphere center", center)?;
        if !(radius.is_finite() && radius > 0.0) {
            return Err(RenderError::InvalidGeometry(format!(
                "sphere radius must be positive, got {radius}"
            )));
        }
        let rvec = Vec3::splat(radius);
        let bbox = Aabb::from_points(center - rvec, center + rvec);

        Ok(Self {
            center,
            radius,
            bbox,
        })
    }

    pub fn center(&self) -> Vec3 {
        self.center
    }

    pub fn radius(&self) -> f64 {
        self.radius
    }
}

impl Hittable for Sphere {
    fn hit(&self, ray: &Ray, ray_t: Interval) -> Option<SurfaceHit> {
        let oc = self.center - ray.origin();
        let a = ray.direction().length_squared();
        let h = ray.direction().dot(oc);
        let c = oc.length_squared() - self.radius * self.radius;

        let discriminant = h * h - a * c;
        if discriminant < 0.0 || a == 0.0 {
            return None;
        }

        let sqrtd = discriminant.sqrt();

        // Find the nearest root in the acceptable range
        let mut root = (h - sqrtd) / a;
        if !ray_t.surrounds(root) {
            root = (h + sqrtd) / a;
            if !ray_t.surrounds(root) {
                return None;
            }
        }

        let p = ray.at(root);
        Some(SurfaceHit {
            t: root,
            p,
            normal: (p - self.center) / self.radius,
            triangle: None,
        })
    }

    fn bounding_box(&self) -> Aabb {
        self.bbox
    }

    fn surface_area(&self) -> f64 {
        4.0 * PI * self.radius * self.radius
    }
}
