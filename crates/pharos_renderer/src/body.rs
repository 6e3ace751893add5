//! Bodies: a shape paired with the material that shades it.

use crate::hittable::{Hittable, SurfaceHit};
use crate::{Material, Ray, Shape};
use pharos_math::{Aabb, Interval};
use std::fmt;

/// Index of a body inside its scene.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BodyId(pub usize);

impl fmt::Display for BodyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A renderable object. Immutable once placed into a scene.
#[derive(Debug, Clone, PartialEq)]
pub struct Body {
    pub shape: Shape,
    pub material: Material,
    pub name: Option<String>,
    /// Light emitters never cast shadows.
    pub emissive: bool,
}

impl Body {
    pub fn new(shape: impl Into<Shape>, material: Material) -> Self {
        Self {
            shape: shape.into(),
            material,
            name: None,
            emissive: false,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Mark this body as a light emitter.
    pub fn emissive(mut self) -> Self {
        self.emissive = true;
        self
    }

    /// Name for log messages.
    pub fn label(&self) -> &str {
        self.name.as_deref().unwrap_or("<unnamed>")
    }
}

impl Hittable for Body {
    fn hit(&self, ray: &Ray, ray_t: Interval) -> Option<SurfaceHit> {
        self.shape.hit(ray, ray_t)
    }

    fn bounding_box(&self) -> Aabb {
        self.shape.bounding_box()
    }

    fn surface_area(&self) -> f64 {
        self.shape.surface_area()
    }
}
