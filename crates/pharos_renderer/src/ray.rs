//! Ray type for the renderer.
//!
//! Wraps the geometric ray with the film pixel it was cast for. Primary rays
//! carry a pixel; shadow, reflection and refraction rays do not.

use pharos_math::Vec3;
use serde::{Deserialize, Serialize};

/// Row/column address of a film cell. Row 0 is the top of the image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PixelCoord {
    pub row: u32,
    pub col: u32,
}

impl PixelCoord {
    pub fn new(row: u32, col: u32) -> Self {
        Self { row, col }
    }
}

/// A ray with origin, direction and an optional pixel coordinate.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ray {
    /// Origin point of the ray
    origin: Vec3,
    /// Direction vector (not necessarily normalized)
    direction: Vec3,
    /// Film cell this sample belongs to
    pixel: Option<PixelCoord>,
}

impl Ray {
    /// Create a derived ray (no pixel).
    #[inline]
    pub fn new(origin: Vec3, direction: Vec3) -> Self {
        Self {
            origin,
            direction,
            pixel: None,
        }
    }

    /// Create a primary ray for a film pixel.
    #[inline]
    pub fn primary(origin: Vec3, direction: Vec3, pixel: PixelCoord) -> Self {
        Self {
            origin,
            direction,
            pixel: Some(pixel),
        }
    }

    /// Ray from `from` that reaches `to` at `t = 1`.
    #[inline]
    pub fn between(from: Vec3, to: Vec3) -> Self {
        Self::new(from, to - from)
    }

    /// Ray starting slightly along `direction` from `point`, so it cannot
    /// immediately re-hit the surface it leaves.
    pub fn offset_from(point: Vec3, direction: Vec3, offset: f64) -> Self {
        let origin = point + direction.normalize_or_zero() * offset;
        Self::new(origin, direction)
    }

    #[inline]
    pub fn origin(&self) -> Vec3 {
        self.origin
    }

    #[inline]
    pub fn direction(&self) -> Vec3 {
        self.direction
    }

    #[inline]
    pub fn pixel(&self) -> Option<PixelCoord> {
        self.pixel
    }

    /// P(t) = origin + t * direction
    #[inline]
    pub fn at(&self, t: f64) -> Vec3 {
        self.origin + t * self.direction
    }

    /// The geometric ray, used for AABB tests.
    #[inline]
    pub fn to_math(&self) -> pharos_math::Ray {
        pharos_math::Ray::new(self.origin, self.direction)
    }
}
