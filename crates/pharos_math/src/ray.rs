use crate::Vec3;

/// A geometric ray: the set of points `origin + t * direction`.
///
/// The direction is not required to be unit length. Shadow rays rely on this:
/// a ray aimed at a light reaches it at `t = 1`.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Ray {
    pub origin: Vec3,
    pub direction: Vec3,
}

impl Ray {
    /// Create a new ray.
    pub fn new(origin: Vec3, direction: Vec3) -> Self {
        Self { origin, direction }
    }

    /// Create the ray that starts at `from` and reaches `to` at `t = 1`.
    pub fn between(from: Vec3, to: Vec3) -> Self {
        Self::new(from, to - from)
    }

    /// Get the point along the ray at parameter t.
    #[inline]
    pub fn at(&self, t: f64) -> Vec3 {
        self.origin + self.direction * t
    }
}
