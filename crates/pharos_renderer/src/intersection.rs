//! The record of where, when and what a ray struck.

use crate::hittable::SurfaceHit;
use crate::{BodyId, Ray};
use pharos_math::Vec3;
use std::cmp::Ordering;

/// A ray/body intersection. Produced by geometry tests, never mutated.
///
/// Refers to the body by id so the record can cross task boundaries without
/// borrowing the scene.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Intersection {
    /// Ray parameter at the hit; finite and above the self-hit epsilon
    pub time: f64,
    /// The ray that produced this hit
    pub ray: Ray,
    /// Geometric surface normal (unit length)
    pub normal: Vec3,
    /// Point of intersection
    pub point: Vec3,
    /// The body that was hit
    pub body: BodyId,
    /// Triangle index within a mesh body
    pub triangle: Option<usize>,
}

impl Intersection {
    pub fn new(ray: Ray, hit: SurfaceHit, body: BodyId) -> Self {
        Self {
            time: hit.t,
            ray,
            normal: hit.normal,
            point: hit.p,
            body,
            triangle: hit.triangle,
        }
    }

    /// Whichever of two optional hits happened first.
    pub fn earliest(a: Option<Intersection>, b: Option<Intersection>) -> Option<Intersection> {
        match (a, b) {
            (Some(a), Some(b)) => Some(if b < a { b } else { a }),
            (a, None) => a,
            (None, b) => b,
        }
    }
}

/// Intersections order by time: the earliest hit wins.
impl PartialOrd for Intersection {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        self.time.partial_cmp(&other.time)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hit_at(t: f64, body: usize) -> Intersection {
        let ray = Ray::new(Vec3::ZERO, Vec3::X);
        let hit = SurfaceHit {
            t,
            p: ray.at(t),
            normal: -Vec3::X,
            triangle: None,
        };
        Intersection::new(ray, hit, BodyId(body))
    }

    #[test]
    fn test_earliest() {
        let near = hit_at(1.0, 0);
        let far = hit_at(2.0, 1);

        assert_eq!(Intersection::earliest(Some(far), Some(near)), Some(near));
        assert_eq!(Intersection::earliest(Some(near), None), Some(near));
        assert_eq!(Intersection::earliest(None, Some(far)), Some(far));
        assert_eq!(Intersection::earliest(None, None), None);
    }

    #[test]
    fn test_ordering_by_time() {
        assert!(hit_at(0.5, 3) < hit_at(0.6, 0));
        assert_eq!(hit_at(1.0, 0).point, Vec3::X);
    }
}
