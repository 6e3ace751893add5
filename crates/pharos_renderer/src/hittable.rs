//! Hittable trait and the per-shape hit record.

use crate::Ray;
use pharos_math::{Aabb, Interval, Vec3};

/// Smallest ray parameter accepted as a hit.
///
/// Rays leaving a surface start exactly on it; anything closer than this is
/// treated as the surface seeing itself.
pub const T_EPSILON: f64 = 1e-6;

/// The interval every scene query runs over.
pub const RAY_T: Interval = Interval::new(T_EPSILON, f64::INFINITY);

/// Where a ray met a single shape.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SurfaceHit {
    /// Parameter t where the intersection occurs
    pub t: f64,
    /// Point of intersection
    pub p: Vec3,
    /// Geometric surface normal (unit length, not flipped toward the ray)
    pub normal: Vec3,
    /// Index of the triangle that was hit, for meshes
    pub triangle: Option<usize>,
}

/// Trait for shapes that can be hit by rays.
pub trait Hittable: Send + Sync {
    /// Nearest hit with `t` strictly inside `ray_t`, if any.
    fn hit(&self, ray: &Ray, ray_t: Interval) -> Option<SurfaceHit>;

    /// Get the axis-aligned bounding box of this object.
    fn bounding_box(&self) -> Aabb;

    /// Total surface area, used by the BVH pairing score.
    fn surface_area(&self) -> f64;
}
