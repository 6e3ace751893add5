//! Pharos math - the geometry kernel shared by the renderer.
//!
//! Everything here is f64: intersection times are compared across the whole
//! scene, so the extra precision keeps self-intersection epsilons small.

mod aabb;
mod interval;
mod ray;

pub use aabb::Aabb;
pub use interval::Interval;
pub use ray::Ray;

/// Double precision vector used for points, directions and normals.
pub use glam::DVec3 as Vec3;

/// Returns true if any component of `v` is NaN.
#[inline]
pub fn has_nan(v: Vec3) -> bool {
    v.x.is_nan() || v.y.is_nan() || v.z.is_nan()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vec3_operations() {
        let a = Vec3::new(1.0, 2.0, 3.0);
        let b = Vec3::new(4.0, 5.0, 6.0);
        assert_eq!(a + b, Vec3::new(5.0, 7.0, 9.0));
        assert_eq!(a.dot(b), 32.0);
    }

    #[test]
    fn test_has_nan() {
        assert!(!has_nan(Vec3::ONE));
        assert!(has_nan(Vec3::new(0.0, f64::NAN, 0.0)));
    }
}
