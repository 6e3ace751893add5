//! Triangle primitive for ray tracing.
//!
//! Uses the Möller-Trumbore algorithm for ray-triangle intersection.

use crate::error::{ensure_finite, RenderError, Result};
use crate::hittable::{Hittable, SurfaceHit};
use crate::Ray;
use pharos_math::{Aabb, Interval, Vec3};

/// Determinant threshold below which the ray counts as parallel.
const EPSILON: f64 = 1e-6;

/// A triangle primitive.
#[derive(Debug, Clone, PartialEq)]
pub struct Triangle {
    /// Vertices
    v0: Vec3,
    v1: Vec3,
    v2: Vec3,
    /// Face normal from the winding order (unit length)
    normal: Vec3,
    /// Bounding box
    bbox: Aabb,
}

impl Triangle {
    /// Create a new triangle from three vertices.
    ///
    /// The normal follows the winding: `(v1 - v0) x (v2 - v0)`.
    pub fn new(v0: Vec3, v1: Vec3, v2: Vec3) -> Result<Self> {
        ensure_finite("triangle vertex v0", v0)?;
        ensure_finite("triangle vertex v1", v1)?;
        ensure_finite("triangle vertex v2", v2)?;
        if v0 == v1 || v0 == v2 || v1 == v2 {
            return Err(RenderError::InvalidGeometry(format!(
                "triangle has coincident vertices: {v0}, {v1}, {v2}"
            )));
        }

        let cross = (v1 - v0).cross(v2 - v0);
        if cross.length_squared() == 0.0 {
            return Err(RenderError::InvalidGeometry(format!(
                "triangle vertices are collinear: {v0}, {v1}, {v2}"
            )));
        }

        let bbox = Aabb::from_points(v0.min(v1).min(v2), v0.max(v1).max(v2));

        Ok(Self {
            v0,
            v1,
            v2,
            normal: cross.normalize(),
            bbox,
        })
    }

    pub fn vertices(&self) -> [Vec3; 3] {
        [self.v0, self.v1, self.v2]
    }

    pub fn normal(&self) -> Vec3 {
        self.normal
    }

    /// Barycentric weights `[w0, w1, w2]` of a point in the triangle's plane.
    pub fn barycentric(&self, p: Vec3) -> [f64; 3] {
        let e0 = self.v1 - self.v0;
        let e1 = self.v2 - self.v0;
        let e2 = p - self.v0;
        let d00 = e0.dot(e0);
        let d01 = e0.dot(e1);
        let d11 = e1.dot(e1);
        let d20 = e2.dot(e0);
        let d21 = e2.dot(e1);
        let denom = d00 * d11 - d01 * d01;
        let w1 = (d11 * d20 - d01 * d21) / denom;
        let w2 = (d00 * d21 - d01 * d20) / denom;
        [1.0 - w1 - w2, w1, w2]
    }
}

impl Hittable for Triangle {
    fn hit(&self, ray: &Ray, ray_t: Interval) -> Option<SurfaceHit> {
        let edge1 = self.v1 - self.v0;
        let edge2 = self.v2 - self.v0;

        let h = ray.direction().cross(edge2);
        let a = edge1.dot(h);

        // Ray is parallel to triangle
        if a.abs() < EPSILON {
            return None;
        }

        let f = 1.0 / a;
        let s = ray.origin() - self.v0;
        let u = f * s.dot(h);
        if !(0.0..=1.0).contains(&u) {
            return None;
        }

        let q = s.cross(edge1);
        let v = f * ray.direction().dot(q);
        if v < 0.0 || u + v > 1.0 {
            return None;
        }

        let t = f * edge2.dot(q);
        if !ray_t.surrounds(t) {
            return None;
        }

        Some(SurfaceHit {
            t,
            p: ray.at(t),
            normal: self.normal,
            triangle: None,
        })
    }

    fn bounding_box(&self) -> Aabb {
        self.bbox
    }

    fn surface_area(&self) -> f64 {
        0.5 * (self.v1 - self.v0).cross(self.v2 - self.v0).length()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hittable::RAY_T;

    fn xy_triangle() -> Triangle {
        // Triangle in XY plane at z=-1
        Triangle::new(
            Vec3::new(-1.0, -1.0, -1.0),
            Vec3::new(1.0, -1.0, -1.0),
            Vec3::new(0.0, 1.0, -1.0),
        )
        .unwrap()
    }

    #[test]
    fn test_triangle_hit() {
        let ray = Ray::new(Vec3::ZERO, Vec3::new(0.0, 0.0, -1.0));
        let hit = xy_triangle().hit(&ray, RAY_T).unwrap();
        assert!((hit.t - 1.0).abs() < 0.001);
        assert_eq!(hit.normal, Vec3::Z);
    }

    #[test]
    fn test_triangle_miss() {
        // Ray pointing away
        let ray = Ray::new(Vec3::ZERO, Vec3::new(0.0, 0.0, 1.0));
        assert!(xy_triangle().hit(&ray, RAY_T).is_none());

        // Parallel to the plane
        let ray = Ray::new(Vec3::new(0.0, 0.0, -1.0), Vec3::X);
        assert!(xy_triangle().hit(&ray, RAY_T).is_none());
    }

    #[test]
    fn test_triangle_area() {
        assert!((xy_triangle().surface_area() - 2.0).abs() < 1e-12);
    }

    #[test]
    fn test_barycentric_of_vertices() {
        let tri = xy_triangle();
        let [v0, _, v2] = tri.vertices();
        let w = tri.barycentric(v0);
        assert!((w[0] - 1.0).abs() < 1e-12 && w[1].abs() < 1e-12 && w[2].abs() < 1e-12);
        let w = tri.barycentric(v2);
        assert!((w[2] - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_degenerate_triangles_rejected() {
        let a = Vec3::ZERO;
        let b = Vec3::X;
        assert!(Triangle::new(a, a, b).is_err());
        assert!(Triangle::new(a, b, Vec3::new(2.0, 0.0, 0.0)).is_err());
        assert!(Triangle::new(a, b, Vec3::new(f64::NAN, 1.0, 0.0)).is_err());
    }
}
