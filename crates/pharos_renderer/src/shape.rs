//! The closed set of shapes a body can have.

use crate::hittable::{Hittable, SurfaceHit};
use crate::{Ray, Sphere, Triangle, TriangleMesh};
use pharos_math::{Aabb, Interval, Vec3};

#[derive(Debug, Clone, PartialEq)]
pub enum Shape {
    Sphere(Sphere),
    Triangle(Triangle),
    Mesh(TriangleMesh),
    /// A solid axis-aligned box.
    Box(Aabb),
}

impl Shape {
    /// The mesh behind this shape, if it is one.
    pub fn as_mesh(&self) -> Option<&TriangleMesh> {
        match self {
            Shape::Mesh(mesh) => Some(mesh),
            _ => None,
        }
    }
}

impl Hittable for Shape {
    fn hit(&self, ray: &Ray, ray_t: Interval) -> Option<SurfaceHit> {
        match self {
            Shape::Sphere(s) => s.hit(ray, ray_t),
            Shape::Triangle(t) => t.hit(ray, ray_t),
            Shape::Mesh(m) => m.hit(ray, ray_t),
            Shape::Box(b) => hit_box(b, ray, ray_t),
        }
    }

    fn bounding_box(&self) -> Aabb {
        match self {
            Shape::Sphere(s) => s.bounding_box(),
            Shape::Triangle(t) => t.bounding_box(),
            Shape::Mesh(m) => m.bounding_box(),
            Shape::Box(b) => *b,
        }
    }

    fn surface_area(&self) -> f64 {
        match self {
            Shape::Sphere(s) => s.surface_area(),
            Shape::Triangle(t) => t.surface_area(),
            Shape::Mesh(m) => m.surface_area(),
            Shape::Box(b) => b.surface_area(),
        }
    }
}

impl From<Sphere> for Shape {
    fn from(s: Sphere) -> Self {
        Shape::Sphere(s)
    }
}

impl From<Triangle> for Shape {
    fn from(t: Triangle) -> Self {
        Shape::Triangle(t)
    }
}

impl From<TriangleMesh> for Shape {
    fn from(m: TriangleMesh) -> Self {
        Shape::Mesh(m)
    }
}

impl From<Aabb> for Shape {
    fn from(b: Aabb) -> Self {
        Shape::Box(b)
    }
}

/// Slab test that also tracks which face was crossed.
///
/// Returns the entry face when the entry lies in `ray_t`, otherwise the exit
/// face (origin inside the box).
fn hit_box(bbox: &Aabb, ray: &Ray, ray_t: Interval) -> Option<SurfaceHit> {
    let mut t_near = f64::NEG_INFINITY;
    let mut t_far = f64::INFINITY;
    let mut near_normal = Vec3::ZERO;
    let mut far_normal = Vec3::ZERO;

    for axis in 0..3 {
        let slab = bbox.axis_interval(axis);
        let origin = ray.origin()[axis];
        let dir = ray.direction()[axis];

        if dir == 0.0 {
            if !slab.contains(origin) {
                return None;
            }
            continue;
        }

        let mut axis_normal = Vec3::ZERO;
        axis_normal[axis] = 1.0;
        let (t0, t1, n0, n1) = if dir > 0.0 {
            ((slab.min - origin) / dir, (slab.max - origin) / dir, -axis_normal, axis_normal)
        } else {
            ((slab.max - origin) / dir, (slab.min - origin) / dir, axis_normal, -axis_normal)
        };

        if t0 > t_near {
            t_near = t0;
            near_normal = n0;
        }
        if t1 < t_far {
            t_far = t1;
            far_normal = n1;
        }
        if t_far < t_near {
            return None;
        }
    }

    let (t, normal) = if ray_t.surrounds(t_near) {
        (t_near, near_normal)
    } else if ray_t.surrounds(t_far) {
        (t_far, far_normal)
    } else {
        return None;
    };

    Some(SurfaceHit {
        t,
        p: ray.at(t),
        normal,
        triangle: None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hittable::RAY_T;

    fn cube() -> Shape {
        Shape::Box(Aabb::from_points(Vec3::splat(-1.0), Vec3::splat(1.0)))
    }

    #[test]
    fn test_box_hit_from_outside() {
        let ray = Ray::new(Vec3::new(0.0, 0.0, -5.0), Vec3::Z);
        let hit = cube().hit(&ray, RAY_T).unwrap();
        assert!((hit.t - 4.0).abs() < 1e-12);
        assert_eq!(hit.normal, -Vec3::Z);
    }

    #[test]
    fn test_box_hit_from_inside() {
        let ray = Ray::new(Vec3::ZERO, Vec3::new(2.0, 0.0, 0.0));
        let hit = cube().hit(&ray, RAY_T).unwrap();
        assert!((hit.t - 0.5).abs() < 1e-12);
        assert_eq!(hit.normal, Vec3::X);
    }

    #[test]
    fn test_box_miss() {
        let ray = Ray::new(Vec3::new(3.0, 0.0, -5.0), Vec3::Z);
        assert!(cube().hit(&ray, RAY_T).is_none());
    }

    #[test]
    fn test_box_area() {
        assert!((cube().surface_area() - 24.0).abs() < 1e-12);
    }

    #[test]
    fn test_shape_dispatch() {
        let shape: Shape = Sphere::new(Vec3::ZERO, 1.0).unwrap().into();
        let ray = Ray::new(Vec3::new(0.0, 0.0, -3.0), Vec3::Z);
        assert!((shape.hit(&ray, RAY_T).unwrap().t - 2.0).abs() < 1e-9);
        assert!(shape.as_mesh().is_none());
    }
}
