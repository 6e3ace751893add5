//! Triangle meshes.
//!
//! A mesh is a single body as far as the BVH is concerned. Its triangles are
//! tested linearly behind the mesh's own bounding box.

use crate::error::{RenderError, Result};
use crate::hittable::{Hittable, SurfaceHit};
use crate::{Color, Ray, Triangle};
use pharos_math::{Aabb, Interval, Vec3};

/// A collection of triangles with optional per-vertex colors.
#[derive(Debug, Clone, PartialEq)]
pub struct TriangleMesh {
    triangles: Vec<Triangle>,
    /// One color per vertex of each triangle, when every triangle has them
    vertex_colors: Option<Vec<[Color; 3]>>,
    bbox: Aabb,
    area: f64,
}

impl TriangleMesh {
    pub fn triangles(&self) -> &[Triangle] {
        &self.triangles
    }

    pub fn len(&self) -> usize {
        self.triangles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.triangles.is_empty()
    }

    /// Vertex colors of one triangle, if the mesh is colored.
    pub fn vertex_colors(&self, triangle: usize) -> Option<[Color; 3]> {
        self.vertex_colors
            .as_ref()
            .and_then(|colors| colors.get(triangle).copied())
    }
}

impl Hittable for TriangleMesh {
    fn hit(&self, ray: &Ray, ray_t: Interval) -> Option<SurfaceHit> {
        if !self.bbox.hit(&ray.to_math(), ray_t) {
            return None;
        }

        let mut closest: Option<SurfaceHit> = None;
        for (index, triangle) in self.triangles.iter().enumerate() {
            let max = closest.map_or(ray_t.max, |c| c.t);
            if let Some(mut hit) = triangle.hit(ray, Interval::new(ray_t.min, max)) {
                hit.triangle = Some(index);
                closest = Some(hit);
            }
        }
        closest
    }

    fn bounding_box(&self) -> Aabb {
        self.bbox
    }

    fn surface_area(&self) -> f64 {
        self.area
    }
}

/// Incrementally assembles a [`TriangleMesh`].
#[derive(Debug, Default)]
pub struct TriangleMeshBuilder {
    triangles: Vec<Triangle>,
    colors: Vec<Option<[Color; 3]>>,
}

impl TriangleMeshBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an uncolored triangle. Degenerate triangles are rejected.
    pub fn add_triangle(&mut self, v0: Vec3, v1: Vec3, v2: Vec3) -> Result<&mut Self> {
        self.triangles.push(Triangle::new(v0, v1, v2)?);
        self.colors.push(None);
        Ok(self)
    }

    /// Add a triangle with one color per vertex.
    pub fn add_colored_triangle(&mut self, vertices: [(Vec3, Color); 3]) -> Result<&mut Self> {
        let [(v0, c0), (v1, c1), (v2, c2)] = vertices;
        self.triangles.push(Triangle::new(v0, v1, v2)?);
        self.colors.push(Some([c0, c1, c2]));
        Ok(self)
    }

    /// Finish the mesh. Fails when no triangles were added.
    ///
    /// Vertex colors are kept only if every triangle supplied them.
    pub fn build(self) -> Result<TriangleMesh> {
        if self.triangles.is_empty() {
            return Err(RenderError::InvalidGeometry(
                "triangle mesh has no triangles".to_string(),
            ));
        }

        let bbox = self
            .triangles
            .iter()
            .fold(Aabb::EMPTY, |acc, t| Aabb::surrounding(&acc, &t.bounding_box()));
        let area = self.triangles.iter().map(|t| t.surface_area()).sum();
        let vertex_colors = self.colors.into_iter().collect::<Option<Vec<_>>>();

        Ok(TriangleMesh {
            triangles: self.triangles,
            vertex_colors,
            bbox,
            area,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hittable::RAY_T;

    /// Two stacked quads facing -Z, at z=1 and z=3.
    fn two_layer_mesh() -> TriangleMesh {
        let mut builder = TriangleMeshBuilder::new();
        for z in [3.0, 1.0] {
            builder
                .add_triangle(
                    Vec3::new(-1.0, -1.0, z),
                    Vec3::new(1.0, -1.0, z),
                    Vec3::new(0.0, 1.0, z),
                )
                .unwrap();
        }
        builder.build().unwrap()
    }

    #[test]
    fn test_mesh_reports_nearest_triangle() {
        let mesh = two_layer_mesh();
        let ray = Ray::new(Vec3::ZERO, Vec3::Z);

        let hit = mesh.hit(&ray, RAY_T).unwrap();
        assert!((hit.t - 1.0).abs() < 1e-9);
        assert_eq!(hit.triangle, Some(1));
    }

    #[test]
    fn test_mesh_area_and_bounds() {
        let mesh = two_layer_mesh();
        assert_eq!(mesh.len(), 2);
        assert!((mesh.surface_area() - 4.0).abs() < 1e-12);
        // Flat triangles get padded boxes
        assert!((mesh.bounding_box().z.min - 1.0).abs() < 1e-3);
        assert!((mesh.bounding_box().z.max - 3.0).abs() < 1e-3);
    }

    #[test]
    fn test_mesh_colors_only_when_complete() {
        let v = [Vec3::ZERO, Vec3::X, Vec3::Y];
        let mut colored = TriangleMeshBuilder::new();
        colored
            .add_colored_triangle([(v[0], Color::RED), (v[1], Color::GREEN), (v[2], Color::BLUE)])
            .unwrap();
        let mesh = colored.build().unwrap();
        assert_eq!(mesh.vertex_colors(0), Some([Color::RED, Color::GREEN, Color::BLUE]));

        let mut mixed = TriangleMeshBuilder::new();
        mixed
            .add_colored_triangle([(v[0], Color::RED), (v[1], Color::GREEN), (v[2], Color::BLUE)])
            .unwrap()
            .add_triangle(v[0], v[2], Vec3::Z)
            .unwrap();
        assert_eq!(mixed.build().unwrap().vertex_colors(0), None);
    }

    #[test]
    fn test_empty_mesh_rejected() {
        assert!(TriangleMeshBuilder::new().build().is_err());
    }
}
