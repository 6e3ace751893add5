//! Scene container: camera, lights, bodies and the index over them.

use crate::bvh::{Bvh, Traversal};
use crate::error::{RenderError, Result};
use crate::{Body, BodyId, Camera, Intersection, Light, Material, Ray};

/// Everything a render reads. Built once and never mutated afterwards, which
/// is what lets every worker read it without locking.
#[derive(Debug, Clone)]
pub struct Scene {
    camera: Camera,
    lights: Vec<Light>,
    bodies: Vec<Body>,
    bvh: Bvh,
}

impl Scene {
    pub fn new(camera: Camera, lights: Vec<Light>, bodies: Vec<Body>) -> Result<Self> {
        if let Some(body) = bodies.iter().find(|b| b.material == Material::Null) {
            return Err(RenderError::InvalidGeometry(format!(
                "body {} uses the null material",
                body.label()
            )));
        }

        let bvh = Bvh::build(&bodies)?;
        log::debug!(
            "Scene: {} bodies, {} lights, {}x{} film",
            bodies.len(),
            lights.len(),
            camera.width(),
            camera.height()
        );

        Ok(Self {
            camera,
            lights,
            bodies,
            bvh,
        })
    }

    pub fn camera(&self) -> &Camera {
        &self.camera
    }

    pub fn lights(&self) -> &[Light] {
        &self.lights
    }

    pub fn bodies(&self) -> &[Body] {
        &self.bodies
    }

    pub fn body(&self, id: BodyId) -> &Body {
        &self.bodies[id.0]
    }

    pub fn bvh(&self) -> &Bvh {
        &self.bvh
    }

    /// First body the ray hits, if any. The index is always queried with
    /// the bodies it was built over.
    pub fn intersect(&self, ray: &Ray, traversal: Traversal) -> Option<Intersection> {
        self.bvh.intersect(ray, &self.bodies, traversal)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{BvhNode, Color, Sphere};
    use pharos_math::Vec3;

    fn camera() -> Camera {
        Camera::new(Vec3::new(0.0, -100.0, 0.0), Vec3::Y, Vec3::Z, 0.1, 4, 4).unwrap()
    }

    #[test]
    fn test_empty_scene() {
        let result = Scene::new(camera(), vec![], vec![]);
        assert!(matches!(result, Err(RenderError::EmptyScene)));
    }

    #[test]
    fn test_null_material_body_rejected() {
        let body = Body::new(Sphere::new(Vec3::ZERO, 1.0).unwrap(), Material::Null);
        assert!(Scene::new(camera(), vec![], vec![body]).is_err());
    }

    #[test]
    fn test_intersect() {
        let bodies = vec![
            Body::new(Sphere::new(Vec3::ZERO, 10.0).unwrap(), Material::diffuse(Color::RED)),
            Body::new(
                Sphere::new(Vec3::new(0.0, 50.0, 0.0), 10.0).unwrap(),
                Material::diffuse(Color::BLUE),
            )
            .with_name("back"),
        ];
        let scene = Scene::new(camera(), vec![], bodies).unwrap();

        let ray = Ray::new(Vec3::new(0.0, -100.0, 0.0), Vec3::Y);
        let hit = scene.intersect(&ray, Traversal::Nearest).unwrap();
        assert_eq!(hit.body, BodyId(0));
        assert!((hit.time - 90.0).abs() < 1e-9);
        assert_eq!(scene.body(BodyId(1)).label(), "back");
    }

    #[test]
    fn test_bvh_leaves_cover_scene_bodies() {
        fn collect(node: &BvhNode, ids: &mut Vec<usize>) {
            match node {
                BvhNode::Leaf { body, .. } => ids.push(body.0),
                BvhNode::Branch { left, right, .. } => {
                    collect(left, ids);
                    collect(right, ids);
                }
            }
        }

        let bodies: Vec<Body> = (0..5)
            .map(|i| {
                Body::new(
                    Sphere::new(Vec3::new(i as f64 * 10.0, 0.0, 0.0), 2.0).unwrap(),
                    Material::diffuse(Color::WHITE),
                )
            })
            .collect();
        let light = Light::point(Vec3::new(0.0, 0.0, 50.0)).unwrap();
        let scene = Scene::new(camera(), vec![light], bodies).unwrap();

        let mut ids = Vec::new();
        collect(scene.bvh().root(), &mut ids);
        ids.sort_unstable();
        assert_eq!(ids, (0..scene.bodies().len()).collect::<Vec<_>>());
        assert_eq!(scene.lights().len(), 1);
        assert_eq!(scene.camera().width(), 4);
    }
}
