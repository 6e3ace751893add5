//! Pharos renderer - concurrent CPU ray tracing
//!
//! Casts primary rays through a pinhole camera, finds hits through a greedy
//! surface-area BVH, and shades them with materials that cast further
//! shadow, reflection and refraction rays. Every ray is a task on a shared
//! work-stealing pool; finished pixels are merged into a lock-free film and
//! written out as plain PPM.

mod body;
mod bvh;
mod camera;
mod color;
mod config;
mod error;
mod film;
mod hittable;
mod intersection;
mod light;
pub mod material;
mod mesh;
mod ppm;
mod ray;
mod renderer;
mod scene;
mod scheduler;
mod shape;
mod sphere;
mod triangle;

pub use body::{Body, BodyId};
pub use bvh::{pairing_score, Bvh, BvhNode, Traversal};
pub use camera::Camera;
pub use color::Color;
pub use config::RenderConfig;
pub use error::{RenderError, Result};
pub use film::{Blend, DevelopedPixel, Film};
pub use hittable::{Hittable, SurfaceHit, RAY_T, T_EPSILON};
pub use intersection::Intersection;
pub use light::Light;
pub use material::{refraction_index, Material};
pub use mesh::{TriangleMesh, TriangleMeshBuilder};
pub use ray::{PixelCoord, Ray};
pub use renderer::{RayStats, RenderContext, RenderOutput, Renderer};
pub use scene::Scene;
pub use scheduler::{Scheduler, TaskHandle};
pub use shape::Shape;
pub use sphere::Sphere;
pub use triangle::Triangle;

/// Re-export the math types used throughout the public API
pub use pharos_math::{Aabb, Interval, Vec3};
