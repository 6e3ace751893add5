//! Pinhole camera for primary ray generation.

use crate::error::{ensure_finite, RenderError, Result};
use crate::{PixelCoord, Ray};
use pharos_math::Vec3;
use rand::Rng;

/// A pinhole camera looking through a flat film.
///
/// The film sits at `location + look_at`, so the length of `look_at` is the
/// film distance. Pixels are square with side `pixel_size`; row 0 is at the
/// top (toward `up`) and column 0 on the left.
#[derive(Debug, Clone, PartialEq)]
pub struct Camera {
    location: Vec3,
    look_at: Vec3,
    up: Vec3,
    pixel_size: f64,
    width: u32,
    height: u32,

    // Derived film basis
    right: Vec3,
    film_up: Vec3,
    top_left: Vec3,
}

impl Camera {
    pub fn new(
        location: Vec3,
        look_at: Vec3,
        up: Vec3,
        pixel_size: f64,
        width: u32,
        height: u32,
    ) -> Result<Self> {
        ensure_finite("camera location", location)?;
        ensure_finite("camera look-at", look_at)?;
        ensure_finite("camera up", up)?;
        if !(pixel_size.is_finite() && pixel_size > 0.0) {
            return Err(RenderError::InvalidGeometry(format!(
                "pixel size must be positive, got {pixel_size}"
            )));
        }
        if width == 0 || height == 0 {
            return Err(RenderError::InvalidGeometry(format!(
                "film must have at least one pixel, got {width}x{height}"
            )));
        }

        let right = look_at.cross(up).try_normalize().ok_or_else(|| {
            RenderError::InvalidGeometry(
                "camera look-at and up must be non-zero and not parallel".to_string(),
            )
        })?;
        let film_up = right.cross(look_at).normalize();

        let film_center = location + look_at;
        let half_width = pixel_size * width as f64 / 2.0;
        let half_height = pixel_size * height as f64 / 2.0;
        let top_left = film_center - right * half_width + film_up * half_height;

        Ok(Self {
            location,
            look_at,
            up,
            pixel_size,
            width,
            height,
            right,
            film_up,
            top_left,
        })
    }

    pub fn location(&self) -> Vec3 {
        self.location
    }

    pub fn look_at(&self) -> Vec3 {
        self.look_at
    }

    pub fn up(&self) -> Vec3 {
        self.up
    }

    pub fn pixel_size(&self) -> f64 {
        self.pixel_size
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn pixel_count(&self) -> usize {
        self.width as usize * self.height as usize
    }

    /// Point on the film inside pixel `(row, col)`. `offset` is the position
    /// within the pixel, `(0.5, 0.5)` being its center.
    pub fn film_point(&self, pixel: PixelCoord, offset: (f64, f64)) -> Vec3 {
        let (ox, oy) = offset;
        self.top_left + self.right * ((pixel.col as f64 + ox) * self.pixel_size)
            - self.film_up * ((pixel.row as f64 + oy) * self.pixel_size)
    }

    /// Ray from the pinhole through pixel `(row, col)`.
    pub fn ray_for(&self, pixel: PixelCoord, offset: (f64, f64)) -> Ray {
        let direction = self.film_point(pixel, offset) - self.location;
        Ray::primary(self.location, direction, pixel)
    }

    /// Every primary ray for the film: row-major, with each pixel's samples
    /// adjacent. Without jitter every sample passes through the pixel center.
    pub fn primary_rays<R: Rng + ?Sized>(
        &self,
        samples_per_pixel: u32,
        jitter: bool,
        rng: &mut R,
    ) -> Vec<Ray> {
        let mut rays = Vec::with_capacity(self.pixel_count() * samples_per_pixel as usize);
        for row in 0..self.height {
            for col in 0..self.width {
                let pixel = PixelCoord::new(row, col);
                for _ in 0..samples_per_pixel {
                    let offset = if jitter {
                        (rng.gen::<f64>(), rng.gen::<f64>())
                    } else {
                        (0.5, 0.5)
                    };
                    rays.push(self.ray_for(pixel, offset));
                }
            }
        }
        rays
    }
}
