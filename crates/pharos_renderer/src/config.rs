//! Render settings.

use crate::bvh::Traversal;
use crate::error::{RenderError, Result};
use crate::film::Blend;
use crate::Color;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Knobs for a single render. Every field has a default, so a JSON file only
/// needs the values it changes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    /// Primary rays per pixel
    pub samples_per_pixel: u32,
    /// Randomize where inside the pixel each primary ray passes
    pub jitter: bool,
    /// Mirror/glass bounces before derived rays stop being cast
    pub max_depth: u32,
    /// Worker threads; 0 uses every core
    pub threads: usize,
    /// Perturbed shadow rays per light, on top of the exact one
    pub shadow_differentials: u32,
    /// Perturbation radius as a percentage of the shadow ray length
    pub differential_spread_percent: f64,
    pub traversal: Traversal,
    pub blend: Blend,
    /// Color of primary rays that hit nothing
    pub background: Color,
    /// How long the drain loop waits on a pixel before moving on
    pub poll_interval_ms: u64,
    /// How long the render may go without progress before it is abandoned
    pub stall_timeout_ms: u64,
    /// Seed for jitter and shadow differentials; entropy when unset
    pub seed: Option<u64>,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            samples_per_pixel: 1,
            jitter: false,
            max_depth: 8,
            threads: 0,
            shadow_differentials: 15,
            differential_spread_percent: 3.0,
            traversal: Traversal::Nearest,
            blend: Blend::Pairwise,
            background: Color::BLACK,
            poll_interval_ms: 50,
            stall_timeout_ms: 30_000,
            seed: None,
        }
    }
}

impl RenderConfig {
    /// Read a JSON config file. Missing fields keep their defaults.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json(&text)
    }

    pub fn from_json(text: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn with_samples_per_pixel(mut self, samples: u32) -> Self {
        self.samples_per_pixel = samples;
        self
    }

    pub fn with_jitter(mut self, jitter: bool) -> Self {
        self.jitter = jitter;
        self
    }

    pub fn with_max_depth(mut self, depth: u32) -> Self {
        self.max_depth = depth;
        self
    }

    pub fn with_threads(mut self, threads: usize) -> Self {
        self.threads = threads;
        self
    }

    pub fn with_shadow_differentials(mut self, count: u32) -> Self {
        self.shadow_differentials = count;
        self
    }

    pub fn with_traversal(mut self, traversal: Traversal) -> Self {
        self.traversal = traversal;
        self
    }

    pub fn with_blend(mut self, blend: Blend) -> Self {
        self.blend = blend;
        self
    }

    pub fn with_background(mut self, color: Color) -> Self {
        self.background = color;
        self
    }

    pub fn with_stall_timeout(mut self, timeout: Duration) -> Self {
        self.stall_timeout_ms = timeout.as_millis() as u64;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn stall_timeout(&self) -> Duration {
        Duration::from_millis(self.stall_timeout_ms)
    }

    pub fn validate(&self) -> Result<()> {
        if self.samples_per_pixel == 0 {
            return Err(RenderError::InvalidConfig(
                "samples_per_pixel must be at least 1".to_string(),
            ));
        }
        if !(self.differential_spread_percent.is_finite() && self.differential_spread_percent >= 0.0)
        {
            return Err(RenderError::InvalidConfig(format!(
                "differential_spread_percent must be a non-negative number, got {}",
                self.differential_spread_percent
            )));
        }
        if self.poll_interval_ms == 0 {
            return Err(RenderError::InvalidConfig(
                "poll_interval_ms must be positive".to_string(),
            ));
        }
        if self.stall_timeout_ms < self.poll_interval_ms {
            return Err(RenderError::InvalidConfig(format!(
                "stall_timeout_ms ({}) must not be shorter than poll_interval_ms ({})",
                self.stall_timeout_ms, self.poll_interval_ms
            )));
        }
        Ok(())
    }
}
