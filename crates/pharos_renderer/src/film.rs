//! Film: the per-pixel accumulation buffer shared by all pixel tasks.
//!
//! Each cell is a single `AtomicU64` holding the current color in the low 24
//! bits and the number of merged samples in the high 32 bits (0 = empty).
//! Samples are merged with a compare-and-swap loop, so pixel tasks never take
//! a lock and arrive in any order.

use crate::error::{RenderError, Result};
use crate::{Color, PixelCoord};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

/// How a new sample is folded into a cell that already holds a color.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Blend {
    /// `(current + new) / 2`. Later samples weigh more than earlier ones, so
    /// the result depends on arrival order.
    #[default]
    Pairwise,
    /// Running mean over every sample merged so far.
    Cumulative,
}

impl Blend {
    fn merge(self, current: Color, count: u32, sample: Color) -> Color {
        match self {
            Blend::Pairwise => current.average(sample),
            Blend::Cumulative => {
                let n = count as u64;
                let mix = |old: u8, new: u8| {
                    let total = old as u64 * n + new as u64;
                    ((total + (n + 1) / 2) / (n + 1)) as u8
                };
                Color::new(
                    mix(current.r, sample.r),
                    mix(current.g, sample.g),
                    mix(current.b, sample.b),
                )
            }
        }
    }
}

/// The colors one pixel task produced for its pixel.
#[derive(Debug, Clone, PartialEq)]
pub struct DevelopedPixel {
    pub pixel: PixelCoord,
    pub colors: Vec<Color>,
}

const COLOR_MASK: u64 = 0x00FF_FFFF;

#[derive(Debug, Default)]
struct PixelCell(AtomicU64);

impl PixelCell {
    fn unpack(bits: u64) -> Option<(Color, u32)> {
        let count = (bits >> 32) as u32;
        (count > 0).then(|| (Color::from_packed((bits & COLOR_MASK) as u32), count))
    }

    fn pack(color: Color, count: u32) -> u64 {
        (count as u64) << 32 | color.to_packed() as u64
    }

    fn load(&self) -> Option<(Color, u32)> {
        Self::unpack(self.0.load(Ordering::Acquire))
    }

    /// Fold `sample` in. Returns true when this was the cell's first sample.
    fn merge(&self, sample: Color, blend: Blend) -> bool {
        let mut first = false;
        // The closure never returns None, so the update cannot fail
        let _ = self
            .0
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |bits| {
                Some(match Self::unpack(bits) {
                    None => {
                        first = true;
                        Self::pack(sample, 1)
                    }
                    Some((current, count)) => {
                        first = false;
                        Self::pack(blend.merge(current, count, sample), count.saturating_add(1))
                    }
                })
            });
        first
    }
}

/// A width x height grid of pixel cells, row-major.
#[derive(Debug)]
pub struct Film {
    width: u32,
    height: u32,
    blend: Blend,
    cells: Vec<PixelCell>,
    filled: AtomicUsize,
}

impl Film {
    pub fn new(width: u32, height: u32, blend: Blend) -> Self {
        let cells = (0..width as usize * height as usize)
            .map(|_| PixelCell::default())
            .collect();
        Self {
            width,
            height,
            blend,
            cells,
            filled: AtomicUsize::new(0),
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn blend(&self) -> Blend {
        self.blend
    }

    fn index(&self, row: u32, col: u32) -> Result<usize> {
        if row >= self.height || col >= self.width {
            return Err(RenderError::PixelOutOfRange {
                row,
                col,
                width: self.width,
                height: self.height,
            });
        }
        Ok(row as usize * self.width as usize + col as usize)
    }

    /// Merge one color into pixel `(row, col)`.
    pub fn put(&self, row: u32, col: u32, color: Color) -> Result<()> {
        let index = self.index(row, col)?;
        if self.cells[index].merge(color, self.blend) {
            self.filled.fetch_add(1, Ordering::AcqRel);
        }
        Ok(())
    }

    /// Record a pixel task's result: its samples are averaged into a single
    /// color, which is then merged into the cell.
    pub fn capture(&self, developed: &DevelopedPixel) -> Result<()> {
        let PixelCoord { row, col } = developed.pixel;
        match Color::mean(&developed.colors) {
            Some(color) => self.put(row, col, color),
            None => {
                log::warn!("Pixel ({row}, {col}) developed without any samples");
                self.index(row, col).map(|_| ())
            }
        }
    }

    /// The current color of a pixel, `None` while it has no samples.
    pub fn get(&self, row: u32, col: u32) -> Result<Option<Color>> {
        let index = self.index(row, col)?;
        Ok(self.cells[index].load().map(|(color, _)| color))
    }

    /// How many samples have been merged into a pixel.
    pub fn sample_count(&self, row: u32, col: u32) -> Result<u32> {
        let index = self.index(row, col)?;
        Ok(self.cells[index].load().map_or(0, |(_, count)| count))
    }

    /// Pixels that still have no color.
    pub fn missing_pixels(&self) -> usize {
        self.cells.len() - self.filled.load(Ordering::Acquire)
    }

    /// True once every pixel holds a color.
    pub fn ready_to_develop(&self) -> bool {
        self.missing_pixels() == 0
    }

    /// Every pixel's color, row-major.
    pub fn pixels(&self) -> impl Iterator<Item = Option<Color>> + '_ {
        self.cells.iter().map(|cell| cell.load().map(|(color, _)| color))
    }
}
