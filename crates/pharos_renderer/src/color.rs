//! 8-bit RGB color.
//!
//! Colors are stored the way they are written out: one byte per channel.
//! Shading math happens in `[0, 1]` floats and is converted back with
//! [`Color::from_unit`].

use serde::{Deserialize, Serialize};
use std::fmt;

/// Scale applied by [`Color::darker`] and undone by [`Color::brighter`].
const SHADE_FACTOR: f64 = 0.7;

/// Smallest non-zero channel value `brighter` produces.
const MIN_BRIGHT: u8 = (1.0 / (1.0 - SHADE_FACTOR)) as u8;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Color {
    pub const BLACK: Color = Color::new(0, 0, 0);
    pub const WHITE: Color = Color::new(255, 255, 255);
    pub const RED: Color = Color::new(255, 0, 0);
    pub const GREEN: Color = Color::new(0, 255, 0);
    pub const BLUE: Color = Color::new(0, 0, 255);
    pub const YELLOW: Color = Color::new(255, 255, 0);
    pub const DARK_GRAY: Color = Color::new(64, 64, 64);

    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Build a color from unit-range channels. Values are clamped to `[0, 1]`.
    pub fn from_unit(r: f64, g: f64, b: f64) -> Self {
        let to_byte = |c: f64| {
            if c.is_nan() {
                0
            } else {
                (c.clamp(0.0, 1.0) * 255.0 + 0.5) as u8
            }
        };
        Self::new(to_byte(r), to_byte(g), to_byte(b))
    }

    /// Channels scaled to `[0, 1]`.
    pub fn to_unit(self) -> [f64; 3] {
        [
            self.r as f64 / 255.0,
            self.g as f64 / 255.0,
            self.b as f64 / 255.0,
        ]
    }

    /// Every channel multiplied by a factor (clamped to the byte range).
    pub fn scale(self, factor: f64) -> Self {
        let [r, g, b] = self.to_unit();
        Self::from_unit(r * factor, g * factor, b * factor)
    }

    /// A darker version of this color: each channel scaled by 0.7, truncated.
    pub fn darker(self) -> Self {
        let darken = |c: u8| (c as f64 * SHADE_FACTOR) as u8;
        Self::new(darken(self.r), darken(self.g), darken(self.b))
    }

    /// A brighter version of this color.
    ///
    /// Pure black turns into a very dark gray instead of staying black, and
    /// small non-zero channels are lifted to the minimum brightness first.
    pub fn brighter(self) -> Self {
        if self == Color::BLACK {
            return Color::new(MIN_BRIGHT, MIN_BRIGHT, MIN_BRIGHT);
        }
        let brighten = |c: u8| {
            let c = if c > 0 && c < MIN_BRIGHT { MIN_BRIGHT } else { c };
            (c as f64 / SHADE_FACTOR).min(255.0) as u8
        };
        Self::new(brighten(self.r), brighten(self.g), brighten(self.b))
    }

    /// Pairwise channel mean, truncating.
    pub fn average(self, other: Color) -> Self {
        let avg = |a: u8, b: u8| ((a as u16 + b as u16) / 2) as u8;
        Self::new(avg(self.r, other.r), avg(self.g, other.g), avg(self.b, other.b))
    }

    /// Arithmetic mean of all samples, rounded. `None` for an empty slice.
    pub fn mean(samples: &[Color]) -> Option<Color> {
        if samples.is_empty() {
            return None;
        }
        let n = samples.len() as u64;
        let (r, g, b) = samples.iter().fold((0u64, 0u64, 0u64), |(r, g, b), c| {
            (r + c.r as u64, g + c.g as u64, b + c.b as u64)
        });
        let round = |sum: u64| ((sum + n / 2) / n) as u8;
        Some(Color::new(round(r), round(g), round(b)))
    }

    /// `0x00RRGGBB`.
    pub fn to_packed(self) -> u32 {
        (self.r as u32) << 16 | (self.g as u32) << 8 | self.b as u32
    }

    pub fn from_packed(packed: u32) -> Self {
        Self::new((packed >> 16) as u8, (packed >> 8) as u8, packed as u8)
    }
}

/// Formats as a plain PPM triple: `R G B`.
impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.r, self.g, self.b)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_unit_rounds_and_clamps() {
        assert_eq!(Color::from_unit(1.0, 0.5, 0.0), Color::new(255, 128, 0));
        assert_eq!(Color::from_unit(2.0, -1.0, f64::NAN), Color::new(255, 0, 0));
    }

    #[test]
    fn test_darker() {
        assert_eq!(Color::WHITE.darker(), Color::new(178, 178, 178));
        assert_eq!(Color::new(10, 1, 0).darker(), Color::new(7, 0, 0));
    }

    #[test]
    fn test_brighter() {
        assert_eq!(Color::BLACK.brighter(), Color::new(3, 3, 3));
        // Channels below the minimum are lifted before scaling
        assert_eq!(Color::new(1, 0, 200).brighter(), Color::new(4, 0, 255));
    }

    #[test]
    fn test_average_is_pairwise() {
        let c = Color::new(100, 0, 255).average(Color::new(0, 101, 255));
        assert_eq!(c, Color::new(50, 50, 255));
    }

    #[test]
    fn test_mean() {
        let samples = [Color::new(0, 0, 0), Color::new(10, 20, 30), Color::new(20, 40, 60)];
        assert_eq!(Color::mean(&samples), Some(Color::new(10, 20, 30)));
        assert_eq!(Color::mean(&[]), None);
    }

    #[test]
    fn test_packed() {
        let c = Color::new(1, 2, 3);
        assert_eq!(c.to_packed(), 0x010203);
        assert_eq!(Color::from_packed(c.to_packed()), c);
    }

    #[test]
    fn test_display() {
        assert_eq!(Color::new(1, 22, 255).to_string(), "1 22 255");
    }
}
