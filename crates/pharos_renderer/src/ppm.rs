//! Plain (ASCII) PPM output.
//!
//! `P3`, a `width height` line, `255`, then one line per film row holding
//! that row's `R G B` triples, and a trailing blank line.

use crate::error::{RenderError, Result};
use crate::Film;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

const MAGIC: &str = "P3";
const MAX_CHANNEL: u8 = 255;

impl Film {
    /// Serialize the developed film. Fails if any pixel has no color yet.
    pub fn write_ppm<W: Write>(&self, writer: &mut W) -> Result<()> {
        let missing = self.missing_pixels();
        if missing > 0 {
            return Err(RenderError::FilmNotReady { missing });
        }

        writeln!(writer, "{MAGIC}")?;
        writeln!(writer, "{} {}", self.width(), self.height())?;
        writeln!(writer, "{MAX_CHANNEL}")?;

        let width = self.width() as usize;
        let mut pixels = self.pixels();
        for _ in 0..self.height() {
            let row: Vec<String> = pixels
                .by_ref()
                .take(width)
                .map(|pixel| pixel.map(|c| c.to_string()).unwrap_or_default())
                .collect();
            writeln!(writer, "{}", row.join(" "))?;
        }
        writeln!(writer)?;
        writer.flush()?;
        Ok(())
    }

    /// Write the film to `path` as a plain PPM file.
    pub fn save_ppm(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let mut writer = BufWriter::new(File::create(path)?);
        self.write_ppm(&mut writer)?;
        log::info!("Saved {}x{} image to {}", self.width(), self.height(), path.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::{Blend, Color, Film, RenderError};

    #[test]
    fn test_ppm_layout() {
        let film = Film::new(2, 2, Blend::Pairwise);
        film.put(0, 0, Color::RED).unwrap();
        film.put(0, 1, Color::GREEN).unwrap();
        film.put(1, 0, Color::BLUE).unwrap();
        film.put(1, 1, Color::new(1, 2, 3)).unwrap();

        let mut out = Vec::new();
        film.write_ppm(&mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert_eq!(
            text,
            "P3\n2 2\n255\n255 0 0 0 255 0\n0 0 255 1 2 3\n\n"
        );
    }

    #[test]
    fn test_incomplete_film_is_rejected() {
        let film = Film::new(2, 1, Blend::Pairwise);
        film.put(0, 0, Color::WHITE).unwrap();

        let mut out = Vec::new();
        assert!(matches!(
            film.write_ppm(&mut out),
            Err(RenderError::FilmNotReady { missing: 1 })
        ));
        assert!(out.is_empty());
    }
}
