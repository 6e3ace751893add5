//! Error type shared by scene construction, shading and the task pool.

use thiserror::Error;

/// Everything that can go wrong while building or rendering a scene.
#[derive(Error, Debug)]
pub enum RenderError {
    #[error("Invalid geometry: {0}")]
    InvalidGeometry(String),

    #[error("Scene has no bodies")]
    EmptyScene,

    #[error("Invalid render configuration: {0}")]
    InvalidConfig(String),

    /// Only BVH branches carry the null material; reaching it means the
    /// hierarchy handed out a branch as if it were a body.
    #[error("Null material cannot be shaded")]
    NullMaterial,

    #[error("Pixel ({row}, {col}) is outside the {width}x{height} film")]
    PixelOutOfRange {
        row: u32,
        col: u32,
        width: u32,
        height: u32,
    },

    #[error("Primary ray has no pixel coordinate")]
    MissingPixel,

    #[error("Render task panicked: {0}")]
    TaskPanicked(String),

    #[error("Render stalled with {outstanding} outstanding tasks and {missing} undeveloped pixels")]
    Stalled { outstanding: usize, missing: usize },

    #[error("Film is not ready to develop: {missing} pixels have no samples")]
    FilmNotReady { missing: usize },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Config parse error: {0}")]
    Config(#[from] serde_json::Error),
}

/// Result alias used throughout the renderer.
pub type Result<T> = std::result::Result<T, RenderError>;

/// Fail fast on NaN coordinates handed to a constructor.
pub(crate) fn ensure_finite(what: &str, v: pharos_math::Vec3) -> Result<()> {
    if pharos_math::has_nan(v) {
        return Err(RenderError::InvalidGeometry(format!(
            "{what} has a NaN coordinate"
        )));
    }
    if !v.is_finite() {
        return Err(RenderError::InvalidGeometry(format!(
            "{what} has an infinite coordinate: {v}"
        )));
    }
    Ok(())
}
