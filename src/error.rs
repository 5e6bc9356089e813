use thiserror::Error;

/// Errors produced by the palette extraction engine.
///
/// A clustering run that stops at its iteration cap is not an error; see
/// [`crate::ConvergenceStatus`].
#[derive(Debug, Error)]
pub enum PaletteError {
    /// Cluster count, restart count or raster shape cannot be honoured.
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// Empty pixel data, wrong channel count or an out-of-range color component.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),
}

pub type Result<T> = std::result::Result<T, PaletteError>;
