//! Error types for heightfield extraction.

use thiserror::Error;

/// Errors that can occur while building or restoring a heightfield.
#[derive(Error, Debug)]
pub enum HeightfieldError {
    /// The raster could not be decoded.
    #[error("cannot decode image: {0}")]
    ImageDecode(image::ImageError),

    /// The raster could not be re-encoded for persistence.
    #[error("cannot encode image: {0}")]
    ImageEncode(image::ImageError),

    /// Invalid extraction settings.
    #[error("invalid settings: {0}")]
    InvalidSettings(String),

    /// Rows of a grid have different lengths.
    #[error("grid row {row} has {found} samples, expected {expected}")]
    RaggedGrid {
        /// Index of the offending row.
        row: usize,
        /// Sample count of the first row.
        expected: usize,
        /// Sample count of the offending row.
        found: usize,
    },

    /// The image or grid has no samples.
    #[error("grid is empty")]
    EmptyGrid,

    /// Reading the source image failed.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Persisted state could not be (de)serialized.
    #[error("state serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Persisted image bytes are not valid base64.
    #[error("invalid base64 image data: {0}")]
    Base64(#[from] base64::DecodeError),
}

/// Result type for heightfield operations.
pub type Result<T> = std::result::Result<T, HeightfieldError>;
