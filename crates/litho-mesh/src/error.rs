//! Mesh errors.

use thiserror::Error;

/// Errors from mesh construction and STL io.
#[derive(Error, Debug)]
pub enum MeshError {
    /// The grid is too small to triangulate into the requested shape.
    #[error("grid of {rows}x{cols} samples is too small, need at least {min_rows}x{min_cols}")]
    GridTooSmall {
        /// Rows in the grid.
        rows: usize,
        /// Columns in the grid.
        cols: usize,
        /// Minimum rows required.
        min_rows: usize,
        /// Minimum columns required.
        min_cols: usize,
    },

    /// STL data could not be parsed.
    #[error("invalid STL: {0}")]
    InvalidStl(String),

    /// The mesh has no triangles.
    #[error("mesh has no triangles")]
    EmptyMesh,

    /// File io failed.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for mesh operations.
pub type Result<T> = std::result::Result<T, MeshError>;
