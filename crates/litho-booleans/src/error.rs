//! Boolean composition errors.

use std::path::PathBuf;

use litho_mesh::MeshError;
use thiserror::Error;

/// Errors from boolean composition.
#[derive(Error, Debug)]
pub enum BooleanError {
    /// The external engine could not be run, failed, timed out or produced
    /// no result.
    #[error("external boolean engine failed: {0}")]
    ExternalTool(String),

    /// The external backend was selected without an engine executable.
    #[error("no boolean engine executable configured")]
    EngineNotConfigured,

    /// The operation config is malformed or inconsistent.
    #[error("invalid boolean config: {0}")]
    Config(String),

    /// The composition was cancelled.
    #[error("boolean composition cancelled")]
    Cancelled,

    /// Operand or result mesh could not be read or written.
    #[error("mesh error: {0}")]
    Mesh(#[from] MeshError),

    /// Temporary files could not be created or written.
    #[error("IO error at {path}: {source}")]
    Io {
        /// File or directory involved.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },

    /// The operation config could not be encoded or decoded.
    #[error("config serialization failed: {0}")]
    Json(#[from] serde_json::Error),
}

impl From<litho_pipeline::Cancelled> for BooleanError {
    fn from(_: litho_pipeline::Cancelled) -> Self {
        Self::Cancelled
    }
}

impl BooleanError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

/// Result type for boolean operations.
pub type Result<T> = std::result::Result<T, BooleanError>;
