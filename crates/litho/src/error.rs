//! Errors for the lithophane facade.

use std::path::PathBuf;

use litho_booleans::BooleanError;
use litho_heightfield::HeightfieldError;
use litho_mesh::MeshError;
use litho_pipeline::PipelineError;
use thiserror::Error;

/// Errors from lithophane features.
#[derive(Error, Debug)]
pub enum LithoError {
    /// Image loading or heightfield processing failed.
    #[error(transparent)]
    Heightfield(#[from] HeightfieldError),

    /// Mesh construction or STL io failed.
    #[error(transparent)]
    Mesh(#[from] MeshError),

    /// A pipeline step failed.
    #[error(transparent)]
    Pipeline(#[from] PipelineError),

    /// Boolean composition failed.
    #[error(transparent)]
    Boolean(#[from] BooleanError),

    /// The config file is not valid TOML for [`crate::LithoConfig`].
    #[error("invalid config: {0}")]
    Config(#[from] toml::de::Error),

    /// The config could not be rendered as TOML.
    #[error("cannot write config: {0}")]
    ConfigWrite(#[from] toml::ser::Error),

    /// A setting has an unusable value.
    #[error("invalid setting: {0}")]
    InvalidSetting(String),

    /// The image has not been loaded yet.
    #[error("image '{0}' has not been computed")]
    NotComputed(String),

    /// Reading or writing a file failed.
    #[error("IO error at {path}: {source}")]
    Io {
        /// File involved.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },
}

impl LithoError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

/// Result type for lithophane operations.
pub type Result<T> = std::result::Result<T, LithoError>;
