#![warn(missing_docs)]

//! Lithophane generation.
//!
//! Ties the heightfield, mesh, pipeline and boolean crates together into the
//! features a user works with:
//!
//! - [`LithophaneImage`]: a source image and its computed grid
//! - [`BooleanMesh`]: a box or tube built from an image, with additive and
//!   subtractive features folded on top
//! - [`measure`] and [`scale`] helpers
//! - [`LithoConfig`]: `litho.toml` settings
//!
//! # Example
//!
//! ```ignore
//! use litho::{BooleanMesh, LithoConfig, LithophaneImage, ShapeKind};
//! use litho_pipeline::{CancellationToken, LogProgress};
//!
//! let config = LithoConfig::discover(None)?;
//! let image = LithophaneImage::open("portrait.png", config.lithophane.clone())?;
//!
//! let mut tube = BooleanMesh::new(ShapeKind::Tube)
//!     .with_image(image)
//!     .with_composer(config.booleans.composer()?);
//! tube.execute(LogProgress, &CancellationToken::new())?;
//! ```

pub mod boolean_mesh;
pub mod config;
pub mod error;
pub mod lithophane_image;
pub mod measure;
pub mod scale;
pub mod shapes;

pub use boolean_mesh::{BooleanMesh, ExecuteOutcome, UserNotice};
pub use config::{BooleanBackend, BooleanSettings, LithoConfig, CONFIG_FILE_NAME};
pub use error::{LithoError, Result};
pub use lithophane_image::LithophaneImage;
pub use measure::{format_length, measure, Dimensions, LengthUnit};
pub use scale::{ppi_for, scale_image, scaled_ppi, ScaleTarget};
pub use shapes::{
    box_pipeline, build_lithophane, build_shape, lithophane_pipeline, tube_pipeline, ShapeBuild,
    ShapeKind,
};
