#![warn(missing_docs)]

//! Heightfield extraction for lithophanes.
//!
//! Turns a decoded raster into a grid of physical-unit samples whose height
//! encodes pixel darkness, then post-processes the grid for a specific printer:
//! block averaging by nozzle size and snapping to the layer height.
//!
//! # Example
//!
//! ```ignore
//! use litho_heightfield::{decode_image, process, HeightfieldSettings};
//!
//! let image = decode_image(&std::fs::read("portrait.png")?)?;
//! let heightfield = process(&image, &HeightfieldSettings::default())?;
//!
//! println!("{} x {} samples", heightfield.grid.column_count(), heightfield.grid.row_count());
//! ```

pub mod error;
pub mod extract;
pub mod grid;
pub mod quantize;
pub mod resample;
pub mod state;

pub use error::{HeightfieldError, Result};
pub use extract::{decode_image, extract, lightness, load_image, mm_per_pixel, pixel_height, PixelSource};
pub use grid::{Grid, Sample};
pub use quantize::{nearest_layer_height, quantize_layers, LAYER_TOLERANCE};
pub use resample::{average_blocks, average_by_nozzle_size, block_size};
pub use state::HeightfieldState;

use serde::{Deserialize, Serialize};

/// Physical parameters for converting an image into a heightfield.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HeightfieldSettings {
    /// Pixels per inch of the source image.
    pub ppi: f64,
    /// Height used for white pixels (mm).
    pub base_height: f64,
    /// Height used for black pixels (mm).
    pub max_height: f64,
    /// Nozzle diameter of the printer (mm). Zero disables block averaging.
    pub nozzle_size: f64,
    /// Layer height of the printer (mm). Zero disables quantization.
    pub layer_height: f64,
}

impl Default for HeightfieldSettings {
    fn default() -> Self {
        Self {
            ppi: 300.0,
            base_height: 0.5,
            max_height: 3.0,
            nozzle_size: 0.4,
            layer_height: 0.1,
        }
    }
}

impl HeightfieldSettings {
    /// Validate settings.
    pub fn validate(&self) -> Result<()> {
        if self.ppi <= 0.0 || !self.ppi.is_finite() {
            return Err(HeightfieldError::InvalidSettings(
                "ppi must be positive".into(),
            ));
        }
        if self.base_height < 0.0 {
            return Err(HeightfieldError::InvalidSettings(
                "base_height must not be negative".into(),
            ));
        }
        if self.base_height >= self.max_height {
            return Err(HeightfieldError::InvalidSettings(
                "base_height must be lower than max_height".into(),
            ));
        }
        if self.nozzle_size < 0.0 {
            return Err(HeightfieldError::InvalidSettings(
                "nozzle_size must not be negative".into(),
            ));
        }
        if self.layer_height < 0.0 {
            return Err(HeightfieldError::InvalidSettings(
                "layer_height must not be negative".into(),
            ));
        }
        Ok(())
    }

    /// Physical distance between two neighbouring pixels (mm).
    pub fn pixel_size(&self) -> f64 {
        mm_per_pixel(self.ppi)
    }
}

/// An extracted grid together with the tallest height seen during extraction.
#[derive(Debug, Clone, PartialEq)]
pub struct Heightfield {
    /// The sample grid, bottom row first.
    pub grid: Grid,
    /// Maximum height across all extracted samples (mm), before resampling.
    pub max_height: f64,
}

/// Run the full chain: extract, average by nozzle size, quantize to layers.
pub fn process<P: PixelSource>(image: &P, settings: &HeightfieldSettings) -> Result<Heightfield> {
    let Heightfield { grid, max_height } = extract(image, settings)?;
    let grid = average_by_nozzle_size(grid, settings.ppi, settings.nozzle_size);
    let grid = quantize_layers(grid, settings.layer_height);

    Ok(Heightfield { grid, max_height })
}
