//! Persisted form of an extracted heightfield.
//!
//! Saving the image bytes alongside the computed grid lets a document be
//! reopened without the original file and without recomputing the grid.

use std::io::Cursor;

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use image::{ImageFormat, RgbaImage};
use serde::{Deserialize, Serialize};

use crate::error::{HeightfieldError, Result};
use crate::extract::decode_image;
use crate::grid::Grid;

/// Serialized heightfield state, stored as camelCase JSON.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HeightfieldState {
    /// Source image re-encoded as PNG, then base64.
    pub source_image_bytes_base64: String,
    /// Path the image was last loaded from.
    pub last_image_path: String,
    /// Rows of `[x, y, height]` tuples, bottom row first.
    pub computed_grid: Vec<Vec<[f64; 3]>>,
    /// Tallest height seen during extraction (mm).
    pub max_height_observed: f64,
}

impl HeightfieldState {
    /// Capture an image and its computed grid.
    pub fn capture(
        image: &RgbaImage,
        last_image_path: impl Into<String>,
        grid: &Grid,
        max_height_observed: f64,
    ) -> Result<Self> {
        let mut png = Cursor::new(Vec::new());
        image
            .write_to(&mut png, ImageFormat::Png)
            .map_err(HeightfieldError::ImageEncode)?;

        Ok(Self {
            source_image_bytes_base64: STANDARD.encode(png.into_inner()),
            last_image_path: last_image_path.into(),
            computed_grid: grid.to_tuples(),
            max_height_observed,
        })
    }

    /// Decode the stored image.
    pub fn image(&self) -> Result<RgbaImage> {
        let bytes = STANDARD.decode(&self.source_image_bytes_base64)?;
        decode_image(&bytes)
    }

    /// Rebuild the stored grid.
    pub fn grid(&self) -> Result<Grid> {
        Grid::from_tuples(&self.computed_grid)
    }

    /// Serialize to JSON.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Parse from JSON.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::Sample;
    use image::Rgba;

    fn sample_state() -> (RgbaImage, Grid, HeightfieldState) {
        let mut image = RgbaImage::from_pixel(4, 3, Rgba([255, 255, 255, 255]));
        image.put_pixel(1, 2, Rgba([10, 20, 30, 255]));
        image.put_pixel(3, 0, Rgba([0, 0, 0, 40]));

        let grid = Grid::from_rows(vec![
            vec![Sample::new(0.0, 0.0, 0.5), Sample::new(1.0, 0.0, 3.0)],
            vec![Sample::new(0.0, 1.0, 1.2), Sample::new(1.0, 1.0, 0.8)],
        ])
        .unwrap();

        let state = HeightfieldState::capture(&image, "photos/cat.png", &grid, 3.0).unwrap();
        (image, grid, state)
    }

    #[test]
    fn test_json_uses_camel_case_keys() {
        let (_, _, state) = sample_state();
        let json = state.to_json().unwrap();

        for key in [
            "sourceImageBytesBase64",
            "lastImagePath",
            "computedGrid",
            "maxHeightObserved",
        ] {
            assert!(json.contains(key), "missing {key} in {json}");
        }
    }

    #[test]
    fn test_restore_image_and_grid() {
        let (image, grid, state) = sample_state();
        let restored = HeightfieldState::from_json(&state.to_json().unwrap()).unwrap();

        assert_eq!(restored.last_image_path, "photos/cat.png");
        assert_eq!(restored.max_height_observed, 3.0);
        assert_eq!(restored.grid().unwrap(), grid);
        // PNG is lossless, alpha included
        assert_eq!(restored.image().unwrap(), image);
    }

    #[test]
    fn test_invalid_base64_is_reported() {
        let (_, _, mut state) = sample_state();
        state.source_image_bytes_base64 = "***".into();
        assert!(matches!(state.image(), Err(HeightfieldError::Base64(_))));
    }

    #[test]
    fn test_ragged_stored_grid_is_reported() {
        let (_, _, mut state) = sample_state();
        state.computed_grid[1].pop();
        assert!(matches!(
            state.grid(),
            Err(HeightfieldError::RaggedGrid { .. })
        ));
    }
}
