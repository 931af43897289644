//! Pixel grid to physical heightfield.
//!
//! Lighter pixels produce lower heights because more light has to pass
//! through them. Pixels with transparency use their alpha value directly.

use std::path::Path;

use image::{DynamicImage, GenericImageView, RgbaImage};
use log::debug;

use crate::error::{HeightfieldError, Result};
use crate::grid::{Grid, Sample};
use crate::{Heightfield, HeightfieldSettings};

/// Millimeters per inch.
const MM_PER_INCH: f64 = 25.4;

/// Read access to a decoded raster.
pub trait PixelSource {
    /// `(width, height)` in pixels.
    fn dimensions(&self) -> (u32, u32);

    /// RGBA value at `(x, y)`, with `(0, 0)` at the top-left corner.
    fn rgba(&self, x: u32, y: u32) -> [u8; 4];
}

impl PixelSource for RgbaImage {
    fn dimensions(&self) -> (u32, u32) {
        (self.width(), self.height())
    }

    fn rgba(&self, x: u32, y: u32) -> [u8; 4] {
        self.get_pixel(x, y).0
    }
}

impl PixelSource for DynamicImage {
    fn dimensions(&self) -> (u32, u32) {
        GenericImageView::dimensions(self)
    }

    fn rgba(&self, x: u32, y: u32) -> [u8; 4] {
        self.get_pixel(x, y).0
    }
}

/// Decode an encoded image (PNG, JPEG, BMP) into an RGBA raster.
pub fn decode_image(bytes: &[u8]) -> Result<RgbaImage> {
    image::load_from_memory(bytes)
        .map(|image| image.to_rgba8())
        .map_err(HeightfieldError::ImageDecode)
}

/// Read and decode an image file.
pub fn load_image(path: impl AsRef<Path>) -> Result<RgbaImage> {
    let bytes = std::fs::read(path.as_ref())?;
    decode_image(&bytes)
}

/// Size of one pixel in millimeters.
pub fn mm_per_pixel(ppi: f64) -> f64 {
    MM_PER_INCH / ppi
}

/// HSL lightness: mean of the largest and smallest channel, rounded down.
pub fn lightness(r: u8, g: u8, b: u8) -> u8 {
    let max = r.max(g).max(b) as u16;
    let min = r.min(g).min(b) as u16;
    ((max + min) / 2) as u8
}

/// Height of a single pixel between `base_height` and `max_height`.
pub fn pixel_height([r, g, b, a]: [u8; 4], base_height: f64, max_height: f64) -> f64 {
    let percentage = if a < u8::MAX {
        (100.0 / 254.0) * a as f64
    } else {
        (100.0 / 255.0) * (255 - lightness(r, g, b)) as f64
    };

    base_height + (max_height - base_height) * percentage / 100.0
}

/// Convert every pixel into a sample.
///
/// Image row 0 is the top of the picture, grid row 0 is the bottom, so rows
/// are visited in reverse.
pub fn extract<P: PixelSource>(image: &P, settings: &HeightfieldSettings) -> Result<Heightfield> {
    settings.validate()?;

    let (width, height) = image.dimensions();
    if width == 0 || height == 0 {
        return Err(HeightfieldError::EmptyGrid);
    }

    let pixel_size = mm_per_pixel(settings.ppi);
    let mut max_height = 0.0f64;
    let mut rows = Vec::with_capacity(height as usize);

    for image_row in (0..height).rev() {
        let y = (height - (image_row + 1)) as f64 * pixel_size;
        let mut row = Vec::with_capacity(width as usize);

        for column in 0..width {
            let h = pixel_height(
                image.rgba(column, image_row),
                settings.base_height,
                settings.max_height,
            );
            max_height = max_height.max(h);
            row.push(Sample::new(column as f64 * pixel_size, y, h));
        }

        rows.push(row);
    }

    debug!(
        "extracted {}x{} samples, pixel size {:.4}mm, max height {:.3}mm",
        width, height, pixel_size, max_height
    );

    Ok(Heightfield {
        grid: Grid::from_rows(rows)?,
        max_height,
    })
}
