//! Scaling a lithophane by changing the image resolution.
//!
//! A lower ppi means bigger pixels, so the scale factor divides the ppi.

use log::info;

use crate::error::{LithoError, Result};
use crate::lithophane_image::LithophaneImage;

/// Desired size along one axis (mm). The other axis follows.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ScaleTarget {
    /// Extent along x.
    Length(f64),
    /// Extent along y.
    Width(f64),
}

impl ScaleTarget {
    fn value(self) -> f64 {
        match self {
            ScaleTarget::Length(v) | ScaleTarget::Width(v) => v,
        }
    }
}

/// Ppi that turns an extent of `current` into `target`.
pub fn scaled_ppi(ppi: f64, current: f64, target: f64) -> Result<f64> {
    if !(current > 0.0 && current.is_finite()) {
        return Err(LithoError::InvalidSetting(format!(
            "cannot scale from a size of {current}"
        )));
    }
    if !(target > 0.0 && target.is_finite()) {
        return Err(LithoError::InvalidSetting(format!(
            "scale target must be positive, got {target}"
        )));
    }
    Ok(ppi / (target / current))
}

/// Ppi at which `image` reaches `target`.
pub fn ppi_for(image: &LithophaneImage, target: ScaleTarget) -> Result<f64> {
    let current = match target {
        ScaleTarget::Length(_) => image.length(),
        ScaleTarget::Width(_) => image.width(),
    }
    .ok_or_else(|| LithoError::NotComputed(image.name().to_string()))?;

    scaled_ppi(image.settings().ppi, current, target.value())
}

/// Change the ppi of `image` so it reaches `target`, then recompute it.
/// Returns the new ppi.
pub fn scale_image(image: &mut LithophaneImage, target: ScaleTarget) -> Result<f64> {
    let ppi = ppi_for(image, target)?;
    info!(
        "{}: scaling from {} ppi to {:.3} ppi",
        image.name(),
        image.settings().ppi,
        ppi
    );
    image.set_ppi(ppi);
    image.recompute()?;
    Ok(ppi)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use image::{Rgba, RgbaImage};
    use litho_heightfield::HeightfieldSettings;

    #[test]
    fn test_scaled_ppi() {
        assert_relative_eq!(scaled_ppi(300.0, 50.0, 100.0).unwrap(), 150.0);
        assert_relative_eq!(scaled_ppi(300.0, 50.0, 25.0).unwrap(), 600.0);
        assert!(scaled_ppi(300.0, 0.0, 10.0).is_err());
        assert!(scaled_ppi(300.0, 10.0, -1.0).is_err());
    }

    #[test]
    fn test_scale_image_to_length() {
        let settings = HeightfieldSettings {
            ppi: 25.4,
            nozzle_size: 0.0,
            layer_height: 0.0,
            ..Default::default()
        };
        let raster = RgbaImage::from_pixel(20, 10, Rgba([128, 128, 128, 255]));
        let mut image = LithophaneImage::from_image("panel", raster, settings).unwrap();
        assert_relative_eq!(image.length().unwrap(), 20.0, epsilon = 1e-9);
        assert_relative_eq!(image.width().unwrap(), 10.0, epsilon = 1e-9);

        let ppi = scale_image(&mut image, ScaleTarget::Length(40.0)).unwrap();
        assert_relative_eq!(ppi, 12.7, epsilon = 1e-9);
        assert_relative_eq!(image.length().unwrap(), 40.0, epsilon = 1e-9);
        assert_relative_eq!(image.width().unwrap(), 20.0, epsilon = 1e-9);
    }

    #[test]
    fn test_uncomputed_image_cannot_scale() {
        let image = LithophaneImage::new("missing.png", HeightfieldSettings::default());
        assert!(matches!(
            ppi_for(&image, ScaleTarget::Width(10.0)),
            Err(LithoError::NotComputed(_))
        ));
    }
}
