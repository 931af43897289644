//! Bounding-box dimensions of a mesh in a display unit.

use std::fmt;
use std::str::FromStr;

use litho_mesh::TriangleMesh;

use crate::error::LithoError;

/// Unit for displaying lengths.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LengthUnit {
    /// Millimetres.
    #[default]
    Millimeter,
    /// Centimetres.
    Centimeter,
    /// Metres.
    Meter,
    /// Inches.
    Inch,
}

impl LengthUnit {
    /// Short label, also the accepted input form.
    pub fn label(self) -> &'static str {
        match self {
            LengthUnit::Millimeter => "mm",
            LengthUnit::Centimeter => "cm",
            LengthUnit::Meter => "m",
            LengthUnit::Inch => "in",
        }
    }

    /// Multiplier from millimetres to this unit.
    pub fn factor(self) -> f64 {
        match self {
            LengthUnit::Millimeter => 1.0,
            LengthUnit::Centimeter => 0.1,
            LengthUnit::Meter => 0.001,
            LengthUnit::Inch => 1.0 / 25.4,
        }
    }

    /// Convert a length in millimetres.
    pub fn from_mm(self, value: f64) -> f64 {
        value * self.factor()
    }
}

impl FromStr for LengthUnit {
    type Err = LithoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "mm" => Ok(LengthUnit::Millimeter),
            "cm" => Ok(LengthUnit::Centimeter),
            "m" => Ok(LengthUnit::Meter),
            "in" | "inch" => Ok(LengthUnit::Inch),
            other => Err(LithoError::InvalidSetting(format!(
                "unknown length unit '{other}' (expected mm, cm, m or in)"
            ))),
        }
    }
}

impl fmt::Display for LengthUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// `value` in millimetres shown as `"<number> <unit>"` with `decimals` places.
pub fn format_length(value: f64, unit: LengthUnit, decimals: usize) -> String {
    format!("{:.*} {}", decimals, unit.from_mm(value), unit.label())
}

/// Extent of a mesh along each axis (mm).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Dimensions {
    /// Along x.
    pub length: f64,
    /// Along y.
    pub width: f64,
    /// Along z.
    pub height: f64,
}

impl Dimensions {
    /// Three-line summary in `unit`.
    pub fn message(&self, unit: LengthUnit, decimals: usize) -> String {
        format!(
            "Length (X): {}\n\nWidth (Y): {}\n\nHeight (Z): {}",
            format_length(self.length, unit, decimals),
            format_length(self.width, unit, decimals),
            format_length(self.height, unit, decimals),
        )
    }
}

/// Bounding-box dimensions, or `None` for an empty mesh.
pub fn measure(mesh: &TriangleMesh) -> Option<Dimensions> {
    if mesh.is_empty() {
        return None;
    }
    let bounds = mesh.bounds();
    Some(Dimensions {
        length: bounds.length(),
        width: bounds.width(),
        height: bounds.height(),
    })
}
