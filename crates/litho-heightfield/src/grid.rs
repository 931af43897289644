//! Sample grid produced by the extractor.

use serde::{Deserialize, Serialize};

use crate::error::{HeightfieldError, Result};

/// A single heightfield sample in millimeters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    /// Physical x position (column axis).
    pub x: f64,
    /// Physical y position (row axis).
    pub y: f64,
    /// Height above the print bed.
    pub height: f64,
}

impl Sample {
    /// Create a sample.
    pub fn new(x: f64, y: f64, height: f64) -> Self {
        Self { x, y, height }
    }

    /// The same sample with a different height.
    pub fn with_height(self, height: f64) -> Self {
        Self { height, ..self }
    }
}

/// Rows of samples, bottom row (smallest y) first.
///
/// All rows have the same number of samples.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Grid {
    rows: Vec<Vec<Sample>>,
}

impl Grid {
    /// Build a grid from rows, rejecting rows of unequal length.
    pub fn from_rows(rows: Vec<Vec<Sample>>) -> Result<Self> {
        if let Some(first) = rows.first() {
            let expected = first.len();
            if let Some((row, found)) = rows
                .iter()
                .map(Vec::len)
                .enumerate()
                .find(|&(_, len)| len != expected)
            {
                return Err(HeightfieldError::RaggedGrid {
                    row,
                    expected,
                    found,
                });
            }
        }
        Ok(Self { rows })
    }

    /// Build a grid from rows already known to be rectangular.
    pub(crate) fn from_rows_unchecked(rows: Vec<Vec<Sample>>) -> Self {
        debug_assert!(rows.windows(2).all(|w| w[0].len() == w[1].len()));
        Self { rows }
    }

    /// Build a grid from `[x, y, height]` tuples, as stored in persisted state.
    pub fn from_tuples(rows: &[Vec<[f64; 3]>]) -> Result<Self> {
        Self::from_rows(
            rows.iter()
                .map(|row| row.iter().map(|&[x, y, h]| Sample::new(x, y, h)).collect())
                .collect(),
        )
    }

    /// Convert to `[x, y, height]` tuples.
    pub fn to_tuples(&self) -> Vec<Vec<[f64; 3]>> {
        self.rows
            .iter()
            .map(|row| row.iter().map(|s| [s.x, s.y, s.height]).collect())
            .collect()
    }

    /// All rows, bottom first.
    pub fn rows(&self) -> &[Vec<Sample>] {
        &self.rows
    }

    /// Consume the grid and return its rows.
    pub fn into_rows(self) -> Vec<Vec<Sample>> {
        self.rows
    }

    /// Number of rows.
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Number of samples per row.
    pub fn column_count(&self) -> usize {
        self.rows.first().map_or(0, Vec::len)
    }

    /// True if the grid holds no samples.
    pub fn is_empty(&self) -> bool {
        self.row_count() == 0 || self.column_count() == 0
    }

    /// Sample at `(row, column)`.
    pub fn get(&self, row: usize, column: usize) -> Option<&Sample> {
        self.rows.get(row).and_then(|r| r.get(column))
    }

    /// Iterate all samples row by row.
    pub fn samples(&self) -> impl Iterator<Item = &Sample> + '_ {
        self.rows.iter().flatten()
    }

    /// Apply `f` to every sample's height, keeping the shape.
    pub fn map_heights(self, mut f: impl FnMut(f64) -> f64) -> Self {
        Self {
            rows: self
                .rows
                .into_iter()
                .map(|row| row.into_iter().map(|s| s.with_height(f(s.height))).collect())
                .collect(),
        }
    }

    /// Largest sample height, or `None` for an empty grid.
    pub fn max_height(&self) -> Option<f64> {
        self.samples().map(|s| s.height).reduce(f64::max)
    }

    /// Smallest sample height, or `None` for an empty grid.
    pub fn min_height(&self) -> Option<f64> {
        self.samples().map(|s| s.height).reduce(f64::min)
    }

    /// Distance between neighbouring columns (mm).
    pub fn column_spacing(&self) -> f64 {
        match self.rows.first() {
            Some(row) if row.len() > 1 => row[1].x - row[0].x,
            _ => 0.0,
        }
    }

    /// Distance between neighbouring rows (mm).
    pub fn row_spacing(&self) -> f64 {
        match (self.rows.first(), self.rows.get(1)) {
            (Some(a), Some(b)) if !a.is_empty() && !b.is_empty() => b[0].y - a[0].y,
            _ => 0.0,
        }
    }

    /// Physical extent along x: one spacing per column (mm).
    pub fn length(&self) -> f64 {
        self.column_count() as f64 * self.column_spacing()
    }

    /// Physical extent along y: one spacing per row (mm).
    pub fn width(&self) -> f64 {
        self.row_count() as f64 * self.row_spacing()
    }
}
