//! Snapping heights to printable layers.

use crate::grid::Grid;

/// Remainders at or below this are already on a layer boundary (mm).
pub const LAYER_TOLERANCE: f64 = 1e-4;

/// Round `height` to the nearest multiple of `layer_height`.
///
/// Exact halves round up. A non-positive layer height leaves the value as is.
pub fn nearest_layer_height(height: f64, layer_height: f64) -> f64 {
    if layer_height <= 0.0 {
        return height;
    }

    let remainder = height.rem_euclid(layer_height);
    if remainder <= LAYER_TOLERANCE {
        return height;
    }

    let to_next = layer_height - remainder;
    if to_next <= remainder {
        height + to_next
    } else {
        height - remainder
    }
}

/// Snap every sample of the grid to the layer height. Zero disables snapping.
pub fn quantize_layers(grid: Grid, layer_height: f64) -> Grid {
    if layer_height <= 0.0 {
        return grid;
    }
    grid.map_heights(|h| nearest_layer_height(h, layer_height))
}
