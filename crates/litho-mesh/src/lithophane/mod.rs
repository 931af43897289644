//! Lithophane shapes built from a heightfield grid.
//!
//! Each shape is assembled from separate parts (triangle soups) that are
//! merged with vertex welding and then oriented outward. The part functions
//! are public so callers can drive them as individual pipeline steps.

pub mod box_shape;
pub mod tube_shape;

pub use box_shape::build_box;
pub use tube_shape::{build_tube, TubeParameters};

use litho_heightfield::{Grid, Sample};

use crate::adjacency::harmonize_normals;
use crate::builder::MeshBuilder;
use crate::error::{MeshError, Result};
use crate::mesh::{Triangle, TriangleMesh};
use crate::Point3;

/// Reject grids with fewer than `min_rows` x `min_cols` samples.
pub fn check_grid(grid: &Grid, min_rows: usize, min_cols: usize) -> Result<()> {
    let (rows, cols) = (grid.row_count(), grid.column_count());
    if rows < min_rows || cols < min_cols {
        return Err(MeshError::GridTooSmall {
            rows,
            cols,
            min_rows,
            min_cols,
        });
    }
    Ok(())
}

/// Weld all parts into one indexed mesh.
pub fn merge_parts(parts: &[&[Triangle]], tolerance: f64) -> TriangleMesh {
    let mut builder = MeshBuilder::new(tolerance);
    for part in parts {
        builder.add_triangles(part);
    }
    builder.build()
}

/// Make windings consistent and outward.
pub fn optimize_mesh(mut mesh: TriangleMesh) -> TriangleMesh {
    harmonize_normals(&mut mesh);
    mesh
}

/// Sample position with its height as z.
pub(crate) fn surface_point(s: &Sample) -> Point3 {
    Point3::new(s.x, s.y, s.height)
}

/// Sample position projected onto the print bed.
pub(crate) fn ground_point(s: &Sample) -> Point3 {
    Point3::new(s.x, s.y, 0.0)
}
