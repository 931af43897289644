//! Cylindrical lithophane.
//!
//! Grid columns wrap around the cylinder and grid rows run up its axis. The
//! inner wall is a plain cylinder; the outer wall sits at `radius + height`.

use std::f64::consts::TAU;

use litho_heightfield::{Grid, Sample};
use log::debug;

use super::{check_grid, merge_parts, optimize_mesh};
use crate::builder::DEFAULT_WELD_TOLERANCE;
use crate::error::Result;
use crate::mesh::{Triangle, TriangleMesh};
use crate::Point3;

/// Ring geometry derived from a grid.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TubeParameters {
    /// Inner radius: the physical row length is the inner circumference (mm).
    pub radius: f64,
    /// Samples around the ring.
    pub points_per_line: usize,
    /// Angle between neighbouring columns (radians).
    pub angle_step: f64,
    /// Axial position of the first row (mm).
    pub bottom: f64,
    /// Axial position of the last row (mm).
    pub top: f64,
}

impl TubeParameters {
    /// Derive ring geometry from the grid.
    pub fn new(grid: &Grid) -> Self {
        let points_per_line = grid.column_count();
        let axial = |row: Option<&Vec<Sample>>| row.and_then(|r| r.first()).map_or(0.0, |s| s.y);
        Self {
            radius: grid.length() / TAU,
            points_per_line,
            angle_step: TAU / points_per_line.max(1) as f64,
            bottom: axial(grid.rows().first()),
            top: axial(grid.rows().last()),
        }
    }

    fn angle(&self, column: usize) -> f64 {
        self.angle_step * column as f64
    }

    fn next(&self, column: usize) -> usize {
        (column + 1) % self.points_per_line
    }

    fn inner(&self, column: usize, z: f64) -> Point3 {
        on_circle(self.radius, self.angle(column), z)
    }

    fn outer(&self, column: usize, sample: &Sample) -> Point3 {
        on_circle(self.radius + sample.height, self.angle(column), sample.y)
    }

    fn outer_at(&self, column: usize, sample: &Sample, z: f64) -> Point3 {
        on_circle(self.radius + sample.height, self.angle(column), z)
    }
}

fn on_circle(radius: f64, angle: f64, z: f64) -> Point3 {
    let (sin, cos) = angle.sin_cos();
    Point3::new(radius * cos, radius * sin, z)
}

/// Plain cylinder at the inner radius, facing the axis.
pub fn inner_tube(params: &TubeParameters) -> Vec<Triangle> {
    (0..params.points_per_line)
        .flat_map(|c| {
            let n = params.next(c);
            let a = params.inner(c, params.bottom);
            let b = params.inner(n, params.bottom);
            let cc = params.inner(n, params.top);
            let d = params.inner(c, params.top);
            [[a, d, b], [b, d, cc]]
        })
        .collect()
}

/// Height-modulated outer wall.
///
/// Columns are visited in reverse; the last column connects back to the
/// first.
pub fn outer_tube(grid: &Grid, params: &TubeParameters) -> Vec<Triangle> {
    let mut triangles = Vec::new();

    for pair in grid.rows().windows(2) {
        let (lower, upper) = (&pair[0], &pair[1]);
        for c in (0..params.points_per_line).rev() {
            let n = params.next(c);
            let a = params.outer(c, &lower[c]);
            let b = params.outer(n, &lower[n]);
            let cc = params.outer(n, &upper[n]);
            let d = params.outer(c, &upper[c]);
            triangles.push([a, b, d]);
            triangles.push([b, cc, d]);
        }
    }

    triangles
}

/// Annulus closing the first row.
pub fn bottom_circle(grid: &Grid, params: &TubeParameters) -> Vec<Triangle> {
    grid.rows()
        .first()
        .map_or_else(Vec::new, |row| circle(row, params, params.bottom, false))
}

/// Annulus closing the last row.
pub fn top_circle(grid: &Grid, params: &TubeParameters) -> Vec<Triangle> {
    grid.rows()
        .last()
        .map_or_else(Vec::new, |row| circle(row, params, params.top, true))
}

fn circle(row: &[Sample], params: &TubeParameters, z: f64, top: bool) -> Vec<Triangle> {
    (0..params.points_per_line)
        .flat_map(|c| {
            let n = params.next(c);
            let ic = params.inner(c, z);
            let inx = params.inner(n, z);
            let oc = params.outer_at(c, &row[c], z);
            let on = params.outer_at(n, &row[n], z);
            if top {
                [[ic, oc, on], [ic, on, inx]]
            } else {
                [[ic, on, oc], [ic, inx, on]]
            }
        })
        .collect()
}

/// Build the closed tube mesh. Needs at least 2 rows and 3 columns.
pub fn build_tube(grid: &Grid) -> Result<TriangleMesh> {
    check_grid(grid, 2, 3)?;

    let params = TubeParameters::new(grid);
    let inner = inner_tube(&params);
    let outer = outer_tube(grid, &params);
    let bottom = bottom_circle(grid, &params);
    let top = top_circle(grid, &params);
    let mesh = optimize_mesh(merge_parts(
        &[&inner, &outer, &bottom, &top],
        DEFAULT_WELD_TOLERANCE,
    ));

    debug!(
        "tube lithophane: radius {:.3}mm, {} vertices, {} triangles",
        params.radius,
        mesh.num_vertices(),
        mesh.num_triangles()
    );
    Ok(mesh)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adjacency::harmonize_normals;
    use crate::error::MeshError;
    use crate::lithophane::test_grids::grid;
    use crate::validate::validate_mesh;
    use approx::assert_relative_eq;

    #[test]
    fn test_parameters() {
        let params = TubeParameters::new(&grid(3, 8, 0.5, |_, _| 1.0));
        assert_eq!(params.points_per_line, 8);
        assert_relative_eq!(params.radius, 4.0 / TAU);
        assert_relative_eq!(params.angle_step, TAU / 8.0);
        assert_relative_eq!(params.bottom, 0.0);
        assert_relative_eq!(params.top, 1.0);
    }

    #[test]
    fn test_constant_grid_outer_radius() {
        let g = grid(3, 12, 1.0, |_, _| 1.25);
        let params = TubeParameters::new(&g);
        let outer = outer_tube(&g, &params);

        for p in outer.iter().flatten() {
            let radial = (p.x * p.x + p.y * p.y).sqrt();
            assert_relative_eq!(radial, params.radius + 1.25, epsilon = 1e-9);
        }
    }

    #[test]
    fn test_tube_is_closed_and_outward() {
        let g = grid(3, 8, 1.0, |_, _| 1.0);
        let params = TubeParameters::new(&g);
        let mesh = build_tube(&g).unwrap();
        let report = validate_mesh(&mesh);

        assert!(report.is_printable(), "{report}");
        // inner 16 + outer 32 + caps 32
        assert_eq!(mesh.num_triangles(), 80);

        // Regular octagon annulus extruded over the 2mm axial span
        let n = 8.0;
        let polygon = |r: f64| n / 2.0 * r * r * (TAU / n).sin();
        let expected = (polygon(params.radius + 1.0) - polygon(params.radius)) * 2.0;
        assert_relative_eq!(mesh.signed_volume(), expected, epsilon = 1e-9);
    }

    #[test]
    fn test_windings_are_outward_by_construction() {
        let g = grid(4, 10, 0.8, |r, c| 0.6 + ((r * 3 + c) % 4) as f64 * 0.4);
        let params = TubeParameters::new(&g);
        let inner = inner_tube(&params);
        let outer = outer_tube(&g, &params);
        let bottom = bottom_circle(&g, &params);
        let top = top_circle(&g, &params);
        let mut mesh = merge_parts(&[&inner, &outer, &bottom, &top], DEFAULT_WELD_TOLERANCE);

        assert!(validate_mesh(&mesh).is_watertight());
        assert_eq!(harmonize_normals(&mut mesh), 0);
        assert!(mesh.signed_volume() > 0.0);
    }

    #[test]
    fn test_two_columns_rejected() {
        assert!(matches!(
            build_tube(&grid(4, 2, 1.0, |_, _| 1.0)),
            Err(MeshError::GridTooSmall { min_cols: 3, .. })
        ));
    }
}
