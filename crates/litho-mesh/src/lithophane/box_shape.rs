//! Flat rectangular lithophane.
//!
//! The top face follows the heightfield, the bottom face lies on the print
//! bed and side walls close the perimeter.

use litho_heightfield::Grid;
use log::debug;

use super::{check_grid, ground_point, merge_parts, optimize_mesh, surface_point};
use crate::builder::DEFAULT_WELD_TOLERANCE;
use crate::error::Result;
use crate::mesh::{Triangle, TriangleMesh};

/// Height-modulated top surface, two triangles per grid cell.
pub fn image_plane(grid: &Grid) -> Vec<Triangle> {
    cell_triangles(grid, false)
}

/// Side walls from the outer samples down to z = 0.
///
/// The first and last row are walled along their full length, the first and
/// last column between every pair of consecutive rows.
pub fn image_base(grid: &Grid) -> Vec<Triangle> {
    let rows = grid.rows();
    let (Some(first), Some(last)) = (rows.first(), rows.last()) else {
        return Vec::new();
    };
    let mut triangles = Vec::new();

    for pair in first.windows(2) {
        let (l, r) = (&pair[0], &pair[1]);
        let (gl, gr) = (ground_point(l), ground_point(r));
        let (pl, pr) = (surface_point(l), surface_point(r));
        triangles.push([gl, gr, pl]);
        triangles.push([gr, pr, pl]);
    }

    for pair in last.windows(2) {
        let (l, r) = (&pair[0], &pair[1]);
        let (gl, gr) = (ground_point(l), ground_point(r));
        let (pl, pr) = (surface_point(l), surface_point(r));
        triangles.push([gl, pl, gr]);
        triangles.push([gr, pl, pr]);
    }

    for pair in rows.windows(2) {
        let (prev, cur) = (&pair[0], &pair[1]);
        let (Some(prev_left), Some(cur_left)) = (prev.first(), cur.first()) else {
            continue;
        };
        let (gp, gc) = (ground_point(prev_left), ground_point(cur_left));
        let (tp, tc) = (surface_point(prev_left), surface_point(cur_left));
        triangles.push([gc, gp, tc]);
        triangles.push([gp, tp, tc]);

        let (Some(prev_right), Some(cur_right)) = (prev.last(), cur.last()) else {
            continue;
        };
        let (gp, gc) = (ground_point(prev_right), ground_point(cur_right));
        let (tp, tc) = (surface_point(prev_right), surface_point(cur_right));
        triangles.push([gp, gc, tc]);
        triangles.push([gp, tc, tp]);
    }

    triangles
}

/// Flat underside at z = 0, wound opposite to the top.
pub fn bottom_plane(grid: &Grid) -> Vec<Triangle> {
    cell_triangles(grid, true)
}

fn cell_triangles(grid: &Grid, bottom: bool) -> Vec<Triangle> {
    let point = if bottom { ground_point } else { surface_point };
    let mut triangles = Vec::with_capacity(
        2 * grid.row_count().saturating_sub(1) * grid.column_count().saturating_sub(1),
    );

    for pair in grid.rows().windows(2) {
        let (lower, upper) = (&pair[0], &pair[1]);
        for c in 0..lower.len().saturating_sub(1) {
            let bl = point(&lower[c]);
            let br = point(&lower[c + 1]);
            let tl = point(&upper[c]);
            let tr = point(&upper[c + 1]);

            if bottom {
                triangles.push([bl, tl, br]);
                triangles.push([br, tl, tr]);
            } else {
                triangles.push([bl, br, tl]);
                triangles.push([br, tr, tl]);
            }
        }
    }

    triangles
}

/// Build the closed box mesh. Needs at least 2x2 samples.
pub fn build_box(grid: &Grid) -> Result<TriangleMesh> {
    check_grid(grid, 2, 2)?;

    let top = image_plane(grid);
    let walls = image_base(grid);
    let bottom = bottom_plane(grid);
    let mesh = optimize_mesh(merge_parts(&[&top, &walls, &bottom], DEFAULT_WELD_TOLERANCE));

    debug!(
        "box lithophane: {} vertices, {} triangles",
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
    fn test_constant_grid_is_closed_block() {
        let mesh = build_box(&grid(3, 4, 1.0, |_, _| 2.0)).unwrap();
        let report = validate_mesh(&mesh);

        assert!(report.is_printable(), "{report}");
        assert_eq!(mesh.num_vertices(), 24);
        // top 12 + bottom 12 + front/back 12 + left/right 8
        assert_eq!(mesh.num_triangles(), 44);
        // 3mm x 2mm footprint, 2mm tall
        assert_relative_eq!(mesh.signed_volume(), 12.0, epsilon = 1e-9);
    }

    #[test]
    fn test_windings_are_outward_by_construction() {
        let g = grid(5, 6, 0.5, |r, c| 1.0 + ((r * 7 + c * 3) % 5) as f64 * 0.3);
        let top = image_plane(&g);
        let walls = image_base(&g);
        let bottom = bottom_plane(&g);
        let mut mesh = merge_parts(&[&top, &walls, &bottom], DEFAULT_WELD_TOLERANCE);

        assert_eq!(harmonize_normals(&mut mesh), 0);
        assert!(validate_mesh(&mesh).is_printable());
    }

    #[test]
    fn test_vertical_faces_only_on_perimeter() {
        let mesh = build_box(&grid(4, 5, 1.0, |_, _| 1.5)).unwrap();
        let bounds = mesh.bounds();

        for i in 0..mesh.num_triangles() {
            let normal = mesh.face_normal(i).normalize();
            if normal.z.abs() > 1e-9 {
                continue;
            }
            let tri = mesh.triangle(i);
            let on = |f: fn(&crate::Point3) -> f64, v: f64| tri.iter().all(|p| (f(p) - v).abs() < 1e-9);
            let on_perimeter = on(|p| p.x, bounds.min.x)
                || on(|p| p.x, bounds.max.x)
                || on(|p| p.y, bounds.min.y)
                || on(|p| p.y, bounds.max.y);
            assert!(on_perimeter, "interior vertical face {tri:?}");
        }
    }

    #[test]
    fn test_top_follows_heights() {
        let g = grid(2, 3, 1.0, |r, c| 0.5 + (r + c) as f64);
        let mesh = build_box(&g).unwrap();
        let bounds = mesh.bounds();
        assert_relative_eq!(bounds.min.z, 0.0);
        assert_relative_eq!(bounds.max.z, 3.5);
        assert_relative_eq!(bounds.length(), 2.0);
        assert_relative_eq!(bounds.width(), 1.0);
    }

    #[test]
    fn test_single_row_rejected() {
        assert!(matches!(
            build_box(&grid(1, 5, 1.0, |_, _| 1.0)),
            Err(MeshError::GridTooSmall { rows: 1, cols: 5, .. })
        ));
    }
}
