//! In-process constructive solid geometry.
//!
//! Both operands become BSP trees; each tree clips away the other's
//! polygons that fall inside it, and the survivors are stitched back into
//! one welded mesh with its T-junctions split. Operands are expected to be
//! closed and outward-facing.
//!
//! Operands whose bounding boxes do not touch skip the trees entirely.

pub mod bsp;
pub mod polygon;
pub mod stitch;

use litho_mesh::TriangleMesh;
use log::debug;

pub use bsp::BspTree;
pub use polygon::{Plane, Polygon, Split, PLANE_EPSILON};
pub use stitch::JUNCTION_EPSILON;

/// Polygons of a mesh, skipping degenerate triangles.
pub fn to_polygons(mesh: &TriangleMesh) -> Vec<Polygon> {
    mesh.iter_triangles()
        .filter_map(|t| Polygon::from_triangle(&t))
        .collect()
}

/// Weld polygons into a mesh, splitting edges at T-junctions.
pub fn from_polygons(polygons: &[Polygon]) -> TriangleMesh {
    stitch::stitch(polygons)
}

/// Volume covered by either operand.
pub fn union(a: &TriangleMesh, b: &TriangleMesh) -> TriangleMesh {
    if !a.bounds().overlaps(&b.bounds()) {
        debug!("union: disjoint bounds, concatenating");
        let mut merged = a.clone();
        merged.merge(b);
        return merged;
    }

    let mut a = BspTree::new(to_polygons(a));
    let mut b = BspTree::new(to_polygons(b));

    a.clip_to(&b);
    b.clip_to(&a);
    b.invert();
    b.clip_to(&a);
    b.invert();
    a.build(b.into_polygons());

    let polygons = a.into_polygons();
    debug!("union: {} polygons", polygons.len());
    from_polygons(&polygons)
}

/// Volume of `a` not covered by `b`.
pub fn difference(a: &TriangleMesh, b: &TriangleMesh) -> TriangleMesh {
    if !a.bounds().overlaps(&b.bounds()) {
        debug!("difference: disjoint bounds, nothing removed");
        return a.clone();
    }

    let mut a = BspTree::new(to_polygons(a));
    let mut b = BspTree::new(to_polygons(b));

    a.invert();
    a.clip_to(&b);
    b.clip_to(&a);
    b.invert();
    b.clip_to(&a);
    b.invert();
    a.build(b.into_polygons());
    a.invert();

    let polygons = a.into_polygons();
    debug!("difference: {} polygons", polygons.len());
    from_polygons(&polygons)
}
