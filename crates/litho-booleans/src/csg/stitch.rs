//! Turning clipped polygons back into a closed mesh.
//!
//! Clipping splits a face on one side of an edge without splitting its
//! neighbour, which leaves T-junctions: a vertex sitting in the middle of
//! the neighbour's edge. Every polygon edge that has no matching reverse
//! edge is split at the vertices lying on it before triangulation, so both
//! sides end up walking the same vertex chain.

use std::collections::HashSet;

use litho_mesh::{MeshBuilder, Point3, TriangleMesh, DEFAULT_WELD_TOLERANCE};
use log::debug;

use super::polygon::Polygon;

/// Distance within which a vertex counts as lying on an edge (mm).
pub const JUNCTION_EPSILON: f64 = 1e-5;

/// Passes over the open edges before giving up.
const MAX_PASSES: usize = 8;

/// Weld polygons, split their T-junctions and triangulate them.
pub fn stitch(polygons: &[Polygon]) -> TriangleMesh {
    let mut builder = MeshBuilder::new(DEFAULT_WELD_TOLERANCE);

    let mut loops: Vec<Vec<u32>> = polygons
        .iter()
        .filter_map(|polygon| {
            let ids: Vec<u32> = polygon
                .vertices
                .iter()
                .map(|v| builder.add_vertex(*v))
                .collect();
            clean_loop(ids)
        })
        .collect();

    let mut inserted = 0;
    for _ in 0..MAX_PASSES {
        let split = split_junctions(&mut loops, builder.vertices());
        inserted += split;
        if split == 0 {
            break;
        }
    }

    for ids in &loops {
        triangulate(&mut builder, ids);
    }
    if inserted > 0 {
        debug!("stitch: split {} T-junctions", inserted);
    }
    builder.build()
}

/// Drop repeated indices left behind by welding. `None` once fewer than
/// three distinct corners remain.
fn clean_loop(mut ids: Vec<u32>) -> Option<Vec<u32>> {
    ids.dedup();
    while ids.len() > 1 && ids.first() == ids.last() {
        ids.pop();
    }
    (ids.len() >= 3).then_some(ids)
}

fn loop_edges(ids: &[u32]) -> impl Iterator<Item = (u32, u32)> + '_ {
    ids.iter()
        .zip(ids.iter().cycle().skip(1))
        .map(|(&a, &b)| (a, b))
}

/// Insert every vertex lying inside an open edge into that edge. Returns
/// the number of insertions.
fn split_junctions(loops: &mut [Vec<u32>], vertices: &[Point3]) -> usize {
    let edges: HashSet<(u32, u32)> = loops.iter().flat_map(|ids| loop_edges(ids)).collect();
    let open: Vec<(u32, u32)> = edges
        .iter()
        .copied()
        .filter(|&(a, b)| !edges.contains(&(b, a)))
        .collect();
    if open.is_empty() {
        return 0;
    }

    let mut candidates: Vec<u32> = open.iter().flat_map(|&(a, b)| [a, b]).collect();
    candidates.sort_unstable();
    candidates.dedup();

    let mut inserted = 0;
    for ids in loops.iter_mut() {
        let mut rebuilt = Vec::with_capacity(ids.len());
        for (a, b) in loop_edges(ids) {
            rebuilt.push(a);
            if edges.contains(&(b, a)) {
                continue;
            }
            let mut on_edge: Vec<(f64, u32)> = candidates
                .iter()
                .filter(|&&v| v != a && v != b)
                .filter_map(|&v| {
                    edge_parameter(&vertices[a as usize], &vertices[b as usize], &vertices[v as usize])
                        .map(|t| (t, v))
                })
                .collect();
            on_edge.sort_by(|x, y| x.0.total_cmp(&y.0));
            inserted += on_edge.len();
            rebuilt.extend(on_edge.into_iter().map(|(_, v)| v));
        }
        *ids = rebuilt;
    }
    inserted
}

/// Position of `p` along `a -> b` when it lies strictly inside the edge.
fn edge_parameter(a: &Point3, b: &Point3, p: &Point3) -> Option<f64> {
    let d = b - a;
    let length = d.norm();
    if length <= 2.0 * JUNCTION_EPSILON {
        return None;
    }
    let along = (p - a).dot(&d) / length;
    if along <= JUNCTION_EPSILON || along >= length - JUNCTION_EPSILON {
        return None;
    }
    let off = (p - a) - d * (along / length);
    (off.norm() < JUNCTION_EPSILON).then_some(along / length)
}

/// Fan from the first corner, or from the centroid when the loop carries
/// collinear corners that would make the fan degenerate.
fn triangulate(builder: &mut MeshBuilder, ids: &[u32]) {
    let vertices = builder.vertices();
    let n = ids.len();
    let has_straight_corner = n > 3
        && (0..n).any(|i| {
            let prev = vertices[ids[(i + n - 1) % n] as usize];
            let here = vertices[ids[i] as usize];
            let next = vertices[ids[(i + 1) % n] as usize];
            (here - prev).cross(&(next - here)).norm() < JUNCTION_EPSILON * (next - prev).norm()
        });

    if !has_straight_corner {
        for pair in ids[1..].windows(2) {
            builder.add_indexed_triangle([ids[0], pair[0], pair[1]]);
        }
        return;
    }

    let sum = ids
        .iter()
        .fold(Point3::origin().coords, |acc, &i| acc + vertices[i as usize].coords);
    let centroid = Point3::from(sum / n as f64);
    let center = builder.add_vertex(centroid);
    for (a, b) in loop_edges(ids) {
        builder.add_indexed_triangle([center, a, b]);
    }
}
