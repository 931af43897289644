//! Edge adjacency and orientation repair.

use std::collections::{HashMap, VecDeque};

use log::debug;

use crate::mesh::TriangleMesh;

/// Edge-to-triangle lookup for an indexed mesh.
#[derive(Debug, Clone)]
pub struct MeshAdjacency {
    /// Maps edge `(v0, v1)` with `v0 < v1` to the triangles using it.
    edge_to_faces: HashMap<(u32, u32), Vec<usize>>,
}

impl MeshAdjacency {
    /// Build adjacency from triangle indices.
    pub fn build(triangles: &[[u32; 3]]) -> Self {
        let mut edge_to_faces: HashMap<(u32, u32), Vec<usize>> = HashMap::new();
        for (face, tri) in triangles.iter().enumerate() {
            for (a, b) in directed_edges(tri) {
                edge_to_faces
                    .entry(normalize_edge(a, b))
                    .or_default()
                    .push(face);
            }
        }
        Self { edge_to_faces }
    }

    /// Triangles sharing the edge between `v0` and `v1`.
    pub fn faces_for_edge(&self, v0: u32, v1: u32) -> &[usize] {
        self.edge_to_faces
            .get(&normalize_edge(v0, v1))
            .map_or(&[], Vec::as_slice)
    }

    /// Number of edges used by exactly one triangle.
    pub fn boundary_edge_count(&self) -> usize {
        self.edge_to_faces.values().filter(|f| f.len() == 1).count()
    }

    /// Number of edges used by more than two triangles.
    pub fn non_manifold_edge_count(&self) -> usize {
        self.edge_to_faces.values().filter(|f| f.len() > 2).count()
    }

    /// Total number of distinct edges.
    pub fn edge_count(&self) -> usize {
        self.edge_to_faces.len()
    }

    /// True if every edge has exactly two triangles.
    pub fn is_closed_manifold(&self) -> bool {
        self.edge_to_faces.values().all(|f| f.len() == 2)
    }
}

fn normalize_edge(a: u32, b: u32) -> (u32, u32) {
    if a < b {
        (a, b)
    } else {
        (b, a)
    }
}

fn directed_edges(tri: &[u32; 3]) -> [(u32, u32); 3] {
    [(tri[0], tri[1]), (tri[1], tri[2]), (tri[2], tri[0])]
}

/// True if `tri` walks the edge `a -> b` in that direction.
fn has_directed_edge(tri: &[u32; 3], a: u32, b: u32) -> bool {
    directed_edges(tri).contains(&(a, b))
}

/// Make triangle windings agree across shared edges, then turn each connected
/// patch outward.
///
/// Starting from a seed triangle, every neighbour that walks a shared edge in
/// the same direction is flipped. Once a patch is consistent it is flipped as
/// a whole if its signed volume is negative. Returns the number of triangles
/// flipped.
pub fn harmonize_normals(mesh: &mut TriangleMesh) -> usize {
    let adjacency = MeshAdjacency::build(&mesh.triangles);
    let count = mesh.triangles.len();
    let mut visited = vec![false; count];
    let mut flipped = vec![false; count];

    for seed in 0..count {
        if visited[seed] {
            continue;
        }

        let mut component = Vec::new();
        let mut queue = VecDeque::from([seed]);
        visited[seed] = true;

        while let Some(face) = queue.pop_front() {
            component.push(face);
            let tri = mesh.triangles[face];

            for (a, b) in directed_edges(&tri) {
                for &neighbour in adjacency.faces_for_edge(a, b) {
                    if visited[neighbour] {
                        continue;
                    }
                    visited[neighbour] = true;

                    // A consistent neighbour walks the shared edge b -> a.
                    if has_directed_edge(&mesh.triangles[neighbour], a, b) {
                        mesh.triangles[neighbour].swap(1, 2);
                        flipped[neighbour] = !flipped[neighbour];
                    }
                    queue.push_back(neighbour);
                }
            }
        }

        let volume: f64 = component
            .iter()
            .map(|&face| {
                let [a, b, c] = mesh.triangle(face);
                a.coords.dot(&b.coords.cross(&c.coords))
            })
            .sum();

        if volume < 0.0 {
            for &face in &component {
                mesh.triangles[face].swap(1, 2);
                flipped[face] = !flipped[face];
            }
        }
    }

    let total = flipped.iter().filter(|&&f| f).count();
    debug!("harmonized normals, {} of {} triangles flipped", total, count);
    total
}
