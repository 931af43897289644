//! Incremental mesh construction with vertex welding.

use std::collections::HashMap;

use crate::mesh::{cell_of, find_within, Triangle, TriangleMesh};
use crate::Point3;

/// Default welding tolerance for generated meshes (mm).
pub const DEFAULT_WELD_TOLERANCE: f64 = 1e-6;

/// Builds an indexed mesh, merging vertices within a tolerance as they are
/// inserted.
///
/// Triangles whose corners weld together are dropped.
#[derive(Debug)]
pub struct MeshBuilder {
    tolerance: f64,
    cell_size: f64,
    spatial_hash: HashMap<(i64, i64, i64), Vec<u32>>,
    mesh: TriangleMesh,
    dropped: usize,
}

impl MeshBuilder {
    /// New builder that treats points closer than `tolerance` as one vertex.
    pub fn new(tolerance: f64) -> Self {
        Self {
            tolerance,
            cell_size: (tolerance * 2.0).max(f64::EPSILON),
            spatial_hash: HashMap::new(),
            mesh: TriangleMesh::new(),
            dropped: 0,
        }
    }

    /// Insert a vertex, returning the index of an existing vertex within
    /// tolerance if there is one.
    pub fn add_vertex(&mut self, p: Point3) -> u32 {
        if let Some(existing) = find_within(
            &self.spatial_hash,
            &self.mesh.vertices,
            &p,
            self.cell_size,
            self.tolerance,
        ) {
            return existing;
        }

        let index = self.mesh.vertices.len() as u32;
        self.spatial_hash
            .entry(cell_of(&p, self.cell_size))
            .or_default()
            .push(index);
        self.mesh.vertices.push(p);
        index
    }

    /// Insert a triangle by corner positions.
    ///
    /// Returns `false` if the triangle collapsed and was dropped.
    pub fn add_triangle(&mut self, [a, b, c]: Triangle) -> bool {
        let tri = [self.add_vertex(a), self.add_vertex(b), self.add_vertex(c)];
        self.add_indexed_triangle(tri)
    }

    /// Insert a triangle by vertex indices returned from [`add_vertex`].
    ///
    /// Returns `false` if two corners are the same vertex.
    ///
    /// [`add_vertex`]: Self::add_vertex
    pub fn add_indexed_triangle(&mut self, tri: [u32; 3]) -> bool {
        if tri[0] == tri[1] || tri[1] == tri[2] || tri[0] == tri[2] {
            self.dropped += 1;
            return false;
        }
        self.mesh.triangles.push(tri);
        true
    }

    /// Vertices inserted so far.
    pub fn vertices(&self) -> &[Point3] {
        &self.mesh.vertices
    }

    /// Insert every triangle of a soup.
    pub fn add_triangles(&mut self, triangles: &[Triangle]) {
        for tri in triangles {
            self.add_triangle(*tri);
        }
    }

    /// Insert every triangle of another mesh.
    pub fn add_mesh(&mut self, mesh: &TriangleMesh) {
        for tri in mesh.iter_triangles() {
            self.add_triangle(tri);
        }
    }

    /// Number of triangles dropped so far.
    pub fn dropped(&self) -> usize {
        self.dropped
    }

    /// Finish building.
    pub fn build(self) -> TriangleMesh {
        self.mesh
    }
}

impl Default for MeshBuilder {
    fn default() -> Self {
        Self::new(DEFAULT_WELD_TOLERANCE)
    }
}
