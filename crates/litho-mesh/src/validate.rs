//! Mesh validation report.

use std::fmt;

use crate::adjacency::MeshAdjacency;
use crate::bbox::Aabb3;
use crate::mesh::TriangleMesh;

/// Summary of a mesh's topology and extent.
#[derive(Debug, Clone)]
pub struct MeshReport {
    /// Number of vertices.
    pub vertex_count: usize,
    /// Number of triangles.
    pub triangle_count: usize,
    /// Edges used by one triangle.
    pub boundary_edges: usize,
    /// Edges used by more than two triangles.
    pub non_manifold_edges: usize,
    /// Signed volume (mm³); negative if the mesh is inside out.
    pub signed_volume: f64,
    /// Bounding box.
    pub bounds: Aabb3,
}

impl MeshReport {
    /// Closed with every edge shared by exactly two triangles.
    pub fn is_watertight(&self) -> bool {
        self.triangle_count > 0 && self.boundary_edges == 0 && self.non_manifold_edges == 0
    }

    /// Watertight and outward facing.
    pub fn is_printable(&self) -> bool {
        self.is_watertight() && self.signed_volume > 0.0
    }
}

impl fmt::Display for MeshReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Vertices:           {}", self.vertex_count)?;
        writeln!(f, "Triangles:          {}", self.triangle_count)?;
        writeln!(f, "Boundary edges:     {}", self.boundary_edges)?;
        writeln!(f, "Non-manifold edges: {}", self.non_manifold_edges)?;
        writeln!(f, "Volume:             {:.3} mm³", self.signed_volume)?;
        write!(
            f,
            "Watertight:         {}",
            if self.is_watertight() { "yes" } else { "no" }
        )
    }
}

/// Inspect a mesh.
pub fn validate_mesh(mesh: &TriangleMesh) -> MeshReport {
    let adjacency = MeshAdjacency::build(&mesh.triangles);
    MeshReport {
        vertex_count: mesh.num_vertices(),
        triangle_count: mesh.num_triangles(),
        boundary_edges: adjacency.boundary_edge_count(),
        non_manifold_edges: adjacency.non_manifold_edge_count(),
        signed_volume: mesh.signed_volume(),
        bounds: mesh.bounds(),
    }
}
