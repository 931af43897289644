//! Indexed triangle meshes.

use std::collections::HashMap;

use log::debug;

use crate::bbox::Aabb3;
use crate::{Point3, Vec3};

/// A triangle given by its three corner positions.
pub type Triangle = [Point3; 3];

/// Indexed triangle mesh.
///
/// Triangles are counter-clockwise when seen from outside, so the normal is
/// `(b - a) x (c - a)`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TriangleMesh {
    /// Vertex positions in millimeters.
    pub vertices: Vec<Point3>,
    /// Triangles as indices into `vertices`.
    pub triangles: Vec<[u32; 3]>,
}

impl TriangleMesh {
    /// Create an empty mesh.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a mesh from a triangle soup without sharing any vertices.
    pub fn from_triangles(triangles: &[Triangle]) -> Self {
        let mut mesh = Self {
            vertices: Vec::with_capacity(triangles.len() * 3),
            triangles: Vec::with_capacity(triangles.len()),
        };
        for tri in triangles {
            let base = mesh.vertices.len() as u32;
            mesh.vertices.extend_from_slice(tri);
            mesh.triangles.push([base, base + 1, base + 2]);
        }
        mesh
    }

    /// Axis-aligned box between two corners, 8 vertices and 12 triangles.
    pub fn cuboid(min: Point3, max: Point3) -> Self {
        let (x0, y0, z0) = (min.x, min.y, min.z);
        let (x1, y1, z1) = (max.x, max.y, max.z);
        Self {
            vertices: vec![
                Point3::new(x0, y0, z0),
                Point3::new(x1, y0, z0),
                Point3::new(x1, y1, z0),
                Point3::new(x0, y1, z0),
                Point3::new(x0, y0, z1),
                Point3::new(x1, y0, z1),
                Point3::new(x1, y1, z1),
                Point3::new(x0, y1, z1),
            ],
            triangles: vec![
                [0, 2, 1],
                [0, 3, 2],
                [4, 5, 6],
                [4, 6, 7],
                [0, 1, 5],
                [0, 5, 4],
                [2, 3, 7],
                [2, 7, 6],
                [0, 4, 7],
                [0, 7, 3],
                [1, 2, 6],
                [1, 6, 5],
            ],
        }
    }

    /// Number of triangles.
    pub fn num_triangles(&self) -> usize {
        self.triangles.len()
    }

    /// Number of vertices.
    pub fn num_vertices(&self) -> usize {
        self.vertices.len()
    }

    /// True if the mesh has no triangles.
    pub fn is_empty(&self) -> bool {
        self.triangles.is_empty()
    }

    /// Corner positions of triangle `index`.
    pub fn triangle(&self, index: usize) -> Triangle {
        let [a, b, c] = self.triangles[index];
        [
            self.vertices[a as usize],
            self.vertices[b as usize],
            self.vertices[c as usize],
        ]
    }

    /// Iterate all triangles as corner positions.
    pub fn iter_triangles(&self) -> impl Iterator<Item = Triangle> + '_ {
        (0..self.triangles.len()).map(|i| self.triangle(i))
    }

    /// Unnormalized normal of triangle `index`; its length is twice the area.
    pub fn face_normal(&self, index: usize) -> Vec3 {
        let [a, b, c] = self.triangle(index);
        (b - a).cross(&(c - a))
    }

    /// Append another mesh, offsetting its indices.
    pub fn merge(&mut self, other: &TriangleMesh) {
        let offset = self.vertices.len() as u32;
        self.vertices.extend_from_slice(&other.vertices);
        self.triangles.extend(
            other
                .triangles
                .iter()
                .map(|[a, b, c]| [a + offset, b + offset, c + offset]),
        );
    }

    /// Reverse the winding of every triangle.
    pub fn flip(&mut self) {
        for tri in &mut self.triangles {
            tri.swap(1, 2);
        }
    }

    /// Bounding box of all referenced and unreferenced vertices.
    pub fn bounds(&self) -> Aabb3 {
        Aabb3::from_points(&self.vertices)
    }

    /// Signed volume via the divergence theorem.
    ///
    /// Positive for a closed mesh with outward-facing triangles.
    pub fn signed_volume(&self) -> f64 {
        self.iter_triangles()
            .map(|[a, b, c]| a.coords.dot(&b.coords.cross(&c.coords)) / 6.0)
            .sum()
    }

    /// Total surface area.
    pub fn surface_area(&self) -> f64 {
        (0..self.triangles.len())
            .map(|i| self.face_normal(i).norm() / 2.0)
            .sum()
    }

    /// Merge vertices closer than `tolerance` and drop triangles that collapse.
    ///
    /// Returns the number of vertices removed.
    pub fn weld(&mut self, tolerance: f64) -> usize {
        let original = self.vertices.len();
        if original == 0 {
            return 0;
        }

        let cell_size = (tolerance * 2.0).max(f64::EPSILON);
        let mut spatial_hash: HashMap<(i64, i64, i64), Vec<u32>> = HashMap::new();
        let mut remap = Vec::with_capacity(original);
        let mut kept: Vec<Point3> = Vec::with_capacity(original);

        for p in &self.vertices {
            let index = match find_within(&spatial_hash, &kept, p, cell_size, tolerance) {
                Some(existing) => existing,
                None => {
                    let index = kept.len() as u32;
                    spatial_hash
                        .entry(cell_of(p, cell_size))
                        .or_default()
                        .push(index);
                    kept.push(*p);
                    index
                }
            };
            remap.push(index);
        }

        let before = self.triangles.len();
        self.triangles = self
            .triangles
            .iter()
            .map(|[a, b, c]| [remap[*a as usize], remap[*b as usize], remap[*c as usize]])
            .filter(|[a, b, c]| a != b && b != c && a != c)
            .collect();
        self.vertices = kept;

        let removed = original - self.vertices.len();
        debug!(
            "welded {} vertices, dropped {} degenerate triangles",
            removed,
            before - self.triangles.len()
        );
        removed
    }
}

/// Spatial hash cell containing `p`.
pub(crate) fn cell_of(p: &Point3, cell_size: f64) -> (i64, i64, i64) {
    (
        (p.x / cell_size).floor() as i64,
        (p.y / cell_size).floor() as i64,
        (p.z / cell_size).floor() as i64,
    )
}

/// Index of a stored point within `tolerance` of `p`, checking the 3x3x3
/// neighbourhood of cells.
pub(crate) fn find_within(
    spatial_hash: &HashMap<(i64, i64, i64), Vec<u32>>,
    points: &[Point3],
    p: &Point3,
    cell_size: f64,
    tolerance: f64,
) -> Option<u32> {
    let cell = cell_of(p, cell_size);
    for dx in -1..=1 {
        for dy in -1..=1 {
            for dz in -1..=1 {
                let Some(candidates) = spatial_hash.get(&(cell.0 + dx, cell.1 + dy, cell.2 + dz))
                else {
                    continue;
                };
                if let Some(&found) = candidates
                    .iter()
                    .find(|&&i| (points[i as usize] - p).norm() <= tolerance)
                {
                    return Some(found);
                }
            }
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn unit_cube() -> TriangleMesh {
        TriangleMesh::cuboid(Point3::origin(), Point3::new(1.0, 1.0, 1.0))
    }

    #[test]
    fn test_cube_volume_and_area() {
        let cube = unit_cube();
        assert_relative_eq!(cube.signed_volume(), 1.0, epsilon = 1e-12);
        assert_relative_eq!(cube.surface_area(), 6.0, epsilon = 1e-12);
    }

    #[test]
    fn test_flip_negates_volume() {
        let mut cube = unit_cube();
        cube.flip();
        assert_relative_eq!(cube.signed_volume(), -1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_weld_soup_restores_shared_vertices() {
        let cube = unit_cube();
        let triangles: Vec<Triangle> = cube.iter_triangles().collect();
        let mut soup = TriangleMesh::from_triangles(&triangles);
        assert_eq!(soup.num_vertices(), 36);

        let removed = soup.weld(1e-6);
        assert_eq!(removed, 28);
        assert_eq!(soup.num_vertices(), 8);
        assert_eq!(soup.num_triangles(), 12);
        assert_relative_eq!(soup.signed_volume(), 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_weld_drops_collapsed_triangles() {
        let mut mesh = TriangleMesh::from_triangles(&[[
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1e-9, 0.0, 0.0),
            Point3::new(0.0, 1.0, 0.0),
        ]]);
        mesh.weld(1e-6);
        assert!(mesh.is_empty());
        assert_eq!(mesh.num_vertices(), 2);
    }

    #[test]
    fn test_merge_offsets_indices() {
        let mut a = unit_cube();
        let b = unit_cube();
        a.merge(&b);
        assert_eq!(a.num_vertices(), 16);
        assert_eq!(a.triangles[12], [8, 10, 9]);
    }

    #[test]
    fn test_bounds() {
        let bounds = unit_cube().bounds();
        assert_eq!(bounds.min, Point3::origin());
        assert_eq!(bounds.max, Point3::new(1.0, 1.0, 1.0));
    }
}
