//! STL import and export.
//!
//! Writing always produces binary STL. Reading goes through `stl_io`, which
//! accepts both ASCII and binary, and welds the resulting triangle soup back
//! into an indexed mesh.

use std::fs;
use std::io::{Cursor, Write};
use std::path::Path;

use log::debug;

use crate::builder::{MeshBuilder, DEFAULT_WELD_TOLERANCE};
use crate::error::{MeshError, Result};
use crate::mesh::TriangleMesh;
use crate::Point3;

/// Binary header size in bytes.
const HEADER_SIZE: usize = 80;

/// Size of one binary triangle record (normal, 3 vertices, attribute).
const TRIANGLE_SIZE: usize = 50;

/// Encode a mesh as binary STL.
pub fn to_stl_bytes(mesh: &TriangleMesh) -> Vec<u8> {
    let mut data = Vec::with_capacity(HEADER_SIZE + 4 + mesh.num_triangles() * TRIANGLE_SIZE);

    let mut header = [b' '; HEADER_SIZE];
    let text = b"litho binary STL";
    header[..text.len()].copy_from_slice(text);
    data.extend_from_slice(&header);
    data.extend_from_slice(&(mesh.num_triangles() as u32).to_le_bytes());

    for i in 0..mesh.num_triangles() {
        let normal = mesh.face_normal(i);
        let len = normal.norm();
        let normal = if len > 1e-12 {
            normal / len
        } else {
            normal * 0.0
        };

        for c in [normal.x, normal.y, normal.z] {
            data.extend_from_slice(&(c as f32).to_le_bytes());
        }
        for p in mesh.triangle(i) {
            for c in [p.x, p.y, p.z] {
                data.extend_from_slice(&(c as f32).to_le_bytes());
            }
        }
        data.extend_from_slice(&0u16.to_le_bytes());
    }

    data
}

/// Write a mesh to any writer as binary STL.
pub fn write_stl<W: Write>(mesh: &TriangleMesh, mut writer: W) -> Result<()> {
    writer.write_all(&to_stl_bytes(mesh))?;
    Ok(())
}

/// Save a mesh as a binary STL file.
pub fn save_stl(mesh: &TriangleMesh, path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref();
    fs::write(path, to_stl_bytes(mesh))?;
    debug!("wrote {} triangles to {}", mesh.num_triangles(), path.display());
    Ok(())
}

/// Decode ASCII or binary STL, welding shared corners.
pub fn from_stl_bytes(bytes: &[u8]) -> Result<TriangleMesh> {
    let mut cursor = Cursor::new(bytes);
    let reader = stl_io::create_stl_reader(&mut cursor).map_err(invalid_stl)?;

    let mut builder = MeshBuilder::new(DEFAULT_WELD_TOLERANCE);
    for triangle in reader {
        let triangle = triangle.map_err(invalid_stl)?;
        let [a, b, c] = triangle
            .vertices
            .map(|v| Point3::new(f64::from(v[0]), f64::from(v[1]), f64::from(v[2])));
        builder.add_triangle([a, b, c]);
    }

    if builder.dropped() > 0 {
        debug!("dropped {} degenerate STL facets", builder.dropped());
    }
    Ok(builder.build())
}

/// Load an STL file.
pub fn load_stl(path: impl AsRef<Path>) -> Result<TriangleMesh> {
    let path = path.as_ref();
    let mesh = from_stl_bytes(&fs::read(path)?)?;
    debug!("read {} triangles from {}", mesh.num_triangles(), path.display());
    Ok(mesh)
}

fn invalid_stl(err: std::io::Error) -> MeshError {
    MeshError::InvalidStl(err.to_string())
}
