#![warn(missing_docs)]

//! Triangle meshes for lithophanes.
//!
//! An indexed [`TriangleMesh`] with vertex welding ([`MeshBuilder`]),
//! orientation repair, validation and STL io, plus the two lithophane shape
//! builders in [`lithophane`].
//!
//! # Example
//!
//! ```ignore
//! use litho_mesh::{lithophane, save_stl};
//!
//! let mesh = lithophane::build_box(&heightfield.grid)?;
//! save_stl(&mesh, "lithophane.stl")?;
//! ```

pub mod adjacency;
pub mod bbox;
pub mod builder;
pub mod error;
pub mod lithophane;
pub mod mesh;
pub mod stl;
pub mod validate;

pub use adjacency::{harmonize_normals, MeshAdjacency};
pub use bbox::Aabb3;
pub use builder::{MeshBuilder, DEFAULT_WELD_TOLERANCE};
pub use error::{MeshError, Result};
pub use mesh::{Triangle, TriangleMesh};
pub use stl::{from_stl_bytes, load_stl, save_stl, to_stl_bytes, write_stl};
pub use validate::{validate_mesh, MeshReport};

/// A point in 3D space (mm).
pub type Point3 = nalgebra::Point3<f64>;

/// A vector in 3D space.
pub type Vec3 = nalgebra::Vector3<f64>;
