//! File protocol shared with external boolean engines.
//!
//! The config is a JSON array of operation records:
//!
//! ```json
//! [
//!     {
//!         "left": { "file": "/tmp/x/base.stl", "type": "file" },
//!         "mode": "UNION",
//!         "right": { "file": "/tmp/x/01_Stand.stl", "type": "file" }
//!     },
//!     {
//!         "left": { "type": "outcome" },
//!         "mode": "DIFFERENCE",
//!         "right": { "file": "/tmp/x/02_Hole.stl", "type": "file" }
//!     }
//! ]
//! ```
//!
//! Keys are sorted and indented by four spaces. Operand meshes are binary
//! STL; the engine writes its result to the output path it is given.

use std::fs;
use std::path::{Path, PathBuf};

use litho_mesh::{load_stl, TriangleMesh};
use litho_pipeline::CancellationToken;
use serde::{Deserialize, Serialize};

use crate::engine::BooleanEngine;
use crate::error::{BooleanError, Result};
use crate::operation::{BooleanMode, BooleanOperation, Operand};

/// Config file name inside the per-call directory.
pub const CONFIG_FILE_NAME: &str = "config.json";

/// Result file name inside the per-call directory.
pub const RESULT_FILE_NAME: &str = "boolean_result.stl";

/// An operand reference.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum OperandRecord {
    /// Mesh stored in an STL file.
    File {
        /// Path of the STL file.
        file: PathBuf,
    },
    /// Result of the previous record.
    Outcome,
}

impl OperandRecord {
    /// File operand.
    pub fn file(path: impl Into<PathBuf>) -> Self {
        Self::File { file: path.into() }
    }
}

/// One record of the config array.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperationRecord {
    /// Union or difference.
    pub mode: BooleanMode,
    /// Left operand.
    pub left: OperandRecord,
    /// Right operand.
    pub right: OperandRecord,
}

/// Render records as sorted, four-space indented JSON.
pub fn to_config_json(records: &[OperationRecord]) -> Result<String> {
    // Going through Value sorts the object keys
    let value = serde_json::to_value(records)?;
    let mut buf = Vec::new();
    let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
    let mut serializer = serde_json::Serializer::with_formatter(&mut buf, formatter);
    value.serialize(&mut serializer)?;
    String::from_utf8(buf).map_err(|e| BooleanError::Config(e.to_string()))
}

/// Write the config file.
pub fn write_config(records: &[OperationRecord], path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref();
    let json = to_config_json(records)?;
    fs::write(path, json).map_err(|e| BooleanError::io(path, e))
}

/// Read a config file.
pub fn read_config(path: impl AsRef<Path>) -> Result<Vec<OperationRecord>> {
    let path = path.as_ref();
    let text = fs::read_to_string(path).map_err(|e| BooleanError::io(path, e))?;
    Ok(serde_json::from_str(&text)?)
}

/// Execute a config with `engine`: load every file operand and fold the
/// records in order. Right operands must be files.
pub fn run_config(
    records: &[OperationRecord],
    engine: &dyn BooleanEngine,
    cancel: &CancellationToken,
) -> Result<TriangleMesh> {
    if records.is_empty() {
        return Err(BooleanError::Config("config has no operations".into()));
    }

    let mut meshes = Vec::new();
    let mut slots = Vec::with_capacity(records.len());

    for (i, record) in records.iter().enumerate() {
        let left = match &record.left {
            OperandRecord::File { file } => {
                meshes.push(load_stl(file)?);
                Some(meshes.len() - 1)
            }
            OperandRecord::Outcome if i == 0 => {
                return Err(BooleanError::Config(
                    "first operation must start from a file".into(),
                ))
            }
            OperandRecord::Outcome => None,
        };
        let (right, name) = match &record.right {
            OperandRecord::File { file } => {
                meshes.push(load_stl(file)?);
                let name = file
                    .file_stem()
                    .and_then(|s| s.to_str())
                    .unwrap_or("operand");
                (meshes.len() - 1, name)
            }
            OperandRecord::Outcome => {
                return Err(BooleanError::Config(format!(
                    "operation {}: right operand must be a file",
                    i + 1
                )))
            }
        };
        slots.push((record.mode, left, right, name));
    }

    let operations: Vec<BooleanOperation<'_>> = slots
        .iter()
        .map(|&(mode, left, right, name)| BooleanOperation {
            mode,
            left: left.map_or(Operand::PriorResult, |i| Operand::Mesh(&meshes[i])),
            right: &meshes[right],
            name,
        })
        .collect();

    engine.apply(&operations, cancel)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::in_process::InProcessEngine;
    use approx::assert_relative_eq;
    use litho_mesh::{save_stl, Point3};

    fn records() -> Vec<OperationRecord> {
        vec![
            OperationRecord {
                mode: BooleanMode::Union,
                left: OperandRecord::file("base.stl"),
                right: OperandRecord::file("add.stl"),
            },
            OperationRecord {
                mode: BooleanMode::Difference,
                left: OperandRecord::Outcome,
                right: OperandRecord::file("sub.stl"),
            },
        ]
    }

    #[test]
    fn test_config_json_layout() {
        let json = to_config_json(&records()).unwrap();
        let expected = r#"[
    {
        "left": {
            "file": "base.stl",
            "type": "file"
        },
        "mode": "UNION",
        "right": {
            "file": "add.stl",
            "type": "file"
        }
    },
    {
        "left": {
            "type": "outcome"
        },
        "mode": "DIFFERENCE",
        "right": {
            "file": "sub.stl",
            "type": "file"
        }
    }
]"#;
        assert_eq!(json, expected);
    }

    #[test]
    fn test_config_file_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE_NAME);
        write_config(&records(), &path).unwrap();
        assert_eq!(read_config(&path).unwrap(), records());
    }

    #[test]
    fn test_unknown_operand_type_rejected() {
        let err = serde_json::from_str::<Vec<OperationRecord>>(
            r#"[{"mode": "UNION", "left": {"type": "socket"}, "right": {"type": "outcome"}}]"#,
        );
        assert!(err.is_err());
    }

    #[test]
    fn test_run_config_with_in_process_engine() {
        let dir = tempfile::tempdir().unwrap();
        let base = dir.path().join("base.stl");
        let add = dir.path().join("add.stl");
        let sub = dir.path().join("sub.stl");
        save_stl(&TriangleMesh::cuboid(Point3::origin(), Point3::new(2.0, 2.0, 2.0)), &base).unwrap();
        save_stl(
            &TriangleMesh::cuboid(Point3::new(1.0, 1.0, 1.0), Point3::new(3.0, 3.0, 3.0)),
            &add,
        )
        .unwrap();
        save_stl(
            &TriangleMesh::cuboid(Point3::new(2.5, 2.5, 2.5), Point3::new(4.0, 4.0, 4.0)),
            &sub,
        )
        .unwrap();

        let records = vec![
            OperationRecord {
                mode: BooleanMode::Union,
                left: OperandRecord::file(&base),
                right: OperandRecord::file(&add),
            },
            OperationRecord {
                mode: BooleanMode::Difference,
                left: OperandRecord::Outcome,
                right: OperandRecord::file(&sub),
            },
        ];

        let mesh = run_config(&records, &InProcessEngine, &CancellationToken::new()).unwrap();
        // 15 for the union minus the 0.5^3 corner
        assert_relative_eq!(mesh.signed_volume(), 14.875, epsilon = 1e-6);
    }

    #[test]
    fn test_run_config_rejects_leading_outcome() {
        let records = vec![OperationRecord {
            mode: BooleanMode::Union,
            left: OperandRecord::Outcome,
            right: OperandRecord::file("missing.stl"),
        }];
        assert!(matches!(
            run_config(&records, &InProcessEngine, &CancellationToken::new()),
            Err(BooleanError::Config(_))
        ));
    }
}
