//! Boolean operations and the left fold they form.

use litho_mesh::TriangleMesh;
use serde::{Deserialize, Serialize};

/// How a feature mesh combines with the running result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum BooleanMode {
    /// Add the feature's volume.
    Union,
    /// Carve the feature's volume out.
    Difference,
}

impl BooleanMode {
    /// Label used in logs.
    pub fn label(self) -> &'static str {
        match self {
            BooleanMode::Union => "Additive",
            BooleanMode::Difference => "Subtractive",
        }
    }
}

/// A named mesh applied to the base with a mode.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureMesh {
    /// Display name; also names the operand file for the external engine.
    pub name: String,
    /// The feature geometry.
    pub mesh: TriangleMesh,
    /// Union or difference.
    pub mode: BooleanMode,
    /// Disabled features are skipped.
    pub enabled: bool,
}

impl FeatureMesh {
    /// Enabled feature.
    pub fn new(name: impl Into<String>, mesh: TriangleMesh, mode: BooleanMode) -> Self {
        Self {
            name: name.into(),
            mesh,
            mode,
            enabled: true,
        }
    }

    /// Feature that adds volume.
    pub fn additive(name: impl Into<String>, mesh: TriangleMesh) -> Self {
        Self::new(name, mesh, BooleanMode::Union)
    }

    /// Feature that removes volume.
    pub fn subtractive(name: impl Into<String>, mesh: TriangleMesh) -> Self {
        Self::new(name, mesh, BooleanMode::Difference)
    }

    /// Set the enabled flag.
    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }
}

/// Left operand of an operation.
#[derive(Debug, Clone, Copy)]
pub enum Operand<'a> {
    /// A concrete mesh.
    Mesh(&'a TriangleMesh),
    /// The result of the previous operation.
    PriorResult,
}

/// One step of the fold: `left (mode) right`.
#[derive(Debug, Clone, Copy)]
pub struct BooleanOperation<'a> {
    /// Union or difference.
    pub mode: BooleanMode,
    /// Left operand.
    pub left: Operand<'a>,
    /// Right operand.
    pub right: &'a TriangleMesh,
    /// Name of the right operand.
    pub name: &'a str,
}

/// Fold `features` onto `base`: the first enabled feature combines with the
/// base, every later one with the prior result. Disabled features are
/// skipped.
pub fn plan<'a>(base: &'a TriangleMesh, features: &'a [FeatureMesh]) -> Vec<BooleanOperation<'a>> {
    features
        .iter()
        .filter(|f| f.enabled)
        .enumerate()
        .map(|(i, f)| BooleanOperation {
            mode: f.mode,
            left: if i == 0 {
                Operand::Mesh(base)
            } else {
                Operand::PriorResult
            },
            right: &f.mesh,
            name: &f.name,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use litho_mesh::Point3;

    fn unit_cube() -> TriangleMesh {
        TriangleMesh::cuboid(Point3::origin(), Point3::new(1.0, 1.0, 1.0))
    }

    #[test]
    fn test_mode_serializes_uppercase() {
        assert_eq!(serde_json::to_string(&BooleanMode::Union).unwrap(), "\"UNION\"");
        assert_eq!(
            serde_json::from_str::<BooleanMode>("\"DIFFERENCE\"").unwrap(),
            BooleanMode::Difference
        );
    }

    #[test]
    fn test_plan_skips_disabled_and_chains() {
        let base = unit_cube();
        let features = vec![
            FeatureMesh::additive("Off", unit_cube()).with_enabled(false),
            FeatureMesh::additive("Stand", unit_cube()),
            FeatureMesh::subtractive("Hole", unit_cube()),
        ];

        let ops = plan(&base, &features);
        assert_eq!(ops.len(), 2);
        assert!(matches!(ops[0].left, Operand::Mesh(m) if std::ptr::eq(m, &base)));
        assert_eq!(ops[0].name, "Stand");
        assert_eq!(ops[0].mode, BooleanMode::Union);
        assert!(matches!(ops[1].left, Operand::PriorResult));
        assert_eq!(ops[1].mode, BooleanMode::Difference);
    }

    #[test]
    fn test_plan_all_disabled_is_empty() {
        let base = unit_cube();
        let features = [FeatureMesh::subtractive("Off", unit_cube()).with_enabled(false)];
        assert!(plan(&base, &features).is_empty());
    }
}
