//! BSP CSG backend.

use litho_mesh::TriangleMesh;
use litho_pipeline::CancellationToken;
use log::debug;

use crate::csg;
use crate::engine::BooleanEngine;
use crate::error::{BooleanError, Result};
use crate::operation::{BooleanMode, BooleanOperation, Operand};

/// Runs the fold in this process with [`csg::union`] and
/// [`csg::difference`]. Cancellation is checked before every operation.
#[derive(Debug, Clone, Copy, Default)]
pub struct InProcessEngine;

impl BooleanEngine for InProcessEngine {
    fn name(&self) -> &str {
        "in-process"
    }

    fn apply(
        &self,
        operations: &[BooleanOperation<'_>],
        cancel: &CancellationToken,
    ) -> Result<TriangleMesh> {
        let mut result: Option<TriangleMesh> = None;

        for (i, op) in operations.iter().enumerate() {
            cancel.check()?;

            let left = match op.left {
                Operand::Mesh(mesh) => mesh,
                Operand::PriorResult => result.as_ref().ok_or_else(|| {
                    BooleanError::Config(format!(
                        "operation {} uses the prior result but none exists",
                        i + 1
                    ))
                })?,
            };

            let next = match op.mode {
                BooleanMode::Union => csg::union(left, op.right),
                BooleanMode::Difference => csg::difference(left, op.right),
            };
            debug!(
                "{} '{}' ({}/{}): {} triangles",
                op.mode.label(),
                op.name,
                i + 1,
                operations.len(),
                next.num_triangles()
            );
            result = Some(next);
        }

        result.ok_or_else(|| BooleanError::Config("no operations to apply".into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::operation::{plan, FeatureMesh};
    use approx::assert_relative_eq;
    use litho_mesh::Point3;

    fn cuboid(min: [f64; 3], max: [f64; 3]) -> TriangleMesh {
        TriangleMesh::cuboid(
            Point3::new(min[0], min[1], min[2]),
            Point3::new(max[0], max[1], max[2]),
        )
    }

    #[test]
    fn test_fold_union_then_difference() {
        let base = cuboid([0.0, 0.0, 0.0], [4.0, 4.0, 1.0]);
        let features = [
            FeatureMesh::additive("Stand", cuboid([0.5, 0.5, 0.5], [3.5, 1.5, 3.0])),
            FeatureMesh::subtractive("Hole", cuboid([2.0, 2.0, -1.0], [3.0, 3.0, 2.0])),
        ];

        let result = InProcessEngine
            .apply(&plan(&base, &features), &CancellationToken::new())
            .unwrap();

        // slab 16 + stand above the slab 3*1*2 - hole through the slab 1
        assert_relative_eq!(result.signed_volume(), 21.0, epsilon = 1e-9);
        assert_relative_eq!(result.bounds().height(), 3.0, epsilon = 1e-12);
    }

    #[test]
    fn test_prior_result_without_start_is_rejected() {
        let right = cuboid([0.0, 0.0, 0.0], [1.0, 1.0, 1.0]);
        let ops = [BooleanOperation {
            mode: BooleanMode::Union,
            left: Operand::PriorResult,
            right: &right,
            name: "orphan",
        }];
        assert!(matches!(
            InProcessEngine.apply(&ops, &CancellationToken::new()),
            Err(BooleanError::Config(_))
        ));
    }

    #[test]
    fn test_empty_operations_rejected() {
        assert!(InProcessEngine
            .apply(&[], &CancellationToken::new())
            .is_err());
    }
}
