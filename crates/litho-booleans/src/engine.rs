//! Backend seam and the composer that drives it.

use litho_mesh::TriangleMesh;
use litho_pipeline::CancellationToken;
use log::info;

use crate::error::Result;
use crate::in_process::InProcessEngine;
use crate::operation::{plan, BooleanOperation, FeatureMesh};

/// Executes a fold of boolean operations.
pub trait BooleanEngine: Send + Sync {
    /// Short name for logs.
    fn name(&self) -> &str;

    /// Apply `operations` in order and return the final result.
    ///
    /// `operations` is non-empty and its first entry has a concrete left
    /// operand. Implementations stop with [`BooleanError::Cancelled`] once
    /// `cancel` is set.
    ///
    /// [`BooleanError::Cancelled`]: crate::BooleanError::Cancelled
    fn apply(
        &self,
        operations: &[BooleanOperation<'_>],
        cancel: &CancellationToken,
    ) -> Result<TriangleMesh>;
}

/// Folds feature meshes onto a base mesh with an injected backend.
pub struct BooleanComposer {
    engine: Box<dyn BooleanEngine>,
}

impl BooleanComposer {
    /// Composer over `engine`.
    pub fn new(engine: Box<dyn BooleanEngine>) -> Self {
        Self { engine }
    }

    /// Composer using the in-process CSG backend.
    pub fn in_process() -> Self {
        Self::new(Box::new(InProcessEngine))
    }

    /// Name of the backend.
    pub fn engine_name(&self) -> &str {
        self.engine.name()
    }

    /// Apply every enabled feature to `base` in order.
    ///
    /// With no enabled features the base comes back unchanged.
    pub fn compose(
        &self,
        base: &TriangleMesh,
        features: &[FeatureMesh],
        cancel: &CancellationToken,
    ) -> Result<TriangleMesh> {
        let operations = plan(base, features);
        if operations.is_empty() {
            return Ok(base.clone());
        }

        info!(
            "composing {} boolean operations with the {} engine",
            operations.len(),
            self.engine.name()
        );
        self.engine.apply(&operations, cancel)
    }
}

impl Default for BooleanComposer {
    fn default() -> Self {
        Self::in_process()
    }
}

impl std::fmt::Debug for BooleanComposer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BooleanComposer")
            .field("engine", &self.engine.name())
            .finish()
    }
}
