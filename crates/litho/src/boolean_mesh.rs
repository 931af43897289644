//! A lithophane shape with boolean features applied on top.

use litho_booleans::{BooleanComposer, BooleanError, FeatureMesh};
use litho_mesh::TriangleMesh;
use litho_pipeline::{CancellationToken, Outcome, ProgressSink};
use log::{debug, info, warn};

use crate::error::Result;
use crate::lithophane_image::LithophaneImage;
use crate::shapes::{lithophane_pipeline, ShapeBuild, ShapeKind};

/// Something the user has to fix before a feature can be computed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserNotice {
    /// Short headline.
    pub title: String,
    /// What to do about it.
    pub message: String,
}

impl UserNotice {
    /// Notice with a title and message.
    pub fn new(title: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            message: message.into(),
        }
    }
}

impl std::fmt::Display for UserNotice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.title, self.message)
    }
}

/// How an [`BooleanMesh::execute`] call ended when it did not fail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExecuteOutcome {
    /// The result mesh was rebuilt.
    Computed,
    /// The run was cancelled. The previous result is kept.
    Cancelled,
    /// A precondition was not met. Nothing ran.
    Skipped(UserNotice),
}

/// Base shape built from an image, then folded with boolean features.
#[derive(Debug)]
pub struct BooleanMesh {
    shape: ShapeKind,
    image: Option<LithophaneImage>,
    features: Vec<FeatureMesh>,
    composer: BooleanComposer,
    result: Option<TriangleMesh>,
}

impl BooleanMesh {
    /// Feature of the given shape with no image and the in-process backend.
    pub fn new(shape: ShapeKind) -> Self {
        Self {
            shape,
            image: None,
            features: Vec::new(),
            composer: BooleanComposer::in_process(),
            result: None,
        }
    }

    /// Link an image.
    pub fn with_image(mut self, image: LithophaneImage) -> Self {
        self.image = Some(image);
        self
    }

    /// Use another boolean backend.
    pub fn with_composer(mut self, composer: BooleanComposer) -> Self {
        self.composer = composer;
        self
    }

    /// Base shape.
    pub fn shape(&self) -> ShapeKind {
        self.shape
    }

    /// Link or unlink an image.
    pub fn set_image(&mut self, image: Option<LithophaneImage>) {
        self.image = image;
    }

    /// Linked image.
    pub fn image(&self) -> Option<&LithophaneImage> {
        self.image.as_ref()
    }

    /// Linked image, mutably.
    pub fn image_mut(&mut self) -> Option<&mut LithophaneImage> {
        self.image.as_mut()
    }

    /// Swap the boolean backend.
    pub fn set_composer(&mut self, composer: BooleanComposer) {
        self.composer = composer;
    }

    /// Append a feature that is unioned with the base.
    pub fn add_additive_feature(&mut self, name: impl Into<String>, mesh: TriangleMesh) {
        self.features.push(FeatureMesh::additive(name, mesh));
    }

    /// Append a feature that is cut out of the base.
    pub fn add_subtractive_feature(&mut self, name: impl Into<String>, mesh: TriangleMesh) {
        self.features.push(FeatureMesh::subtractive(name, mesh));
    }

    /// Features in application order.
    pub fn features(&self) -> &[FeatureMesh] {
        &self.features
    }

    /// Features, for toggling or reordering.
    pub fn features_mut(&mut self) -> &mut Vec<FeatureMesh> {
        &mut self.features
    }

    /// `<image>_Result`, or `Result` without an image.
    pub fn result_name(&self) -> String {
        match &self.image {
            Some(image) => format!("{}_Result", image.name()),
            None => "Result".to_string(),
        }
    }

    /// Last computed result.
    pub fn result(&self) -> Option<&TriangleMesh> {
        self.result.as_ref()
    }

    /// Take the last computed result.
    pub fn take_result(&mut self) -> Option<TriangleMesh> {
        self.result.take()
    }

    /// Build the base shape on a background thread, then apply the
    /// features.
    ///
    /// When the image needs a recompute its heightfield stages run in the
    /// same pipeline ahead of the shape steps, and the new grid is stored
    /// back on the image. A missing image yields [`ExecuteOutcome::Skipped`].
    /// Setting `cancel` stops the run at the next step boundary or between
    /// boolean operations.
    pub fn execute<S: ProgressSink>(
        &mut self,
        sink: S,
        cancel: &CancellationToken,
    ) -> Result<ExecuteOutcome> {
        let Some(image) = self.image.as_mut() else {
            return Ok(ExecuteOutcome::Skipped(UserNotice::new(
                "No LithophaneImage linked",
                "Please link a lithophane Image to the mesh to calculate the geometry",
            )));
        };

        let description = format!("{} (Base)", self.shape.description());
        let recompute = image.needs_recompute();
        let (pipeline, start) = if recompute {
            debug!("{}: heightfield is stale, extracting in the pipeline", image.name());
            let source = image.prepare_source()?;
            (
                lithophane_pipeline(self.shape, description, image.settings().clone()),
                ShapeBuild::from_image(source),
            )
        } else {
            let grid = image.require_grid()?.clone();
            self.shape.check(&grid)?;
            (self.shape.pipeline(description), ShapeBuild::new(grid))
        };

        let outcome = pipeline.with_cancellation(cancel.clone()).run(
            start,
            sink,
            |build| build,
            |err| warn!("base mesh failed: {err}"),
        );
        let build = match outcome {
            Outcome::Completed(build) => build,
            Outcome::Cancelled => return Ok(ExecuteOutcome::Cancelled),
            Outcome::Failed(err) => return Err(err.into()),
        };

        if recompute {
            image.store_heightfield(build.grid().clone(), build.max_height());
        }
        let base = build.into_mesh();

        match self.composer.compose(&base, &self.features, cancel) {
            Ok(mesh) => {
                info!(
                    "{}: {} triangles after {} features",
                    self.result_name(),
                    mesh.num_triangles(),
                    self.features.iter().filter(|f| f.enabled).count()
                );
                self.result = Some(mesh);
                Ok(ExecuteOutcome::Computed)
            }
            Err(BooleanError::Cancelled) => Ok(ExecuteOutcome::Cancelled),
            Err(err) => Err(err.into()),
        }
    }
}
