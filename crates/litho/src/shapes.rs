//! Box and tube lithophanes as staged pipelines.
//!
//! Each part of a shape is its own step so the executor can report progress
//! and honour cancellation between parts. [`lithophane_pipeline`] also runs
//! the heightfield stages ahead of the shape.

use image::RgbaImage;
use litho_heightfield::{average_by_nozzle_size, extract, quantize_layers, Grid, HeightfieldSettings};
use litho_mesh::lithophane::{box_shape, check_grid, merge_parts, optimize_mesh, tube_shape};
use litho_mesh::{Triangle, TriangleMesh, DEFAULT_WELD_TOLERANCE};
use litho_pipeline::{Pipeline, ProgressSink, StepContext, StepError};
use log::debug;

use crate::error::Result;

/// Base shape of a lithophane.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShapeKind {
    /// Flat panel with a solid base.
    Box,
    /// Cylinder with the image wrapped around it.
    Tube,
}

impl ShapeKind {
    /// Pipeline description.
    pub fn description(self) -> &'static str {
        match self {
            ShapeKind::Box => "CreateBox",
            ShapeKind::Tube => "CreateTube",
        }
    }

    /// Step descriptions in execution order.
    pub fn step_names(self) -> &'static [&'static str] {
        match self {
            ShapeKind::Box => &[
                "Image Plane",
                "Image Base",
                "Bottom Plane",
                "Merge Meshes",
                "Optimize Mesh",
            ],
            ShapeKind::Tube => &[
                "Inner Tube",
                "Outer Tube",
                "Bottom Circle",
                "Top Circle",
                "Merge Meshes",
                "Optimize Mesh",
            ],
        }
    }

    /// Smallest grid as `(rows, columns)`.
    pub fn minimum_grid(self) -> (usize, usize) {
        match self {
            ShapeKind::Box => (2, 2),
            ShapeKind::Tube => (2, 3),
        }
    }

    /// Reject grids this shape cannot be built from.
    pub fn check(self, grid: &Grid) -> Result<()> {
        let (rows, cols) = self.minimum_grid();
        Ok(check_grid(grid, rows, cols)?)
    }

    /// Pipeline that builds this shape from a [`ShapeBuild`].
    pub fn pipeline(self, description: impl Into<String>) -> Pipeline<ShapeBuild> {
        self.add_steps(Pipeline::new(description))
    }

    fn add_steps(self, pipeline: Pipeline<ShapeBuild>) -> Pipeline<ShapeBuild> {
        match self {
            ShapeKind::Box => box_steps(pipeline),
            ShapeKind::Tube => tube_steps(pipeline),
        }
    }
}

/// Value threaded through the shape steps.
#[derive(Debug, Clone)]
pub struct ShapeBuild {
    source: Option<RgbaImage>,
    grid: Grid,
    max_height: f64,
    parts: Vec<Vec<Triangle>>,
    mesh: Option<TriangleMesh>,
}

impl ShapeBuild {
    /// Start a build from a grid.
    pub fn new(grid: Grid) -> Self {
        let max_height = grid.max_height().unwrap_or(0.0);
        Self {
            source: None,
            grid,
            max_height,
            parts: Vec::new(),
            mesh: None,
        }
    }

    /// Start a build from a raster, for [`lithophane_pipeline`].
    pub fn from_image(image: RgbaImage) -> Self {
        Self {
            source: Some(image),
            grid: Grid::default(),
            max_height: 0.0,
            parts: Vec::new(),
            mesh: None,
        }
    }

    /// Source grid. Empty until the heightfield has been extracted.
    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    /// Tallest extracted height (mm).
    pub fn max_height(&self) -> f64 {
        self.max_height
    }

    /// Parts generated so far and not yet merged.
    pub fn parts(&self) -> &[Vec<Triangle>] {
        &self.parts
    }

    /// Merged mesh, once the merge step has run.
    pub fn mesh(&self) -> Option<&TriangleMesh> {
        self.mesh.as_ref()
    }

    /// Grid and tallest extracted height, dropping any mesh.
    pub fn into_heightfield(self) -> (Grid, f64) {
        (self.grid, self.max_height)
    }

    /// Final mesh. Parts that were never merged are welded here.
    pub fn into_mesh(self) -> TriangleMesh {
        match self.mesh {
            Some(mesh) => mesh,
            None => merge(&self.parts),
        }
    }

    fn push_part(mut self, part: Vec<Triangle>) -> Self {
        self.parts.push(part);
        self
    }
}

fn merge(parts: &[Vec<Triangle>]) -> TriangleMesh {
    let parts: Vec<&[Triangle]> = parts.iter().map(Vec::as_slice).collect();
    merge_parts(&parts, DEFAULT_WELD_TOLERANCE)
}

fn merge_step(_: &StepContext, mut build: ShapeBuild) -> std::result::Result<ShapeBuild, StepError> {
    let mesh = merge(&build.parts);
    debug!(
        "merged {} parts into {} triangles",
        build.parts.len(),
        mesh.num_triangles()
    );
    build.parts.clear();
    build.mesh = Some(mesh);
    Ok(build)
}

fn optimize_step(_: &StepContext, mut build: ShapeBuild) -> std::result::Result<ShapeBuild, StepError> {
    let mesh = build.mesh.take().unwrap_or_else(|| merge(&build.parts));
    build.parts.clear();
    build.mesh = Some(optimize_mesh(mesh));
    Ok(build)
}

/// Box lithophane steps.
pub fn box_pipeline(description: impl Into<String>) -> Pipeline<ShapeBuild> {
    box_steps(Pipeline::new(description))
}

fn box_steps(pipeline: Pipeline<ShapeBuild>) -> Pipeline<ShapeBuild> {
    pipeline
        .step("Image Plane", |_, build: ShapeBuild| {
            let part = box_shape::image_plane(&build.grid);
            Ok(build.push_part(part))
        })
        .step("Image Base", |_, build: ShapeBuild| {
            let part = box_shape::image_base(&build.grid);
            Ok(build.push_part(part))
        })
        .step("Bottom Plane", |_, build: ShapeBuild| {
            let part = box_shape::bottom_plane(&build.grid);
            Ok(build.push_part(part))
        })
        .step("Merge Meshes", merge_step)
        .step("Optimize Mesh", optimize_step)
}

/// Tube lithophane steps.
pub fn tube_pipeline(description: impl Into<String>) -> Pipeline<ShapeBuild> {
    tube_steps(Pipeline::new(description))
}

fn tube_steps(pipeline: Pipeline<ShapeBuild>) -> Pipeline<ShapeBuild> {
    pipeline
        .step("Inner Tube", |_, build: ShapeBuild| {
            let params = tube_shape::TubeParameters::new(&build.grid);
            debug!(
                "tube radius {:.3}mm, {} points per line",
                params.radius, params.points_per_line
            );
            let part = tube_shape::inner_tube(&params);
            Ok(build.push_part(part))
        })
        .step("Outer Tube", |_, build: ShapeBuild| {
            let params = tube_shape::TubeParameters::new(&build.grid);
            let part = tube_shape::outer_tube(&build.grid, &params);
            Ok(build.push_part(part))
        })
        .step("Bottom Circle", |_, build: ShapeBuild| {
            let params = tube_shape::TubeParameters::new(&build.grid);
            let part = tube_shape::bottom_circle(&build.grid, &params);
            Ok(build.push_part(part))
        })
        .step("Top Circle", |_, build: ShapeBuild| {
            let params = tube_shape::TubeParameters::new(&build.grid);
            let part = tube_shape::top_circle(&build.grid, &params);
            Ok(build.push_part(part))
        })
        .step("Merge Meshes", merge_step)
        .step("Optimize Mesh", optimize_step)
}

/// Extraction, nozzle averaging and layer quantization as pipeline steps.
/// Start it with [`ShapeBuild::from_image`].
pub fn heightfield_pipeline(
    description: impl Into<String>,
    settings: HeightfieldSettings,
) -> Pipeline<ShapeBuild> {
    heightfield_steps(Pipeline::new(description), settings, None)
}

/// Heightfield stages followed by the shape steps. Start it with
/// [`ShapeBuild::from_image`].
///
/// The grid size is checked once quantization is done, so a raster that
/// resamples to too few samples fails at "Nearest Layer Height".
pub fn lithophane_pipeline(
    kind: ShapeKind,
    description: impl Into<String>,
    settings: HeightfieldSettings,
) -> Pipeline<ShapeBuild> {
    kind.add_steps(heightfield_steps(
        Pipeline::new(description),
        settings,
        Some(kind),
    ))
}

fn heightfield_steps(
    pipeline: Pipeline<ShapeBuild>,
    settings: HeightfieldSettings,
    shape: Option<ShapeKind>,
) -> Pipeline<ShapeBuild> {
    let (ppi, nozzle_size, layer_height) =
        (settings.ppi, settings.nozzle_size, settings.layer_height);

    pipeline
        .step("Extract Heightfield", move |_, mut build: ShapeBuild| {
            let Some(image) = build.source.take() else {
                return Err("no source image to extract".into());
            };
            let heightfield = extract(&image, &settings)?;
            debug!(
                "extracted {} x {} samples",
                heightfield.grid.column_count(),
                heightfield.grid.row_count()
            );
            build.grid = heightfield.grid;
            build.max_height = heightfield.max_height;
            Ok(build)
        })
        .step("Average By Nozzle Size", move |_, mut build: ShapeBuild| {
            build.grid = average_by_nozzle_size(std::mem::take(&mut build.grid), ppi, nozzle_size);
            Ok(build)
        })
        .step("Nearest Layer Height", move |_, mut build: ShapeBuild| {
            build.grid = quantize_layers(std::mem::take(&mut build.grid), layer_height);
            if let Some(kind) = shape {
                kind.check(&build.grid)?;
            }
            Ok(build)
        })
}

/// Run [`lithophane_pipeline`] on a raster and return the mesh.
pub fn build_lithophane<S: ProgressSink>(
    kind: ShapeKind,
    image: RgbaImage,
    settings: HeightfieldSettings,
    sink: S,
) -> Result<TriangleMesh> {
    settings.validate()?;
    let build = lithophane_pipeline(kind, kind.description(), settings)
        .run_to_completion(ShapeBuild::from_image(image), sink)?;
    Ok(build.into_mesh())
}

/// Build a shape from a grid on a background thread, reporting to `sink`.
pub fn build_shape<S: ProgressSink>(kind: ShapeKind, grid: Grid, sink: S) -> Result<TriangleMesh> {
    kind.check(&grid)?;
    let build = kind
        .pipeline(kind.description())
        .run_to_completion(ShapeBuild::new(grid), sink)?;
    Ok(build.into_mesh())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::LithoError;
    use image::Rgba;
    use litho_heightfield::Sample;
    use litho_mesh::lithophane::{build_box, build_tube};
    use litho_mesh::{validate_mesh, MeshError};
    use litho_pipeline::{NoProgress, PipelineError, ProgressEvent, RecordingProgress};

    fn grid(rows: usize, cols: usize) -> Grid {
        Grid::from_rows(
            (0..rows)
                .map(|r| {
                    (0..cols)
                        .map(|c| {
                            let height = 0.5 + ((r * 3 + c) % 5) as f64 * 0.5;
                            Sample::new(c as f64 * 0.4, r as f64 * 0.4, height)
                        })
                        .collect()
                })
                .collect(),
        )
        .unwrap()
    }

    #[test]
    fn test_step_names_match_pipelines() {
        for kind in [ShapeKind::Box, ShapeKind::Tube] {
            let pipeline = kind.pipeline(kind.description());
            assert_eq!(pipeline.step_descriptions(), kind.step_names());
        }
    }

    #[test]
    fn test_box_pipeline_matches_direct_build() {
        let g = grid(4, 5);
        let piped = build_shape(ShapeKind::Box, g.clone(), NoProgress).unwrap();
        let direct = build_box(&g).unwrap();

        assert_eq!(piped.num_triangles(), direct.num_triangles());
        assert_eq!(piped.num_vertices(), direct.num_vertices());
        assert!(validate_mesh(&piped).is_watertight());
    }

    #[test]
    fn test_tube_pipeline_matches_direct_build() {
        let g = grid(3, 8);
        let piped = build_shape(ShapeKind::Tube, g.clone(), NoProgress).unwrap();
        let direct = build_tube(&g).unwrap();

        assert_eq!(piped.num_triangles(), direct.num_triangles());
        assert!(validate_mesh(&piped).is_watertight());
        assert!(piped.signed_volume() > 0.0);
    }

    #[test]
    fn test_progress_reports_every_step() {
        let mut progress = RecordingProgress::default();
        build_shape(ShapeKind::Tube, grid(2, 4), &mut progress).unwrap();

        let started: Vec<&str> = progress
            .events
            .iter()
            .filter_map(|e| match e {
                ProgressEvent::StepStarted { description, .. } => Some(description.as_str()),
                _ => None,
            })
            .collect();
        assert_eq!(started, ShapeKind::Tube.step_names());
        assert!(matches!(
            progress.events.first(),
            Some(ProgressEvent::Started { total: 6, .. })
        ));
    }

    #[test]
    fn test_too_small_grid_rejected_before_run() {
        let mut progress = RecordingProgress::default();
        let err = build_shape(ShapeKind::Tube, grid(2, 2), &mut progress).unwrap_err();

        assert!(matches!(
            err,
            LithoError::Mesh(MeshError::GridTooSmall { min_cols: 3, .. })
        ));
        assert!(progress.events.is_empty());
    }

    #[test]
    fn test_full_pipeline_from_image() {
        let mut raster = RgbaImage::from_pixel(10, 10, Rgba([255, 255, 255, 255]));
        for x in 0..10 {
            raster.put_pixel(x, 4, Rgba([0, 0, 0, 255]));
        }
        let mut progress = RecordingProgress::default();
        let mesh = build_lithophane(
            ShapeKind::Box,
            raster,
            HeightfieldSettings::default(),
            &mut progress,
        )
        .unwrap();

        assert!(validate_mesh(&mesh).is_watertight());
        let started: Vec<&str> = progress
            .events
            .iter()
            .filter_map(|e| match e {
                ProgressEvent::StepStarted { description, .. } => Some(description.as_str()),
                _ => None,
            })
            .collect();
        assert_eq!(
            &started[..3],
            ["Extract Heightfield", "Average By Nozzle Size", "Nearest Layer Height"]
        );
        assert_eq!(&started[3..], ShapeKind::Box.step_names());
    }

    #[test]
    fn test_full_pipeline_rejects_tiny_result() {
        // 4x4 pixels average into a single sample
        let raster = RgbaImage::from_pixel(4, 4, Rgba([0, 0, 0, 255]));
        let err = build_lithophane(
            ShapeKind::Box,
            raster,
            HeightfieldSettings::default(),
            NoProgress,
        )
        .unwrap_err();

        match err {
            LithoError::Pipeline(PipelineError::StepFailed { step, .. }) => {
                assert_eq!(step, "Nearest Layer Height");
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn test_unmerged_build_still_yields_mesh() {
        let g = grid(2, 2);
        let build = ShapeBuild::new(g.clone()).push_part(box_shape::image_plane(&g));
        assert!(build.mesh().is_none());
        assert_eq!(build.parts().len(), 1);
        assert_eq!(build.into_mesh().num_triangles(), 2);
    }
}
