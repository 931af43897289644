//! The image feature: a source raster, its settings and the computed grid.

use std::path::{Path, PathBuf};

use image::RgbaImage;
use litho_heightfield::{load_image, Grid, HeightfieldSettings, HeightfieldState};
use litho_pipeline::{NoProgress, ProgressSink};
use log::{debug, info};

use crate::error::{LithoError, Result};
use crate::shapes::{heightfield_pipeline, ShapeBuild};

/// An image prepared for lithophane generation.
///
/// The raster is only reloaded from disk when [`path`](Self::path) changes;
/// changing settings just recomputes the grid. The grid is built by
/// [`heightfield_pipeline`] on the executor's worker thread.
#[derive(Debug, Clone)]
pub struct LithophaneImage {
    name: String,
    path: PathBuf,
    settings: HeightfieldSettings,
    image: Option<RgbaImage>,
    last_path: Option<PathBuf>,
    grid: Option<Grid>,
    max_height: f64,
}

impl LithophaneImage {
    /// Image feature for a file. Nothing is read until
    /// [`recompute`](Self::recompute).
    pub fn new(path: impl Into<PathBuf>, settings: HeightfieldSettings) -> Self {
        let path = path.into();
        Self {
            name: name_from_path(&path),
            path,
            settings,
            image: None,
            last_path: None,
            grid: None,
            max_height: 0.0,
        }
    }

    /// Load and compute in one go.
    pub fn open(path: impl Into<PathBuf>, settings: HeightfieldSettings) -> Result<Self> {
        let mut image = Self::new(path, settings);
        image.recompute()?;
        Ok(image)
    }

    /// Image feature for an already decoded raster.
    pub fn from_image(
        name: impl Into<String>,
        image: RgbaImage,
        settings: HeightfieldSettings,
    ) -> Result<Self> {
        let mut feature = Self {
            name: name.into(),
            path: PathBuf::new(),
            settings,
            image: Some(image),
            last_path: Some(PathBuf::new()),
            grid: None,
            max_height: 0.0,
        };
        feature.recompute()?;
        Ok(feature)
    }

    /// Restore from the persisted form. Settings are not part of the state.
    pub fn from_state(state: &HeightfieldState, settings: HeightfieldSettings) -> Result<Self> {
        let path = PathBuf::from(&state.last_image_path);
        Ok(Self {
            name: name_from_path(&path),
            image: Some(state.image()?),
            grid: Some(state.grid()?),
            last_path: Some(path.clone()),
            path,
            settings,
            max_height: state.max_height_observed,
        })
    }

    /// Persisted form of the loaded image and computed grid.
    pub fn to_state(&self) -> Result<HeightfieldState> {
        let (Some(image), Some(grid)) = (&self.image, &self.grid) else {
            return Err(LithoError::NotComputed(self.name.clone()));
        };
        let last_path = self.last_path.as_deref().unwrap_or(&self.path);
        Ok(HeightfieldState::capture(
            image,
            last_path.to_string_lossy(),
            grid,
            self.max_height,
        )?)
    }

    /// Feature name, the file stem for images loaded from disk.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Rename the feature.
    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    /// Source path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Point at another file. Takes effect on the next recompute.
    pub fn set_path(&mut self, path: impl Into<PathBuf>) {
        self.path = path.into();
    }

    /// Current settings.
    pub fn settings(&self) -> &HeightfieldSettings {
        &self.settings
    }

    /// Replace settings. Takes effect on the next recompute.
    pub fn set_settings(&mut self, settings: HeightfieldSettings) {
        self.settings = settings;
    }

    /// Change ppi. Takes effect on the next recompute.
    pub fn set_ppi(&mut self, ppi: f64) {
        self.settings.ppi = ppi;
    }

    /// Whether the next recompute reads the file again.
    pub fn needs_reload(&self) -> bool {
        self.image.is_none() || self.last_path.as_deref() != Some(self.path.as_path())
    }

    /// Whether the grid is missing or the source path changed.
    pub fn needs_recompute(&self) -> bool {
        self.grid.is_none() || self.needs_reload()
    }

    /// Drop the computed grid, so the next run rebuilds it.
    pub fn invalidate(&mut self) {
        self.grid = None;
    }

    /// Reload the image if the path changed, then rebuild the grid.
    pub fn recompute(&mut self) -> Result<()> {
        self.recompute_with(NoProgress)
    }

    /// Like [`recompute`](Self::recompute), reporting the heightfield steps
    /// to `sink`.
    pub fn recompute_with<S: ProgressSink>(&mut self, sink: S) -> Result<()> {
        let source = self.prepare_source()?;
        debug!("{}: recomputing grid at {} ppi", self.name, self.settings.ppi);

        let (grid, max_height) = heightfield_pipeline(self.name.clone(), self.settings.clone())
            .run_to_completion(ShapeBuild::from_image(source), sink)?
            .into_heightfield();
        self.store_heightfield(grid, max_height);
        Ok(())
    }

    /// Validate settings and hand out the raster to extract from, reading it
    /// again if the path changed.
    pub(crate) fn prepare_source(&mut self) -> Result<RgbaImage> {
        self.settings.validate()?;

        if self.needs_reload() {
            info!("{}: reloading image {}", self.name, self.path.display());
            self.image = Some(load_image(&self.path)?);
            self.last_path = Some(self.path.clone());
        }
        self.image
            .clone()
            .ok_or_else(|| LithoError::NotComputed(self.name.clone()))
    }

    pub(crate) fn store_heightfield(&mut self, grid: Grid, max_height: f64) {
        self.grid = Some(grid);
        self.max_height = max_height;
    }

    /// Loaded raster.
    pub fn image(&self) -> Option<&RgbaImage> {
        self.image.as_ref()
    }

    /// Computed grid.
    pub fn grid(&self) -> Option<&Grid> {
        self.grid.as_ref()
    }

    /// Computed grid, or an error naming this feature.
    pub fn require_grid(&self) -> Result<&Grid> {
        self.grid
            .as_ref()
            .ok_or_else(|| LithoError::NotComputed(self.name.clone()))
    }

    /// Tallest sample height seen during extraction (mm).
    pub fn max_height(&self) -> f64 {
        self.max_height
    }

    /// Physical extent along x (mm).
    pub fn length(&self) -> Option<f64> {
        self.grid.as_ref().map(Grid::length)
    }

    /// Physical extent along y (mm).
    pub fn width(&self) -> Option<f64> {
        self.grid.as_ref().map(Grid::width)
    }
}

fn name_from_path(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "Image".to_string())
}
