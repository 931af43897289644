//! litho - turn images into printable lithophanes
//!
//! Usage:
//!   litho box <image.png> -o <out.stl> [--ppi 300] [--subtract hanger.stl]
//!   litho tube <image.png> --config litho.toml
//!   litho import <image.png> -o <state.json>
//!   litho scale <image.png|state.json> --length 100
//!   litho measure <mesh.stl> --unit cm --decimals 2
//!   litho info <mesh.stl>
//!   litho engine <script> -- <config.json> <output.stl>

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{ArgGroup, Args, Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use litho::{
    measure, scale_image, BooleanBackend, BooleanMesh, BooleanSettings, ExecuteOutcome,
    LengthUnit, LithoConfig, LithophaneImage, ScaleTarget, ShapeKind,
};
use litho_booleans::{read_config, run_config, InProcessEngine};
use litho_heightfield::HeightfieldState;
use litho_mesh::{load_stl, save_stl, validate_mesh};
use litho_pipeline::{CancellationToken, LogProgress, ProgressEvent, ProgressSink};
use log::{debug, info, LevelFilter};

/// Generate box and tube lithophanes from images
#[derive(Parser, Debug)]
#[command(name = "litho")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Enable debug output
    #[arg(short, long, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Build a flat lithophane panel
    Box {
        #[command(flatten)]
        shape: ShapeArgs,
    },

    /// Build a cylindrical lithophane
    Tube {
        #[command(flatten)]
        shape: ShapeArgs,
    },

    /// Compute the heightfield of an image and save it as a state file
    Import {
        /// Input image
        #[arg(value_name = "IMAGE")]
        input: PathBuf,

        /// Output state file (defaults to the image path with .json)
        #[arg(short, long, value_name = "OUTPUT")]
        output: Option<PathBuf>,

        #[command(flatten)]
        settings: SettingsArgs,
    },

    /// Adjust ppi so the lithophane reaches a target length or width
    #[command(group(ArgGroup::new("target").required(true).args(["length", "width"])))]
    Scale {
        /// Input image or state file
        #[arg(value_name = "INPUT")]
        input: PathBuf,

        /// Target length along x in mm
        #[arg(long)]
        length: Option<f64>,

        /// Target width along y in mm
        #[arg(long)]
        width: Option<f64>,

        /// Output state file (defaults to the input path with .json)
        #[arg(short, long, value_name = "OUTPUT")]
        output: Option<PathBuf>,

        #[command(flatten)]
        settings: SettingsArgs,
    },

    /// Display the bounding box dimensions of an STL file
    Measure {
        /// Input STL file
        #[arg(value_name = "INPUT")]
        input: PathBuf,

        /// Length unit: mm, cm, m or in
        #[arg(long, default_value = "mm")]
        unit: String,

        /// Number of decimals
        #[arg(long, default_value = "2")]
        decimals: usize,
    },

    /// Display information about an STL file
    Info {
        /// Input STL file
        #[arg(value_name = "INPUT")]
        input: PathBuf,
    },

    /// Run a boolean config with the built-in CSG, as an external engine
    Engine {
        /// Engine script (accepted for compatibility, not used)
        #[arg(value_name = "SCRIPT")]
        script: Option<PathBuf>,

        /// Config file and output STL, after `--`
        #[arg(last = true, num_args = 2, value_names = ["CONFIG", "OUTPUT"])]
        files: Vec<PathBuf>,
    },
}

#[derive(Args, Debug)]
struct SettingsArgs {
    /// Config file (TOML); ./litho.toml is used when present
    #[arg(short, long, value_name = "CONFIG")]
    config: Option<PathBuf>,

    /// Pixels per inch of the image
    #[arg(long)]
    ppi: Option<f64>,

    /// Height for white pixels in mm
    #[arg(long)]
    base_height: Option<f64>,

    /// Height for black pixels in mm
    #[arg(long)]
    max_height: Option<f64>,

    /// Nozzle diameter in mm (0 disables averaging)
    #[arg(long)]
    nozzle_size: Option<f64>,

    /// Layer height in mm (0 disables rounding)
    #[arg(long)]
    layer_height: Option<f64>,
}

impl SettingsArgs {
    /// Config file with command-line overrides applied, and whether any
    /// override was given.
    fn load(&self) -> Result<(LithoConfig, bool)> {
        let mut config =
            LithoConfig::discover(self.config.as_deref()).context("Failed to load config")?;

        let settings = &mut config.lithophane;
        let overrides = [
            (&mut settings.ppi, self.ppi),
            (&mut settings.base_height, self.base_height),
            (&mut settings.max_height, self.max_height),
            (&mut settings.nozzle_size, self.nozzle_size),
            (&mut settings.layer_height, self.layer_height),
        ];
        let mut overridden = false;
        for (field, value) in overrides {
            if let Some(value) = value {
                *field = value;
                overridden = true;
            }
        }

        config.validate().context("Invalid settings")?;
        Ok((config, overridden))
    }
}

#[derive(Args, Debug)]
struct ShapeArgs {
    /// Input image, or a state file written by `litho import`
    #[arg(value_name = "INPUT")]
    input: PathBuf,

    /// Output STL file (defaults to <image>_Result.stl next to the input)
    #[arg(short, long, value_name = "OUTPUT")]
    output: Option<PathBuf>,

    #[command(flatten)]
    settings: SettingsArgs,

    /// STL to union with the lithophane; repeatable, applied in order
    #[arg(long = "add", value_name = "STL")]
    add: Vec<PathBuf>,

    /// STL to cut out of the lithophane; repeatable, applied after --add
    #[arg(long = "subtract", value_name = "STL")]
    subtract: Vec<PathBuf>,

    /// Boolean backend: in-process or external
    #[arg(long, value_parser = parse_backend)]
    backend: Option<BooleanBackend>,

    /// External engine executable (e.g. blender)
    #[arg(long, value_name = "EXE")]
    engine: Option<PathBuf>,

    /// Script passed to the external engine
    #[arg(long, value_name = "SCRIPT")]
    script: Option<PathBuf>,

    /// External engine timeout in seconds
    #[arg(long, value_name = "SECS")]
    timeout: Option<u64>,
}

impl ShapeArgs {
    fn boolean_settings(&self, mut settings: BooleanSettings) -> BooleanSettings {
        if let Some(backend) = self.backend {
            settings.backend = backend;
        }
        if let Some(engine) = &self.engine {
            settings.engine = Some(engine.clone());
            if self.backend.is_none() {
                settings.backend = BooleanBackend::External;
            }
        }
        if let Some(script) = &self.script {
            settings.script = Some(script.clone());
        }
        if let Some(timeout) = self.timeout {
            settings.timeout_secs = timeout;
        }
        settings
    }
}

fn parse_backend(s: &str) -> std::result::Result<BooleanBackend, String> {
    match s {
        "in-process" => Ok(BooleanBackend::InProcess),
        "external" => Ok(BooleanBackend::External),
        other => Err(format!(
            "unknown backend '{other}' (expected in-process or external)"
        )),
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_level = if cli.debug {
        LevelFilter::Debug
    } else if cli.verbose {
        LevelFilter::Info
    } else {
        LevelFilter::Warn
    };

    env_logger::Builder::new()
        .filter_level(log_level)
        .format_timestamp(None)
        .init();

    match cli.command {
        Commands::Box { shape } => cmd_shape(ShapeKind::Box, shape),
        Commands::Tube { shape } => cmd_shape(ShapeKind::Tube, shape),
        Commands::Import {
            input,
            output,
            settings,
        } => cmd_import(input, output, settings),
        Commands::Scale {
            input,
            length,
            width,
            output,
            settings,
        } => cmd_scale(input, length, width, output, settings),
        Commands::Measure {
            input,
            unit,
            decimals,
        } => cmd_measure(input, unit, decimals),
        Commands::Info { input } => cmd_info(input),
        Commands::Engine { script, files } => cmd_engine(script, files),
    }
}

fn is_state_file(path: &Path) -> bool {
    path.extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json"))
}

/// Open an image or a state file. Images are extracted on first use; a
/// state file keeps its grid unless `stale` is set.
fn open_input(input: &Path, config: &LithoConfig, stale: bool) -> Result<LithophaneImage> {
    if !is_state_file(input) {
        info!("Loading image: {}", input.display());
        return Ok(LithophaneImage::new(input, config.lithophane.clone()));
    }

    info!("Loading state: {}", input.display());
    let json = fs::read_to_string(input)
        .with_context(|| format!("Failed to read {}", input.display()))?;
    let state = HeightfieldState::from_json(&json).context("Failed to parse state file")?;
    let mut image = LithophaneImage::from_state(&state, config.lithophane.clone())
        .context("Failed to restore state")?;
    if image.name().is_empty() {
        if let Some(stem) = input.file_stem() {
            image.set_name(stem.to_string_lossy());
        }
    }
    if stale {
        image.invalidate();
    }
    Ok(image)
}

/// Run the heightfield pipeline if the grid is missing or out of date.
fn ensure_computed(image: &mut LithophaneImage) -> Result<()> {
    if image.needs_recompute() {
        let progress = BarProgress::new()?;
        image.recompute_with(progress).with_context(|| {
            format!("Failed to compute heightfield for {}", image.path().display())
        })?;
    }
    Ok(())
}

fn feature_name(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "Feature".to_string())
}

fn cmd_shape(kind: ShapeKind, args: ShapeArgs) -> Result<()> {
    let (config, overridden) = args.settings.load()?;
    let booleans = args.boolean_settings(config.booleans.clone());
    let composer = booleans
        .composer()
        .context("Invalid boolean backend settings")?;

    let image = open_input(&args.input, &config, overridden)?;
    let mut lithophane = BooleanMesh::new(kind)
        .with_image(image)
        .with_composer(composer);

    for path in &args.add {
        let mesh = load_stl(path).with_context(|| format!("Failed to load {}", path.display()))?;
        lithophane.add_additive_feature(feature_name(path), mesh);
    }
    for path in &args.subtract {
        let mesh = load_stl(path).with_context(|| format!("Failed to load {}", path.display()))?;
        lithophane.add_subtractive_feature(feature_name(path), mesh);
    }

    let progress = BarProgress::new()?;
    let outcome = lithophane
        .execute(progress, &CancellationToken::new())
        .with_context(|| format!("Failed to build {}", kind.description()))?;
    match outcome {
        ExecuteOutcome::Computed => {}
        ExecuteOutcome::Cancelled => bail!("Cancelled"),
        ExecuteOutcome::Skipped(notice) => bail!("{notice}"),
    }

    let output = args.output.clone().unwrap_or_else(|| {
        args.input
            .with_file_name(format!("{}.stl", lithophane.result_name()))
    });
    let mesh = lithophane
        .take_result()
        .context("No result was computed")?;
    save_stl(&mesh, &output).with_context(|| format!("Failed to write {}", output.display()))?;

    println!(
        "Wrote {} triangles to {}",
        mesh.num_triangles(),
        output.display()
    );
    Ok(())
}

fn write_state(image: &LithophaneImage, output: &Path) -> Result<()> {
    let json = image
        .to_state()
        .and_then(|state| Ok(state.to_json()?))
        .context("Failed to serialize state")?;
    fs::write(output, json).with_context(|| format!("Failed to write {}", output.display()))
}

fn print_size(image: &LithophaneImage) {
    if let (Some(length), Some(width)) = (image.length(), image.width()) {
        println!("  Size: {:.3} x {:.3} mm", length, width);
    }
    println!("  Max height: {:.3} mm", image.max_height());
}

fn cmd_import(input: PathBuf, output: Option<PathBuf>, settings: SettingsArgs) -> Result<()> {
    let (config, _) = settings.load()?;
    let mut image = open_input(&input, &config, true)?;
    ensure_computed(&mut image)?;
    let output = output.unwrap_or_else(|| input.with_extension("json"));
    write_state(&image, &output)?;

    let grid = image.require_grid()?;
    println!("Imported {}:", image.name());
    println!(
        "  Grid: {} x {} samples",
        grid.column_count(),
        grid.row_count()
    );
    print_size(&image);
    println!("  State: {}", output.display());
    Ok(())
}

fn cmd_scale(
    input: PathBuf,
    length: Option<f64>,
    width: Option<f64>,
    output: Option<PathBuf>,
    settings: SettingsArgs,
) -> Result<()> {
    let target = match (length, width) {
        (Some(length), _) => ScaleTarget::Length(length),
        (None, Some(width)) => ScaleTarget::Width(width),
        (None, None) => bail!("Either --length or --width is required"),
    };

    let (config, overridden) = settings.load()?;
    let mut image = open_input(&input, &config, overridden)?;
    ensure_computed(&mut image)?;
    let old_ppi = image.settings().ppi;
    let new_ppi = scale_image(&mut image, target).context("Failed to scale")?;

    let output = output.unwrap_or_else(|| input.with_extension("json"));
    write_state(&image, &output)?;

    println!("Scaled {}:", image.name());
    println!("  ppi: {:.3} -> {:.3}", old_ppi, new_ppi);
    print_size(&image);
    println!("  State: {}", output.display());
    Ok(())
}

fn cmd_measure(input: PathBuf, unit: String, decimals: usize) -> Result<()> {
    let unit: LengthUnit = unit.parse()?;
    let mesh = load_stl(&input).context("Failed to load STL file")?;
    let Some(dimensions) = measure(&mesh) else {
        bail!("{} contains no triangles", input.display());
    };

    println!("Bounding Information:");
    println!("{}", dimensions.message(unit, decimals));
    Ok(())
}

fn cmd_info(input: PathBuf) -> Result<()> {
    info!("Loading STL file: {}", input.display());

    let mesh = load_stl(&input).context("Failed to load STL file")?;
    let report = validate_mesh(&mesh);
    let bb = report.bounds;

    println!("Mesh Information:");
    println!("  File: {}", input.display());
    println!("  Bounding box:");
    println!(
        "    Min: ({:.3}, {:.3}, {:.3}) mm",
        bb.min.x, bb.min.y, bb.min.z
    );
    println!(
        "    Max: ({:.3}, {:.3}, {:.3}) mm",
        bb.max.x, bb.max.y, bb.max.z
    );
    println!(
        "    Size: {:.3} x {:.3} x {:.3} mm",
        bb.length(),
        bb.width(),
        bb.height()
    );
    println!("  Surface area: {:.2} mm²", mesh.surface_area());
    for line in report.to_string().lines() {
        println!("  {line}");
    }
    Ok(())
}

fn cmd_engine(script: Option<PathBuf>, files: Vec<PathBuf>) -> Result<()> {
    let [config, output] = files.as_slice() else {
        bail!("Expected -- <CONFIG> <OUTPUT>");
    };
    if let Some(script) = &script {
        debug!("Ignoring engine script {}", script.display());
    }

    let records = read_config(config)
        .with_context(|| format!("Failed to read config {}", config.display()))?;
    info!("Running {} boolean operations", records.len());

    let mesh = run_config(&records, &InProcessEngine, &CancellationToken::new())
        .context("Boolean operations failed")?;
    save_stl(&mesh, output).with_context(|| format!("Failed to write {}", output.display()))?;
    Ok(())
}

/// Step progress on a terminal bar, mirrored to the log.
struct BarProgress {
    bar: ProgressBar,
}

impl BarProgress {
    fn new() -> Result<Self> {
        let bar = ProgressBar::new(0);
        bar.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")?
                .progress_chars("#>-"),
        );
        Ok(Self { bar })
    }
}

impl ProgressSink for BarProgress {
    fn event(&mut self, event: &ProgressEvent) {
        LogProgress.event(event);

        match event {
            ProgressEvent::Started { description, total } => {
                self.bar.set_length(*total as u64);
                self.bar.set_position(0);
                self.bar.set_message(description.clone());
            }
            ProgressEvent::StepStarted { description, .. } => {
                self.bar.set_message(description.clone());
            }
            ProgressEvent::StepFinished { .. } => self.bar.inc(1),
            ProgressEvent::Finished { description, total } => {
                self.bar.finish_with_message(format!(
                    "{description} took {:.3} s",
                    total.as_secs_f64()
                ));
            }
            ProgressEvent::Cancelled { description } => {
                self.bar
                    .abandon_with_message(format!("{description} cancelled"));
            }
            ProgressEvent::Failed { step } => {
                self.bar.abandon_with_message(format!("failed at {step}"));
            }
        }
    }

    fn idle(&mut self) {
        self.bar.tick();
    }
}
