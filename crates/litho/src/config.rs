//! `litho.toml` configuration.
//!
//! ```toml
//! [lithophane]
//! ppi = 300.0
//! base_height = 0.5
//! max_height = 3.0
//! nozzle_size = 0.4
//! layer_height = 0.1
//!
//! [booleans]
//! backend = "external"
//! engine = "/usr/bin/blender"
//! batch_args = ["-b", "-P"]
//! timeout_secs = 600
//! ```
//!
//! Every key is optional.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use litho_booleans::{BooleanComposer, BooleanError, ExternalEngine, DEFAULT_BATCH_ARGS, DEFAULT_TIMEOUT};
use litho_heightfield::HeightfieldSettings;
use serde::{Deserialize, Serialize};

use crate::error::{LithoError, Result};

/// Name of the config file looked up in the working directory.
pub const CONFIG_FILE_NAME: &str = "litho.toml";

/// Which backend performs boolean composition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BooleanBackend {
    /// BSP CSG in this process.
    #[default]
    InProcess,
    /// An external engine such as Blender.
    External,
}

/// `[booleans]` section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BooleanSettings {
    /// Backend selection.
    pub backend: BooleanBackend,
    /// Engine executable for the external backend.
    pub engine: Option<PathBuf>,
    /// Arguments placed before the script path.
    pub batch_args: Vec<String>,
    /// Script passed to the engine. The bundled Blender script is used when
    /// unset.
    pub script: Option<PathBuf>,
    /// Seconds before the engine is killed.
    pub timeout_secs: u64,
}

impl Default for BooleanSettings {
    fn default() -> Self {
        Self {
            backend: BooleanBackend::InProcess,
            engine: None,
            batch_args: DEFAULT_BATCH_ARGS.iter().map(|s| s.to_string()).collect(),
            script: None,
            timeout_secs: DEFAULT_TIMEOUT.as_secs(),
        }
    }
}

impl BooleanSettings {
    /// Validate settings.
    pub fn validate(&self) -> Result<()> {
        if self.timeout_secs == 0 {
            return Err(LithoError::InvalidSetting(
                "booleans.timeout_secs must be positive".into(),
            ));
        }
        if self.backend == BooleanBackend::External
            && self.engine.as_ref().map_or(true, |p| p.as_os_str().is_empty())
        {
            return Err(BooleanError::EngineNotConfigured.into());
        }
        Ok(())
    }

    /// Composer for the configured backend.
    pub fn composer(&self) -> Result<BooleanComposer> {
        self.validate()?;
        Ok(match (self.backend, &self.engine) {
            (BooleanBackend::External, Some(engine)) => {
                let mut external = ExternalEngine::new(engine)
                    .with_batch_args(self.batch_args.iter().cloned())
                    .with_timeout(Duration::from_secs(self.timeout_secs));
                if let Some(script) = &self.script {
                    external = external.with_script(script);
                }
                BooleanComposer::new(Box::new(external))
            }
            _ => BooleanComposer::in_process(),
        })
    }
}

/// Whole config file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LithoConfig {
    /// `[lithophane]` section.
    pub lithophane: HeightfieldSettings,
    /// `[booleans]` section.
    pub booleans: BooleanSettings,
}

impl LithoConfig {
    /// Parse TOML text.
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Read and parse a config file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|e| LithoError::io(path, e))?;
        Self::from_toml_str(&text)
    }

    /// Read `path` if given, else `litho.toml` in the working directory if it
    /// exists, else defaults.
    pub fn discover(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::load(path),
            None if Path::new(CONFIG_FILE_NAME).is_file() => Self::load(CONFIG_FILE_NAME),
            None => Ok(Self::default()),
        }
    }

    /// Render as TOML.
    pub fn to_toml_string(&self) -> Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Validate both sections.
    pub fn validate(&self) -> Result<()> {
        self.lithophane.validate()?;
        self.booleans.validate()
    }
}
