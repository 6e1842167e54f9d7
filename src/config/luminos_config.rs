use std::{
    fs,
    path::{Path, PathBuf},
    time::Duration,
};

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::config::{paths::ProjectPaths, scripting_config::ScriptingConfig};

pub const APP_NAME: &str = "luminos";

#[derive(Debug)]
pub enum ConfigLoadError {
    NotFound(PathBuf),
    ParseError(String),
    IoError(String),
}

impl std::fmt::Display for ConfigLoadError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigLoadError::NotFound(path) => {
                write!(f, "Config file not found: {}", path.display())
            }
            ConfigLoadError::ParseError(msg) => write!(f, "Failed to parse config: {}", msg),
            ConfigLoadError::IoError(msg) => write!(f, "IO error reading config: {}", msg),
        }
    }
}

impl std::error::Error for ConfigLoadError {}

/// Size of the coordinate space the script draws in
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CanvasConfig {
    pub width: f32,
    pub height: f32,
}

impl Default for CanvasConfig {
    fn default() -> Self {
        Self {
            width: 1280.0,
            height: 720.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Also write logs to `<data dir>/logs/luminos.log`
    #[serde(default = "default_true")]
    pub file: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self { file: true }
    }
}

fn default_true() -> bool {
    true
}

fn default_entry() -> PathBuf {
    PathBuf::from("scripts/program.lua")
}

fn default_frame_rate() -> u32 {
    60
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LuminosConfig {
    /// Entry-point program
    #[serde(default = "default_entry")]
    pub entry: PathBuf,

    /// Target frames per second
    #[serde(default = "default_frame_rate")]
    pub frame_rate: u32,

    #[serde(default)]
    pub canvas: CanvasConfig,

    #[serde(default)]
    pub scripting: ScriptingConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Default for LuminosConfig {
    fn default() -> Self {
        Self {
            entry: default_entry(),
            frame_rate: default_frame_rate(),
            canvas: CanvasConfig::default(),
            scripting: ScriptingConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl LuminosConfig {
    pub fn config_path() -> Option<PathBuf> {
        ProjectPaths::new(APP_NAME).map(|p| p.config_file())
    }

    /// Load the config from the default location, falling back to defaults
    /// when the file does not exist.
    pub fn load_or_default() -> Result<Self, ConfigLoadError> {
        let Some(path) = Self::config_path() else {
            return Ok(Self::default());
        };
        match Self::load_from(&path) {
            Err(ConfigLoadError::NotFound(_)) => {
                info!("No config at {}, using defaults", path.display());
                Ok(Self::default())
            }
            other => other,
        }
    }

    pub fn load_from(path: &Path) -> Result<Self, ConfigLoadError> {
        if !path.exists() {
            return Err(ConfigLoadError::NotFound(path.to_path_buf()));
        }

        let content =
            fs::read_to_string(path).map_err(|e| ConfigLoadError::IoError(e.to_string()))?;
        let config = Self::parse(&content)?;
        info!("Loaded config from {}", path.display());
        Ok(config)
    }

    pub fn parse(content: &str) -> Result<Self, ConfigLoadError> {
        toml::from_str(content).map_err(|e| ConfigLoadError::ParseError(e.to_string()))
    }

    /// Time budget of one frame
    pub fn frame_interval(&self) -> Duration {
        Duration::from_secs_f64(1.0 / f64::from(self.frame_rate.max(1)))
    }
}
