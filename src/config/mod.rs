pub mod luminos_config;
pub mod paths;
pub mod scripting_config;

pub use luminos_config::{CanvasConfig, ConfigLoadError, LoggingConfig, LuminosConfig, APP_NAME};
pub use paths::ProjectPaths;
pub use scripting_config::ScriptingConfig;
