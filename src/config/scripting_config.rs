use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScriptingConfig {
    /// Reload when a `.lua` file next to the entry script changes (default: true)
    #[serde(default = "default_watch")]
    pub watch: bool,

    /// Watch scan interval in milliseconds (default: 500ms)
    #[serde(default = "default_watch_interval")]
    pub watch_interval_ms: u64,

    /// Reload on SIGUSR2 (default: true, Unix only)
    #[serde(default = "default_reload_signal")]
    pub reload_signal: bool,
}

fn default_watch() -> bool {
    true
}

fn default_watch_interval() -> u64 {
    500
}

fn default_reload_signal() -> bool {
    true
}

impl Default for ScriptingConfig {
    fn default() -> Self {
        Self {
            watch: default_watch(),
            watch_interval_ms: default_watch_interval(),
            reload_signal: default_reload_signal(),
        }
    }
}

impl ScriptingConfig {
    pub fn watch_interval(&self) -> Duration {
        Duration::from_millis(self.watch_interval_ms)
    }
}
