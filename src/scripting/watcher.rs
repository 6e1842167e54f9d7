//! Script file change detection for hot reloading
//!
//! Watches the directory of the entry script for `.lua` files that were
//! modified, added or removed, so the frame loop can request a reload.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant, SystemTime};
use tracing::debug;

/// Default scan interval
pub const DEFAULT_SCAN_INTERVAL: Duration = Duration::from_millis(500);

/// Result of scanning for script changes
#[derive(Debug, Clone, Default)]
pub struct ScanResult {
    /// Scripts that were modified
    pub changed: Vec<PathBuf>,
    /// Scripts that were added to the directory
    pub added: Vec<PathBuf>,
    /// Scripts that were removed from the directory
    pub removed: Vec<PathBuf>,
}

impl ScanResult {
    pub fn has_changes(&self) -> bool {
        !self.changed.is_empty() || !self.added.is_empty() || !self.removed.is_empty()
    }
}

pub struct ScriptWatcher {
    script_dir: PathBuf,
    scan_interval: Duration,
    last_scan: Option<Instant>,
    /// path -> modification time as of the last scan
    cached_state: HashMap<PathBuf, SystemTime>,
}

impl ScriptWatcher {
    /// Watch the directory containing `entry`.
    pub fn for_entry(entry: &Path, scan_interval: Duration) -> Self {
        let script_dir = entry
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."))
            .to_path_buf();
        Self::with_interval(script_dir, scan_interval)
    }

    pub fn with_interval(script_dir: PathBuf, scan_interval: Duration) -> Self {
        // Pre-populate so existing files are not reported as added
        let cached_state = scripts_in_dir(&script_dir);
        Self {
            script_dir,
            scan_interval,
            last_scan: None,
            cached_state,
        }
    }

    pub fn script_dir(&self) -> &Path {
        &self.script_dir
    }

    pub fn should_scan(&self, now: Instant) -> bool {
        match self.last_scan {
            Some(last) => now.duration_since(last) >= self.scan_interval,
            None => true,
        }
    }

    /// Scan now if the interval has elapsed. Returns true when anything changed.
    pub fn poll(&mut self, now: Instant) -> bool {
        if !self.should_scan(now) {
            return false;
        }
        self.last_scan = Some(now);
        self.scan_changes().has_changes()
    }

    /// Compare the directory against the cached state and update the cache.
    pub fn scan_changes(&mut self) -> ScanResult {
        let current_state = scripts_in_dir(&self.script_dir);
        let mut result = ScanResult::default();

        for (path, modified_time) in &current_state {
            match self.cached_state.get(path) {
                Some(cached_time) if cached_time != modified_time => {
                    debug!(target: "scripting", "Script changed: {}", path.display());
                    result.changed.push(path.clone());
                }
                Some(_) => {}
                None => {
                    debug!(target: "scripting", "Script added: {}", path.display());
                    result.added.push(path.clone());
                }
            }
        }

        for path in self.cached_state.keys() {
            if !current_state.contains_key(path) {
                debug!(target: "scripting", "Script removed: {}", path.display());
                result.removed.push(path.clone());
            }
        }

        self.cached_state = current_state;
        result
    }
}

/// `.lua` files in `script_dir` and their modification times
fn scripts_in_dir(script_dir: &Path) -> HashMap<PathBuf, SystemTime> {
    let mut scripts = HashMap::new();

    let entries = match std::fs::read_dir(script_dir) {
        Ok(entries) => entries,
        Err(e) => {
            tracing::warn!(
                target: "scripting",
                "Failed to read script directory {}: {}",
                script_dir.display(),
                e
            );
            return scripts;
        }
    };

    for entry in entries.flatten() {
        let path = entry.path();
        if path.extension().and_then(|s| s.to_str()) != Some("lua") {
            continue;
        }
        match entry.metadata().and_then(|m| m.modified()) {
            Ok(modified) => {
                scripts.insert(path, modified);
            }
            Err(e) => {
                tracing::warn!(
                    target: "scripting",
                    "Failed to get modification time for {}: {}",
                    path.display(),
                    e
                );
            }
        }
    }

    scripts
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn touch(path: &Path, contents: &str, modified: SystemTime) {
        fs::write(path, contents).unwrap();
        let file = fs::File::options().write(true).open(path).unwrap();
        file.set_modified(modified).unwrap();
    }

    #[test]
    fn test_existing_files_are_not_reported() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("program.lua"), "x = 1").unwrap();
        let mut watcher = ScriptWatcher::with_interval(dir.path().to_path_buf(), DEFAULT_SCAN_INTERVAL);
        assert!(!watcher.scan_changes().has_changes());
    }

    #[test]
    fn test_detects_added_changed_and_removed() {
        let dir = TempDir::new().unwrap();
        let program = dir.path().join("program.lua");
        let base = SystemTime::UNIX_EPOCH + Duration::from_secs(1_000_000);
        touch(&program, "x = 1", base);
        let mut watcher = ScriptWatcher::for_entry(&program, DEFAULT_SCAN_INTERVAL);

        touch(&program, "x = 2", base + Duration::from_secs(5));
        let nodes = dir.path().join("nodes.lua");
        fs::write(&nodes, "return {}").unwrap();
        let result = watcher.scan_changes();
        assert_eq!(result.changed, vec![program.clone()]);
        assert_eq!(result.added, vec![nodes.clone()]);

        fs::remove_file(&nodes).unwrap();
        let result = watcher.scan_changes();
        assert_eq!(result.removed, vec![nodes]);
        assert!(result.changed.is_empty());
    }

    #[test]
    fn test_ignores_non_lua_files() {
        let dir = TempDir::new().unwrap();
        let mut watcher = ScriptWatcher::with_interval(dir.path().to_path_buf(), DEFAULT_SCAN_INTERVAL);
        fs::write(dir.path().join("notes.txt"), "hi").unwrap();
        assert!(!watcher.scan_changes().has_changes());
    }

    #[test]
    fn test_poll_respects_interval() {
        let dir = TempDir::new().unwrap();
        let mut watcher = ScriptWatcher::with_interval(dir.path().to_path_buf(), Duration::from_secs(60));
        let now = Instant::now();
        assert!(!watcher.poll(now));

        fs::write(dir.path().join("late.lua"), "x = 1").unwrap();
        assert!(!watcher.poll(now + Duration::from_secs(1)));
        assert!(watcher.poll(now + Duration::from_secs(61)));
    }
}
