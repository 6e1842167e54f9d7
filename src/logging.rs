use std::fs::{self, File, OpenOptions};
use std::io::{self, BufWriter};
use std::path::Path;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::{ProjectPaths, APP_NAME};

const MAX_LOG_SIZE: u64 = 1024 * 1024; // 1MB

/// Where log lines go
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LogTargets {
    /// Write to stdout. Must be off while the terminal canvas owns the screen.
    pub console: bool,
    /// Write to `<data dir>/logs/<component>.log`
    pub file: bool,
}

/// Initialize logging for a component.
///
/// `verbosity` raises the default filter (0 = info, 1 = debug, 2+ = trace);
/// `RUST_LOG` overrides it. Returns a guard that must be kept alive for the
/// duration of the program when file logging is on.
pub fn init_logging(
    component_name: &str,
    targets: LogTargets,
    verbosity: u8,
) -> io::Result<Option<WorkerGuard>> {
    let default_level = match verbosity {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let env_filter =
        || EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let (file_layer, guard) = if targets.file {
        let log_dir = ProjectPaths::new(APP_NAME)
            .map(|p| p.log_dir())
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, "Failed to find home directory"))?;
        fs::create_dir_all(&log_dir)?;

        let log_path = log_dir.join(format!("{}.log", component_name));
        truncate_if_needed(&log_path)?;

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&log_path)?;
        let (non_blocking_file, guard) = tracing_appender::non_blocking(BufWriter::new(file));

        let layer = fmt::layer()
            .with_writer(non_blocking_file)
            .with_ansi(false)
            .with_target(true);
        (Some((layer, log_path)), Some(guard))
    } else {
        (None, None)
    };

    let console_layer = targets
        .console
        .then(|| fmt::layer().with_writer(io::stdout).with_ansi(true));

    let log_path = file_layer.as_ref().map(|(_, path)| path.clone());
    tracing_subscriber::registry()
        .with(env_filter())
        .with(console_layer)
        .with(file_layer.map(|(layer, _)| layer))
        .init();

    if let Some(path) = log_path {
        tracing::info!("Logging to file: {}", path.display());
    }

    Ok(guard)
}

/// Truncate log file if it exceeds MAX_LOG_SIZE.
fn truncate_if_needed(log_path: &Path) -> io::Result<()> {
    if log_path.exists() {
        let metadata = fs::metadata(log_path)?;
        if metadata.len() > MAX_LOG_SIZE {
            let file = File::create(log_path)?;
            file.set_len(0)?;
        }
    }
    Ok(())
}
