use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use tokio::sync::watch;
use tracing::{error, info, warn};

use luminos::config::{LuminosConfig, APP_NAME};
use luminos::frame::{FrameLoop, HeadlessHost, Host};
use luminos::logging::{init_logging, LogTargets};
use luminos::scripting::{setup_reload_signal, ReloadSignal, ScriptController, ScriptWatcher};
use luminos::tui::TerminalHost;

#[derive(Parser)]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Config file to use instead of the platform default
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Entry script, overriding the config
    #[arg(short, long)]
    script: Option<PathBuf>,

    /// Enables debug mode
    #[arg(short, long, action = clap::ArgAction::Count)]
    debug: u8,

    /// Run without a terminal, logging to stdout
    #[arg(long)]
    headless: bool,

    /// Number of frames to run with --headless
    #[arg(long, default_value_t = 60, requires = "headless")]
    frames: usize,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => LuminosConfig::load_from(path)?,
        None => LuminosConfig::load_or_default()?,
    };

    // The terminal canvas owns stdout, so the TUI only logs to file
    let targets = LogTargets {
        console: cli.headless,
        file: config.logging.file,
    };
    let _guard = init_logging(APP_NAME, targets, cli.debug).context("Failed to initialize logging")?;

    let entry = cli.script.clone().unwrap_or_else(|| config.entry.clone());
    info!("Starting {}", entry.display());

    let mut controller = ScriptController::new();
    if let Err(e) = controller.start(&entry) {
        // Stay up in the faulted state so the script can be fixed and reloaded
        warn!("Entry script did not start: {}", e);
    }

    let watcher = config
        .scripting
        .watch
        .then(|| ScriptWatcher::for_entry(&entry, config.scripting.watch_interval()));
    let reload_rx = config.scripting.reload_signal.then(setup_reload_signal);

    if cli.headless {
        let host = HeadlessHost::idle(cli.frames);
        run(host, controller, watcher, reload_rx, config.frame_interval())
    } else {
        let host = TerminalHost::new(config.canvas).context("Failed to initialize terminal")?;
        run(host, controller, watcher, reload_rx, config.frame_interval())
    }
}

fn run<H: Host>(
    host: H,
    controller: ScriptController,
    watcher: Option<ScriptWatcher>,
    reload_rx: Option<watch::Receiver<Option<ReloadSignal>>>,
    frame_interval: Duration,
) -> anyhow::Result<()> {
    let mut frames = FrameLoop::new(host, controller);
    if let Some(watcher) = watcher {
        frames = frames.with_watcher(watcher);
    }
    if let Some(rx) = reload_rx {
        frames = frames.with_reload_signal(rx);
    }

    frames.run(frame_interval).context("Frame loop failed")?;

    if let Some(message) = frames.controller().display_message() {
        error!("Last script error: {}", message);
    }
    Ok(())
}
