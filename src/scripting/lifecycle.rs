//! Script lifecycle controller.
//!
//! Owns the single live [`ScriptEnvironment`] and moves it through
//! `Uninitialized → Running → (ReloadRequested → Running)* → ShuttingDown →
//! Terminated`. A failed reload, or a failed start with nothing running,
//! lands in `Faulted`: no environment is live and the error is exposed
//! through [`ScriptController::display_message`].

use std::path::{Path, PathBuf};

use mlua::IntoLuaMulti;
use tracing::{debug, info, warn};

use super::bridge::PointerState;
use super::environment::{entry, ScriptEnvironment};
use super::error::{describe, ScriptBindingError, ScriptRuntimeError, StartError};
use super::network::{NetworkBinding, Offline};
use crate::draw::DrawList;
use crate::input::KeyboardEdges;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    Uninitialized,
    Running,
    /// Between teardown and recreation inside `request_reload`
    ReloadRequested,
    /// A reload, or a start with nothing running, failed; no environment is live
    Faulted,
    ShuttingDown,
    Terminated,
}

pub struct ScriptController {
    state: LifecycleState,
    entry_path: Option<PathBuf>,
    environment: Option<ScriptEnvironment>,
    network: Box<dyn NetworkBinding>,
    /// Error text for the render layer
    message: Option<String>,
    /// Whether the render layer should show `message`
    show_error: bool,
    quit_requested: bool,
    /// Number of environments created so far
    generation: u64,
}

impl Default for ScriptController {
    fn default() -> Self {
        Self::new()
    }
}

impl ScriptController {
    pub fn new() -> Self {
        Self::with_network(Box::new(Offline))
    }

    pub fn with_network(network: Box<dyn NetworkBinding>) -> Self {
        Self {
            state: LifecycleState::Uninitialized,
            entry_path: None,
            environment: None,
            network,
            message: None,
            show_error: false,
            quit_requested: false,
            generation: 0,
        }
    }

    /// Create a fresh environment for the program at `path` and enter
    /// `Running`.
    ///
    /// The new environment is built before the live one is torn down. On
    /// failure the error text is available from
    /// [`display_message`](Self::display_message); a previously running
    /// environment stays live, otherwise the state is `Faulted`.
    pub fn start(&mut self, path: impl AsRef<Path>) -> Result<(), StartError> {
        if matches!(
            self.state,
            LifecycleState::ShuttingDown | LifecycleState::Terminated
        ) {
            return Err(StartError::Terminated);
        }

        let path = path.as_ref().to_path_buf();
        self.entry_path = Some(path.clone());

        let env = match ScriptEnvironment::load(&path) {
            Ok(env) => env,
            Err(err) => return Err(self.start_failed(&path, err)),
        };
        let previous = self.environment.take();
        if previous.is_some() {
            self.network.unbind();
        }

        if let Err(err) = self.network.bind(env.lua()) {
            self.network.unbind();
            if let Some(previous) = previous {
                self.restore(previous);
            }
            let err = ScriptBindingError::new("network", &err).into();
            return Err(self.start_failed(&path, err));
        }

        if let Some(previous) = previous {
            debug!(
                target: "scripting",
                "Replacing script environment for {}",
                previous.entry_path().display()
            );
        }
        self.environment = Some(env);
        self.generation += 1;
        self.message = None;
        self.state = LifecycleState::Running;
        info!(
            target: "scripting",
            "Script environment #{} running {}",
            self.generation,
            path.display()
        );
        self.dispatch(entry::INIT, ());
        Ok(())
    }

    /// Tear down the live environment and start again with `path`, or with
    /// the last entry path when `None`.
    ///
    /// Teardown and recreation complete inside this call, so no entry point
    /// can observe the gap. If recreation fails the controller is `Faulted`;
    /// the old environment is gone either way.
    pub fn request_reload(&mut self, path: Option<&Path>) -> Result<(), StartError> {
        if matches!(
            self.state,
            LifecycleState::ShuttingDown | LifecycleState::Terminated
        ) {
            return Err(StartError::Terminated);
        }

        let Some(path) = path.map(Path::to_path_buf).or_else(|| self.entry_path.clone()) else {
            return Err(StartError::NoEntryPath);
        };

        info!(target: "scripting", "Reloading {}", path.display());
        self.state = LifecycleState::ReloadRequested;
        self.teardown();
        self.start(path)
    }

    /// Ask the frame loop to stop once the current frame has completed.
    pub fn request_quit(&mut self) {
        if !self.quit_requested {
            info!(target: "scripting", "Quit requested");
        }
        self.quit_requested = true;
    }

    pub fn quit_requested(&self) -> bool {
        self.quit_requested
    }

    /// Tear down the live environment. Safe to call repeatedly.
    pub fn shutdown(&mut self) {
        if self.state == LifecycleState::Terminated {
            return;
        }
        self.state = LifecycleState::ShuttingDown;
        self.teardown();
        self.state = LifecycleState::Terminated;
        debug!(target: "scripting", "Script controller terminated");
    }

    pub fn state(&self) -> LifecycleState {
        self.state
    }

    pub fn is_running(&self) -> bool {
        self.state == LifecycleState::Running
    }

    pub fn environment(&self) -> Option<&ScriptEnvironment> {
        self.environment.as_ref()
    }

    pub fn entry_path(&self) -> Option<&Path> {
        self.entry_path.as_deref()
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Error text for the render layer, if any.
    pub fn display_message(&self) -> Option<&str> {
        self.message.as_deref()
    }

    /// Whether the error panel is toggled on. Independent of whether there
    /// is a message to show.
    pub fn show_error(&self) -> bool {
        self.show_error
    }

    pub fn toggle_error_display(&mut self) {
        self.show_error = !self.show_error;
        debug!(target: "scripting", "Error display {}", if self.show_error { "on" } else { "off" });
    }

    /// Write this frame's input into the live environment. No-op while no
    /// environment is running.
    pub fn publish(&mut self, pointer: &PointerState, keyboard: &KeyboardEdges) {
        if !self.is_running() {
            return;
        }
        let result = match &self.environment {
            Some(env) => env.publish(pointer, keyboard),
            None => return,
        };
        if let Err(err) = result {
            self.report_runtime_error(ScriptRuntimeError::new("publish", &err));
        }
    }

    pub fn update_globals(&mut self, elapsed_seconds: f64) {
        self.dispatch(entry::UPDATE_GLOBALS, elapsed_seconds);
    }

    pub fn text_input(&mut self, text: &str) {
        self.dispatch(entry::TEXT_INPUT, text);
    }

    /// Run the per-frame entry point and return what it drew. `None` when
    /// no environment is running.
    pub fn frame(&mut self) -> Option<DrawList> {
        if !self.is_running() {
            return None;
        }
        self.dispatch(entry::FRAME, ());
        self.environment.as_ref().map(ScriptEnvironment::take_draw_list)
    }

    pub fn console_lines(&self) -> Vec<String> {
        self.environment
            .as_ref()
            .map(ScriptEnvironment::console_lines)
            .unwrap_or_default()
    }

    /// Record a failed start. The controller stays `Running` only when a
    /// previous environment is still live.
    fn start_failed(&mut self, path: &Path, err: StartError) -> StartError {
        warn!(target: "scripting", "Failed to start {}: {}", path.display(), err);
        self.message = Some(err.to_string());
        self.state = if self.environment.is_some() {
            LifecycleState::Running
        } else {
            LifecycleState::Faulted
        };
        err
    }

    /// Hand a previous environment back to the network collaborator after
    /// its replacement failed to bind.
    fn restore(&mut self, previous: ScriptEnvironment) {
        match self.network.bind(previous.lua()) {
            Ok(()) => self.environment = Some(previous),
            Err(err) => {
                self.network.unbind();
                warn!(
                    target: "scripting",
                    "Could not rebind previous environment for {}: {}",
                    previous.entry_path().display(),
                    describe(&err)
                );
            }
        }
    }

    fn teardown(&mut self) {
        if let Some(env) = self.environment.take() {
            self.network.unbind();
            debug!(
                target: "scripting",
                "Tearing down script environment for {}",
                env.entry_path().display()
            );
            drop(env);
        }
    }

    fn dispatch(&mut self, name: &'static str, args: impl IntoLuaMulti) {
        if !self.is_running() {
            return;
        }
        let result = match &self.environment {
            Some(env) => env.call_entry(name, args),
            None => return,
        };
        if let Err(err) = result {
            self.report_runtime_error(err);
        }
    }

    /// Route a runtime error to the script's `show_error` entry point and
    /// the display message. The environment keeps running.
    fn report_runtime_error(&mut self, err: ScriptRuntimeError) {
        warn!(target: "scripting", "Script error in {}", err);
        let message = err.to_string();
        if err.entry_point != entry::SHOW_ERROR {
            if let Some(env) = &self.environment {
                if let Err(nested) = env.call_entry(entry::SHOW_ERROR, message.as_str()) {
                    warn!(target: "scripting", "Script error in {}", nested);
                }
            }
        }
        self.message = Some(message);
    }
}

impl Drop for ScriptController {
    fn drop(&mut self) {
        self.shutdown();
    }
}
