//! The per-frame pipeline.
//!
//! One thread drives every frame in a fixed order:
//!
//! 1. the host polls raw device state
//! 2. the input snapshot captures it
//! 3. hotkeys and reload triggers are checked against this frame's edges
//! 4. pointer and keyboard state are published into the script
//! 5. text input, `update_globals` and `program_frame` run
//! 6. the host presents the frame
//! 7. the input snapshot commits the frame

use std::collections::VecDeque;
use std::io;
use std::path::Path;
use std::time::{Duration, Instant};

use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::draw::DrawList;
use crate::input::{HotkeyAction, Hotkeys, InputSnapshot, RawDeviceState};
use crate::scripting::{
    take_reload_signal, LifecycleState, PointerState, ReloadSignal, ScriptController,
    ScriptWatcher,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostSignal {
    Continue,
    /// The window or terminal is going away; finish this frame and stop
    Close,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameOutcome {
    Continue,
    Quit,
}

/// Everything the render layer needs to draw one frame
#[derive(Debug)]
pub struct FrameView<'a> {
    pub frame: u64,
    pub state: LifecycleState,
    pub entry: Option<&'a Path>,
    /// Latest list drawn by a running environment; kept while not running
    pub draw: &'a DrawList,
    pub pointer: PointerState,
    /// Error text, independent of `show_error`
    pub message: Option<&'a str>,
    pub show_error: bool,
    pub console: &'a [String],
}

/// Windowing / terminal side of the editor
pub trait Host {
    /// Update `device` with the current raw levels and append text-input
    /// events to `text`.
    fn poll(&mut self, device: &mut RawDeviceState, text: &mut Vec<String>) -> io::Result<HostSignal>;

    fn present(&mut self, view: &FrameView<'_>) -> io::Result<()>;
}

pub struct FrameLoop<H: Host> {
    host: H,
    controller: ScriptController,
    hotkeys: Hotkeys,
    live: RawDeviceState,
    input: InputSnapshot,
    last_draw: DrawList,
    text_events: Vec<String>,
    watcher: Option<ScriptWatcher>,
    reload_rx: Option<watch::Receiver<Option<ReloadSignal>>>,
    frame_count: u64,
}

impl<H: Host> FrameLoop<H> {
    pub fn new(host: H, controller: ScriptController) -> Self {
        Self {
            host,
            controller,
            hotkeys: Hotkeys::default(),
            live: RawDeviceState::new(),
            input: InputSnapshot::new(),
            last_draw: DrawList::default(),
            text_events: Vec::new(),
            watcher: None,
            reload_rx: None,
            frame_count: 0,
        }
    }

    /// Reload when a script next to the entry program changes on disk.
    pub fn with_watcher(mut self, watcher: ScriptWatcher) -> Self {
        self.watcher = Some(watcher);
        self
    }

    /// Reload when the signal handler fires.
    pub fn with_reload_signal(mut self, rx: watch::Receiver<Option<ReloadSignal>>) -> Self {
        self.reload_rx = Some(rx);
        self
    }

    pub fn controller(&self) -> &ScriptController {
        &self.controller
    }

    pub fn controller_mut(&mut self) -> &mut ScriptController {
        &mut self.controller
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    pub fn input(&self) -> &InputSnapshot {
        &self.input
    }

    pub fn last_draw(&self) -> &DrawList {
        &self.last_draw
    }

    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }

    /// Run one frame. `elapsed_seconds` is passed to `update_globals`.
    pub fn run_frame(&mut self, elapsed_seconds: f64, now: Instant) -> io::Result<FrameOutcome> {
        self.text_events.clear();
        if self.host.poll(&mut self.live, &mut self.text_events)? == HostSignal::Close {
            self.controller.request_quit();
        }
        self.input.begin_frame(&self.live);

        let mut reloaded = false;
        for action in self.hotkeys.detect(&self.input) {
            match action {
                HotkeyAction::Quit => self.controller.request_quit(),
                HotkeyAction::ToggleError => self.controller.toggle_error_display(),
                HotkeyAction::Reload => {
                    self.reload("hotkey");
                    reloaded = true;
                }
            }
        }
        if self.external_reload_requested(now) && !reloaded {
            self.reload("file change or signal");
            reloaded = true;
        }

        let pointer = PointerState::from_snapshot(&self.input);
        // A fresh environment keeps its zeroed table until the next frame
        if !reloaded {
            self.controller.publish(&pointer, &self.input.keyboard_edges());
        }

        for text in self.text_events.drain(..) {
            self.controller.text_input(&text);
        }
        self.controller.update_globals(elapsed_seconds);
        if let Some(list) = self.controller.frame() {
            self.last_draw = list;
        }

        let console = self.controller.console_lines();
        let view = FrameView {
            frame: self.frame_count,
            state: self.controller.state(),
            entry: self.controller.entry_path(),
            draw: &self.last_draw,
            pointer,
            message: self.controller.display_message(),
            show_error: self.controller.show_error(),
            console: &console,
        };
        self.host.present(&view)?;

        self.input.commit_frame();
        self.frame_count += 1;

        Ok(if self.controller.quit_requested() {
            FrameOutcome::Quit
        } else {
            FrameOutcome::Continue
        })
    }

    /// Run frames until quit, pacing them to `frame_interval`, then shut the
    /// controller down.
    pub fn run(&mut self, frame_interval: Duration) -> io::Result<()> {
        let started = Instant::now();
        loop {
            let frame_start = Instant::now();
            let outcome = self.run_frame(started.elapsed().as_secs_f64(), frame_start)?;
            if outcome == FrameOutcome::Quit {
                break;
            }
            let spent = frame_start.elapsed();
            if spent < frame_interval {
                std::thread::sleep(frame_interval - spent);
            }
        }
        info!(target: "frame", "Stopping after {} frame(s)", self.frame_count);
        self.controller.shutdown();
        Ok(())
    }

    pub fn into_host(mut self) -> H {
        self.controller.shutdown();
        self.host
    }

    fn reload(&mut self, trigger: &str) {
        debug!(target: "frame", "Reload requested by {}", trigger);
        if let Err(err) = self.controller.request_reload(None) {
            warn!(target: "frame", "Reload failed: {}", err);
        }
    }

    fn external_reload_requested(&mut self, now: Instant) -> bool {
        let changed = self
            .watcher
            .as_mut()
            .map(|w| w.poll(now))
            .unwrap_or(false);
        let signalled = self
            .reload_rx
            .as_mut()
            .map(take_reload_signal)
            .unwrap_or(false);
        changed || signalled
    }
}

/// One frame of replayed input
#[derive(Debug, Clone, Default)]
pub struct HeadlessFrame {
    pub device: RawDeviceState,
    pub text: Vec<String>,
}

impl From<RawDeviceState> for HeadlessFrame {
    fn from(device: RawDeviceState) -> Self {
        Self {
            device,
            text: Vec::new(),
        }
    }
}

/// What the headless host saw when a frame was presented
#[derive(Debug, Clone)]
pub struct PresentedFrame {
    pub frame: u64,
    pub state: LifecycleState,
    pub draw: DrawList,
    pub message: Option<String>,
    pub show_error: bool,
    pub console: Vec<String>,
}

/// Host without a screen that replays a fixed sequence of device states.
///
/// Reports `Close` on the last queued frame, so a queue of N frames runs
/// exactly N frames.
#[derive(Debug, Default)]
pub struct HeadlessHost {
    frames: VecDeque<HeadlessFrame>,
    presented: Vec<PresentedFrame>,
}

impl HeadlessHost {
    pub fn new(frames: impl IntoIterator<Item = HeadlessFrame>) -> Self {
        Self {
            frames: frames.into_iter().collect(),
            presented: Vec::new(),
        }
    }

    /// One frame per device state, without text input
    pub fn replay(states: impl IntoIterator<Item = RawDeviceState>) -> Self {
        Self::new(states.into_iter().map(HeadlessFrame::from))
    }

    /// `count` frames with no input
    pub fn idle(count: usize) -> Self {
        Self::new((0..count).map(|_| HeadlessFrame::default()))
    }

    pub fn presented(&self) -> &[PresentedFrame] {
        &self.presented
    }
}

impl Host for HeadlessHost {
    fn poll(&mut self, device: &mut RawDeviceState, text: &mut Vec<String>) -> io::Result<HostSignal> {
        let Some(frame) = self.frames.pop_front() else {
            return Ok(HostSignal::Close);
        };
        *device = frame.device;
        text.extend(frame.text);
        Ok(if self.frames.is_empty() {
            HostSignal::Close
        } else {
            HostSignal::Continue
        })
    }

    fn present(&mut self, view: &FrameView<'_>) -> io::Result<()> {
        debug!(
            target: "frame",
            "frame {} ({:?}): {} draw command(s)",
            view.frame,
            view.state,
            view.draw.len()
        );
        self.presented.push(PresentedFrame {
            frame: view.frame,
            state: view.state,
            draw: view.draw.clone(),
            message: view.message.map(str::to_string),
            show_error: view.show_error,
            console: view.console.to_vec(),
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::{MouseButton, Scancode};
    use std::fs;
    use tempfile::TempDir;

    fn controller_for(dir: &TempDir, source: &str) -> ScriptController {
        let path = dir.path().join("program.lua");
        fs::write(&path, source).unwrap();
        let mut controller = ScriptController::new();
        controller.start(&path).unwrap();
        controller
    }

    #[test]
    fn test_headless_host_closes_on_last_frame() {
        let dir = TempDir::new().unwrap();
        let controller = controller_for(&dir, "function program_frame() end\n");
        let mut frames = FrameLoop::new(HeadlessHost::idle(3), controller);

        let now = Instant::now();
        assert_eq!(frames.run_frame(0.0, now).unwrap(), FrameOutcome::Continue);
        assert_eq!(frames.run_frame(0.1, now).unwrap(), FrameOutcome::Continue);
        assert_eq!(frames.run_frame(0.2, now).unwrap(), FrameOutcome::Quit);
        assert_eq!(frames.host().presented().len(), 3);
    }

    #[test]
    fn test_toggle_error_hotkey_flips_flag() {
        let dir = TempDir::new().unwrap();
        let controller = controller_for(&dir, "x = 1\n");
        let f4 = RawDeviceState::new().with_key(Scancode::F4);
        let host = HeadlessHost::replay([f4.clone(), f4, RawDeviceState::new()]);
        let mut frames = FrameLoop::new(host, controller);

        let now = Instant::now();
        frames.run_frame(0.0, now).unwrap();
        assert!(frames.controller().show_error());
        frames.run_frame(0.0, now).unwrap();
        assert!(frames.controller().show_error());
        frames.run_frame(0.0, now).unwrap();
        assert!(frames.controller().show_error());
    }

    #[test]
    fn test_last_draw_survives_failed_reload() {
        let dir = TempDir::new().unwrap();
        let controller = controller_for(
            &dir,
            "function program_frame() ui.text(1, 2, 'still here') end\n",
        );
        let f5 = RawDeviceState::new().with_key(Scancode::F5);
        let host = HeadlessHost::replay([RawDeviceState::new(), f5, RawDeviceState::new()]);
        let mut frames = FrameLoop::new(host, controller);
        let now = Instant::now();

        frames.run_frame(0.0, now).unwrap();
        assert_eq!(frames.last_draw().len(), 1);

        fs::write(dir.path().join("program.lua"), "function (\n").unwrap();
        frames.run_frame(0.0, now).unwrap();
        frames.run_frame(0.0, now).unwrap();

        assert_eq!(frames.controller().state(), LifecycleState::Faulted);
        assert_eq!(frames.last_draw().len(), 1);
        let last = frames.host().presented().last().unwrap();
        assert!(last.message.as_deref().unwrap_or_default().contains("syntax error"));
    }

    #[test]
    fn test_close_signal_quits_after_frame_completes() {
        let dir = TempDir::new().unwrap();
        let controller = controller_for(
            &dir,
            "count = 0\nfunction program_frame() count = count + 1 end\n",
        );
        let host = HeadlessHost::replay([RawDeviceState::new().with_button(MouseButton::Left)]);
        let mut frames = FrameLoop::new(host, controller);

        assert_eq!(frames.run_frame(0.0, Instant::now()).unwrap(), FrameOutcome::Quit);
        let count: i64 = frames
            .controller()
            .environment()
            .unwrap()
            .lua()
            .globals()
            .get("count")
            .unwrap();
        assert_eq!(count, 1);
    }
}
