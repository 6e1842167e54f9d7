// Integration tests for the per-frame pipeline

use std::cell::Cell;
use std::fs;
use std::path::{Path, PathBuf};
use std::rc::Rc;
use std::time::{Duration, Instant};

use luminos::frame::{FrameLoop, FrameOutcome, HeadlessFrame, HeadlessHost};
use luminos::input::{MouseButton, RawDeviceState, Scancode};
use luminos::scripting::{NetworkBinding, ReloadSignal, ScriptController, ScriptWatcher};
use mlua::Lua;
use tempfile::TempDir;
use tokio::sync::watch;

/// Counts network bind/unbind calls across environments
#[derive(Clone, Default)]
struct CountingNetwork {
    binds: Rc<Cell<u32>>,
    unbinds: Rc<Cell<u32>>,
}

impl NetworkBinding for CountingNetwork {
    fn bind(&mut self, lua: &Lua) -> mlua::Result<()> {
        self.binds.set(self.binds.get() + 1);
        lua.globals().set("net", lua.create_table()?)
    }

    fn unbind(&mut self) {
        self.unbinds.set(self.unbinds.get() + 1);
    }
}

fn write_program(dir: &TempDir, source: &str) -> PathBuf {
    let path = dir.path().join("program.lua");
    fs::write(&path, source).unwrap();
    path
}

fn started(path: &Path) -> ScriptController {
    let mut controller = ScriptController::new();
    controller.start(path).unwrap();
    controller
}

fn lua_list(frames: &FrameLoop<HeadlessHost>, name: &str) -> Vec<i64> {
    let lua = frames.controller().environment().unwrap().lua();
    let table: mlua::Table = lua.globals().get(name).unwrap();
    table.sequence_values::<i64>().map(|v| v.unwrap()).collect()
}

const RECORDER: &str = r#"
keys_seen = {}
left_seen = {}
x_seen = {}
function program_frame()
  table.insert(keys_seen, input.key(keys.A))
  table.insert(left_seen, g_mouseState.left)
  table.insert(x_seen, math.floor(g_mouseState.mx))
end
"#;

#[test]
fn test_script_sees_press_hold_release() {
    let dir = TempDir::new().unwrap();
    let path = write_program(&dir, RECORDER);

    let down = RawDeviceState::new()
        .with_key(Scancode::A)
        .with_button(MouseButton::Left)
        .with_cursor(40.0, 30.0);
    let up = RawDeviceState::new().with_cursor(40.0, 30.0);
    let host = HeadlessHost::replay([down.clone(), down, up.clone(), up]);

    let mut frames = FrameLoop::new(host, started(&path));
    let now = Instant::now();
    for _ in 0..4 {
        frames.run_frame(0.0, now).unwrap();
    }

    assert_eq!(lua_list(&frames, "keys_seen"), vec![1, 3, 2, 0]);
    assert_eq!(lua_list(&frames, "left_seen"), vec![1, 3, 2, 0]);
    assert_eq!(lua_list(&frames, "x_seen"), vec![40, 40, 40, 40]);
}

#[test]
fn test_reload_hotkey_swaps_environment_once() {
    let dir = TempDir::new().unwrap();
    let path = write_program(&dir, RECORDER);

    let network = CountingNetwork::default();
    let mut controller = ScriptController::with_network(Box::new(network.clone()));
    controller.start(&path).unwrap();

    let held = RawDeviceState::new()
        .with_button(MouseButton::Left)
        .with_cursor(100.0, 50.0);
    let host = HeadlessHost::replay([
        held.clone(),
        held.clone().with_key(Scancode::F5),
        held.clone().with_key(Scancode::F5),
        held,
    ]);

    let mut frames = FrameLoop::new(host, controller);
    let now = Instant::now();
    for _ in 0..4 {
        frames.run_frame(0.0, now).unwrap();
    }

    assert_eq!(frames.controller().generation(), 2);
    assert_eq!(network.binds.get(), 2);
    assert_eq!(network.unbinds.get(), 1);

    // The fresh environment sees a zeroed pointer on the reload frame
    assert_eq!(lua_list(&frames, "x_seen"), vec![0, 100, 100]);
    assert_eq!(lua_list(&frames, "left_seen"), vec![0, 3, 3]);
}

#[test]
fn test_quit_chord_requires_held_modifier() {
    let dir = TempDir::new().unwrap();
    let path = write_program(&dir, "function program_frame() end\n");

    let ctrl = RawDeviceState::new().with_key(Scancode::LCTRL);
    let chord = ctrl.clone().with_key(Scancode::Q);
    let host = HeadlessHost::replay([
        chord.clone(),
        RawDeviceState::new(),
        ctrl,
        chord,
        RawDeviceState::new(),
    ]);

    let mut frames = FrameLoop::new(host, started(&path));
    let now = Instant::now();
    let outcomes: Vec<_> = (0..4).map(|_| frames.run_frame(0.0, now).unwrap()).collect();

    assert_eq!(
        outcomes,
        vec![
            FrameOutcome::Continue,
            FrameOutcome::Continue,
            FrameOutcome::Continue,
            FrameOutcome::Quit,
        ]
    );
}

#[test]
fn test_new_script_file_triggers_reload() {
    let dir = TempDir::new().unwrap();
    let path = write_program(&dir, "function program_frame() end\n");

    let watcher = ScriptWatcher::for_entry(&path, Duration::ZERO);
    let mut frames =
        FrameLoop::new(HeadlessHost::idle(3), started(&path)).with_watcher(watcher);
    let now = Instant::now();

    frames.run_frame(0.0, now).unwrap();
    assert_eq!(frames.controller().generation(), 1);

    fs::write(dir.path().join("helper.lua"), "return {}\n").unwrap();
    frames.run_frame(0.0, now).unwrap();
    assert_eq!(frames.controller().generation(), 2);

    frames.run_frame(0.0, now).unwrap();
    assert_eq!(frames.controller().generation(), 2);
}

#[test]
fn test_reload_signal_is_consumed_once() {
    let dir = TempDir::new().unwrap();
    let path = write_program(&dir, "function program_frame() end\n");

    let (tx, rx) = watch::channel::<Option<ReloadSignal>>(None);
    let mut frames =
        FrameLoop::new(HeadlessHost::idle(3), started(&path)).with_reload_signal(rx);
    let now = Instant::now();

    tx.send(Some(ReloadSignal)).unwrap();
    frames.run_frame(0.0, now).unwrap();
    frames.run_frame(0.0, now).unwrap();

    assert_eq!(frames.controller().generation(), 2);
}

#[test]
fn test_text_input_and_elapsed_reach_script() {
    let dir = TempDir::new().unwrap();
    let path = write_program(
        &dir,
        r#"
typed = ""
last_elapsed = -1
function text_input(text) typed = typed .. text end
function update_globals(elapsed) last_elapsed = elapsed end
"#,
    );

    let host = HeadlessHost::new([
        HeadlessFrame {
            device: RawDeviceState::new(),
            text: vec!["h".to_string(), "i".to_string()],
        },
        HeadlessFrame::default(),
    ]);
    let mut frames = FrameLoop::new(host, started(&path));
    let now = Instant::now();
    frames.run_frame(0.5, now).unwrap();
    frames.run_frame(1.25, now).unwrap();

    let lua = frames.controller().environment().unwrap().lua();
    assert_eq!(lua.globals().get::<String>("typed").unwrap(), "hi");
    assert_eq!(lua.globals().get::<f64>("last_elapsed").unwrap(), 1.25);
}

#[test]
fn test_runtime_error_is_shown_after_toggle() {
    let dir = TempDir::new().unwrap();
    let path = write_program(&dir, "function program_frame() error('kaboom') end\n");

    let host = HeadlessHost::replay([
        RawDeviceState::new(),
        RawDeviceState::new().with_key(Scancode::F4),
    ]);
    let mut frames = FrameLoop::new(host, started(&path));
    let now = Instant::now();
    frames.run_frame(0.0, now).unwrap();
    frames.run_frame(0.0, now).unwrap();

    let presented = frames.host().presented();
    assert!(!presented[0].show_error);
    assert!(presented[0].message.as_deref().unwrap().contains("kaboom"));
    assert!(presented[1].show_error);
    assert!(frames.controller().is_running());
}
