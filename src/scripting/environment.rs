use std::cell::RefCell;
use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use mlua::{Function, IntoLuaMulti, Lua, Value, Variadic};
use tracing::{debug, info};

use super::bridge::{GlobalStateTable, PointerState};
use super::error::{describe, ScriptBindingError, ScriptLoadError, ScriptLocation, ScriptRuntimeError, StartError};
use crate::draw::{DrawList, DrawRecorder};
use crate::input::KeyboardEdges;

/// Lines kept from the script's `print` output
pub const CONSOLE_CAPACITY: usize = 64;

/// Entry points called by the frame loop
pub mod entry {
    pub const INIT: &str = "program_init";
    pub const UPDATE_GLOBALS: &str = "update_globals";
    pub const FRAME: &str = "program_frame";
    pub const TEXT_INPUT: &str = "text_input";
    pub const SHOW_ERROR: &str = "show_error";
}

#[derive(Debug, Clone, Default)]
struct Console(Rc<RefCell<VecDeque<String>>>);

impl Console {
    fn push(&self, line: String) {
        let mut lines = self.0.borrow_mut();
        if lines.len() == CONSOLE_CAPACITY {
            lines.pop_front();
        }
        lines.push_back(line);
    }

    fn lines(&self) -> Vec<String> {
        self.0.borrow().iter().cloned().collect()
    }

    fn register(&self, lua: &Lua) -> mlua::Result<()> {
        let console = self.clone();
        let print = lua.create_function(move |_, args: Variadic<Value>| {
            let line = args.iter().map(format_value).collect::<Vec<_>>().join("\t");
            debug!(target: "scripting", "print: {}", line);
            console.push(line);
            Ok(())
        })?;
        lua.globals().set("print", print)
    }
}

fn format_value(value: &Value) -> String {
    match value {
        Value::Nil => "nil".to_string(),
        Value::Boolean(b) => b.to_string(),
        Value::Integer(i) => i.to_string(),
        Value::Number(n) => n.to_string(),
        Value::String(s) => s.to_string_lossy(),
        other => other.type_name().to_string(),
    }
}

/// One live Lua state with its program and native bindings
pub struct ScriptEnvironment {
    lua: Lua,
    entry_path: PathBuf,
    globals: GlobalStateTable,
    draw: DrawRecorder,
    console: Console,
}

impl ScriptEnvironment {
    /// Create a Lua state, compile the program at `path`, register the
    /// native bindings and run the program's top-level chunk.
    ///
    /// The program is compiled before any binding is registered so a syntax
    /// error is reported as a load error, never as a binding error.
    pub fn load(path: &Path) -> Result<Self, StartError> {
        let source = std::fs::read_to_string(path).map_err(|source| ScriptLoadError::Missing {
            path: path.to_path_buf(),
            source,
        })?;

        let lua = Lua::new();
        let chunk = lua
            .load(source.as_str())
            .set_name(format!("@{}", path.display()))
            .into_function()
            .map_err(|err| {
                let message = describe(&err);
                ScriptLoadError::Syntax {
                    path: path.to_path_buf(),
                    location: ScriptLocation::parse(&message),
                    message,
                }
            })?;

        let console = Console::default();
        console
            .register(&lua)
            .map_err(|err| ScriptBindingError::new("console", &err))?;
        set_package_path(&lua, path).map_err(|err| ScriptBindingError::new("package", &err))?;

        let draw = DrawRecorder::new();
        draw.register(&lua)
            .map_err(|err| ScriptBindingError::new("ui", &err))?;

        let globals =
            GlobalStateTable::create(&lua).map_err(|err| ScriptBindingError::new("input", &err))?;

        chunk.call::<()>(()).map_err(|err| {
            let message = describe(&err);
            ScriptLoadError::Execution {
                path: path.to_path_buf(),
                location: ScriptLocation::parse(&message),
                message,
            }
        })?;

        info!(target: "scripting", "Loaded script {}", path.display());

        Ok(Self {
            lua,
            entry_path: path.to_path_buf(),
            globals,
            draw,
            console,
        })
    }

    /// Native handle, for collaborators that register their own bindings.
    pub fn lua(&self) -> &Lua {
        &self.lua
    }

    pub fn entry_path(&self) -> &Path {
        &self.entry_path
    }

    pub fn globals(&self) -> &GlobalStateTable {
        &self.globals
    }

    pub fn publish(&self, pointer: &PointerState, keyboard: &KeyboardEdges) -> mlua::Result<()> {
        self.globals.publish(pointer, keyboard)
    }

    /// True when the program defines a global function called `name`.
    pub fn has_entry(&self, name: &str) -> bool {
        matches!(self.lua.globals().get::<Value>(name), Ok(Value::Function(_)))
    }

    /// Call a global entry point. Returns `Ok(false)` when the program does
    /// not define it.
    pub fn call_entry(
        &self,
        name: &'static str,
        args: impl IntoLuaMulti,
    ) -> Result<bool, ScriptRuntimeError> {
        let function: Function = match self.lua.globals().get::<Value>(name) {
            Ok(Value::Function(f)) => f,
            Ok(_) => return Ok(false),
            Err(err) => return Err(ScriptRuntimeError::new(name, &err)),
        };
        function
            .call::<()>(args)
            .map(|()| true)
            .map_err(|err| ScriptRuntimeError::new(name, &err))
    }

    /// Take the commands recorded since the last call.
    pub fn take_draw_list(&self) -> DrawList {
        self.draw.take()
    }

    pub fn console_lines(&self) -> Vec<String> {
        self.console.lines()
    }
}

impl std::fmt::Debug for ScriptEnvironment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScriptEnvironment")
            .field("entry_path", &self.entry_path)
            .finish_non_exhaustive()
    }
}

/// Let `require` resolve modules next to the entry script.
fn set_package_path(lua: &Lua, entry: &Path) -> mlua::Result<()> {
    let dir = entry
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    let package: mlua::Table = lua.globals().get("package")?;
    let current: String = package.get("path")?;
    package.set("path", format!("{}/?.lua;{}", dir.display(), current))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn write_script(dir: &TempDir, name: &str, source: &str) -> PathBuf {
        let path = dir.path().join(name);
        fs::write(&path, source).unwrap();
        path
    }

    #[test]
    fn test_missing_file_is_load_error() {
        let dir = TempDir::new().unwrap();
        let err = ScriptEnvironment::load(&dir.path().join("nope.lua")).unwrap_err();
        assert!(matches!(err, StartError::Load(ScriptLoadError::Missing { .. })));
    }

    #[test]
    fn test_syntax_error_reports_location() {
        let dir = TempDir::new().unwrap();
        let path = write_script(&dir, "bad.lua", "local x = 1\nfunction (\n");
        let err = ScriptEnvironment::load(&path).unwrap_err();
        match err {
            StartError::Load(load @ ScriptLoadError::Syntax { .. }) => {
                let location = load.location().expect("location");
                assert!(location.chunk.ends_with("bad.lua"));
                assert_eq!(location.line, 2);
            }
            other => panic!("expected syntax error, got {other:?}"),
        }
    }

    #[test]
    fn test_top_level_error_is_execution_error() {
        let dir = TempDir::new().unwrap();
        let path = write_script(&dir, "boom.lua", "error('boom')\n");
        let err = ScriptEnvironment::load(&path).unwrap_err();
        assert!(matches!(err, StartError::Load(ScriptLoadError::Execution { .. })));
    }

    #[test]
    fn test_print_goes_to_console() {
        let dir = TempDir::new().unwrap();
        let path = write_script(&dir, "p.lua", "print('hello', 1, true, nil)\n");
        let env = ScriptEnvironment::load(&path).unwrap();
        assert_eq!(env.console_lines(), vec!["hello\t1\ttrue\tnil".to_string()]);
    }

    #[test]
    fn test_console_is_bounded() {
        let dir = TempDir::new().unwrap();
        let path = write_script(&dir, "p.lua", "for i = 1, 100 do print(i) end\n");
        let env = ScriptEnvironment::load(&path).unwrap();
        let lines = env.console_lines();
        assert_eq!(lines.len(), CONSOLE_CAPACITY);
        assert_eq!(lines.last().map(String::as_str), Some("100"));
    }

    #[test]
    fn test_missing_entry_point_is_skipped() {
        let dir = TempDir::new().unwrap();
        let path = write_script(&dir, "empty.lua", "x = 1\n");
        let env = ScriptEnvironment::load(&path).unwrap();
        assert!(!env.has_entry(entry::FRAME));
        assert_eq!(env.call_entry(entry::FRAME, ()), Ok(false));
    }

    #[test]
    fn test_require_resolves_sibling_module() {
        let dir = TempDir::new().unwrap();
        write_script(&dir, "nodes.lua", "return { count = 3 }\n");
        let path = write_script(&dir, "main.lua", "local nodes = require('nodes')\nprint(nodes.count)\n");
        let env = ScriptEnvironment::load(&path).unwrap();
        assert_eq!(env.console_lines(), vec!["3".to_string()]);
    }
}
