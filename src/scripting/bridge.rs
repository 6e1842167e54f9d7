//! Publishes classified input into the script's global namespace.
//!
//! The script sees a fixed-schema `g_mouseState` table plus the `input`,
//! `keys` and `edge` tables. Both the table and the keyboard edge buffer are
//! owned by one environment and dropped with it, so nothing published here
//! survives a reload.

use std::cell::RefCell;
use std::rc::Rc;

use mlua::{Lua, Table};

use crate::input::{EdgeState, InputSnapshot, KeyboardEdges, MouseButton, Scancode};

/// Name of the pointer table in the script's globals
pub const MOUSE_STATE_GLOBAL: &str = "g_mouseState";

/// Pointer fields written into the script every frame
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct PointerState {
    pub x: f32,
    pub y: f32,
    pub left: EdgeState,
    pub middle: EdgeState,
    pub right: EdgeState,
}

impl PointerState {
    pub fn from_snapshot(input: &InputSnapshot) -> Self {
        let (x, y) = input.cursor();
        Self {
            x,
            y,
            left: input.button(MouseButton::Left),
            middle: input.button(MouseButton::Middle),
            right: input.button(MouseButton::Right),
        }
    }
}

/// The script-visible input record of one environment
#[derive(Debug)]
pub struct GlobalStateTable {
    table: Table,
    keyboard: Rc<RefCell<KeyboardEdges>>,
}

impl GlobalStateTable {
    /// Create the zeroed table and the input natives in `lua`.
    pub fn create(lua: &Lua) -> mlua::Result<Self> {
        let table = lua.create_table_with_capacity(0, 5)?;
        let keyboard = Rc::new(RefCell::new(KeyboardEdges::default()));
        let bridge = Self { table, keyboard };

        bridge.write(&PointerState::default())?;
        lua.globals().set(MOUSE_STATE_GLOBAL, bridge.table.clone())?;
        bridge.register_natives(lua)?;
        Ok(bridge)
    }

    /// Overwrite the pointer fields and keyboard edges for this frame.
    pub fn publish(&self, pointer: &PointerState, keyboard: &KeyboardEdges) -> mlua::Result<()> {
        self.write(pointer)?;
        self.keyboard.borrow_mut().clone_from(keyboard);
        Ok(())
    }

    /// Read back the published record. Only used by tests and diagnostics;
    /// the frame loop never reads script state.
    pub fn snapshot(&self) -> mlua::Result<(f64, f64, u8, u8, u8)> {
        Ok((
            self.table.get("mx")?,
            self.table.get("my")?,
            self.table.get("left")?,
            self.table.get("middle")?,
            self.table.get("right")?,
        ))
    }

    fn write(&self, pointer: &PointerState) -> mlua::Result<()> {
        self.table.raw_set("mx", f64::from(pointer.x))?;
        self.table.raw_set("my", f64::from(pointer.y))?;
        self.table.raw_set("left", pointer.left.code())?;
        self.table.raw_set("middle", pointer.middle.code())?;
        self.table.raw_set("right", pointer.right.code())?;
        Ok(())
    }

    fn register_natives(&self, lua: &Lua) -> mlua::Result<()> {
        let input = lua.create_table()?;
        let keyboard = Rc::clone(&self.keyboard);
        input.set(
            "key",
            lua.create_function(move |_, raw: i64| {
                keyboard
                    .borrow()
                    .query(raw)
                    .map(EdgeState::code)
                    .map_err(mlua::Error::external)
            })?,
        )?;
        lua.globals().set("input", input)?;

        let keys = lua.create_table()?;
        for (name, sc) in Scancode::named() {
            keys.set(name, sc.index())?;
        }
        lua.globals().set("keys", keys)?;

        let edge = lua.create_table()?;
        for state in [EdgeState::Idle, EdgeState::Press, EdgeState::Release, EdgeState::Hold] {
            edge.set(state.name().to_ascii_uppercase(), state.code())?;
        }
        lua.globals().set("edge", edge)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::RawDeviceState;

    #[test]
    fn test_table_starts_zeroed() {
        let lua = Lua::new();
        let table = GlobalStateTable::create(&lua).unwrap();
        assert_eq!(table.snapshot().unwrap(), (0.0, 0.0, 0, 0, 0));

        let left: u8 = lua.load("return g_mouseState.left").eval().unwrap();
        assert_eq!(left, 0);
    }

    #[test]
    fn test_publish_overwrites_fields() {
        let lua = Lua::new();
        let table = GlobalStateTable::create(&lua).unwrap();

        let mut input = InputSnapshot::new();
        input.begin_frame(
            &RawDeviceState::new()
                .with_cursor(120.0, 48.5)
                .with_button(MouseButton::Right),
        );
        table
            .publish(&PointerState::from_snapshot(&input), &input.keyboard_edges())
            .unwrap();

        let (mx, my, right): (f64, f64, u8) = lua
            .load("return g_mouseState.mx, g_mouseState.my, g_mouseState.right")
            .eval()
            .unwrap();
        assert_eq!((mx, my, right), (120.0, 48.5, EdgeState::Press.code()));
    }

    #[test]
    fn test_input_key_reads_published_edges() {
        let lua = Lua::new();
        let table = GlobalStateTable::create(&lua).unwrap();

        let mut input = InputSnapshot::new();
        input.begin_frame(&RawDeviceState::new().with_key(Scancode::SPACE));
        input.commit_frame();
        table
            .publish(&PointerState::from_snapshot(&input), &input.keyboard_edges())
            .unwrap();

        let held: bool = lua
            .load("return input.key(keys.SPACE) == edge.HOLD")
            .eval()
            .unwrap();
        assert!(held);
    }

    #[test]
    fn test_input_key_rejects_out_of_range_channel() {
        let lua = Lua::new();
        let _table = GlobalStateTable::create(&lua).unwrap();

        let err = lua.load("return input.key(9000)").exec().unwrap_err();
        assert!(err.to_string().contains("9000"));
    }
}
