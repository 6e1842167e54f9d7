//! Draw commands emitted by the script through the `ui` table.
//!
//! The script never touches the render layer. Each native call appends a
//! command to the environment's [`DrawList`], and the frame loop hands the
//! finished list to the host.

use std::cell::RefCell;
use std::rc::Rc;

use mlua::{Lua, Table};

/// Visual state of a node-graph widget
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WidgetState {
    #[default]
    Default,
    Hover,
    Active,
}

impl WidgetState {
    /// Unknown codes fall back to `Default`.
    pub fn from_code(code: i64) -> Self {
        match code {
            1 => WidgetState::Hover,
            2 => WidgetState::Active,
            _ => WidgetState::Default,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rgba(pub u8, pub u8, pub u8, pub u8);

impl Rgba {
    pub const WHITE: Rgba = Rgba(255, 255, 255, 255);

    fn from_components(r: i64, g: i64, b: i64, a: i64) -> Self {
        let clamp = |v: i64| v.clamp(0, 255) as u8;
        Rgba(clamp(r), clamp(g), clamp(b), clamp(a))
    }
}

/// Horizontal text alignment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TextAlign {
    #[default]
    Left,
    Center,
    Right,
}

impl TextAlign {
    /// Reads the horizontal bits of an align mask (1 left, 2 center,
    /// 4 right). Vertical bits are ignored.
    pub fn from_code(code: i64) -> Self {
        if code & 2 != 0 {
            TextAlign::Center
        } else if code & 4 != 0 {
            TextAlign::Right
        } else {
            TextAlign::Left
        }
    }
}

/// Font settings applied to subsequent `ui.text` calls
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TextStyle {
    pub font: Option<String>,
    pub size: Option<f32>,
    pub align: TextAlign,
}

#[derive(Debug, Clone, PartialEq)]
pub enum DrawCommand {
    Node {
        x: f32,
        y: f32,
        w: f32,
        h: f32,
        state: WidgetState,
        title: String,
        color: Rgba,
    },
    Port {
        x: f32,
        y: f32,
        state: WidgetState,
        color: Rgba,
    },
    Wire {
        x0: f32,
        y0: f32,
        x1: f32,
        y1: f32,
        start: WidgetState,
        end: WidgetState,
    },
    Text {
        x: f32,
        y: f32,
        text: String,
        color: Rgba,
        style: TextStyle,
    },
}

/// Commands recorded during one `program_frame` call
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DrawList {
    pub commands: Vec<DrawCommand>,
    /// Cursor position the script asked the host to warp to
    pub warp_mouse: Option<(f32, f32)>,
}

impl DrawList {
    pub fn is_empty(&self) -> bool {
        self.commands.is_empty() && self.warp_mouse.is_none()
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }
}

#[derive(Debug, Clone, Default)]
struct TextState {
    color: Option<Rgba>,
    style: TextStyle,
}

#[derive(Debug, Default)]
struct Recorder {
    list: DrawList,
    text: TextState,
    saved: Vec<TextState>,
}

/// Shared recorder handed to the `ui` natives
#[derive(Debug, Clone, Default)]
pub struct DrawRecorder(Rc<RefCell<Recorder>>);

impl DrawRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    fn push(&self, command: DrawCommand) {
        self.0.borrow_mut().list.commands.push(command);
    }

    /// Take the recorded list, leaving an empty one for the next frame.
    /// Saves left unrestored are dropped; the current text state carries over.
    pub fn take(&self) -> DrawList {
        let mut recorder = self.0.borrow_mut();
        recorder.saved.clear();
        std::mem::take(&mut recorder.list)
    }

    /// Register the `ui` table in the given Lua state.
    pub fn register(&self, lua: &Lua) -> mlua::Result<()> {
        let ui: Table = lua.create_table()?;

        let rec = self.clone();
        ui.set(
            "node",
            lua.create_function(
                move |_, (x, y, w, h, state, title, r, g, b, a): (f32, f32, f32, f32, i64, String, i64, i64, i64, i64)| {
                    rec.push(DrawCommand::Node {
                        x,
                        y,
                        w,
                        h,
                        state: WidgetState::from_code(state),
                        title,
                        color: Rgba::from_components(r, g, b, a),
                    });
                    Ok(())
                },
            )?,
        )?;

        let rec = self.clone();
        ui.set(
            "port",
            lua.create_function(
                move |_, (x, y, state, r, g, b, a): (f32, f32, i64, i64, i64, i64, i64)| {
                    rec.push(DrawCommand::Port {
                        x,
                        y,
                        state: WidgetState::from_code(state),
                        color: Rgba::from_components(r, g, b, a),
                    });
                    Ok(())
                },
            )?,
        )?;

        let rec = self.clone();
        ui.set(
            "wire",
            lua.create_function(
                move |_, (x0, y0, x1, y1, start, end): (f32, f32, f32, f32, i64, i64)| {
                    rec.push(DrawCommand::Wire {
                        x0,
                        y0,
                        x1,
                        y1,
                        start: WidgetState::from_code(start),
                        end: WidgetState::from_code(end),
                    });
                    Ok(())
                },
            )?,
        )?;

        let rec = self.clone();
        ui.set(
            "text_color",
            lua.create_function(move |_, (r, g, b, a): (i64, i64, i64, Option<i64>)| {
                rec.0.borrow_mut().text.color = Some(Rgba::from_components(r, g, b, a.unwrap_or(255)));
                Ok(())
            })?,
        )?;

        let rec = self.clone();
        ui.set(
            "text_properties",
            lua.create_function(
                move |_, (font, size, align): (Option<String>, Option<f32>, Option<i64>)| {
                    rec.0.borrow_mut().text.style = TextStyle {
                        font,
                        size,
                        align: TextAlign::from_code(align.unwrap_or(0)),
                    };
                    Ok(())
                },
            )?,
        )?;

        let rec = self.clone();
        ui.set(
            "text",
            lua.create_function(move |_, (x, y, text): (f32, f32, String)| {
                let state = rec.0.borrow().text.clone();
                rec.push(DrawCommand::Text {
                    x,
                    y,
                    text,
                    color: state.color.unwrap_or(Rgba::WHITE),
                    style: state.style,
                });
                Ok(())
            })?,
        )?;

        let rec = self.clone();
        ui.set(
            "save",
            lua.create_function(move |_, ()| {
                let mut recorder = rec.0.borrow_mut();
                let current = recorder.text.clone();
                recorder.saved.push(current);
                Ok(())
            })?,
        )?;

        // Restore without a matching save leaves the state alone
        let rec = self.clone();
        ui.set(
            "restore",
            lua.create_function(move |_, ()| {
                let mut recorder = rec.0.borrow_mut();
                if let Some(saved) = recorder.saved.pop() {
                    recorder.text = saved;
                }
                Ok(())
            })?,
        )?;

        let rec = self.clone();
        ui.set(
            "warp_mouse",
            lua.create_function(move |_, (x, y): (f32, f32)| {
                rec.0.borrow_mut().list.warp_mouse = Some((x, y));
                Ok(())
            })?,
        )?;

        lua.globals().set("ui", ui)
    }
}
