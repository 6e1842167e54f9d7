//! Per-frame input state.
//!
//! The host writes raw device levels into a [`RawDeviceState`]. Each frame the
//! [`InputSnapshot`] copies that state into its *current* generation, consumers
//! classify channels against the *previous* generation, and at the end of the
//! frame *current* becomes *previous*.
pub mod edge;
pub mod hotkeys;

use bitflags::bitflags;
use thiserror::Error;

pub use edge::EdgeState;
pub use hotkeys::{HotkeyAction, Hotkeys};

/// Number of keyboard channels, indexed by scancode
pub const KEY_CHANNELS: usize = 512;

/// A channel index outside the device channel space was queried
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("input channel {0} is outside the keyboard channel space (0..{KEY_CHANNELS})")]
pub struct InputQueryViolation(pub i64);

/// Keyboard channel index (SDL scancode numbering)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Scancode(u16);

impl Scancode {
    pub const A: Scancode = Scancode(4);
    pub const Q: Scancode = Scancode(20);
    pub const NUM_1: Scancode = Scancode(30);
    pub const NUM_0: Scancode = Scancode(39);
    pub const RETURN: Scancode = Scancode(40);
    pub const ESCAPE: Scancode = Scancode(41);
    pub const BACKSPACE: Scancode = Scancode(42);
    pub const TAB: Scancode = Scancode(43);
    pub const SPACE: Scancode = Scancode(44);
    pub const F1: Scancode = Scancode(58);
    pub const F4: Scancode = Scancode(61);
    pub const F5: Scancode = Scancode(62);
    pub const F12: Scancode = Scancode(69);
    pub const HOME: Scancode = Scancode(74);
    pub const PAGE_UP: Scancode = Scancode(75);
    pub const DELETE: Scancode = Scancode(76);
    pub const END: Scancode = Scancode(77);
    pub const PAGE_DOWN: Scancode = Scancode(78);
    pub const RIGHT: Scancode = Scancode(79);
    pub const LEFT: Scancode = Scancode(80);
    pub const DOWN: Scancode = Scancode(81);
    pub const UP: Scancode = Scancode(82);
    pub const LCTRL: Scancode = Scancode(224);
    pub const LSHIFT: Scancode = Scancode(225);
    pub const LALT: Scancode = Scancode(226);
    pub const RCTRL: Scancode = Scancode(228);
    pub const RSHIFT: Scancode = Scancode(229);
    pub const RALT: Scancode = Scancode(230);

    /// Validate a raw channel index.
    pub fn new(raw: i64) -> Result<Self, InputQueryViolation> {
        if (0..KEY_CHANNELS as i64).contains(&raw) {
            Ok(Scancode(raw as u16))
        } else {
            Err(InputQueryViolation(raw))
        }
    }

    /// Scancode of an ASCII letter or digit.
    pub fn from_char(c: char) -> Option<Self> {
        match c.to_ascii_lowercase() {
            c @ 'a'..='z' => Some(Scancode(Self::A.0 + (c as u16 - 'a' as u16))),
            '0' => Some(Self::NUM_0),
            c @ '1'..='9' => Some(Scancode(Self::NUM_1.0 + (c as u16 - '1' as u16))),
            ' ' => Some(Self::SPACE),
            _ => None,
        }
    }

    /// Scancode of function key `F<n>` for n in 1..=12.
    pub fn function(n: u8) -> Option<Self> {
        (1..=12)
            .contains(&n)
            .then(|| Scancode(Self::F1.0 + u16::from(n - 1)))
    }

    pub fn index(self) -> usize {
        self.0 as usize
    }

    /// Named scancodes exposed to scripts.
    pub fn named() -> Vec<(String, Scancode)> {
        let mut named: Vec<(String, Scancode)> = ('A'..='Z')
            .chain('0'..='9')
            .filter_map(|c| Scancode::from_char(c).map(|sc| (c.to_string(), sc)))
            .collect();
        named.extend((1..=12).filter_map(|n| Scancode::function(n).map(|sc| (format!("F{n}"), sc))));
        named.extend(
            [
                ("RETURN", Self::RETURN),
                ("ESCAPE", Self::ESCAPE),
                ("BACKSPACE", Self::BACKSPACE),
                ("TAB", Self::TAB),
                ("SPACE", Self::SPACE),
                ("HOME", Self::HOME),
                ("PAGE_UP", Self::PAGE_UP),
                ("DELETE", Self::DELETE),
                ("END", Self::END),
                ("PAGE_DOWN", Self::PAGE_DOWN),
                ("RIGHT", Self::RIGHT),
                ("LEFT", Self::LEFT),
                ("DOWN", Self::DOWN),
                ("UP", Self::UP),
                ("LCTRL", Self::LCTRL),
                ("LSHIFT", Self::LSHIFT),
                ("LALT", Self::LALT),
                ("RCTRL", Self::RCTRL),
                ("RSHIFT", Self::RSHIFT),
                ("RALT", Self::RALT),
            ]
            .into_iter()
            .map(|(name, sc)| (name.to_string(), sc)),
        );
        named
    }
}

bitflags! {
    /// Mouse button levels
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct MouseButtons: u8 {
        const LEFT = 1 << 0;
        const MIDDLE = 1 << 1;
        const RIGHT = 1 << 2;
    }
}

/// A single mouse button channel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MouseButton {
    Left,
    Middle,
    Right,
}

impl MouseButton {
    fn mask(self) -> MouseButtons {
        match self {
            MouseButton::Left => MouseButtons::LEFT,
            MouseButton::Middle => MouseButtons::MIDDLE,
            MouseButton::Right => MouseButtons::RIGHT,
        }
    }
}

/// Any input channel that can be classified
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Channel {
    Key(Scancode),
    Mouse(MouseButton),
}

impl From<Scancode> for Channel {
    fn from(sc: Scancode) -> Self {
        Channel::Key(sc)
    }
}

impl From<MouseButton> for Channel {
    fn from(button: MouseButton) -> Self {
        Channel::Mouse(button)
    }
}

/// Raw device levels as reported by the host
#[derive(Debug, Clone, PartialEq)]
pub struct RawDeviceState {
    keys: [bool; KEY_CHANNELS],
    pub buttons: MouseButtons,
    pub cursor_x: f32,
    pub cursor_y: f32,
}

impl Default for RawDeviceState {
    fn default() -> Self {
        Self {
            keys: [false; KEY_CHANNELS],
            buttons: MouseButtons::empty(),
            cursor_x: 0.0,
            cursor_y: 0.0,
        }
    }
}

impl RawDeviceState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn key_down(&self, sc: Scancode) -> bool {
        debug_assert!(sc.index() < KEY_CHANNELS);
        self.keys[sc.index()]
    }

    pub fn set_key(&mut self, sc: Scancode, down: bool) {
        debug_assert!(sc.index() < KEY_CHANNELS);
        self.keys[sc.index()] = down;
    }

    pub fn button_down(&self, button: MouseButton) -> bool {
        self.buttons.contains(button.mask())
    }

    pub fn set_button(&mut self, button: MouseButton, down: bool) {
        self.buttons.set(button.mask(), down);
    }

    pub fn set_cursor(&mut self, x: f32, y: f32) {
        self.cursor_x = x;
        self.cursor_y = y;
    }

    pub fn release_all_keys(&mut self) {
        self.keys = [false; KEY_CHANNELS];
    }

    /// Builder-style helpers for constructing states in tests and replays.
    pub fn with_key(mut self, sc: Scancode) -> Self {
        self.set_key(sc, true);
        self
    }

    pub fn with_button(mut self, button: MouseButton) -> Self {
        self.set_button(button, true);
        self
    }

    pub fn with_cursor(mut self, x: f32, y: f32) -> Self {
        self.set_cursor(x, y);
        self
    }

    fn level(&self, channel: Channel) -> bool {
        match channel {
            Channel::Key(sc) => self.key_down(sc),
            Channel::Mouse(button) => self.button_down(button),
        }
    }
}

/// Edge codes of every keyboard channel for one frame
#[derive(Debug, Clone, PartialEq)]
pub struct KeyboardEdges([EdgeState; KEY_CHANNELS]);

impl Default for KeyboardEdges {
    fn default() -> Self {
        Self([EdgeState::Idle; KEY_CHANNELS])
    }
}

impl KeyboardEdges {
    pub fn get(&self, sc: Scancode) -> EdgeState {
        self.0[sc.index()]
    }

    /// Look up a raw channel index coming from outside the crate.
    pub fn query(&self, raw: i64) -> Result<EdgeState, InputQueryViolation> {
        Scancode::new(raw).map(|sc| self.get(sc))
    }
}

/// Current and previous generation of device state
#[derive(Debug, Clone, Default)]
pub struct InputSnapshot {
    current: RawDeviceState,
    previous: RawDeviceState,
}

impl InputSnapshot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Capture the live device state into the current generation.
    pub fn begin_frame(&mut self, live: &RawDeviceState) {
        self.current.clone_from(live);
    }

    /// Make the current generation the previous one. Call once every consumer
    /// has read this frame's state.
    pub fn commit_frame(&mut self) {
        self.previous.clone_from(&self.current);
    }

    pub fn current(&self) -> &RawDeviceState {
        &self.current
    }

    pub fn previous(&self) -> &RawDeviceState {
        &self.previous
    }

    /// Classify a channel against the previous generation.
    pub fn classify(&self, channel: impl Into<Channel>) -> EdgeState {
        let channel = channel.into();
        EdgeState::from_levels(self.previous.level(channel), self.current.level(channel))
    }

    pub fn key(&self, sc: Scancode) -> EdgeState {
        self.classify(sc)
    }

    pub fn button(&self, button: MouseButton) -> EdgeState {
        self.classify(button)
    }

    pub fn cursor(&self) -> (f32, f32) {
        (self.current.cursor_x, self.current.cursor_y)
    }

    pub fn keyboard_edges(&self) -> KeyboardEdges {
        let mut edges = KeyboardEdges::default();
        for (i, edge) in edges.0.iter_mut().enumerate() {
            *edge = EdgeState::from_levels(self.previous.keys[i], self.current.keys[i]);
        }
        edges
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn step(snapshot: &mut InputSnapshot, live: &RawDeviceState) -> EdgeState {
        snapshot.begin_frame(live);
        let edge = snapshot.button(MouseButton::Left);
        snapshot.commit_frame();
        edge
    }

    #[test]
    fn test_begin_frame_leaves_previous_untouched() {
        let mut snapshot = InputSnapshot::new();
        let live = RawDeviceState::new().with_key(Scancode::Q);
        snapshot.begin_frame(&live);
        assert!(snapshot.current().key_down(Scancode::Q));
        assert!(!snapshot.previous().key_down(Scancode::Q));

        snapshot.commit_frame();
        assert!(snapshot.previous().key_down(Scancode::Q));
    }

    #[test]
    fn test_left_button_down_down_up() {
        let mut snapshot = InputSnapshot::new();
        let down = RawDeviceState::new().with_button(MouseButton::Left);
        let up = RawDeviceState::new();

        let edges: Vec<_> = [&down, &down, &up]
            .into_iter()
            .map(|live| step(&mut snapshot, live))
            .collect();
        assert_eq!(edges, vec![EdgeState::Press, EdgeState::Hold, EdgeState::Release]);
    }

    #[test]
    fn test_hold_across_many_frames_then_release() {
        let mut snapshot = InputSnapshot::new();
        let down = RawDeviceState::new().with_key(Scancode::F5);
        let up = RawDeviceState::new();

        let mut edges = Vec::new();
        for _ in 0..5 {
            snapshot.begin_frame(&down);
            edges.push(snapshot.key(Scancode::F5));
            snapshot.commit_frame();
        }
        for _ in 0..3 {
            snapshot.begin_frame(&up);
            edges.push(snapshot.key(Scancode::F5));
            snapshot.commit_frame();
        }

        assert_eq!(edges[0], EdgeState::Press);
        assert!(edges[1..5].iter().all(|e| *e == EdgeState::Hold));
        assert_eq!(edges[5], EdgeState::Release);
        assert!(edges[6..].iter().all(|e| *e == EdgeState::Idle));
    }

    #[test]
    fn test_classify_without_commit_is_stable() {
        let mut snapshot = InputSnapshot::new();
        snapshot.begin_frame(&RawDeviceState::new().with_key(Scancode::A));
        assert_eq!(snapshot.key(Scancode::A), EdgeState::Press);
        assert_eq!(snapshot.key(Scancode::A), EdgeState::Press);
    }

    #[test]
    fn test_keyboard_edges_match_classify() {
        let mut snapshot = InputSnapshot::new();
        snapshot.begin_frame(&RawDeviceState::new().with_key(Scancode::LCTRL));
        snapshot.commit_frame();
        snapshot.begin_frame(&RawDeviceState::new().with_key(Scancode::LCTRL).with_key(Scancode::Q));

        let edges = snapshot.keyboard_edges();
        assert_eq!(edges.get(Scancode::LCTRL), EdgeState::Hold);
        assert_eq!(edges.get(Scancode::Q), EdgeState::Press);
        assert_eq!(edges.get(Scancode::A), EdgeState::Idle);
    }

    #[test]
    fn test_scancode_range_is_checked() {
        assert!(Scancode::new(0).is_ok());
        assert!(Scancode::new(511).is_ok());
        assert_eq!(Scancode::new(512), Err(InputQueryViolation(512)));
        assert_eq!(Scancode::new(-1), Err(InputQueryViolation(-1)));
        assert!(KeyboardEdges::default().query(4096).is_err());
    }

    #[test]
    fn test_char_and_function_scancodes() {
        assert_eq!(Scancode::from_char('q'), Some(Scancode::Q));
        assert_eq!(Scancode::from_char('Q'), Some(Scancode::Q));
        assert_eq!(Scancode::from_char('0'), Some(Scancode::NUM_0));
        assert_eq!(Scancode::function(5), Some(Scancode::F5));
        assert_eq!(Scancode::function(13), None);
        assert!(Scancode::named().iter().any(|(name, sc)| name == "F4" && *sc == Scancode::F4));
    }
}
