//! Four-state edge classification of an input channel.

use std::fmt;

/// Transition of a channel between the previous and the current frame.
///
/// The discriminant is `(was_down << 1) | is_down`, so a single integer
/// comparison tells a fresh press apart from a held key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[repr(u8)]
pub enum EdgeState {
    /// Up in both frames
    #[default]
    Idle = 0b00,
    /// Went down this frame
    Press = 0b01,
    /// Went up this frame
    Release = 0b10,
    /// Down in both frames
    Hold = 0b11,
}

impl EdgeState {
    /// Classify a channel from its level in the previous and current frame.
    #[inline]
    pub fn from_levels(was_down: bool, is_down: bool) -> Self {
        match ((was_down as u8) << 1) | is_down as u8 {
            0b00 => EdgeState::Idle,
            0b01 => EdgeState::Press,
            0b10 => EdgeState::Release,
            _ => EdgeState::Hold,
        }
    }

    /// Numeric code published to scripts.
    #[inline]
    pub fn code(self) -> u8 {
        self as u8
    }

    /// True on the single frame a channel goes down.
    pub fn is_press(self) -> bool {
        self == EdgeState::Press
    }

    /// True while the channel is down, including the press frame.
    pub fn is_down(self) -> bool {
        matches!(self, EdgeState::Press | EdgeState::Hold)
    }

    pub fn name(self) -> &'static str {
        match self {
            EdgeState::Idle => "idle",
            EdgeState::Press => "press",
            EdgeState::Release => "release",
            EdgeState::Hold => "hold",
        }
    }
}

impl fmt::Display for EdgeState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
