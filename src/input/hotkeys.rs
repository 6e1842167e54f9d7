//! Fixed editor hotkeys.
//!
//! Every action fires on a `Press` edge, so holding a key down across many
//! frames triggers it once.

use super::{EdgeState, InputSnapshot, Scancode};

/// Action requested by a hotkey this frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HotkeyAction {
    /// Stop the frame loop after this frame
    Quit,
    /// Show or hide the error panel
    ToggleError,
    /// Tear down and restart the script environment
    Reload,
}

/// Key bindings for the host-level actions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Hotkeys {
    pub quit_modifier: Scancode,
    pub quit: Scancode,
    pub toggle_error: Scancode,
    pub reload: Scancode,
}

impl Default for Hotkeys {
    fn default() -> Self {
        Self {
            quit_modifier: Scancode::LCTRL,
            quit: Scancode::Q,
            toggle_error: Scancode::F4,
            reload: Scancode::F5,
        }
    }
}

impl Hotkeys {
    /// Detect the actions triggered by this frame's edges.
    ///
    /// Quit wins over everything else. The quit chord only registers when the
    /// modifier was already down last frame and the key goes down this frame;
    /// pressing both in the same frame does not quit.
    pub fn detect(&self, input: &InputSnapshot) -> Vec<HotkeyAction> {
        if input.key(self.quit_modifier) == EdgeState::Hold && input.key(self.quit).is_press() {
            return vec![HotkeyAction::Quit];
        }

        let mut actions = Vec::new();
        if input.key(self.toggle_error).is_press() {
            actions.push(HotkeyAction::ToggleError);
        }
        if input.key(self.reload).is_press() {
            actions.push(HotkeyAction::Reload);
        }
        actions
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::RawDeviceState;

    fn frames(states: &[RawDeviceState]) -> Vec<Vec<HotkeyAction>> {
        let hotkeys = Hotkeys::default();
        let mut snapshot = InputSnapshot::new();
        states
            .iter()
            .map(|live| {
                snapshot.begin_frame(live);
                let actions = hotkeys.detect(&snapshot);
                snapshot.commit_frame();
                actions
            })
            .collect()
    }

    #[test]
    fn test_reload_fires_once_while_held() {
        let held = RawDeviceState::new().with_key(Scancode::F5);
        let actions = frames(&[held.clone(), held.clone(), held]);
        assert_eq!(actions[0], vec![HotkeyAction::Reload]);
        assert!(actions[1].is_empty());
        assert!(actions[2].is_empty());
    }

    #[test]
    fn test_quit_chord_requires_held_modifier() {
        let ctrl = RawDeviceState::new().with_key(Scancode::LCTRL);
        let ctrl_q = ctrl.clone().with_key(Scancode::Q);
        let actions = frames(&[ctrl, ctrl_q]);
        assert!(actions[0].is_empty());
        assert_eq!(actions[1], vec![HotkeyAction::Quit]);
    }

    #[test]
    fn test_quit_chord_in_single_frame_is_not_detected() {
        let both = RawDeviceState::new()
            .with_key(Scancode::LCTRL)
            .with_key(Scancode::Q);
        let actions = frames(&[both]);
        assert!(actions[0].is_empty());
    }

    #[test]
    fn test_quit_suppresses_other_actions() {
        let ctrl = RawDeviceState::new().with_key(Scancode::LCTRL);
        let everything = ctrl
            .clone()
            .with_key(Scancode::Q)
            .with_key(Scancode::F4)
            .with_key(Scancode::F5);
        let actions = frames(&[ctrl, everything]);
        assert_eq!(actions[1], vec![HotkeyAction::Quit]);
    }

    #[test]
    fn test_toggle_and_reload_same_frame() {
        let both = RawDeviceState::new()
            .with_key(Scancode::F4)
            .with_key(Scancode::F5);
        let actions = frames(&[both]);
        assert_eq!(actions[0], vec![HotkeyAction::ToggleError, HotkeyAction::Reload]);
    }
}
