//! Keyboard event conversion
//!
//! Converts crossterm key events into raw key levels on a
//! [`RawDeviceState`] plus text-input strings.

use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers, ModifierKeyCode};

use crate::input::{RawDeviceState, Scancode};

const MODIFIERS: [(Scancode, KeyModifiers); 3] = [
    (Scancode::LCTRL, KeyModifiers::CONTROL),
    (Scancode::LSHIFT, KeyModifiers::SHIFT),
    (Scancode::LALT, KeyModifiers::ALT),
];

/// Level that tracks a modifier family. Either side of a modifier key
/// drives the left-hand level that chord flags are synced to.
fn modifier_level(modifier: &ModifierKeyCode) -> Option<Scancode> {
    match modifier {
        ModifierKeyCode::LeftControl | ModifierKeyCode::RightControl => Some(Scancode::LCTRL),
        ModifierKeyCode::LeftShift | ModifierKeyCode::RightShift => Some(Scancode::LSHIFT),
        ModifierKeyCode::LeftAlt | ModifierKeyCode::RightAlt => Some(Scancode::LALT),
        _ => None,
    }
}

/// Convert a crossterm KeyCode to a scancode
pub fn scancode_for(code: &KeyCode) -> Option<Scancode> {
    match code {
        KeyCode::Char(c) => Scancode::from_char(*c),
        KeyCode::Enter => Some(Scancode::RETURN),
        KeyCode::Tab | KeyCode::BackTab => Some(Scancode::TAB),
        KeyCode::Backspace => Some(Scancode::BACKSPACE),
        KeyCode::Esc => Some(Scancode::ESCAPE),
        KeyCode::Delete => Some(Scancode::DELETE),
        KeyCode::Home => Some(Scancode::HOME),
        KeyCode::End => Some(Scancode::END),
        KeyCode::PageUp => Some(Scancode::PAGE_UP),
        KeyCode::PageDown => Some(Scancode::PAGE_DOWN),
        KeyCode::Up => Some(Scancode::UP),
        KeyCode::Down => Some(Scancode::DOWN),
        KeyCode::Left => Some(Scancode::LEFT),
        KeyCode::Right => Some(Scancode::RIGHT),
        KeyCode::F(n) => Scancode::function(*n),
        KeyCode::Modifier(modifier) => match modifier {
            ModifierKeyCode::LeftControl => Some(Scancode::LCTRL),
            ModifierKeyCode::LeftShift => Some(Scancode::LSHIFT),
            ModifierKeyCode::LeftAlt => Some(Scancode::LALT),
            ModifierKeyCode::RightControl => Some(Scancode::RCTRL),
            ModifierKeyCode::RightShift => Some(Scancode::RSHIFT),
            ModifierKeyCode::RightAlt => Some(Scancode::RALT),
            _ => None,
        },
        _ => None,
    }
}

/// Ctrl+C always closes the terminal host
pub fn is_interrupt(event: &KeyEvent) -> bool {
    event.kind != KeyEventKind::Release
        && event.modifiers.contains(KeyModifiers::CONTROL)
        && matches!(event.code, KeyCode::Char('c') | KeyCode::Char('C'))
}

/// Text produced by a key event, if any
pub fn text_for(event: &KeyEvent) -> Option<String> {
    if event.kind == KeyEventKind::Release
        || event
            .modifiers
            .intersects(KeyModifiers::CONTROL | KeyModifiers::ALT)
    {
        return None;
    }
    match event.code {
        KeyCode::Char(c) => Some(c.to_string()),
        _ => None,
    }
}

/// Tracks key levels across polls.
///
/// Terminals that report key releases drive levels directly. Other
/// terminals only report presses, so each press becomes a one-poll pulse
/// and a chorded key is held back one poll so its modifiers are already
/// down when it arrives. A key pressed again right after its pulse ends is
/// also held back, so the repeat reads as a fresh press.
#[derive(Debug, Default)]
pub struct KeyTracker {
    reports_release: bool,
    pulsed: Vec<Scancode>,
    released: Vec<Scancode>,
    deferred: Vec<(Scancode, Vec<Scancode>)>,
}

impl KeyTracker {
    pub fn new(reports_release: bool) -> Self {
        Self {
            reports_release,
            ..Default::default()
        }
    }

    pub fn reports_release(&self) -> bool {
        self.reports_release
    }

    /// Settle pulses from the previous poll. Call once before reading events.
    pub fn begin_poll(&mut self, device: &mut RawDeviceState) {
        if self.reports_release {
            return;
        }
        self.released.clear();
        for sc in self.pulsed.drain(..) {
            device.set_key(sc, false);
            self.released.push(sc);
        }
        for (sc, modifiers) in self.deferred.drain(..) {
            device.set_key(sc, true);
            self.pulsed.push(sc);
            self.pulsed.extend(modifiers);
        }
    }

    /// Apply a key event. Returns the text it produced.
    pub fn key_event(&mut self, device: &mut RawDeviceState, event: &KeyEvent) -> Option<String> {
        let scancode = scancode_for(&event.code);
        if self.reports_release {
            self.apply_levels(device, event, scancode);
        } else if event.kind != KeyEventKind::Release {
            if let Some(sc) = scancode {
                self.apply_pulse(device, event, sc);
            }
        }
        text_for(event)
    }

    fn apply_levels(&mut self, device: &mut RawDeviceState, event: &KeyEvent, scancode: Option<Scancode>) {
        match &event.code {
            KeyCode::Modifier(modifier) => {
                // Flags synced from a chord would otherwise outlive the key
                if event.kind == KeyEventKind::Release {
                    if let Some(level) = modifier_level(modifier) {
                        device.set_key(level, false);
                    }
                }
            }
            _ => {
                for (sc, flag) in MODIFIERS {
                    device.set_key(sc, event.modifiers.contains(flag));
                }
            }
        }
        if let Some(sc) = scancode {
            device.set_key(sc, event.kind != KeyEventKind::Release);
        }
    }

    fn apply_pulse(&mut self, device: &mut RawDeviceState, event: &KeyEvent, sc: Scancode) {
        let modifiers: Vec<Scancode> = MODIFIERS
            .iter()
            .filter(|(_, flag)| event.modifiers.contains(*flag))
            .map(|(sc, _)| *sc)
            .collect();

        if modifiers.is_empty() && !self.released.contains(&sc) {
            device.set_key(sc, true);
            self.pulsed.push(sc);
        } else {
            // Chords wait for their modifiers; a key released this poll waits to read up
            for m in &modifiers {
                device.set_key(*m, true);
            }
            self.deferred.push((sc, modifiers));
        }
    }
}
