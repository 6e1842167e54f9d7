use crossterm::event::{
    self, DisableFocusChange, DisableMouseCapture, EnableFocusChange, EnableMouseCapture, Event,
    KeyboardEnhancementFlags, MouseButton as TermMouseButton, MouseEvent, MouseEventKind,
    PopKeyboardEnhancementFlags, PushKeyboardEnhancementFlags,
};
use crossterm::execute;
use crossterm::terminal::{
    disable_raw_mode, enable_raw_mode, supports_keyboard_enhancement, EnterAlternateScreen,
    LeaveAlternateScreen,
};
use ratatui::prelude::*;
use std::io;
use std::time::Duration;
use tracing::{debug, trace};

use crate::config::CanvasConfig;
use crate::frame::{FrameView, Host, HostSignal};
use crate::input::{MouseButton, RawDeviceState};
use crate::tui::keyboard::{is_interrupt, KeyTracker};
use crate::tui::views::{cell_to_canvas, render_frame};

/// Terminal host: raw mode, mouse capture and a ratatui canvas.
pub struct TerminalHost {
    terminal: Terminal<CrosstermBackend<io::Stdout>>,
    keys: KeyTracker,
    canvas: CanvasConfig,
    canvas_area: Rect,
}

impl TerminalHost {
    pub fn new(canvas: CanvasConfig) -> io::Result<Self> {
        enable_raw_mode()?;
        let mut stdout = io::stdout();
        execute!(stdout, EnterAlternateScreen, EnableMouseCapture, EnableFocusChange)?;

        // Release events need the kitty keyboard protocol
        let reports_release = supports_keyboard_enhancement().unwrap_or(false);
        if reports_release {
            execute!(
                stdout,
                PushKeyboardEnhancementFlags(
                    KeyboardEnhancementFlags::DISAMBIGUATE_ESCAPE_CODES
                        | KeyboardEnhancementFlags::REPORT_EVENT_TYPES
                        | KeyboardEnhancementFlags::REPORT_ALL_KEYS_AS_ESCAPE_CODES
                )
            )?;
        }
        debug!(target: "input", "Terminal reports key releases: {}", reports_release);

        let backend = CrosstermBackend::new(stdout);
        let options = ratatui::TerminalOptions {
            viewport: ratatui::Viewport::Fullscreen,
        };
        let terminal = Terminal::with_options(backend, options)?;

        Ok(Self {
            terminal,
            keys: KeyTracker::new(reports_release),
            canvas,
            canvas_area: Rect::default(),
        })
    }

    fn mouse_event(&mut self, device: &mut RawDeviceState, mouse: MouseEvent) {
        let (x, y) = cell_to_canvas(self.canvas_area, &self.canvas, mouse.column, mouse.row);
        device.set_cursor(x, y);
        match mouse.kind {
            MouseEventKind::Down(button) => device.set_button(convert_button(button), true),
            MouseEventKind::Up(button) => device.set_button(convert_button(button), false),
            _ => {}
        }
    }
}

fn convert_button(button: TermMouseButton) -> MouseButton {
    match button {
        TermMouseButton::Left => MouseButton::Left,
        TermMouseButton::Middle => MouseButton::Middle,
        TermMouseButton::Right => MouseButton::Right,
    }
}

impl Host for TerminalHost {
    fn poll(&mut self, device: &mut RawDeviceState, text: &mut Vec<String>) -> io::Result<HostSignal> {
        self.keys.begin_poll(device);
        while event::poll(Duration::ZERO)? {
            match event::read()? {
                Event::Key(key) => {
                    if is_interrupt(&key) {
                        return Ok(HostSignal::Close);
                    }
                    if let Some(t) = self.keys.key_event(device, &key) {
                        text.push(t);
                    }
                }
                Event::Mouse(mouse) => self.mouse_event(device, mouse),
                Event::FocusLost => device.release_all_keys(),
                _ => {}
            }
        }
        Ok(HostSignal::Continue)
    }

    fn present(&mut self, view: &FrameView<'_>) -> io::Result<()> {
        if let Some((x, y)) = view.draw.warp_mouse {
            trace!(target: "input", "Ignoring mouse warp to ({}, {})", x, y);
        }
        let canvas = &self.canvas;
        let mut area = self.canvas_area;
        self.terminal.draw(|frame| {
            area = render_frame(frame, view, canvas);
        })?;
        self.canvas_area = area;
        Ok(())
    }
}

impl Drop for TerminalHost {
    fn drop(&mut self) {
        let mut stdout = io::stdout();
        if self.keys.reports_release() {
            execute!(stdout, PopKeyboardEnhancementFlags).ok();
        }
        execute!(stdout, DisableFocusChange, DisableMouseCapture, LeaveAlternateScreen).ok();
        disable_raw_mode().ok();
        self.terminal.show_cursor().ok();
    }
}
