pub mod keyboard;
pub mod ui;
pub mod views;

pub use ui::TerminalHost;
