//! luminos: a node-graph editor whose behaviour lives in a hot-reloadable
//! Lua program.
//!
//! The host samples input once per frame, classifies every channel into an
//! [`input::EdgeState`], publishes the result into the script and renders the
//! draw commands the script records.

pub mod config;
pub mod draw;
pub mod frame;
pub mod input;
pub mod logging;
pub mod scripting;
pub mod tui;
