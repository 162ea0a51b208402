//! Presentation layer handling terminal UI and user input.
//!
//! Rendering uses ratatui and reads [`App`](crate::application::App) without
//! mutating it. Key presses are routed through [`InputHandler`].

pub mod input;
pub mod ui;

pub use input::*;
pub use ui::*;
