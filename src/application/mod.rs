//! Application layer managing state and business workflows.
//!
//! [`FormSession`] owns the form lifecycle: field edits, step navigation,
//! validation gates, draft autosave and submission. [`UploadQueue`] runs
//! attachment uploads in the background, and [`App`] adds the UI-only state
//! the terminal front end needs.

pub mod autosave;
pub mod session;
pub mod state;
pub mod uploads;

pub use autosave::*;
pub use session::*;
pub use state::*;
pub use uploads::*;
