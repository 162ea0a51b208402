//! stepform - multi-step submission form
//!
//! A four step form (personal info, submission type, details, review) with
//! per-step validation, debounced draft autosave, background attachment
//! uploads and a terminal front end.

pub mod application;
pub mod config;
pub mod domain;
pub mod infrastructure;
pub mod presentation;
pub mod telemetry;

pub use application::*;
pub use domain::*;
