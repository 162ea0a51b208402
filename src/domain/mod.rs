//! Domain layer: the form model, validation rules, collaborator contracts
//! and error types. Nothing here performs I/O.

pub mod models;
pub mod services;
pub mod errors;
pub mod validation;

pub use models::*;
pub use services::*;
pub use errors::*;
pub use validation::*;
