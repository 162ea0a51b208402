//! Infrastructure layer providing external service integrations.
//!
//! Concrete draft stores, the HTTP and in-memory backends, and clipboard
//! access live here. Everything above this layer only sees the traits in
//! [`crate::domain`].

pub mod backend;
pub mod clipboard;
pub mod memory;
pub mod persistence;

pub use backend::*;
pub use clipboard::*;
pub use memory::*;
pub use persistence::*;
