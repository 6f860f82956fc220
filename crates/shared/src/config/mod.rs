//! Configuration for the latent worker subsystem
//!
//! Split the way the platform loads every service config: immutable DTOs,
//! an env-first loader with optional `.env` support, and a validator that
//! fails fast at startup.

pub mod dto;
pub mod error;
pub mod loader;
pub mod validator;

pub use dto::*;
pub use error::*;
pub use loader::*;
pub use validator::*;
