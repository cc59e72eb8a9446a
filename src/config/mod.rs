//! Configuration module for spritecal
//!
//! Provides types, discovery and loading for `spritecal.toml`.

pub mod loader;
pub mod schema;

pub use loader::*;
pub use schema::*;
