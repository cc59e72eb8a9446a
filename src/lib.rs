//! Spritecal - Library for calibrating animated sprite sheets
//!
//! This library provides functionality to:
//! - Extract Sobel gradient regions from sprite sheets
//! - Score and search for the pixel offset that best aligns two sheets
//! - Compose a base sheet with a partial override image
//! - Map edited frame boxes to per-frame draw geometry
//! - Normalize and publish the model server endpoint

pub mod cli;
pub mod composition;
pub mod config;
pub mod endpoint;
pub mod gradient;
pub mod matcher;
pub mod search;
pub mod source;
pub mod spritesheet;
pub mod state;
