//! # MicroTardis Common Library
//!
//! Shared code for the MicroTardis portal including:
//! - Database schema, models and repository queries
//! - Configuration loading
//! - Spectrum decoding and export formatting
//! - Thumbnail generation
//! - Parameter ordering for display
//! - Post-save metadata filters

pub mod config;
pub mod db;
pub mod error;
pub mod export;
pub mod filters;
pub mod params;
pub mod spectrum;
pub mod thumbnail;

pub use config::Settings;
pub use error::{Error, Result};
