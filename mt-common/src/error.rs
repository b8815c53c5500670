//! Common error types for MicroTardis

use std::path::PathBuf;
use thiserror::Error;

/// Common result type for MicroTardis operations
pub type Result<T> = std::result::Result<T, Error>;

/// Common error types across the portal
#[derive(Error, Debug)]
pub enum Error {
    /// Database operation error (wraps sqlx::Error)
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// I/O operation error (wraps std::io::Error)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Image decode/encode error
    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    /// CSV writer error
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// Configuration loading or validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Requested resource not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Invalid user input or request parameter
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Spectrum file too short for the expected channel payload
    #[error("Truncated spectrum file {}: expected at least {expected} bytes, found {actual}", path.display())]
    TruncatedSpectrum {
        path: PathBuf,
        expected: u64,
        actual: u64,
    },

    /// Internal server error
    #[error("Internal error: {0}")]
    Internal(String),
}
