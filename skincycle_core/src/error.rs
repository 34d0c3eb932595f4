//! Error types for the skincycle_core library.
//!
//! The adaptation engine itself never fails; these errors only surface from
//! the loaders and stores that feed it.

use std::io;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for skincycle_core operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// IO error occurred
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// CSV error
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// TOML parsing error
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    /// Configuration validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Rule set failed validation and was not loaded
    #[error("Rule set validation error: {0}")]
    RuleSetValidation(String),

    /// Base routine could not be imported
    #[error("Routine error: {0}")]
    Routine(String),

    /// Cycle profile input was rejected
    #[error("Profile error: {0}")]
    Profile(String),

    /// Generic error
    #[error("{0}")]
    Other(String),
}
