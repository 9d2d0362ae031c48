//! Error types for the coach_core library.

use std::io;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for coach_core operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// IO error occurred
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// TOML parsing error
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    /// Configuration validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Activity catalog validation error
    #[error("Catalog validation error: {0}")]
    CatalogValidation(String),

    /// (activity, intensity) pair with no MET value.
    ///
    /// Aborts the plan for that day; callers must not substitute a default MET.
    #[error("Unknown MET for {activity}-{intensity}")]
    UnknownActivity { activity: String, intensity: String },

    /// Caller-supplied value outside its domain (negative minutes, NaN, ...)
    #[error("Invalid input: {0}")]
    Validation(String),

    /// Scheduler pattern name not recognised
    #[error("Unknown schedule pattern: {0}")]
    UnknownPattern(String),

    /// Persistence collaborator error
    #[error("Store error: {0}")]
    Store(String),

    /// Generic error
    #[error("{0}")]
    Other(String),
}
