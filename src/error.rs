//! Error types for esmify.

use thiserror::Error;

/// Result type for esmify operations.
pub type Result<T> = std::result::Result<T, EsmifyError>;

/// Main error type for esmify.
#[derive(Error, Debug)]
pub enum EsmifyError {
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON parsing error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Invalid package.json
    #[error("Invalid package.json: {0}")]
    InvalidPackageJson(String),

    /// Package.json not found
    #[error("package.json not found in {0}")]
    PackageJsonNotFound(String),

    /// A transformation pass left files unprocessed
    #[error("Transform pass '{pass}' failed: {errors} of {total} files could not be processed")]
    PassFailed {
        pass: String,
        errors: usize,
        total: usize,
    },

    /// Codemod engine invocation error
    #[error("Codemod engine error: {0}")]
    Engine(String),

    /// Two source files map to the same output path
    #[error("destination collision: {first} and {second} both map to {to}")]
    DestinationCollision {
        first: String,
        second: String,
        to: String,
    },

    /// Invalid regex in configuration
    #[error("Invalid pattern '{pattern}': {reason}")]
    InvalidPattern { pattern: String, reason: String },

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// General error with message
    #[error("{0}")]
    Other(String),
}

impl From<anyhow::Error> for EsmifyError {
    fn from(err: anyhow::Error) -> Self {
        EsmifyError::Other(err.to_string())
    }
}

impl From<&str> for EsmifyError {
    fn from(s: &str) -> Self {
        EsmifyError::Other(s.to_string())
    }
}

impl From<String> for EsmifyError {
    fn from(s: String) -> Self {
        EsmifyError::Other(s)
    }
}
