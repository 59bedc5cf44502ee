//! Error types for app configuration

use std::path::PathBuf;
use thiserror::Error;

/// Result type for config operations
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Errors that can occur loading or saving the app configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    /// No data directory could be determined
    #[error("Could not determine home directory; set STACKCTL_HOME")]
    HomeNotFound,

    /// File I/O error
    #[error("I/O error for {path}: {message}")]
    IoError { path: PathBuf, message: String },

    /// JSON parse error
    #[error("JSON parse error in {path}: {message}")]
    JsonParseError { path: PathBuf, message: String },

    /// An environment override has an unusable value
    #[error("Invalid value for {var}: {value}")]
    InvalidEnv { var: &'static str, value: String },

    /// Validation error
    #[error("Validation error: {0}")]
    ValidationError(String),
}

impl ConfigError {
    /// Get the error code for CLI output
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::HomeNotFound => "HOME_NOT_FOUND",
            Self::IoError { .. } => "IO_ERROR",
            Self::JsonParseError { .. } => "JSON_PARSE_ERROR",
            Self::InvalidEnv { .. } => "INVALID_ENV",
            Self::ValidationError(_) => "VALIDATION_ERROR",
        }
    }
}
