//! Error types for the stackctl scanner

use std::path::PathBuf;
use thiserror::Error;

/// Result type for scanner operations
pub type ScanResult<T> = Result<T, ScanError>;

/// Errors that can occur while observing Claude Code state
#[derive(Error, Debug)]
pub enum ScanError {
    /// IO error occurred
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// A state file exists but could not be parsed
    #[error("Failed to parse {path}: {message}")]
    InvalidFile { path: PathBuf, message: String },

    /// Invalid scope name
    #[error("Invalid scope: {0}")]
    InvalidScope(String),

    /// Home directory not found
    #[error("Home directory not found")]
    HomeNotFound,
}
