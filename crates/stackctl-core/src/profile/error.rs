//! Error types for profile loading and resolution

use std::path::PathBuf;
use thiserror::Error;

/// Result type for profile validation and resolution
pub type ProfileResult<T> = Result<T, ProfileError>;

/// Errors from a [`ProfileLoader`](super::ProfileLoader)
#[derive(Debug, Error)]
pub enum LoadError {
    /// No profile with this name exists; eligible for fallback
    #[error("Profile '{name}' not found")]
    NotFound { name: String },

    /// The name matches more than one profile
    #[error("Profile '{name}' is ambiguous, found in: {}", display_paths(.candidates))]
    Ambiguous {
        name: String,
        candidates: Vec<PathBuf>,
    },

    /// The profile file could not be parsed
    #[error("Failed to parse profile {path}: {message}")]
    Parse { path: PathBuf, message: String },

    /// The profile file could not be read
    #[error("I/O error for {path}: {message}")]
    Io { path: PathBuf, message: String },

    /// The profile name is not usable as a file name
    #[error("Invalid profile name '{name}': {reason}")]
    InvalidName { name: String, reason: String },
}

impl LoadError {
    /// Whether this error allows a fallback source to answer instead
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

fn display_paths(paths: &[PathBuf]) -> String {
    paths
        .iter()
        .map(|p| p.display().to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Errors from saving or deleting profiles in a
/// [`ProfileStore`](super::ProfileStore)
#[derive(Debug, Error)]
pub enum StoreError {
    /// The name is not usable as a file name
    #[error("Invalid profile name '{name}': {source}")]
    InvalidName {
        name: String,
        source: crate::util::NameError,
    },

    /// The profile failed validation and was not written
    #[error(transparent)]
    Invalid(#[from] ProfileError),

    /// No profile to delete
    #[error("Profile '{name}' not found in {dir}")]
    NotFound { name: String, dir: PathBuf },

    /// Built-in profiles cannot be written or deleted
    #[error("Built-in profiles are read-only")]
    ReadOnly,

    /// No project directory is configured for project profiles
    #[error("No project directory configured for project profiles")]
    NoProjectDir,

    /// Reading or writing the file failed
    #[error("I/O error for {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Serialization failed
    #[error("Failed to serialize profile: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Structural errors: the whole resolution fails and nothing is applied
#[derive(Debug, Error)]
pub enum ProfileError {
    /// A stack profile also carries configuration
    #[error("Profile '{profile}' has includes and must not define any other configuration")]
    StackPurity { profile: String },

    /// Includes need resolving but no loader was supplied
    #[error("Profile '{profile}' has includes but no profile loader was provided")]
    MissingLoader { profile: String },

    /// The include graph contains a cycle
    #[error("Include cycle detected: {path}")]
    Cycle { path: String },

    /// The include chain is deeper than allowed
    #[error("Include depth exceeds maximum of {max}: {path}")]
    DepthExceeded { max: usize, path: String },

    /// An included profile could not be loaded
    #[error("Failed to load included profile: {0}")]
    Load(#[from] LoadError),

    /// The document is malformed
    #[error("Invalid profile '{profile}': {message}")]
    Invalid { profile: String, message: String },
}
