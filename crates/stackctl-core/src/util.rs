//! File system helpers shared by the profile store and app config

use std::fs;
use std::io::Write;
use std::path::Path;
use thiserror::Error;

/// Errors related to names used as file names
#[derive(Error, Debug, PartialEq, Eq)]
pub enum NameError {
    #[error("Name is empty")]
    Empty,

    #[error("Name contains path separator: {0}")]
    PathSeparator(String),

    #[error("Name contains parent directory reference: {0}")]
    ParentReference(String),

    #[error("Name cannot start with dot: {0}")]
    Hidden(String),

    #[error("Name contains invalid character: {0}")]
    InvalidCharacter(String),
}

/// Validate a profile name for use as a file stem
///
/// # Errors
/// Returns an error if the name could escape its directory or is not a
/// plain file stem
pub fn validate_name(name: &str) -> Result<(), NameError> {
    if name.trim().is_empty() {
        return Err(NameError::Empty);
    }

    if name.contains('/') || name.contains('\\') {
        return Err(NameError::PathSeparator(name.to_string()));
    }

    if name.contains("..") {
        return Err(NameError::ParentReference(name.to_string()));
    }

    if name.starts_with('.') {
        return Err(NameError::Hidden(name.to_string()));
    }

    if name.chars().any(|c| c == '\0' || c.is_control()) {
        return Err(NameError::InvalidCharacter(name.to_string()));
    }

    Ok(())
}

/// Write `contents` to `path` atomically
///
/// The data goes to a temporary file in the same directory which is then
/// renamed over the target, so readers never observe a partial file.
///
/// # Errors
/// Returns an error if the directory cannot be created or the file cannot be
/// written or persisted
pub fn write_atomic(path: &Path, contents: &[u8]) -> std::io::Result<()> {
    let dir = match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir,
        _ => Path::new("."),
    };
    fs::create_dir_all(dir)?;

    let mut file = tempfile::NamedTempFile::new_in(dir)?;
    file.write_all(contents)?;
    file.as_file().sync_all()?;
    file.persist(path).map_err(|e| e.error)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_validate_name_normal() {
        assert!(validate_name("rust-dev").is_ok());
        assert!(validate_name("team_base").is_ok());
        assert!(validate_name("Frontend2").is_ok());
    }

    #[test]
    fn test_validate_name_rejects_traversal() {
        assert_eq!(
            validate_name("../etc"),
            Err(NameError::PathSeparator("../etc".into()))
        );
        assert!(validate_name("foo/bar").is_err());
        assert!(validate_name("foo\\bar").is_err());
        assert!(validate_name("a..b").is_err());
    }

    #[test]
    fn test_validate_name_rejects_hidden_and_empty() {
        assert_eq!(validate_name(".hidden"), Err(NameError::Hidden(".hidden".into())));
        assert_eq!(validate_name("  "), Err(NameError::Empty));
    }

    #[test]
    fn test_write_atomic_creates_parents_and_replaces() {
        let temp = TempDir::new().expect("Failed to create temp dir");
        let path = temp.path().join("nested/dir/file.json");

        write_atomic(&path, b"first").unwrap();
        write_atomic(&path, b"second").unwrap();

        assert_eq!(fs::read_to_string(&path).unwrap(), "second");
        let leftovers = fs::read_dir(path.parent().unwrap()).unwrap().count();
        assert_eq!(leftovers, 1);
    }
}
