//! Profile storage
//!
//! User profiles live in `<data_dir>/profiles/<name>.json`, project profiles
//! in `<project>/.stackctl/profiles/<name>.json`. A reference that contains
//! a path separator or ends in `.json` is read from that file directly.

use super::error::{LoadError, StoreError};
use super::types::Profile;
use crate::util::{validate_name, write_atomic};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Directory holding project profiles, relative to the project root
pub const PROJECT_PROFILES_DIR: &str = ".stackctl/profiles";

/// Source of profiles by name
pub trait ProfileLoader {
    /// Load a profile by name or reference
    ///
    /// # Errors
    /// Returns [`LoadError::NotFound`] when no profile matches; any other
    /// error means the profile exists but cannot be used
    fn load_profile(&self, name: &str) -> Result<Profile, LoadError>;
}

/// In-memory profiles, keyed by name
#[derive(Debug, Clone, Default)]
pub struct MemoryLoader {
    profiles: BTreeMap<String, Profile>,
}

impl MemoryLoader {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert
    #[must_use]
    pub fn with(mut self, profile: Profile) -> Self {
        self.insert(profile);
        self
    }

    pub fn insert(&mut self, profile: Profile) {
        self.profiles.insert(profile.name.clone(), profile);
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.profiles.keys().map(String::as_str)
    }

    pub fn profiles(&self) -> impl Iterator<Item = &Profile> {
        self.profiles.values()
    }
}

impl ProfileLoader for MemoryLoader {
    fn load_profile(&self, name: &str) -> Result<Profile, LoadError> {
        self.profiles
            .get(name)
            .cloned()
            .ok_or_else(|| LoadError::NotFound {
                name: name.to_string(),
            })
    }
}

/// A loader that answers `NotFound` from a second source
///
/// Every other error from the primary loader is returned unchanged.
pub struct FallbackLoader<P, F> {
    primary: P,
    fallback: F,
}

impl<P: ProfileLoader, F: ProfileLoader> FallbackLoader<P, F> {
    pub fn new(primary: P, fallback: F) -> Self {
        Self { primary, fallback }
    }
}

impl<P: ProfileLoader, F: ProfileLoader> ProfileLoader for FallbackLoader<P, F> {
    fn load_profile(&self, name: &str) -> Result<Profile, LoadError> {
        match self.primary.load_profile(name) {
            Err(e) if e.is_not_found() => {
                tracing::debug!(profile = name, "profile not on disk, trying built-in");
                self.fallback.load_profile(name)
            }
            other => other,
        }
    }
}

impl<L: ProfileLoader + ?Sized> ProfileLoader for &L {
    fn load_profile(&self, name: &str) -> Result<Profile, LoadError> {
        (**self).load_profile(name)
    }
}

/// Profiles shipped with stackctl
///
/// `default` is an empty profile: applying it reconciles a scope down to
/// nothing managed.
#[must_use]
pub fn builtin_profiles() -> MemoryLoader {
    let mut default = Profile::new("default");
    default.description = Some("Empty profile".to_string());
    MemoryLoader::new().with(default)
}

/// Where a profile is stored
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ProfileLocation {
    User,
    Project,
    Builtin,
}

impl fmt::Display for ProfileLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::User => "user",
            Self::Project => "project",
            Self::Builtin => "builtin",
        };
        f.write_str(s)
    }
}

/// Listing entry for a stored profile
#[derive(Debug, Clone, Serialize)]
pub struct ProfileSummary {
    pub name: String,
    pub description: Option<String>,
    pub location: ProfileLocation,
    pub path: Option<PathBuf>,
    pub is_stack: bool,
}

/// On-disk profile store
#[derive(Debug, Clone)]
pub struct ProfileStore {
    user_dir: PathBuf,
    project_dir: Option<PathBuf>,
}

impl ProfileStore {
    /// Create a store over a user profile directory
    pub fn new(user_dir: impl Into<PathBuf>) -> Self {
        Self {
            user_dir: user_dir.into(),
            project_dir: None,
        }
    }

    /// Also look for profiles in `<project>/.stackctl/profiles`
    #[must_use]
    pub fn with_project(mut self, project: &Path) -> Self {
        self.project_dir = Some(project.join(PROJECT_PROFILES_DIR));
        self
    }

    pub fn user_dir(&self) -> &Path {
        &self.user_dir
    }

    pub fn project_dir(&self) -> Option<&Path> {
        self.project_dir.as_deref()
    }

    fn dir_for(&self, location: ProfileLocation) -> Result<&Path, StoreError> {
        match location {
            ProfileLocation::User => Ok(&self.user_dir),
            ProfileLocation::Project => self.project_dir().ok_or(StoreError::NoProjectDir),
            ProfileLocation::Builtin => Err(StoreError::ReadOnly),
        }
    }

    /// Find the file a reference points to
    ///
    /// # Errors
    /// Returns `NotFound` when nothing matches and `Ambiguous` when the name
    /// exists in both the user and the project directory
    pub fn locate(&self, reference: &str) -> Result<PathBuf, LoadError> {
        if is_path_reference(reference) {
            let path = PathBuf::from(reference);
            return if path.is_file() {
                Ok(path)
            } else {
                Err(LoadError::NotFound {
                    name: reference.to_string(),
                })
            };
        }

        validate_name(reference).map_err(|e| LoadError::InvalidName {
            name: reference.to_string(),
            reason: e.to_string(),
        })?;

        let file_name = format!("{reference}.json");
        let mut candidates: Vec<PathBuf> = std::iter::once(self.user_dir.as_path())
            .chain(self.project_dir())
            .map(|dir| dir.join(&file_name))
            .filter(|path| path.is_file())
            .collect();

        if candidates.len() > 1 {
            return Err(LoadError::Ambiguous {
                name: reference.to_string(),
                candidates,
            });
        }
        candidates.pop().ok_or_else(|| LoadError::NotFound {
            name: reference.to_string(),
        })
    }

    /// Load and validate a profile
    ///
    /// # Errors
    /// See [`ProfileLoader::load_profile`]
    pub fn load(&self, reference: &str) -> Result<Profile, LoadError> {
        let path = self.locate(reference)?;
        read_profile(&path)
    }

    /// List stored profiles, sorted by name then location
    ///
    /// # Errors
    /// Returns an error if a profile directory cannot be read
    pub fn list(&self) -> Result<Vec<ProfileSummary>, LoadError> {
        let mut summaries = Vec::new();
        summaries.extend(list_dir(&self.user_dir, ProfileLocation::User)?);
        if let Some(dir) = self.project_dir() {
            summaries.extend(list_dir(dir, ProfileLocation::Project)?);
        }
        summaries.sort_by(|a, b| a.name.cmp(&b.name).then(a.location.cmp(&b.location)));
        Ok(summaries)
    }

    /// Validate and save a profile, replacing any existing file
    ///
    /// # Errors
    /// Returns an error for invalid names, invalid profiles or write failures
    pub fn save(&self, profile: &Profile, location: ProfileLocation) -> Result<PathBuf, StoreError> {
        validate_name(&profile.name).map_err(|source| StoreError::InvalidName {
            name: profile.name.clone(),
            source,
        })?;
        profile.validate()?;

        let path = self.dir_for(location)?.join(format!("{}.json", profile.name));
        let mut json = serde_json::to_string_pretty(profile)?;
        json.push('\n');
        write_atomic(&path, json.as_bytes()).map_err(|source| StoreError::Io {
            path: path.clone(),
            source,
        })?;

        tracing::info!(profile = %profile.name, path = %path.display(), "saved profile");
        Ok(path)
    }

    /// Delete a stored profile
    ///
    /// # Errors
    /// Returns `NotFound` if no such profile exists at `location`
    pub fn delete(&self, name: &str, location: ProfileLocation) -> Result<PathBuf, StoreError> {
        validate_name(name).map_err(|source| StoreError::InvalidName {
            name: name.to_string(),
            source,
        })?;
        let dir = self.dir_for(location)?;
        let path = dir.join(format!("{name}.json"));
        if !path.is_file() {
            return Err(StoreError::NotFound {
                name: name.to_string(),
                dir: dir.to_path_buf(),
            });
        }
        fs::remove_file(&path).map_err(|source| StoreError::Io {
            path: path.clone(),
            source,
        })?;
        tracing::info!(profile = name, "deleted profile");
        Ok(path)
    }
}

impl ProfileLoader for ProfileStore {
    fn load_profile(&self, name: &str) -> Result<Profile, LoadError> {
        self.load(name)
    }
}

fn is_path_reference(reference: &str) -> bool {
    reference.contains('/') || reference.contains('\\') || reference.ends_with(".json")
}

/// Parse a profile document
///
/// A missing name is taken from the file stem. Invalid marketplaces are
/// dropped here so later stages never see them.
///
/// # Errors
/// Returns [`LoadError::Parse`] for malformed JSON or malformed MCP server
/// definitions. Stack purity is left to [`resolve_includes`] so a violation
/// surfaces as [`ProfileError::StackPurity`](super::ProfileError::StackPurity).
///
/// [`resolve_includes`]: super::resolve_includes
pub fn parse_profile(path: &Path, content: &str) -> Result<Profile, LoadError> {
    let mut profile: Profile = serde_json::from_str(content).map_err(|e| LoadError::Parse {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;

    if profile.name.is_empty() {
        if let Some(stem) = path.file_stem() {
            profile.name = stem.to_string_lossy().into_owned();
        }
    }
    profile.discard_invalid_marketplaces();
    if profile.per_scope.is_some() && profile.has_flat_settings() {
        tracing::warn!(
            profile = %profile.name,
            "profile has both flat fields and perScope; flat fields are ignored"
        );
    }

    profile.validate_mcp_servers().map_err(|e| LoadError::Parse {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;
    Ok(profile)
}

fn read_profile(path: &Path) -> Result<Profile, LoadError> {
    let content = fs::read_to_string(path).map_err(|e| LoadError::Io {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;
    parse_profile(path, &content)
}

fn list_dir(dir: &Path, location: ProfileLocation) -> Result<Vec<ProfileSummary>, LoadError> {
    if !dir.is_dir() {
        return Ok(Vec::new());
    }

    let mut summaries = Vec::new();
    for entry in WalkDir::new(dir).min_depth(1).max_depth(1) {
        let entry = entry.map_err(|e| LoadError::Io {
            path: dir.to_path_buf(),
            message: e.to_string(),
        })?;
        let path = entry.path();
        if !entry.file_type().is_file() || path.extension().map_or(true, |ext| ext != "json") {
            continue;
        }

        match read_profile(path) {
            Ok(profile) => summaries.push(ProfileSummary {
                is_stack: profile.is_stack(),
                name: profile.name,
                description: profile.description,
                location,
                path: Some(path.to_path_buf()),
            }),
            Err(e) => tracing::warn!(path = %path.display(), error = %e, "skipping unreadable profile"),
        }
    }
    Ok(summaries)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::profile::ProfileError;
    use tempfile::TempDir;

    fn write(dir: &Path, name: &str, json: &str) {
        fs::create_dir_all(dir).unwrap();
        fs::write(dir.join(format!("{name}.json")), json).unwrap();
    }

    #[test]
    fn test_load_user_profile() {
        let temp = TempDir::new().expect("Failed to create temp dir");
        write(temp.path(), "rust", r#"{"plugins":["fmt@tools"]}"#);

        let store = ProfileStore::new(temp.path());
        let profile = store.load("rust").unwrap();
        assert_eq!(profile.name, "rust");
        assert_eq!(profile.plugins, vec!["fmt@tools"]);
    }

    #[test]
    fn test_same_name_in_both_dirs_is_ambiguous() {
        let user = TempDir::new().expect("Failed to create temp dir");
        let project = TempDir::new().expect("Failed to create temp dir");
        write(user.path(), "base", "{}");
        write(&project.path().join(PROJECT_PROFILES_DIR), "base", "{}");

        let store = ProfileStore::new(user.path()).with_project(project.path());
        match store.load("base") {
            Err(LoadError::Ambiguous { candidates, .. }) => assert_eq!(candidates.len(), 2),
            other => panic!("expected ambiguous, got {other:?}"),
        }
    }

    #[test]
    fn test_path_reference_loads_file() {
        let temp = TempDir::new().expect("Failed to create temp dir");
        let path = temp.path().join("custom.json");
        fs::write(&path, r#"{"name":"custom","includes":["a"]}"#).unwrap();

        let store = ProfileStore::new(temp.path().join("unused"));
        let profile = store.load(path.to_str().unwrap()).unwrap();
        assert!(profile.is_stack());
    }

    #[test]
    fn test_parse_error_is_not_not_found() {
        let temp = TempDir::new().expect("Failed to create temp dir");
        write(temp.path(), "broken", "{ not json");

        let err = ProfileStore::new(temp.path()).load("broken").unwrap_err();
        assert!(matches!(err, LoadError::Parse { .. }));
        assert!(!err.is_not_found());
    }

    #[test]
    fn test_impure_stack_loads_but_fails_purity() {
        let temp = TempDir::new().expect("Failed to create temp dir");
        write(temp.path(), "bad", r#"{"includes":["a"],"plugins":["x@m"]}"#);

        let profile = ProfileStore::new(temp.path()).load("bad").unwrap();
        assert!(matches!(
            profile.check_purity(),
            Err(ProfileError::StackPurity { profile }) if profile == "bad"
        ));
    }

    #[test]
    fn test_duplicate_mcp_names_fail_to_load() {
        let temp = TempDir::new().expect("Failed to create temp dir");
        write(
            temp.path(),
            "dup",
            r#"{"mcpServers":[{"name":"db","command":"a"},{"name":"db","command":"b"}]}"#,
        );
        let err = ProfileStore::new(temp.path()).load("dup").unwrap_err();
        assert!(matches!(err, LoadError::Parse { .. }));
    }

    #[test]
    fn test_save_rejects_impure_stack() {
        let temp = TempDir::new().expect("Failed to create temp dir");
        let mut profile = Profile::new("bad");
        profile.includes = vec!["a".into()];
        profile.plugins = vec!["x@m".into()];

        let err = ProfileStore::new(temp.path())
            .save(&profile, ProfileLocation::User)
            .unwrap_err();
        assert!(matches!(
            err,
            StoreError::Invalid(ProfileError::StackPurity { .. })
        ));
    }

    #[test]
    fn test_invalid_marketplaces_are_discarded() {
        let temp = TempDir::new().expect("Failed to create temp dir");
        write(
            temp.path(),
            "mp",
            r#"{"marketplaces":[{"source":"github","repo":"acme/tools"},{"source":"git"}]}"#,
        );
        let profile = ProfileStore::new(temp.path()).load("mp").unwrap();
        assert_eq!(profile.marketplaces.len(), 1);
    }

    #[test]
    fn test_fallback_only_for_not_found() {
        let temp = TempDir::new().expect("Failed to create temp dir");
        let store = ProfileStore::new(temp.path());
        let loader = FallbackLoader::new(&store, builtin_profiles());

        let default = loader.load_profile("default").unwrap();
        assert_eq!(default.name, "default");
        assert!(loader.load_profile("missing").unwrap_err().is_not_found());

        write(temp.path(), "default", "{ broken");
        assert!(matches!(
            loader.load_profile("default"),
            Err(LoadError::Parse { .. })
        ));
    }

    #[test]
    fn test_save_list_delete() {
        let temp = TempDir::new().expect("Failed to create temp dir");
        let store = ProfileStore::new(temp.path().join("profiles"));

        let mut profile = Profile::new("web");
        profile.description = Some("Frontend tools".into());
        profile.plugins = vec!["lint@tools".into()];
        let path = store.save(&profile, ProfileLocation::User).unwrap();
        assert!(path.ends_with("web.json"));

        let listed = store.list().unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].name, "web");
        assert_eq!(listed[0].description.as_deref(), Some("Frontend tools"));
        assert!(!listed[0].is_stack);

        assert_eq!(store.load("web").unwrap(), profile);

        store.delete("web", ProfileLocation::User).unwrap();
        assert!(store.load("web").unwrap_err().is_not_found());
        assert!(matches!(
            store.delete("web", ProfileLocation::User),
            Err(StoreError::NotFound { .. })
        ));
    }

    #[test]
    fn test_save_rejects_bad_names() {
        let temp = TempDir::new().expect("Failed to create temp dir");
        let store = ProfileStore::new(temp.path());
        let profile = Profile::new("../escape");
        assert!(matches!(
            store.save(&profile, ProfileLocation::User),
            Err(StoreError::InvalidName { .. })
        ));
    }

    #[test]
    fn test_save_project_without_project_dir() {
        let temp = TempDir::new().expect("Failed to create temp dir");
        let store = ProfileStore::new(temp.path());
        assert!(matches!(
            store.save(&Profile::new("p"), ProfileLocation::Project),
            Err(StoreError::NoProjectDir)
        ));
    }
}
