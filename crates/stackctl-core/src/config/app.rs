//! stackctl's own configuration
//!
//! Stored as JSON at `<data_dir>/config.json`. The data directory is
//! `~/.stackctl` unless `STACKCTL_HOME` points elsewhere.

use super::error::{ConfigError, ConfigResult};
use crate::apply::DEFAULT_WORKERS;
use crate::util::write_atomic;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use stackctl_scanner::Scope;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

/// Overrides the data directory
pub const HOME_ENV: &str = "STACKCTL_HOME";
/// Overrides the worker count
pub const WORKERS_ENV: &str = "STACKCTL_WORKERS";
/// Overrides the host binary
pub const CLAUDE_ENV: &str = "STACKCTL_CLAUDE";

const CONFIG_FILE: &str = "config.json";

/// Resolve the data directory
///
/// # Errors
/// Returns [`ConfigError::HomeNotFound`] when neither `STACKCTL_HOME` nor a
/// home directory is available
pub fn data_dir() -> ConfigResult<PathBuf> {
    if let Some(dir) = std::env::var_os(HOME_ENV).filter(|v| !v.is_empty()) {
        return Ok(PathBuf::from(dir));
    }
    dirs::home_dir()
        .map(|home| home.join(".stackctl"))
        .ok_or(ConfigError::HomeNotFound)
}

/// Application configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppConfig {
    /// Worker threads per apply phase
    #[serde(default = "default_workers")]
    pub workers: usize,
    /// Host binary to invoke
    #[serde(default = "default_claude_command")]
    pub claude_command: String,
    /// User profile directory, defaults to `<data_dir>/profiles`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profiles_dir: Option<PathBuf>,
    /// Last applied profile per scope (and project)
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub applied: BTreeMap<String, AppliedProfile>,
}

fn default_workers() -> usize {
    DEFAULT_WORKERS
}

fn default_claude_command() -> String {
    "claude".to_string()
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            workers: default_workers(),
            claude_command: default_claude_command(),
            profiles_dir: None,
            applied: BTreeMap::new(),
        }
    }
}

/// A record of a successful apply
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppliedProfile {
    pub profile: String,
    pub applied_at: DateTime<Utc>,
}

impl AppConfig {
    /// Load `<data_dir>/config.json` and apply environment overrides
    ///
    /// # Errors
    /// Returns an error if the file exists but cannot be read or parsed, or
    /// an override is invalid
    pub fn load(data_dir: &Path) -> ConfigResult<Self> {
        let mut config = Self::load_from(&data_dir.join(CONFIG_FILE))?;
        config.apply_env_overrides(|var| std::env::var(var).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Load a config file; a missing file yields the defaults
    ///
    /// # Errors
    /// Returns an error if the file cannot be read or parsed
    pub fn load_from(path: &Path) -> ConfigResult<Self> {
        if !path.exists() {
            tracing::debug!(path = %path.display(), "no config file, using defaults");
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path).map_err(|e| ConfigError::IoError {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_json::from_str(&content).map_err(|e| ConfigError::JsonParseError {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
    }

    /// Apply `STACKCTL_WORKERS` and `STACKCTL_CLAUDE` from `lookup`
    ///
    /// # Errors
    /// Returns [`ConfigError::InvalidEnv`] for a worker count that is not a
    /// positive integer
    pub fn apply_env_overrides(
        &mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> ConfigResult<()> {
        if let Some(value) = lookup(WORKERS_ENV) {
            self.workers = value
                .trim()
                .parse::<usize>()
                .ok()
                .filter(|w| *w > 0)
                .ok_or(ConfigError::InvalidEnv {
                    var: WORKERS_ENV,
                    value,
                })?;
        }
        if let Some(value) = lookup(CLAUDE_ENV).filter(|v| !v.trim().is_empty()) {
            self.claude_command = value;
        }
        Ok(())
    }

    /// Check field values
    ///
    /// # Errors
    /// Returns a validation error for a zero worker count or an empty host
    /// command
    pub fn validate(&self) -> ConfigResult<()> {
        if self.workers == 0 {
            return Err(ConfigError::ValidationError(
                "workers must be at least 1".to_string(),
            ));
        }
        if self.claude_command.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "claudeCommand must not be empty".to_string(),
            ));
        }
        Ok(())
    }

    /// Save to `<data_dir>/config.json`
    ///
    /// # Errors
    /// Returns an error if the file cannot be written
    pub fn save(&self, data_dir: &Path) -> ConfigResult<()> {
        self.save_to(&data_dir.join(CONFIG_FILE))
    }

    /// Save atomically to `path`
    ///
    /// # Errors
    /// Returns an error if the file cannot be written
    pub fn save_to(&self, path: &Path) -> ConfigResult<()> {
        let mut json = serde_json::to_string_pretty(self).map_err(|e| {
            ConfigError::JsonParseError {
                path: path.to_path_buf(),
                message: e.to_string(),
            }
        })?;
        json.push('\n');
        write_atomic(path, json.as_bytes()).map_err(|e| ConfigError::IoError {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
    }

    /// User profile directory
    pub fn profiles_dir(&self, data_dir: &Path) -> PathBuf {
        self.profiles_dir
            .clone()
            .unwrap_or_else(|| data_dir.join("profiles"))
    }

    /// Remember that `profile` was applied
    pub fn record_applied(&mut self, scope: Scope, project: &Path, profile: &str) {
        self.applied.insert(
            applied_key(scope, project),
            AppliedProfile {
                profile: profile.to_string(),
                applied_at: Utc::now(),
            },
        );
    }

    /// Forget the profile applied at `scope`
    pub fn clear_applied(&mut self, scope: Scope, project: &Path) -> Option<AppliedProfile> {
        self.applied.remove(&applied_key(scope, project))
    }

    /// Last profile applied at `scope` (for `project`, outside user scope)
    pub fn applied_for(&self, scope: Scope, project: &Path) -> Option<&AppliedProfile> {
        self.applied.get(&applied_key(scope, project))
    }
}

/// `user`, or `<scope>:<project path>` for project and local scope
fn applied_key(scope: Scope, project: &Path) -> String {
    match scope {
        Scope::User => scope.to_string(),
        Scope::Project | Scope::Local => format!("{scope}:{}", project.display()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_missing_file_gives_defaults() {
        let temp = TempDir::new().expect("Failed to create temp dir");
        let config = AppConfig::load_from(&temp.path().join("config.json")).unwrap();
        assert_eq!(config, AppConfig::default());
        assert_eq!(config.workers, 4);
        assert_eq!(config.claude_command, "claude");
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let temp = TempDir::new().expect("Failed to create temp dir");
        let path = temp.path().join("config.json");
        fs::write(&path, r#"{"workers": 8}"#).unwrap();

        let config = AppConfig::load_from(&path).unwrap();
        assert_eq!(config.workers, 8);
        assert_eq!(config.claude_command, "claude");
    }

    #[test]
    fn test_malformed_file_is_an_error() {
        let temp = TempDir::new().expect("Failed to create temp dir");
        let path = temp.path().join("config.json");
        fs::write(&path, "{ workers").unwrap();

        let err = AppConfig::load_from(&path).unwrap_err();
        assert_eq!(err.code(), "JSON_PARSE_ERROR");
    }

    #[test]
    fn test_env_overrides() {
        let mut config = AppConfig::default();
        config
            .apply_env_overrides(|var| match var {
                WORKERS_ENV => Some("2".into()),
                CLAUDE_ENV => Some("/opt/claude".into()),
                _ => None,
            })
            .unwrap();
        assert_eq!(config.workers, 2);
        assert_eq!(config.claude_command, "/opt/claude");

        let err = config
            .apply_env_overrides(|var| (var == WORKERS_ENV).then(|| "zero".into()))
            .unwrap_err();
        assert_eq!(err.code(), "INVALID_ENV");
    }

    #[test]
    fn test_save_and_record_applied() {
        let temp = TempDir::new().expect("Failed to create temp dir");
        let project = Path::new("/work/app");

        let mut config = AppConfig::default();
        config.record_applied(Scope::Project, project, "web");
        config.record_applied(Scope::User, project, "base");
        config.save(temp.path()).unwrap();

        let loaded = AppConfig::load_from(&temp.path().join("config.json")).unwrap();
        assert_eq!(loaded.applied_for(Scope::Project, project).unwrap().profile, "web");
        assert_eq!(
            loaded.applied_for(Scope::User, Path::new("/elsewhere")).unwrap().profile,
            "base"
        );
        assert!(loaded.applied_for(Scope::Local, project).is_none());
    }

    #[test]
    fn test_clear_applied_is_per_project() {
        let mut config = AppConfig::default();
        config.record_applied(Scope::Project, Path::new("/a"), "web");
        config.record_applied(Scope::Project, Path::new("/b"), "api");

        assert_eq!(
            config.clear_applied(Scope::Project, Path::new("/a")).unwrap().profile,
            "web"
        );
        assert!(config.clear_applied(Scope::Project, Path::new("/a")).is_none());
        assert!(config.applied_for(Scope::Project, Path::new("/b")).is_some());
    }
}
