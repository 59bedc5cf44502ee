//! Locations of Claude Code state files
//!
//! Where each scope keeps its plugin enablement, marketplace registrations
//! and MCP server definitions.

use crate::error::{ScanError, ScanResult};
use crate::types::Scope;
use std::path::{Path, PathBuf};

/// Resolved locations for one user home and one project directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClaudePaths {
    home: PathBuf,
    project: PathBuf,
}

impl ClaudePaths {
    /// Paths rooted at an explicit home directory and project directory
    pub fn new(home: impl Into<PathBuf>, project: impl Into<PathBuf>) -> Self {
        Self {
            home: home.into(),
            project: project.into(),
        }
    }

    /// Paths for the current user, honouring `STACKCTL_CLAUDE_HOME`
    pub fn discover(project: impl Into<PathBuf>) -> ScanResult<Self> {
        let home = match std::env::var_os("STACKCTL_CLAUDE_HOME") {
            Some(home) if !home.is_empty() => PathBuf::from(home),
            _ => dirs::home_dir().ok_or(ScanError::HomeNotFound)?,
        };
        Ok(Self::new(home, project))
    }

    /// User home directory
    #[must_use]
    pub fn home(&self) -> &Path {
        &self.home
    }

    /// Project directory
    #[must_use]
    pub fn project(&self) -> &Path {
        &self.project
    }

    /// `~/.claude.json` - user and local MCP servers
    #[must_use]
    pub fn claude_json(&self) -> PathBuf {
        self.home.join(".claude.json")
    }

    /// `~/.claude/plugins`
    #[must_use]
    pub fn plugins_dir(&self) -> PathBuf {
        self.home.join(".claude").join("plugins")
    }

    /// Global marketplace registry
    #[must_use]
    pub fn known_marketplaces(&self) -> PathBuf {
        self.plugins_dir().join("known_marketplaces.json")
    }

    /// Global installed-plugin registry
    #[must_use]
    pub fn installed_plugins(&self) -> PathBuf {
        self.plugins_dir().join("installed_plugins.json")
    }

    /// The settings file holding `enabledPlugins` for a scope
    #[must_use]
    pub fn settings_path(&self, scope: Scope) -> PathBuf {
        match scope {
            Scope::User => self.home.join(".claude").join("settings.json"),
            Scope::Project => self.project.join(".claude").join("settings.json"),
            Scope::Local => self.project.join(".claude").join("settings.local.json"),
        }
    }

    /// The file holding MCP server definitions for a scope
    ///
    /// User and local servers share `~/.claude.json`; local ones live under
    /// the project's entry in its `projects` map.
    #[must_use]
    pub fn mcp_path(&self, scope: Scope) -> PathBuf {
        match scope {
            Scope::User | Scope::Local => self.claude_json(),
            Scope::Project => self.project.join(".mcp.json"),
        }
    }

    /// Key of this project in the `projects` map of `~/.claude.json`
    #[must_use]
    pub fn project_key(&self) -> String {
        self.project.to_string_lossy().into_owned()
    }
}
