//! Scope-aware observation of live Claude Code state
//!
//! User scope reads the global settings, marketplace registry and
//! `~/.claude.json`. Project and local scope read their own override files,
//! which may not exist yet; a missing file is an empty result, not an error.

use crate::error::ScanResult;
use crate::parser::{
    parse_claude_json_mcp, parse_installed_plugins, parse_known_marketplaces, parse_mcp_json,
    parse_settings,
};
use crate::paths::ClaudePaths;
use crate::types::{InstalledPlugin, Marketplace, ObservedMcpServer, RegisteredMarketplace, Scope};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::io::ErrorKind;
use std::path::Path;

/// Everything observed at one scope
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObservedScope {
    /// Scope this observation belongs to
    pub scope: Scope,
    /// Plugin ids enabled at this scope
    #[serde(default)]
    pub enabled_plugins: Vec<String>,
    /// Marketplaces registered at this scope
    #[serde(default)]
    pub marketplaces: Vec<RegisteredMarketplace>,
    /// MCP servers configured at this scope
    #[serde(default)]
    pub mcp_servers: Vec<ObservedMcpServer>,
    /// Registry entries installed at this scope
    #[serde(default)]
    pub installed: Vec<InstalledPlugin>,
}

impl ObservedScope {
    /// An empty observation, as for a fresh project directory
    #[must_use]
    pub fn empty(scope: Scope) -> Self {
        Self {
            scope,
            enabled_plugins: Vec::new(),
            marketplaces: Vec::new(),
            mcp_servers: Vec::new(),
            installed: Vec::new(),
        }
    }

    /// Whether nothing at all was observed
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.enabled_plugins.is_empty()
            && self.marketplaces.is_empty()
            && self.mcp_servers.is_empty()
            && self.installed.is_empty()
    }

    /// Plugins enabled at this scope with no install registry entry for it
    #[must_use]
    pub fn enabled_not_installed(&self) -> Vec<&str> {
        self.enabled_plugins
            .iter()
            .filter(|id| !self.installed.iter().any(|p| &p.id == *id))
            .map(String::as_str)
            .collect()
    }
}

/// Observations for every scope
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ObservedState {
    /// Per-scope observations
    pub scopes: BTreeMap<Scope, ObservedScope>,
}

impl ObservedState {
    /// Observation for one scope (empty if that scope was not observed)
    #[must_use]
    pub fn scope(&self, scope: Scope) -> ObservedScope {
        self.scopes
            .get(&scope)
            .cloned()
            .unwrap_or_else(|| ObservedScope::empty(scope))
    }

    /// Enabled plugin ids across every scope
    pub fn enabled_plugins(&self) -> impl Iterator<Item = &str> {
        self.scopes
            .values()
            .flat_map(|s| s.enabled_plugins.iter().map(String::as_str))
    }

    /// Registry name to marketplace, across every scope
    #[must_use]
    pub fn marketplace_registry(&self) -> HashMap<&str, &Marketplace> {
        self.scopes
            .values()
            .flat_map(|s| s.marketplaces.iter())
            .map(|r| (r.name.as_str(), &r.marketplace))
            .collect()
    }
}

/// Source of observed host state
pub trait StateObserver {
    /// Observe a single scope
    ///
    /// # Errors
    /// Returns an error if a state file exists but cannot be read or parsed
    fn observe(&self, scope: Scope) -> ScanResult<ObservedScope>;

    /// Observe every scope
    ///
    /// # Errors
    /// Returns the first scope observation error
    fn observe_all(&self) -> ScanResult<ObservedState> {
        let mut state = ObservedState::default();
        for scope in Scope::ALL {
            state.scopes.insert(scope, self.observe(scope)?);
        }
        Ok(state)
    }
}

/// Observer reading Claude Code's files from disk
#[derive(Debug, Clone)]
pub struct FsObserver {
    paths: ClaudePaths,
}

impl FsObserver {
    /// Create an observer over the given locations
    #[must_use]
    pub fn new(paths: ClaudePaths) -> Self {
        Self { paths }
    }

    /// Locations this observer reads
    #[must_use]
    pub fn paths(&self) -> &ClaudePaths {
        &self.paths
    }

    fn installed_at(&self, scope: Scope) -> ScanResult<Vec<InstalledPlugin>> {
        let path = self.paths.installed_plugins();
        let Some(content) = read_optional(&path)? else {
            return Ok(Vec::new());
        };
        let project_key = self.paths.project_key();

        Ok(parse_installed_plugins(&path, &content)?
            .into_iter()
            .filter(|p| p.scope == scope)
            .filter(|p| {
                scope == Scope::User || p.project_path.as_deref() == Some(project_key.as_str())
            })
            .collect())
    }
}

impl StateObserver for FsObserver {
    fn observe(&self, scope: Scope) -> ScanResult<ObservedScope> {
        let mut observed = ObservedScope::empty(scope);

        let settings_path = self.paths.settings_path(scope);
        if let Some(content) = read_optional(&settings_path)? {
            let settings = parse_settings(&settings_path, &content)?;
            observed.enabled_plugins = settings.enabled_plugins;
            observed.marketplaces = settings.marketplaces;
        }

        if scope == Scope::User {
            let registry_path = self.paths.known_marketplaces();
            if let Some(content) = read_optional(&registry_path)? {
                for registered in parse_known_marketplaces(&registry_path, &content)? {
                    if !observed.marketplaces.iter().any(|m| m.name == registered.name) {
                        observed.marketplaces.push(registered);
                    }
                }
            }
        }

        let mcp_path = self.paths.mcp_path(scope);
        if let Some(content) = read_optional(&mcp_path)? {
            observed.mcp_servers = match scope {
                Scope::User => parse_claude_json_mcp(&mcp_path, &content, None)?,
                Scope::Local => {
                    parse_claude_json_mcp(&mcp_path, &content, Some(&self.paths.project_key()))?
                }
                Scope::Project => parse_mcp_json(&mcp_path, &content)?,
            };
        }

        observed.installed = self.installed_at(scope)?;

        tracing::debug!(
            scope = %scope,
            plugins = observed.enabled_plugins.len(),
            marketplaces = observed.marketplaces.len(),
            mcp_servers = observed.mcp_servers.len(),
            "observed scope"
        );
        Ok(observed)
    }
}

/// Read a file, treating a missing file as `None`
fn read_optional(path: &Path) -> ScanResult<Option<String>> {
    match fs::read_to_string(path) {
        Ok(content) => Ok(Some(content)),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e.into()),
    }
}
