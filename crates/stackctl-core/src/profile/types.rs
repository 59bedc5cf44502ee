//! Profile document types
//!
//! Profiles are JSON documents. Empty fields are omitted when saved so that
//! a round-tripped profile stays as small as the one that was written.

use serde::{Deserialize, Serialize};
use stackctl_scanner::{Marketplace, Scope};
use std::collections::BTreeMap;

use super::error::{ProfileError, ProfileResult};

/// A declarative description of desired Claude Code configuration
///
/// A profile either carries configuration (flat fields or `per_scope`), or
/// is a *stack*: a pure list of other profiles to include.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
    /// Profile name
    #[serde(default)]
    pub name: String,
    /// Optional description
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Profiles to include, in merge order
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub includes: Vec<String>,
    /// Plugin identifiers (`name@marketplace`)
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub plugins: Vec<String>,
    /// Marketplaces plugins are resolved from
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub marketplaces: Vec<Marketplace>,
    /// MCP server definitions
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub mcp_servers: Vec<McpServer>,
    /// File-based extensions
    #[serde(default, skip_serializing_if = "Extensions::is_empty")]
    pub extensions: Extensions,
    /// Hook entries per settings event
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub settings_hooks: BTreeMap<String, Vec<HookEntry>>,
    /// Rules for suggesting this profile in a project
    #[serde(default, skip_serializing_if = "Detect::is_empty")]
    pub detect: Detect,
    /// Independent settings per scope
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub per_scope: Option<PerScope>,
    /// Hook to run after a successful apply
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub post_apply: Option<PostApply>,
    /// Never propose plugin removals for this profile
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub skip_plugin_diff: bool,
}

impl Profile {
    /// Create an empty profile with the given name
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Whether this profile is a stack (has includes)
    #[must_use]
    pub fn is_stack(&self) -> bool {
        !self.includes.is_empty()
    }

    /// Whether any configuration field besides name, description and
    /// includes is set
    #[must_use]
    pub fn has_config(&self) -> bool {
        !self.plugins.is_empty()
            || !self.marketplaces.is_empty()
            || !self.mcp_servers.is_empty()
            || !self.extensions.is_empty()
            || !self.settings_hooks.is_empty()
            || !self.detect.is_empty()
            || self.per_scope.is_some()
            || self.post_apply.is_some()
            || self.skip_plugin_diff
    }

    /// Whether flat (legacy) fields are set
    #[must_use]
    pub fn has_flat_settings(&self) -> bool {
        !self.plugins.is_empty() || !self.mcp_servers.is_empty() || !self.extensions.is_empty()
    }

    /// Check the stack purity invariant for this profile alone
    ///
    /// # Errors
    /// Returns [`ProfileError::StackPurity`] if the profile has includes and
    /// also carries configuration
    pub fn check_purity(&self) -> ProfileResult<()> {
        if self.is_stack() && self.has_config() {
            return Err(ProfileError::StackPurity {
                profile: self.name.clone(),
            });
        }
        Ok(())
    }

    /// Validate the profile document
    ///
    /// # Errors
    /// Returns an error for stack purity violations and malformed MCP
    /// server definitions
    pub fn validate(&self) -> ProfileResult<()> {
        self.check_purity()?;
        self.validate_mcp_servers()
    }

    /// Check MCP server names and commands in every scope
    ///
    /// # Errors
    /// Returns [`ProfileError::Invalid`] for an empty or duplicate name or a
    /// server without a command
    pub fn validate_mcp_servers(&self) -> ProfileResult<()> {
        validate_mcp_servers(&self.name, &self.mcp_servers)?;
        if let Some(per_scope) = &self.per_scope {
            for (_, settings) in per_scope.iter() {
                validate_mcp_servers(&self.name, &settings.mcp_servers)?;
            }
        }
        Ok(())
    }

    /// Drop marketplaces that cannot be identified
    ///
    /// Applied when a profile is parsed so the merge engine never sees an
    /// invalid marketplace.
    pub fn discard_invalid_marketplaces(&mut self) {
        let name = &self.name;
        self.marketplaces.retain(|marketplace| {
            let valid = marketplace.is_valid();
            if !valid {
                tracing::warn!(profile = %name, ?marketplace, "discarding marketplace without repo or url");
            }
            valid
        });
    }

    /// Desired settings for one scope
    ///
    /// Uses the `per_scope` entry when the profile has per-scope settings
    /// (an absent scope yields empty settings), otherwise the flat fields.
    #[must_use]
    pub fn settings_for(&self, scope: Scope) -> ScopeSettings {
        match &self.per_scope {
            Some(per_scope) => per_scope.get(scope).cloned().unwrap_or_default(),
            None => ScopeSettings {
                plugins: self.plugins.clone(),
                mcp_servers: self.mcp_servers.clone(),
                extensions: self.extensions.clone(),
            },
        }
    }

    /// Every plugin identifier declared anywhere in the profile
    #[must_use]
    pub fn all_plugins(&self) -> Vec<&str> {
        let mut plugins: Vec<&str> = self.plugins.iter().map(String::as_str).collect();
        if let Some(per_scope) = &self.per_scope {
            for (_, settings) in per_scope.iter() {
                for plugin in &settings.plugins {
                    if !plugins.contains(&plugin.as_str()) {
                        plugins.push(plugin);
                    }
                }
            }
        }
        plugins
    }
}

fn validate_mcp_servers(profile: &str, servers: &[McpServer]) -> ProfileResult<()> {
    let mut seen = Vec::with_capacity(servers.len());
    for server in servers {
        if server.name.trim().is_empty() {
            return Err(ProfileError::Invalid {
                profile: profile.to_string(),
                message: "MCP server with empty name".to_string(),
            });
        }
        if server.command.trim().is_empty() {
            return Err(ProfileError::Invalid {
                profile: profile.to_string(),
                message: format!("MCP server '{}' has no command", server.name),
            });
        }
        if seen.contains(&server.name.as_str()) {
            return Err(ProfileError::Invalid {
                profile: profile.to_string(),
                message: format!("MCP server '{}' is defined twice", server.name),
            });
        }
        seen.push(server.name.as_str());
    }
    Ok(())
}

/// An MCP server definition
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct McpServer {
    /// Server name, unique within a scope
    pub name: String,
    /// Command to execute
    #[serde(default)]
    pub command: String,
    /// Command arguments
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub args: Vec<String>,
    /// Scope the server belongs to, when it differs from the one applied
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope: Option<Scope>,
}

impl McpServer {
    /// Create a server definition
    pub fn new(name: impl Into<String>, command: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            name: name.into(),
            command: command.into(),
            args,
            scope: None,
        }
    }

    /// Whether this server should be reconciled at `scope`
    #[must_use]
    pub fn applies_to(&self, scope: Scope) -> bool {
        self.scope.map_or(true, |s| s == scope)
    }
}

/// File-based extensions by category
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Extensions {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub agents: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub commands: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub skills: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub hooks: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub rules: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub output_styles: Vec<String>,
}

impl Extensions {
    /// Whether no category has entries
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.categories().iter().all(|(_, items)| items.is_empty())
    }

    /// Total number of entries across categories
    #[must_use]
    pub fn len(&self) -> usize {
        self.categories().iter().map(|(_, items)| items.len()).sum()
    }

    /// Categories with their display names
    #[must_use]
    pub fn categories(&self) -> [(&'static str, &Vec<String>); 6] {
        [
            ("agents", &self.agents),
            ("commands", &self.commands),
            ("skills", &self.skills),
            ("hooks", &self.hooks),
            ("rules", &self.rules),
            ("output-styles", &self.output_styles),
        ]
    }
}

/// A settings hook entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HookEntry {
    /// Hook type, `command` for shell hooks
    #[serde(rename = "type", default = "default_hook_type")]
    pub kind: String,
    /// Shell command to run
    pub command: String,
    /// Timeout in seconds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout: Option<u64>,
}

fn default_hook_type() -> String {
    "command".to_string()
}

impl HookEntry {
    /// Create a command hook
    pub fn command(command: impl Into<String>) -> Self {
        Self {
            kind: default_hook_type(),
            command: command.into(),
            timeout: None,
        }
    }
}

/// Rules deciding whether a profile fits a project directory
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Detect {
    /// Files that must exist
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub files: Vec<String>,
    /// File to substring it must contain
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub contains: BTreeMap<String, String>,
}

impl Detect {
    /// Whether no rules are set
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.files.is_empty() && self.contains.is_empty()
    }
}

/// Settings for each scope, independently
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PerScope {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<ScopeSettings>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project: Option<ScopeSettings>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub local: Option<ScopeSettings>,
}

impl PerScope {
    /// Settings for a scope, if present
    #[must_use]
    pub fn get(&self, scope: Scope) -> Option<&ScopeSettings> {
        match scope {
            Scope::User => self.user.as_ref(),
            Scope::Project => self.project.as_ref(),
            Scope::Local => self.local.as_ref(),
        }
    }

    /// Mutable slot for a scope
    pub fn slot_mut(&mut self, scope: Scope) -> &mut Option<ScopeSettings> {
        match scope {
            Scope::User => &mut self.user,
            Scope::Project => &mut self.project,
            Scope::Local => &mut self.local,
        }
    }

    /// Present scopes, lowest precedence first
    pub fn iter(&self) -> impl Iterator<Item = (Scope, &ScopeSettings)> {
        Scope::ALL
            .into_iter()
            .filter_map(move |scope| self.get(scope).map(|s| (scope, s)))
    }
}

/// Plugins, MCP servers and extensions declared for one scope
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScopeSettings {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub plugins: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub mcp_servers: Vec<McpServer>,
    #[serde(default, skip_serializing_if = "Extensions::is_empty")]
    pub extensions: Extensions,
}

impl ScopeSettings {
    /// Whether nothing is declared
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.plugins.is_empty() && self.mcp_servers.is_empty() && self.extensions.is_empty()
    }
}

/// When the post-apply hook runs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PostApplyCondition {
    /// After every successful apply
    #[default]
    Always,
    /// Only when none of the profile's marketplaces were in use before
    FirstRun,
}

/// A hook run after a profile is applied
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostApply {
    /// Shell command, run with `sh -c`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub command: Option<String>,
    /// Script path, relative to the profile's directory
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub script: Option<String>,
    /// When to run
    #[serde(default)]
    pub condition: PostApplyCondition,
}
