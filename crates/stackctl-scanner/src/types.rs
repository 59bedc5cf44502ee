//! Shared types for the stackctl scanner

use crate::error::ScanError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Configuration scope - the precedence level a setting lives at
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Scope {
    /// User-global (~/.claude/, ~/.claude.json)
    User,
    /// Project, checked in (.claude/settings.json, .mcp.json)
    Project,
    /// Local project overrides (.claude/settings.local.json) - gitignored
    Local,
}

impl Scope {
    /// All scopes, lowest precedence first
    pub const ALL: [Scope; 3] = [Scope::User, Scope::Project, Scope::Local];

    /// Precedence order (higher = takes priority)
    #[must_use]
    pub fn precedence(self) -> u8 {
        match self {
            Self::Local => 3,
            Self::Project => 2,
            Self::User => 1,
        }
    }

    /// Value passed to the host CLI's `--scope` flag
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Project => "project",
            Self::Local => "local",
        }
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Scope {
    type Err = ScanError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "user" | "global" => Ok(Self::User),
            "project" => Ok(Self::Project),
            "local" => Ok(Self::Local),
            _ => Err(ScanError::InvalidScope(s.to_string())),
        }
    }
}

/// Kind of marketplace source
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MarketplaceSource {
    /// GitHub `owner/repo` coordinate
    #[default]
    Github,
    /// Any git URL
    Git,
}

/// A plugin marketplace source
///
/// Two marketplaces are the same entity when their [`Marketplace::key`]
/// matches, regardless of source kind.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Marketplace {
    /// Source kind
    #[serde(default)]
    pub source: MarketplaceSource,
    /// Repository coordinate (github sources)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub repo: Option<String>,
    /// Git URL (git sources)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

impl Marketplace {
    /// Create a GitHub marketplace reference
    pub fn github(repo: impl Into<String>) -> Self {
        Self {
            source: MarketplaceSource::Github,
            repo: Some(repo.into()),
            url: None,
        }
    }

    /// Create a git URL marketplace reference
    pub fn git(url: impl Into<String>) -> Self {
        Self {
            source: MarketplaceSource::Git,
            repo: None,
            url: Some(url.into()),
        }
    }

    /// Deduplication key: the repo if present, otherwise the URL
    #[must_use]
    pub fn key(&self) -> &str {
        non_empty(self.repo.as_deref())
            .or_else(|| non_empty(self.url.as_deref()))
            .unwrap_or("")
    }

    /// Human-readable name derived from the repo or URL
    ///
    /// Returns `None` when neither resolves to a name, which makes the
    /// marketplace invalid.
    #[must_use]
    pub fn display_name(&self) -> Option<String> {
        let location = self.key().trim_end_matches('/');
        let location = location.strip_suffix(".git").unwrap_or(location);
        let name = location
            .rsplit(&['/', ':'][..])
            .next()
            .unwrap_or("")
            .trim();
        if name.is_empty() {
            None
        } else {
            Some(name.to_string())
        }
    }

    /// Whether this marketplace can be identified at all
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.display_name().is_some()
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

impl fmt::Display for Marketplace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// A marketplace as registered with Claude Code, under its registry name
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegisteredMarketplace {
    /// Name the marketplace is registered under (the `@suffix` of plugin ids)
    pub name: String,
    /// Where it comes from
    pub marketplace: Marketplace,
}

/// One entry of the installed plugin registry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstalledPlugin {
    /// Full plugin identifier (`name@marketplace`)
    pub id: String,
    /// Scope it was installed at
    pub scope: Scope,
    /// Project the install belongs to (project/local installs)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub project_path: Option<String>,
    /// Installed version
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
}

/// An MCP server as configured in Claude Code
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObservedMcpServer {
    /// Server name (unique within a scope)
    pub name: String,
    /// Command to run (stdio servers)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub command: Option<String>,
    /// Command arguments
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub args: Vec<String>,
    /// URL (http/sse servers)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

/// Split a plugin identifier into its name and marketplace suffix
#[must_use]
pub fn split_plugin_id(id: &str) -> (&str, Option<&str>) {
    match id.rsplit_once('@') {
        Some((name, marketplace)) if !marketplace.is_empty() => (name, Some(marketplace)),
        _ => (id, None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scope_from_str() {
        assert_eq!(Scope::from_str("user").unwrap(), Scope::User);
        assert_eq!(Scope::from_str("global").unwrap(), Scope::User);
        assert_eq!(Scope::from_str("Project").unwrap(), Scope::Project);
        assert_eq!(Scope::from_str("local").unwrap(), Scope::Local);
        assert!(Scope::from_str("managed").is_err());
    }

    #[test]
    fn test_scope_precedence() {
        assert!(Scope::Local.precedence() > Scope::Project.precedence());
        assert!(Scope::Project.precedence() > Scope::User.precedence());
    }

    #[test]
    fn test_marketplace_key_prefers_repo() {
        let mut mp = Marketplace::github("acme/tools");
        mp.url = Some("https://example.com/other.git".into());
        assert_eq!(mp.key(), "acme/tools");

        let mp = Marketplace::git("https://example.com/acme/tools.git");
        assert_eq!(mp.key(), "https://example.com/acme/tools.git");
    }

    #[test]
    fn test_marketplace_display_name() {
        assert_eq!(
            Marketplace::github("acme/tools").display_name().as_deref(),
            Some("tools")
        );
        assert_eq!(
            Marketplace::git("git@github.com:acme/tools.git")
                .display_name()
                .as_deref(),
            Some("tools")
        );
        assert_eq!(Marketplace::github("  ").display_name(), None);
        assert!(!Marketplace::default().is_valid());
    }

    #[test]
    fn test_split_plugin_id() {
        assert_eq!(split_plugin_id("fmt@tools"), ("fmt", Some("tools")));
        assert_eq!(split_plugin_id("fmt"), ("fmt", None));
        assert_eq!(split_plugin_id("fmt@"), ("fmt@", None));
    }
}
