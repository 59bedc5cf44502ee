//! Reconciliation results

use crate::profile::McpServer;
use serde::{Deserialize, Serialize};
use stackctl_scanner::{Marketplace, RegisteredMarketplace, Scope};

/// Actions that move one scope from its observed state to the desired one
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiffResult {
    /// Profile being reconciled
    pub profile: String,
    /// Scope the actions apply to
    pub scope: Scope,
    /// Plugins to install (the whole desired set)
    pub plugins_to_install: Vec<String>,
    /// Enabled plugins the profile does not declare
    pub plugins_to_remove: Vec<String>,
    /// MCP servers to add
    pub mcp_to_install: Vec<McpServer>,
    /// MCP server names to remove
    pub mcp_to_remove: Vec<String>,
    /// Marketplaces to register
    pub marketplaces_to_add: Vec<Marketplace>,
    /// Registered marketplaces to remove
    pub marketplaces_to_remove: Vec<RegisteredMarketplace>,
    /// Notes produced while diffing
    pub warnings: Vec<Warning>,
}

impl DiffResult {
    /// Create an empty result
    #[must_use]
    pub fn new(profile: impl Into<String>, scope: Scope) -> Self {
        Self {
            profile: profile.into(),
            scope,
            plugins_to_install: Vec::new(),
            plugins_to_remove: Vec::new(),
            mcp_to_install: Vec::new(),
            mcp_to_remove: Vec::new(),
            marketplaces_to_add: Vec::new(),
            marketplaces_to_remove: Vec::new(),
            warnings: Vec::new(),
        }
    }

    /// Check if there are no actions
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.plugins_to_install.is_empty()
            && self.plugins_to_remove.is_empty()
            && self.mcp_to_install.is_empty()
            && self.mcp_to_remove.is_empty()
            && self.marketplaces_to_add.is_empty()
            && self.marketplaces_to_remove.is_empty()
    }

    /// Whether anything would be removed
    #[must_use]
    pub fn has_removals(&self) -> bool {
        !self.plugins_to_remove.is_empty()
            || !self.mcp_to_remove.is_empty()
            || !self.marketplaces_to_remove.is_empty()
    }

    /// Total number of actions
    #[must_use]
    pub fn action_count(&self) -> usize {
        self.plugins_to_install.len()
            + self.plugins_to_remove.len()
            + self.mcp_to_install.len()
            + self.mcp_to_remove.len()
            + self.marketplaces_to_add.len()
            + self.marketplaces_to_remove.len()
    }
}

/// A note attached to a diff
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Warning {
    /// Severity level
    pub severity: WarningSeverity,
    /// Warning message
    pub message: String,
}

impl Warning {
    pub fn info(message: impl Into<String>) -> Self {
        Self {
            severity: WarningSeverity::Info,
            message: message.into(),
        }
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self {
            severity: WarningSeverity::Warning,
            message: message.into(),
        }
    }
}

/// Warning severity levels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WarningSeverity {
    /// Informational
    Info,
    /// Worth a look before applying
    Warning,
}
