//! Diff display formatting for user review

use crate::diff::{DiffResult, WarningSeverity};
use std::fmt::Write;

/// Format a diff for terminal display
pub fn format_diff_terminal(diff: &DiffResult) -> String {
    let mut output = String::new();

    writeln!(output, "=== Diff: {} ({} scope) ===", diff.profile, diff.scope).unwrap();
    writeln!(output, "Actions: {}", diff.action_count()).unwrap();
    writeln!(output).unwrap();

    if !diff.warnings.is_empty() {
        writeln!(output, "Warnings:").unwrap();
        for warning in &diff.warnings {
            let prefix = match warning.severity {
                WarningSeverity::Info => "[INFO]",
                WarningSeverity::Warning => "[WARN]",
            };
            writeln!(output, "  {} {}", prefix, warning.message).unwrap();
        }
        writeln!(output).unwrap();
    }

    if diff.is_empty() {
        writeln!(output, "Nothing to do.").unwrap();
        return output;
    }

    for marketplace in &diff.marketplaces_to_remove {
        writeln!(
            output,
            "REMOVE MARKETPLACE: {} ({})",
            marketplace.name, marketplace.marketplace
        )
        .unwrap();
    }
    for marketplace in &diff.marketplaces_to_add {
        writeln!(output, "ADD MARKETPLACE: {marketplace}").unwrap();
    }
    for plugin in &diff.plugins_to_remove {
        writeln!(output, "REMOVE PLUGIN: {plugin}").unwrap();
    }
    for plugin in &diff.plugins_to_install {
        writeln!(output, "INSTALL PLUGIN: {plugin}").unwrap();
    }
    for name in &diff.mcp_to_remove {
        writeln!(output, "REMOVE MCP: {name}").unwrap();
    }
    for server in &diff.mcp_to_install {
        if server.args.is_empty() {
            writeln!(output, "ADD MCP: {} ({})", server.name, server.command).unwrap();
        } else {
            writeln!(
                output,
                "ADD MCP: {} ({} {})",
                server.name,
                server.command,
                server.args.join(" ")
            )
            .unwrap();
        }
    }

    output
}

/// Summary statistics for a diff
#[derive(Debug, Default, PartialEq, Eq)]
pub struct DiffSummary {
    /// Plugins to install
    pub installs: usize,
    /// Plugins and MCP servers to remove
    pub removes: usize,
    /// MCP servers to add
    pub mcp_adds: usize,
    /// Marketplaces to add
    pub marketplace_adds: usize,
    /// Marketplaces to remove
    pub marketplace_removes: usize,
}

impl DiffSummary {
    /// Generate summary from a diff
    pub fn from_diff(diff: &DiffResult) -> Self {
        Self {
            installs: diff.plugins_to_install.len(),
            removes: diff.plugins_to_remove.len() + diff.mcp_to_remove.len(),
            mcp_adds: diff.mcp_to_install.len(),
            marketplace_adds: diff.marketplaces_to_add.len(),
            marketplace_removes: diff.marketplaces_to_remove.len(),
        }
    }

    /// Format as a one-line summary
    pub fn one_line(&self) -> String {
        format!(
            "{} plugin install(s), {} MCP add(s), {} removal(s), {} marketplace add(s), {} marketplace removal(s)",
            self.installs, self.mcp_adds, self.removes, self.marketplace_adds, self.marketplace_removes
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::profile::McpServer;
    use stackctl_scanner::{Marketplace, Scope};

    fn sample() -> DiffResult {
        let mut diff = DiffResult::new("rust", Scope::Project);
        diff.plugins_to_install = vec!["fmt@tools".into()];
        diff.plugins_to_remove = vec!["old@tools".into()];
        diff.mcp_to_install = vec![McpServer::new("db", "db-mcp", vec!["--ro".into()])];
        diff.marketplaces_to_add = vec![Marketplace::github("acme/tools")];
        diff
    }

    #[test]
    fn test_format_terminal_lists_actions() {
        let output = format_diff_terminal(&sample());
        assert!(output.contains("=== Diff: rust (project scope) ==="));
        assert!(output.contains("INSTALL PLUGIN: fmt@tools"));
        assert!(output.contains("REMOVE PLUGIN: old@tools"));
        assert!(output.contains("ADD MCP: db (db-mcp --ro)"));
        assert!(output.contains("ADD MARKETPLACE: acme/tools"));
    }

    #[test]
    fn test_format_terminal_empty() {
        let diff = DiffResult::new("none", Scope::User);
        assert!(format_diff_terminal(&diff).contains("Nothing to do."));
    }

    #[test]
    fn test_summary_one_line() {
        let summary = DiffSummary::from_diff(&sample());
        assert_eq!(summary.installs, 1);
        assert_eq!(summary.removes, 1);
        assert_eq!(
            summary.one_line(),
            "1 plugin install(s), 1 MCP add(s), 1 removal(s), 1 marketplace add(s), 0 marketplace removal(s)"
        );
    }
}
