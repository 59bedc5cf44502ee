//! Profile snapshot creation from observed state

use super::merge::union_marketplaces;
use super::types::{McpServer, PerScope, Profile, ScopeSettings};
use crate::diff::marketplaces_in_use;
use stackctl_scanner::{ObservedMcpServer, ObservedState};

/// Build a per-scope profile describing what is currently configured
///
/// Only marketplaces referenced by a captured plugin are kept, so registries
/// that happen to be known but unused do not end up in the profile. MCP
/// servers without a command (URL servers) cannot be expressed in a profile
/// and are skipped.
#[must_use]
pub fn snapshot_profile(name: &str, state: &ObservedState) -> Profile {
    let mut profile = Profile::new(name);
    let mut per_scope = PerScope::default();

    for (scope, observed) in &state.scopes {
        let settings = ScopeSettings {
            plugins: observed.enabled_plugins.clone(),
            mcp_servers: observed
                .mcp_servers
                .iter()
                .filter_map(|server| to_profile_server(name, server))
                .collect(),
            ..ScopeSettings::default()
        };
        if !settings.is_empty() {
            *per_scope.slot_mut(*scope) = Some(settings);
        }
    }

    // A plugin enabled at one scope may come from a marketplace registered
    // at another
    let all_plugins: Vec<String> = state.enabled_plugins().map(str::to_string).collect();
    let registered: Vec<_> = state
        .scopes
        .values()
        .flat_map(|s| s.marketplaces.iter().cloned())
        .collect();
    let in_use: Vec<_> = marketplaces_in_use(&registered, &all_plugins)
        .into_iter()
        .map(|r| r.marketplace)
        .collect();
    union_marketplaces(&mut profile.marketplaces, &in_use);
    profile.discard_invalid_marketplaces();

    if per_scope.iter().next().is_some() {
        profile.per_scope = Some(per_scope);
    }
    profile
}

fn to_profile_server(profile: &str, server: &ObservedMcpServer) -> Option<McpServer> {
    match &server.command {
        Some(command) => Some(McpServer::new(&server.name, command, server.args.clone())),
        None => {
            tracing::debug!(profile, server = %server.name, "skipping MCP server without command");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use stackctl_scanner::{Marketplace, ObservedScope, RegisteredMarketplace, Scope};
    use std::collections::BTreeMap;

    #[test]
    fn test_snapshot_keeps_only_used_marketplaces() {
        let mut user = ObservedScope::empty(Scope::User);
        user.enabled_plugins = vec!["fmt@tools".into()];
        user.marketplaces = vec![
            RegisteredMarketplace {
                name: "tools".into(),
                marketplace: Marketplace::github("acme/tools"),
            },
            RegisteredMarketplace {
                name: "unused".into(),
                marketplace: Marketplace::github("acme/unused"),
            },
            RegisteredMarketplace {
                name: "web".into(),
                marketplace: Marketplace::github("acme/web"),
            },
        ];
        user.mcp_servers = vec![
            ObservedMcpServer {
                name: "db".into(),
                command: Some("db-mcp".into()),
                args: vec!["--ro".into()],
                url: None,
            },
            ObservedMcpServer {
                name: "remote".into(),
                command: None,
                args: vec![],
                url: Some("https://mcp.example.com".into()),
            },
        ];
        let mut project = ObservedScope::empty(Scope::Project);
        project.enabled_plugins = vec!["lint@web".into()];

        let state = ObservedState {
            scopes: BTreeMap::from([
                (Scope::User, user),
                (Scope::Project, project),
                (Scope::Local, ObservedScope::empty(Scope::Local)),
            ]),
        };

        let profile = snapshot_profile("mine", &state);
        let keys: Vec<&str> = profile.marketplaces.iter().map(Marketplace::key).collect();
        assert_eq!(keys, vec!["acme/tools", "acme/web"]);

        let per_scope = profile.per_scope.expect("per scope captured");
        let user = per_scope.user.expect("user scope captured");
        assert_eq!(user.mcp_servers.len(), 1);
        assert_eq!(per_scope.project.unwrap().plugins, vec!["lint@web"]);
        assert!(per_scope.local.is_none());
    }

    #[test]
    fn test_snapshot_of_nothing_is_empty() {
        let profile = snapshot_profile("empty", &ObservedState::default());
        assert!(!profile.has_config());
    }
}
