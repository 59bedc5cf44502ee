//! Diff computation between a resolved profile and observed state

use super::types::{DiffResult, Warning};
use crate::profile::{McpServer, Profile};
use stackctl_scanner::{
    split_plugin_id, Marketplace, ObservedState, RegisteredMarketplace, Scope,
};
use std::collections::HashSet;

/// Compute the actions reconciling `scope` with a resolved profile
///
/// Only state observed at `scope` is ever proposed for removal; items
/// enabled at other scopes are left alone. The plugin install set is the
/// whole desired set: installing an enabled plugin again is harmless and
/// re-checks its marketplace registration.
#[must_use]
pub fn compute_diff(profile: &Profile, state: &ObservedState, scope: Scope) -> DiffResult {
    let desired = profile.settings_for(scope);
    let observed = state.scope(scope);
    let mut diff = DiffResult::new(&profile.name, scope);

    // Plugins
    diff.plugins_to_install.clone_from(&desired.plugins);
    if profile.skip_plugin_diff {
        let skipped = observed
            .enabled_plugins
            .iter()
            .filter(|p| !desired.plugins.contains(p))
            .count();
        if skipped > 0 {
            diff.warnings.push(Warning::info(format!(
                "skipPluginDiff is set: {skipped} plugin(s) not in the profile are kept"
            )));
        }
    } else {
        diff.plugins_to_remove = observed
            .enabled_plugins
            .iter()
            .filter(|p| !desired.plugins.contains(p))
            .cloned()
            .collect();
    }

    // MCP servers
    let desired_mcp: Vec<&McpServer> = desired
        .mcp_servers
        .iter()
        .filter(|s| s.applies_to(scope))
        .collect();
    diff.mcp_to_install = desired_mcp
        .iter()
        .filter(|s| !observed.mcp_servers.iter().any(|o| o.name == s.name))
        .map(|s| (*s).clone())
        .collect();
    diff.mcp_to_remove = observed
        .mcp_servers
        .iter()
        .filter(|o| !desired_mcp.iter().any(|s| s.name == o.name))
        .map(|o| o.name.clone())
        .collect();

    // Marketplaces
    let registered: HashSet<&str> = state
        .scopes
        .values()
        .flat_map(|s| s.marketplaces.iter())
        .map(|r| r.marketplace.key())
        .collect();
    diff.marketplaces_to_add = profile
        .marketplaces
        .iter()
        .filter(|m| !registered.contains(m.key()))
        .cloned()
        .collect();
    diff.marketplaces_to_remove = observed
        .marketplaces
        .iter()
        .filter(|r| !profile.marketplaces.iter().any(|m| m.key() == r.marketplace.key()))
        .cloned()
        .collect();

    warn_about_marketplaces(&mut diff, profile, state);

    tracing::debug!(
        profile = %profile.name,
        %scope,
        actions = diff.action_count(),
        "computed diff"
    );
    diff
}

fn warn_about_marketplaces(diff: &mut DiffResult, profile: &Profile, state: &ObservedState) {
    let registry = state.marketplace_registry();

    for plugin in &diff.plugins_to_install {
        let (_, Some(suffix)) = split_plugin_id(plugin) else {
            diff.warnings.push(Warning::warning(format!(
                "Plugin '{plugin}' has no @marketplace suffix"
            )));
            continue;
        };
        let known = registry.contains_key(suffix)
            || profile
                .marketplaces
                .iter()
                .any(|m| m.display_name().as_deref() == Some(suffix));
        if !known {
            diff.warnings.push(Warning::warning(format!(
                "Plugin '{plugin}' references marketplace '{suffix}' which is neither registered nor declared"
            )));
        }
    }

    for removed in &diff.marketplaces_to_remove {
        let still_used: Vec<&str> = state
            .scopes
            .values()
            .filter(|s| s.scope != diff.scope)
            .flat_map(|s| s.enabled_plugins.iter())
            .filter(|p| split_plugin_id(p).1 == Some(removed.name.as_str()))
            .map(String::as_str)
            .collect();
        if !still_used.is_empty() {
            diff.warnings.push(Warning::warning(format!(
                "Removing marketplace '{}' affects plugins enabled at other scopes: {}",
                removed.name,
                still_used.join(", ")
            )));
        }
    }
}

/// Registered marketplaces referenced by at least one plugin's
/// `@marketplace` suffix
///
/// Used when saving a profile from current state, so that registries the
/// saved plugins never use are not captured.
#[must_use]
pub fn marketplaces_in_use(
    marketplaces: &[RegisteredMarketplace],
    plugins: &[String],
) -> Vec<RegisteredMarketplace> {
    let suffixes: HashSet<&str> = plugins
        .iter()
        .filter_map(|p| split_plugin_id(p).1)
        .collect();

    marketplaces
        .iter()
        .filter(|r| {
            suffixes.contains(r.name.as_str())
                || r
                    .marketplace
                    .display_name()
                    .is_some_and(|name| suffixes.contains(name.as_str()))
        })
        .cloned()
        .collect()
}

/// Whether no enabled plugin, in any scope, uses one of `marketplaces`
///
/// Plugin suffixes are mapped to marketplaces through the registry names
/// observed in `state` and compared by dedup key. Suffixes missing from the
/// registry fall back to the marketplace display name.
#[must_use]
pub fn is_first_run(marketplaces: &[Marketplace], state: &ObservedState) -> bool {
    let keys: HashSet<&str> = marketplaces.iter().map(Marketplace::key).collect();
    let registry = state.marketplace_registry();

    let in_use = state.enabled_plugins().any(|plugin| {
        let Some(suffix) = split_plugin_id(plugin).1 else {
            return false;
        };
        match registry.get(suffix) {
            Some(marketplace) => keys.contains(marketplace.key()),
            None => marketplaces
                .iter()
                .any(|m| m.display_name().as_deref() == Some(suffix)),
        }
    });
    !in_use
}

/// Plan removal of everything a resolved profile declares at `scope`
///
/// Only items currently present are listed. A declared marketplace is
/// removed unless a plugin that stays enabled, at any scope, still uses it.
#[must_use]
pub fn plan_reset(profile: &Profile, state: &ObservedState, scope: Scope) -> DiffResult {
    let declared = profile.settings_for(scope);
    let observed = state.scope(scope);
    let mut diff = DiffResult::new(&profile.name, scope);

    diff.plugins_to_remove = observed
        .enabled_plugins
        .iter()
        .filter(|p| declared.plugins.contains(p))
        .cloned()
        .collect();
    diff.mcp_to_remove = observed
        .mcp_servers
        .iter()
        .filter(|o| declared.mcp_servers.iter().any(|s| s.name == o.name))
        .map(|o| o.name.clone())
        .collect();

    let declared_plugins = &declared.plugins;
    let remaining: Vec<&str> = state
        .scopes
        .values()
        .flat_map(|s| {
            s.enabled_plugins
                .iter()
                .filter(move |p| s.scope != scope || !declared_plugins.contains(p))
        })
        .map(String::as_str)
        .collect();
    diff.marketplaces_to_remove = observed
        .marketplaces
        .iter()
        .filter(|r| profile.marketplaces.iter().any(|m| m.key() == r.marketplace.key()))
        .filter(|r| {
            !remaining
                .iter()
                .any(|p| split_plugin_id(p).1 == Some(r.name.as_str()))
        })
        .cloned()
        .collect();

    diff
}
