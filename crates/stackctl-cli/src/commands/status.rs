//! `stackctl status`

use anyhow::Result;
use stackctl_core::diff::compute_diff;
use stackctl_scanner::Scope;

use crate::context::Context;

/// Show observed state and drift from the last applied profile, per scope
pub fn execute(ctx: &Context) -> Result<()> {
    let state = ctx.observe()?;
    println!("Project: {}", ctx.project.display());

    for scope in Scope::ALL {
        let observed = state.scope(scope);
        println!(
            "\n[{scope}] {} plugin(s) enabled, {} MCP server(s), {} marketplace(s)",
            observed.enabled_plugins.len(),
            observed.mcp_servers.len(),
            observed.marketplaces.len()
        );
        let not_installed = observed.enabled_not_installed();
        if !not_installed.is_empty() {
            println!(
                "  {} enabled plugin(s) not installed: {}",
                not_installed.len(),
                not_installed.join(", ")
            );
        }

        let Some(applied) = ctx.config.applied_for(scope, &ctx.project) else {
            println!("  No profile applied");
            continue;
        };
        println!(
            "  Applied: {} ({})",
            applied.profile,
            applied.applied_at.format("%Y-%m-%d %H:%M")
        );

        let profile = match ctx.resolve(&applied.profile) {
            Ok(profile) => profile,
            Err(e) => {
                println!("  Cannot check drift: {e:#}");
                continue;
            }
        };
        let diff = compute_diff(&profile, &state, scope);
        let missing = diff
            .plugins_to_install
            .iter()
            .filter(|p| !observed.enabled_plugins.contains(p))
            .count();
        let drift = missing
            + diff.plugins_to_remove.len()
            + diff.mcp_to_install.len()
            + diff.mcp_to_remove.len()
            + diff.marketplaces_to_add.len()
            + diff.marketplaces_to_remove.len();

        if drift == 0 {
            println!("  In sync");
        } else {
            println!(
                "  Drift: {missing} plugin(s) missing, {} extra, {} MCP add(s), {} MCP removal(s), {} marketplace change(s)",
                diff.plugins_to_remove.len(),
                diff.mcp_to_install.len(),
                diff.mcp_to_remove.len(),
                diff.marketplaces_to_add.len() + diff.marketplaces_to_remove.len()
            );
        }
    }
    Ok(())
}
