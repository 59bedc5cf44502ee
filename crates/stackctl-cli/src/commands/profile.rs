//! Profile CLI commands
//!
//! Handles: stackctl profile list/show/save/delete/suggest

use anyhow::{bail, Result};
use clap::{Subcommand, ValueEnum};
use std::collections::BTreeSet;
use std::io::{self, Write};

use stackctl_core::profile::{
    snapshot_profile, Extensions, McpServer, ProfileLocation, ProfileSummary, StoreError,
};
use stackctl_scanner::Scope;

use crate::context::Context;

/// Profile commands
#[derive(Subcommand)]
pub enum ProfileCommands {
    /// List stored and built-in profiles
    List {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show a profile
    Show {
        /// Profile name or path to a profile file
        profile: String,
        /// Resolve includes and show the effective profile
        #[arg(long)]
        resolved: bool,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Save the current Claude Code state as a profile
    Save {
        /// Profile name
        name: String,
        /// Where to store the profile
        #[arg(long, value_enum, default_value = "user")]
        location: LocationArg,
        /// Optional description
        #[arg(short, long)]
        description: Option<String>,
        /// Only capture this scope
        #[arg(long)]
        scope: Option<Scope>,
        /// Overwrite an existing profile
        #[arg(short, long)]
        force: bool,
    },
    /// Delete a stored profile
    Delete {
        /// Profile name
        name: String,
        /// Where the profile is stored
        #[arg(long, value_enum, default_value = "user")]
        location: LocationArg,
        /// Skip confirmation prompt
        #[arg(short, long)]
        force: bool,
    },
    /// List profiles whose detect rules match the project
    Suggest,
}

/// Writable profile locations
#[derive(ValueEnum, Clone, Copy, Debug)]
pub enum LocationArg {
    User,
    Project,
}

impl From<LocationArg> for ProfileLocation {
    fn from(arg: LocationArg) -> Self {
        match arg {
            LocationArg::User => Self::User,
            LocationArg::Project => Self::Project,
        }
    }
}

/// Execute a profile command
pub fn execute(action: ProfileCommands, ctx: &Context) -> Result<()> {
    match action {
        ProfileCommands::List { json } => list(ctx, json),
        ProfileCommands::Show {
            profile,
            resolved,
            json,
        } => show(ctx, &profile, resolved, json),
        ProfileCommands::Save {
            name,
            location,
            description,
            scope,
            force,
        } => save(ctx, &name, location.into(), description, scope, force),
        ProfileCommands::Delete {
            name,
            location,
            force,
        } => delete(ctx, &name, location.into(), force),
        ProfileCommands::Suggest => suggest(ctx),
    }
}

/// Stored profiles followed by built-ins that no stored profile shadows
fn all_summaries(ctx: &Context) -> Result<Vec<ProfileSummary>> {
    let mut summaries = ctx.store.list()?;
    let stored: BTreeSet<String> = summaries.iter().map(|s| s.name.clone()).collect();
    for profile in ctx.builtins().profiles() {
        if !stored.contains(&profile.name) {
            summaries.push(ProfileSummary {
                name: profile.name.clone(),
                description: profile.description.clone(),
                location: ProfileLocation::Builtin,
                path: None,
                is_stack: profile.is_stack(),
            });
        }
    }
    Ok(summaries)
}

fn list(ctx: &Context, json: bool) -> Result<()> {
    let summaries = all_summaries(ctx)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&summaries)?);
        return Ok(());
    }

    if summaries.is_empty() {
        println!("No profiles found.");
        return Ok(());
    }

    println!("Profiles:");
    for s in &summaries {
        let desc = s.description.as_deref().unwrap_or("No description");
        let kind = if s.is_stack { ", stack" } else { "" };
        println!("  {} [{}{}] - {}", s.name, s.location, kind, desc);
    }
    Ok(())
}

fn show(ctx: &Context, reference: &str, resolved: bool, json: bool) -> Result<()> {
    let profile = if resolved {
        ctx.resolve(reference)?
    } else {
        ctx.load_profile(reference)?
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&profile)?);
        return Ok(());
    }

    println!("Profile: {}", profile.name);
    if let Some(desc) = &profile.description {
        println!("Description: {desc}");
    }
    if let Ok(path) = ctx.store.locate(reference) {
        println!("Path: {}", path.display());
    }

    if profile.is_stack() {
        println!("\nIncludes:");
        for name in &profile.includes {
            println!("  {name}");
        }
        return Ok(());
    }

    if !profile.marketplaces.is_empty() {
        println!("\nMarketplaces:");
        for m in &profile.marketplaces {
            println!("  {} ({})", m.display_name().unwrap_or_default(), m.key());
        }
    }

    match &profile.per_scope {
        Some(per_scope) => {
            for (scope, settings) in per_scope.iter() {
                println!("\n[{scope}]");
                print_settings(&settings.plugins, &settings.mcp_servers, &settings.extensions);
            }
        }
        None => print_settings(&profile.plugins, &profile.mcp_servers, &profile.extensions),
    }

    if !profile.settings_hooks.is_empty() {
        println!("\nSettings hooks:");
        for (event, hooks) in &profile.settings_hooks {
            println!("  {event}: {}", hooks.len());
        }
    }
    if let Some(post) = &profile.post_apply {
        let what = post
            .command
            .as_deref()
            .or(post.script.as_deref())
            .unwrap_or("-");
        println!("\nPost-apply ({:?}): {what}", post.condition);
    }
    if profile.skip_plugin_diff {
        println!("\nPlugin removals are skipped for this profile.");
    }
    Ok(())
}

fn print_settings(
    plugins: &[String],
    mcp_servers: &[McpServer],
    extensions: &Extensions,
) {
    println!("Plugins: {}", plugins.len());
    for plugin in plugins {
        println!("  {plugin}");
    }
    println!("MCP servers: {}", mcp_servers.len());
    for server in mcp_servers {
        println!("  {} ({})", server.name, server.command);
    }
    for (category, items) in extensions.categories() {
        if !items.is_empty() {
            println!("{category}: {}", items.join(", "));
        }
    }
}

fn save(
    ctx: &Context,
    name: &str,
    location: ProfileLocation,
    description: Option<String>,
    scope: Option<Scope>,
    force: bool,
) -> Result<()> {
    if !force && ctx.store.locate(name).is_ok() {
        bail!("Profile '{name}' already exists (use --force to overwrite)");
    }

    let mut state = ctx.observe()?;
    if let Some(scope) = scope {
        state.scopes.retain(|s, _| *s == scope);
    }

    let mut profile = snapshot_profile(name, &state);
    profile.description = description;

    let path = ctx.store.save(&profile, location)?;
    println!("Saved profile '{name}' to {}", path.display());
    Ok(())
}

fn delete(ctx: &Context, name: &str, location: ProfileLocation, force: bool) -> Result<()> {
    if !force {
        print!("Delete profile '{name}' ({location})? [y/N] ");
        io::stdout().flush()?;
        let mut input = String::new();
        io::stdin().read_line(&mut input)?;
        if !input.trim().eq_ignore_ascii_case("y") {
            println!("Cancelled.");
            return Ok(());
        }
    }

    match ctx.store.delete(name, location) {
        Ok(path) => {
            println!("Deleted profile: {}", path.display());
            Ok(())
        }
        Err(StoreError::NotFound { .. }) if ctx.builtins().profiles().any(|p| p.name == name) => {
            bail!("Profile '{name}' is built in and cannot be deleted")
        }
        Err(e) => Err(e.into()),
    }
}

fn suggest(ctx: &Context) -> Result<()> {
    let mut matches = Vec::new();
    for summary in all_summaries(ctx)? {
        match ctx.resolve(&summary.name) {
            Ok(profile) if profile.detect.matches(&ctx.project) => matches.push(summary),
            Ok(_) => {}
            Err(e) => tracing::warn!(profile = %summary.name, "skipping profile: {e:#}"),
        }
    }

    if matches.is_empty() {
        println!("No profiles match {}.", ctx.project.display());
        return Ok(());
    }

    println!("Profiles matching {}:", ctx.project.display());
    for s in matches {
        let desc = s.description.as_deref().unwrap_or("No description");
        println!("  {} - {desc}", s.name);
    }
    Ok(())
}
