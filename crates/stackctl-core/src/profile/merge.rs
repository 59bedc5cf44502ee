//! Profile merge engine
//!
//! Merging folds a source profile into an accumulator field by field. Each
//! field has one strategy, registered in a table so a strategy can be added
//! or changed in one place:
//!
//! | Field | Strategy |
//! |---|---|
//! | plugins | union, order-preserving, exact dedup |
//! | marketplaces | union by key, first occurrence wins |
//! | MCP servers | keyed by name, later source replaces the entry |
//! | extensions | union per category |
//! | settings hooks | union per event, dedup by command |
//! | detect | files union, `contains` overlay |
//! | `skip_plugin_diff` | OR |
//! | `post_apply` | last defined wins |
//!
//! `per_scope` applies the scope-settings table per scope, creating a scope
//! only when some source populates it.

use super::types::{Detect, Extensions, HookEntry, McpServer, PerScope, Profile, ScopeSettings};
use stackctl_scanner::{Marketplace, Scope};
use std::collections::BTreeMap;

/// Merge function for one field of `T`
pub type FieldMerge<T> = fn(&mut T, &T);

/// Profile-level merge strategies, keyed by field name
pub const PROFILE_FIELDS: &[(&str, FieldMerge<Profile>)] = &[
    ("plugins", merge_plugins),
    ("marketplaces", merge_marketplaces),
    ("mcpServers", merge_mcp_servers),
    ("extensions", merge_profile_extensions),
    ("settingsHooks", merge_settings_hooks),
    ("detect", merge_detect),
    ("perScope", merge_per_scope),
    ("skipPluginDiff", merge_skip_plugin_diff),
    ("postApply", merge_post_apply),
];

/// Scope-level merge strategies, keyed by field name
pub const SCOPE_FIELDS: &[(&str, FieldMerge<ScopeSettings>)] = &[
    ("plugins", |dst, src| union_dedup(&mut dst.plugins, &src.plugins)),
    ("mcpServers", |dst, src| {
        overlay_mcp_servers(&mut dst.mcp_servers, &src.mcp_servers);
    }),
    ("extensions", |dst, src| {
        merge_extensions(&mut dst.extensions, &src.extensions);
    }),
];

/// Merge `src` into `dst`
///
/// `src` is never modified. Name, description and includes of `dst` are
/// left alone.
pub fn merge(dst: &mut Profile, src: &Profile) {
    for (field, merge_field) in PROFILE_FIELDS {
        tracing::trace!(field, source = %src.name, "merging field");
        merge_field(dst, src);
    }
}

/// Merge profiles left to right into a fresh accumulator
pub fn merge_all<'a>(profiles: impl IntoIterator<Item = &'a Profile>) -> Profile {
    let mut merged = Profile::default();
    for profile in profiles {
        merge(&mut merged, profile);
    }
    merged
}

/// Merge scope settings `src` into `dst`
pub fn merge_scope_settings(dst: &mut ScopeSettings, src: &ScopeSettings) {
    for (_, merge_field) in SCOPE_FIELDS {
        merge_field(dst, src);
    }
}

/// Append items of `src` not already in `dst`, keeping first-seen order
pub fn union_dedup(dst: &mut Vec<String>, src: &[String]) {
    for item in src {
        if !dst.contains(item) {
            dst.push(item.clone());
        }
    }
}

/// Append marketplaces whose key is not yet present; the first occurrence wins
pub fn union_marketplaces(dst: &mut Vec<Marketplace>, src: &[Marketplace]) {
    for marketplace in src {
        if !dst.iter().any(|m| m.key() == marketplace.key()) {
            dst.push(marketplace.clone());
        }
    }
}

/// Overlay servers by name: a later definition replaces the whole entry in place
pub fn overlay_mcp_servers(dst: &mut Vec<McpServer>, src: &[McpServer]) {
    for server in src {
        match dst.iter_mut().find(|s| s.name == server.name) {
            Some(existing) => *existing = server.clone(),
            None => dst.push(server.clone()),
        }
    }
}

/// Union each extension category independently
pub fn merge_extensions(dst: &mut Extensions, src: &Extensions) {
    union_dedup(&mut dst.agents, &src.agents);
    union_dedup(&mut dst.commands, &src.commands);
    union_dedup(&mut dst.skills, &src.skills);
    union_dedup(&mut dst.hooks, &src.hooks);
    union_dedup(&mut dst.rules, &src.rules);
    union_dedup(&mut dst.output_styles, &src.output_styles);
}

/// Union hook entries per event, deduplicated by command
pub fn union_hooks(
    dst: &mut BTreeMap<String, Vec<HookEntry>>,
    src: &BTreeMap<String, Vec<HookEntry>>,
) {
    for (event, entries) in src {
        let existing = dst.entry(event.clone()).or_default();
        for entry in entries {
            if !existing.iter().any(|e| e.command == entry.command) {
                existing.push(entry.clone());
            }
        }
    }
}

/// Union detect files and overlay `contains` rules
pub fn overlay_detect(dst: &mut Detect, src: &Detect) {
    union_dedup(&mut dst.files, &src.files);
    for (file, needle) in &src.contains {
        dst.contains.insert(file.clone(), needle.clone());
    }
}

fn merge_plugins(dst: &mut Profile, src: &Profile) {
    union_dedup(&mut dst.plugins, &src.plugins);
}

fn merge_marketplaces(dst: &mut Profile, src: &Profile) {
    union_marketplaces(&mut dst.marketplaces, &src.marketplaces);
}

fn merge_mcp_servers(dst: &mut Profile, src: &Profile) {
    overlay_mcp_servers(&mut dst.mcp_servers, &src.mcp_servers);
}

fn merge_profile_extensions(dst: &mut Profile, src: &Profile) {
    merge_extensions(&mut dst.extensions, &src.extensions);
}

fn merge_settings_hooks(dst: &mut Profile, src: &Profile) {
    union_hooks(&mut dst.settings_hooks, &src.settings_hooks);
}

fn merge_detect(dst: &mut Profile, src: &Profile) {
    overlay_detect(&mut dst.detect, &src.detect);
}

fn merge_per_scope(dst: &mut Profile, src: &Profile) {
    let Some(src_scopes) = &src.per_scope else {
        return;
    };

    for scope in Scope::ALL {
        let Some(settings) = src_scopes.get(scope).filter(|s| !s.is_empty()) else {
            continue;
        };
        let slot = dst
            .per_scope
            .get_or_insert_with(PerScope::default)
            .slot_mut(scope);
        match slot {
            Some(existing) => merge_scope_settings(existing, settings),
            None => *slot = Some(settings.clone()),
        }
    }
}

fn merge_skip_plugin_diff(dst: &mut Profile, src: &Profile) {
    dst.skip_plugin_diff |= src.skip_plugin_diff;
}

fn merge_post_apply(dst: &mut Profile, src: &Profile) {
    if let Some(post_apply) = &src.post_apply {
        dst.post_apply = Some(post_apply.clone());
    }
}
