//! Plugin registry parsers
//!
//! Reads `known_marketplaces.json` and `installed_plugins.json` from
//! `~/.claude/plugins/`.

use crate::error::{ScanError, ScanResult};
use crate::types::{InstalledPlugin, Marketplace, RegisteredMarketplace, Scope};
use serde::Deserialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::Path;
use std::str::FromStr;

#[derive(Debug, Deserialize)]
struct RawMarketplaceEntry {
    source: Value,
}

#[derive(Debug, Deserialize)]
struct RawInstalledPlugins {
    #[serde(default)]
    plugins: BTreeMap<String, Value>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawPluginInstall {
    #[serde(default)]
    scope: Option<String>,
    project_path: Option<String>,
    version: Option<String>,
}

/// Convert a Claude Code marketplace `source` object into a [`Marketplace`]
///
/// Only `github` and `git`/`url` sources are representable; directory
/// sources and malformed entries yield `None`.
#[must_use]
pub fn marketplace_from_source(source: &Value) -> Option<Marketplace> {
    let kind = source.get("source").and_then(Value::as_str)?;
    let marketplace = match kind {
        "github" => Marketplace::github(source.get("repo").and_then(Value::as_str)?),
        "git" | "url" => Marketplace::git(source.get("url").and_then(Value::as_str)?),
        _ => return None,
    };
    marketplace.is_valid().then_some(marketplace)
}

/// Parse `known_marketplaces.json`
///
/// # Errors
/// Returns an error if the file is not a JSON object of marketplace entries
pub fn parse_known_marketplaces(
    path: &Path,
    content: &str,
) -> ScanResult<Vec<RegisteredMarketplace>> {
    if content.trim().is_empty() {
        return Ok(Vec::new());
    }

    let raw: BTreeMap<String, RawMarketplaceEntry> =
        serde_json::from_str(content).map_err(|e| invalid(path, &e))?;

    Ok(raw
        .into_iter()
        .filter_map(|(name, entry)| match marketplace_from_source(&entry.source) {
            Some(marketplace) => Some(RegisteredMarketplace { name, marketplace }),
            None => {
                tracing::debug!(marketplace = %name, "skipping marketplace with unmanaged source");
                None
            }
        })
        .collect())
}

/// Parse `installed_plugins.json`
///
/// Accepts both layouts Claude Code has used: a list of installs per plugin
/// id, and a single install object per plugin id (implicitly user scope).
///
/// # Errors
/// Returns an error if the file is not valid JSON
pub fn parse_installed_plugins(path: &Path, content: &str) -> ScanResult<Vec<InstalledPlugin>> {
    if content.trim().is_empty() {
        return Ok(Vec::new());
    }

    let raw: RawInstalledPlugins = serde_json::from_str(content).map_err(|e| invalid(path, &e))?;

    let mut installed = Vec::new();
    for (id, value) in raw.plugins {
        let installs = match value {
            Value::Array(items) => items,
            other @ Value::Object(_) => vec![other],
            _ => continue,
        };

        for install in installs {
            let Ok(install) = serde_json::from_value::<RawPluginInstall>(install) else {
                tracing::debug!(plugin = %id, "skipping malformed install entry");
                continue;
            };
            let scope = install
                .scope
                .as_deref()
                .and_then(|s| Scope::from_str(s).ok())
                .unwrap_or(Scope::User);

            installed.push(InstalledPlugin {
                id: id.clone(),
                scope,
                project_path: install.project_path,
                version: install.version,
            });
        }
    }

    Ok(installed)
}

fn invalid(path: &Path, err: &serde_json::Error) -> ScanError {
    ScanError::InvalidFile {
        path: path.to_path_buf(),
        message: err.to_string(),
    }
}
