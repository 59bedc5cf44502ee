//! settings.json parser
//!
//! Only the keys that matter for reconciliation are read: `enabledPlugins`
//! and `extraKnownMarketplaces`. Everything else in the file is ignored.

use crate::error::{ScanError, ScanResult};
use crate::parser::registry::marketplace_from_source;
use crate::types::RegisteredMarketplace;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::Path;

/// Raw settings.json structure for parsing
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawSettings {
    #[serde(default)]
    enabled_plugins: BTreeMap<String, serde_json::Value>,
    #[serde(default)]
    extra_known_marketplaces: BTreeMap<String, RawExtraMarketplace>,
}

#[derive(Debug, Deserialize)]
struct RawExtraMarketplace {
    source: serde_json::Value,
}

/// The parts of a scope's settings file used for reconciliation
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScopeSettingsFile {
    /// Plugin ids whose `enabledPlugins` value is `true`, sorted
    pub enabled_plugins: Vec<String>,
    /// Marketplaces declared in `extraKnownMarketplaces`
    pub marketplaces: Vec<RegisteredMarketplace>,
}

/// Parse a settings.json file
///
/// # Errors
/// Returns an error if the content is not a JSON object of the expected shape
pub fn parse_settings(path: &Path, content: &str) -> ScanResult<ScopeSettingsFile> {
    if content.trim().is_empty() {
        return Ok(ScopeSettingsFile::default());
    }

    let raw: RawSettings = serde_json::from_str(content).map_err(|e| ScanError::InvalidFile {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;

    let enabled_plugins = raw
        .enabled_plugins
        .into_iter()
        .filter(|(_, value)| value.as_bool() == Some(true))
        .map(|(id, _)| id)
        .collect();

    let marketplaces = raw
        .extra_known_marketplaces
        .into_iter()
        .filter_map(|(name, entry)| {
            marketplace_from_source(&entry.source)
                .map(|marketplace| RegisteredMarketplace { name, marketplace })
        })
        .collect();

    Ok(ScopeSettingsFile {
        enabled_plugins,
        marketplaces,
    })
}
