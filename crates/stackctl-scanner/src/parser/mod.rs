//! Parsers for Claude Code state files

mod mcp;
mod registry;
mod settings;

pub use mcp::{parse_claude_json_mcp, parse_mcp_json};
pub use registry::{marketplace_from_source, parse_installed_plugins, parse_known_marketplaces};
pub use settings::{parse_settings, ScopeSettingsFile};
