//! MCP configuration parser

use crate::error::{ScanError, ScanResult};
use crate::types::ObservedMcpServer;
use serde::Deserialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::Path;

#[derive(Debug, Deserialize)]
struct RawMcpServer {
    command: Option<String>,
    #[serde(default)]
    args: Vec<String>,
    url: Option<String>,
}

/// Convert a raw `mcpServers` object into named servers
fn convert_servers(path: &Path, servers: Option<&Value>) -> ScanResult<Vec<ObservedMcpServer>> {
    let Some(servers) = servers else {
        return Ok(Vec::new());
    };

    let raw: BTreeMap<String, RawMcpServer> =
        serde_json::from_value(servers.clone()).map_err(|e| ScanError::InvalidFile {
            path: path.to_path_buf(),
            message: format!("invalid mcpServers: {e}"),
        })?;

    Ok(raw
        .into_iter()
        .map(|(name, server)| ObservedMcpServer {
            name,
            command: server.command,
            args: server.args,
            url: server.url,
        })
        .collect())
}

fn parse_json(path: &Path, content: &str) -> ScanResult<Value> {
    if content.trim().is_empty() {
        return Ok(Value::Null);
    }
    serde_json::from_str(content).map_err(|e| ScanError::InvalidFile {
        path: path.to_path_buf(),
        message: e.to_string(),
    })
}

/// Parse a project `.mcp.json`
///
/// # Errors
/// Returns an error if the file is not valid JSON
pub fn parse_mcp_json(path: &Path, content: &str) -> ScanResult<Vec<ObservedMcpServer>> {
    let root = parse_json(path, content)?;
    convert_servers(path, root.get("mcpServers"))
}

/// Parse the MCP servers out of `~/.claude.json`
///
/// With no `project_key` the top-level (user scope) servers are returned;
/// otherwise the servers of that project's entry (local scope).
///
/// # Errors
/// Returns an error if the file is not valid JSON
pub fn parse_claude_json_mcp(
    path: &Path,
    content: &str,
    project_key: Option<&str>,
) -> ScanResult<Vec<ObservedMcpServer>> {
    let root = parse_json(path, content)?;
    let servers = match project_key {
        None => root.get("mcpServers"),
        Some(key) => root
            .get("projects")
            .and_then(|projects| projects.get(key))
            .and_then(|project| project.get("mcpServers")),
    };
    convert_servers(path, servers)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    const CLAUDE_JSON: &str = r#"{
        "numStartups": 12,
        "mcpServers": {
            "github": { "type": "stdio", "command": "npx", "args": ["-y", "gh-mcp"] }
        },
        "projects": {
            "/work/app": {
                "mcpServers": {
                    "db": { "command": "db-mcp", "args": [] },
                    "docs": { "type": "http", "url": "https://docs.example.com/mcp" }
                }
            }
        }
    }"#;

    #[test]
    fn test_parse_user_servers() {
        let servers =
            parse_claude_json_mcp(&PathBuf::from(".claude.json"), CLAUDE_JSON, None).unwrap();
        assert_eq!(servers.len(), 1);
        assert_eq!(servers[0].name, "github");
        assert_eq!(servers[0].args, vec!["-y", "gh-mcp"]);
    }

    #[test]
    fn test_parse_local_servers() {
        let path = PathBuf::from(".claude.json");
        let servers = parse_claude_json_mcp(&path, CLAUDE_JSON, Some("/work/app")).unwrap();
        let names: Vec<_> = servers.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["db", "docs"]);
        assert_eq!(servers[1].url.as_deref(), Some("https://docs.example.com/mcp"));

        let none = parse_claude_json_mcp(&path, CLAUDE_JSON, Some("/elsewhere")).unwrap();
        assert!(none.is_empty());
    }

    #[test]
    fn test_parse_mcp_json() {
        let content = r#"{ "mcpServers": { "fs": { "command": "fs-mcp", "args": ["."] } } }"#;
        let servers = parse_mcp_json(&PathBuf::from(".mcp.json"), content).unwrap();
        assert_eq!(servers.len(), 1);
        assert_eq!(servers[0].command.as_deref(), Some("fs-mcp"));
    }
}
