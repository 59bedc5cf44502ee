//! Host CLI invocation
//!
//! Jobs never touch Claude Code's files themselves; every mutation goes
//! through the `claude` binary via a [`CommandRunner`].

use stackctl_scanner::{split_plugin_id, Marketplace, MarketplaceSource, Scope};
use std::path::{Path, PathBuf};
use std::process::Command;
use thiserror::Error;

/// Output fragments meaning the target of a removal is already gone
const NOT_FOUND_PATTERNS: &[&str] = &["not found", "not installed", "does not exist", "no such"];

/// Errors from running an external command
#[derive(Debug, Error)]
pub enum CommandError {
    /// The program could not be started
    #[error("Failed to run {program}: {source}")]
    Spawn {
        program: String,
        source: std::io::Error,
    },

    /// The program ran and reported failure
    #[error("`{command}` failed: {output}")]
    Failed { command: String, output: String },
}

impl CommandError {
    /// Whether the output says the target does not exist
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        match self {
            Self::Failed { output, .. } => is_not_found_output(output),
            Self::Spawn { .. } => false,
        }
    }
}

/// Whether command output reports a missing target
#[must_use]
pub fn is_not_found_output(output: &str) -> bool {
    let output = output.to_lowercase();
    NOT_FOUND_PATTERNS.iter().any(|p| output.contains(p))
}

/// Runs host CLI commands
///
/// Implementations are shared by all workers of a phase.
pub trait CommandRunner: Send + Sync {
    /// Run a command, discarding its output
    ///
    /// # Errors
    /// Returns an error if the command cannot start or exits unsuccessfully
    fn run(&self, args: &[String]) -> Result<(), CommandError> {
        self.run_with_output(args).map(|_| ())
    }

    /// Run a command and return its standard output
    ///
    /// # Errors
    /// Returns an error if the command cannot start or exits unsuccessfully
    fn run_with_output(&self, args: &[String]) -> Result<String, CommandError>;
}

/// The `claude` binary
#[derive(Debug, Clone)]
pub struct ClaudeCli {
    program: PathBuf,
    working_dir: Option<PathBuf>,
}

impl ClaudeCli {
    /// Use `program` as the host binary
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            working_dir: None,
        }
    }

    /// Run commands from a project directory
    ///
    /// Project and local scope commands act on the directory they run in.
    #[must_use]
    pub fn in_dir(mut self, dir: &Path) -> Self {
        self.working_dir = Some(dir.to_path_buf());
        self
    }

    pub fn program(&self) -> &Path {
        &self.program
    }
}

impl CommandRunner for ClaudeCli {
    fn run_with_output(&self, args: &[String]) -> Result<String, CommandError> {
        let mut cmd = Command::new(&self.program);
        cmd.args(args);
        if let Some(dir) = &self.working_dir {
            cmd.current_dir(dir);
        }

        tracing::debug!(program = %self.program.display(), ?args, "running command");
        let output = cmd.output().map_err(|source| CommandError::Spawn {
            program: self.program.display().to_string(),
            source,
        })?;

        let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
        if output.status.success() {
            return Ok(stdout);
        }

        let stderr = String::from_utf8_lossy(&output.stderr);
        let message = if !stderr.trim().is_empty() {
            stderr.trim().to_string()
        } else if !stdout.trim().is_empty() {
            stdout.trim().to_string()
        } else {
            format!("exit status {}", output.status)
        };
        Err(CommandError::Failed {
            command: format!("{} {}", self.program.display(), args.join(" ")),
            output: message,
        })
    }
}

// ============================================================================
// Argument builders
// ============================================================================

fn args(parts: &[&str]) -> Vec<String> {
    parts.iter().map(|s| (*s).to_string()).collect()
}

/// `plugin install --scope=<scope> <name@marketplace>`
#[must_use]
pub fn plugin_install_args(plugin: &str, scope: Scope) -> Vec<String> {
    let scope_flag = format!("--scope={scope}");
    args(&["plugin", "install", scope_flag.as_str(), plugin])
}

/// `plugin uninstall --scope=<scope> <name>`
///
/// The host only accepts the bare plugin name here.
#[must_use]
pub fn plugin_uninstall_args(plugin: &str, scope: Scope) -> Vec<String> {
    let (name, _) = split_plugin_id(plugin);
    let scope_flag = format!("--scope={scope}");
    args(&["plugin", "uninstall", scope_flag.as_str(), name])
}

/// `plugin marketplace add <source>`
#[must_use]
pub fn marketplace_add_args(marketplace: &Marketplace) -> Vec<String> {
    let source = match marketplace.source {
        MarketplaceSource::Github => marketplace.repo.as_deref(),
        MarketplaceSource::Git => marketplace.url.as_deref(),
    }
    .unwrap_or_else(|| marketplace.key());
    args(&["plugin", "marketplace", "add", source])
}

/// `plugin marketplace remove <name>`
#[must_use]
pub fn marketplace_remove_args(name: &str) -> Vec<String> {
    args(&["plugin", "marketplace", "remove", name])
}

/// `mcp add --scope <scope> <name> -- <command> [args...]`
#[must_use]
pub fn mcp_add_args(name: &str, command: &str, command_args: &[String], scope: Scope) -> Vec<String> {
    let mut out = args(&["mcp", "add", "--scope", scope.as_str(), name, "--", command]);
    out.extend(command_args.iter().cloned());
    out
}

/// `mcp remove --scope <scope> <name>`
#[must_use]
pub fn mcp_remove_args(name: &str, scope: Scope) -> Vec<String> {
    args(&["mcp", "remove", "--scope", scope.as_str(), name])
}
