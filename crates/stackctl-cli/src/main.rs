//! stackctl CLI - Command-line interface for stackctl
//!
//! Provides `stackctl profile`, `stackctl diff`, `stackctl apply`,
//! `stackctl reset` and `stackctl status`.

mod commands;
mod context;
mod progress;

use clap::{Parser, Subcommand};
use stackctl_core::config::ConfigError;
use stackctl_scanner::Scope;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use commands::apply::ApplyArgs;
use commands::profile::ProfileCommands;
use context::Context;

/// Log filter variable
const LOG_ENV: &str = "STACKCTL_LOG";

#[derive(Parser)]
#[command(name = "stackctl")]
#[command(about = "stackctl - declarative Claude Code plugin and MCP profiles")]
#[command(version)]
struct Cli {
    /// Project directory (defaults to current directory)
    #[arg(short, long, global = true)]
    project: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Manage profiles
    Profile {
        #[command(subcommand)]
        action: ProfileCommands,
    },
    /// Show what applying a profile would change
    Diff {
        /// Profile name or path to a profile file
        profile: String,
        /// Scope to reconcile (defaults to the scopes the profile declares)
        #[arg(long)]
        scope: Option<Scope>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Apply a profile
    Apply(ApplyArgs),
    /// Remove everything a profile declares
    Reset {
        /// Profile name or path to a profile file
        profile: String,
        /// Scope to reset (defaults to the scopes the profile declares)
        #[arg(long)]
        scope: Option<Scope>,
        /// Preview changes without applying
        #[arg(long)]
        dry_run: bool,
    },
    /// Show applied profiles and drift
    Status,
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    if let Err(e) = run(cli) {
        match e.chain().find_map(|c| c.downcast_ref::<ConfigError>()) {
            Some(config_err) => eprintln!("Error [{}]: {e:#}", config_err.code()),
            None => eprintln!("Error: {e:#}"),
        }
        std::process::exit(1);
    }
}

/// Log to stderr, filtered by `STACKCTL_LOG` (`-v` forces debug)
fn init_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("stackctl=debug")
    } else {
        EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("stackctl=warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let mut ctx = Context::load(cli.project)?;

    match cli.command {
        Commands::Profile { action } => commands::profile::execute(action, &ctx),
        Commands::Diff {
            profile,
            scope,
            json,
        } => commands::apply::diff(&ctx, &profile, scope, json),
        Commands::Apply(args) => commands::apply::apply(&mut ctx, &args),
        Commands::Reset {
            profile,
            scope,
            dry_run,
        } => commands::apply::reset(&mut ctx, &profile, scope, dry_run),
        Commands::Status => commands::status::execute(&ctx),
    }
}
