//! stackctl scanner - Claude Code state observation
//!
//! This crate provides read-only access to the plugin, marketplace and MCP
//! state Claude Code keeps on disk, split by user, project and local scope.

#![forbid(unsafe_code)]
#![warn(clippy::all, clippy::pedantic)]
#![allow(
    clippy::missing_errors_doc,
    clippy::must_use_candidate,
    clippy::module_name_repetitions,
    clippy::option_if_let_else,
    clippy::map_unwrap_or,
    clippy::manual_let_else
)]

pub mod error;
pub mod observer;
pub mod parser;
pub mod paths;
pub mod types;

pub use error::{ScanError, ScanResult};
pub use observer::{FsObserver, ObservedScope, ObservedState, StateObserver};
pub use paths::ClaudePaths;
pub use types::{
    split_plugin_id, InstalledPlugin, Marketplace, MarketplaceSource, ObservedMcpServer,
    RegisteredMarketplace, Scope,
};
