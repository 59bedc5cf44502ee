//! stackctl core - profile engine, reconciliation and phased apply
//!
//! This crate resolves profile include graphs into one effective profile,
//! diffs that profile against the state observed by `stackctl-scanner`, and
//! applies the resulting actions through the host CLI on a bounded worker
//! pool.

#![forbid(unsafe_code)]
#![warn(clippy::all, clippy::pedantic)]
#![allow(
    clippy::missing_errors_doc,
    clippy::must_use_candidate,
    clippy::module_name_repetitions,
    clippy::missing_panics_doc
)]

pub mod apply;
pub mod config;
pub mod diff;
pub mod profile;
pub mod util;

pub use stackctl_scanner;

pub use apply::{apply_diff, ApplyOptions, ApplyReport};
pub use config::AppConfig;
pub use diff::{compute_diff, DiffResult};
pub use profile::{resolve_includes, Profile, ProfileStore};
