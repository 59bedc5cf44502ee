//! Application configuration
//!
//! Settings for stackctl itself: worker count, host binary, profile
//! directory and the record of applied profiles.

mod app;
mod error;

pub use app::{data_dir, AppConfig, AppliedProfile, CLAUDE_ENV, HOME_ENV, WORKERS_ENV};
pub use error::{ConfigError, ConfigResult};
