//! CLI command handlers
//!
//! Profile management lives in `profile`, reconciliation (diff, apply,
//! reset) in `apply`.

pub mod apply;
pub mod profile;
pub mod status;
