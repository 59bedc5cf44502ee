//! Reconciliation of a resolved profile against observed state

mod compute;
mod display;
mod types;

pub use compute::{compute_diff, is_first_run, marketplaces_in_use, plan_reset};
pub use display::{format_diff_terminal, DiffSummary};
pub use types::{DiffResult, Warning, WarningSeverity};
