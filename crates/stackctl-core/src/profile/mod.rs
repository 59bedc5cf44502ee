//! Profile types and operations

mod detect;
mod error;
pub mod merge;
pub mod resolve;
pub mod snapshot;
pub mod store;
mod types;

pub use error::{LoadError, ProfileError, ProfileResult, StoreError};
pub use merge::{merge, merge_all};
pub use resolve::{resolve_includes, MAX_INCLUDE_DEPTH};
pub use snapshot::snapshot_profile;
pub use store::{
    builtin_profiles, FallbackLoader, MemoryLoader, ProfileLoader, ProfileLocation,
    ProfileStore, ProfileSummary,
};
pub use types::*;
