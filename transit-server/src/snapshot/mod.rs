//! Snapshot cache and refresh coordination.

mod cache;
mod refresh;

pub use cache::{RefreshGuard, STALE_AFTER_SECS, SnapshotCache};
pub use refresh::{RefreshCoordinator, RefreshError, RefreshOutcome};
