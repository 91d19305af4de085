//! Per-path snapshot cache.
//!
//! One snapshot per feed path, replaced wholesale after a successful
//! refresh: readers hold an `Arc` to the previous snapshot and never see
//! a partially-updated entity list. A per-path atomic flag keeps at most
//! one refresh in flight; the claim happens before any I/O and the flag
//! clears on every exit path via a drop guard.
//!
//! The full multi-path cache persists to a JSON file after each
//! successful refresh so a restarted process serves data without
//! waiting a feed cycle. The file is best-effort: corruption or absence
//! means an empty cache, never a startup failure.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use tracing::{debug, warn};

use crate::domain::FeedPath;
use crate::fusion::{LastPosition, Snapshot};

/// Snapshot age beyond which a read triggers a refresh.
pub const STALE_AFTER_SECS: u64 = 15;

/// Clears the in-flight flag when the refresh ends, however it ends.
pub struct RefreshGuard<'a> {
    flag: &'a AtomicBool,
}

impl Drop for RefreshGuard<'_> {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::Release);
    }
}

/// The process-scoped snapshot cache.
pub struct SnapshotCache {
    snapshots: RwLock<HashMap<String, Arc<Snapshot>>>,
    /// In-flight refresh flags, one per configured path. Fixed at
    /// construction so claiming needs no write lock.
    in_flight: HashMap<String, AtomicBool>,
    persist_path: Option<PathBuf>,
}

impl SnapshotCache {
    /// Create an empty cache for the given feed paths.
    pub fn new(paths: &[FeedPath], persist_path: Option<PathBuf>) -> Self {
        let in_flight = paths
            .iter()
            .map(|p| (p.path().to_string(), AtomicBool::new(false)))
            .collect();
        SnapshotCache {
            snapshots: RwLock::new(HashMap::new()),
            in_flight,
            persist_path,
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, HashMap<String, Arc<Snapshot>>> {
        self.snapshots.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<String, Arc<Snapshot>>> {
        self.snapshots.write().unwrap_or_else(|e| e.into_inner())
    }

    /// Load the persisted cache from disk, if present and readable.
    pub fn load_persisted(&self) {
        let Some(path) = &self.persist_path else {
            return;
        };
        let contents = match std::fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(e) => {
                debug!(path = %path.display(), error = %e, "no persisted snapshot cache");
                return;
            }
        };
        match serde_json::from_str::<HashMap<String, Snapshot>>(&contents) {
            Ok(loaded) => {
                let count = loaded.len();
                let mut snapshots = self.write();
                for (key, snapshot) in loaded {
                    snapshots.insert(key, Arc::new(snapshot));
                }
                debug!(paths = count, "restored persisted snapshot cache");
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "ignoring corrupt snapshot cache");
            }
        }
    }

    /// The current snapshot for a path.
    pub fn get(&self, path: &str) -> Option<Arc<Snapshot>> {
        self.read().get(path).cloned()
    }

    /// Whether a path's snapshot is missing or older than the staleness
    /// threshold at the given time.
    pub fn is_stale(&self, path: &str, now_unix: u64) -> bool {
        match self.get(path).and_then(|s| s.header_timestamp) {
            Some(ts) => now_unix.saturating_sub(ts) > STALE_AFTER_SECS,
            None => true,
        }
    }

    /// Claim the in-flight flag for a path. Returns `None` when a
    /// refresh is already running (or the path is unknown); the flag
    /// clears when the returned guard drops.
    pub fn begin_refresh(&self, path: &str) -> Option<RefreshGuard<'_>> {
        let flag = self.in_flight.get(path)?;
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()?;
        Some(RefreshGuard { flag })
    }

    /// Replace a path's snapshot and persist the whole cache.
    pub fn replace(&self, path: &str, snapshot: Snapshot) {
        self.write().insert(path.to_string(), Arc::new(snapshot));
        self.persist();
    }

    /// Last positions from a path's current snapshot, keyed by instance
    /// id (for bearing continuity in the next compose pass).
    pub fn previous_positions(&self, path: &str) -> HashMap<String, LastPosition> {
        match self.get(path) {
            Some(snapshot) => snapshot
                .entities
                .iter()
                .map(|e| (e.vehicle.instance_id.clone(), e.vehicle.last_position.clone()))
                .collect(),
            None => HashMap::new(),
        }
    }

    /// Write the whole cache to disk. Failures are logged, never
    /// propagated; the in-memory cache stays authoritative.
    fn persist(&self) {
        let Some(path) = &self.persist_path else {
            return;
        };
        let serialized = {
            let snapshots = self.read();
            let view: HashMap<&String, &Snapshot> =
                snapshots.iter().map(|(k, v)| (k, v.as_ref())).collect();
            serde_json::to_string(&view)
        };
        let result = serialized.map_err(std::io::Error::other).and_then(|json| {
            if let Some(parent) = path.parent()
                && !parent.as_os_str().is_empty()
            {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::write(path, json)
        });
        if let Err(e) = result {
            warn!(path = %path.display(), error = %e, "failed to persist snapshot cache");
        }
    }
}
