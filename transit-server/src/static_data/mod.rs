//! Static schedule data boundary.
//!
//! The schedule import pipeline (download, unpack, bulk-load into the
//! reference tables) runs behind the [`ScheduleImporter`] trait; this
//! module owns its scheduling and the readiness gate. While any path's
//! import is pending, the whole API answers 503 so clients never see a
//! half-loaded schedule.

use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use tracing::{info, warn};

use crate::domain::FeedPath;

/// How often the background task re-checks the schedule data.
pub const STATIC_REFRESH_INTERVAL: Duration = Duration::from_secs(600);

/// Minimum time between import attempts for one path.
pub const MIN_REIMPORT_INTERVAL: Duration = Duration::from_secs(600);

/// Error from a schedule import attempt.
#[derive(Debug, thiserror::Error)]
#[error("schedule import failed: {0}")]
pub struct ImportError(pub String);

/// What one import attempt did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImportOutcome {
    /// Upstream archive unchanged; nothing loaded.
    Unchanged,
    /// Tables were reloaded from a new archive.
    Imported,
}

/// The schedule import pipeline, seen from this side of the boundary.
pub trait ScheduleImporter: Send + Sync + 'static {
    fn refresh(
        &self,
        path: &FeedPath,
    ) -> impl std::future::Future<Output = Result<ImportOutcome, ImportError>> + Send;
}

/// An externally maintained schedule database: the tables are loaded by
/// an out-of-process pipeline, so every refresh reports `Unchanged`.
#[derive(Debug, Clone, Copy, Default)]
pub struct PreloadedSchedule;

impl ScheduleImporter for PreloadedSchedule {
    async fn refresh(&self, _path: &FeedPath) -> Result<ImportOutcome, ImportError> {
        Ok(ImportOutcome::Unchanged)
    }
}

/// Per-path pending flags plus last-attempt times for the import
/// pipeline. Pending flags feed the global readiness gate.
pub struct StaticDataGate {
    pending: HashMap<String, AtomicBool>,
    last_attempt: Mutex<HashMap<String, Instant>>,
}

impl StaticDataGate {
    pub fn new(paths: &[FeedPath]) -> Self {
        StaticDataGate {
            pending: paths
                .iter()
                .map(|p| (p.path().to_string(), AtomicBool::new(false)))
                .collect(),
            last_attempt: Mutex::new(HashMap::new()),
        }
    }

    /// True while any path's import is running; the API gates on this.
    pub fn any_pending(&self) -> bool {
        self.pending.values().any(|p| p.load(Ordering::Acquire))
    }

    pub fn is_pending(&self, path: &str) -> bool {
        self.pending
            .get(path)
            .is_some_and(|p| p.load(Ordering::Acquire))
    }

    /// Claim a path for import. Returns false when an import is already
    /// running or the path was attempted too recently.
    fn claim(&self, path: &str) -> bool {
        let Some(flag) = self.pending.get(path) else {
            return false;
        };
        {
            let last = self.last_attempt.lock().unwrap_or_else(|e| e.into_inner());
            if last
                .get(path)
                .is_some_and(|at| at.elapsed() < MIN_REIMPORT_INTERVAL)
            {
                return false;
            }
        }
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    fn release(&self, path: &str) {
        if let Some(flag) = self.pending.get(path) {
            flag.store(false, Ordering::Release);
        }
        self.last_attempt
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(path.to_string(), Instant::now());
    }
}

/// Run one import pass over every path, gated per path.
pub async fn import_cycle<I: ScheduleImporter>(
    gate: &StaticDataGate,
    importer: &I,
    paths: &[FeedPath],
) {
    for path in paths {
        if !gate.claim(path.path()) {
            continue;
        }
        let result = importer.refresh(path).await;
        gate.release(path.path());
        match result {
            Ok(ImportOutcome::Imported) => {
                info!(path = path.path(), "schedule tables reloaded");
            }
            Ok(ImportOutcome::Unchanged) => {}
            Err(e) => {
                warn!(path = path.path(), error = %e, "schedule import failed");
            }
        }
    }
}
