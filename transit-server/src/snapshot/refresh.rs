//! Refresh coordination.
//!
//! A refresh cycle fetches both live feeds for a path, runs the batched
//! reference lookup chain, composes the fused entities and swaps the
//! path's snapshot. Any failure aborts the cycle with the previous
//! snapshot untouched; callers keep serving stale-but-available data.

use std::collections::{BTreeSet, HashMap, HashSet};
use std::sync::Arc;

use chrono::Local;
use tracing::{info, warn};

use crate::domain::{FeedPath, service_day};
use crate::feed::{FeedError, FeedKind, FeedSource};
use crate::fusion::{ComposeContext, Snapshot, compose_entity};
use crate::reference::{ReferenceStore, StoreError};

use super::cache::SnapshotCache;

/// Errors that abort one path's refresh cycle.
#[derive(Debug, thiserror::Error)]
pub enum RefreshError {
    #[error(transparent)]
    Feed(#[from] FeedError),
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// What a call to [`RefreshCoordinator::refresh_path`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshOutcome {
    /// The snapshot was replaced with this many entities.
    Refreshed(usize),
    /// Another refresh held the in-flight flag; nothing was fetched.
    AlreadyInFlight,
}

/// Drives refresh cycles against a feed source and the reference store.
pub struct RefreshCoordinator<F: FeedSource> {
    feeds: F,
    store: Arc<ReferenceStore>,
    cache: Arc<SnapshotCache>,
    duplicate_runs: HashSet<String>,
}

impl<F: FeedSource> RefreshCoordinator<F> {
    pub fn new(feeds: F, store: Arc<ReferenceStore>, cache: Arc<SnapshotCache>) -> Self {
        RefreshCoordinator {
            feeds,
            store,
            cache,
            duplicate_runs: HashSet::new(),
        }
    }

    /// Suppress train vehicles whose run number is in this set
    /// (services duplicated across feeds).
    pub fn with_duplicate_runs(mut self, runs: HashSet<String>) -> Self {
        self.duplicate_runs = runs;
        self
    }

    pub fn cache(&self) -> &Arc<SnapshotCache> {
        &self.cache
    }

    /// Run one refresh cycle for a path.
    ///
    /// The in-flight flag is claimed before any I/O and released on
    /// every exit path; a concurrent call returns `AlreadyInFlight`
    /// without touching the network.
    pub async fn refresh_path(&self, path: &FeedPath) -> Result<RefreshOutcome, RefreshError> {
        let Some(_guard) = self.cache.begin_refresh(path.path()) else {
            return Ok(RefreshOutcome::AlreadyInFlight);
        };

        let (vehicles, trip_updates) = tokio::join!(
            self.feeds.fetch(path, FeedKind::VehiclePositions),
            self.feeds.fetch(path, FeedKind::TripUpdates),
        );
        let vehicles = vehicles?;
        let trip_updates = trip_updates?;

        let working = path.working_name();
        let trip_ids: Vec<String> = vehicles
            .entity
            .iter()
            .filter_map(|e| e.vehicle.as_ref())
            .filter_map(|v| v.trip.as_ref())
            .filter_map(|t| t.trip_id.clone())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        let refs = self.store.lookup_trip_refs(&working, path.mode(), &trip_ids)?;

        let updates_by_trip: HashMap<&str, &crate::feed::proto::TripUpdate> = trip_updates
            .entity
            .iter()
            .filter_map(|e| e.trip_update.as_ref())
            .filter_map(|u| {
                let id = u.trip.as_ref()?.trip_id.as_deref()?;
                Some((id, u))
            })
            .collect();

        let previous = self.cache.previous_positions(path.path());
        let day = service_day(Local::now().date_naive());
        let ctx = ComposeContext {
            path,
            working: &working,
            service_day: &day,
            refs: &refs,
            previous: &previous,
            duplicate_runs: &self.duplicate_runs,
        };

        let entities: Vec<_> = vehicles
            .entity
            .iter()
            .filter_map(|e| e.vehicle.as_ref())
            .filter_map(|v| {
                let update = v
                    .trip
                    .as_ref()
                    .and_then(|t| t.trip_id.as_deref())
                    .and_then(|id| updates_by_trip.get(id))
                    .copied();
                compose_entity(&ctx, v, update)
            })
            .collect();

        let count = entities.len();
        let snapshot = Snapshot {
            header_timestamp: trip_updates.header.as_ref().and_then(|h| h.timestamp),
            entities,
        };
        self.cache.replace(path.path(), snapshot);

        info!(path = path.path(), entities = count, "refreshed feed snapshot");
        Ok(RefreshOutcome::Refreshed(count))
    }

    /// Opportunistic refresh: when the path's snapshot is stale, spawn a
    /// refresh cycle and return immediately. The caller keeps serving
    /// the current snapshot.
    pub fn maybe_refresh(self: &Arc<Self>, path: &FeedPath, now_unix: u64) {
        if !self.cache.is_stale(path.path(), now_unix) {
            return;
        }
        let coordinator = Arc::clone(self);
        let path = path.clone();
        tokio::spawn(async move {
            if let Err(e) = coordinator.refresh_path(&path).await {
                warn!(path = path.path(), error = %e, "feed refresh failed; keeping previous snapshot");
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use crate::domain::Mode;
    use crate::feed::proto;

    /// Scripted feed source: serves fixed messages, counting fetches.
    #[derive(Clone)]
    struct ScriptedFeed {
        vehicles: proto::FeedMessage,
        trip_updates: proto::FeedMessage,
        fetches: Arc<AtomicUsize>,
        delay: Option<Duration>,
        fail: bool,
    }

    impl ScriptedFeed {
        fn new(vehicles: proto::FeedMessage, trip_updates: proto::FeedMessage) -> Self {
            ScriptedFeed {
                vehicles,
                trip_updates,
                fetches: Arc::new(AtomicUsize::new(0)),
                delay: None,
                fail: false,
            }
        }

        fn failing() -> Self {
            let mut feed = Self::new(Default::default(), Default::default());
            feed.fail = true;
            feed
        }
    }

    impl FeedSource for ScriptedFeed {
        async fn fetch(
            &self,
            _path: &FeedPath,
            kind: FeedKind,
        ) -> Result<proto::FeedMessage, FeedError> {
            self.fetches.fetch_add(1, Ordering::SeqCst);
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            if self.fail {
                return Err(FeedError::ApiError {
                    status: 503,
                    message: "upstream down".into(),
                });
            }
            Ok(match kind {
                FeedKind::VehiclePositions => self.vehicles.clone(),
                FeedKind::TripUpdates => self.trip_updates.clone(),
            })
        }
    }

    fn test_path() -> FeedPath {
        FeedPath::new(Mode::Train, "testfeed", 1)
    }

    fn seeded_store() -> Arc<ReferenceStore> {
        let store = ReferenceStore::open_in_memory().unwrap();
        store
            .raw()
            .execute_batch(
                "CREATE TABLE testfeed_trips (
                     trip_id TEXT, route_id TEXT, service_id TEXT,
                     trip_headsign TEXT, direction_id INTEGER, shape_id TEXT,
                     vehicle_category_id TEXT, trip_note TEXT);
                 CREATE TABLE testfeed_routes (
                     route_id TEXT, agency_id TEXT, route_short_name TEXT,
                     route_long_name TEXT, route_desc TEXT, route_color TEXT,
                     route_text_color TEXT, route_type INTEGER);
                 CREATE TABLE testfeed_agency (agency_id TEXT, agency_name TEXT);
                 CREATE TABLE testfeed_stop_times (
                     trip_id TEXT, arrival_time TEXT, departure_time TEXT,
                     stop_id TEXT, stop_sequence INTEGER, stop_headsign TEXT,
                     pickup_type INTEGER, drop_off_type INTEGER, timepoint INTEGER,
                     shape_dist_traveled REAL, stop_note TEXT);
                 INSERT INTO testfeed_trips VALUES
                     ('W123.456', 'R1', 'SVC', 'City via Museum', 0, 'SHP1', NULL, NULL);
                 INSERT INTO testfeed_routes VALUES
                     ('R1', 'AG1', 'T2', 'Inner West Line', NULL, '0897D2', 'FFFFFF', 2);
                 INSERT INTO testfeed_agency VALUES ('AG1', 'Sydney Trains');",
            )
            .unwrap();
        Arc::new(store)
    }

    fn vehicle_feed(trip_id: &str, lat: f32, lng: f32, header_ts: u64) -> proto::FeedMessage {
        proto::FeedMessage {
            header: Some(proto::FeedHeader {
                gtfs_realtime_version: "2.0".into(),
                timestamp: Some(header_ts),
            }),
            entity: vec![proto::FeedEntity {
                id: "1".into(),
                is_deleted: None,
                trip_update: None,
                vehicle: Some(proto::VehiclePosition {
                    trip: Some(proto::TripDescriptor {
                        trip_id: Some(trip_id.to_string()),
                        route_id: Some("R1".into()),
                        schedule_relationship: Some(0),
                        ..Default::default()
                    }),
                    position: Some(proto::Position {
                        latitude: lat,
                        longitude: lng,
                        bearing: None,
                        odometer: None,
                        speed: None,
                    }),
                    timestamp: Some(header_ts),
                    ..Default::default()
                }),
            }],
        }
    }

    fn update_feed(trip_id: &str, header_ts: u64) -> proto::FeedMessage {
        proto::FeedMessage {
            header: Some(proto::FeedHeader {
                gtfs_realtime_version: "2.0".into(),
                timestamp: Some(header_ts),
            }),
            entity: vec![proto::FeedEntity {
                id: "1".into(),
                is_deleted: None,
                trip_update: Some(proto::TripUpdate {
                    trip: Some(proto::TripDescriptor {
                        trip_id: Some(trip_id.to_string()),
                        schedule_relationship: Some(0),
                        ..Default::default()
                    }),
                    timestamp: Some(header_ts),
                    ..Default::default()
                }),
                vehicle: None,
            }],
        }
    }

    fn coordinator(feed: ScriptedFeed) -> Arc<RefreshCoordinator<ScriptedFeed>> {
        let cache = Arc::new(SnapshotCache::new(&[test_path()], None));
        Arc::new(RefreshCoordinator::new(feed, seeded_store(), cache))
    }

    #[tokio::test]
    async fn successful_refresh_replaces_snapshot_atomically() {
        let feed = ScriptedFeed::new(
            vehicle_feed("W123.456", -33.87, 151.21, 1000),
            update_feed("W123.456", 1000),
        );
        let coordinator = coordinator(feed);

        let outcome = coordinator.refresh_path(&test_path()).await.unwrap();
        assert_eq!(outcome, RefreshOutcome::Refreshed(1));

        let snapshot = coordinator.cache().get("testfeed").unwrap();
        // Header timestamp and entity list change together
        assert_eq!(snapshot.header_timestamp, Some(1000));
        assert_eq!(snapshot.entities.len(), 1);
        assert_eq!(
            snapshot.entities[0].trip.head_sign.headline.as_deref(),
            Some("City")
        );
        assert_eq!(snapshot.entities[0].trip.route.color, "#0897D2");
    }

    #[tokio::test]
    async fn failed_fetch_leaves_snapshot_untouched() {
        let good = ScriptedFeed::new(
            vehicle_feed("W123.456", -33.87, 151.21, 1000),
            update_feed("W123.456", 1000),
        );
        let cache = Arc::new(SnapshotCache::new(&[test_path()], None));
        let store = seeded_store();
        let coordinator = RefreshCoordinator::new(good, Arc::clone(&store), Arc::clone(&cache));
        coordinator.refresh_path(&test_path()).await.unwrap();
        let before = cache.get("testfeed").unwrap();

        let failing = RefreshCoordinator::new(ScriptedFeed::failing(), store, Arc::clone(&cache));
        assert!(failing.refresh_path(&test_path()).await.is_err());

        // Previous snapshot still authoritative
        let after = cache.get("testfeed").unwrap();
        assert_eq!(after, before);

        // The in-flight flag was released by the failed cycle
        assert!(cache.begin_refresh("testfeed").is_some());
    }

    #[tokio::test]
    async fn concurrent_refreshes_fetch_once() {
        let mut feed = ScriptedFeed::new(
            vehicle_feed("W123.456", -33.87, 151.21, 1000),
            update_feed("W123.456", 1000),
        );
        feed.delay = Some(Duration::from_millis(20));
        let fetches = Arc::clone(&feed.fetches);
        let coordinator = coordinator(feed);

        let path1 = test_path();
        let path2 = test_path();
        let (a, b) = tokio::join!(
            coordinator.refresh_path(&path1),
            coordinator.refresh_path(&path2),
        );
        let outcomes = [a.unwrap(), b.unwrap()];
        assert!(outcomes.contains(&RefreshOutcome::Refreshed(1)));
        assert!(outcomes.contains(&RefreshOutcome::AlreadyInFlight));

        // One vehicle fetch plus one trip-update fetch, not two of each
        assert_eq!(fetches.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn bearing_carries_across_refreshes_for_stationary_trains() {
        let first = ScriptedFeed::new(
            vehicle_feed("W123.456", 0.0, 0.0, 1000),
            update_feed("W123.456", 1000),
        );
        let cache = Arc::new(SnapshotCache::new(&[test_path()], None));
        let store = seeded_store();
        let coordinator =
            RefreshCoordinator::new(first, Arc::clone(&store), Arc::clone(&cache));
        coordinator.refresh_path(&test_path()).await.unwrap();

        // Second cycle: vehicle moved due east
        let moved = ScriptedFeed::new(
            vehicle_feed("W123.456", 0.0, 1.0, 1010),
            update_feed("W123.456", 1010),
        );
        let coordinator = RefreshCoordinator::new(moved, Arc::clone(&store), Arc::clone(&cache));
        coordinator.refresh_path(&test_path()).await.unwrap();
        let snapshot = cache.get("testfeed").unwrap();
        assert_eq!(snapshot.entities[0].vehicle.last_position.bearing, Some(90.0));

        // Third cycle: same position, bearing must carry over unchanged
        let stationary = ScriptedFeed::new(
            vehicle_feed("W123.456", 0.0, 1.0, 1020),
            update_feed("W123.456", 1020),
        );
        let coordinator = RefreshCoordinator::new(stationary, store, Arc::clone(&cache));
        coordinator.refresh_path(&test_path()).await.unwrap();
        let snapshot = cache.get("testfeed").unwrap();
        assert_eq!(snapshot.entities[0].vehicle.last_position.bearing, Some(90.0));
    }

    #[tokio::test]
    async fn duplicate_runs_are_dropped() {
        let feed = ScriptedFeed::new(
            vehicle_feed("W123.456", -33.87, 151.21, 1000),
            update_feed("W123.456", 1000),
        );
        let cache = Arc::new(SnapshotCache::new(&[test_path()], None));
        let coordinator = RefreshCoordinator::new(feed, seeded_store(), cache)
            .with_duplicate_runs(["W123".to_string()].into());

        let outcome = coordinator.refresh_path(&test_path()).await.unwrap();
        assert_eq!(outcome, RefreshOutcome::Refreshed(0));
    }
}
