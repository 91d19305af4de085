//! Spatial and identity queries over the snapshot cache.
//!
//! Reads trigger opportunistic refreshes for stale paths but always
//! answer from the current snapshot; a transient feed failure degrades
//! to stale data, never to an empty result.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::Arc;

use chrono::Utc;
use moka::future::Cache as MokaCache;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::domain::{InstanceId, InstanceKind, Mode, nsw_feed_paths, paths_for_mode};
use crate::feed::FeedSource;
use crate::fusion::{FusedEntity, StopRef, TripInstance, VehicleInstance};
use crate::reference::{ReferenceStore, StoreError};
use crate::snapshot::RefreshCoordinator;

use super::bbox::BoundingBox;
use super::stops::{StopRecord, fix_stop_id};

/// Shape polylines are expensive to assemble; cache them for an hour.
const SHAPE_CACHE_TTL: std::time::Duration = std::time::Duration::from_secs(60 * 60);
const SHAPE_CACHE_CAPACITY: u64 = 500;

/// Fallback colors for shapes whose route rows carry none.
const SHAPE_COLOR_FALLBACK: &[(&str, &str)] = &[
    ("3722", "168388"),
    ("9093", "DD1E25"),
    ("9033", "781140"),
    ("5068", "BB2043"),
    ("L10017", "BE1622"),
    ("NLR.OUTBOUND", "EE343F"),
    ("187249", "ED2891"),
    ("168350", "BC1286"),
    ("187248", "6B2D86"),
    ("94342", "FDAE1A"),
];

/// Query-time errors surfaced to the HTTP layer.
#[derive(Debug, thiserror::Error)]
pub enum QueryError {
    #[error("{0}")]
    BadRequest(String),
    #[error("{0}")]
    NotFound(String),
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// List-view entity: the stopping pattern is omitted from grouped
/// results.
#[derive(Debug, Clone, Serialize)]
pub struct VehicleListEntry {
    #[serde(rename = "TripInstance")]
    pub trip: TripInstance,
    #[serde(rename = "VehicleInstance")]
    pub vehicle: VehicleInstance,
}

/// Result of an instance lookup.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum InstanceRecord {
    Vehicle(Box<FusedEntity>),
    Stop(Box<StopRecord>),
}

/// A route shape polyline with display metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShapeRecord {
    pub polyline: Vec<PolyPoint>,
    pub length: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    /// Points per metre of shape, a density hint for the renderer.
    pub ppm: f64,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct PolyPoint {
    pub lat: f64,
    pub lng: f64,
}

/// One route in the static route listing.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteListing {
    pub agency_id: Option<String>,
    pub agency_name: String,
    pub route_id: String,
    pub route_short_name: Option<String>,
    pub route_long_name: Option<String>,
    pub route_desc: Option<String>,
    pub route_color: String,
    pub route_text_color: String,
    pub route_type: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub route_category: Option<String>,
}

/// The query service: spatial and identity lookups over the cache, plus
/// the static route and shape queries.
pub struct QueryService<F: FeedSource> {
    coordinator: Arc<RefreshCoordinator<F>>,
    store: Arc<ReferenceStore>,
    shapes: MokaCache<String, Arc<ShapeRecord>>,
}

impl<F: FeedSource> QueryService<F> {
    pub fn new(coordinator: Arc<RefreshCoordinator<F>>, store: Arc<ReferenceStore>) -> Self {
        QueryService {
            coordinator,
            store,
            shapes: MokaCache::builder()
                .time_to_live(SHAPE_CACHE_TTL)
                .max_capacity(SHAPE_CACHE_CAPACITY)
                .build(),
        }
    }

    /// Live vehicles for the given modes inside a bounding box, grouped
    /// by mode. Entities without coordinates are excluded. Stale paths
    /// refresh in the background; the response is built from the
    /// current snapshots.
    pub fn find_vehicles(
        &self,
        modes: &[Mode],
        bbox: BoundingBox,
    ) -> BTreeMap<&'static str, Vec<VehicleListEntry>> {
        let now = Utc::now().timestamp().max(0) as u64;
        let mut grouped = BTreeMap::new();
        for mode in dedup_modes(modes) {
            let entries = grouped.entry(mode.as_str()).or_insert_with(Vec::new);
            for path in paths_for_mode(mode) {
                self.coordinator.maybe_refresh(path, now);
                let Some(snapshot) = self.coordinator.cache().get(path.path()) else {
                    continue;
                };
                for entity in &snapshot.entities {
                    let Some(coords) = entity.vehicle.last_position.coordinates else {
                        continue;
                    };
                    if bbox.contains(coords.lat, coords.lng) {
                        entries.push(VehicleListEntry {
                            trip: entity.trip.clone(),
                            vehicle: entity.vehicle.clone(),
                        });
                    }
                }
            }
        }
        grouped
    }

    /// Static stops for the given modes inside a bounding box, enriched
    /// with facility data where a record exists.
    pub fn find_stops(
        &self,
        modes: &[Mode],
        bbox: BoundingBox,
    ) -> Result<BTreeMap<&'static str, Vec<StopRecord>>, QueryError> {
        let mut grouped = BTreeMap::new();
        for mode in dedup_modes(modes) {
            let (filter_col, filter_value) = stop_filter(mode);
            let mut rows = Vec::new();
            for path in paths_for_mode(mode) {
                match self.store.stops_in_bbox(
                    &path.working_name(),
                    filter_col,
                    filter_value,
                    bbox.min_lat,
                    bbox.max_lat,
                    bbox.min_lng,
                    bbox.max_lng,
                ) {
                    Ok(stops) => rows.extend(stops),
                    // A feed whose tables aren't imported yet has no
                    // stops to offer; skip it.
                    Err(e) => warn!(path = path.path(), error = %e, "stop lookup failed"),
                }
            }

            let tsns: Vec<String> = rows
                .iter()
                .map(|s| fix_stop_id(&s.stop_id).to_string())
                .collect::<BTreeSet<_>>()
                .into_iter()
                .collect();
            let facilities = self.store.facilities_by_tsn(&tsns).unwrap_or_else(|e| {
                warn!(error = %e, "facility lookup failed");
                HashMap::new()
            });

            let records = rows
                .iter()
                .map(|stop| {
                    let facility = facilities.get(fix_stop_id(&stop.stop_id));
                    StopRecord::build(stop, facility, mode)
                })
                .collect();
            grouped.insert(mode.as_str(), records);
        }
        Ok(grouped)
    }

    /// Resolve an instance id to its live vehicle or static stop.
    pub fn find_instance(&self, raw: &str) -> Result<InstanceRecord, QueryError> {
        let id = InstanceId::parse(raw).map_err(|e| QueryError::BadRequest(e.to_string()))?;
        match id.kind() {
            InstanceKind::Vehicle => self.find_vehicle_instance(raw, id.mode()),
            InstanceKind::Stop => self.find_stop_instance(id.tail(), id.mode()),
        }
    }

    fn find_vehicle_instance(&self, raw: &str, mode: Mode) -> Result<InstanceRecord, QueryError> {
        for path in paths_for_mode(mode) {
            let Some(snapshot) = self.coordinator.cache().get(path.path()) else {
                continue;
            };
            let Some(entity) = snapshot
                .entities
                .iter()
                .find(|e| e.vehicle.instance_id == raw)
            else {
                continue;
            };
            let mut entity = entity.clone();
            self.attach_stop_names(&mut entity);
            return Ok(InstanceRecord::Vehicle(Box::new(entity)));
        }
        Err(QueryError::NotFound(
            "Vehicle instance does not currently exist".to_string(),
        ))
    }

    /// Fill in stop names on a stopping pattern for the detail view.
    fn attach_stop_names(&self, entity: &mut FusedEntity) {
        let Some(timetable) = entity.stopping_pattern.timetable.as_mut() else {
            return;
        };
        let stop_ids: Vec<String> = timetable
            .iter()
            .map(|event| event.stop_id.clone())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        let names = self
            .store
            .stop_names(&entity.trip.path, &stop_ids)
            .unwrap_or_else(|e| {
                warn!(path = entity.trip.path, error = %e, "stop name lookup failed");
                HashMap::new()
            });
        for event in timetable.iter_mut() {
            event.stop = names.get(&event.stop_id).map(|name| StopRef {
                name: name.clone(),
            });
        }
    }

    fn find_stop_instance(&self, stop_id: &str, mode: Mode) -> Result<InstanceRecord, QueryError> {
        let mut found = None;
        for path in paths_for_mode(mode) {
            match self.store.stop_by_id(&path.working_name(), stop_id) {
                Ok(Some(stop)) => {
                    found = Some(stop);
                    break;
                }
                Ok(None) => {}
                Err(e) => warn!(path = path.path(), error = %e, "stop lookup failed"),
            }
        }
        let stop = found.ok_or_else(|| QueryError::NotFound("Stop does not exist".to_string()))?;

        let facility = match self.store.facility_by_tsn(fix_stop_id(&stop.stop_id))? {
            Some(facility) => Some(facility),
            None => match stop.parent_station.as_deref().filter(|p| !p.is_empty()) {
                Some(parent) => self.store.facility_by_tsn(parent)?,
                None => None,
            },
        };
        Ok(InstanceRecord::Stop(Box::new(StopRecord::build(
            &stop,
            facility.as_ref(),
            mode,
        ))))
    }

    /// Shape polylines for the requested `shapeId[;routeId]` pairs,
    /// served from the side cache where possible.
    pub async fn route_shapes(
        &self,
        working: &str,
        routes_param: &str,
        use_cache: bool,
    ) -> Result<HashMap<String, Arc<ShapeRecord>>, QueryError> {
        // The path parameter names reference tables; only configured
        // working names are accepted.
        if !nsw_feed_paths().iter().any(|p| p.working_name() == working) {
            return Err(QueryError::BadRequest(format!("unknown feed path: {working}")));
        }

        let pairs: Vec<(String, String)> = routes_param
            .split(',')
            .filter(|p| !p.is_empty())
            .map(|pair| {
                let mut parts = pair.splitn(2, ';');
                let shape = parts.next().unwrap_or_default().to_string();
                let route = parts.next().map(str::to_string).unwrap_or_else(|| shape.clone());
                (shape, route)
            })
            .collect();

        // The side cache is always consulted; `use_cache` only controls
        // whether newly computed shapes are written back.
        let mut result = HashMap::new();
        let mut missing = Vec::new();
        for (shape, route) in &pairs {
            match self.shapes.get(shape).await {
                Some(record) => {
                    result.insert(shape.clone(), record);
                }
                None => missing.push((shape.clone(), route.clone())),
            }
        }
        if missing.is_empty() {
            return Ok(result);
        }

        let shape_ids: Vec<String> = missing.iter().map(|(s, _)| s.clone()).collect();
        let route_ids: Vec<String> = missing
            .iter()
            .flat_map(|(s, r)| [s.clone(), r.clone()])
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        let points = self.store.shape_points(working, &shape_ids)?;
        let colors = self.store.route_colors(working, &route_ids)?;

        for (shape, route) in missing {
            let Some(rows) = points.get(&shape) else {
                continue;
            };
            let length = rows
                .last()
                .and_then(|r| r.shape_dist_traveled)
                .unwrap_or(0.0);
            // Some feeds carry junk points in the western hemisphere;
            // everything this system serves is east of 120°E.
            let polyline: Vec<PolyPoint> = rows
                .iter()
                .filter(|r| r.shape_pt_lon > 120.0)
                .map(|r| PolyPoint {
                    lat: r.shape_pt_lat,
                    lng: r.shape_pt_lon,
                })
                .collect();
            let color = colors
                .get(&shape)
                .or_else(|| colors.get(&route))
                .cloned()
                .or_else(|| {
                    SHAPE_COLOR_FALLBACK
                        .iter()
                        .find(|(id, _)| *id == shape)
                        .map(|(_, c)| (*c).to_string())
                });
            let divisor = if length > 0.0 { length } else { 20_000.0 };
            let record = Arc::new(ShapeRecord {
                ppm: polyline.len() as f64 / divisor,
                polyline,
                length,
                color,
            });
            if use_cache {
                self.shapes.insert(shape.clone(), Arc::clone(&record)).await;
            }
            result.insert(shape, record);
        }
        Ok(result)
    }

    /// All static routes grouped by mode. Regional rail routes get
    /// their long name replaced by the trip-level direction label.
    pub fn list_routes(&self) -> BTreeMap<&'static str, Vec<RouteListing>> {
        let mut grouped: BTreeMap<&'static str, Vec<RouteListing>> = BTreeMap::new();
        for path in nsw_feed_paths() {
            let working = path.working_name();
            let routes = match self.store.all_routes(&working) {
                Ok(routes) => routes,
                Err(e) => {
                    warn!(path = path.path(), error = %e, "route listing failed");
                    continue;
                }
            };
            let agencies: HashMap<String, String> = self
                .store
                .all_agencies(&working)
                .unwrap_or_default()
                .into_iter()
                .filter_map(|a| a.agency_name.map(|n| (a.agency_id, n)))
                .collect();

            let directions = if path.mode() == Mode::TrainLink {
                let route_ids: Vec<String> =
                    routes.iter().map(|r| r.route_id.clone()).collect();
                self.store
                    .route_directions(&working, &route_ids)
                    .unwrap_or_else(|e| {
                        warn!(path = path.path(), error = %e, "route direction lookup failed");
                        HashMap::new()
                    })
            } else {
                HashMap::new()
            };

            let listings = grouped.entry(path.mode().as_str()).or_default();
            for route in routes {
                let agency_name = route
                    .agency_id
                    .as_ref()
                    .and_then(|id| agencies.get(id).cloned())
                    .unwrap_or_else(|| "unknown".to_string());
                let mut listing = RouteListing {
                    agency_id: route.agency_id,
                    agency_name,
                    route_id: route.route_id.clone(),
                    route_short_name: route.route_short_name,
                    route_long_name: route.route_long_name,
                    route_desc: route.route_desc,
                    route_color: format!(
                        "#{}",
                        route.route_color.as_deref().unwrap_or("000000")
                    ),
                    route_text_color: format!(
                        "#{}",
                        route.route_text_color.as_deref().unwrap_or("FFFFFF")
                    ),
                    route_type: route.route_type,
                    route_category: None,
                };
                if let Some(direction) = directions.get(&route.route_id) {
                    listing.route_category = listing.route_long_name.take();
                    listing.route_long_name = Some(direction.clone());
                }
                listings.push(listing);
            }
        }
        grouped
    }
}

fn dedup_modes(modes: &[Mode]) -> Vec<Mode> {
    let mut seen = BTreeSet::new();
    modes.iter().copied().filter(|m| seen.insert(*m)).collect()
}

/// The station filter column and value for a mode's stops query.
fn stop_filter(mode: Mode) -> (&'static str, &'static str) {
    match mode {
        Mode::Train | Mode::TrainLink | Mode::Metro => ("location_type", "1"),
        Mode::Bus | Mode::Ferry => ("parent_station", ""),
        Mode::LightRail => ("location_type", "0"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::FeedPath;
    use crate::feed::{FeedError, FeedKind, proto};
    use crate::fusion::{Coordinates, LastPosition, Snapshot};
    use crate::snapshot::SnapshotCache;

    /// Feed source that always fails; queries must still serve the
    /// cached snapshots.
    struct DeadFeed;

    impl FeedSource for DeadFeed {
        async fn fetch(
            &self,
            _path: &FeedPath,
            _kind: FeedKind,
        ) -> Result<proto::FeedMessage, FeedError> {
            Err(FeedError::ApiError {
                status: 503,
                message: "down".into(),
            })
        }
    }

    fn service() -> QueryService<DeadFeed> {
        let store = Arc::new(ReferenceStore::open_in_memory().unwrap());
        let cache = Arc::new(SnapshotCache::new(nsw_feed_paths(), None));
        let coordinator = Arc::new(RefreshCoordinator::new(DeadFeed, Arc::clone(&store), cache));
        QueryService::new(coordinator, store)
    }

    fn entity(instance_id: &str, lat: f64, lng: f64) -> FusedEntity {
        use crate::domain::Headsign;
        use crate::fusion::{
            RouteDescriptor, StoppingPattern, TriState, TripInstance, VehicleInstance,
            VehicleModel,
        };
        FusedEntity {
            trip: TripInstance {
                id: "W123.456".into(),
                path: "sydneytrains".into(),
                run_number: None,
                schedule_relationship: None,
                head_sign: Headsign::headline("City"),
                service_deviation: None,
                service_id: None,
                direction_bound: None,
                scheduled_set: None,
                shape_id: None,
                note: None,
                route: RouteDescriptor::default(),
                time: None,
            },
            vehicle: VehicleInstance {
                id: None,
                trip_id: "W123.456".into(),
                mode: Mode::Train,
                last_position: LastPosition {
                    coordinates: Some(Coordinates { lat, lng }),
                    ..Default::default()
                },
                instance_id: instance_id.into(),
                status: None,
                special_attributes: vec![],
                model: VehicleModel::Label("unknown".into()),
                aircon: TriState::Unknown,
                wheelchair: TriState::Unknown,
                occupancy: None,
                consist: vec![],
            },
            stopping_pattern: StoppingPattern::default(),
        }
    }

    fn fresh_snapshot(entities: Vec<FusedEntity>) -> Snapshot {
        Snapshot {
            header_timestamp: Some(Utc::now().timestamp().max(0) as u64),
            entities,
        }
    }

    #[tokio::test]
    async fn vehicles_filter_by_bbox_and_group_by_mode() {
        let service = service();
        service.coordinator.cache().replace(
            "sydneytrains",
            fresh_snapshot(vec![
                entity("vehicle/train/7826/W123", -34.0, 151.0),
                entity("vehicle/train/7826/W999", -20.0, 151.0),
            ]),
        );

        let bbox = BoundingBox::from_query(Some(-35.0), Some(-33.0), None, None);
        let grouped = service.find_vehicles(&[Mode::Train, Mode::Train], bbox);
        assert_eq!(grouped["train"].len(), 1);
        assert_eq!(
            grouped["train"][0].vehicle.instance_id,
            "vehicle/train/7826/W123"
        );

        let excluded = BoundingBox::from_query(Some(-33.0), None, None, None);
        let grouped = service.find_vehicles(&[Mode::Train], excluded);
        assert!(grouped["train"].is_empty());
    }

    #[tokio::test]
    async fn vehicles_without_coordinates_are_excluded() {
        let service = service();
        let mut bare = entity("vehicle/train/7826/W123", 0.0, 0.0);
        bare.vehicle.last_position.coordinates = None;
        service
            .coordinator
            .cache()
            .replace("sydneytrains", fresh_snapshot(vec![bare]));

        let grouped = service.find_vehicles(&[Mode::Train], BoundingBox::default());
        assert!(grouped["train"].is_empty());
    }

    #[tokio::test]
    async fn instance_lookup_finds_exact_match() {
        let service = service();
        service.coordinator.cache().replace(
            "sydneytrains",
            fresh_snapshot(vec![entity("vehicle/train/7826/W123", -34.0, 151.0)]),
        );

        let record = service.find_instance("vehicle/train/7826/W123").unwrap();
        assert!(matches!(record, InstanceRecord::Vehicle(_)));

        let missing = service.find_instance("vehicle/train/7826/W999");
        assert!(matches!(missing, Err(QueryError::NotFound(_))));
    }

    #[tokio::test]
    async fn malformed_instance_ids_are_bad_requests() {
        let service = service();
        assert!(matches!(
            service.find_instance("garbage"),
            Err(QueryError::BadRequest(_))
        ));
        assert!(matches!(
            service.find_instance("vehicle/spaceship/1/2"),
            Err(QueryError::BadRequest(_))
        ));
    }

    #[tokio::test]
    async fn unknown_shape_path_is_a_bad_request() {
        let service = service();
        let result = service.route_shapes("nosuchpath", "SHP1", true).await;
        assert!(matches!(result, Err(QueryError::BadRequest(_))));
    }

    #[test]
    fn stop_filters_per_mode() {
        assert_eq!(stop_filter(Mode::Train), ("location_type", "1"));
        assert_eq!(stop_filter(Mode::Metro), ("location_type", "1"));
        assert_eq!(stop_filter(Mode::Bus), ("parent_station", ""));
        assert_eq!(stop_filter(Mode::LightRail), ("location_type", "0"));
    }

    #[test]
    fn mode_dedup_preserves_order() {
        assert_eq!(
            dedup_modes(&[Mode::Bus, Mode::Train, Mode::Bus]),
            vec![Mode::Bus, Mode::Train]
        );
    }
}
