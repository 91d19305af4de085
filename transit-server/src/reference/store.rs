//! SQLite reference store client.
//!
//! All lookups are either single-key or batched set-membership queries.
//! The per-refresh lookup chain (trips → routes → agencies → stop-times)
//! feeds each stage with the deduplicated output of the previous one, so
//! the query count is bounded per table per refresh regardless of how
//! many vehicles the feed carries. The store counts issued statements so
//! that bound is testable.

use std::collections::{BTreeSet, HashMap};
use std::path::Path;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};

use rusqlite::{Connection, OptionalExtension, Row, params_from_iter};

use crate::domain::Mode;

use super::rows::{
    AgencyRow, FacilityRow, NoteRow, RouteRow, ShapePointRow, StopRow, StopTimeRow, TripRow,
    VehicleCategoryRow,
};

/// Largest `IN (…)` set sent in one statement; larger key sets are
/// chunked to stay under the SQLite bound-variable limit.
const MAX_BATCH: usize = 900;

/// Errors from the reference store.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("reference store error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

/// Everything the fusion stage needs from the reference tables for one
/// refresh cycle, fetched through the batched lookup chain.
#[derive(Debug, Default)]
pub struct ReferenceBundle {
    pub trips: HashMap<String, TripRow>,
    pub routes: HashMap<String, RouteRow>,
    pub agencies: HashMap<String, AgencyRow>,
    /// Stop-time rows grouped by trip id, in stop-sequence order.
    pub stop_times: HashMap<String, Vec<StopTimeRow>>,
    pub categories: HashMap<String, VehicleCategoryRow>,
    pub notes: HashMap<String, NoteRow>,
}

/// Read-only client for the schedule tables.
pub struct ReferenceStore {
    conn: Mutex<Connection>,
    statements: AtomicU64,
}

impl ReferenceStore {
    /// Open the store at the given database path.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        Ok(Self::from_connection(Connection::open(path)?))
    }

    /// Open an in-memory store (tests and local development).
    pub fn open_in_memory() -> Result<Self, StoreError> {
        Ok(Self::from_connection(Connection::open_in_memory()?))
    }

    fn from_connection(conn: Connection) -> Self {
        ReferenceStore {
            conn: Mutex::new(conn),
            statements: AtomicU64::new(0),
        }
    }

    /// Number of row-fetching statements issued since startup.
    pub fn statements_issued(&self) -> u64 {
        self.statements.load(Ordering::Relaxed)
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Direct connection access for seeding test fixtures.
    #[cfg(test)]
    pub(crate) fn raw(&self) -> std::sync::MutexGuard<'_, Connection> {
        self.lock()
    }

    /// Whether a table exists; feeds differ in which optional tables
    /// their schedule archive ships.
    pub fn table_exists(&self, name: &str) -> Result<bool, StoreError> {
        let conn = self.lock();
        let mut stmt = conn
            .prepare_cached("SELECT name FROM sqlite_master WHERE type = 'table' AND name = ?1")?;
        Ok(stmt.query_row([name], |_| Ok(())).optional()?.is_some())
    }

    /// Batched set-membership query. An empty key set issues no query.
    fn batch<T>(
        &self,
        table: &str,
        key_col: &str,
        keys: &[String],
        order_by: Option<&str>,
        map: fn(&Row<'_>) -> rusqlite::Result<T>,
    ) -> Result<Vec<T>, StoreError> {
        if keys.is_empty() {
            return Ok(Vec::new());
        }
        let conn = self.lock();
        let mut out = Vec::new();
        for chunk in keys.chunks(MAX_BATCH) {
            let placeholders = vec!["?"; chunk.len()].join(",");
            let order = order_by.map(|c| format!(" ORDER BY {c}")).unwrap_or_default();
            let sql =
                format!("SELECT * FROM {table} WHERE {key_col} IN ({placeholders}){order}");
            let mut stmt = conn.prepare(&sql)?;
            self.statements.fetch_add(1, Ordering::Relaxed);
            let rows = stmt.query_map(params_from_iter(chunk.iter()), map)?;
            for row in rows {
                out.push(row?);
            }
        }
        Ok(out)
    }

    fn single<T>(
        &self,
        table: &str,
        key_col: &str,
        key: &str,
        map: fn(&Row<'_>) -> rusqlite::Result<T>,
    ) -> Result<Option<T>, StoreError> {
        let conn = self.lock();
        let sql = format!("SELECT * FROM {table} WHERE {key_col} = ?1");
        let mut stmt = conn.prepare_cached(&sql)?;
        self.statements.fetch_add(1, Ordering::Relaxed);
        Ok(stmt.query_row([key], map).optional()?)
    }

    pub fn trips_by_id(
        &self,
        working: &str,
        ids: &[String],
    ) -> Result<HashMap<String, TripRow>, StoreError> {
        let rows = self.batch(&format!("{working}_trips"), "trip_id", ids, None, |r| {
            TripRow::from_row(r)
        })?;
        Ok(rows.into_iter().map(|t| (t.trip_id.clone(), t)).collect())
    }

    pub fn routes_by_id(
        &self,
        working: &str,
        ids: &[String],
    ) -> Result<HashMap<String, RouteRow>, StoreError> {
        let rows = self.batch(&format!("{working}_routes"), "route_id", ids, None, |r| {
            RouteRow::from_row(r)
        })?;
        Ok(rows.into_iter().map(|t| (t.route_id.clone(), t)).collect())
    }

    pub fn agencies_by_id(
        &self,
        working: &str,
        ids: &[String],
    ) -> Result<HashMap<String, AgencyRow>, StoreError> {
        let rows = self.batch(&format!("{working}_agency"), "agency_id", ids, None, |r| {
            AgencyRow::from_row(r)
        })?;
        Ok(rows.into_iter().map(|t| (t.agency_id.clone(), t)).collect())
    }

    /// Stop-time rows for the given trips, grouped per trip in
    /// stop-sequence order.
    pub fn stop_times_by_trip(
        &self,
        working: &str,
        trip_ids: &[String],
    ) -> Result<HashMap<String, Vec<StopTimeRow>>, StoreError> {
        let rows = self.batch(
            &format!("{working}_stop_times"),
            "trip_id",
            trip_ids,
            Some("trip_id, stop_sequence"),
            |r| StopTimeRow::from_row(r),
        )?;
        let mut grouped: HashMap<String, Vec<StopTimeRow>> = HashMap::new();
        for row in rows {
            grouped.entry(row.trip_id.clone()).or_default().push(row);
        }
        Ok(grouped)
    }

    pub fn vehicle_categories_by_id(
        &self,
        working: &str,
        ids: &[String],
    ) -> Result<HashMap<String, VehicleCategoryRow>, StoreError> {
        let table = format!("{working}_vehicle_categories");
        if ids.is_empty() || !self.table_exists(&table)? {
            return Ok(HashMap::new());
        }
        let rows = self.batch(&table, "vehicle_category_id", ids, None, |r| {
            VehicleCategoryRow::from_row(r)
        })?;
        Ok(rows
            .into_iter()
            .map(|t| (t.vehicle_category_id.clone(), t))
            .collect())
    }

    pub fn notes_by_id(
        &self,
        working: &str,
        ids: &[String],
    ) -> Result<HashMap<String, NoteRow>, StoreError> {
        let table = format!("{working}_notes");
        if ids.is_empty() || !self.table_exists(&table)? {
            return Ok(HashMap::new());
        }
        let rows = self.batch(&table, "note_id", ids, None, |r| NoteRow::from_row(r))?;
        Ok(rows.into_iter().map(|t| (t.note_id.clone(), t)).collect())
    }

    /// Run the per-refresh lookup chain for a batch of trip ids.
    ///
    /// Each stage's key set is the deduplicated output of the previous
    /// stage, so every table is queried at most once (per `MAX_BATCH`
    /// chunk) regardless of vehicle count.
    pub fn lookup_trip_refs(
        &self,
        working: &str,
        mode: Mode,
        trip_ids: &[String],
    ) -> Result<ReferenceBundle, StoreError> {
        let trips = self.trips_by_id(working, trip_ids)?;

        let route_ids: Vec<String> = trips
            .values()
            .filter_map(|t| t.route_id.clone())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        let routes = self.routes_by_id(working, &route_ids)?;

        let agency_ids: Vec<String> = routes
            .values()
            .filter_map(|r| r.agency_id.clone())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        let agencies = self.agencies_by_id(working, &agency_ids)?;

        let stop_times = self.stop_times_by_trip(working, trip_ids)?;

        let categories = if mode.has_vehicle_categories() {
            let category_ids: Vec<String> = trips
                .values()
                .filter_map(|t| t.vehicle_category_id.clone())
                .collect::<BTreeSet<_>>()
                .into_iter()
                .collect();
            self.vehicle_categories_by_id(working, &category_ids)?
        } else {
            HashMap::new()
        };

        let note_ids: Vec<String> = trips
            .values()
            .filter_map(|t| t.trip_note.clone())
            .filter(|n| !n.is_empty())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        let notes = self.notes_by_id(working, &note_ids)?;

        Ok(ReferenceBundle {
            trips,
            routes,
            agencies,
            stop_times,
            categories,
            notes,
        })
    }

    /// Stops inside a bounding box matching a mode-specific station
    /// filter column.
    pub fn stops_in_bbox(
        &self,
        working: &str,
        filter_col: &str,
        filter_value: &str,
        min_lat: f64,
        max_lat: f64,
        min_lng: f64,
        max_lng: f64,
    ) -> Result<Vec<StopRow>, StoreError> {
        let conn = self.lock();
        let sql = format!(
            "SELECT * FROM {working}_stops WHERE {filter_col} = ?1 \
             AND stop_lat BETWEEN ?2 AND ?3 AND stop_lon BETWEEN ?4 AND ?5"
        );
        let mut stmt = conn.prepare_cached(&sql)?;
        self.statements.fetch_add(1, Ordering::Relaxed);
        let rows = stmt.query_map(
            rusqlite::params![filter_value, min_lat, max_lat, min_lng, max_lng],
            |r| StopRow::from_row(r),
        )?;
        rows.collect::<rusqlite::Result<Vec<_>>>().map_err(Into::into)
    }

    pub fn stop_by_id(&self, working: &str, stop_id: &str) -> Result<Option<StopRow>, StoreError> {
        self.single(&format!("{working}_stops"), "stop_id", stop_id, |r| {
            StopRow::from_row(r)
        })
    }

    /// Stop names for enriching a stopping pattern.
    pub fn stop_names(
        &self,
        working: &str,
        stop_ids: &[String],
    ) -> Result<HashMap<String, String>, StoreError> {
        let rows = self.batch(&format!("{working}_stops"), "stop_id", stop_ids, None, |r| {
            StopRow::from_row(r)
        })?;
        Ok(rows
            .into_iter()
            .filter_map(|s| s.stop_name.clone().map(|n| (s.stop_id, n)))
            .collect())
    }

    pub fn facility_by_tsn(&self, tsn: &str) -> Result<Option<FacilityRow>, StoreError> {
        if !self.table_exists("location_facilities")? {
            return Ok(None);
        }
        self.single("location_facilities", "TSN", tsn, |r| FacilityRow::from_row(r))
    }

    pub fn facilities_by_tsn(
        &self,
        tsns: &[String],
    ) -> Result<HashMap<String, FacilityRow>, StoreError> {
        if !self.table_exists("location_facilities")? {
            return Ok(HashMap::new());
        }
        let rows = self.batch("location_facilities", "TSN", tsns, None, |r| {
            FacilityRow::from_row(r)
        })?;
        Ok(rows.into_iter().map(|f| (f.tsn.clone(), f)).collect())
    }

    pub fn all_routes(&self, working: &str) -> Result<Vec<RouteRow>, StoreError> {
        let conn = self.lock();
        let sql = format!("SELECT * FROM {working}_routes");
        let mut stmt = conn.prepare_cached(&sql)?;
        self.statements.fetch_add(1, Ordering::Relaxed);
        let rows = stmt.query_map([], |r| RouteRow::from_row(r))?;
        rows.collect::<rusqlite::Result<Vec<_>>>().map_err(Into::into)
    }

    pub fn all_agencies(&self, working: &str) -> Result<Vec<AgencyRow>, StoreError> {
        let conn = self.lock();
        let sql = format!("SELECT * FROM {working}_agency");
        let mut stmt = conn.prepare_cached(&sql)?;
        self.statements.fetch_add(1, Ordering::Relaxed);
        let rows = stmt.query_map([], |r| AgencyRow::from_row(r))?;
        rows.collect::<rusqlite::Result<Vec<_>>>().map_err(Into::into)
    }

    /// Route directions from the trips table (regional rail route
    /// listings replace the long name with these).
    pub fn route_directions(
        &self,
        working: &str,
        route_ids: &[String],
    ) -> Result<HashMap<String, String>, StoreError> {
        if route_ids.is_empty() {
            return Ok(HashMap::new());
        }
        let conn = self.lock();
        let mut out = HashMap::new();
        for chunk in route_ids.chunks(MAX_BATCH) {
            let placeholders = vec!["?"; chunk.len()].join(",");
            let sql = format!(
                "SELECT route_id, route_direction FROM {working}_trips \
                 WHERE route_id IN ({placeholders})"
            );
            let mut stmt = conn.prepare(&sql)?;
            self.statements.fetch_add(1, Ordering::Relaxed);
            let rows = stmt.query_map(params_from_iter(chunk.iter()), |r| {
                Ok((
                    r.get::<_, String>("route_id")?,
                    r.get::<_, Option<String>>("route_direction")?,
                ))
            })?;
            for row in rows {
                let (route_id, direction) = row?;
                if let Some(direction) = direction {
                    out.entry(route_id).or_insert(direction);
                }
            }
        }
        Ok(out)
    }

    /// Shape polyline points grouped by shape id, in sequence order.
    pub fn shape_points(
        &self,
        working: &str,
        shape_ids: &[String],
    ) -> Result<HashMap<String, Vec<ShapePointRow>>, StoreError> {
        let rows = self.batch(
            &format!("{working}_shapes"),
            "shape_id",
            shape_ids,
            Some("shape_id, shape_pt_sequence"),
            |r| ShapePointRow::from_row(r),
        )?;
        let mut grouped: HashMap<String, Vec<ShapePointRow>> = HashMap::new();
        for row in rows {
            grouped.entry(row.shape_id.clone()).or_default().push(row);
        }
        Ok(grouped)
    }

    /// Route colors for shape rendering.
    pub fn route_colors(
        &self,
        working: &str,
        route_ids: &[String],
    ) -> Result<HashMap<String, String>, StoreError> {
        let rows = self.batch(&format!("{working}_routes"), "route_id", route_ids, None, |r| {
            RouteRow::from_row(r)
        })?;
        Ok(rows
            .into_iter()
            .filter_map(|r| r.route_color.clone().map(|c| (r.route_id, c)))
            .collect())
    }
}
