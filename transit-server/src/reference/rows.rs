//! Reference row types read from the schedule tables.
//!
//! Columns vary slightly between feeds (only the heavy-rail feeds carry
//! vehicle categories and notes), so optional columns are read
//! leniently: a missing column degrades to `None` rather than failing
//! the whole lookup.

use rusqlite::Row;
use rusqlite::types::FromSql;
use serde::{Deserialize, Serialize};

/// Read an optional column by name, tolerating its absence.
fn opt<T: FromSql>(row: &Row<'_>, name: &str) -> Option<T> {
    row.get::<_, Option<T>>(name).ok().flatten()
}

/// A row from `{path}_trips`.
#[derive(Debug, Clone, PartialEq)]
pub struct TripRow {
    pub trip_id: String,
    pub route_id: Option<String>,
    pub service_id: Option<String>,
    pub trip_headsign: Option<String>,
    pub direction_id: Option<i64>,
    pub shape_id: Option<String>,
    pub vehicle_category_id: Option<String>,
    pub trip_note: Option<String>,
}

impl TripRow {
    pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(TripRow {
            trip_id: row.get("trip_id")?,
            route_id: opt(row, "route_id"),
            service_id: opt(row, "service_id"),
            trip_headsign: opt(row, "trip_headsign"),
            direction_id: opt(row, "direction_id"),
            shape_id: opt(row, "shape_id"),
            vehicle_category_id: opt(row, "vehicle_category_id"),
            trip_note: opt(row, "trip_note"),
        })
    }
}

/// A row from `{path}_routes`.
#[derive(Debug, Clone, PartialEq)]
pub struct RouteRow {
    pub route_id: String,
    pub agency_id: Option<String>,
    pub route_short_name: Option<String>,
    pub route_long_name: Option<String>,
    pub route_desc: Option<String>,
    pub route_color: Option<String>,
    pub route_text_color: Option<String>,
    pub route_type: Option<i64>,
}

impl RouteRow {
    pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(RouteRow {
            route_id: row.get("route_id")?,
            agency_id: opt(row, "agency_id"),
            route_short_name: opt(row, "route_short_name"),
            route_long_name: opt(row, "route_long_name"),
            route_desc: opt(row, "route_desc"),
            route_color: opt(row, "route_color"),
            route_text_color: opt(row, "route_text_color"),
            route_type: opt(row, "route_type"),
        })
    }
}

/// A row from `{path}_agency`.
#[derive(Debug, Clone, PartialEq)]
pub struct AgencyRow {
    pub agency_id: String,
    pub agency_name: Option<String>,
}

impl AgencyRow {
    pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(AgencyRow {
            agency_id: row.get("agency_id")?,
            agency_name: opt(row, "agency_name"),
        })
    }
}

/// A row from `{path}_stop_times`.
#[derive(Debug, Clone, PartialEq)]
pub struct StopTimeRow {
    pub trip_id: String,
    pub arrival_time: Option<String>,
    pub departure_time: Option<String>,
    pub stop_id: Option<String>,
    pub stop_sequence: Option<i64>,
    pub stop_headsign: Option<String>,
    pub pickup_type: Option<i64>,
    pub drop_off_type: Option<i64>,
    pub timepoint: Option<i64>,
    pub shape_dist_traveled: Option<f64>,
    pub stop_note: Option<String>,
}

impl StopTimeRow {
    pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(StopTimeRow {
            trip_id: row.get("trip_id")?,
            arrival_time: opt(row, "arrival_time"),
            departure_time: opt(row, "departure_time"),
            stop_id: opt(row, "stop_id"),
            stop_sequence: opt(row, "stop_sequence"),
            stop_headsign: opt(row, "stop_headsign"),
            pickup_type: opt(row, "pickup_type"),
            drop_off_type: opt(row, "drop_off_type"),
            timepoint: opt(row, "timepoint"),
            shape_dist_traveled: opt(row, "shape_dist_traveled"),
            stop_note: opt(row, "stop_note"),
        })
    }
}

/// A row from `{path}_stops`.
#[derive(Debug, Clone, PartialEq)]
pub struct StopRow {
    pub stop_id: String,
    pub stop_code: Option<String>,
    pub stop_name: Option<String>,
    pub stop_lat: Option<f64>,
    pub stop_lon: Option<f64>,
    pub location_type: Option<String>,
    pub parent_station: Option<String>,
    pub wheelchair_boarding: Option<i64>,
    pub level_id: Option<String>,
    pub platform_code: Option<String>,
}

impl StopRow {
    pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(StopRow {
            stop_id: row.get("stop_id")?,
            stop_code: opt(row, "stop_code"),
            stop_name: opt(row, "stop_name"),
            stop_lat: opt(row, "stop_lat"),
            stop_lon: opt(row, "stop_lon"),
            location_type: opt(row, "location_type"),
            parent_station: opt(row, "parent_station"),
            wheelchair_boarding: opt(row, "wheelchair_boarding"),
            level_id: opt(row, "level_id"),
            platform_code: opt(row, "platform_code"),
        })
    }
}

/// A row from the shared `location_facilities` table, keyed by transit
/// stop number (TSN).
#[derive(Debug, Clone, PartialEq)]
pub struct FacilityRow {
    pub tsn: String,
    pub location_name: Option<String>,
    pub efa_id: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub facilities: Option<String>,
    pub accessibility: Option<String>,
    pub transport_mode: Option<String>,
    pub morning_peak: Option<String>,
    pub afternoon_peak: Option<String>,
    pub short_platform: Option<String>,
}

impl FacilityRow {
    pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(FacilityRow {
            tsn: row.get("TSN")?,
            location_name: opt(row, "LOCATION_NAME"),
            efa_id: opt(row, "EFA_ID"),
            phone: opt(row, "PHONE"),
            address: opt(row, "ADDRESS"),
            facilities: opt(row, "FACILITIES"),
            accessibility: opt(row, "ACCESSIBILITY"),
            transport_mode: opt(row, "TRANSPORT_MODE"),
            morning_peak: opt(row, "MORNING_PEAK"),
            afternoon_peak: opt(row, "AFTERNOON_PEAK"),
            short_platform: opt(row, "SHORT_PLATFORM"),
        })
    }
}

/// A row from `{path}_vehicle_categories` (heavy-rail feeds only).
///
/// Embedded verbatim in the trip facet, so it serializes under its
/// column names.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VehicleCategoryRow {
    pub vehicle_category_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vehicle_category_name: Option<String>,
}

impl VehicleCategoryRow {
    pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(VehicleCategoryRow {
            vehicle_category_id: row.get("vehicle_category_id")?,
            vehicle_category_name: opt(row, "vehicle_category_name"),
        })
    }
}

/// A row from `{path}_notes`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NoteRow {
    pub note_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note_text: Option<String>,
}

impl NoteRow {
    pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(NoteRow {
            note_id: row.get("note_id")?,
            note_text: opt(row, "note_text"),
        })
    }
}

/// A row from `{path}_shapes`.
#[derive(Debug, Clone, PartialEq)]
pub struct ShapePointRow {
    pub shape_id: String,
    pub shape_pt_lat: f64,
    pub shape_pt_lon: f64,
    pub shape_pt_sequence: i64,
    pub shape_dist_traveled: Option<f64>,
}

impl ShapePointRow {
    pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(ShapePointRow {
            shape_id: row.get("shape_id")?,
            shape_pt_lat: row.get("shape_pt_lat")?,
            shape_pt_lon: row.get("shape_pt_lon")?,
            shape_pt_sequence: row.get("shape_pt_sequence")?,
            shape_dist_traveled: opt(row, "shape_dist_traveled"),
        })
    }
}
