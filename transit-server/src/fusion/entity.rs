//! Fused entity types.
//!
//! These are the wire types served to clients and persisted in the
//! snapshot cache, so every field serializes under its upstream JSON
//! name. A fused entity is rebuilt wholesale each refresh cycle; the
//! trip facet, vehicle facet and stopping pattern are co-derived from
//! the same feed records by one composer invocation.

use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::domain::{Headsign, Mode, OccupancyStatus, ScheduleRelationship, StopStatus,
    ToiletStatus};
use crate::reference::{NoteRow, VehicleCategoryRow};

/// A latitude/longitude pair.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub lat: f64,
    pub lng: f64,
}

/// Route descriptor attached to the trip facet. Synthesized for
/// heuristic classifications, copied from the reference row otherwise.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteDescriptor {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub short_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub long_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub color: String,
    pub text_color: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub agency: Option<AgencyRef>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AgencyRef {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

/// The trip facet of a fused entity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TripInstance {
    pub id: String,
    /// Working name of the owning feed path.
    pub path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub run_number: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub schedule_relationship: Option<ScheduleRelationship>,
    pub head_sign: Headsign,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub service_deviation: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub service_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub direction_bound: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scheduled_set: Option<VehicleCategoryRow>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shape_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<NoteRow>,
    pub route: RouteDescriptor,
    /// Feed timestamp of the trip update, unix seconds.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time: Option<u64>,
}

/// Last observed position of a vehicle.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LastPosition {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bearing: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub speed: Option<f32>,
    /// Current stop id, when the feed reports one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub coordinates: Option<Coordinates>,
}

/// Bus models decode a tilde-delimited chassis/body descriptor; rail
/// models map a code through the rolling-stock table; some light-rail
/// feeds carry a fixed label.
///
/// Untagged on the wire. `RollingStock` must precede `Bus` so that its
/// required fields disambiguate maps (the bus fields are all optional
/// and would otherwise match anything).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum VehicleModel {
    RollingStock { name: String, letter: String },
    Bus(BusModel),
    Label(String),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BusModel {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chassis: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chassis_manufacturer: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body_manufacturer: Option<String>,
}

/// A boolean the feed may not report: serializes as `true`/`false` or
/// the string `"unknown"`, matching the upstream contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriState {
    Yes,
    No,
    Unknown,
}

impl From<bool> for TriState {
    fn from(value: bool) -> Self {
        if value { TriState::Yes } else { TriState::No }
    }
}

impl Serialize for TriState {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            TriState::Yes => serializer.serialize_bool(true),
            TriState::No => serializer.serialize_bool(false),
            TriState::Unknown => serializer.serialize_str("unknown"),
        }
    }
}

impl<'de> Deserialize<'de> for TriState {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct TriStateVisitor;

        impl<'de> Visitor<'de> for TriStateVisitor {
            type Value = TriState;

            fn expecting(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str("a boolean or the string \"unknown\"")
            }

            fn visit_bool<E: de::Error>(self, v: bool) -> Result<TriState, E> {
                Ok(v.into())
            }

            fn visit_str<E: de::Error>(self, v: &str) -> Result<TriState, E> {
                match v {
                    "unknown" => Ok(TriState::Unknown),
                    other => Err(E::invalid_value(de::Unexpected::Str(other), &self)),
                }
            }
        }

        deserializer.deserialize_any(TriStateVisitor)
    }
}

/// One carriage in a consist, from the feed extension.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Carriage {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub position_in_consist: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub occupancy_status: Option<OccupancyStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quiet_carriage: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub toilet: Option<ToiletStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub luggage_rack: Option<bool>,
}

/// The vehicle facet of a fused entity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VehicleInstance {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub trip_id: String,
    #[serde(rename = "type")]
    pub mode: Mode,
    pub last_position: LastPosition,
    /// Stable across refresh cycles for the same physical service run.
    pub instance_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<StopStatus>,
    pub special_attributes: Vec<String>,
    pub model: VehicleModel,
    pub aircon: TriState,
    pub wheelchair: TriState,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub occupancy: Option<OccupancyStatus>,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub consist: Vec<Carriage>,
}

/// Reference to a named stop, attached to stop events on demand.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StopRef {
    pub name: String,
}

/// One scheduled stop event in a stopping pattern.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StopEvent {
    pub arr: String,
    pub dep: String,
    pub stop_id: String,
    pub headsign: Option<String>,
    pub pick_up: bool,
    pub drop_off: bool,
    pub timepoint: bool,
    pub distance: f64,
    pub note: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stop: Option<StopRef>,
}

/// The stopping-pattern facet: `None` when the trip has no schedule.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StoppingPattern {
    pub timetable: Option<Vec<StopEvent>>,
}

/// One live vehicle-trip: the unit stored in the cache and returned by
/// queries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FusedEntity {
    #[serde(rename = "TripInstance")]
    pub trip: TripInstance,
    #[serde(rename = "VehicleInstance")]
    pub vehicle: VehicleInstance,
    #[serde(rename = "StoppingPattern")]
    pub stopping_pattern: StoppingPattern,
}

/// The fused state of one feed path. Replaced wholesale on refresh,
/// never mutated incrementally.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    /// Feed header timestamp, unix seconds.
    pub header_timestamp: Option<u64>,
    pub entities: Vec<FusedEntity>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_entity(trip_id: &str) -> FusedEntity {
        FusedEntity {
            trip: TripInstance {
                id: trip_id.to_string(),
                path: "sydneytrains".into(),
                run_number: None,
                schedule_relationship: Some(ScheduleRelationship::Scheduled),
                head_sign: Headsign::headline("City"),
                service_deviation: Some("ontime".into()),
                service_id: None,
                direction_bound: None,
                scheduled_set: None,
                shape_id: None,
                note: None,
                route: RouteDescriptor {
                    color: "#F99D1C".into(),
                    text_color: "#FFFFFF".into(),
                    ..Default::default()
                },
                time: Some(100),
            },
            vehicle: VehicleInstance {
                id: Some("D12".into()),
                trip_id: trip_id.to_string(),
                mode: Mode::Train,
                last_position: LastPosition {
                    bearing: Some(90.0),
                    coordinates: Some(Coordinates {
                        lat: -33.87,
                        lng: 151.21,
                    }),
                    ..Default::default()
                },
                instance_id: format!("vehicle/train/7826/{}", trip_id),
                status: Some(StopStatus::InTransitTo),
                special_attributes: vec![],
                model: VehicleModel::RollingStock {
                    name: "Waratah Series 1".into(),
                    letter: "A".into(),
                },
                aircon: TriState::Unknown,
                wheelchair: TriState::Yes,
                occupancy: None,
                consist: vec![],
            },
            stopping_pattern: StoppingPattern {
                timetable: Some(vec![StopEvent {
                    arr: "06:00:00".into(),
                    dep: "06:01:00".into(),
                    stop_id: "S1".into(),
                    headsign: None,
                    pick_up: false,
                    drop_off: true,
                    timepoint: true,
                    distance: 1234.5,
                    note: None,
                    stop: None,
                }]),
            },
        }
    }

    #[test]
    fn tristate_wire_format() {
        assert_eq!(serde_json::to_string(&TriState::Yes).unwrap(), "true");
        assert_eq!(serde_json::to_string(&TriState::No).unwrap(), "false");
        assert_eq!(
            serde_json::to_string(&TriState::Unknown).unwrap(),
            "\"unknown\""
        );

        assert_eq!(
            serde_json::from_str::<TriState>("true").unwrap(),
            TriState::Yes
        );
        assert_eq!(
            serde_json::from_str::<TriState>("\"unknown\"").unwrap(),
            TriState::Unknown
        );
        assert!(serde_json::from_str::<TriState>("\"maybe\"").is_err());
    }

    #[test]
    fn fused_entity_uses_upstream_keys() {
        let entity = sample_entity("W123.456");

        let json = serde_json::to_value(&entity).unwrap();
        assert!(json.get("TripInstance").is_some());
        assert!(json.get("VehicleInstance").is_some());
        assert!(json.get("StoppingPattern").is_some());
        assert_eq!(json["TripInstance"]["headSign"]["headline"], "City");
        assert_eq!(json["TripInstance"]["scheduleRelationship"], "SCHEDULED");
        assert_eq!(
            json["VehicleInstance"]["instanceId"],
            "vehicle/train/7826/W123.456"
        );
        assert_eq!(json["VehicleInstance"]["type"], "train");
        assert_eq!(json["VehicleInstance"]["aircon"], "unknown");
        assert_eq!(json["VehicleInstance"]["wheelchair"], true);
        assert_eq!(json["StoppingPattern"]["timetable"][0]["stopId"], "S1");
        assert_eq!(json["StoppingPattern"]["timetable"][0]["dropOff"], true);
    }

    #[test]
    fn snapshot_round_trips_through_json() {
        let snapshot = Snapshot {
            header_timestamp: Some(1_700_000_000),
            entities: vec![
                sample_entity("W123.456"),
                sample_entity("A987.1"),
                sample_entity("NonTimetabled.U123"),
            ],
        };
        let json = serde_json::to_string(&snapshot).unwrap();
        let back: Snapshot = serde_json::from_str(&json).unwrap();
        // Equal and order-preserving
        assert_eq!(back, snapshot);
        let ids: Vec<_> = back.entities.iter().map(|e| e.trip.id.as_str()).collect();
        assert_eq!(ids, ["W123.456", "A987.1", "NonTimetabled.U123"]);
    }

    #[test]
    fn vehicle_model_untagged_forms() {
        let bus = VehicleModel::Bus(BusModel {
            chassis: Some("B12BLEA".into()),
            chassis_manufacturer: Some("Volvo".into()),
            body: Some("CB60".into()),
            body_manufacturer: Some("Custom Coaches".into()),
        });
        let json = serde_json::to_value(&bus).unwrap();
        assert_eq!(json["chassis"], "B12BLEA");

        let rail = VehicleModel::RollingStock {
            name: "Tangara".into(),
            letter: "T".into(),
        };
        let json = serde_json::to_value(&rail).unwrap();
        assert_eq!(json["name"], "Tangara");

        let label = VehicleModel::Label("Citadis X05/CAF Urbos 3".into());
        assert_eq!(
            serde_json::to_string(&label).unwrap(),
            "\"Citadis X05/CAF Urbos 3\""
        );
    }
}
