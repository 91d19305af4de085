//! GTFS-realtime message structs.
//!
//! Hand-maintained prost structs for the subset of the feed schema this
//! server consumes, checked in rather than generated so the operator
//! extension fields (tag 1007 on `VehiclePosition` and
//! `VehicleDescriptor`) can live alongside the standard fields without a
//! build-time protoc dependency. Tag numbers follow the published
//! `gtfs-realtime.proto` and the operator's extension schema.

use prost::Message;

/// Decode a complete feed message from its binary payload.
///
/// Returns the whole message or an error; never a partial result.
pub fn decode_feed(bytes: &[u8]) -> Result<FeedMessage, prost::DecodeError> {
    FeedMessage::decode(bytes)
}

#[derive(Clone, PartialEq, Message)]
pub struct FeedMessage {
    #[prost(message, optional, tag = "1")]
    pub header: Option<FeedHeader>,
    #[prost(message, repeated, tag = "2")]
    pub entity: Vec<FeedEntity>,
}

#[derive(Clone, PartialEq, Message)]
pub struct FeedHeader {
    #[prost(string, tag = "1")]
    pub gtfs_realtime_version: String,
    #[prost(uint64, optional, tag = "3")]
    pub timestamp: Option<u64>,
}

#[derive(Clone, PartialEq, Message)]
pub struct FeedEntity {
    #[prost(string, tag = "1")]
    pub id: String,
    #[prost(bool, optional, tag = "2")]
    pub is_deleted: Option<bool>,
    #[prost(message, optional, tag = "3")]
    pub trip_update: Option<TripUpdate>,
    #[prost(message, optional, tag = "4")]
    pub vehicle: Option<VehiclePosition>,
}

#[derive(Clone, PartialEq, Message)]
pub struct TripUpdate {
    #[prost(message, optional, tag = "1")]
    pub trip: Option<TripDescriptor>,
    #[prost(message, repeated, tag = "2")]
    pub stop_time_update: Vec<StopTimeUpdate>,
    #[prost(message, optional, tag = "3")]
    pub vehicle: Option<VehicleDescriptor>,
    #[prost(uint64, optional, tag = "4")]
    pub timestamp: Option<u64>,
    #[prost(int32, optional, tag = "5")]
    pub delay: Option<i32>,
}

#[derive(Clone, PartialEq, Message)]
pub struct TripDescriptor {
    #[prost(string, optional, tag = "1")]
    pub trip_id: Option<String>,
    #[prost(string, optional, tag = "2")]
    pub start_time: Option<String>,
    #[prost(string, optional, tag = "3")]
    pub start_date: Option<String>,
    #[prost(int32, optional, tag = "4")]
    pub schedule_relationship: Option<i32>,
    #[prost(string, optional, tag = "5")]
    pub route_id: Option<String>,
    #[prost(uint32, optional, tag = "6")]
    pub direction_id: Option<u32>,
}

#[derive(Clone, PartialEq, Message)]
pub struct StopTimeEvent {
    #[prost(int32, optional, tag = "1")]
    pub delay: Option<i32>,
    #[prost(int64, optional, tag = "2")]
    pub time: Option<i64>,
    #[prost(int32, optional, tag = "3")]
    pub uncertainty: Option<i32>,
}

#[derive(Clone, PartialEq, Message)]
pub struct StopTimeUpdate {
    #[prost(uint32, optional, tag = "1")]
    pub stop_sequence: Option<u32>,
    #[prost(message, optional, tag = "2")]
    pub arrival: Option<StopTimeEvent>,
    #[prost(message, optional, tag = "3")]
    pub departure: Option<StopTimeEvent>,
    #[prost(string, optional, tag = "4")]
    pub stop_id: Option<String>,
    #[prost(int32, optional, tag = "5")]
    pub schedule_relationship: Option<i32>,
}

#[derive(Clone, PartialEq, Message)]
pub struct VehiclePosition {
    #[prost(message, optional, tag = "1")]
    pub trip: Option<TripDescriptor>,
    #[prost(message, optional, tag = "2")]
    pub position: Option<Position>,
    #[prost(uint32, optional, tag = "3")]
    pub current_stop_sequence: Option<u32>,
    #[prost(int32, optional, tag = "4")]
    pub current_status: Option<i32>,
    #[prost(uint64, optional, tag = "5")]
    pub timestamp: Option<u64>,
    #[prost(int32, optional, tag = "6")]
    pub congestion_level: Option<i32>,
    #[prost(string, optional, tag = "7")]
    pub stop_id: Option<String>,
    #[prost(message, optional, tag = "8")]
    pub vehicle: Option<VehicleDescriptor>,
    #[prost(int32, optional, tag = "9")]
    pub occupancy_status: Option<i32>,
    /// Operator extension: per-carriage consist details.
    #[prost(message, repeated, tag = "1007")]
    pub carriages: Vec<CarriageDescriptor>,
}

#[derive(Clone, PartialEq, Message)]
pub struct Position {
    #[prost(float, tag = "1")]
    pub latitude: f32,
    #[prost(float, tag = "2")]
    pub longitude: f32,
    #[prost(float, optional, tag = "3")]
    pub bearing: Option<f32>,
    #[prost(double, optional, tag = "4")]
    pub odometer: Option<f64>,
    #[prost(float, optional, tag = "5")]
    pub speed: Option<f32>,
}

#[derive(Clone, PartialEq, Message)]
pub struct VehicleDescriptor {
    #[prost(string, optional, tag = "1")]
    pub id: Option<String>,
    #[prost(string, optional, tag = "2")]
    pub label: Option<String>,
    #[prost(string, optional, tag = "3")]
    pub license_plate: Option<String>,
    /// Operator extension: air conditioning, accessibility, model and
    /// attribute mask.
    #[prost(message, optional, tag = "1007")]
    pub operator_descriptor: Option<OperatorVehicleDescriptor>,
}

#[derive(Clone, PartialEq, Message)]
pub struct OperatorVehicleDescriptor {
    #[prost(bool, optional, tag = "1")]
    pub air_conditioned: Option<bool>,
    #[prost(int32, optional, tag = "2")]
    pub wheelchair_accessible: Option<i32>,
    #[prost(string, optional, tag = "3")]
    pub vehicle_model: Option<String>,
    #[prost(bool, optional, tag = "4")]
    pub performing_prior_trip: Option<bool>,
    #[prost(int32, optional, tag = "5")]
    pub special_vehicle_attributes: Option<i32>,
}

#[derive(Clone, PartialEq, Message)]
pub struct CarriageDescriptor {
    #[prost(string, optional, tag = "1")]
    pub name: Option<String>,
    #[prost(int32, optional, tag = "2")]
    pub position_in_consist: Option<i32>,
    #[prost(int32, optional, tag = "3")]
    pub occupancy_status: Option<i32>,
    #[prost(bool, optional, tag = "4")]
    pub quiet_carriage: Option<bool>,
    #[prost(int32, optional, tag = "5")]
    pub toilet: Option<i32>,
    #[prost(bool, optional, tag = "6")]
    pub luggage_rack: Option<bool>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decode_round_trips_extension_fields() {
        let message = FeedMessage {
            header: Some(FeedHeader {
                gtfs_realtime_version: "2.0".into(),
                timestamp: Some(1_700_000_000),
            }),
            entity: vec![FeedEntity {
                id: "1".into(),
                is_deleted: None,
                trip_update: None,
                vehicle: Some(VehiclePosition {
                    trip: Some(TripDescriptor {
                        trip_id: Some("W123.456".into()),
                        route_id: Some("BNK_1a".into()),
                        ..Default::default()
                    }),
                    position: Some(Position {
                        latitude: -33.86,
                        longitude: 151.2,
                        bearing: Some(45.0),
                        odometer: None,
                        speed: Some(12.5),
                    }),
                    vehicle: Some(VehicleDescriptor {
                        id: Some("D55".into()),
                        operator_descriptor: Some(OperatorVehicleDescriptor {
                            air_conditioned: Some(true),
                            wheelchair_accessible: Some(1),
                            vehicle_model: Some("A".into()),
                            performing_prior_trip: Some(false),
                            special_vehicle_attributes: Some(3),
                        }),
                        ..Default::default()
                    }),
                    carriages: vec![CarriageDescriptor {
                        name: Some("A1".into()),
                        position_in_consist: Some(1),
                        occupancy_status: Some(2),
                        quiet_carriage: Some(true),
                        toilet: Some(1),
                        luggage_rack: None,
                    }],
                    ..Default::default()
                }),
            }],
        };

        let bytes = message.encode_to_vec();
        let decoded = decode_feed(&bytes).unwrap();
        assert_eq!(decoded, message);

        let descriptor = decoded.entity[0]
            .vehicle
            .as_ref()
            .unwrap()
            .vehicle
            .as_ref()
            .unwrap()
            .operator_descriptor
            .as_ref()
            .unwrap();
        assert_eq!(descriptor.vehicle_model.as_deref(), Some("A"));
    }

    #[test]
    fn truncated_payload_is_an_error() {
        let message = FeedMessage {
            header: Some(FeedHeader {
                gtfs_realtime_version: "2.0".into(),
                timestamp: Some(1),
            }),
            entity: vec![],
        };
        let mut bytes = message.encode_to_vec();
        bytes.pop();
        assert!(decode_feed(&bytes).is_err());
    }

    #[test]
    fn unknown_fields_are_skipped() {
        // A payload from a newer schema revision: field 99 is not part of
        // our struct and must be ignored, not rejected.
        let mut bytes = FeedMessage::default().encode_to_vec();
        // varint field 99: tag = (99 << 3) | 0 = 792 → varint [0x98, 0x06]
        bytes.extend_from_slice(&[0x98, 0x06, 0x2a]);
        assert!(decode_feed(&bytes).is_ok());
    }
}
