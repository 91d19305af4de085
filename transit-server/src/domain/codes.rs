//! Enumerations decoded from feed integer codes.
//!
//! The feed carries these as protobuf enum values; the fused entities
//! expose them under their upstream names (`SCHEDULED`, `STOPPED_AT`, …).

use serde::{Deserialize, Serialize};

/// How a live trip relates to the published schedule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ScheduleRelationship {
    Scheduled,
    Added,
    Unscheduled,
    Canceled,
    Replacement,
}

impl ScheduleRelationship {
    /// Decode a trip-descriptor schedule-relationship code.
    ///
    /// Code 4 is unassigned in the feed specification; `REPLACEMENT` is 5.
    pub fn from_code(code: i32) -> Option<Self> {
        match code {
            0 => Some(ScheduleRelationship::Scheduled),
            1 => Some(ScheduleRelationship::Added),
            2 => Some(ScheduleRelationship::Unscheduled),
            3 => Some(ScheduleRelationship::Canceled),
            5 => Some(ScheduleRelationship::Replacement),
            _ => None,
        }
    }
}

/// Where a vehicle is relative to its current stop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StopStatus {
    IncomingAt,
    StoppedAt,
    InTransitTo,
}

impl StopStatus {
    pub fn from_code(code: i32) -> Option<Self> {
        match code {
            0 => Some(StopStatus::IncomingAt),
            1 => Some(StopStatus::StoppedAt),
            2 => Some(StopStatus::InTransitTo),
            _ => None,
        }
    }
}

/// Passenger load reported for a vehicle or carriage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OccupancyStatus {
    Empty,
    ManySeatsAvailable,
    FewSeatsAvailable,
    StandingRoomOnly,
    CrushedStandingRoomOnly,
    Full,
    NotAcceptingPassengers,
}

impl OccupancyStatus {
    pub fn from_code(code: i32) -> Option<Self> {
        match code {
            0 => Some(OccupancyStatus::Empty),
            1 => Some(OccupancyStatus::ManySeatsAvailable),
            2 => Some(OccupancyStatus::FewSeatsAvailable),
            3 => Some(OccupancyStatus::StandingRoomOnly),
            4 => Some(OccupancyStatus::CrushedStandingRoomOnly),
            5 => Some(OccupancyStatus::Full),
            6 => Some(OccupancyStatus::NotAcceptingPassengers),
            _ => None,
        }
    }
}

/// Toilet provision reported per carriage in the consist extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ToiletStatus {
    None,
    Normal,
    Accessible,
}

impl ToiletStatus {
    pub fn from_code(code: i32) -> Option<Self> {
        match code {
            0 => Some(ToiletStatus::None),
            1 => Some(ToiletStatus::Normal),
            2 => Some(ToiletStatus::Accessible),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn schedule_relationship_codes() {
        assert_eq!(
            ScheduleRelationship::from_code(0),
            Some(ScheduleRelationship::Scheduled)
        );
        assert_eq!(
            ScheduleRelationship::from_code(3),
            Some(ScheduleRelationship::Canceled)
        );
        assert_eq!(
            ScheduleRelationship::from_code(5),
            Some(ScheduleRelationship::Replacement)
        );
        // 4 is a hole in the upstream enum
        assert_eq!(ScheduleRelationship::from_code(4), None);
        assert_eq!(ScheduleRelationship::from_code(-1), None);
    }

    #[test]
    fn serializes_under_upstream_names() {
        assert_eq!(
            serde_json::to_string(&ScheduleRelationship::Unscheduled).unwrap(),
            "\"UNSCHEDULED\""
        );
        assert_eq!(
            serde_json::to_string(&StopStatus::StoppedAt).unwrap(),
            "\"STOPPED_AT\""
        );
        assert_eq!(
            serde_json::to_string(&OccupancyStatus::FewSeatsAvailable).unwrap(),
            "\"FEW_SEATS_AVAILABLE\""
        );
    }

    #[test]
    fn stop_status_codes() {
        assert_eq!(StopStatus::from_code(1), Some(StopStatus::StoppedAt));
        assert_eq!(StopStatus::from_code(7), None);
    }

    #[test]
    fn occupancy_codes_cover_full_range() {
        for code in 0..=6 {
            assert!(OccupancyStatus::from_code(code).is_some());
        }
        assert_eq!(OccupancyStatus::from_code(7), None);
    }
}
