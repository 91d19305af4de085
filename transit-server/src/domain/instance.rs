//! Stable instance identifiers.
//!
//! An instance id correlates a live vehicle or a stop across refresh
//! cycles and client requests. Vehicle ids embed the local service day
//! and a trip key so that the same physical service run keeps the same
//! id for a whole day; this is the correlation key for bearing
//! continuity and for client-side marker identity.

use std::fmt;

use chrono::{Datelike, NaiveDate};

use super::mode::Mode;

/// Trip ids that are not in the timetable keep their full id as the trip
/// key; everything else keys on the leading dotted segment (run number).
pub const NON_TIMETABLED_PREFIX: &str = "NonTimetabled";

/// Error returned when parsing a malformed instance id.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid instance id: {reason}")]
pub struct InvalidInstanceId {
    reason: &'static str,
}

/// Whether an instance id names a live vehicle or a static stop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstanceKind {
    Vehicle,
    Stop,
}

impl InstanceKind {
    fn as_str(&self) -> &'static str {
        match self {
            InstanceKind::Vehicle => "vehicle",
            InstanceKind::Stop => "stop",
        }
    }
}

/// A parsed instance id.
///
/// Vehicle ids have the shape `vehicle/{mode}/{serviceDay}/{tripKey}`;
/// stop ids have the shape `stop/{mode}/{stopId}`.
///
/// # Examples
///
/// ```
/// use transit_server::domain::{InstanceId, InstanceKind, Mode};
///
/// let id = InstanceId::parse("vehicle/train/7826/W123").unwrap();
/// assert_eq!(id.kind(), InstanceKind::Vehicle);
/// assert_eq!(id.mode(), Mode::Train);
/// assert_eq!(id.tail(), "7826/W123");
///
/// assert!(InstanceId::parse("depot/train/X").is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstanceId {
    kind: InstanceKind,
    mode: Mode,
    tail: String,
}

impl InstanceId {
    /// Build a vehicle instance id from its parts.
    pub fn vehicle(mode: Mode, service_day: &str, trip_id: &str) -> Self {
        InstanceId {
            kind: InstanceKind::Vehicle,
            mode,
            tail: format!("{service_day}/{}", trip_key(trip_id)),
        }
    }

    /// Build a stop instance id.
    pub fn stop(mode: Mode, stop_id: &str) -> Self {
        InstanceId {
            kind: InstanceKind::Stop,
            mode,
            tail: stop_id.to_string(),
        }
    }

    /// Parse an instance id from its string form.
    pub fn parse(s: &str) -> Result<Self, InvalidInstanceId> {
        let mut parts = s.splitn(3, '/');
        let kind = match parts.next() {
            Some("vehicle") => InstanceKind::Vehicle,
            Some("stop") => InstanceKind::Stop,
            _ => {
                return Err(InvalidInstanceId {
                    reason: "must start with 'vehicle' or 'stop'",
                });
            }
        };
        let mode = parts
            .next()
            .and_then(|m| Mode::parse(m).ok())
            .ok_or(InvalidInstanceId {
                reason: "unknown transit mode",
            })?;
        let tail = parts.next().filter(|t| !t.is_empty()).ok_or(
            InvalidInstanceId {
                reason: "missing identifier after mode",
            },
        )?;
        Ok(InstanceId {
            kind,
            mode,
            tail: tail.to_string(),
        })
    }

    pub fn kind(&self) -> InstanceKind {
        self.kind
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    /// The portion after the mode: `serviceDay/tripKey` for vehicles,
    /// the stop id for stops.
    pub fn tail(&self) -> &str {
        &self.tail
    }
}

impl fmt::Display for InstanceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.kind.as_str(), self.mode, self.tail)
    }
}

/// The stable per-run key extracted from a trip id.
///
/// Non-timetabled trips keep their full id (their run number is the only
/// identity they have); timetabled trips key on the segment before the
/// first dot, which stays constant while the dotted suffix varies
/// between schedule revisions.
pub fn trip_key(trip_id: &str) -> &str {
    if trip_id.starts_with(NON_TIMETABLED_PREFIX) {
        trip_id
    } else {
        trip_id.split('.').next().unwrap_or(trip_id)
    }
}

/// The local service-day token: day, month and two-digit year without
/// padding (`7826` for 7 August 2026).
pub fn service_day(date: NaiveDate) -> String {
    format!("{}{}{}", date.day(), date.month(), date.year() % 100)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vehicle_id_round_trip() {
        let id = InstanceId::vehicle(Mode::Train, "7826", "W123.456.100.8.A");
        assert_eq!(id.to_string(), "vehicle/train/7826/W123");

        let parsed = InstanceId::parse("vehicle/train/7826/W123").unwrap();
        assert_eq!(parsed, id);
    }

    #[test]
    fn non_timetabled_trips_keep_full_id() {
        let id = InstanceId::vehicle(Mode::Train, "7826", "NonTimetabled.U123");
        assert_eq!(id.to_string(), "vehicle/train/7826/NonTimetabled.U123");
    }

    #[test]
    fn stop_id_round_trip() {
        let id = InstanceId::stop(Mode::Ferry, "20001");
        assert_eq!(id.to_string(), "stop/ferry/20001");
        assert_eq!(InstanceId::parse("stop/ferry/20001").unwrap(), id);
    }

    #[test]
    fn reject_malformed_ids() {
        assert!(InstanceId::parse("").is_err());
        assert!(InstanceId::parse("depot/train/X").is_err());
        assert!(InstanceId::parse("vehicle/tram/X").is_err());
        assert!(InstanceId::parse("vehicle/train").is_err());
        assert!(InstanceId::parse("vehicle/train/").is_err());
    }

    #[test]
    fn trip_key_extraction() {
        assert_eq!(trip_key("W123.456.100"), "W123");
        assert_eq!(trip_key("W123"), "W123");
        assert_eq!(trip_key("NonTimetabled.U123"), "NonTimetabled.U123");
    }

    #[test]
    fn service_day_format() {
        let date = NaiveDate::from_ymd_opt(2026, 8, 7).unwrap();
        assert_eq!(service_day(date), "7826");

        // No zero padding on day or month
        let date = NaiveDate::from_ymd_opt(2025, 12, 31).unwrap();
        assert_eq!(service_day(date), "311225");
    }
}
