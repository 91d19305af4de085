//! Transit mode type.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Error returned when parsing an unknown mode name.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown transit mode: {name}")]
pub struct InvalidMode {
    name: String,
}

/// A transit mode, as used in feed-path configuration and query grouping.
///
/// Mode names on the wire are lowercase snake case (`train_link`,
/// `light_rail`), matching the query-parameter and JSON contract.
///
/// # Examples
///
/// ```
/// use transit_server::domain::Mode;
///
/// let mode = Mode::parse("train_link").unwrap();
/// assert_eq!(mode, Mode::TrainLink);
/// assert_eq!(mode.as_str(), "train_link");
///
/// assert!(Mode::parse("tram").is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Mode {
    Train,
    TrainLink,
    Metro,
    Bus,
    LightRail,
    Ferry,
}

impl Mode {
    /// All modes, in display order.
    pub const ALL: [Mode; 6] = [
        Mode::Train,
        Mode::TrainLink,
        Mode::Metro,
        Mode::Bus,
        Mode::LightRail,
        Mode::Ferry,
    ];

    /// Parse a mode from its wire name.
    pub fn parse(s: &str) -> Result<Self, InvalidMode> {
        match s {
            "train" => Ok(Mode::Train),
            "train_link" => Ok(Mode::TrainLink),
            "metro" => Ok(Mode::Metro),
            "bus" => Ok(Mode::Bus),
            "light_rail" => Ok(Mode::LightRail),
            "ferry" => Ok(Mode::Ferry),
            other => Err(InvalidMode {
                name: other.to_string(),
            }),
        }
    }

    /// Returns the wire name of the mode.
    pub fn as_str(&self) -> &'static str {
        match self {
            Mode::Train => "train",
            Mode::TrainLink => "train_link",
            Mode::Metro => "metro",
            Mode::Bus => "bus",
            Mode::LightRail => "light_rail",
            Mode::Ferry => "ferry",
        }
    }

    /// Rail-type modes carry run-number trip ids and get bearing
    /// continuity and heuristic trip classification.
    pub fn is_rail(&self) -> bool {
        matches!(self, Mode::Train | Mode::TrainLink | Mode::Metro)
    }

    /// Heavy-rail modes whose trips carry a rolling-stock category
    /// reference in the schedule tables.
    pub fn has_vehicle_categories(&self) -> bool {
        matches!(self, Mode::Train | Mode::TrainLink)
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_all_wire_names() {
        for mode in Mode::ALL {
            assert_eq!(Mode::parse(mode.as_str()).unwrap(), mode);
        }
    }

    #[test]
    fn reject_unknown_names() {
        assert!(Mode::parse("tram").is_err());
        assert!(Mode::parse("").is_err());
        // Wire names are lowercase only
        assert!(Mode::parse("Train").is_err());
        assert!(Mode::parse("TRAIN_LINK").is_err());
    }

    #[test]
    fn rail_modes() {
        assert!(Mode::Train.is_rail());
        assert!(Mode::TrainLink.is_rail());
        assert!(Mode::Metro.is_rail());
        assert!(!Mode::Bus.is_rail());
        assert!(!Mode::LightRail.is_rail());
        assert!(!Mode::Ferry.is_rail());
    }

    #[test]
    fn serde_uses_wire_names() {
        assert_eq!(
            serde_json::to_string(&Mode::TrainLink).unwrap(),
            "\"train_link\""
        );
        assert_eq!(
            serde_json::from_str::<Mode>("\"light_rail\"").unwrap(),
            Mode::LightRail
        );
    }
}
