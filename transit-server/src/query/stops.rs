//! Static stop records enriched with facility data.

use serde::{Deserialize, Serialize};

use crate::domain::{InstanceId, Mode};
use crate::reference::{FacilityRow, StopRow};

/// Delimiters that split a bus stop name into head name and subtitle,
/// tried in order.
const NAME_DELIMITERS: &[&str] = &[" at ", " opp ", " before ", " after ", ", "];

/// Facility records are keyed by TSN; a handful of stops were
/// renumbered upstream without the facility table following.
const STOP_ID_FIXES: &[(&str, &str)] = &[
    ("2000442", "2000441"),
    ("203771", "203783"),
    ("20003", "200020"),
    ("20004", "200020"),
    ("20005", "200020"),
    ("20006", "200020"),
    ("2000274", "200020"),
    ("200910", "2000260"),
];

/// Map a stop id to the TSN its facility record lives under.
pub fn fix_stop_id(stop_id: &str) -> &str {
    STOP_ID_FIXES
        .iter()
        .find(|(from, _)| *from == stop_id)
        .map(|(_, to)| *to)
        .unwrap_or(stop_id)
}

/// A stop name split for two-line display.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubName {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub head_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub delim: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subtitle: Option<String>,
}

/// Facility details joined from the shared facilities table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StopFacilities {
    pub location_name: Option<String>,
    pub transit_stop_number: String,
    pub efa_id: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub facilities: Vec<String>,
    pub accessibility: Vec<String>,
    #[serde(rename = "transit_modes")]
    pub transit_modes: Vec<String>,
    pub opal_morning_peak: Option<String>,
    pub opal_afternoon_peak: Option<String>,
    pub short_platform: bool,
}

/// A static stop enriched for clients.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StopRecord {
    pub id: String,
    pub code: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sub_name: Option<SubName>,
    #[serde(rename = "type")]
    pub mode: Mode,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lat: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lng: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_station: Option<String>,
    pub wheelchair: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub level_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub platform_number: Option<String>,
    pub instance_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stop_info: Option<StopFacilities>,
}

impl StopRecord {
    /// Build a stop record from its reference row and optional facility
    /// row.
    pub fn build(stop: &StopRow, facility: Option<&FacilityRow>, mode: Mode) -> Self {
        let name = stop.stop_name.clone();
        let platform_code = stop
            .platform_code
            .clone()
            .filter(|p| !p.is_empty());

        let sub_name = if mode == Mode::Bus {
            name.as_deref().and_then(split_bus_name)
        } else {
            platform_code.as_ref().map(|platform| SubName {
                head_name: name.clone(),
                delim: None,
                subtitle: Some(format!("Platform {platform}")),
            })
        };

        StopRecord {
            id: stop.stop_id.clone(),
            code: stop
                .stop_code
                .clone()
                .filter(|c| !c.is_empty())
                .unwrap_or_else(|| stop.stop_id.clone()),
            name,
            sub_name,
            mode,
            lat: stop.stop_lat,
            lng: stop.stop_lon,
            location_type: stop.location_type.clone(),
            parent_station: stop.parent_station.clone().filter(|p| !p.is_empty()),
            wheelchair: stop.wheelchair_boarding.is_some_and(|w| w != 0),
            level_id: stop.level_id.clone().filter(|l| !l.is_empty()),
            platform_number: platform_code,
            instance_id: InstanceId::stop(mode, &stop.stop_id).to_string(),
            stop_info: facility.map(facilities_info),
        }
    }
}

fn split_bus_name(name: &str) -> Option<SubName> {
    let delim = NAME_DELIMITERS
        .iter()
        .find(|d| name.split(*d).count() > 1)?;
    let mut parts = name.splitn(2, delim);
    Some(SubName {
        head_name: parts.next().map(str::to_string),
        delim: Some((*delim).to_string()),
        subtitle: parts.next().map(str::to_string),
    })
}

fn facilities_info(facility: &FacilityRow) -> StopFacilities {
    let split_list = |value: &Option<String>| -> Vec<String> {
        value
            .as_deref()
            .map(|v| v.split(" | ").map(str::to_string).collect())
            .unwrap_or_default()
    };
    StopFacilities {
        location_name: facility.location_name.clone(),
        transit_stop_number: facility.tsn.clone(),
        efa_id: facility.efa_id.clone(),
        phone: facility.phone.clone(),
        address: facility.address.clone(),
        facilities: split_list(&facility.facilities),
        accessibility: split_list(&facility.accessibility),
        transit_modes: facility
            .transport_mode
            .as_deref()
            .map(|modes| {
                modes
                    .to_lowercase()
                    .split(',')
                    .map(|m| m.trim().to_string())
                    .collect()
            })
            .unwrap_or_default(),
        opal_morning_peak: facility.morning_peak.clone(),
        opal_afternoon_peak: facility.afternoon_peak.clone(),
        short_platform: facility.short_platform.as_deref() == Some("True"),
    }
}
