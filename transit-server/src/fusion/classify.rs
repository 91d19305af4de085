//! Trip classification.
//!
//! A live trip that matches a static trip row takes its classification
//! from the feed and its headsign from the schedule (with the live
//! stop-time override applied first). Rail trips with no static match
//! split heuristically into non-timetabled revenue service and
//! unscheduled non-revenue movements.

use crate::domain::{Headsign, Mode, NON_TIMETABLED_PREFIX, ScheduleRelationship, trip_key};
use crate::reference::{AgencyRow, RouteRow, TripRow};

use super::entity::{AgencyRef, RouteDescriptor};

/// Route ids that mark non-revenue movements regardless of trip id.
const NON_REVENUE_ROUTE_IDS: &[&str] = &["RTTA_DEF", "RTTA_REV"];

/// Run numbers beginning with this letter mark track-occupation
/// movements.
const TRACK_OCCUPATION_MARKER: char = 'U';

/// Inputs to trip classification, gathered by the composer.
#[derive(Debug, Clone, Copy)]
pub struct ClassifyInput<'a> {
    pub trip_id: &'a str,
    /// Route id reported by the feed (used by the heuristic branch; the
    /// matched branch takes the route from the trip row).
    pub route_id: Option<&'a str>,
    pub feed_schedule_relationship: Option<i32>,
    pub mode: Mode,
    pub trip: Option<&'a TripRow>,
    pub route: Option<&'a RouteRow>,
    pub agency: Option<&'a AgencyRow>,
    /// Headsign override from the first live stop-time update's stop.
    pub live_headsign: Option<&'a str>,
}

/// The classifier's output: schedule relationship, headsign and a route
/// descriptor (synthesized when no static route exists).
#[derive(Debug, Clone, PartialEq)]
pub struct Classification {
    pub schedule_relationship: Option<ScheduleRelationship>,
    pub head_sign: Headsign,
    pub route: RouteDescriptor,
    pub run_number: Option<String>,
}

/// The run-number token: the segment after the first dot, or the whole
/// id when there is none.
fn run_number(trip_id: &str) -> String {
    trip_id
        .split('.')
        .nth(1)
        .unwrap_or(trip_id)
        .to_string()
}

/// Short-name fallback chain for matched routes.
fn route_short_name(route: &RouteRow, trip_id: &str) -> Option<String> {
    let short = route.route_short_name.as_deref().unwrap_or("");
    let long = route.route_long_name.as_deref();
    let resolved = if short.is_empty() {
        if long == Some("Out Of Service") {
            "OS".to_string()
        } else {
            trip_key(trip_id).to_string()
        }
    } else {
        short.to_string()
    };
    if resolved.is_empty() && long == Some("Non Revenue") {
        return Some("NR".to_string());
    }
    (!resolved.is_empty()).then_some(resolved)
}

/// Classify one live trip against its (possibly empty) reference rows.
pub fn classify_trip(input: ClassifyInput<'_>) -> Classification {
    let Some(trip) = input.trip else {
        return classify_unmatched(input);
    };

    let schedule_relationship = input
        .feed_schedule_relationship
        .and_then(ScheduleRelationship::from_code);

    // Live stop-time override wins over the static trip headsign.
    let raw_headsign = input
        .live_headsign
        .filter(|s| !s.is_empty())
        .or(trip.trip_headsign.as_deref())
        .unwrap_or("");
    let mut head_sign = Headsign::split(raw_headsign);
    if head_sign.headline.is_none() {
        head_sign.headline = Some("Non Revenue".to_string());
    }

    let route = match input.route {
        Some(route) => RouteDescriptor {
            id: trip.route_id.clone(),
            short_name: route_short_name(route, input.trip_id),
            long_name: route.route_long_name.clone(),
            description: route.route_desc.clone(),
            color: format!("#{}", route.route_color.as_deref().unwrap_or("000000")),
            text_color: format!(
                "#{}",
                route.route_text_color.as_deref().unwrap_or("FFFFFF")
            ),
            agency: Some(AgencyRef {
                id: route.agency_id.clone(),
                name: input.agency.and_then(|a| a.agency_name.clone()),
            }),
        },
        // Lookup miss: the route row is absent but the trip matched.
        // Degrade the descriptor instead of dropping the entity.
        None => RouteDescriptor {
            id: trip.route_id.clone(),
            short_name: Some(trip_key(input.trip_id).to_string()),
            color: "#000000".to_string(),
            text_color: "#FFFFFF".to_string(),
            ..Default::default()
        },
    };

    Classification {
        schedule_relationship,
        head_sign,
        route,
        run_number: None,
    }
}

fn classify_unmatched(input: ClassifyInput<'_>) -> Classification {
    if !input.mode.is_rail() {
        // No heuristic exists for unmatched road/ferry trips; give them a
        // typed generic descriptor rather than undefined fields.
        return Classification {
            schedule_relationship: Some(ScheduleRelationship::Unscheduled),
            head_sign: Headsign::headline("Unscheduled"),
            route: RouteDescriptor {
                id: input.route_id.map(str::to_string),
                short_name: Some(trip_key(input.trip_id).to_string()),
                long_name: Some(input.trip_id.to_string()),
                color: "#888888".to_string(),
                text_color: "#FFFFFF".to_string(),
                ..Default::default()
            },
            run_number: None,
        };
    }

    let run = run_number(input.trip_id);
    let non_revenue = input
        .route_id
        .is_some_and(|id| NON_REVENUE_ROUTE_IDS.contains(&id));

    let route = if input.trip_id.starts_with(NON_TIMETABLED_PREFIX) && !non_revenue {
        if run.starts_with(TRACK_OCCUPATION_MARKER) {
            RouteDescriptor {
                short_name: Some("OCCP".to_string()),
                long_name: Some(format!("Track Occupation.{run}")),
                color: "#ff0000".to_string(),
                text_color: "#FFFFFF".to_string(),
                ..Default::default()
            }
        } else {
            RouteDescriptor {
                short_name: Some(run.clone()),
                long_name: Some(format!("Non Timetabled.{run}")),
                color: "#000000".to_string(),
                text_color: "#FFFFFF".to_string(),
                ..Default::default()
            }
        }
    } else {
        return Classification {
            schedule_relationship: Some(ScheduleRelationship::Unscheduled),
            head_sign: Headsign::headline("Unscheduled Non Revenue"),
            route: RouteDescriptor {
                short_name: Some(run.clone()),
                long_name: Some(format!("Non Revenue.{run}")),
                description: Some("Non Revenue trips".to_string()),
                color: "#888888".to_string(),
                text_color: "#FFFFFF".to_string(),
                agency: Some(AgencyRef {
                    id: Some("SydneyTrains".to_string()),
                    name: Some("Sydney Trains".to_string()),
                }),
                ..Default::default()
            },
            run_number: Some(run),
        };
    };

    Classification {
        schedule_relationship: Some(ScheduleRelationship::Unscheduled),
        head_sign: Headsign::headline("Non Timetabled"),
        route,
        run_number: Some(run),
    }
}
