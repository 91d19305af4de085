//! Entity composition.
//!
//! One composer invocation turns a vehicle position, its matching trip
//! update and the looked-up reference rows into a fused entity. The
//! trip facet, vehicle facet and stopping pattern are co-derived here
//! and never diverge.

use std::collections::{HashMap, HashSet};

use crate::domain::{
    FeedPath, InstanceId, Mode, OccupancyStatus, StopStatus, ToiletStatus, trip_key,
};
use crate::feed::proto;
use crate::reference::ReferenceBundle;

use super::attributes::{bus_route_tags, special_attribute_tags};
use super::bearing::resolve_bearing;
use super::classify::{ClassifyInput, classify_trip};
use super::entity::{
    Carriage, Coordinates, FusedEntity, LastPosition, StopEvent, StoppingPattern, TriState,
    TripInstance, VehicleInstance, VehicleModel,
};
use super::vehicle_model::{bus_model, rolling_stock};

/// Everything a compose call needs beyond the feed records themselves.
pub struct ComposeContext<'a> {
    pub path: &'a FeedPath,
    /// Precomputed `path.working_name()`.
    pub working: &'a str,
    /// Local service-day token for instance ids.
    pub service_day: &'a str,
    pub refs: &'a ReferenceBundle,
    /// Last positions from the previous snapshot, keyed by instance id.
    pub previous: &'a HashMap<String, LastPosition>,
    /// Run numbers suppressed on train feeds (duplicate services).
    pub duplicate_runs: &'a HashSet<String>,
}

/// Compose one fused entity, or `None` when the update is suppressed.
pub fn compose_entity(
    ctx: &ComposeContext<'_>,
    vehicle_pos: &proto::VehiclePosition,
    trip_update: Option<&proto::TripUpdate>,
) -> Option<FusedEntity> {
    let mode = ctx.path.mode();
    let vehicle_trip_id = vehicle_pos.trip.as_ref()?.trip_id.as_deref()?;

    if mode == Mode::Train && ctx.duplicate_runs.contains(trip_key(vehicle_trip_id)) {
        return None;
    }

    let descriptor = vehicle_pos
        .vehicle
        .as_ref()
        .and_then(|v| v.operator_descriptor.as_ref());
    if descriptor.is_some_and(|d| d.performing_prior_trip == Some(true))
        && !ctx.path.prior_trip_exempt()
    {
        return None;
    }

    let instance_id = InstanceId::vehicle(mode, ctx.service_day, vehicle_trip_id).to_string();

    let coordinates = vehicle_pos.position.as_ref().map(|p| Coordinates {
        lat: p.latitude as f64,
        lng: p.longitude as f64,
    });
    let feed_bearing = vehicle_pos
        .position
        .as_ref()
        .and_then(|p| p.bearing)
        .map(|b| b as f64);
    let bearing = if mode.is_rail() {
        resolve_bearing(ctx.previous.get(&instance_id), coordinates, feed_bearing)
    } else {
        feed_bearing
    };

    // The trip update's descriptor wins over the vehicle's where both
    // are present.
    let update_trip = trip_update.and_then(|t| t.trip.as_ref());
    let vehicle_trip = vehicle_pos.trip.as_ref();
    let entity_trip_id = update_trip
        .and_then(|t| t.trip_id.as_deref())
        .unwrap_or(vehicle_trip_id);
    let route_id = update_trip
        .and_then(|t| t.route_id.as_deref())
        .or(vehicle_trip.and_then(|t| t.route_id.as_deref()));
    let feed_schedule_relationship = update_trip
        .and_then(|t| t.schedule_relationship)
        .or(vehicle_trip.and_then(|t| t.schedule_relationship));

    let trip_row = ctx.refs.trips.get(vehicle_trip_id);
    let route_row = trip_row
        .and_then(|t| t.route_id.as_deref())
        .and_then(|id| ctx.refs.routes.get(id));
    let agency_row = route_row
        .and_then(|r| r.agency_id.as_deref())
        .and_then(|id| ctx.refs.agencies.get(id));
    let stop_times = ctx.refs.stop_times.get(vehicle_trip_id);

    // Headsign override from the first live stop-time update's stop.
    let first_update_stop = trip_update
        .and_then(|t| t.stop_time_update.first())
        .and_then(|u| u.stop_id.as_deref());
    let live_headsign = first_update_stop.and_then(|stop_id| {
        stop_times?
            .iter()
            .find(|st| st.stop_id.as_deref() == Some(stop_id))?
            .stop_headsign
            .as_deref()
    });

    let classification = classify_trip(ClassifyInput {
        trip_id: entity_trip_id,
        route_id,
        feed_schedule_relationship,
        mode,
        trip: trip_row,
        route: route_row,
        agency: agency_row,
        live_headsign,
    });

    let trip = TripInstance {
        id: entity_trip_id.to_string(),
        path: ctx.working.to_string(),
        run_number: classification.run_number,
        schedule_relationship: classification.schedule_relationship,
        head_sign: classification.head_sign,
        service_deviation: trip_row.map(|_| "ontime".to_string()),
        service_id: trip_row.and_then(|t| t.service_id.clone()),
        direction_bound: trip_row.and_then(|t| t.direction_id),
        scheduled_set: trip_row
            .filter(|_| mode.has_vehicle_categories())
            .and_then(|t| t.vehicle_category_id.as_deref())
            .and_then(|id| ctx.refs.categories.get(id))
            .cloned(),
        shape_id: trip_row.and_then(|t| t.shape_id.clone()),
        note: trip_row
            .and_then(|t| t.trip_note.as_deref())
            .filter(|n| !n.is_empty())
            .and_then(|id| ctx.refs.notes.get(id))
            .cloned(),
        route: classification.route,
        time: trip_update.and_then(|t| t.timestamp),
    };

    let mut special_attributes = Vec::new();
    let model;
    let aircon;
    let wheelchair;
    if let Some(descriptor) = descriptor {
        let raw_model = descriptor.vehicle_model.as_deref().unwrap_or("unknown");
        model = match mode {
            Mode::Bus => {
                let (decoded, chassis_tags) = bus_model(raw_model);
                special_attributes.extend(chassis_tags);
                VehicleModel::Bus(decoded)
            }
            Mode::Train | Mode::TrainLink => rolling_stock(raw_model),
            _ => match ctx.path.fixed_model() {
                Some(label) => VehicleModel::Label(label.to_string()),
                None => VehicleModel::Label(raw_model.to_string()),
            },
        };
        // The feed only ever asserts air conditioning, never its absence.
        aircon = match descriptor.air_conditioned {
            Some(true) => TriState::Yes,
            _ => TriState::Unknown,
        };
        wheelchair = match descriptor.wheelchair_accessible {
            None | Some(0) => TriState::Unknown,
            Some(1) => TriState::Yes,
            Some(_) => TriState::No,
        };
        if let Some(mask) = descriptor.special_vehicle_attributes
            && mask != 0
        {
            special_attributes.extend(special_attribute_tags(mask));
        }
    } else {
        model = VehicleModel::Label("unknown".to_string());
        aircon = TriState::Unknown;
        wheelchair = TriState::Unknown;
    }
    if mode == Mode::Bus {
        let urban = ctx.path.path() == "buses";
        special_attributes.extend(bus_route_tags(&trip.route, urban));
    }

    let vehicle = VehicleInstance {
        id: vehicle_pos
            .vehicle
            .as_ref()
            .and_then(|v| v.id.clone()),
        trip_id: vehicle_trip_id.to_string(),
        mode,
        last_position: LastPosition {
            time: vehicle_pos.timestamp,
            bearing,
            speed: vehicle_pos.position.as_ref().and_then(|p| p.speed),
            location: vehicle_pos.stop_id.clone(),
            coordinates,
        },
        instance_id,
        status: vehicle_pos.current_status.and_then(StopStatus::from_code),
        special_attributes,
        model,
        aircon,
        wheelchair,
        occupancy: vehicle_pos
            .occupancy_status
            .and_then(OccupancyStatus::from_code),
        consist: vehicle_pos
            .carriages
            .iter()
            .map(|c| Carriage {
                name: c.name.clone(),
                position_in_consist: c.position_in_consist,
                occupancy_status: c.occupancy_status.and_then(OccupancyStatus::from_code),
                quiet_carriage: c.quiet_carriage,
                toilet: c.toilet.and_then(ToiletStatus::from_code),
                luggage_rack: c.luggage_rack,
            })
            .collect(),
    };

    let stopping_pattern = StoppingPattern {
        timetable: stop_times.map(|rows| {
            rows.iter()
                .map(|row| StopEvent {
                    arr: row
                        .arrival_time
                        .clone()
                        .unwrap_or_else(|| "00:00:00".to_string()),
                    dep: row
                        .departure_time
                        .clone()
                        .unwrap_or_else(|| "00:00:00".to_string()),
                    stop_id: row.stop_id.clone().unwrap_or_else(|| "0".to_string()),
                    headsign: row.stop_headsign.clone().filter(|h| !h.is_empty()),
                    pick_up: row.pickup_type == Some(1),
                    drop_off: row.drop_off_type == Some(1),
                    timepoint: row.timepoint == Some(1),
                    distance: row.shape_dist_traveled.unwrap_or(0.0),
                    note: row.stop_note.clone().filter(|n| !n.is_empty()),
                    stop: None,
                })
                .collect()
        }),
    };

    Some(FusedEntity {
        trip,
        vehicle,
        stopping_pattern,
    })
}
