//! Real-time fusion: composing live feed records with reference data
//! into fused vehicle-trip entities.

mod attributes;
mod bearing;
mod classify;
mod compose;
mod entity;
mod vehicle_model;

pub use attributes::{bus_route_tags, special_attribute_tags};
pub use bearing::{initial_bearing, resolve_bearing};
pub use classify::{Classification, ClassifyInput, classify_trip};
pub use compose::{ComposeContext, compose_entity};
pub use entity::{
    AgencyRef, BusModel, Carriage, Coordinates, FusedEntity, LastPosition, RouteDescriptor,
    Snapshot, StopEvent, StopRef, StoppingPattern, TriState, TripInstance, VehicleInstance,
    VehicleModel,
};
pub use vehicle_model::{bus_model, rolling_stock};
