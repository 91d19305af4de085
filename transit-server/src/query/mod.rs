//! Query service over the snapshot cache and reference tables.

mod bbox;
mod service;
mod stops;

pub use bbox::BoundingBox;
pub use service::{
    InstanceRecord, PolyPoint, QueryError, QueryService, RouteListing, ShapeRecord,
    VehicleListEntry,
};
pub use stops::{StopRecord, fix_stop_id};
