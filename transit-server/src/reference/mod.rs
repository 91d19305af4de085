//! Reference lookup client.
//!
//! Batched key-set queries against the static schedule tables in
//! SQLite. The tables themselves are owned by the external schedule
//! import pipeline; this module only reads them. Table names are
//! prefixed with the feed path's working name (`sydneytrains_trips`),
//! facilities live in a shared `location_facilities` table.

mod rows;
mod store;

pub use rows::{
    AgencyRow, FacilityRow, NoteRow, RouteRow, ShapePointRow, StopRow, StopTimeRow, TripRow,
    VehicleCategoryRow,
};
pub use store::{ReferenceBundle, ReferenceStore, StoreError};
