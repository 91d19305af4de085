//! Domain types for the transit fusion server.
//!
//! This module contains the core domain model types that represent
//! validated transit data. All types enforce their invariants at
//! construction time, so code that receives these types can trust
//! their validity.

mod codes;
mod feed_path;
mod headsign;
mod instance;
mod mode;

pub use codes::{OccupancyStatus, ScheduleRelationship, StopStatus, ToiletStatus};
pub use feed_path::{FeedPath, nsw_feed_paths, paths_for_mode};
pub use headsign::Headsign;
pub use instance::{
    InstanceId, InstanceKind, InvalidInstanceId, NON_TIMETABLED_PREFIX, service_day, trip_key,
};
pub use mode::{InvalidMode, Mode};
