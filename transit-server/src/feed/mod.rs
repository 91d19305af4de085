//! Live feed client and decoder.
//!
//! The upstream API serves two protobuf feeds per path: vehicle
//! positions and trip updates. Both use the GTFS-realtime schema with
//! operator extension fields (vehicle descriptor and consist details at
//! tag 1007). Decode failure means "no update this cycle", never an
//! empty feed.

mod client;
mod error;
pub mod proto;

pub use client::{FeedClient, FeedConfig};
pub use error::FeedError;

use crate::domain::FeedPath;
use proto::FeedMessage;

/// Which of the two live feeds to fetch for a path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedKind {
    VehiclePositions,
    TripUpdates,
}

/// Source of decoded live feed messages.
///
/// Implemented by [`FeedClient`] in production; tests inject scripted
/// sources to drive refresh cycles without network access.
pub trait FeedSource: Send + Sync + 'static {
    fn fetch(
        &self,
        path: &FeedPath,
        kind: FeedKind,
    ) -> impl std::future::Future<Output = Result<FeedMessage, FeedError>> + Send;
}
