//! Real-time transit fusion server.
//!
//! Ingests live GTFS-realtime vehicle-position and trip-update feeds for
//! many independent feed paths, joins each record against the static
//! schedule tables, classifies trips, infers bearing for rail vehicles
//! from position history, and serves the fused snapshot over HTTP.

pub mod domain;
pub mod feed;
pub mod fusion;
pub mod query;
pub mod reference;
pub mod snapshot;
pub mod static_data;
pub mod web;
