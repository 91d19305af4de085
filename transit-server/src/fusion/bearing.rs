//! Bearing continuity for rail vehicles.
//!
//! The rail feeds omit the bearing field, so it is derived from the
//! previous cached position. A stationary vehicle keeps its cached
//! bearing rather than recomputing it, which would flip markers around
//! at random while the vehicle sits at a platform.

use super::entity::{Coordinates, LastPosition};

/// Initial bearing of the great circle from `from` to `to`, in degrees
/// [0, 360) rounded to two decimals.
pub fn initial_bearing(from: Coordinates, to: Coordinates) -> f64 {
    let phi1 = from.lat.to_radians();
    let phi2 = to.lat.to_radians();
    let delta_lambda = (to.lng - from.lng).to_radians();

    let x = delta_lambda.sin() * phi2.cos();
    let y = phi1.cos() * phi2.sin() - phi1.sin() * phi2.cos() * delta_lambda.cos();

    let degrees = x.atan2(y).to_degrees();
    let rounded = ((degrees + 360.0) * 100.0).round() / 100.0;
    rounded % 360.0
}

/// Resolve the bearing for a new position against the previous cached
/// one.
///
/// No previous position: the feed value is taken verbatim. Identical
/// coordinates: the cached bearing carries over unchanged (zero when the
/// cache held none). Otherwise the bearing is computed from the two
/// points.
pub fn resolve_bearing(
    previous: Option<&LastPosition>,
    current: Option<Coordinates>,
    feed_bearing: Option<f64>,
) -> Option<f64> {
    let (Some(previous), Some(current)) = (previous, current) else {
        return feed_bearing;
    };
    let Some(prev_coords) = previous.coordinates else {
        return feed_bearing;
    };

    if prev_coords.lat == current.lat && prev_coords.lng == current.lng {
        Some(previous.bearing.unwrap_or(0.0))
    } else {
        Some(initial_bearing(prev_coords, current))
    }
}
