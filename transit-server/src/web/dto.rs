//! Data transfer objects for web requests and responses.

use serde::{Deserialize, Serialize};

/// Query parameters shared by the vehicles and stops endpoints.
#[derive(Debug, Deserialize)]
pub struct AreaQuery {
    /// Comma-separated list of modes (e.g. `train,bus`)
    #[serde(rename = "type")]
    pub modes: Option<String>,

    pub min_lat: Option<f64>,
    pub max_lat: Option<f64>,
    pub min_lng: Option<f64>,
    pub max_lng: Option<f64>,
}

/// Query parameters for the route-shape endpoint.
#[derive(Debug, Deserialize)]
pub struct RouteShapeQuery {
    /// Working name of the feed path owning the shape tables
    pub path: String,

    /// Comma-separated `shapeId[;routeId]` pairs
    pub routes: Option<String>,

    /// Whether computed shapes are written to the side cache
    pub cache: Option<bool>,
}

/// Query parameters for the instance endpoint.
#[derive(Debug, Deserialize)]
pub struct InstanceQuery {
    #[serde(rename = "instanceId")]
    pub instance_id: Option<String>,
}

/// JSON error body.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}
