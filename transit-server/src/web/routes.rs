//! HTTP route handlers.

use axum::{
    Json, Router,
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
};
use tower_http::services::ServeDir;

use crate::domain::Mode;
use crate::query::{BoundingBox, QueryError};

use super::dto::*;
use super::state::AppState;

/// Create the application router.
///
/// `static_dir` is the path to the static assets directory.
pub fn create_router(state: AppState, static_dir: &str) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/nsw/available", get(available))
        .route("/api/nsw/vehicles", get(vehicles))
        .route("/api/nsw/stops", get(stops))
        .route("/api/nsw/route_shape", get(route_shape))
        .route("/api/nsw/instance", get(instance))
        .route("/api/nsw/routes", get(routes))
        .fallback_service(ServeDir::new(static_dir))
        .with_state(state)
}

/// Health check endpoint.
async fn health() -> &'static str {
    "ok"
}

/// Readiness probe: 503 while any feed's schedule import is pending.
async fn available(State(state): State<AppState>) -> StatusCode {
    if state.gate.any_pending() {
        StatusCode::SERVICE_UNAVAILABLE
    } else {
        StatusCode::OK
    }
}

/// Reject data requests while the schedule tables are being reloaded.
fn check_ready(state: &AppState) -> Result<(), AppError> {
    if state.gate.any_pending() {
        Err(AppError::Unavailable)
    } else {
        Ok(())
    }
}

/// Parse the comma-separated `type` parameter; unknown names are
/// ignored.
fn parse_modes(raw: Option<&str>) -> Vec<Mode> {
    raw.unwrap_or_default()
        .to_lowercase()
        .split(',')
        .filter_map(|m| Mode::parse(m.trim()).ok())
        .collect()
}

/// Live vehicles grouped by mode, filtered to a bounding box.
async fn vehicles(
    State(state): State<AppState>,
    Query(req): Query<AreaQuery>,
) -> Result<Response, AppError> {
    check_ready(&state)?;
    let modes = parse_modes(req.modes.as_deref());
    let bbox = BoundingBox::from_query(req.min_lat, req.max_lat, req.min_lng, req.max_lng);
    let grouped = state.query.find_vehicles(&modes, bbox);
    Ok(Json(grouped).into_response())
}

/// Static stops grouped by mode, filtered to a bounding box.
async fn stops(
    State(state): State<AppState>,
    Query(req): Query<AreaQuery>,
) -> Result<Response, AppError> {
    check_ready(&state)?;
    let modes = parse_modes(req.modes.as_deref());
    let bbox = BoundingBox::from_query(req.min_lat, req.max_lat, req.min_lng, req.max_lng);
    let grouped = state.query.find_stops(&modes, bbox)?;
    Ok(Json(grouped).into_response())
}

/// Shape polylines for the requested shape ids.
async fn route_shape(
    State(state): State<AppState>,
    Query(req): Query<RouteShapeQuery>,
) -> Result<Response, AppError> {
    check_ready(&state)?;
    let shapes = state
        .query
        .route_shapes(
            &req.path,
            req.routes.as_deref().unwrap_or_default(),
            req.cache.unwrap_or(false),
        )
        .await?;
    Ok(Json(shapes).into_response())
}

/// Resolve a vehicle or stop instance id.
async fn instance(
    State(state): State<AppState>,
    Query(req): Query<InstanceQuery>,
) -> Result<Response, AppError> {
    check_ready(&state)?;
    let raw = req.instance_id.unwrap_or_default();
    let record = state.query.find_instance(&raw)?;
    Ok(Json(record).into_response())
}

/// All static routes grouped by mode.
async fn routes(State(state): State<AppState>) -> Result<Response, AppError> {
    check_ready(&state)?;
    Ok(Json(state.query.list_routes()).into_response())
}

/// Application error type.
#[derive(Debug)]
pub enum AppError {
    BadRequest { message: String },
    NotFound { message: String },
    Unavailable,
    Internal { message: String },
}

impl From<QueryError> for AppError {
    fn from(e: QueryError) -> Self {
        match e {
            QueryError::BadRequest(message) => AppError::BadRequest { message },
            QueryError::NotFound(message) => AppError::NotFound { message },
            QueryError::Store(e) => AppError::Internal {
                message: e.to_string(),
            },
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AppError::BadRequest { message } => (StatusCode::BAD_REQUEST, message),
            AppError::NotFound { message } => (StatusCode::NOT_FOUND, message),
            AppError::Unavailable => (
                StatusCode::SERVICE_UNAVAILABLE,
                "schedule data update in progress".to_string(),
            ),
            AppError::Internal { message } => (StatusCode::INTERNAL_SERVER_ERROR, message),
        };

        tracing::error!(status = %status, message, "request failed");

        let body = Json(ErrorResponse { error: message });
        (status, body).into_response()
    }
}
