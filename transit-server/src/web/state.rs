//! Application state for the web layer.

use std::sync::Arc;

use crate::feed::FeedClient;
use crate::query::QueryService;
use crate::static_data::StaticDataGate;

/// Shared application state.
///
/// Contains all the services needed to handle requests.
#[derive(Clone)]
pub struct AppState {
    /// Query service over the snapshot cache and reference tables
    pub query: Arc<QueryService<FeedClient>>,

    /// Readiness gate for the static schedule data
    pub gate: Arc<StaticDataGate>,
}

impl AppState {
    /// Create a new app state.
    pub fn new(query: QueryService<FeedClient>, gate: Arc<StaticDataGate>) -> Self {
        Self {
            query: Arc::new(query),
            gate,
        }
    }
}
