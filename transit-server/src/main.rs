use std::collections::HashSet;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use tracing::{info, warn};

use transit_server::domain::nsw_feed_paths;
use transit_server::feed::{FeedClient, FeedConfig};
use transit_server::query::QueryService;
use transit_server::reference::ReferenceStore;
use transit_server::snapshot::{RefreshCoordinator, SnapshotCache};
use transit_server::static_data::{
    PreloadedSchedule, STATIC_REFRESH_INTERVAL, StaticDataGate, import_cycle,
};
use transit_server::web::{AppState, create_router};

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "transit_server=info".into()),
        )
        .init();

    let api_key = std::env::var("TRANSIT_API_KEY").unwrap_or_else(|_| {
        warn!("TRANSIT_API_KEY not set; feed fetches will fail");
        String::new()
    });
    let db_path =
        std::env::var("TRANSIT_DB_PATH").unwrap_or_else(|_| "cache/nsw/data.db".to_string());
    let cache_dir = PathBuf::from(
        std::env::var("TRANSIT_CACHE_DIR").unwrap_or_else(|_| "cache/nsw".to_string()),
    );
    let port: u16 = std::env::var("PORT")
        .ok()
        .and_then(|p| p.parse().ok())
        .unwrap_or(3000);

    let store = Arc::new(ReferenceStore::open(&db_path).expect("failed to open reference store"));

    // Warm restart: serve the persisted snapshots until the first feed
    // cycle lands.
    let cache = Arc::new(SnapshotCache::new(
        nsw_feed_paths(),
        Some(cache_dir.join("vehicles.json")),
    ));
    cache.load_persisted();

    let duplicate_runs = load_duplicate_runs(&cache_dir.join("train_duplicates.txt"));

    let feed_client =
        FeedClient::new(FeedConfig::new(&api_key)).expect("failed to create feed client");
    let coordinator = Arc::new(
        RefreshCoordinator::new(feed_client, Arc::clone(&store), Arc::clone(&cache))
            .with_duplicate_runs(duplicate_runs),
    );

    // Slow background loop re-checking the static schedule data, gated
    // per path. Requests answer 503 while an import is pending.
    let gate = Arc::new(StaticDataGate::new(nsw_feed_paths()));
    let import_gate = Arc::clone(&gate);
    tokio::spawn(async move {
        let importer = PreloadedSchedule;
        let mut interval = tokio::time::interval(STATIC_REFRESH_INTERVAL);
        loop {
            interval.tick().await;
            import_cycle(&import_gate, &importer, nsw_feed_paths()).await;
        }
    });

    let query = QueryService::new(coordinator, store);
    let state = AppState::new(query, gate);
    let app = create_router(state, "public");

    let addr = SocketAddr::from(([127, 0, 0, 1], port));
    info!(%addr, paths = nsw_feed_paths().len(), "transit server listening");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("failed to bind listener");
    axum::serve(listener, app).await.expect("server error");
}

/// Run numbers duplicated across the train feeds, one per line.
/// Missing file means nothing is suppressed.
fn load_duplicate_runs(path: &std::path::Path) -> HashSet<String> {
    match std::fs::read_to_string(path) {
        Ok(contents) => contents
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .map(str::to_string)
            .collect(),
        Err(_) => HashSet::new(),
    }
}
