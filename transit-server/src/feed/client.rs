//! Live feed HTTP client.
//!
//! Fetches and decodes the vehicle-position and trip-update protobuf
//! feeds for a feed path. Handles authentication, bounds concurrent
//! requests, and caps response size.

use std::sync::Arc;

use reqwest::header::{HeaderMap, HeaderValue};
use tokio::sync::Semaphore;

use crate::domain::FeedPath;

use super::error::FeedError;
use super::proto::{self, FeedMessage};
use super::{FeedKind, FeedSource};

/// Default base URL for the transit API.
const DEFAULT_BASE_URL: &str = "https://api.transport.nsw.gov.au";

/// Default maximum concurrent requests.
const DEFAULT_MAX_CONCURRENT: usize = 8;

/// Maximum accepted protobuf payload (50 MB).
const MAX_PAYLOAD_SIZE: usize = 50 * 1024 * 1024;

/// Configuration for the feed client.
#[derive(Debug, Clone)]
pub struct FeedConfig {
    /// API key for authentication
    pub api_key: String,
    /// Base URL for the API (defaults to production)
    pub base_url: String,
    /// Maximum concurrent requests
    pub max_concurrent: usize,
    /// Request timeout in seconds
    pub timeout_secs: u64,
}

impl FeedConfig {
    /// Create a new config with the given API key.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
            max_concurrent: DEFAULT_MAX_CONCURRENT,
            timeout_secs: 30,
        }
    }

    /// Set a custom base URL (for testing).
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    /// Set maximum concurrent requests.
    pub fn with_max_concurrent(mut self, n: usize) -> Self {
        self.max_concurrent = n;
        self
    }

    /// Set request timeout.
    pub fn with_timeout(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }
}

/// Live feed API client.
///
/// Uses a semaphore to limit concurrent requests so a burst of stale
/// paths refreshing together does not trip upstream rate limits.
#[derive(Debug, Clone)]
pub struct FeedClient {
    http: reqwest::Client,
    base_url: String,
    semaphore: Arc<Semaphore>,
}

impl FeedClient {
    /// Create a new feed client with the given configuration.
    pub fn new(config: FeedConfig) -> Result<Self, FeedError> {
        let mut headers = HeaderMap::new();

        let auth = HeaderValue::from_str(&format!("apikey {}", config.api_key)).map_err(|_| {
            FeedError::ApiError {
                status: 0,
                message: "Invalid API key format".to_string(),
            }
        })?;
        headers.insert(reqwest::header::AUTHORIZATION, auth);
        headers.insert(
            reqwest::header::ACCEPT,
            HeaderValue::from_static("application/x-google-protobuf"),
        );

        let http = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            http,
            base_url: config.base_url,
            semaphore: Arc::new(Semaphore::new(config.max_concurrent)),
        })
    }

    fn feed_url(&self, path: &FeedPath, kind: FeedKind) -> String {
        let endpoint = match kind {
            FeedKind::VehiclePositions => "vehiclepos",
            FeedKind::TripUpdates => "realtime",
        };
        format!(
            "{}/v{}/gtfs/{}/{}",
            self.base_url,
            path.realtime_version(),
            endpoint,
            path.path()
        )
    }

    /// Fetch and decode one feed for a path.
    pub async fn fetch_feed(
        &self,
        path: &FeedPath,
        kind: FeedKind,
    ) -> Result<FeedMessage, FeedError> {
        let _permit = self
            .semaphore
            .acquire()
            .await
            .map_err(|_| FeedError::ApiError {
                status: 0,
                message: "Semaphore closed".to_string(),
            })?;

        let url = self.feed_url(path, kind);
        let response = self.http.get(&url).send().await?;
        let status = response.status();

        if status == reqwest::StatusCode::UNAUTHORIZED
            || status == reqwest::StatusCode::FORBIDDEN
        {
            return Err(FeedError::Unauthorized);
        }

        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(FeedError::RateLimited);
        }

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(FeedError::ApiError {
                status: status.as_u16(),
                message: body,
            });
        }

        let bytes = response.bytes().await?;
        if bytes.len() > MAX_PAYLOAD_SIZE {
            return Err(FeedError::TooLarge { size: bytes.len() });
        }

        Ok(proto::decode_feed(&bytes)?)
    }
}

impl FeedSource for FeedClient {
    fn fetch(
        &self,
        path: &FeedPath,
        kind: FeedKind,
    ) -> impl std::future::Future<Output = Result<FeedMessage, FeedError>> + Send {
        self.fetch_feed(path, kind)
    }
}
