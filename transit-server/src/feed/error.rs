//! Feed client error types.

use std::fmt;

/// Errors from the live feed client.
#[derive(Debug)]
pub enum FeedError {
    /// HTTP request failed (network error, timeout, etc.)
    Http(reqwest::Error),

    /// Protobuf payload did not match the feed schema
    Decode(prost::DecodeError),

    /// API returned an error status code
    ApiError { status: u16, message: String },

    /// Response body exceeded the size cap
    TooLarge { size: usize },

    /// Rate limited by the API
    RateLimited,

    /// Invalid API key or unauthorized
    Unauthorized,
}

impl fmt::Display for FeedError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FeedError::Http(e) => write!(f, "HTTP error: {e}"),
            FeedError::Decode(e) => write!(f, "feed decode error: {e}"),
            FeedError::ApiError { status, message } => {
                write!(f, "API error {status}: {message}")
            }
            FeedError::TooLarge { size } => {
                write!(f, "feed payload too large: {size} bytes")
            }
            FeedError::RateLimited => write!(f, "rate limited by feed API"),
            FeedError::Unauthorized => write!(f, "unauthorized (invalid API key)"),
        }
    }
}

impl std::error::Error for FeedError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            FeedError::Http(e) => Some(e),
            FeedError::Decode(e) => Some(e),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for FeedError {
    fn from(err: reqwest::Error) -> Self {
        FeedError::Http(err)
    }
}

impl From<prost::DecodeError> for FeedError {
    fn from(err: prost::DecodeError) -> Self {
        FeedError::Decode(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display() {
        let err = FeedError::ApiError {
            status: 500,
            message: "Internal Server Error".into(),
        };
        assert_eq!(err.to_string(), "API error 500: Internal Server Error");

        let err = FeedError::TooLarge { size: 1024 };
        assert_eq!(err.to_string(), "feed payload too large: 1024 bytes");

        let err = FeedError::Unauthorized;
        assert!(err.to_string().contains("unauthorized"));
    }
}
