//! Search providers that return raw result payloads.

mod itunes;

pub use itunes::ItunesSearcher;

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

/// Errors that can occur when querying a search API.
#[derive(Debug, Error)]
pub enum SearchError {
    /// HTTP request failed.
    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    /// API returned an error.
    #[error("API error: {status} - {message}")]
    ApiError { status: u16, message: String },

    /// Failed to parse response.
    #[error("Failed to parse response: {0}")]
    ParseError(String),

    /// Provider is misconfigured.
    #[error("Invalid search configuration: {0}")]
    InvalidConfig(String),
}

/// A source of raw search results.
///
/// Implementations swallow their own failures: a failed search is logged and
/// yields an empty list.
#[async_trait]
pub trait SearchProvider: Send + Sync {
    /// Name of this provider, for logging.
    fn name(&self) -> &str;

    /// Search for `term` and return the raw result objects.
    async fn search(&self, term: &str) -> Vec<Value>;
}
