//! iTunes Search API client.
//!
//! The API is public and needs no key. Results are returned untouched so the
//! track layer owns the field mapping.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Url};
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, warn};

use super::{SearchError, SearchProvider};
use crate::config::SearchConfig;
use crate::metrics::{SEARCH_REQUESTS, SEARCH_RESULTS};

/// iTunes Search API client.
pub struct ItunesSearcher {
    client: Client,
    endpoint: Url,
    country: String,
    media: String,
    limit: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct ItunesSearchResponse {
    #[serde(default)]
    results: Vec<Value>,
}

impl ItunesSearcher {
    /// Create a new client from configuration.
    pub fn new(config: &SearchConfig) -> Result<Self, SearchError> {
        let base = Url::parse(&config.base_url)
            .map_err(|e| SearchError::InvalidConfig(format!("base_url: {}", e)))?;
        let endpoint = base
            .join("search")
            .map_err(|e| SearchError::InvalidConfig(format!("base_url: {}", e)))?;

        let client = Client::builder()
            .timeout(Duration::from_secs(u64::from(config.timeout_secs)))
            .build()?;

        Ok(Self {
            client,
            endpoint,
            country: config.country.clone(),
            media: config.media.clone(),
            limit: config.limit,
        })
    }

    /// The request URL for `term`.
    pub fn request_url(&self, term: &str) -> Url {
        let mut url = self.endpoint.clone();
        {
            let mut pairs = url.query_pairs_mut();
            pairs
                .append_pair("term", term)
                .append_pair("country", &self.country)
                .append_pair("media", &self.media);
            if let Some(limit) = self.limit {
                pairs.append_pair("limit", &limit.to_string());
            }
        }
        url
    }

    /// Search and surface failures to the caller.
    pub async fn try_search(&self, term: &str) -> Result<Vec<Value>, SearchError> {
        let term = term.trim();
        if term.is_empty() {
            return Ok(Vec::new());
        }

        let url = self.request_url(term);
        debug!("iTunes search: term='{}'", term);

        let response = self.client.get(url).send().await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SearchError::ApiError {
                status: status.as_u16(),
                message: body,
            });
        }

        let body = response.text().await?;
        parse_results(&body)
    }
}

/// Extract the `results` array from a search response body.
fn parse_results(body: &str) -> Result<Vec<Value>, SearchError> {
    let response: ItunesSearchResponse = serde_json::from_str(body).map_err(|e| {
        SearchError::ParseError(format!("Failed to parse search response: {}", e))
    })?;
    Ok(response.results)
}

#[async_trait]
impl SearchProvider for ItunesSearcher {
    fn name(&self) -> &str {
        "itunes"
    }

    async fn search(&self, term: &str) -> Vec<Value> {
        match self.try_search(term).await {
            Ok(results) => {
                SEARCH_REQUESTS.with_label_values(&["success"]).inc();
                SEARCH_RESULTS
                    .with_label_values(&[])
                    .observe(results.len() as f64);
                debug!("iTunes search '{}' returned {} results", term, results.len());
                results
            }
            Err(e) => {
                SEARCH_REQUESTS.with_label_values(&["error"]).inc();
                warn!("iTunes search '{}' failed: {}", term, e);
                Vec::new()
            }
        }
    }
}
