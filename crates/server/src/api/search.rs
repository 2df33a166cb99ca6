//! Search API handler.

use std::sync::Arc;

use appetiser_core::SearchOutcome;
use axum::{
    extract::{Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use tracing::error;

use super::handlers::{api_error, ApiError};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct SearchParams {
    #[serde(default)]
    pub term: String,
}

/// GET /api/v1/search?term=
///
/// Runs a remote search, stores the results and schedules artwork fetches.
/// Returns as soon as the fetches are scheduled; completions arrive over the
/// change stream.
pub async fn search(
    State(state): State<Arc<AppState>>,
    Query(params): Query<SearchParams>,
) -> Result<Json<SearchOutcome>, ApiError> {
    match state.orchestrator().search(&params.term).await {
        Ok(outcome) => Ok(Json(outcome)),
        Err(e) => {
            error!("Search '{}' failed: {}", params.term, e);
            Err(api_error(StatusCode::INTERNAL_SERVER_ERROR, e))
        }
    }
}
