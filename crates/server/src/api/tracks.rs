//! Track API handlers.

use std::sync::Arc;

use appetiser_core::{
    ArtworkError, ContentLocation, Track, TrackKey, TrackQuery, TrackSort, TrackStats,
};
use axum::{
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::warn;

use super::handlers::{api_error, store_error, ApiError};
use crate::state::AppState;

// ============================================================================
// Request/Response types
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct TrackQueryParams {
    #[serde(default)]
    pub filter: Option<String>,
    #[serde(default)]
    pub sort: TrackSort,
    #[serde(default = "default_limit")]
    pub limit: u32,
}

fn default_limit() -> u32 {
    100
}

#[derive(Debug, Serialize)]
pub struct TrackListResponse {
    pub tracks: Vec<Track>,
    pub total: usize,
}

#[derive(Debug, Serialize)]
pub struct TrackStatsResponse {
    #[serde(flatten)]
    pub stats: TrackStats,
    /// Fetches tracked by the artwork cache manager right now.
    pub fetches_in_flight: usize,
}

// ============================================================================
// Handlers
// ============================================================================

/// GET /api/v1/tracks
///
/// List stored tracks, optionally filtered by display name.
pub async fn list_tracks(
    State(state): State<Arc<AppState>>,
    Query(params): Query<TrackQueryParams>,
) -> Result<Json<TrackListResponse>, ApiError> {
    let query = TrackQuery::new()
        .with_filter(params.filter.unwrap_or_default())
        .with_sort(params.sort)
        .with_limit(params.limit);

    let tracks = state.store().query(&query).map_err(store_error)?;
    let total = tracks.len();
    Ok(Json(TrackListResponse { tracks, total }))
}

/// GET /api/v1/tracks/stats
pub async fn get_stats(
    State(state): State<Arc<AppState>>,
) -> Result<Json<TrackStatsResponse>, ApiError> {
    let stats = state.store().stats().map_err(store_error)?;
    Ok(Json(TrackStatsResponse {
        stats,
        fetches_in_flight: state.artwork().in_flight_count(),
    }))
}

/// GET /api/v1/tracks/{key}
pub async fn get_track(
    State(state): State<Arc<AppState>>,
    Path(key): Path<i64>,
) -> Result<Json<Track>, ApiError> {
    let key = TrackKey::new(key);
    match state.store().get(key).map_err(store_error)? {
        Some(track) => Ok(Json(track)),
        None => Err(api_error(
            StatusCode::NOT_FOUND,
            format!("Track not found: {}", key),
        )),
    }
}

/// GET /api/v1/tracks/{key}/artwork
///
/// Serve the locally cached artwork bytes. 404 until the fetch has completed.
pub async fn get_artwork(
    State(state): State<Arc<AppState>>,
    Path(key): Path<i64>,
) -> Result<Response, ApiError> {
    let key = TrackKey::new(key);
    let track = state
        .store()
        .get(key)
        .map_err(store_error)?
        .ok_or_else(|| api_error(StatusCode::NOT_FOUND, format!("Track not found: {}", key)))?;

    let location = track.local_artwork.ok_or_else(|| {
        api_error(
            StatusCode::NOT_FOUND,
            format!("Artwork not cached for track {}", key),
        )
    })?;

    match state.content().read(&location).await {
        Ok(bytes) => Ok((
            [(header::CONTENT_TYPE, content_type_for(&location))],
            bytes,
        )
            .into_response()),
        Err(e @ ArtworkError::ContentMissing(_)) => {
            warn!("Track {} references missing artwork: {}", key, e);
            Err(api_error(StatusCode::NOT_FOUND, e))
        }
        Err(e) => Err(api_error(StatusCode::INTERNAL_SERVER_ERROR, e)),
    }
}

fn content_type_for(location: &ContentLocation) -> &'static str {
    match location.as_str().rsplit_once('.').map(|(_, ext)| ext) {
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("png") => "image/png",
        Some("gif") => "image/gif",
        _ => "application/octet-stream",
    }
}
