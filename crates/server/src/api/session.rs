use std::sync::Arc;

use appetiser_core::{SessionState, TrackKey};
use axum::{extract::State, Json};
use serde::Deserialize;

use super::handlers::{store_error, ApiError};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct SelectTrackRequest {
    pub key: TrackKey,
}

/// GET /api/v1/session
pub async fn get_session(
    State(state): State<Arc<AppState>>,
) -> Result<Json<SessionState>, ApiError> {
    state.store().session().map(Json).map_err(store_error)
}

/// PUT /api/v1/session/selected
pub async fn select_track(
    State(state): State<Arc<AppState>>,
    Json(request): Json<SelectTrackRequest>,
) -> Result<Json<SessionState>, ApiError> {
    let store = state.store();
    store.select(request.key).map_err(store_error)?;
    store.touch_last_active().map_err(store_error)?;
    store.session().map(Json).map_err(store_error)
}
