use axum::{
    middleware,
    routing::{get, put},
    Router,
};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use super::{handlers, middleware::metrics_middleware, search, session, tracks, ws};
use crate::state::AppState;

pub fn create_router(state: Arc<AppState>) -> Router {
    // API routes
    let api_routes = Router::new()
        // Health and config
        .route("/health", get(handlers::health))
        .route("/config", get(handlers::get_config))
        // Search
        .route("/search", get(search::search))
        // Tracks
        .route("/tracks", get(tracks::list_tracks))
        .route("/tracks/stats", get(tracks::get_stats))
        .route("/tracks/{key}", get(tracks::get_track))
        .route("/tracks/{key}/artwork", get(tracks::get_artwork))
        // Session
        .route("/session", get(session::get_session))
        .route("/session/selected", put(session::select_track))
        // Change stream
        .route("/ws", get(ws::ws_handler));

    Router::new()
        .nest("/api/v1", api_routes)
        .route("/metrics", get(handlers::get_metrics))
        .with_state(state)
        .layer(middleware::from_fn(metrics_middleware))
        .layer(TraceLayer::new_for_http())
}
