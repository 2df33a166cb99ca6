//! Prometheus metrics for core components.
//!
//! This module provides metrics for:
//! - Artwork cache (fetches, durations, cancellations)
//! - Track store (upserts)
//! - Search provider (requests, result counts)

use once_cell::sync::Lazy;
use prometheus::{HistogramOpts, HistogramVec, IntCounter, IntCounterVec, Opts};

// =============================================================================
// Artwork Cache Metrics
// =============================================================================

/// Artwork fetches total by result.
pub static ARTWORK_FETCHES: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("appetiser_artwork_fetches_total", "Total artwork fetches"),
        &["result"], // "success", "failed", "timeout", "stale"
    )
    .unwrap()
});

/// Artwork fetch duration in seconds.
pub static ARTWORK_FETCH_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    HistogramVec::new(
        HistogramOpts::new(
            "appetiser_artwork_fetch_duration_seconds",
            "Duration of artwork fetch and write",
        )
        .buckets(vec![0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0]),
        &["result"],
    )
    .unwrap()
});

/// Fetches scheduled by reconcile passes.
pub static ARTWORK_FETCHES_SCHEDULED: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new(
        "appetiser_artwork_fetches_scheduled_total",
        "Total artwork fetches scheduled",
    )
    .unwrap()
});

/// In-flight fetches aborted because a newer batch superseded them.
pub static ARTWORK_FETCHES_CANCELLED: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new(
        "appetiser_artwork_fetches_cancelled_total",
        "Total artwork fetches cancelled by a newer batch",
    )
    .unwrap()
});

/// Bytes of artwork written to the cache.
pub static ARTWORK_BYTES_WRITTEN: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new(
        "appetiser_artwork_bytes_written_total",
        "Total artwork bytes written",
    )
    .unwrap()
});

// =============================================================================
// Track Store Metrics
// =============================================================================

/// Track upserts by outcome.
pub static TRACK_UPSERTS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("appetiser_track_upserts_total", "Total track upserts"),
        &["outcome"], // "inserted", "updated", "skipped", "error"
    )
    .unwrap()
});

// =============================================================================
// Search Metrics
// =============================================================================

/// Search requests by result.
pub static SEARCH_REQUESTS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("appetiser_search_requests_total", "Total search requests"),
        &["result"], // "success", "error"
    )
    .unwrap()
});

/// Search results returned per request.
pub static SEARCH_RESULTS: Lazy<HistogramVec> = Lazy::new(|| {
    HistogramVec::new(
        HistogramOpts::new(
            "appetiser_search_results",
            "Number of search results returned per query",
        )
        .buckets(vec![0.0, 1.0, 5.0, 10.0, 25.0, 50.0, 100.0, 200.0]),
        &[],
    )
    .unwrap()
});

// =============================================================================
// Helper functions
// =============================================================================

/// Get all core metrics for registration in a registry.
pub fn all_metrics() -> Vec<Box<dyn prometheus::core::Collector>> {
    vec![
        // Artwork
        Box::new(ARTWORK_FETCHES.clone()),
        Box::new(ARTWORK_FETCH_DURATION.clone()),
        Box::new(ARTWORK_FETCHES_SCHEDULED.clone()),
        Box::new(ARTWORK_FETCHES_CANCELLED.clone()),
        Box::new(ARTWORK_BYTES_WRITTEN.clone()),
        // Store
        Box::new(TRACK_UPSERTS.clone()),
        // Search
        Box::new(SEARCH_REQUESTS.clone()),
        Box::new(SEARCH_RESULTS.clone()),
    ]
}
