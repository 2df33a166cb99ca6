//! Types for the artwork cache.

use serde::{Deserialize, Serialize};

use super::error::ArtworkError;
use crate::track::{ContentLocation, TrackKey};

/// Outcome of one reconcile pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconcileReport {
    /// Fetches started by this pass.
    pub scheduled: usize,
    /// Tracks that already have local artwork.
    pub already_cached: usize,
    /// Tracks with a fetch already outstanding.
    pub in_flight: usize,
    /// Tracks without a usable remote artwork reference.
    pub no_artwork: usize,
    /// Outstanding fetches aborted because their track left the batch.
    pub cancelled: usize,
}

/// Identifies one scheduled fetch. Strictly increasing per manager.
pub type AttemptId = u64;

/// Result of a fetch task, handed to the completion applier.
#[derive(Debug)]
pub struct FetchCompletion {
    pub key: TrackKey,
    pub attempt: AttemptId,
    pub result: Result<ContentLocation, ArtworkError>,
}
