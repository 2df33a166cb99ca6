//! Types for the search orchestrator.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::artwork::ReconcileReport;
use crate::track::{Track, TrackError};

/// Errors that can occur while running a search.
#[derive(Debug, Error)]
pub enum OrchestratorError {
    /// Track store error.
    #[error("track store error: {0}")]
    TrackStore(#[from] TrackError),
}

/// Result of one search.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchOutcome {
    /// The trimmed search term.
    pub term: String,
    /// Stored tracks whose name matches the term, sorted by name.
    pub tracks: Vec<Track>,
    /// Results seen for the first time.
    pub inserted: usize,
    /// Results merged into existing tracks.
    pub updated: usize,
    /// Results dropped because they had no usable key.
    pub skipped: usize,
    /// What the artwork cache did with the batch.
    pub reconcile: ReconcileReport,
}
