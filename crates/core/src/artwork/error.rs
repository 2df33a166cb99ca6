//! Error types for the artwork module.

use std::path::PathBuf;
use thiserror::Error;

use crate::track::{ContentLocation, TrackError};

/// Errors that can occur while fetching or storing artwork.
#[derive(Debug, Error)]
pub enum ArtworkError {
    /// HTTP request failed.
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Remote answered with a non-success status.
    #[error("Artwork request to {url} returned status {status}")]
    Status { url: String, status: u16 },

    /// Remote answered with an empty body.
    #[error("Artwork response from {url} was empty")]
    EmptyBody { url: String },

    /// Fetch did not complete within the configured timeout.
    #[error("Artwork fetch timed out after {secs}s")]
    Timeout { secs: u64 },

    /// Failed to write content to the cache.
    #[error("Failed to write artwork to {path}")]
    WriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Location does not name a file inside the cache directory.
    #[error("Invalid content location: {0}")]
    InvalidLocation(String),

    /// No content exists at the given location.
    #[error("Content not found: {0}")]
    ContentMissing(ContentLocation),

    /// The fetch limiter was closed.
    #[error("Artwork cache is shutting down")]
    ShuttingDown,

    /// Store operation failed.
    #[error("Track store error: {0}")]
    Store(#[from] TrackError),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl ArtworkError {
    /// Creates a write failed error.
    pub fn write_failed(path: PathBuf, source: std::io::Error) -> Self {
        Self::WriteFailed { path, source }
    }

    /// Metric label for a failed fetch.
    pub fn result_label(&self) -> &'static str {
        match self {
            Self::Timeout { .. } => "timeout",
            _ => "failed",
        }
    }
}
