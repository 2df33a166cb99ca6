//! Track store - the authoritative record of every search result seen.
//!
//! Tracks are keyed by their iTunes `trackId`. Search responses upsert into
//! the store; the artwork cache manager owns the artwork bookkeeping columns
//! (`local_artwork`, `fetch_state`) through the dedicated fetch-state methods.

mod payload;
mod sqlite;
mod types;

pub use payload::{PayloadError, TrackPayload};
pub use sqlite::SqliteTrackStore;
pub use types::*;

use chrono::{DateTime, Utc};

/// Trait for track storage backends.
pub trait TrackStore: Send + Sync {
    /// Insert a new track or merge the payload into the existing one.
    ///
    /// Fields absent from the payload keep their previous values. Artwork
    /// location and fetch state are never touched.
    fn upsert(&self, payload: &TrackPayload) -> Result<UpsertResult, TrackError>;

    /// Get a track by key.
    fn get(&self, key: TrackKey) -> Result<Option<Track>, TrackError>;

    /// List tracks matching the query. Empty when nothing matches.
    fn query(&self, query: &TrackQuery) -> Result<Vec<Track>, TrackError>;

    /// Number of stored tracks.
    fn count(&self) -> Result<u64, TrackError>;

    /// Store statistics.
    fn stats(&self) -> Result<TrackStats, TrackError>;

    /// Remove a track.
    fn remove(&self, key: TrackKey) -> Result<(), TrackError>;

    /// Atomically mark an eligible track as `InFlight`.
    ///
    /// Eligible means: remote artwork present, no local artwork, and not
    /// already in flight. Returns the updated track, or `None` if the track is
    /// missing or not eligible.
    fn begin_fetch(&self, key: TrackKey) -> Result<Option<Track>, TrackError>;

    /// Record the artwork location and return to `Idle`.
    ///
    /// No-op (returns `None`) when the track already has a location.
    fn complete_fetch(
        &self,
        key: TrackKey,
        location: &ContentLocation,
    ) -> Result<Option<Track>, TrackError>;

    /// Move an in-flight track to `Failed`.
    fn fail_fetch(&self, key: TrackKey) -> Result<Option<Track>, TrackError>;

    /// Move an in-flight track back to `Idle` after its fetch was cancelled.
    fn release_fetch(&self, key: TrackKey) -> Result<Option<Track>, TrackError>;

    /// Reset every `InFlight` track to `Idle`. Returns the number reset.
    fn reset_in_flight(&self) -> Result<usize, TrackError>;

    /// All artwork locations currently referenced by tracks.
    fn referenced_locations(&self) -> Result<Vec<ContentLocation>, TrackError>;

    /// Current session state.
    fn session(&self) -> Result<SessionState, TrackError>;

    /// Remember the selected track. Fails with `NotFound` for unknown keys.
    fn select(&self, key: TrackKey) -> Result<(), TrackError>;

    /// Record activity now and return the timestamp.
    fn touch_last_active(&self) -> Result<DateTime<Utc>, TrackError>;
}
