//! Types for the track store.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Stable external identifier of a track (the iTunes `trackId`).
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct TrackKey(i64);

impl TrackKey {
    pub fn new(id: i64) -> Self {
        Self(id)
    }

    pub fn value(self) -> i64 {
        self.0
    }
}

impl From<i64> for TrackKey {
    fn from(id: i64) -> Self {
        Self(id)
    }
}

impl fmt::Display for TrackKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Opaque handle to persisted artwork content.
///
/// For the filesystem writer this is a file name relative to the cache directory.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContentLocation(String);

impl ContentLocation {
    pub fn new(location: impl Into<String>) -> Self {
        Self(location.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ContentLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Artwork download state of a track.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArtworkFetchState {
    /// No fetch outstanding.
    #[default]
    Idle,
    /// Exactly one fetch is outstanding for this track.
    InFlight,
    /// The last fetch failed. Eligible for a new attempt.
    Failed,
}

impl ArtworkFetchState {
    pub fn as_str(&self) -> &'static str {
        match self {
            ArtworkFetchState::Idle => "idle",
            ArtworkFetchState::InFlight => "in_flight",
            ArtworkFetchState::Failed => "failed",
        }
    }

    /// Parse the stored column value. Unknown values read as `Idle`.
    pub fn from_db(value: &str) -> Self {
        match value {
            "in_flight" => ArtworkFetchState::InFlight,
            "failed" => ArtworkFetchState::Failed,
            _ => ArtworkFetchState::Idle,
        }
    }
}

/// A search result item as held by the store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Track {
    pub key: TrackKey,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    /// Primary genre.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub short_description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub artist_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_advisory_rating: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price_minor_units: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rental_price_minor_units: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hd_price_minor_units: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub currency_code: Option<String>,
    /// Source URL of the artwork (validated at parse time).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remote_artwork: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub track_view_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub preview_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub release_date: Option<DateTime<Utc>>,
    /// Where the fetched artwork lives. `None` means not cached yet.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub local_artwork: Option<ContentLocation>,
    pub fetch_state: ArtworkFetchState,
    pub first_seen_at: DateTime<Utc>,
    pub last_seen_at: DateTime<Utc>,
    /// Number of search responses this track appeared in.
    pub seen_count: u32,
}

impl Track {
    /// Whether a reconcile pass should schedule a fetch for this track.
    pub fn needs_artwork(&self) -> bool {
        self.remote_artwork.is_some()
            && self.local_artwork.is_none()
            && self.fetch_state != ArtworkFetchState::InFlight
    }
}

/// Result of an upsert.
#[derive(Debug, Clone)]
pub struct UpsertResult {
    pub track: Track,
    /// True when the key had not been seen before.
    pub created: bool,
}

/// Sort order for track queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrackSort {
    #[default]
    NameAsc,
    NameDesc,
    LastSeenDesc,
}

/// Query for listing tracks.
#[derive(Debug, Clone, Default)]
pub struct TrackQuery {
    /// Case-insensitive substring matched against the display name.
    pub filter: Option<String>,
    pub sort: TrackSort,
    pub limit: Option<u32>,
}

impl TrackQuery {
    /// Create a query with no filter, sorted by name.
    pub fn new() -> Self {
        Self::default()
    }

    /// Filter by display name. Surrounding whitespace is dropped and empty
    /// terms are ignored.
    pub fn with_filter(mut self, filter: impl Into<String>) -> Self {
        let filter = filter.into();
        let filter = filter.trim();
        self.filter = if filter.is_empty() {
            None
        } else {
            Some(filter.to_string())
        };
        self
    }

    pub fn with_sort(mut self, sort: TrackSort) -> Self {
        self.sort = sort;
        self
    }

    pub fn with_limit(mut self, limit: u32) -> Self {
        self.limit = Some(limit);
        self
    }
}

/// Track store statistics.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackStats {
    pub total_tracks: u64,
    pub cached_artwork: u64,
    pub failed_artwork: u64,
    pub in_flight: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub oldest_seen: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub newest_seen: Option<DateTime<Utc>>,
}

/// Last selection and activity, persisted across restarts.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionState {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub selected: Option<TrackKey>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_active: Option<DateTime<Utc>>,
}

/// Errors for track store operations.
#[derive(Debug, Error)]
pub enum TrackError {
    #[error("Database error: {0}")]
    Database(String),

    #[error("Track not found: {0}")]
    NotFound(TrackKey),
}

impl From<rusqlite::Error> for TrackError {
    fn from(e: rusqlite::Error) -> Self {
        TrackError::Database(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn track(remote: Option<&str>, local: Option<&str>, state: ArtworkFetchState) -> Track {
        Track {
            key: TrackKey::new(1),
            display_name: Some("Moana".to_string()),
            category: None,
            description: None,
            short_description: None,
            artist_name: None,
            content_advisory_rating: None,
            price_minor_units: None,
            rental_price_minor_units: None,
            hd_price_minor_units: None,
            currency_code: None,
            remote_artwork: remote.map(String::from),
            track_view_url: None,
            preview_url: None,
            release_date: None,
            local_artwork: local.map(ContentLocation::new),
            fetch_state: state,
            first_seen_at: Utc::now(),
            last_seen_at: Utc::now(),
            seen_count: 1,
        }
    }

    #[test]
    fn test_needs_artwork() {
        let url = Some("http://x/a.jpg");
        assert!(track(url, None, ArtworkFetchState::Idle).needs_artwork());
        assert!(track(url, None, ArtworkFetchState::Failed).needs_artwork());
        assert!(!track(url, None, ArtworkFetchState::InFlight).needs_artwork());
        assert!(!track(url, Some("a.jpg"), ArtworkFetchState::Idle).needs_artwork());
        assert!(!track(None, None, ArtworkFetchState::Idle).needs_artwork());
    }

    #[test]
    fn test_fetch_state_db_round_trip() {
        for state in [
            ArtworkFetchState::Idle,
            ArtworkFetchState::InFlight,
            ArtworkFetchState::Failed,
        ] {
            assert_eq!(ArtworkFetchState::from_db(state.as_str()), state);
        }
        assert_eq!(ArtworkFetchState::from_db("garbage"), ArtworkFetchState::Idle);
    }

    #[test]
    fn test_query_with_blank_filter_is_unfiltered() {
        let query = TrackQuery::new().with_filter("   ");
        assert!(query.filter.is_none());

        let query = TrackQuery::new().with_filter("star");
        assert_eq!(query.filter.as_deref(), Some("star"));
    }

    #[test]
    fn test_query_filter_is_trimmed() {
        let query = TrackQuery::new().with_filter("  star wars \t");
        assert_eq!(query.filter.as_deref(), Some("star wars"));
    }

    #[test]
    fn test_track_key_serializes_as_number() {
        assert_eq!(serde_json::to_string(&TrackKey::new(42)).unwrap(), "42");
    }

    #[test]
    fn test_sort_serialization() {
        assert_eq!(
            serde_json::to_string(&TrackSort::LastSeenDesc).unwrap(),
            "\"last_seen_desc\""
        );
        assert_eq!(TrackSort::default(), TrackSort::NameAsc);
    }
}
