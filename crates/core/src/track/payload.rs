//! Mapping of raw iTunes search results into typed payloads.

use chrono::{DateTime, Utc};
use reqwest::Url;
use serde_json::{Map, Value};
use thiserror::Error;

use super::TrackKey;

/// Errors that make a search result unusable.
///
/// Only identity problems are errors; every other field degrades to `None`.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum PayloadError {
    #[error("search result is not a JSON object")]
    NotAnObject,

    #[error("search result has no trackId")]
    MissingKey,

    #[error("search result has an invalid trackId: {0}")]
    InvalidKey(String),
}

/// Metadata of one search result, ready to be upserted.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TrackPayload {
    pub key: TrackKey,
    pub display_name: Option<String>,
    pub category: Option<String>,
    pub description: Option<String>,
    pub short_description: Option<String>,
    pub artist_name: Option<String>,
    pub content_advisory_rating: Option<String>,
    pub price_minor_units: Option<i64>,
    pub rental_price_minor_units: Option<i64>,
    pub hd_price_minor_units: Option<i64>,
    pub currency_code: Option<String>,
    pub remote_artwork: Option<String>,
    pub track_view_url: Option<String>,
    pub preview_url: Option<String>,
    pub release_date: Option<DateTime<Utc>>,
}

/// Artwork size variants, largest first.
const ARTWORK_FIELDS: [&str; 3] = ["artworkUrl100", "artworkUrl60", "artworkUrl30"];

impl TrackPayload {
    /// Create a payload carrying only a key.
    pub fn new(key: TrackKey) -> Self {
        Self {
            key,
            ..Default::default()
        }
    }

    /// Map one element of the iTunes `results` array.
    pub fn from_json(value: &Value) -> Result<Self, PayloadError> {
        let obj = value.as_object().ok_or(PayloadError::NotAnObject)?;
        let key = parse_key(obj)?;

        let short_description = string_field(obj, "shortDescription");
        let description = string_field(obj, "trackLongDescription")
            .or_else(|| string_field(obj, "longDescription"))
            .or_else(|| short_description.clone());

        Ok(Self {
            key,
            display_name: string_field(obj, "trackName"),
            category: string_field(obj, "primaryGenreName"),
            description,
            short_description,
            artist_name: string_field(obj, "artistName"),
            content_advisory_rating: string_field(obj, "contentAdvisoryRating"),
            price_minor_units: price_field(obj, "trackPrice"),
            rental_price_minor_units: price_field(obj, "trackRentalPrice"),
            hd_price_minor_units: price_field(obj, "trackHdPrice"),
            currency_code: string_field(obj, "currency"),
            remote_artwork: ARTWORK_FIELDS.iter().find_map(|f| url_field(obj, f)),
            track_view_url: url_field(obj, "trackViewUrl"),
            preview_url: url_field(obj, "previewUrl"),
            release_date: string_field(obj, "releaseDate")
                .and_then(|s| DateTime::parse_from_rfc3339(&s).ok())
                .map(|dt| dt.with_timezone(&Utc)),
        })
    }
}

fn parse_key(obj: &Map<String, Value>) -> Result<TrackKey, PayloadError> {
    match obj.get("trackId") {
        None | Some(Value::Null) => Err(PayloadError::MissingKey),
        Some(Value::Number(n)) => n
            .as_i64()
            .map(TrackKey::new)
            .ok_or_else(|| PayloadError::InvalidKey(n.to_string())),
        Some(Value::String(s)) => s
            .trim()
            .parse::<i64>()
            .map(TrackKey::new)
            .map_err(|_| PayloadError::InvalidKey(s.clone())),
        Some(other) => Err(PayloadError::InvalidKey(other.to_string())),
    }
}

fn string_field(obj: &Map<String, Value>, field: &str) -> Option<String> {
    obj.get(field)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
}

fn url_field(obj: &Map<String, Value>, field: &str) -> Option<String> {
    string_field(obj, field).filter(|s| Url::parse(s).is_ok())
}

/// Prices arrive as decimal major units (e.g. 4.99).
fn price_field(obj: &Map<String, Value>, field: &str) -> Option<i64> {
    obj.get(field)
        .and_then(Value::as_f64)
        .filter(|p| p.is_finite())
        .map(|p| (p * 100.0).round() as i64)
}
