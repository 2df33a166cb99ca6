//! Testing utilities and mock implementations.
//!
//! This module provides mock implementations of the artwork and search
//! collaborator traits, allowing end-to-end tests without network or disk.
//!
//! # Example
//!
//! ```rust,ignore
//! use appetiser_core::testing::{fixtures, MockContentWriter, MockSearchProvider, MockTransport};
//!
//! let transport = MockTransport::new();
//! let writer = MockContentWriter::new();
//! let provider = MockSearchProvider::new();
//!
//! // Configure mock responses
//! provider.set_results(vec![fixtures::itunes_result(1, "Moana")]).await;
//! transport.set_delay(Duration::from_millis(50)).await;
//!
//! // Use in create_artwork_system / SearchOrchestrator...
//! ```

mod mock_content_writer;
mod mock_search_provider;
mod mock_transport;

pub use mock_content_writer::MockContentWriter;
pub use mock_search_provider::MockSearchProvider;
pub use mock_transport::MockTransport;

/// Test fixtures and helper functions.
pub mod fixtures {
    use serde_json::{json, Value};

    use crate::track::{TrackKey, TrackPayload};

    /// Smallest byte sequence recognised as a JPEG.
    pub const JPEG_BYTES: &[u8] = &[0xFF, 0xD8, 0xFF, 0xE0, 0x00, 0x10, b'J', b'F', b'I', b'F'];

    /// Artwork URL used by the fixtures for a given track id.
    pub fn artwork_url(id: i64) -> String {
        format!("https://artwork.example.com/{}/100x100bb.jpg", id)
    }

    /// Create a track payload with artwork and a price.
    pub fn track_payload(id: i64, name: &str) -> TrackPayload {
        TrackPayload {
            display_name: Some(name.to_string()),
            category: Some("Drama".to_string()),
            description: Some(format!("A film called {}.", name)),
            price_minor_units: Some(1499),
            currency_code: Some("AUD".to_string()),
            remote_artwork: Some(artwork_url(id)),
            ..TrackPayload::new(TrackKey::new(id))
        }
    }

    /// Create a raw iTunes search result object.
    pub fn itunes_result(id: i64, name: &str) -> Value {
        json!({
            "wrapperType": "track",
            "kind": "feature-movie",
            "trackId": id,
            "trackName": name,
            "artistName": "Some Director",
            "primaryGenreName": "Drama",
            "contentAdvisoryRating": "PG",
            "trackPrice": 14.99,
            "trackRentalPrice": 5.99,
            "currency": "AUD",
            "artworkUrl30": format!("https://artwork.example.com/{}/30x30bb.jpg", id),
            "artworkUrl60": format!("https://artwork.example.com/{}/60x60bb.jpg", id),
            "artworkUrl100": artwork_url(id),
            "trackViewUrl": format!("https://itunes.apple.com/au/movie/id{}", id),
            "releaseDate": "2016-11-23T08:00:00Z",
            "shortDescription": format!("{} in brief.", name),
            "longDescription": format!("{} at length.", name)
        })
    }

    /// Create a raw search result without any artwork reference.
    pub fn itunes_result_without_artwork(id: i64, name: &str) -> Value {
        json!({
            "trackId": id,
            "trackName": name,
            "currency": "AUD"
        })
    }
}
