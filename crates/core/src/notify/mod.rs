//! Change notification for track store mutations.

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use crate::track::{ContentLocation, TrackKey};

/// A committed change to the track store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StoreChange {
    /// A track was seen for the first time.
    Inserted { key: TrackKey },
    /// An existing track's metadata was merged.
    Updated { key: TrackKey },
    /// Artwork was fetched and its location recorded.
    ArtworkCached {
        key: TrackKey,
        location: ContentLocation,
    },
    /// An artwork fetch failed. The track is eligible for a later attempt.
    ArtworkFailed { key: TrackKey, error: String },
    /// An in-flight fetch was cancelled and the track returned to idle.
    ArtworkReleased { key: TrackKey },
}

impl StoreChange {
    /// The key of the track this change concerns.
    pub fn key(&self) -> TrackKey {
        match self {
            StoreChange::Inserted { key }
            | StoreChange::Updated { key }
            | StoreChange::ArtworkCached { key, .. }
            | StoreChange::ArtworkFailed { key, .. }
            | StoreChange::ArtworkReleased { key } => *key,
        }
    }

    /// Short name used for logging and metric labels.
    pub fn kind(&self) -> &'static str {
        match self {
            StoreChange::Inserted { .. } => "inserted",
            StoreChange::Updated { .. } => "updated",
            StoreChange::ArtworkCached { .. } => "artwork_cached",
            StoreChange::ArtworkFailed { .. } => "artwork_failed",
            StoreChange::ArtworkReleased { .. } => "artwork_released",
        }
    }
}

/// Broadcaster for store changes.
///
/// Cheaply cloneable. Sending never fails from the caller's point of view.
#[derive(Debug, Clone)]
pub struct ChangeNotifier {
    sender: broadcast::Sender<StoreChange>,
}

impl ChangeNotifier {
    /// Create a new notifier with the given channel capacity.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publish a change to all subscribers.
    pub fn notify(&self, change: StoreChange) {
        // A send error only means nobody is subscribed
        let _ = self.sender.send(change);
    }

    /// Subscribe to future changes.
    pub fn subscribe(&self) -> broadcast::Receiver<StoreChange> {
        self.sender.subscribe()
    }

    /// Number of active subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for ChangeNotifier {
    fn default() -> Self {
        Self::new(256)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_notify_without_subscribers() {
        let notifier = ChangeNotifier::new(4);
        notifier.notify(StoreChange::Inserted {
            key: TrackKey::new(1),
        });
        assert_eq!(notifier.subscriber_count(), 0);
    }

    #[tokio::test]
    async fn test_subscribers_receive_in_order() {
        let notifier = ChangeNotifier::new(16);
        let mut rx1 = notifier.subscribe();
        let mut rx2 = notifier.clone().subscribe();

        notifier.notify(StoreChange::Inserted {
            key: TrackKey::new(1),
        });
        notifier.notify(StoreChange::ArtworkCached {
            key: TrackKey::new(1),
            location: ContentLocation::new("a.jpg"),
        });

        for rx in [&mut rx1, &mut rx2] {
            assert_eq!(rx.recv().await.unwrap().kind(), "inserted");
            assert_eq!(rx.recv().await.unwrap().kind(), "artwork_cached");
        }
    }

    #[test]
    fn test_serialization() {
        let change = StoreChange::ArtworkFailed {
            key: TrackKey::new(42),
            error: "timeout".to_string(),
        };
        let json = serde_json::to_value(&change).unwrap();
        assert_eq!(json["type"], "artwork_failed");
        assert_eq!(json["key"], 42);
        assert_eq!(json["error"], "timeout");
        assert_eq!(change.key(), TrackKey::new(42));
    }
}
