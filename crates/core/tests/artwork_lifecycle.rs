//! Artwork cache lifecycle integration tests.
//!
//! These tests run searches end to end against a file-backed store and a real
//! cache directory, with mocked network collaborators:
//! search -> upsert -> reconcile -> fetch -> write -> complete

use std::sync::Arc;
use std::time::Duration;

use tempfile::TempDir;
use tokio::sync::broadcast;
use tokio_test::{assert_err, assert_ok};

use appetiser_core::{
    create_artwork_system,
    testing::{fixtures, MockSearchProvider, MockTransport},
    ArtworkConfig, ArtworkFetchState, ChangeNotifier, ContentLocation, ContentWriter,
    FsContentWriter, SearchOrchestrator, SqliteTrackStore, StoreChange, TrackError, TrackKey,
    TrackStore,
};

/// Test helper to create all dependencies for lifecycle testing.
struct TestHarness {
    store: Arc<SqliteTrackStore>,
    provider: Arc<MockSearchProvider>,
    transport: Arc<MockTransport>,
    writer: Arc<FsContentWriter>,
    notifier: ChangeNotifier,
    orchestrator: SearchOrchestrator,
    temp_dir: TempDir,
}

impl TestHarness {
    fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        Self::in_dir(temp_dir)
    }

    fn in_dir(temp_dir: TempDir) -> Self {
        let store = Arc::new(
            SqliteTrackStore::new(&temp_dir.path().join("test.db"))
                .expect("Failed to create track store"),
        );
        let writer = Arc::new(FsContentWriter::new(temp_dir.path().join("artwork")));
        let provider = Arc::new(MockSearchProvider::new());
        let transport = Arc::new(MockTransport::new());
        let notifier = ChangeNotifier::new(256);

        let (manager, applier) = create_artwork_system(
            store.clone(),
            transport.clone(),
            writer.clone(),
            notifier.clone(),
            &ArtworkConfig::default(),
        );
        tokio::spawn(applier.run());

        let orchestrator =
            SearchOrchestrator::new(store.clone(), provider.clone(), manager, notifier.clone());

        Self {
            store,
            provider,
            transport,
            writer,
            notifier,
            orchestrator,
            temp_dir,
        }
    }

    /// Wait until `count` artwork results (cached or failed) have been applied.
    async fn wait_for_artwork(rx: &mut broadcast::Receiver<StoreChange>, count: usize) {
        let mut seen = 0;
        while seen < count {
            let change = tokio::time::timeout(Duration::from_secs(5), rx.recv())
                .await
                .expect("timed out waiting for artwork")
                .expect("notifier closed");
            if matches!(
                change,
                StoreChange::ArtworkCached { .. } | StoreChange::ArtworkFailed { .. }
            ) {
                seen += 1;
            }
        }
    }
}

#[tokio::test]
async fn test_search_caches_artwork_on_disk() {
    let h = TestHarness::new();
    let mut rx = h.notifier.subscribe();
    h.provider
        .set_results(vec![
            fixtures::itunes_result(1, "Star Wars"),
            fixtures::itunes_result(2, "Starship Troopers"),
            fixtures::itunes_result_without_artwork(3, "Star Trek"),
        ])
        .await;

    let outcome = h.orchestrator.search("star").await.unwrap();
    assert_eq!(outcome.tracks.len(), 3);
    assert_eq!(outcome.reconcile.scheduled, 2);
    assert_eq!(outcome.reconcile.no_artwork, 1);

    TestHarness::wait_for_artwork(&mut rx, 2).await;

    for id in [1, 2] {
        let track = h.store.get(TrackKey::new(id)).unwrap().unwrap();
        let location = track.local_artwork.expect("artwork should be cached");
        assert!(location.as_str().ends_with(".jpg"));
        assert_eq!(track.fetch_state, ArtworkFetchState::Idle);

        let path = h.writer.path_for(&location).unwrap();
        assert_eq!(std::fs::read(path).unwrap(), fixtures::JPEG_BYTES);
    }

    let stats = h.store.stats().unwrap();
    assert_eq!(stats.total_tracks, 3);
    assert_eq!(stats.cached_artwork, 2);
}

#[tokio::test]
async fn test_repeat_search_does_not_refetch() {
    let h = TestHarness::new();
    let mut rx = h.notifier.subscribe();
    h.provider
        .set_results(vec![fixtures::itunes_result(1, "Moana")])
        .await;

    h.orchestrator.search("moana").await.unwrap();
    TestHarness::wait_for_artwork(&mut rx, 1).await;

    let outcome = h.orchestrator.search("moana").await.unwrap();
    assert_eq!(outcome.reconcile.scheduled, 0);
    assert_eq!(outcome.reconcile.already_cached, 1);
    assert_eq!(h.transport.call_count().await, 1);
}

#[tokio::test]
async fn test_overlapping_searches_share_in_flight_fetch() {
    let h = TestHarness::new();
    let mut rx = h.notifier.subscribe();
    h.transport.set_delay(Duration::from_millis(200)).await;
    h.provider
        .set_results_for(
            "star",
            vec![
                fixtures::itunes_result(1, "Star Wars"),
                fixtures::itunes_result(2, "Starship Troopers"),
            ],
        )
        .await;
    h.provider
        .set_results_for(
            "wars",
            vec![
                fixtures::itunes_result(1, "Star Wars"),
                fixtures::itunes_result(3, "War Horse"),
            ],
        )
        .await;

    let first = h.orchestrator.search("star").await.unwrap();
    let second = h.orchestrator.search("wars").await.unwrap();

    assert_eq!(first.reconcile.scheduled, 2);
    assert_eq!(second.reconcile.scheduled, 1);
    assert_eq!(second.reconcile.in_flight, 1);
    assert_eq!(second.reconcile.cancelled, 1);

    TestHarness::wait_for_artwork(&mut rx, 2).await;

    assert_eq!(h.transport.calls_for(&fixtures::artwork_url(1)).await, 1);
    assert!(h
        .store
        .get(TrackKey::new(1))
        .unwrap()
        .unwrap()
        .local_artwork
        .is_some());
    assert!(h
        .store
        .get(TrackKey::new(3))
        .unwrap()
        .unwrap()
        .local_artwork
        .is_some());

    // cancelled, released and eligible again
    let superseded = h.store.get(TrackKey::new(2)).unwrap().unwrap();
    assert_eq!(superseded.fetch_state, ArtworkFetchState::Idle);
    assert!(superseded.local_artwork.is_none());

    h.transport.clear_delay().await;
    let again = h.orchestrator.search("star").await.unwrap();
    assert_eq!(again.reconcile.scheduled, 1);
    assert_eq!(again.reconcile.already_cached, 1);
    TestHarness::wait_for_artwork(&mut rx, 1).await;
    assert_eq!(h.store.stats().unwrap().cached_artwork, 3);
}

#[tokio::test]
async fn test_failed_fetch_is_retried_by_next_search() {
    let h = TestHarness::new();
    let mut rx = h.notifier.subscribe();
    h.transport
        .set_status(&fixtures::artwork_url(1), 503)
        .await;
    h.provider
        .set_results(vec![fixtures::itunes_result(1, "Moana")])
        .await;

    h.orchestrator.search("moana").await.unwrap();
    TestHarness::wait_for_artwork(&mut rx, 1).await;

    let track = h.store.get(TrackKey::new(1)).unwrap().unwrap();
    assert_eq!(track.fetch_state, ArtworkFetchState::Failed);
    assert!(track.local_artwork.is_none());

    h.transport.clear_status(&fixtures::artwork_url(1)).await;
    let outcome = h.orchestrator.search("moana").await.unwrap();
    assert_eq!(outcome.reconcile.scheduled, 1);
    TestHarness::wait_for_artwork(&mut rx, 1).await;

    let track = h.store.get(TrackKey::new(1)).unwrap().unwrap();
    assert!(track.local_artwork.is_some());
    assert_eq!(h.transport.call_count().await, 2);
}

#[tokio::test]
async fn test_restart_recovers_in_flight_and_prunes_orphans() {
    let temp_dir = TempDir::new().unwrap();
    let db_path = temp_dir.path().join("test.db");
    let cache_dir = temp_dir.path().join("artwork");

    // A previous process left one fetch in flight and one orphaned file.
    let orphan = {
        let store = SqliteTrackStore::new(&db_path).unwrap();
        store.upsert(&fixtures::track_payload(1, "Moana")).unwrap();
        assert!(store.begin_fetch(TrackKey::new(1)).unwrap().is_some());

        let writer = FsContentWriter::new(&cache_dir);
        writer.write(fixtures::JPEG_BYTES).await.unwrap()
    };

    let h = TestHarness::in_dir(temp_dir);
    assert_eq!(h.store.reset_in_flight().unwrap(), 1);

    let referenced = h.store.referenced_locations().unwrap();
    assert!(referenced.is_empty());
    assert_eq!(h.writer.prune_orphans(&referenced).await.unwrap(), 1);
    assert_err!(h.writer.read(&orphan).await);

    let mut rx = h.notifier.subscribe();
    h.provider
        .set_results(vec![fixtures::itunes_result(1, "Moana")])
        .await;
    let outcome = h.orchestrator.search("moana").await.unwrap();
    assert_eq!(outcome.reconcile.scheduled, 1);
    TestHarness::wait_for_artwork(&mut rx, 1).await;

    let referenced = h.store.referenced_locations().unwrap();
    assert_eq!(referenced.len(), 1);
    assert_eq!(h.writer.prune_orphans(&referenced).await.unwrap(), 0);
    assert!(h.temp_dir.path().join("artwork").is_dir());
}

#[tokio::test]
async fn test_session_state_survives_reopen() {
    let temp_dir = TempDir::new().unwrap();
    let db_path = temp_dir.path().join("test.db");

    {
        let store = SqliteTrackStore::new(&db_path).unwrap();
        store.upsert(&fixtures::track_payload(9, "Up")).unwrap();
        assert_ok!(store.select(TrackKey::new(9)));
        assert_ok!(store.touch_last_active());

        let unknown = store.select(TrackKey::new(10));
        assert!(matches!(unknown, Err(TrackError::NotFound(_))));
    }

    let store = SqliteTrackStore::new(&db_path).unwrap();
    let session = store.session().unwrap();
    assert_eq!(session.selected, Some(TrackKey::new(9)));
    assert!(session.last_active.is_some());
}

#[tokio::test]
async fn test_unknown_location_is_not_served() {
    let h = TestHarness::new();
    let missing = ContentLocation::new("does-not-exist.jpg");
    assert_err!(h.writer.read(&missing).await);
}
