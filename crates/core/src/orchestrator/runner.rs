//! Search orchestrator runner.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::{debug, info, warn};

use super::types::{OrchestratorError, SearchOutcome};
use crate::artwork::{ArtworkCacheManager, ReconcileReport};
use crate::metrics::TRACK_UPSERTS;
use crate::notify::{ChangeNotifier, StoreChange};
use crate::search::SearchProvider;
use crate::track::{Track, TrackKey, TrackPayload, TrackQuery, TrackStore};

/// Drives searches through the track store and artwork cache.
#[derive(Clone)]
pub struct SearchOrchestrator {
    store: Arc<dyn TrackStore>,
    provider: Arc<dyn SearchProvider>,
    artwork: ArtworkCacheManager,
    notifier: ChangeNotifier,
}

impl SearchOrchestrator {
    /// Create a new orchestrator.
    pub fn new(
        store: Arc<dyn TrackStore>,
        provider: Arc<dyn SearchProvider>,
        artwork: ArtworkCacheManager,
        notifier: ChangeNotifier,
    ) -> Self {
        Self {
            store,
            provider,
            artwork,
            notifier,
        }
    }

    /// Run a search for `term`.
    ///
    /// A blank term performs no remote search and returns every stored track.
    pub async fn search(&self, term: &str) -> Result<SearchOutcome, OrchestratorError> {
        let term = term.trim();

        let mut outcome = SearchOutcome {
            term: term.to_string(),
            tracks: Vec::new(),
            inserted: 0,
            updated: 0,
            skipped: 0,
            reconcile: ReconcileReport::default(),
        };

        if !term.is_empty() {
            let raw = self.provider.search(term).await;
            debug!(
                "Provider '{}' returned {} results for '{}'",
                self.provider.name(),
                raw.len(),
                term
            );

            let batch = self.apply_results(&raw, &mut outcome)?;
            outcome.reconcile = self.artwork.reconcile(&batch);
        }

        self.store.touch_last_active()?;
        outcome.tracks = self.store.query(&TrackQuery::new().with_filter(term))?;

        info!(
            "Search '{}': {} inserted, {} updated, {} skipped, {} artwork fetches scheduled, {} shown",
            term,
            outcome.inserted,
            outcome.updated,
            outcome.skipped,
            outcome.reconcile.scheduled,
            outcome.tracks.len()
        );

        Ok(outcome)
    }

    /// Upsert every usable result. Returns one snapshot per distinct key.
    fn apply_results(
        &self,
        raw: &[serde_json::Value],
        outcome: &mut SearchOutcome,
    ) -> Result<Vec<Track>, OrchestratorError> {
        let mut batch: Vec<Track> = Vec::with_capacity(raw.len());
        let mut positions: HashMap<TrackKey, usize> = HashMap::new();

        for value in raw {
            let payload = match TrackPayload::from_json(value) {
                Ok(payload) => payload,
                Err(e) => {
                    warn!("Skipping search result: {}", e);
                    TRACK_UPSERTS.with_label_values(&["skipped"]).inc();
                    outcome.skipped += 1;
                    continue;
                }
            };

            let result = match self.store.upsert(&payload) {
                Ok(result) => result,
                Err(e) => {
                    TRACK_UPSERTS.with_label_values(&["error"]).inc();
                    return Err(e.into());
                }
            };

            let key = result.track.key;
            if result.created {
                TRACK_UPSERTS.with_label_values(&["inserted"]).inc();
                outcome.inserted += 1;
                self.notifier.notify(StoreChange::Inserted { key });
            } else {
                TRACK_UPSERTS.with_label_values(&["updated"]).inc();
                outcome.updated += 1;
                self.notifier.notify(StoreChange::Updated { key });
            }

            match positions.get(&key) {
                Some(&index) => batch[index] = result.track,
                None => {
                    positions.insert(key, batch.len());
                    batch.push(result.track);
                }
            }
        }

        Ok(batch)
    }
}
