use std::sync::Arc;

use appetiser_core::{
    ArtworkCacheManager, ChangeNotifier, Config, ContentWriter, SanitizedConfig,
    SearchOrchestrator, TrackStore,
};

/// Shared application state
pub struct AppState {
    config: Config,
    store: Arc<dyn TrackStore>,
    content: Arc<dyn ContentWriter>,
    artwork: ArtworkCacheManager,
    orchestrator: SearchOrchestrator,
    notifier: ChangeNotifier,
}

impl AppState {
    pub fn new(
        config: Config,
        store: Arc<dyn TrackStore>,
        content: Arc<dyn ContentWriter>,
        artwork: ArtworkCacheManager,
        orchestrator: SearchOrchestrator,
        notifier: ChangeNotifier,
    ) -> Self {
        Self {
            config,
            store,
            content,
            artwork,
            orchestrator,
            notifier,
        }
    }

    pub fn sanitized_config(&self) -> SanitizedConfig {
        SanitizedConfig::from(&self.config)
    }

    pub fn store(&self) -> &dyn TrackStore {
        self.store.as_ref()
    }

    /// Where cached artwork bytes are read from.
    pub fn content(&self) -> &dyn ContentWriter {
        self.content.as_ref()
    }

    pub fn artwork(&self) -> &ArtworkCacheManager {
        &self.artwork
    }

    pub fn orchestrator(&self) -> &SearchOrchestrator {
        &self.orchestrator
    }

    pub fn notifier(&self) -> &ChangeNotifier {
        &self.notifier
    }
}
