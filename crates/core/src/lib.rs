pub mod artwork;
pub mod config;
pub mod metrics;
pub mod notify;
pub mod orchestrator;
pub mod search;
pub mod testing;
pub mod track;

pub use artwork::{
    create_artwork_system, ArtworkCacheManager, ArtworkError, CompletionApplier, ContentWriter,
    FsContentWriter, HttpTransport, ReconcileReport, Transport,
};
pub use config::{
    load_config, load_config_from_str, validate_config, ArtworkConfig, Config, ConfigError,
    SanitizedConfig, SearchConfig,
};
pub use notify::{ChangeNotifier, StoreChange};
pub use orchestrator::{OrchestratorError, SearchOrchestrator, SearchOutcome};
pub use search::{ItunesSearcher, SearchError, SearchProvider};
pub use track::{
    ArtworkFetchState, ContentLocation, PayloadError, SessionState, SqliteTrackStore, Track,
    TrackError, TrackKey, TrackPayload, TrackQuery, TrackSort, TrackStats, TrackStore,
    UpsertResult,
};
