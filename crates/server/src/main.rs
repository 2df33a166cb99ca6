use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use sha2::{Digest, Sha256};
use tokio::signal;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use appetiser_core::{
    create_artwork_system, load_config, validate_config, ChangeNotifier, ContentWriter,
    FsContentWriter, HttpTransport, ItunesSearcher, SearchOrchestrator, SqliteTrackStore,
    TrackStore,
};
use appetiser_server::{api::create_router, state::AppState};

/// Application version
const VERSION: &str = env!("CARGO_PKG_VERSION");

/// How long shutdown waits for the completion applier to drain
const APPLIER_DRAIN_TIMEOUT: Duration = Duration::from_secs(5);

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        error!("Fatal error: {:#}", e);
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Determine config path
    let config_path = std::env::var("APPETISER_CONFIG")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("config.toml"));

    // Load configuration
    info!("Loading configuration from {:?}", config_path);
    let config = load_config(&config_path)
        .with_context(|| format!("Failed to load config from {:?}", config_path))?;

    // Validate configuration
    validate_config(&config).context("Configuration validation failed")?;

    let config_json = serde_json::to_string(&config).unwrap_or_default();
    let config_hash = format!("{:x}", Sha256::digest(config_json.as_bytes()));
    info!(
        "appetiser {} starting (config {})",
        VERSION,
        &config_hash[..16]
    );
    info!("Database path: {:?}", config.database.path);
    info!("Artwork cache directory: {:?}", config.artwork.cache_dir);

    // Create SQLite track store
    let store = Arc::new(
        SqliteTrackStore::new(&config.database.path).context("Failed to create track store")?,
    );
    let reset = store
        .reset_in_flight()
        .context("Failed to reset interrupted artwork fetches")?;
    if reset > 0 {
        info!("Reset {} artwork fetches interrupted by the last shutdown", reset);
    }
    info!("Track store initialized");

    // Create artwork content writer
    let writer = Arc::new(FsContentWriter::new(&config.artwork.cache_dir));
    if config.artwork.prune_orphans_on_start {
        let referenced = store
            .referenced_locations()
            .context("Failed to list referenced artwork")?;
        match writer.prune_orphans(&referenced).await {
            Ok(0) => {}
            Ok(pruned) => info!("Pruned {} orphaned artwork files", pruned),
            Err(e) => warn!("Failed to prune orphaned artwork: {}", e),
        }
    }

    // Create network collaborators
    let fetch_timeout = Duration::from_secs(config.artwork.fetch_timeout_secs as u64);
    let transport =
        Arc::new(HttpTransport::new(fetch_timeout).context("Failed to create artwork transport")?);
    let searcher =
        Arc::new(ItunesSearcher::new(&config.search).context("Failed to create iTunes searcher")?);

    // Create artwork system
    let notifier = ChangeNotifier::new(config.artwork.notify_capacity);
    let (artwork, applier) = create_artwork_system(
        store.clone(),
        transport,
        writer.clone(),
        notifier.clone(),
        &config.artwork,
    );
    let applier_handle = tokio::spawn(applier.run());
    info!(
        "Artwork cache manager started (max {} concurrent fetches)",
        config.artwork.max_concurrent_fetches
    );

    let orchestrator =
        SearchOrchestrator::new(store.clone(), searcher, artwork.clone(), notifier.clone());

    // Create app state
    let state = Arc::new(AppState::new(
        config.clone(),
        store,
        writer,
        artwork.clone(),
        orchestrator,
        notifier,
    ));

    // Create router
    let app = create_router(state);

    // Start server
    let addr = SocketAddr::new(config.server.host, config.server.port);
    info!("Starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;

    // Run server with graceful shutdown
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server shutting down...");

    // Interrupted fetches go back to Idle on the next start
    let cancelled = artwork.cancel_all();
    if cancelled > 0 {
        info!("Cancelled {} in-flight artwork fetches", cancelled);
    }

    // The applier exits once every sender is gone
    drop(artwork);
    if tokio::time::timeout(APPLIER_DRAIN_TIMEOUT, applier_handle)
        .await
        .is_err()
    {
        warn!("Completion applier did not stop in time");
    } else {
        info!("Completion applier stopped");
    }

    Ok(())
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
