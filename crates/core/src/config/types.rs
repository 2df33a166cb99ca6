use serde::{Deserialize, Serialize};
use std::net::IpAddr;
use std::path::PathBuf;

/// Root configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub search: SearchConfig,
    #[serde(default)]
    pub artwork: ArtworkConfig,
}

/// Server configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: IpAddr,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

fn default_host() -> IpAddr {
    IpAddr::from([0, 0, 0, 0])
}

fn default_port() -> u16 {
    8080
}

/// Database configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_db_path")]
    pub path: PathBuf,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
        }
    }
}

fn default_db_path() -> PathBuf {
    PathBuf::from("appetiser.db")
}

/// iTunes Search API configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SearchConfig {
    /// API base URL (default: https://itunes.apple.com)
    #[serde(default = "default_search_base_url")]
    pub base_url: String,
    /// Storefront country code
    #[serde(default = "default_country")]
    pub country: String,
    /// Media type filter
    #[serde(default = "default_media")]
    pub media: String,
    /// Maximum results per search (None = API default)
    #[serde(default)]
    pub limit: Option<u32>,
    /// Request timeout in seconds (default: 30)
    #[serde(default = "default_timeout")]
    pub timeout_secs: u32,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            base_url: default_search_base_url(),
            country: default_country(),
            media: default_media(),
            limit: None,
            timeout_secs: default_timeout(),
        }
    }
}

fn default_search_base_url() -> String {
    "https://itunes.apple.com".to_string()
}

fn default_country() -> String {
    "au".to_string()
}

fn default_media() -> String {
    "movie".to_string()
}

fn default_timeout() -> u32 {
    30
}

/// Artwork cache configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ArtworkConfig {
    /// Directory where fetched artwork is written
    #[serde(default = "default_cache_dir")]
    pub cache_dir: PathBuf,
    /// Per-fetch timeout in seconds; expiry counts as a failed fetch
    #[serde(default = "default_timeout")]
    pub fetch_timeout_secs: u32,
    /// Upper bound on concurrently running fetches
    #[serde(default = "default_max_concurrent_fetches")]
    pub max_concurrent_fetches: usize,
    /// Abort in-flight fetches whose track is absent from a newer batch
    #[serde(default = "default_true")]
    pub cancel_superseded: bool,
    /// Delete cache files no track references when the server starts
    #[serde(default = "default_true")]
    pub prune_orphans_on_start: bool,
    /// Capacity of the change notification channel
    #[serde(default = "default_notify_capacity")]
    pub notify_capacity: usize,
}

impl Default for ArtworkConfig {
    fn default() -> Self {
        Self {
            cache_dir: default_cache_dir(),
            fetch_timeout_secs: default_timeout(),
            max_concurrent_fetches: default_max_concurrent_fetches(),
            cancel_superseded: true,
            prune_orphans_on_start: true,
            notify_capacity: default_notify_capacity(),
        }
    }
}

fn default_cache_dir() -> PathBuf {
    PathBuf::from("artwork-cache")
}

fn default_max_concurrent_fetches() -> usize {
    8
}

fn default_notify_capacity() -> usize {
    256
}

fn default_true() -> bool {
    true
}

/// Sanitized config for API responses
///
/// The database path and cache directory are reduced to whether they are
/// configured away from the defaults; nothing else here is secret.
#[derive(Debug, Clone, Serialize)]
pub struct SanitizedConfig {
    pub server: ServerConfig,
    pub search: SanitizedSearchConfig,
    pub artwork: SanitizedArtworkConfig,
}

#[derive(Debug, Clone, Serialize)]
pub struct SanitizedSearchConfig {
    pub base_url: String,
    pub country: String,
    pub media: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<u32>,
    pub timeout_secs: u32,
}

#[derive(Debug, Clone, Serialize)]
pub struct SanitizedArtworkConfig {
    pub fetch_timeout_secs: u32,
    pub max_concurrent_fetches: usize,
    pub cancel_superseded: bool,
    pub custom_cache_dir: bool,
}

impl From<&Config> for SanitizedConfig {
    fn from(config: &Config) -> Self {
        Self {
            server: config.server.clone(),
            search: SanitizedSearchConfig {
                base_url: config.search.base_url.clone(),
                country: config.search.country.clone(),
                media: config.search.media.clone(),
                limit: config.search.limit,
                timeout_secs: config.search.timeout_secs,
            },
            artwork: SanitizedArtworkConfig {
                fetch_timeout_secs: config.artwork.fetch_timeout_secs,
                max_concurrent_fetches: config.artwork.max_concurrent_fetches,
                cancel_superseded: config.artwork.cancel_superseded,
                custom_cache_dir: config.artwork.cache_dir != default_cache_dir(),
            },
        }
    }
}
