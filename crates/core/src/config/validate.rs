use std::path::{Component, Path, PathBuf};

use reqwest::Url;

use super::{types::Config, ConfigError};

/// Validate configuration
/// Currently validates:
/// - Server port is not 0
/// - Search base URL parses and timeouts are non-zero
/// - Artwork concurrency and notification capacity are non-zero
/// - The database does not live inside the artwork cache directory
pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    if config.server.port == 0 {
        return Err(ConfigError::ValidationError(
            "server.port cannot be 0".to_string(),
        ));
    }

    if let Err(e) = Url::parse(&config.search.base_url) {
        return Err(ConfigError::ValidationError(format!(
            "search.base_url is not a valid URL: {}",
            e
        )));
    }

    if config.search.timeout_secs == 0 {
        return Err(ConfigError::ValidationError(
            "search.timeout_secs cannot be 0".to_string(),
        ));
    }

    if config.artwork.fetch_timeout_secs == 0 {
        return Err(ConfigError::ValidationError(
            "artwork.fetch_timeout_secs cannot be 0".to_string(),
        ));
    }

    if config.artwork.max_concurrent_fetches == 0 {
        return Err(ConfigError::ValidationError(
            "artwork.max_concurrent_fetches cannot be 0".to_string(),
        ));
    }

    if config.artwork.notify_capacity == 0 {
        return Err(ConfigError::ValidationError(
            "artwork.notify_capacity cannot be 0".to_string(),
        ));
    }

    if lexical(&config.database.path).starts_with(lexical(&config.artwork.cache_dir)) {
        return Err(ConfigError::ValidationError(format!(
            "database.path {} must not be inside artwork.cache_dir {}",
            config.database.path.display(),
            config.artwork.cache_dir.display()
        )));
    }

    Ok(())
}

/// Drop `.` components so `./a/b` and `a/b` compare equal.
fn lexical(path: &Path) -> PathBuf {
    path.components()
        .filter(|c| !matches!(c, Component::CurDir))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_default_config() {
        assert!(validate_config(&Config::default()).is_ok());
    }

    #[test]
    fn test_validate_port_zero_fails() {
        let mut config = Config::default();
        config.server.port = 0;
        let err = validate_config(&config).unwrap_err();
        assert!(matches!(err, ConfigError::ValidationError(_)));
    }

    #[test]
    fn test_validate_bad_base_url_fails() {
        let mut config = Config::default();
        config.search.base_url = "not a url".to_string();
        let err = validate_config(&config).unwrap_err();
        assert!(err.to_string().contains("search.base_url"));
    }

    #[test]
    fn test_validate_zero_concurrency_fails() {
        let mut config = Config::default();
        config.artwork.max_concurrent_fetches = 0;
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_validate_zero_fetch_timeout_fails() {
        let mut config = Config::default();
        config.artwork.fetch_timeout_secs = 0;
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_validate_database_inside_cache_dir_fails() {
        let mut config = Config::default();
        config.artwork.cache_dir = PathBuf::from("/var/cache/appetiser");
        config.database.path = PathBuf::from("/var/cache/appetiser/appetiser.db");
        assert!(validate_config(&config).is_err());

        config.artwork.cache_dir = PathBuf::from("data");
        config.database.path = PathBuf::from("./data/appetiser.db");
        assert!(validate_config(&config).is_err());

        config.artwork.cache_dir = PathBuf::from(".");
        config.database.path = PathBuf::from("appetiser.db");
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_validate_database_beside_cache_dir_passes() {
        let mut config = Config::default();
        config.artwork.cache_dir = PathBuf::from("/var/lib/appetiser/artwork");
        config.database.path = PathBuf::from("/var/lib/appetiser/appetiser.db");
        assert!(validate_config(&config).is_ok());

        config.artwork.cache_dir = PathBuf::from("/data/art");
        config.database.path = PathBuf::from("/data/artwork.db");
        assert!(validate_config(&config).is_ok());
    }
}
