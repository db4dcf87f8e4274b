use crate::constants;
use crate::error::{ConcertError, Result};
use serde::Deserialize;
use std::fs;
use std::path::Path;
use std::time::Duration;

/// Process configuration. Built once at startup and handed to each
/// component by value or reference; nothing reads it from a global.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub spotify: SpotifyConfig,
    pub ticketmaster: TicketmasterConfig,
    pub matching: MatchingConfig,
    pub retry: RetryConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SpotifyConfig {
    pub client_id: String,
    pub client_secret: String,
    pub accounts_base: String,
    pub api_base: String,
    /// Artists requested per time window
    pub per_window_limit: u32,
    pub timeout_seconds: u64,
}

impl Default for SpotifyConfig {
    fn default() -> Self {
        Self {
            client_id: String::new(),
            client_secret: String::new(),
            accounts_base: constants::SPOTIFY_ACCOUNTS_BASE.to_string(),
            api_base: constants::SPOTIFY_API_BASE.to_string(),
            per_window_limit: constants::MAX_TOP_ARTISTS_LIMIT,
            timeout_seconds: 10,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TicketmasterConfig {
    pub api_key: String,
    pub api_base: String,
    pub city: String,
    pub country_code: Option<String>,
    /// Events requested per artist; there is no second page
    pub page_size: u32,
    pub requests_per_second: u32,
    pub timeout_seconds: u64,
    /// Keep only events whose listed attractions match the artist name
    pub strict_artist_match: bool,
}

impl Default for TicketmasterConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            api_base: constants::TICKETMASTER_API_BASE.to_string(),
            city: constants::DEFAULT_CITY.to_string(),
            country_code: None,
            page_size: 10,
            requests_per_second: 5,
            timeout_seconds: 10,
            strict_artist_match: true,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MatchingConfig {
    /// Upper bound on artists searched in the catalog per run
    pub max_artists: usize,
    /// Catalog lookups allowed in flight at once
    pub concurrency: usize,
}

impl Default for MatchingConfig {
    fn default() -> Self {
        Self {
            max_artists: 25,
            concurrency: 4,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    pub max_attempts: u32,
    pub initial_backoff_ms: u64,
    pub max_backoff_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_backoff_ms: 250,
            max_backoff_ms: 2000,
        }
    }
}

impl SpotifyConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }
}

impl TicketmasterConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }
}

impl Config {
    /// Loads `config.toml` (or the file named by `CONCERT_FINDER_CONFIG`),
    /// falling back to defaults when the file is absent, then applies
    /// environment overrides.
    pub fn load() -> Result<Self> {
        let config_path = std::env::var(constants::ENV_CONFIG_PATH)
            .unwrap_or_else(|_| "config.toml".to_string());
        let mut config = if Path::new(&config_path).exists() {
            Self::load_from(&config_path)?
        } else {
            tracing::debug!("No config file at '{}', using defaults", config_path);
            Self::default()
        };
        config.apply_overrides(|key| std::env::var(key).ok());
        Ok(config)
    }

    pub fn load_from<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let config_content = fs::read_to_string(path).map_err(|e| {
            ConcertError::Config(format!(
                "Failed to read config file '{}': {}",
                path.display(),
                e
            ))
        })?;

        let config: Config = toml::from_str(&config_content)?;
        Ok(config)
    }

    /// Secrets and the city may come from the environment; `lookup` returns
    /// the value for a variable name.
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(v) = non_empty(constants::ENV_SPOTIFY_CLIENT_ID) {
            self.spotify.client_id = v;
        }
        if let Some(v) = non_empty(constants::ENV_SPOTIFY_CLIENT_SECRET) {
            self.spotify.client_secret = v;
        }
        if let Some(v) = non_empty(constants::ENV_TICKETMASTER_API_KEY) {
            self.ticketmaster.api_key = v;
        }
        if let Some(v) = non_empty(constants::ENV_CITY) {
            self.ticketmaster.city = v.trim().to_string();
        }
    }

    pub fn validate_for_matching(&self) -> Result<()> {
        if self.ticketmaster.api_key.trim().is_empty() {
            return Err(ConcertError::Config(format!(
                "{} is not set",
                constants::ENV_TICKETMASTER_API_KEY
            )));
        }
        if self.ticketmaster.city.trim().is_empty() {
            return Err(ConcertError::Config("city must not be empty".into()));
        }
        if self.spotify.per_window_limit == 0
            || self.spotify.per_window_limit > constants::MAX_TOP_ARTISTS_LIMIT
        {
            return Err(ConcertError::Config(format!(
                "per_window_limit must be between 1 and {}",
                constants::MAX_TOP_ARTISTS_LIMIT
            )));
        }
        Ok(())
    }

    pub fn validate_for_oauth(&self) -> Result<()> {
        if self.spotify.client_id.trim().is_empty() {
            return Err(ConcertError::Config(format!(
                "{} is not set",
                constants::ENV_SPOTIFY_CLIENT_ID
            )));
        }
        if self.spotify.client_secret.trim().is_empty() {
            return Err(ConcertError::Config(format!(
                "{} is not set",
                constants::ENV_SPOTIFY_CLIENT_SECRET
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    #[test]
    fn test_defaults_without_file() {
        let config = Config::default();
        assert_eq!(config.ticketmaster.city, "San Francisco");
        assert_eq!(config.spotify.per_window_limit, 50);
        assert_eq!(config.matching.max_artists, 25);
        assert_eq!(config.retry.max_attempts, 3);
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
[ticketmaster]
city = "Seattle"
page_size = 20

[matching]
concurrency = 2
"#
        )
        .unwrap();

        let config = Config::load_from(file.path()).unwrap();
        assert_eq!(config.ticketmaster.city, "Seattle");
        assert_eq!(config.ticketmaster.page_size, 20);
        assert!(config.ticketmaster.strict_artist_match);
        assert_eq!(config.matching.concurrency, 2);
        assert_eq!(config.matching.max_artists, 25);
        assert_eq!(config.spotify.api_base, constants::SPOTIFY_API_BASE);
    }

    #[test]
    fn test_invalid_toml_is_an_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[ticketmaster\ncity = ").unwrap();
        assert!(matches!(
            Config::load_from(file.path()),
            Err(ConcertError::Toml(_))
        ));
    }

    #[test]
    fn test_missing_file_is_config_error() {
        let dir = tempfile::tempdir().unwrap();
        let result = Config::load_from(dir.path().join("nope.toml"));
        assert!(matches!(result, Err(ConcertError::Config(_))));
    }

    #[test]
    fn test_env_overrides_ignore_blank_values() {
        let env: HashMap<&str, &str> = [
            (constants::ENV_TICKETMASTER_API_KEY, "tm-key"),
            (constants::ENV_CITY, " Oakland "),
            (constants::ENV_SPOTIFY_CLIENT_ID, "  "),
        ]
        .into_iter()
        .collect();

        let mut config = Config::default();
        config.spotify.client_id = "from-file".into();
        config.apply_overrides(|k| env.get(k).map(|v| v.to_string()));

        assert_eq!(config.ticketmaster.api_key, "tm-key");
        assert_eq!(config.ticketmaster.city, "Oakland");
        assert_eq!(config.spotify.client_id, "from-file");
    }

    #[test]
    fn test_validate_for_matching_requires_api_key() {
        let mut config = Config::default();
        assert!(config.validate_for_matching().is_err());
        config.ticketmaster.api_key = "key".into();
        assert!(config.validate_for_matching().is_ok());
        config.spotify.per_window_limit = 51;
        assert!(config.validate_for_matching().is_err());
    }

    #[test]
    fn test_validate_for_oauth_requires_client_credentials() {
        let mut config = Config::default();
        config.spotify.client_id = "id".into();
        assert!(config.validate_for_oauth().is_err());
        config.spotify.client_secret = "secret".into();
        assert!(config.validate_for_oauth().is_ok());
    }
}
