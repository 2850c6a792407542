// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Application configuration loaded from environment variables.

use std::env;
use std::path::PathBuf;
use std::time::Duration;

/// Application configuration, loaded once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    /// Spotify OAuth client ID (public)
    pub spotify_client_id: String,
    /// Spotify OAuth client secret
    pub spotify_client_secret: String,
    /// Callback URI registered with Spotify
    pub spotify_redirect_uri: String,
    /// Frontend URL the callback redirects back to
    pub frontend_url: String,
    /// Server port
    pub port: u16,
    /// Where the credential entries are persisted
    pub credential_store_path: PathBuf,
    /// Period of the "currently playing" poll
    pub status_poll_interval: Duration,
    /// Period of the local progress interpolation tick
    pub progress_tick: Duration,
    /// How long a presence session lives without being read
    pub session_lease: Duration,
    /// Maximum number of open presence sessions
    pub max_sessions: usize,
}

impl Config {
    /// Default config for testing only.
    pub fn test_default() -> Self {
        Self {
            spotify_client_id: "test_client_id".to_string(),
            spotify_client_secret: "test_secret".to_string(),
            spotify_redirect_uri: "http://localhost:5173/spotify/callback".to_string(),
            frontend_url: "http://localhost:5173".to_string(),
            port: 8080,
            credential_store_path: PathBuf::from("data/test-credentials.json"),
            status_poll_interval: Duration::from_millis(DEFAULT_POLL_INTERVAL_MS),
            progress_tick: Duration::from_millis(DEFAULT_PROGRESS_TICK_MS),
            session_lease: Duration::from_millis(DEFAULT_SESSION_LEASE_MS),
            max_sessions: DEFAULT_MAX_SESSIONS,
        }
    }

    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok(); // Load .env file if present

        Ok(Self {
            spotify_client_id: env::var("SPOTIFY_CLIENT_ID")
                .map(|v| v.trim().to_string())
                .map_err(|_| ConfigError::Missing("SPOTIFY_CLIENT_ID"))?,
            spotify_client_secret: env::var("SPOTIFY_CLIENT_SECRET")
                .map(|v| v.trim().to_string())
                .map_err(|_| ConfigError::Missing("SPOTIFY_CLIENT_SECRET"))?,
            spotify_redirect_uri: env::var("SPOTIFY_REDIRECT_URI")
                .map(|v| v.trim().to_string())
                .map_err(|_| ConfigError::Missing("SPOTIFY_REDIRECT_URI"))?,
            frontend_url: env::var("FRONTEND_URL")
                .unwrap_or_else(|_| "http://localhost:5173".to_string()),
            port: env::var("PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse()
                .unwrap_or(8080),
            credential_store_path: env::var("CREDENTIAL_STORE_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("data/credentials.json")),
            status_poll_interval: millis_var("STATUS_POLL_INTERVAL_MS", DEFAULT_POLL_INTERVAL_MS)?,
            progress_tick: millis_var("PROGRESS_TICK_MS", DEFAULT_PROGRESS_TICK_MS)?,
            session_lease: millis_var("SESSION_LEASE_MS", DEFAULT_SESSION_LEASE_MS)?,
            max_sessions: match env::var("MAX_PRESENCE_SESSIONS") {
                Ok(raw) => raw
                    .trim()
                    .parse()
                    .map_err(|_| ConfigError::Invalid("MAX_PRESENCE_SESSIONS", raw))?,
                Err(_) => DEFAULT_MAX_SESSIONS,
            },
        })
    }
}

const DEFAULT_POLL_INTERVAL_MS: u64 = 5000;
const DEFAULT_PROGRESS_TICK_MS: u64 = 1000;
const DEFAULT_SESSION_LEASE_MS: u64 = 60_000;
const DEFAULT_MAX_SESSIONS: usize = 32;

/// Read an optional millisecond period. Zero would make `tokio::time::interval` panic.
fn millis_var(name: &'static str, default_ms: u64) -> Result<Duration, ConfigError> {
    let Ok(raw) = env::var(name) else {
        return Ok(Duration::from_millis(default_ms));
    };

    match raw.trim().parse::<u64>() {
        Ok(ms) if ms > 0 => Ok(Duration::from_millis(ms)),
        _ => Err(ConfigError::Invalid(name, raw)),
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    Missing(&'static str),

    #[error("Invalid value for {0}: {1:?}")]
    Invalid(&'static str, String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_from_env() {
        // Set required env vars for test
        env::set_var("SPOTIFY_CLIENT_ID", "test_id");
        env::set_var("SPOTIFY_CLIENT_SECRET", " test_secret\n");
        env::set_var("SPOTIFY_REDIRECT_URI", "http://localhost:5173/spotify/callback");
        env::set_var("STATUS_POLL_INTERVAL_MS", "2500");

        let config = Config::from_env().expect("Config should load");

        assert_eq!(config.spotify_client_id, "test_id");
        assert_eq!(config.spotify_client_secret, "test_secret");
        assert_eq!(config.port, 8080);
        assert_eq!(config.status_poll_interval, Duration::from_millis(2500));
        assert_eq!(config.progress_tick, Duration::from_millis(1000));
        assert_eq!(config.session_lease, Duration::from_secs(60));
        assert_eq!(config.max_sessions, 32);

        env::set_var("STATUS_POLL_INTERVAL_MS", "0");
        assert!(matches!(
            Config::from_env(),
            Err(ConfigError::Invalid("STATUS_POLL_INTERVAL_MS", _))
        ));
        env::remove_var("STATUS_POLL_INTERVAL_MS");
    }
}
