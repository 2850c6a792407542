// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Spotify API client and the "now playing" service.
//!
//! Handles:
//! - Authorization URL construction
//! - Authorization code exchange (HTTP Basic client auth)
//! - Currently playing lookup with credential invalidation on 401

use anyhow::Context;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use reqwest::StatusCode;
use serde::Deserialize;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use crate::config::Config;
use crate::error::AppError;
use crate::models::{CurrentlyPlayingResponse, TrackStatus};
use crate::store::CredentialStore;

const ACCOUNTS_BASE_URL: &str = "https://accounts.spotify.com";
const API_BASE_URL: &str = "https://api.spotify.com/v1";
/// Must stay below the status poll period so stalled polls cannot pile up.
pub const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(4);

/// Read-only scopes: what is playing and the playback state.
pub const SCOPES: [&str; 2] = ["user-read-currently-playing", "user-read-playback-state"];

/// Spotify Web API client.
#[derive(Clone)]
pub struct SpotifyClient {
    http: reqwest::Client,
    accounts_base_url: String,
    api_base_url: String,
    client_id: String,
    client_secret: String,
    redirect_uri: String,
}

impl SpotifyClient {
    /// Create a new Spotify client with OAuth credentials.
    pub fn new(
        client_id: String,
        client_secret: String,
        redirect_uri: String,
    ) -> anyhow::Result<Self> {
        Self::with_timeout(client_id, client_secret, redirect_uri, DEFAULT_HTTP_TIMEOUT)
    }

    /// Create a client whose requests give up after `timeout`.
    pub fn with_timeout(
        client_id: String,
        client_secret: String,
        redirect_uri: String,
        timeout: Duration,
    ) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("failed building Spotify HTTP client")?;

        Ok(Self {
            http,
            accounts_base_url: ACCOUNTS_BASE_URL.to_string(),
            api_base_url: API_BASE_URL.to_string(),
            client_id,
            client_secret,
            redirect_uri,
        })
    }

    /// Point the client at other hosts (local fakes in tests).
    pub fn with_base_urls(
        mut self,
        accounts_base_url: impl Into<String>,
        api_base_url: impl Into<String>,
    ) -> Self {
        self.accounts_base_url = accounts_base_url.into();
        self.api_base_url = api_base_url.into();
        self
    }

    /// URL the user is redirected to in order to grant access.
    pub fn authorization_url(&self) -> String {
        format!(
            "{}/authorize?response_type=code&client_id={}&scope={}&redirect_uri={}",
            self.accounts_base_url,
            urlencoding::encode(&self.client_id),
            SCOPES.join("%20"),
            urlencoding::encode(&self.redirect_uri)
        )
    }

    /// Exchange an authorization code for tokens.
    ///
    /// POST https://accounts.spotify.com/api/token
    /// Authorization: Basic base64(client_id:client_secret)
    pub async fn request_token(&self, code: &str) -> Result<TokenResponse, AppError> {
        let basic = BASE64.encode(format!("{}:{}", self.client_id, self.client_secret));

        let response = self
            .http
            .post(format!("{}/api/token", self.accounts_base_url))
            .header(reqwest::header::AUTHORIZATION, format!("Basic {}", basic))
            .form(&[
                ("grant_type", "authorization_code"),
                ("code", code),
                ("redirect_uri", self.redirect_uri.as_str()),
            ])
            .send()
            .await
            .map_err(|e| AppError::AuthExchange(format!("Token request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            tracing::error!(status = %status, body = %body, "Spotify token exchange failed");
            return Err(AppError::AuthExchange(format!(
                "Token exchange failed with status {}",
                status
            )));
        }

        response
            .json()
            .await
            .map_err(|e| AppError::AuthExchange(format!("Failed to parse token response: {}", e)))
    }

    /// Query the user's currently playing item.
    ///
    /// `Ok(None)` means nothing is playing (HTTP 204).
    pub async fn currently_playing(
        &self,
        access_token: &str,
    ) -> Result<Option<CurrentlyPlayingResponse>, AppError> {
        let response = self
            .http
            .get(format!("{}/me/player/currently-playing", self.api_base_url))
            .bearer_auth(access_token)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    tracing::warn!("Spotify currently-playing request timed out");
                }
                AppError::SpotifyApi(e.to_string())
            })?;

        match response.status() {
            StatusCode::NO_CONTENT => return Ok(None),
            StatusCode::UNAUTHORIZED => return Err(AppError::SpotifyUnauthorized),
            status if !status.is_success() => {
                let body = response.text().await.unwrap_or_default();
                if status == StatusCode::TOO_MANY_REQUESTS {
                    tracing::warn!("Spotify rate limit hit (429)");
                }
                return Err(AppError::SpotifyApi(format!("HTTP {}: {}", status, body)));
            }
            _ => {}
        }

        response
            .json()
            .await
            .map(Some)
            .map_err(|e| AppError::SpotifyApi(format!("JSON parse error: {}", e)))
    }
}

/// Token response from the authorization code exchange.
#[derive(Debug, Clone, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub refresh_token: String,
    /// Lifetime in seconds
    pub expires_in: i64,
}

// ─────────────────────────────────────────────────────────────────────────────
// SpotifyService - High-level service with credential management
// ─────────────────────────────────────────────────────────────────────────────

/// Source of "now playing" snapshots for presence sessions.
pub trait StatusFetcher: Send + Sync + 'static {
    fn fetch_status(&self) -> impl Future<Output = Result<Option<TrackStatus>, AppError>> + Send;
}

/// Spotify client plus the credential it authenticates with.
#[derive(Clone)]
pub struct SpotifyService {
    client: SpotifyClient,
    credentials: Arc<dyn CredentialStore>,
}

impl SpotifyService {
    pub fn new(client: SpotifyClient, credentials: Arc<dyn CredentialStore>) -> Self {
        Self {
            client,
            credentials,
        }
    }

    pub fn from_config(
        config: &Config,
        credentials: Arc<dyn CredentialStore>,
    ) -> anyhow::Result<Self> {
        let client = SpotifyClient::new(
            config.spotify_client_id.clone(),
            config.spotify_client_secret.clone(),
            config.spotify_redirect_uri.clone(),
        )?;
        Ok(Self::new(client, credentials))
    }

    pub fn build_authorization_url(&self) -> String {
        self.client.authorization_url()
    }

    /// Exchange the callback code and store the resulting credential.
    ///
    /// Failures are returned to the caller; the user restarts the flow to retry.
    pub async fn exchange_code(&self, code: &str) -> Result<(), AppError> {
        let tokens = self.client.request_token(code).await?;

        self.credentials
            .save(&tokens.access_token, &tokens.refresh_token, tokens.expires_in)?;

        tracing::info!(expires_in = tokens.expires_in, "Spotify account connected");
        Ok(())
    }

    /// Look up what is playing right now.
    ///
    /// `Ok(None)` covers "not connected", "nothing playing" and a rejected
    /// token; a rejected token is cleared so the account shows as
    /// disconnected. `Err` is a transient failure worth keeping the previous
    /// snapshot for.
    pub async fn poll_current_status(&self) -> Result<Option<TrackStatus>, AppError> {
        let Some(credential) = self.credentials.read() else {
            return Ok(None);
        };

        match self.client.currently_playing(&credential.access_token).await {
            Ok(Some(payload)) => Ok(payload.into_track_status()),
            Ok(None) => Ok(None),
            Err(e) if e.is_spotify_token_error() => {
                tracing::info!("Spotify token rejected, disconnecting");
                if let Err(e) = self.credentials.clear() {
                    tracing::warn!(error = %e, "Failed to clear rejected credential");
                }
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    /// Best-effort variant of [`Self::poll_current_status`]: every failure
    /// is logged and degrades to `None`.
    pub async fn fetch_current_status(&self) -> Option<TrackStatus> {
        self.poll_current_status().await.unwrap_or_else(|e| {
            tracing::warn!(error = %e, "Error fetching Spotify status");
            None
        })
    }

    pub fn is_connected(&self) -> bool {
        self.credentials.is_connected()
    }

    /// Forget the stored credential.
    pub fn disconnect(&self) -> Result<(), AppError> {
        self.credentials.clear()?;
        tracing::info!("Spotify account disconnected");
        Ok(())
    }
}

impl StatusFetcher for SpotifyService {
    fn fetch_status(&self) -> impl Future<Output = Result<Option<TrackStatus>, AppError>> + Send {
        self.poll_current_status()
    }
}
