// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

use axum::{
    extract::{Form, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use presence_tracker::config::Config;
use presence_tracker::routes::create_router;
use presence_tracker::services::spotify::DEFAULT_HTTP_TIMEOUT;
use presence_tracker::services::{SpotifyClient, SpotifyService};
use presence_tracker::store::{MemoryStorage, StorageCredentialStore};
use presence_tracker::time_utils::ManualClock;
use presence_tracker::AppState;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

#[allow(dead_code)]
pub const NOW_MS: i64 = 1_700_000_000_000;

/// Scripted stand-in for the Spotify accounts and Web API hosts.
#[derive(Default)]
pub struct FakeSpotify {
    /// Status and body served by GET /v1/me/player/currently-playing
    pub playing: Mutex<(u16, Option<serde_json::Value>)>,
    /// Status served by POST /api/token
    pub token_status: Mutex<u16>,
    pub playing_hits: AtomicUsize,
    /// When set, GET /v1/me/player/currently-playing never answers
    pub stalled: AtomicBool,
    pub last_bearer: Mutex<Option<String>>,
    pub last_token_auth: Mutex<Option<String>>,
    pub last_token_form: Mutex<Option<HashMap<String, String>>>,
}

#[allow(dead_code)]
impl FakeSpotify {
    pub fn set_playing(&self, status: u16, body: Option<serde_json::Value>) {
        *self.playing.lock().unwrap() = (status, body);
    }

    pub fn set_token_status(&self, status: u16) {
        *self.token_status.lock().unwrap() = status;
    }

    pub fn stall(&self) {
        self.stalled.store(true, Ordering::SeqCst);
    }

    pub fn hits(&self) -> usize {
        self.playing_hits.load(Ordering::SeqCst)
    }
}

async fn currently_playing(State(fake): State<Arc<FakeSpotify>>, headers: HeaderMap) -> Response {
    fake.playing_hits.fetch_add(1, Ordering::SeqCst);
    *fake.last_bearer.lock().unwrap() = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);

    if fake.stalled.load(Ordering::SeqCst) {
        std::future::pending::<()>().await;
    }

    let (status, body) = fake.playing.lock().unwrap().clone();
    let status = StatusCode::from_u16(status).unwrap();
    match body {
        Some(body) => (status, Json(body)).into_response(),
        None => status.into_response(),
    }
}

async fn token(
    State(fake): State<Arc<FakeSpotify>>,
    headers: HeaderMap,
    Form(form): Form<HashMap<String, String>>,
) -> Response {
    *fake.last_token_auth.lock().unwrap() = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    *fake.last_token_form.lock().unwrap() = Some(form);

    let status = StatusCode::from_u16(*fake.token_status.lock().unwrap()).unwrap();
    if !status.is_success() {
        return (status, Json(serde_json::json!({"error": "invalid_grant"}))).into_response();
    }

    Json(serde_json::json!({
        "access_token": "fresh_access",
        "token_type": "Bearer",
        "scope": "user-read-currently-playing user-read-playback-state",
        "expires_in": 3600,
        "refresh_token": "fresh_refresh"
    }))
    .into_response()
}

/// Serve the fake on an ephemeral local port. Returns its base URL.
#[allow(dead_code)]
pub async fn spawn_fake_spotify() -> (Arc<FakeSpotify>, String) {
    let fake = Arc::new(FakeSpotify::default());
    fake.set_playing(204, None);
    fake.set_token_status(200);

    let app = Router::new()
        .route("/api/token", post(token))
        .route("/v1/me/player/currently-playing", get(currently_playing))
        .with_state(fake.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    (fake, format!("http://{}", addr))
}

pub type TestCredentials = StorageCredentialStore<MemoryStorage>;

/// Spotify service wired to the fake, with in-memory storage and a manual clock.
#[allow(dead_code)]
pub fn test_service(base_url: &str) -> (SpotifyService, Arc<TestCredentials>, Arc<ManualClock>) {
    test_service_with_timeout(base_url, DEFAULT_HTTP_TIMEOUT)
}

/// Like [`test_service`], with a custom HTTP timeout.
#[allow(dead_code)]
pub fn test_service_with_timeout(
    base_url: &str,
    timeout: Duration,
) -> (SpotifyService, Arc<TestCredentials>, Arc<ManualClock>) {
    let config = Config::test_default();
    let clock = Arc::new(ManualClock::new(NOW_MS));
    let credentials = Arc::new(StorageCredentialStore::new(
        MemoryStorage::new(),
        clock.clone(),
    ));

    let client = SpotifyClient::with_timeout(
        config.spotify_client_id.clone(),
        config.spotify_client_secret.clone(),
        config.spotify_redirect_uri.clone(),
        timeout,
    )
    .unwrap()
    .with_base_urls(base_url, format!("{}/v1", base_url));

    (
        SpotifyService::new(client, credentials.clone()),
        credentials,
        clock,
    )
}

/// Create a test app backed by the fake Spotify.
/// Returns the router, the shared state and the credential store.
#[allow(dead_code)]
pub fn create_test_app(base_url: &str) -> (Router, Arc<AppState>, Arc<TestCredentials>) {
    create_test_app_with_config(base_url, Config::test_default())
}

/// Like [`create_test_app`], with a custom configuration.
#[allow(dead_code)]
pub fn create_test_app_with_config(
    base_url: &str,
    config: Config,
) -> (Router, Arc<AppState>, Arc<TestCredentials>) {
    let (spotify, credentials, _) = test_service(base_url);
    let state = Arc::new(AppState::new(config, spotify));

    (create_router(state.clone()), state, credentials)
}

/// A typical currently-playing payload.
#[allow(dead_code)]
pub fn playing_payload(progress_ms: Option<u64>) -> serde_json::Value {
    let mut payload = serde_json::json!({
        "is_playing": true,
        "currently_playing_type": "track",
        "item": {
            "name": "Song",
            "artists": [{"name": "A"}, {"name": "B"}],
            "album": {"name": "Album", "images": []},
            "duration_ms": 200_000,
            "external_urls": {"spotify": "https://open.spotify.com/track/abc"}
        }
    });
    if let Some(progress) = progress_ms {
        payload["progress_ms"] = serde_json::json!(progress);
    }
    payload
}
