// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Dashboard API: connection state, one-shot status and presence sessions.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use std::sync::Arc;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

use crate::error::{AppError, Result};
use crate::models::TrackStatus;
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/spotify/connection", get(get_connection))
        .route("/api/spotify/status", get(get_status))
        .route("/api/presence/sessions", post(open_session))
        .route(
            "/api/presence/sessions/{id}",
            get(get_session).delete(close_session),
        )
}

#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct ConnectionResponse {
    pub connected: bool,
}

#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct StatusResponse {
    pub track: Option<TrackStatus>,
}

#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct SessionResponse {
    #[cfg_attr(feature = "binding-generation", ts(type = "number"))]
    pub session_id: u64,
}

/// Whether a usable Spotify credential is stored.
async fn get_connection(State(state): State<Arc<AppState>>) -> Json<ConnectionResponse> {
    Json(ConnectionResponse {
        connected: state.spotify.is_connected(),
    })
}

/// Single "now playing" lookup. Failures show up as no track.
async fn get_status(State(state): State<Arc<AppState>>) -> Json<StatusResponse> {
    Json(StatusResponse {
        track: state.spotify.fetch_current_status().await,
    })
}

/// Open a presence session for a display that became visible.
///
/// The session stays open while the display keeps reading it; one that goes
/// unread for longer than the lease is torn down.
async fn open_session(
    State(state): State<Arc<AppState>>,
) -> Result<(StatusCode, Json<SessionResponse>)> {
    let session_id = state
        .sessions
        .open(state.spotify.clone(), state.presence_settings)?;

    Ok((StatusCode::CREATED, Json(SessionResponse { session_id })))
}

/// Current snapshot of a session. Reading it renews the session's lease.
async fn get_session(
    State(state): State<Arc<AppState>>,
    Path(id): Path<u64>,
) -> Result<Json<StatusResponse>> {
    let track = state
        .sessions
        .snapshot(id)
        .ok_or_else(|| AppError::NotFound(format!("Presence session {}", id)))?;

    Ok(Json(StatusResponse { track }))
}

/// Tear down a presence session when its display is dismissed.
async fn close_session(
    State(state): State<Arc<AppState>>,
    Path(id): Path<u64>,
) -> Result<StatusCode> {
    if !state.sessions.close(id).await {
        return Err(AppError::NotFound(format!("Presence session {}", id)));
    }
    Ok(StatusCode::NO_CONTENT)
}
