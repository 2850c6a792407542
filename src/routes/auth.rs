// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Spotify OAuth connect/disconnect routes.

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::Redirect,
    routing::{get, post},
    Router,
};
use serde::Deserialize;
use std::sync::Arc;

use crate::error::Result;
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/auth/spotify", get(auth_start))
        .route("/auth/spotify/callback", get(auth_callback))
        .route("/auth/spotify/disconnect", post(disconnect))
}

/// Start OAuth flow - redirect to Spotify authorization.
async fn auth_start(State(state): State<Arc<AppState>>) -> Redirect {
    tracing::info!(
        client_id = %state.config.spotify_client_id,
        "Starting OAuth flow, redirecting to Spotify"
    );

    Redirect::temporary(&state.spotify.build_authorization_url())
}

#[derive(Deserialize)]
pub struct CallbackParams {
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

/// Where the callback sends the browser once it is done.
#[derive(Debug, PartialEq, Eq)]
enum CallbackOutcome {
    Connected,
    Failed(String),
}

impl CallbackOutcome {
    fn redirect_url(&self, frontend_url: &str) -> String {
        let base = frontend_url.trim_end_matches('/');
        match self {
            CallbackOutcome::Connected => format!("{}/settings?spotify=connected", base),
            CallbackOutcome::Failed(reason) => format!(
                "{}/settings?spotify=error&reason={}",
                base,
                urlencoding::encode(reason)
            ),
        }
    }
}

/// OAuth callback - exchange the code for tokens and return to the settings page.
async fn auth_callback(
    State(state): State<Arc<AppState>>,
    Query(params): Query<CallbackParams>,
) -> Redirect {
    let outcome = handle_callback(&state, params).await;
    Redirect::temporary(&outcome.redirect_url(&state.config.frontend_url))
}

async fn handle_callback(state: &AppState, params: CallbackParams) -> CallbackOutcome {
    // Check for OAuth errors
    if let Some(error) = params.error {
        tracing::warn!(error = %error, "OAuth error from Spotify");
        return CallbackOutcome::Failed(error);
    }

    let Some(code) = params.code.filter(|c| !c.is_empty()) else {
        tracing::warn!("OAuth callback without authorization code");
        return CallbackOutcome::Failed("no_code".to_string());
    };

    tracing::info!("Exchanging authorization code for tokens");

    match state.spotify.exchange_code(&code).await {
        Ok(()) => CallbackOutcome::Connected,
        Err(e) => {
            tracing::error!(error = %e, "Spotify connection failed");
            CallbackOutcome::Failed("exchange_failed".to_string())
        }
    }
}

/// Disconnect - forget the stored credential.
async fn disconnect(State(state): State<Arc<AppState>>) -> Result<StatusCode> {
    state.spotify.disconnect()?;
    Ok(StatusCode::NO_CONTENT)
}
