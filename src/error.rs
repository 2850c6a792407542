// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Application error types with consistent API responses.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

/// Application error type that converts to HTTP responses.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// Authorization code could not be exchanged for tokens.
    /// The user has to restart the authorization flow.
    #[error("Spotify token exchange failed: {0}")]
    AuthExchange(String),

    /// Spotify rejected the access token (expired or revoked).
    #[error("Spotify rejected the access token")]
    SpotifyUnauthorized,

    #[error("Spotify API error: {0}")]
    SpotifyApi(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Resource not found: {0}")]
    NotFound(String),

    /// Too many presence sessions are open.
    #[error("Presence session limit of {0} reached")]
    SessionLimit(usize),

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    /// Whether the error means the stored credential is no longer usable.
    pub fn is_spotify_token_error(&self) -> bool {
        matches!(self, AppError::SpotifyUnauthorized)
    }
}

/// JSON error response body
#[derive(Serialize)]
struct ErrorResponse {
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<String>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error, details) = match &self {
            AppError::AuthExchange(msg) => (
                StatusCode::BAD_GATEWAY,
                "auth_exchange_failed",
                Some(msg.clone()),
            ),
            AppError::SpotifyUnauthorized => {
                (StatusCode::UNAUTHORIZED, "spotify_unauthorized", None)
            }
            AppError::SpotifyApi(msg) => {
                (StatusCode::BAD_GATEWAY, "spotify_error", Some(msg.clone()))
            }
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, "not_found", Some(msg.clone())),
            AppError::SessionLimit(limit) => (
                StatusCode::SERVICE_UNAVAILABLE,
                "session_limit",
                Some(format!("at most {} presence sessions may be open", limit)),
            ),
            AppError::Storage(msg) => {
                tracing::error!(error = %msg, "Storage error");
                (StatusCode::INTERNAL_SERVER_ERROR, "storage_error", None)
            }
            AppError::Internal(err) => {
                tracing::error!(error = %err, "Internal server error");
                (StatusCode::INTERNAL_SERVER_ERROR, "internal_error", None)
            }
        };

        let body = ErrorResponse {
            error: error.to_string(),
            details,
        };

        (status, Json(body)).into_response()
    }
}

/// Result type alias for handlers
pub type Result<T> = std::result::Result<T, AppError>;
