// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Presence Tracker: Spotify "now playing" status for a presence dashboard
//!
//! This crate provides the backend for connecting a Spotify account,
//! storing its credential, and polling what the user is currently playing.

pub mod config;
pub mod error;
pub mod models;
pub mod routes;
pub mod services;
pub mod store;
pub mod time_utils;

use config::Config;
use services::{PresenceSettings, SessionRegistry, SpotifyService};
use std::sync::Arc;

/// Shared application state.
pub struct AppState {
    pub config: Config,
    pub spotify: Arc<SpotifyService>,
    pub sessions: Arc<SessionRegistry>,
    pub presence_settings: PresenceSettings,
}

impl AppState {
    pub fn new(config: Config, spotify: SpotifyService) -> Self {
        let presence_settings = PresenceSettings::from_config(&config);
        let sessions = Arc::new(SessionRegistry::from_config(&config));
        Self {
            config,
            spotify: Arc::new(spotify),
            sessions,
            presence_settings,
        }
    }
}
