// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Services module - business logic layer.

pub mod presence;
pub mod spotify;

pub use presence::{PresenceSession, PresenceSettings, SessionRegistry, SnapshotCell};
pub use spotify::{SpotifyClient, SpotifyService, StatusFetcher};
