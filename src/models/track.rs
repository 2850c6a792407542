// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! "Now playing" snapshot and the Spotify payload it is mapped from.

use serde::{Deserialize, Serialize};
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

/// Transient snapshot of what the user is currently playing.
///
/// Fully replaced on every poll; only `progress_ms` is ever advanced locally.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct TrackStatus {
    pub title: String,
    /// Artist names in the order Spotify reports them
    pub artist_names: Vec<String>,
    pub album_name: String,
    /// First album image, or empty if the album has none
    pub album_art_url: String,
    pub is_playing: bool,
    #[cfg_attr(feature = "binding-generation", ts(type = "number"))]
    pub progress_ms: u64,
    #[cfg_attr(feature = "binding-generation", ts(type = "number"))]
    pub duration_ms: u64,
    /// Link to the track on open.spotify.com
    pub external_url: String,
}

impl TrackStatus {
    /// Artist names joined for display, e.g. `"A, B"`.
    pub fn artist_display(&self) -> String {
        self.artist_names.join(", ")
    }

    /// Advance progress by one interpolation step.
    ///
    /// Does nothing while paused, and never moves progress to or past the
    /// track duration. Returns whether the value changed.
    pub fn advance_progress(&mut self, increment_ms: u64) -> bool {
        if !self.is_playing {
            return false;
        }

        let next = self.progress_ms.saturating_add(increment_ms);
        if next >= self.duration_ms {
            return false;
        }

        self.progress_ms = next;
        true
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Spotify wire format (GET /v1/me/player/currently-playing)
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Deserialize)]
pub struct CurrentlyPlayingResponse {
    #[serde(default)]
    pub is_playing: bool,
    pub progress_ms: Option<u64>,
    /// Null for ads and while switching tracks
    pub item: Option<SpotifyTrackItem>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SpotifyTrackItem {
    pub name: String,
    pub artists: Vec<SpotifyArtist>,
    pub album: SpotifyAlbum,
    pub duration_ms: u64,
    #[serde(default)]
    pub external_urls: SpotifyExternalUrls,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SpotifyArtist {
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SpotifyAlbum {
    pub name: String,
    #[serde(default)]
    pub images: Vec<SpotifyImage>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SpotifyImage {
    pub url: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SpotifyExternalUrls {
    pub spotify: Option<String>,
}

impl CurrentlyPlayingResponse {
    /// Map the payload to a snapshot. `None` when nothing playable is loaded.
    pub fn into_track_status(self) -> Option<TrackStatus> {
        let item = self.item?;

        Some(TrackStatus {
            title: item.name,
            artist_names: item.artists.into_iter().map(|a| a.name).collect(),
            album_name: item.album.name,
            album_art_url: item
                .album
                .images
                .into_iter()
                .next()
                .map(|image| image.url)
                .unwrap_or_default(),
            is_playing: self.is_playing,
            progress_ms: self.progress_ms.unwrap_or(0),
            duration_ms: item.duration_ms,
            external_url: item.external_urls.spotify.unwrap_or_default(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(json: serde_json::Value) -> Option<TrackStatus> {
        serde_json::from_value::<CurrentlyPlayingResponse>(json)
            .expect("payload should parse")
            .into_track_status()
    }

    #[test]
    fn test_maps_full_payload() {
        let status = parse(serde_json::json!({
            "is_playing": true,
            "progress_ms": 42_000,
            "item": {
                "name": "Song",
                "artists": [{"name": "A"}, {"name": "B"}],
                "album": {
                    "name": "Album",
                    "images": [
                        {"url": "https://i.scdn.co/large", "height": 640, "width": 640},
                        {"url": "https://i.scdn.co/small", "height": 64, "width": 64}
                    ]
                },
                "duration_ms": 180_000,
                "external_urls": {"spotify": "https://open.spotify.com/track/1"}
            }
        }))
        .expect("item present");

        assert_eq!(status.title, "Song");
        assert_eq!(status.artist_display(), "A, B");
        assert_eq!(status.album_name, "Album");
        assert_eq!(status.album_art_url, "https://i.scdn.co/large");
        assert!(status.is_playing);
        assert_eq!(status.progress_ms, 42_000);
        assert_eq!(status.duration_ms, 180_000);
        assert_eq!(status.external_url, "https://open.spotify.com/track/1");
    }

    #[test]
    fn test_missing_image_and_progress_default() {
        let status = parse(serde_json::json!({
            "is_playing": false,
            "item": {
                "name": "Song",
                "artists": [{"name": "Solo"}],
                "album": {"name": "Album", "images": []},
                "duration_ms": 1000,
                "external_urls": {"spotify": "https://open.spotify.com/track/2"}
            }
        }))
        .expect("item present");

        assert_eq!(status.album_art_url, "");
        assert_eq!(status.progress_ms, 0);
        assert_eq!(status.artist_display(), "Solo");
    }

    #[test]
    fn test_null_item_is_absent() {
        assert!(parse(serde_json::json!({"is_playing": true, "progress_ms": 10, "item": null})).is_none());
        assert!(parse(serde_json::json!({"is_playing": false})).is_none());
    }

    #[test]
    fn test_advance_progress_stops_before_duration() {
        let mut status = TrackStatus {
            title: "t".to_string(),
            artist_names: vec![],
            album_name: "a".to_string(),
            album_art_url: String::new(),
            is_playing: true,
            progress_ms: 8_000,
            duration_ms: 10_000,
            external_url: String::new(),
        };

        assert!(status.advance_progress(1000));
        assert_eq!(status.progress_ms, 9_000);

        // 10_000 would reach the duration: left unchanged
        assert!(!status.advance_progress(1000));
        assert_eq!(status.progress_ms, 9_000);

        status.is_playing = false;
        status.progress_ms = 0;
        assert!(!status.advance_progress(1000));
        assert_eq!(status.progress_ms, 0);
    }

    #[test]
    fn test_serializes_camel_case() {
        let status = TrackStatus {
            title: "t".to_string(),
            artist_names: vec!["A".to_string()],
            album_name: "a".to_string(),
            album_art_url: String::new(),
            is_playing: true,
            progress_ms: 1,
            duration_ms: 2,
            external_url: String::new(),
        };

        let json = serde_json::to_value(&status).unwrap();
        assert_eq!(json["artistNames"][0], "A");
        assert_eq!(json["isPlaying"], true);
        assert_eq!(json["progressMs"], 1);
        assert_eq!(json["albumArtUrl"], "");
    }
}
