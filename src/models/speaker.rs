// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Speaker (audio) payloads for speaker-equipped bases.

use serde::Deserialize;

use super::lenient_i64;

/// Response of the audio player endpoint.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PlayerState {
    /// `playing`, `paused`, or absent when idle.
    pub state: Option<String>,
    /// Volume, 0..=100.
    #[serde(deserialize_with = "lenient_i64")]
    pub volume: Option<i64>,
    pub current_track: Option<AudioTrack>,
    pub hardware_info: Option<SpeakerHardwareInfo>,
}

impl PlayerState {
    pub fn is_playing(&self) -> bool {
        self.state.as_deref().is_some_and(|s| s.eq_ignore_ascii_case("playing"))
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AudioTrack {
    pub id: Option<String>,
    pub name: Option<String>,
    pub category_id: Option<String>,
    #[serde(deserialize_with = "lenient_i64")]
    pub current_position: Option<i64>,
    #[serde(deserialize_with = "lenient_i64")]
    pub track_duration: Option<i64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SpeakerHardwareInfo {
    pub sku: Option<String>,
    pub hardware_version: Option<String>,
    pub software_version: Option<String>,
}

/// Response of the audio track catalog endpoint.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AudioTracksResponse {
    pub tracks: Vec<AudioTrack>,
}
