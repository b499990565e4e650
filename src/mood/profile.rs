use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};
use crate::spotify::{AudioFeatures, CatalogTrack};

/// One song together with the audio attributes the classifier looks at.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackAudioProfile {
    pub id: String,
    pub name: String,
    pub artists: Vec<String>,
    pub duration_ms: u64,
    pub tempo: f64,
    pub energy: f64,
    pub acousticness: f64,
    pub instrumentalness: f64,
    pub valence: f64,
    pub uri: String,
}

impl TrackAudioProfile {
    /// Join catalog metadata with its audio features.
    ///
    /// Missing or non-finite numbers, a negative tempo and a zero duration
    /// are rejected instead of being read as zero. Energy and the other
    /// ratios are taken as-is, even outside [0, 1].
    pub fn from_parts(track: CatalogTrack, features: &AudioFeatures) -> Result<Self> {
        let incomplete = || AppError::IncompleteFeatures(track.id.clone());

        let tempo = finite(features.tempo).ok_or_else(incomplete)?;
        let energy = finite(features.energy).ok_or_else(incomplete)?;
        let acousticness = finite(features.acousticness).ok_or_else(incomplete)?;
        let instrumentalness = finite(features.instrumentalness).ok_or_else(incomplete)?;
        let valence = finite(features.valence).ok_or_else(incomplete)?;

        if tempo < 0.0 {
            return Err(incomplete());
        }

        // Playlist metadata wins; the analysis duration fills in when it is absent.
        let duration_ms = match track.duration_ms {
            0 => features.duration_ms.unwrap_or(0),
            ms => ms,
        };
        if duration_ms == 0 {
            return Err(incomplete());
        }

        Ok(Self {
            id: track.id,
            name: track.name,
            artists: track.artists,
            duration_ms,
            tempo,
            energy,
            acousticness,
            instrumentalness,
            valence,
            uri: track.uri,
        })
    }

    pub fn artist_line(&self) -> String {
        self.artists.join(", ")
    }
}

fn finite(value: Option<f64>) -> Option<f64> {
    value.filter(|v| v.is_finite())
}

/// Render milliseconds as `m:ss`.
pub fn format_duration_ms(ms: u64) -> String {
    let total_secs = ms / 1000;
    format!("{}:{:02}", total_secs / 60, total_secs % 60)
}

#[cfg(test)]
impl TrackAudioProfile {
    pub fn mock(id: &str, duration_ms: u64, tempo: f64, energy: f64) -> Self {
        Self {
            id: id.to_string(),
            name: format!("Track {}", id),
            artists: vec!["Mock Artist".to_string()],
            duration_ms,
            tempo,
            energy,
            acousticness: 0.1,
            instrumentalness: 0.0,
            valence: 0.5,
            uri: format!("spotify:track:{}", id),
        }
    }
}
