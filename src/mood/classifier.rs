use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::mood::profile::TrackAudioProfile;

const CALM_TEMPO_BELOW: f64 = 100.0;
const CALM_ENERGY_BELOW: f64 = 0.5;
const CALM_ACOUSTICNESS_ABOVE: f64 = 0.6;
const CALM_INSTRUMENTALNESS_ABOVE: f64 = 0.5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MoodCategory {
    Calm,
    Building,
}

impl std::fmt::Display for MoodCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MoodCategory::Calm => write!(f, "Calm"),
            MoodCategory::Building => write!(f, "Building"),
        }
    }
}

impl FromStr for MoodCategory {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "calm" => Ok(MoodCategory::Calm),
            "building" => Ok(MoodCategory::Building),
            other => Err(format!(
                "unknown mood '{}' (expected 'calm' or 'building')",
                other
            )),
        }
    }
}

/// Classify a track by fixed thresholds. Any single calm signal wins.
pub fn classify(profile: &TrackAudioProfile) -> MoodCategory {
    if profile.tempo < CALM_TEMPO_BELOW
        || profile.energy < CALM_ENERGY_BELOW
        || profile.acousticness > CALM_ACOUSTICNESS_ABOVE
        || profile.instrumentalness > CALM_INSTRUMENTALNESS_ABOVE
    {
        MoodCategory::Calm
    } else {
        MoodCategory::Building
    }
}

/// Calm/Building counts for a set of tracks.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MoodBreakdown {
    pub calm: usize,
    pub building: usize,
}

impl MoodBreakdown {
    pub fn tally(tracks: &[TrackAudioProfile]) -> Self {
        tracks
            .iter()
            .fold(Self::default(), |mut acc, track| {
                match classify(track) {
                    MoodCategory::Calm => acc.calm += 1,
                    MoodCategory::Building => acc.building += 1,
                }
                acc
            })
    }

    pub fn count(&self, mood: MoodCategory) -> usize {
        match mood {
            MoodCategory::Calm => self.calm,
            MoodCategory::Building => self.building,
        }
    }

    pub fn total(&self) -> usize {
        self.calm + self.building
    }
}
