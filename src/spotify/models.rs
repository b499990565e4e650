use serde::{Deserialize, Serialize};

/// Track metadata as listed in a catalog playlist.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogTrack {
    pub id: String,
    pub name: String,
    pub artists: Vec<String>,
    #[serde(default)]
    pub album: String,
    pub duration_ms: u64,
    pub uri: String,
}

/// Audio analysis for one track. Fields are optional because the catalog
/// may omit any of them; gaps are rejected when building a profile.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AudioFeatures {
    pub id: String,
    pub duration_ms: Option<u64>,
    pub tempo: Option<f64>,
    pub energy: Option<f64>,
    pub acousticness: Option<f64>,
    pub instrumentalness: Option<f64>,
    pub valence: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpotifyPlaylist {
    pub id: String,
    pub name: String,
    pub description: String,
    pub total_tracks: usize,
    pub public: bool,
    pub owner: String,
}

#[cfg(test)]
impl CatalogTrack {
    pub fn mock(id: &str, duration_ms: u64) -> Self {
        Self {
            id: id.to_string(),
            name: format!("Track {}", id),
            artists: vec!["Mock Artist".to_string()],
            album: "Mock Album".to_string(),
            duration_ms,
            uri: format!("spotify:track:{}", id),
        }
    }
}

#[cfg(test)]
impl AudioFeatures {
    pub fn mock(id: &str, tempo: f64, energy: f64) -> Self {
        Self {
            id: id.to_string(),
            duration_ms: None,
            tempo: Some(tempo),
            energy: Some(energy),
            acousticness: Some(0.1),
            instrumentalness: Some(0.0),
            valence: Some(0.5),
        }
    }
}
