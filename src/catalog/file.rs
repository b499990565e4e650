use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::catalog::TrackSource;
use crate::error::Result;
use crate::spotify::{AudioFeatures, CatalogTrack};

/// One entry of a track export: catalog fields plus optional features.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackRecord {
    #[serde(flatten)]
    pub track: CatalogTrack,
    #[serde(default)]
    pub features: Option<RecordFeatures>,
}

/// Feature fields as stored inline in a record; the id comes from the track.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RecordFeatures {
    pub tempo: Option<f64>,
    pub energy: Option<f64>,
    pub acousticness: Option<f64>,
    pub instrumentalness: Option<f64>,
    pub valence: Option<f64>,
}

/// Offline track source backed by a JSON array of [`TrackRecord`]s.
#[derive(Debug, Clone)]
pub struct JsonFileSource {
    path: PathBuf,
    records: Vec<TrackRecord>,
}

impl JsonFileSource {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let content = fs::read_to_string(&path)?;
        let records: Vec<TrackRecord> = serde_json::from_str(&content)?;

        info!("Loaded {} tracks from {}", records.len(), path.display());

        Ok(Self { path, records })
    }
}

#[async_trait]
impl TrackSource for JsonFileSource {
    async fn fetch_tracks(&self, playlist: &str) -> Result<Vec<CatalogTrack>> {
        debug!(
            "Reading '{}' from {}",
            playlist,
            self.path.display()
        );
        Ok(self.records.iter().map(|r| r.track.clone()).collect())
    }

    async fn fetch_audio_features(&self, track_ids: &[String]) -> Result<Vec<AudioFeatures>> {
        Ok(self
            .records
            .iter()
            .filter(|r| track_ids.contains(&r.track.id))
            .filter_map(|r| {
                r.features.as_ref().map(|f| AudioFeatures {
                    id: r.track.id.clone(),
                    duration_ms: None,
                    tempo: f.tempo,
                    energy: f.energy,
                    acousticness: f.acousticness,
                    instrumentalness: f.instrumentalness,
                    valence: f.valence,
                })
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::load_profiles;
    use std::io::Write;

    const EXPORT: &str = r#"[
        {
            "id": "1",
            "name": "Slow Burn",
            "artists": ["Kacey Musgraves"],
            "duration_ms": 246000,
            "uri": "spotify:track:1",
            "features": {"tempo": 92.0, "energy": 0.41, "acousticness": 0.7, "instrumentalness": 0.0, "valence": 0.3}
        },
        {
            "id": "2",
            "name": "Around the World",
            "artists": ["Daft Punk"],
            "album": "Homework",
            "duration_ms": 429000,
            "uri": "spotify:track:2",
            "features": {"tempo": 121.3, "energy": 0.8, "acousticness": 0.0, "instrumentalness": 0.4, "valence": 0.8}
        },
        {
            "id": "3",
            "name": "Local Demo",
            "artists": ["Nobody"],
            "duration_ms": 100000,
            "uri": "spotify:track:3"
        }
    ]"#;

    fn write_export() -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(EXPORT.as_bytes()).unwrap();
        file
    }

    #[tokio::test]
    async fn test_reads_tracks_and_features() {
        let file = write_export();
        let source = JsonFileSource::open(file.path()).unwrap();

        let tracks = source.fetch_tracks("export").await.unwrap();
        assert_eq!(tracks.len(), 3);
        assert_eq!(tracks[1].album, "Homework");
        assert_eq!(tracks[0].album, "");

        let ids: Vec<String> = tracks.iter().map(|t| t.id.clone()).collect();
        let features = source.fetch_audio_features(&ids).await.unwrap();
        assert_eq!(features.len(), 2);
        assert_eq!(features[0].id, "1");
        assert_eq!(features[1].tempo, Some(121.3));
    }

    #[tokio::test]
    async fn test_record_without_features_is_skipped_when_loading() {
        let file = write_export();
        let source = JsonFileSource::open(file.path()).unwrap();

        let loaded = load_profiles(&source, "export").await.unwrap();
        assert_eq!(loaded.total_tracks, 3);
        assert_eq!(loaded.skipped, 1);
        assert_eq!(loaded.profiles.len(), 2);
    }

    #[test]
    fn test_invalid_json_is_an_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"{ not json").unwrap();
        assert!(JsonFileSource::open(file.path()).is_err());
    }
}
