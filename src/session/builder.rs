use tracing::{info, warn};

use crate::catalog::{PlaylistSink, TrackSource, load_profiles};
use crate::error::{AppError, Result};
use crate::mood::{
    DEFAULT_TARGET_DURATION_MS, MoodBreakdown, MoodCategory, SessionRequest, format_duration_ms,
};
use crate::session::report::SessionReport;

const MS_PER_MINUTE: u64 = 60_000;

#[derive(Debug, Clone)]
pub struct SessionOptions {
    pub mood: MoodCategory,
    pub target_duration_ms: u64,
    /// Name for the new playlist; defaults to "<Mood> Session".
    pub name: Option<String>,
}

impl SessionOptions {
    pub fn new(mood: MoodCategory) -> Self {
        Self {
            mood,
            target_duration_ms: DEFAULT_TARGET_DURATION_MS,
            name: None,
        }
    }

    /// Options for a session of `minutes` minutes.
    pub fn from_minutes(mood: MoodCategory, minutes: u64) -> Result<Self> {
        if minutes == 0 {
            return Err(AppError::Config(
                "session length must be at least one minute".into(),
            ));
        }
        let target_duration_ms = minutes.checked_mul(MS_PER_MINUTE).ok_or_else(|| {
            AppError::Config(format!("session length of {} minutes is too large", minutes))
        })?;

        Ok(Self {
            target_duration_ms,
            ..Self::new(mood)
        })
    }

    pub fn playlist_name(&self) -> String {
        self.name
            .clone()
            .unwrap_or_else(|| format!("{} Session", self.mood))
    }
}

/// Turns a source playlist into a mood session and hands it to a sink.
pub struct SessionBuilder<'a, S: ?Sized, K: ?Sized> {
    source: &'a S,
    sink: &'a K,
}

impl<'a, S, K> SessionBuilder<'a, S, K>
where
    S: TrackSource + ?Sized,
    K: PlaylistSink + ?Sized,
{
    pub fn new(source: &'a S, sink: &'a K) -> Self {
        Self { source, sink }
    }

    pub async fn build(&self, playlist: &str, options: &SessionOptions) -> Result<SessionReport> {
        info!(
            "Building {} session from '{}' (target {})",
            options.mood,
            playlist,
            format_duration_ms(options.target_duration_ms)
        );

        let loaded = load_profiles(self.source, playlist).await?;
        let breakdown = MoodBreakdown::tally(&loaded.profiles);

        info!(
            "{} of {} tracks classified ({} calm, {} building)",
            loaded.profiles.len(),
            loaded.total_tracks,
            breakdown.calm,
            breakdown.building
        );

        let assembled = SessionRequest::new(options.mood, loaded.profiles)
            .with_target_duration(options.target_duration_ms)
            .assemble();

        let name = options.playlist_name();
        let mut report = SessionReport::new(
            playlist.to_string(),
            name.clone(),
            &assembled,
            breakdown,
            loaded.total_tracks,
            loaded.skipped,
        );

        if assembled.is_empty() {
            warn!(
                "No {} tracks fit within {}; nothing to submit",
                options.mood,
                format_duration_ms(options.target_duration_ms)
            );
            return Ok(report);
        }

        let description = format!(
            "{} session built from {}: {} tracks, {}",
            options.mood,
            playlist,
            assembled.len(),
            format_duration_ms(assembled.total_duration_ms())
        );

        match self
            .sink
            .submit(&name, &description, &assembled.track_ids())
            .await
        {
            Ok(playlist_id) => {
                if playlist_id.is_some() {
                    report.submitted_tracks = assembled.len();
                }
                report.playlist_id = playlist_id;
            }
            // The playlist exists; keep it in the report so it can be found.
            Err(AppError::PartialSubmit {
                playlist_id,
                added,
                source,
            }) => {
                warn!(
                    "Playlist {} holds only {} of {} tracks: {}",
                    playlist_id,
                    added,
                    assembled.len(),
                    source
                );
                report.playlist_id = Some(playlist_id);
                report.submitted_tracks = added;
                return Ok(report);
            }
            Err(e) => return Err(e),
        }

        info!(
            "Session complete: {} tracks, {} of {}",
            assembled.len(),
            format_duration_ms(assembled.total_duration_ms()),
            format_duration_ms(options.target_duration_ms)
        );

        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spotify::{AudioFeatures, CatalogTrack};
    use async_trait::async_trait;
    use std::sync::Mutex;

    struct FakeSource {
        tracks: Vec<CatalogTrack>,
        features: Vec<AudioFeatures>,
    }

    #[async_trait]
    impl TrackSource for FakeSource {
        async fn fetch_tracks(&self, playlist: &str) -> Result<Vec<CatalogTrack>> {
            if playlist == "missing" {
                return Err(AppError::NotFound(playlist.to_string()));
            }
            Ok(self.tracks.clone())
        }

        async fn fetch_audio_features(&self, _track_ids: &[String]) -> Result<Vec<AudioFeatures>> {
            Ok(self.features.clone())
        }
    }

    #[derive(Default)]
    struct RecordingSink {
        submitted: Mutex<Vec<(String, String, Vec<String>)>>,
    }

    #[async_trait]
    impl PlaylistSink for RecordingSink {
        async fn submit(
            &self,
            name: &str,
            description: &str,
            track_ids: &[String],
        ) -> Result<Option<String>> {
            self.submitted.lock().unwrap().push((
                name.to_string(),
                description.to_string(),
                track_ids.to_vec(),
            ));
            Ok(Some("new-playlist".to_string()))
        }
    }

    fn source() -> FakeSource {
        // t1..t3 calm (slow), t4 building.
        FakeSource {
            tracks: vec![
                CatalogTrack::mock("t1", 600_000),
                CatalogTrack::mock("t2", 900_000),
                CatalogTrack::mock("t3", 900_000),
                CatalogTrack::mock("t4", 300_000),
                CatalogTrack::mock("t5", 300_000),
            ],
            features: vec![
                AudioFeatures::mock("t1", 80.0, 0.1),
                AudioFeatures::mock("t2", 85.0, 0.2),
                AudioFeatures::mock("t3", 90.0, 0.3),
                AudioFeatures::mock("t4", 128.0, 0.9),
            ],
        }
    }

    #[tokio::test]
    async fn test_build_submits_assembled_ids_in_order() {
        let source = source();
        let sink = RecordingSink::default();
        let builder = SessionBuilder::new(&source, &sink);

        let report = builder
            .build("Evening", &SessionOptions::new(MoodCategory::Calm))
            .await
            .unwrap();

        let submitted = sink.submitted.lock().unwrap();
        assert_eq!(submitted.len(), 1);
        let (name, description, ids) = &submitted[0];
        assert_eq!(name, "Calm Session");
        assert!(description.starts_with("Calm session built from Evening: 2 tracks"));
        assert_eq!(ids, &vec!["t1".to_string(), "t2".to_string()]);

        assert_eq!(report.playlist_id.as_deref(), Some("new-playlist"));
        assert_eq!(report.total_tracks, 5);
        assert_eq!(report.skipped_tracks, 1);
        assert_eq!(report.breakdown.calm, 3);
        assert_eq!(report.breakdown.building, 1);
        assert_eq!(report.total_duration_ms, 1_500_000);
    }

    #[tokio::test]
    async fn test_build_uses_custom_name_and_target() {
        let source = source();
        let sink = RecordingSink::default();
        let builder = SessionBuilder::new(&source, &sink);

        let options = SessionOptions {
            mood: MoodCategory::Building,
            target_duration_ms: 600_000,
            name: Some("Warm Up".to_string()),
        };
        let report = builder.build("Gym", &options).await.unwrap();

        let submitted = sink.submitted.lock().unwrap();
        assert_eq!(submitted[0].0, "Warm Up");
        assert_eq!(submitted[0].2, vec!["t4".to_string()]);
        assert_eq!(report.playlist_name, "Warm Up");
    }

    #[tokio::test]
    async fn test_empty_assembly_is_not_submitted() {
        let source = source();
        let sink = RecordingSink::default();
        let builder = SessionBuilder::new(&source, &sink);

        let options = SessionOptions {
            target_duration_ms: 100_000,
            ..SessionOptions::new(MoodCategory::Calm)
        };
        let report = builder.build("Evening", &options).await.unwrap();

        assert!(report.selected_tracks.is_empty());
        assert_eq!(report.playlist_id, None);
        assert!(sink.submitted.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_source_errors_propagate() {
        let source = source();
        let sink = RecordingSink::default();
        let builder = SessionBuilder::new(&source, &sink);

        let err = builder
            .build("missing", &SessionOptions::new(MoodCategory::Calm))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    struct FailingSink;

    #[async_trait]
    impl PlaylistSink for FailingSink {
        async fn submit(
            &self,
            _name: &str,
            _description: &str,
            _track_ids: &[String],
        ) -> Result<Option<String>> {
            Err(AppError::PartialSubmit {
                playlist_id: "half-full".to_string(),
                added: 1,
                source: Box::new(AppError::RateLimited("slow down".into())),
            })
        }
    }

    #[tokio::test]
    async fn test_partial_submit_is_kept_in_report() {
        let source = source();
        let builder = SessionBuilder::new(&source, &FailingSink);

        let report = builder
            .build("Evening", &SessionOptions::new(MoodCategory::Calm))
            .await
            .unwrap();

        assert_eq!(report.playlist_id.as_deref(), Some("half-full"));
        assert_eq!(report.submitted_tracks, 1);
        assert_eq!(report.selected_tracks.len(), 2);
    }

    #[tokio::test]
    async fn test_full_submit_counts_every_track() {
        let source = source();
        let sink = RecordingSink::default();
        let report = SessionBuilder::new(&source, &sink)
            .build("Evening", &SessionOptions::new(MoodCategory::Calm))
            .await
            .unwrap();

        assert_eq!(report.submitted_tracks, 2);
    }

    #[test]
    fn test_options_from_minutes() {
        let options = SessionOptions::from_minutes(MoodCategory::Calm, 38).unwrap();
        assert_eq!(options.target_duration_ms, DEFAULT_TARGET_DURATION_MS);
    }

    #[test]
    fn test_options_from_minutes_rejects_overflow_and_zero() {
        assert!(matches!(
            SessionOptions::from_minutes(MoodCategory::Calm, 400_000_000_000_000),
            Err(AppError::Config(_))
        ));
        assert!(matches!(
            SessionOptions::from_minutes(MoodCategory::Building, u64::MAX),
            Err(AppError::Config(_))
        ));
        assert!(SessionOptions::from_minutes(MoodCategory::Calm, 0).is_err());
    }
}
