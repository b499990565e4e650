pub mod file;

use async_trait::async_trait;
use std::collections::HashMap;
use tracing::{debug, info, warn};

use crate::error::Result;
use crate::mood::TrackAudioProfile;
use crate::spotify::{AudioFeatures, CatalogTrack};

pub use file::JsonFileSource;

/// Where candidate tracks come from.
#[async_trait]
pub trait TrackSource: Send + Sync {
    /// Every track of `playlist`, all pages already fetched.
    async fn fetch_tracks(&self, playlist: &str) -> Result<Vec<CatalogTrack>>;

    /// Feature vectors for the given ids. Tracks without analysis are simply
    /// absent from the result.
    async fn fetch_audio_features(&self, track_ids: &[String]) -> Result<Vec<AudioFeatures>>;
}

/// Where an assembled session is written.
#[async_trait]
pub trait PlaylistSink: Send + Sync {
    /// Create a playlist holding `track_ids` in order and return its id, or
    /// `None` if nothing was persisted.
    async fn submit(
        &self,
        name: &str,
        description: &str,
        track_ids: &[String],
    ) -> Result<Option<String>>;
}

/// Sink that only logs; used for `--dry-run`.
#[derive(Debug, Default, Clone, Copy)]
pub struct DryRunSink;

#[async_trait]
impl PlaylistSink for DryRunSink {
    async fn submit(
        &self,
        name: &str,
        _description: &str,
        track_ids: &[String],
    ) -> Result<Option<String>> {
        info!(
            "Dry run: would create playlist '{}' with {} tracks",
            name,
            track_ids.len()
        );
        Ok(None)
    }
}

/// Profiles ready for classification plus how many tracks were dropped.
#[derive(Debug, Clone, Default)]
pub struct LoadedProfiles {
    pub profiles: Vec<TrackAudioProfile>,
    pub total_tracks: usize,
    pub skipped: usize,
}

/// Fetch a playlist and its audio features and join them by track id.
///
/// Tracks with no feature vector, or an incomplete one, are left out.
pub async fn load_profiles<S>(source: &S, playlist: &str) -> Result<LoadedProfiles>
where
    S: TrackSource + ?Sized,
{
    let tracks = source.fetch_tracks(playlist).await?;
    let total_tracks = tracks.len();

    let ids: Vec<String> = tracks.iter().map(|t| t.id.clone()).collect();
    let features: HashMap<String, AudioFeatures> = source
        .fetch_audio_features(&ids)
        .await?
        .into_iter()
        .map(|f| (f.id.clone(), f))
        .collect();

    let mut profiles = Vec::with_capacity(total_tracks);
    let mut skipped = 0;

    for track in tracks {
        let Some(track_features) = features.get(&track.id) else {
            warn!("No audio features for {} ({}), skipping", track.name, track.id);
            skipped += 1;
            continue;
        };

        let name = track.name.clone();
        match TrackAudioProfile::from_parts(track, track_features) {
            Ok(profile) => profiles.push(profile),
            Err(e) => {
                warn!("Skipping {}: {}", name, e);
                skipped += 1;
            }
        }
    }

    debug!(
        "Loaded {} profiles from {} tracks ({} skipped)",
        profiles.len(),
        total_tracks,
        skipped
    );

    Ok(LoadedProfiles {
        profiles,
        total_tracks,
        skipped,
    })
}
