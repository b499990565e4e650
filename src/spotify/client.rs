use async_trait::async_trait;
use indicatif::{ProgressBar, ProgressStyle};
use rspotify::{
    AuthCodeSpotify, Config as ClientConfig, Credentials, OAuth,
    model::{FullTrack, PlayableId, PlayableItem, PlaylistId, SimplifiedPlaylist, TrackId, UserId},
    prelude::*,
    scopes,
};
use std::future::Future;
use std::io::{self, Write};
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, info, warn};

use crate::catalog::{PlaylistSink, TrackSource};
use crate::config::Config;
use crate::error::{AppError, Result};
use crate::selector::{PlaylistRef, select_by_name};
use crate::spotify::models::{AudioFeatures, CatalogTrack, SpotifyPlaylist};

const PLAYLISTS_PAGE_LIMIT: u32 = 50;
const ITEMS_PAGE_LIMIT: u32 = 100;
const FEATURES_BATCH_SIZE: usize = 100;
/// Spotify accepts at most 100 items per add-to-playlist call.
pub const SINK_BATCH_SIZE: usize = 100;

const MAX_ATTEMPTS: u32 = 3;
const RETRY_BACKOFF_SECS: u64 = 2;

pub struct SpotifyClient {
    client: AuthCodeSpotify,
    user_id: UserId<'static>,
}

impl SpotifyClient {
    pub async fn new(config: &Config) -> Result<Self> {
        let creds = Credentials::new(&config.spotify_client_id, &config.spotify_client_secret);

        let oauth = OAuth {
            redirect_uri: config.spotify_redirect_uri.clone(),
            scopes: scopes!(
                "playlist-read-private",
                "playlist-read-collaborative",
                "playlist-modify-private",
                "playlist-modify-public"
            ),
            ..Default::default()
        };

        // Cached tokens are refreshed by the client before they expire.
        let client_config = ClientConfig {
            token_cached: true,
            token_refreshing: true,
            cache_path: config.token_cache_path.clone(),
            ..Default::default()
        };

        let client = AuthCodeSpotify::with_config(creds, oauth, client_config);

        let cached_user = if Self::restore_cached_token(&client).await {
            match client.current_user().await {
                Ok(user) => Some(user),
                Err(e) => {
                    warn!("Cached Spotify token rejected ({}), re-authorizing", e);
                    None
                }
            }
        } else {
            None
        };

        let user = match cached_user {
            Some(user) => user,
            None => {
                Self::authorize_interactively(&client).await?;
                client.current_user().await?
            }
        };

        let display_name = user
            .display_name
            .clone()
            .unwrap_or_else(|| user.id.id().to_string());
        info!("Successfully authenticated as Spotify user: {}", display_name);

        Ok(Self {
            client,
            user_id: user.id,
        })
    }

    async fn restore_cached_token(client: &AuthCodeSpotify) -> bool {
        let token = match client.read_token_cache(true).await {
            Ok(Some(token)) => token,
            Ok(None) => return false,
            Err(e) => {
                debug!("Token cache unreadable: {}", e);
                return false;
            }
        };

        let token_slot = client.get_token();
        let Ok(mut guard) = token_slot.lock().await else {
            return false;
        };
        *guard = Some(token);
        debug!("Loaded Spotify token from cache");
        true
    }

    async fn authorize_interactively(client: &AuthCodeSpotify) -> Result<()> {
        let auth_url = client.get_authorize_url(false)?;
        println!("\nOpen this URL in your browser to authorize Spotify:");
        println!("{}\n", auth_url);

        print!("Enter the URL you were redirected to: ");
        io::stdout().flush()?;

        let mut redirect_url = String::new();
        io::stdin().read_line(&mut redirect_url)?;

        let code = client
            .parse_response_code(redirect_url.trim())
            .ok_or_else(|| AppError::Auth("Failed to parse authorization code".into()))?;

        client.request_token(&code).await?;
        Ok(())
    }

    pub async fn get_user_playlists(&self) -> Result<Vec<SpotifyPlaylist>> {
        let mut playlists = Vec::new();
        let mut offset = 0;

        loop {
            let page = with_retry("Fetching playlists", || {
                self.client
                    .current_user_playlists_manual(Some(PLAYLISTS_PAGE_LIMIT), Some(offset))
            })
            .await?;

            playlists.extend(page.items.iter().map(playlist_summary));

            if page.next.is_none() {
                break;
            }
            offset += PLAYLISTS_PAGE_LIMIT;
        }

        info!("Found {} playlists", playlists.len());
        Ok(playlists)
    }

    /// Look up a playlist by URL, URI or name.
    pub async fn resolve_playlist(&self, reference: &str) -> Result<SpotifyPlaylist> {
        match PlaylistRef::parse(reference)? {
            PlaylistRef::Id(playlist_id) => {
                let id = PlaylistId::from_id(playlist_id.as_str())
                    .map_err(|e| AppError::Config(format!("Invalid playlist ID: {}", e)))?;

                let playlist = with_retry("Fetching playlist", || {
                    self.client.playlist(id.clone_static(), None, None)
                })
                .await?;

                Ok(SpotifyPlaylist {
                    id: playlist_id,
                    name: playlist.name,
                    description: playlist.description.unwrap_or_default(),
                    total_tracks: playlist.tracks.total as usize,
                    public: playlist.public.unwrap_or(false),
                    owner: playlist
                        .owner
                        .display_name
                        .unwrap_or_else(|| playlist.owner.id.id().to_string()),
                })
            }
            PlaylistRef::Name(name) => {
                let playlists = self.get_user_playlists().await?;
                select_by_name(&playlists, &name).cloned()
            }
        }
    }

    async fn get_playlist_tracks(&self, playlist: &SpotifyPlaylist) -> Result<Vec<CatalogTrack>> {
        let id = PlaylistId::from_id(playlist.id.as_str())
            .map_err(|e| AppError::Config(format!("Invalid playlist ID: {}", e)))?;

        info!(
            "Fetching tracks for playlist: {} ({} tracks)",
            playlist.name, playlist.total_tracks
        );

        let mut tracks = Vec::new();
        let mut offset = 0;

        loop {
            let page = with_retry("Fetching playlist items", || {
                self.client.playlist_items_manual(
                    id.clone_static(),
                    None,
                    None,
                    Some(ITEMS_PAGE_LIMIT),
                    Some(offset),
                )
            })
            .await?;

            for item in &page.items {
                match &item.track {
                    Some(PlayableItem::Track(track)) => match catalog_track(track) {
                        Some(catalog) => tracks.push(catalog),
                        // Local files have no catalog id and no audio analysis.
                        None => debug!("Skipping local track: {}", track.name),
                    },
                    _ => debug!("Skipping non-track playlist item"),
                }
            }

            if page.next.is_none() {
                break;
            }
            offset += ITEMS_PAGE_LIMIT;
        }

        info!("Fetched {} tracks from playlist", tracks.len());
        Ok(tracks)
    }
}

#[async_trait]
impl TrackSource for SpotifyClient {
    async fn fetch_tracks(&self, playlist: &str) -> Result<Vec<CatalogTrack>> {
        let playlist = self.resolve_playlist(playlist).await?;
        self.get_playlist_tracks(&playlist).await
    }

    async fn fetch_audio_features(&self, track_ids: &[String]) -> Result<Vec<AudioFeatures>> {
        let mut features = Vec::with_capacity(track_ids.len());

        let pb = ProgressBar::new(track_ids.len() as u64);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("  {spinner:.green} [{bar:30.cyan/blue}] {pos}/{len} analysing")
                .expect("progress template is valid")
                .progress_chars("#>-"),
        );

        for chunk in track_ids.chunks(FEATURES_BATCH_SIZE) {
            let ids: Vec<TrackId<'static>> = chunk
                .iter()
                .filter_map(|id| match TrackId::from_id(id.clone()) {
                    Ok(track_id) => Some(track_id),
                    Err(e) => {
                        warn!("Ignoring invalid track id {}: {}", id, e);
                        None
                    }
                })
                .collect();

            let batch = with_retry("Fetching audio features", || {
                self.client.tracks_features(ids.clone())
            })
            .await?;

            features.extend(batch.unwrap_or_default().iter().map(audio_features));
            pb.inc(chunk.len() as u64);
        }

        pb.finish_and_clear();
        debug!(
            "Received audio features for {}/{} tracks",
            features.len(),
            track_ids.len()
        );

        Ok(features)
    }
}

#[async_trait]
impl PlaylistSink for SpotifyClient {
    async fn submit(
        &self,
        name: &str,
        description: &str,
        track_ids: &[String],
    ) -> Result<Option<String>> {
        let items: Vec<PlayableId<'static>> = track_ids
            .iter()
            .map(|id| TrackId::from_id(id.clone()).map(PlayableId::Track))
            .collect::<std::result::Result<_, _>>()
            .map_err(|e| AppError::SpotifyApi(format!("Invalid track id: {}", e)))?;

        // Not retried: a timed-out create may still have succeeded.
        let playlist = self
            .client
            .user_playlist_create(
                self.user_id.clone(),
                name,
                Some(false),
                Some(false),
                Some(description),
            )
            .await?;

        info!("Created Spotify playlist: {}", name);

        let playlist_id = playlist.id.id().to_string();
        let added = add_in_batches(&playlist_id, &items, |batch| {
            let target = playlist.id.clone();
            async move {
                with_retry("Adding tracks", || {
                    self.client
                        .playlist_add_items(target.clone(), batch.clone(), None)
                })
                .await
                .map(|_| ())
            }
        })
        .await?;

        info!("Added {} tracks to playlist", added);
        Ok(Some(playlist_id))
    }
}

/// Split ids into add-to-playlist calls.
fn sink_batches<T>(items: &[T]) -> std::slice::Chunks<'_, T> {
    items.chunks(SINK_BATCH_SIZE)
}

/// Feed `items` to `add` one batch at a time. A failing batch stops the run
/// with [`AppError::PartialSubmit`], which keeps the playlist id and how many
/// tracks already made it in.
async fn add_in_batches<T, F, Fut>(playlist_id: &str, items: &[T], mut add: F) -> Result<usize>
where
    T: Clone,
    F: FnMut(Vec<T>) -> Fut,
    Fut: Future<Output = Result<()>>,
{
    let mut added = 0;

    for (i, batch) in sink_batches(items).enumerate() {
        if let Err(e) = add(batch.to_vec()).await {
            warn!(
                "Batch {} failed; playlist {} holds {} of {} tracks",
                i + 1,
                playlist_id,
                added,
                items.len()
            );
            return Err(AppError::PartialSubmit {
                playlist_id: playlist_id.to_string(),
                added,
                source: Box::new(e),
            });
        }
        added += batch.len();
        debug!("Added batch {} ({} tracks) to {}", i + 1, batch.len(), playlist_id);
    }

    Ok(added)
}

/// Run a catalog call, retrying rate-limit and network failures with a
/// linear back-off. Other failures are returned on the first attempt.
async fn with_retry<T, E, F, Fut>(label: &str, mut call: F) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = std::result::Result<T, E>>,
    AppError: From<E>,
{
    let mut attempt = 1;
    loop {
        match call().await.map_err(AppError::from) {
            Ok(value) => return Ok(value),
            Err(e) if e.is_transient() && attempt < MAX_ATTEMPTS => {
                let delay = Duration::from_secs(RETRY_BACKOFF_SECS * attempt as u64);
                warn!(
                    "{} failed (attempt {}/{}): {}; retrying in {}s",
                    label,
                    attempt,
                    MAX_ATTEMPTS,
                    e,
                    delay.as_secs()
                );
                sleep(delay).await;
                attempt += 1;
            }
            Err(e) => return Err(e),
        }
    }
}

fn playlist_summary(playlist: &SimplifiedPlaylist) -> SpotifyPlaylist {
    SpotifyPlaylist {
        id: playlist.id.id().to_string(),
        name: playlist.name.clone(),
        // SimplifiedPlaylist carries no description
        description: String::new(),
        total_tracks: playlist.tracks.total as usize,
        public: playlist.public.unwrap_or(false),
        owner: playlist
            .owner
            .display_name
            .clone()
            .unwrap_or_else(|| playlist.owner.id.id().to_string()),
    }
}

fn catalog_track(track: &FullTrack) -> Option<CatalogTrack> {
    let id = track.id.as_ref()?;

    Some(CatalogTrack {
        id: id.id().to_string(),
        name: track.name.clone(),
        artists: track.artists.iter().map(|a| a.name.clone()).collect(),
        album: track.album.name.clone(),
        duration_ms: track.duration.num_milliseconds().max(0) as u64,
        uri: id.uri(),
    })
}

fn audio_features(features: &rspotify::model::AudioFeatures) -> AudioFeatures {
    AudioFeatures {
        id: features.id.id().to_string(),
        duration_ms: Some(features.duration.num_milliseconds().max(0) as u64),
        tempo: Some(features.tempo as f64),
        energy: Some(features.energy as f64),
        acousticness: Some(features.acousticness as f64),
        instrumentalness: Some(features.instrumentalness as f64),
        valence: Some(features.valence as f64),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn io_failure() -> rspotify::ClientError {
        rspotify::ClientError::Io(io::Error::other("unused"))
    }

    #[tokio::test]
    async fn test_with_retry_returns_first_success() {
        let calls = AtomicU32::new(0);
        let value = with_retry("test", || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Ok::<_, rspotify::ClientError>(7) }
        })
        .await
        .unwrap();

        assert_eq!(value, 7);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_with_retry_does_not_retry_permanent_errors() {
        let calls = AtomicU32::new(0);
        let result: Result<u32> = with_retry("test", || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err(io_failure()) }
        })
        .await;

        assert!(matches!(result, Err(AppError::Io(_))));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_with_retry_recovers_from_transient_error() {
        let calls = AtomicU32::new(0);
        let value = with_retry("test", || {
            let attempt = calls.fetch_add(1, Ordering::SeqCst);
            async move {
                if attempt == 0 {
                    Err(AppError::RateLimited("slow down".into()))
                } else {
                    Ok(42u32)
                }
            }
        })
        .await
        .unwrap();

        assert_eq!(value, 42);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_with_retry_gives_up_after_max_attempts() {
        let calls = AtomicU32::new(0);
        let result: Result<u32> = with_retry("test", || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err(AppError::Network("connection reset".into())) }
        })
        .await;

        assert!(matches!(result, Err(AppError::Network(_))));
        assert_eq!(calls.load(Ordering::SeqCst), MAX_ATTEMPTS);
    }

    #[test]
    fn test_sink_batches_of_one_hundred() {
        let ids: Vec<u32> = (0..250).collect();
        let sizes: Vec<usize> = sink_batches(&ids).map(|b| b.len()).collect();
        assert_eq!(sizes, vec![100, 100, 50]);
    }

    #[tokio::test]
    async fn test_add_in_batches_sends_every_batch_in_order() {
        let ids: Vec<u32> = (0..250).collect();
        let sent = std::sync::Mutex::new(Vec::new());

        let added = add_in_batches("pl", &ids, |batch| {
            sent.lock().unwrap().push(batch);
            async { Ok(()) }
        })
        .await
        .unwrap();

        assert_eq!(added, 250);
        let sent = sent.into_inner().unwrap();
        assert_eq!(sent.iter().map(|b| b.len()).collect::<Vec<_>>(), vec![100, 100, 50]);
        assert_eq!(sent[1][0], 100);
    }

    #[tokio::test]
    async fn test_failed_batch_keeps_playlist_id_and_added_count() {
        let ids: Vec<u32> = (0..250).collect();
        let calls = AtomicU32::new(0);

        let err = add_in_batches("pl-123", &ids, |_batch| {
            let call = calls.fetch_add(1, Ordering::SeqCst);
            async move {
                if call == 1 {
                    Err(AppError::PermissionDenied("forbidden".into()))
                } else {
                    Ok(())
                }
            }
        })
        .await
        .unwrap_err();

        assert_eq!(calls.load(Ordering::SeqCst), 2);
        match err {
            AppError::PartialSubmit {
                playlist_id,
                added,
                source,
            } => {
                assert_eq!(playlist_id, "pl-123");
                assert_eq!(added, 100);
                assert!(matches!(*source, AppError::PermissionDenied(_)));
            }
            other => panic!("unexpected error: {}", other),
        }
    }
}
