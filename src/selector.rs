use strsim::jaro_winkler;
use url::Url;

use crate::error::{AppError, Result};
use crate::spotify::SpotifyPlaylist;

const SUGGESTION_THRESHOLD: f64 = 0.85;
const URI_PREFIX: &str = "spotify:playlist:";

/// How the user referred to a source playlist.
#[derive(Debug, Clone, PartialEq)]
pub enum PlaylistRef {
    Id(String),
    Name(String),
}

impl PlaylistRef {
    /// Supports:
    /// - https://open.spotify.com/playlist/37i9dQZF1E8NC99vGqLsaH
    /// - https://open.spotify.com/playlist/37i9dQZF1E8NC99vGqLsaH?si=...
    /// - spotify:playlist:37i9dQZF1E8NC99vGqLsaH
    ///
    /// Anything else is a playlist name.
    pub fn parse(input: &str) -> Result<Self> {
        let input = input.trim();

        if let Some(id) = input.strip_prefix(URI_PREFIX) {
            return Ok(PlaylistRef::Id(id.to_string()));
        }

        if !input.starts_with("http://") && !input.starts_with("https://") {
            return Ok(PlaylistRef::Name(input.to_string()));
        }

        let url = Url::parse(input).map_err(|e| AppError::Config(format!("Invalid URL: {}", e)))?;

        let path_segments: Vec<&str> = url
            .path_segments()
            .ok_or_else(|| AppError::Config("Invalid Spotify URL".into()))?
            .collect();

        // Expect /playlist/{id}
        if path_segments.len() >= 2 && path_segments[0] == "playlist" && !path_segments[1].is_empty()
        {
            Ok(PlaylistRef::Id(path_segments[1].to_string()))
        } else {
            Err(AppError::Config(
                "URL does not appear to be a Spotify playlist URL".into(),
            ))
        }
    }
}

/// Find a playlist by case-insensitive name.
///
/// When there is no exact match the error names the closest playlist, if any
/// is similar enough.
pub fn select_by_name<'a>(playlists: &'a [SpotifyPlaylist], name: &str) -> Result<&'a SpotifyPlaylist> {
    let wanted = name.trim().to_lowercase();

    if let Some(found) = playlists
        .iter()
        .find(|p| p.name.trim().to_lowercase() == wanted)
    {
        return Ok(found);
    }

    let suggestion = playlists
        .iter()
        .map(|p| (p, jaro_winkler(&p.name.to_lowercase(), &wanted)))
        .filter(|(_, score)| *score >= SUGGESTION_THRESHOLD)
        .max_by(|a, b| a.1.total_cmp(&b.1));

    match suggestion {
        Some((p, _)) => Err(AppError::NotFound(format!(
            "{} (did you mean '{}'?)",
            name, p.name
        ))),
        None => Err(AppError::NotFound(name.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn playlist(name: &str) -> SpotifyPlaylist {
        SpotifyPlaylist {
            id: format!("id-{}", name),
            name: name.to_string(),
            description: String::new(),
            total_tracks: 10,
            public: false,
            owner: "me".to_string(),
        }
    }

    #[test]
    fn test_parse_playlist_url() {
        let parsed =
            PlaylistRef::parse("https://open.spotify.com/playlist/37i9dQZF1E8NC99vGqLsaH?si=abc")
                .unwrap();
        assert_eq!(parsed, PlaylistRef::Id("37i9dQZF1E8NC99vGqLsaH".into()));
    }

    #[test]
    fn test_parse_playlist_uri() {
        let parsed = PlaylistRef::parse("spotify:playlist:37i9dQZF1E8NC99vGqLsaH").unwrap();
        assert_eq!(parsed, PlaylistRef::Id("37i9dQZF1E8NC99vGqLsaH".into()));
    }

    #[test]
    fn test_parse_name() {
        let parsed = PlaylistRef::parse("  Sunday Morning ").unwrap();
        assert_eq!(parsed, PlaylistRef::Name("Sunday Morning".into()));
    }

    #[test]
    fn test_parse_non_playlist_url() {
        assert!(PlaylistRef::parse("https://open.spotify.com/album/123").is_err());
    }

    #[test]
    fn test_select_case_insensitive() {
        let playlists = vec![playlist("Focus"), playlist("Sunday Morning")];
        let found = select_by_name(&playlists, "sunday morning").unwrap();
        assert_eq!(found.id, "id-Sunday Morning");
    }

    #[test]
    fn test_select_suggests_close_name() {
        let playlists = vec![playlist("Focus"), playlist("Sunday Morning")];
        let err = select_by_name(&playlists, "Sunday Mornin").unwrap_err();
        assert!(err.to_string().contains("did you mean 'Sunday Morning'"));
    }

    #[test]
    fn test_select_no_similar_name() {
        let playlists = vec![playlist("Focus")];
        let err = select_by_name(&playlists, "Heavy Metal Workout").unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
        assert!(!err.to_string().contains("did you mean"));
    }
}
