use rspotify::ClientError;
use rspotify::http::HttpError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Authentication failed: {0}")]
    Auth(String),

    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    #[error("Rate limited: {0}")]
    RateLimited(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Spotify API error: {0}")]
    SpotifyApi(String),

    #[error("Incomplete audio features for track {0}")]
    IncompleteFeatures(String),

    #[error("Playlist {playlist_id} left incomplete after {added} tracks: {source}")]
    PartialSubmit {
        playlist_id: String,
        added: usize,
        source: Box<AppError>,
    },

    #[error("Playlist not found: {0}")]
    NotFound(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl AppError {
    /// Whether retrying the same request may succeed.
    pub fn is_transient(&self) -> bool {
        matches!(self, AppError::RateLimited(_) | AppError::Network(_))
    }

    fn from_status(status: u16, message: String) -> Self {
        match status {
            401 => AppError::Auth(message),
            403 => AppError::PermissionDenied(message),
            429 => AppError::RateLimited(message),
            500..=599 => AppError::Network(message),
            _ => AppError::SpotifyApi(message),
        }
    }
}

impl From<ClientError> for AppError {
    fn from(err: ClientError) -> Self {
        let message = err.to_string();
        match err {
            ClientError::Http(http) => match *http {
                HttpError::StatusCode(response) => {
                    AppError::from_status(response.status().as_u16(), message)
                }
                _ => AppError::Network(message),
            },
            ClientError::Io(io) => AppError::Io(io),
            ClientError::ParseJson(json) => AppError::Json(json),
            _ => AppError::SpotifyApi(message),
        }
    }
}

pub type Result<T> = std::result::Result<T, AppError>;
