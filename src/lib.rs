pub mod catalog;
pub mod config;
pub mod error;
pub mod mood;
pub mod selector;
pub mod session;
pub mod spotify;

pub use catalog::{DryRunSink, JsonFileSource, PlaylistSink, TrackSource};
pub use config::Config;
pub use error::{AppError, Result};
pub use mood::{AssembledPlaylist, MoodCategory, SessionRequest, TrackAudioProfile, assemble, classify};
pub use session::{SessionBuilder, SessionOptions, SessionReport};
pub use spotify::{AudioFeatures, CatalogTrack, SpotifyClient, SpotifyPlaylist};
