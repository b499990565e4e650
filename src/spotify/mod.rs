pub mod client;
pub mod models;

pub use client::SpotifyClient;
pub use models::{AudioFeatures, CatalogTrack, SpotifyPlaylist};
