pub mod assembler;
pub mod classifier;
pub mod profile;

pub use assembler::{AssembledPlaylist, DEFAULT_TARGET_DURATION_MS, SessionRequest, assemble};
pub use classifier::{MoodBreakdown, MoodCategory, classify};
pub use profile::{TrackAudioProfile, format_duration_ms};
