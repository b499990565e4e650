pub mod builder;
pub mod report;

pub use builder::{SessionBuilder, SessionOptions};
pub use report::{SelectedTrack, SessionReport};
