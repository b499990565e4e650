use serde::Serialize;
use std::collections::HashSet;
use tracing::debug;

use crate::mood::classifier::{MoodCategory, classify};
use crate::mood::profile::TrackAudioProfile;

/// 38 minutes.
pub const DEFAULT_TARGET_DURATION_MS: u64 = 2_280_000;

/// Pick tracks of `mood` whose total duration stays within `target_duration_ms`.
///
/// Candidates are the tracks classified as `mood` (first occurrence of each id,
/// zero-length tracks ignored), sorted by energy: ascending for Calm,
/// descending for Building. The sort is stable, so equal energies keep their
/// input order.
///
/// Tracks are taken in that order while they fit. At the first one that would
/// overflow, the walk stops and the whole candidate list is scanned once for
/// the first unselected track that fits the remaining budget; if found it is
/// appended last. Nothing else is considered after that, so the result may
/// under-fill the target.
pub fn assemble(
    tracks: &[TrackAudioProfile],
    mood: MoodCategory,
    target_duration_ms: u64,
) -> Vec<TrackAudioProfile> {
    let mut seen = HashSet::new();
    let mut candidates: Vec<&TrackAudioProfile> = tracks
        .iter()
        .filter(|track| track.duration_ms > 0 && classify(track) == mood)
        .filter(|track| seen.insert(track.id.as_str()))
        .collect();

    match mood {
        MoodCategory::Calm => candidates.sort_by(|a, b| a.energy.total_cmp(&b.energy)),
        MoodCategory::Building => candidates.sort_by(|a, b| b.energy.total_cmp(&a.energy)),
    }

    let mut selected: Vec<&TrackAudioProfile> = Vec::new();
    let mut running_ms: u64 = 0;

    for track in &candidates {
        if running_ms.saturating_add(track.duration_ms) <= target_duration_ms {
            selected.push(*track);
            running_ms += track.duration_ms;
            continue;
        }

        let remaining_ms = target_duration_ms - running_ms;
        let patch = candidates.iter().find(|candidate| {
            candidate.duration_ms <= remaining_ms
                && !selected.iter().any(|chosen| chosen.id == candidate.id)
        });

        match patch {
            Some(patch) => {
                debug!(
                    "Patched remaining {}ms with {} ({}ms)",
                    remaining_ms, patch.id, patch.duration_ms
                );
                running_ms += patch.duration_ms;
                selected.push(*patch);
            }
            None => debug!("No track fits the remaining {}ms", remaining_ms),
        }
        break;
    }

    debug!(
        "Assembled {} of {} {} candidates ({}ms of {}ms)",
        selected.len(),
        candidates.len(),
        mood,
        running_ms,
        target_duration_ms
    );

    selected.into_iter().cloned().collect()
}

/// Input to one assembly run.
#[derive(Debug, Clone)]
pub struct SessionRequest {
    pub mood: MoodCategory,
    pub target_duration_ms: u64,
    pub tracks: Vec<TrackAudioProfile>,
}

impl SessionRequest {
    pub fn new(mood: MoodCategory, tracks: Vec<TrackAudioProfile>) -> Self {
        Self {
            mood,
            target_duration_ms: DEFAULT_TARGET_DURATION_MS,
            tracks,
        }
    }

    pub fn with_target_duration(mut self, target_duration_ms: u64) -> Self {
        self.target_duration_ms = target_duration_ms;
        self
    }

    pub fn assemble(&self) -> AssembledPlaylist {
        AssembledPlaylist {
            mood: self.mood,
            target_duration_ms: self.target_duration_ms,
            tracks: assemble(&self.tracks, self.mood, self.target_duration_ms),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct AssembledPlaylist {
    pub mood: MoodCategory,
    pub target_duration_ms: u64,
    pub tracks: Vec<TrackAudioProfile>,
}

impl AssembledPlaylist {
    pub fn total_duration_ms(&self) -> u64 {
        self.tracks.iter().map(|t| t.duration_ms).sum()
    }

    pub fn remaining_ms(&self) -> u64 {
        self.target_duration_ms
            .saturating_sub(self.total_duration_ms())
    }

    /// Share of the target that is filled, 0.0..=1.0.
    pub fn fill_ratio(&self) -> f64 {
        if self.target_duration_ms == 0 {
            return 0.0;
        }
        self.total_duration_ms() as f64 / self.target_duration_ms as f64
    }

    pub fn track_ids(&self) -> Vec<String> {
        self.tracks.iter().map(|t| t.id.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }
}
