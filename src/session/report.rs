use chrono::{DateTime, Local};
use colored::Colorize;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::error::Result;
use crate::mood::{AssembledPlaylist, MoodBreakdown, MoodCategory, format_duration_ms};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionReport {
    pub source_playlist: String,
    pub mood: MoodCategory,
    pub target_duration_ms: u64,
    pub total_tracks: usize,
    pub skipped_tracks: usize,
    pub breakdown: MoodBreakdown,
    pub selected_tracks: Vec<SelectedTrack>,
    pub total_duration_ms: u64,
    pub fill_percentage: f64,
    pub playlist_name: String,
    pub playlist_id: Option<String>,
    /// Tracks actually written to the playlist.
    pub submitted_tracks: usize,
    pub created_at: DateTime<Local>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SelectedTrack {
    pub id: String,
    pub name: String,
    pub artist: String,
    pub duration_ms: u64,
    pub energy: f64,
}

impl SessionReport {
    pub fn new(
        source_playlist: String,
        playlist_name: String,
        assembled: &AssembledPlaylist,
        breakdown: MoodBreakdown,
        total_tracks: usize,
        skipped_tracks: usize,
    ) -> Self {
        let selected_tracks = assembled
            .tracks
            .iter()
            .map(|t| SelectedTrack {
                id: t.id.clone(),
                name: t.name.clone(),
                artist: t.artist_line(),
                duration_ms: t.duration_ms,
                energy: t.energy,
            })
            .collect();

        Self {
            source_playlist,
            mood: assembled.mood,
            target_duration_ms: assembled.target_duration_ms,
            total_tracks,
            skipped_tracks,
            breakdown,
            selected_tracks,
            total_duration_ms: assembled.total_duration_ms(),
            fill_percentage: assembled.fill_ratio() * 100.0,
            playlist_name,
            playlist_id: None,
            submitted_tracks: 0,
            created_at: Local::now(),
        }
    }

    /// Write the report as pretty JSON into `dir` and return the file path.
    pub fn save(&self, dir: &Path) -> Result<PathBuf> {
        fs::create_dir_all(dir)?;

        let timestamp = self.created_at.format("%Y%m%d_%H%M%S");
        let filename = dir.join(format!("session_{}.json", timestamp));
        let json = serde_json::to_string_pretty(self)?;

        fs::write(&filename, json)?;

        info!("Session report saved to: {}", filename.display());

        Ok(filename)
    }

    pub fn print_summary(&self) {
        println!();
        println!("{}", "=".repeat(60));
        println!("{}", format!("{} SESSION", self.mood.to_string().to_uppercase()).bold());
        println!("{}", "=".repeat(60));
        println!("Source playlist: {}", self.source_playlist);
        println!(
            "Tracks analysed: {} ({} skipped without audio features)",
            self.total_tracks.saturating_sub(self.skipped_tracks),
            self.skipped_tracks
        );
        println!(
            "Mood breakdown: {} calm / {} building",
            self.breakdown.calm.to_string().cyan(),
            self.breakdown.building.to_string().magenta()
        );
        println!("{}", "=".repeat(60));

        if self.selected_tracks.is_empty() {
            println!("{}", "No tracks fit this session".yellow());
            return;
        }

        for (i, track) in self.selected_tracks.iter().enumerate() {
            println!(
                "{:2}. {} - {} [{}] energy {:.2}",
                i + 1,
                track.name.green(),
                track.artist,
                format_duration_ms(track.duration_ms),
                track.energy
            );
        }

        let fill = format!("{:.1}%", self.fill_percentage);
        let fill = if self.fill_percentage >= 95.0 {
            fill.green()
        } else if self.fill_percentage >= 80.0 {
            fill.yellow()
        } else {
            fill.red()
        };

        println!();
        println!(
            "Total: {} of {} ({})",
            format_duration_ms(self.total_duration_ms),
            format_duration_ms(self.target_duration_ms),
            fill
        );

        match &self.playlist_id {
            Some(id) if self.submitted_tracks < self.selected_tracks.len() => println!(
                "{}",
                format!(
                    "Playlist '{}' ({}) is incomplete: {} of {} tracks added",
                    self.playlist_name,
                    id,
                    self.submitted_tracks,
                    self.selected_tracks.len()
                )
                .red()
            ),
            Some(id) => println!("Created playlist '{}' ({})", self.playlist_name.green(), id),
            None => println!("{}", "No playlist was created".yellow()),
        }
    }
}
