use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use colored::Colorize;
use std::path::{Path, PathBuf};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use mood_session::catalog::load_profiles;
use mood_session::mood::{MoodBreakdown, format_duration_ms};
use mood_session::{
    Config, DryRunSink, JsonFileSource, MoodCategory, PlaylistSink, SessionBuilder,
    SessionOptions, SpotifyClient, TrackSource, classify,
};

const RESULTS_DIR: &str = "session_results";

#[derive(Parser)]
#[command(name = "mood-session")]
#[command(about = "Build fixed-length Calm or Building sessions from your Spotify playlists")]
#[command(version)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List your Spotify playlists
    ListPlaylists,

    /// Show the mood of every track in a playlist
    Classify {
        /// Playlist name, URL or spotify:playlist: URI
        #[arg(required_unless_present = "from_file")]
        playlist: Option<String>,

        /// Read tracks and audio features from a JSON export instead of Spotify
        #[arg(long)]
        from_file: Option<PathBuf>,
    },

    /// Build a new session playlist from a source playlist
    Build {
        /// Playlist name, URL or spotify:playlist: URI
        #[arg(required_unless_present = "from_file")]
        playlist: Option<String>,

        /// Mood of the session: calm or building
        #[arg(long)]
        mood: MoodCategory,

        /// Target session length in minutes
        #[arg(
            long,
            env = "SESSION_MINUTES",
            default_value_t = 38,
            value_parser = clap::value_parser!(u64).range(1..)
        )]
        minutes: u64,

        /// Name of the playlist to create
        #[arg(long)]
        name: Option<String>,

        /// Preview the session without creating a playlist
        #[arg(long)]
        dry_run: bool,

        /// Read tracks and audio features from a JSON export instead of Spotify
        #[arg(long)]
        from_file: Option<PathBuf>,
    },

    /// Show setup guide
    Setup,
}

fn setup_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(filter)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    setup_tracing(cli.verbose);

    match cli.command {
        Commands::ListPlaylists => {
            list_playlists().await?;
        }
        Commands::Classify {
            playlist,
            from_file,
        } => {
            classify_playlist(playlist, from_file.as_deref()).await?;
        }
        Commands::Build {
            playlist,
            mood,
            minutes,
            name,
            dry_run,
            from_file,
        } => {
            let options = SessionOptions {
                name,
                ..SessionOptions::from_minutes(mood, minutes).context("Invalid --minutes")?
            };
            build_session(playlist, from_file.as_deref(), &options, dry_run).await?;
        }
        Commands::Setup => {
            show_setup_guide();
        }
    }

    Ok(())
}

async fn connect_spotify() -> Result<SpotifyClient> {
    let config = Config::from_env().context("Failed to load configuration")?;

    let missing = config.get_missing_config();
    if !missing.is_empty() {
        println!("{}", "Missing configuration:".red());
        for item in &missing {
            println!("   - {}", item);
        }
        println!(
            "\n{}",
            "Run `mood-session setup` for instructions.".yellow()
        );
        std::process::exit(1);
    }

    SpotifyClient::new(&config)
        .await
        .context("Failed to connect to Spotify")
}

/// Label used for a source in logs and reports.
fn source_label(playlist: Option<&str>, from_file: Option<&Path>) -> String {
    match (playlist, from_file) {
        (Some(name), _) => name.to_string(),
        (None, Some(path)) => path.display().to_string(),
        (None, None) => String::new(),
    }
}

async fn list_playlists() -> Result<()> {
    println!("{}", "Your Spotify Playlists".cyan().bold());
    println!("{}", "=".repeat(50));

    let spotify_client = connect_spotify().await?;

    let playlists = spotify_client
        .get_user_playlists()
        .await
        .context("Failed to fetch playlists")?;

    if playlists.is_empty() {
        println!("{}", "No playlists found".yellow());
        return Ok(());
    }

    for (i, playlist) in playlists.iter().enumerate() {
        let visibility = if playlist.public {
            "public".green()
        } else {
            "private".yellow()
        };
        println!(
            "{:2}. {} ({} tracks, {}, {})",
            i + 1,
            playlist.name.green(),
            playlist.total_tracks,
            playlist.owner,
            visibility
        );
        if !playlist.description.is_empty() {
            println!("    {}", playlist.description.dimmed());
        }
    }

    println!("\n{}", format!("Total: {} playlists", playlists.len()).cyan());

    Ok(())
}

async fn classify_playlist(playlist: Option<String>, from_file: Option<&Path>) -> Result<()> {
    let label = source_label(playlist.as_deref(), from_file);

    println!("{}", format!("Mood classification: {}", label).cyan().bold());
    println!("{}", "=".repeat(50));

    let loaded = match from_file {
        Some(path) => {
            let source = JsonFileSource::open(path).context("Failed to read track file")?;
            load_profiles(&source, &label).await
        }
        None => {
            let source = connect_spotify().await?;
            load_profiles(&source, &label).await
        }
    }
    .context("Failed to load tracks")?;

    for (i, track) in loaded.profiles.iter().enumerate() {
        let mood = match classify(track) {
            MoodCategory::Calm => "Calm".cyan(),
            MoodCategory::Building => "Building".magenta(),
        };
        println!(
            "{:3}. {:<8} {} - {} [{}] tempo {:.0}, energy {:.2}",
            i + 1,
            mood,
            track.name,
            track.artist_line(),
            format_duration_ms(track.duration_ms),
            track.tempo,
            track.energy
        );
    }

    let breakdown = MoodBreakdown::tally(&loaded.profiles);
    println!();
    println!(
        "{} calm, {} building, {} without audio features",
        breakdown.calm.to_string().cyan(),
        breakdown.building.to_string().magenta(),
        loaded.skipped.to_string().yellow()
    );

    Ok(())
}

async fn build_session(
    playlist: Option<String>,
    from_file: Option<&Path>,
    options: &SessionOptions,
    dry_run: bool,
) -> Result<()> {
    println!("{}", "Mood Session Builder".cyan().bold());
    println!("{}", "=".repeat(50));

    if dry_run {
        println!("{}", "DRY RUN MODE - No playlist will be created".yellow());
    }

    let label = source_label(playlist.as_deref(), from_file);

    let file_source = from_file
        .map(JsonFileSource::open)
        .transpose()
        .context("Failed to read track file")?;

    let spotify = if file_source.is_none() || !dry_run {
        Some(connect_spotify().await?)
    } else {
        None
    };

    let source: &dyn TrackSource = match (&file_source, &spotify) {
        (Some(file), _) => file,
        (None, Some(client)) => client,
        (None, None) => bail!("No track source available"),
    };

    let sink: &dyn PlaylistSink = match (&spotify, dry_run) {
        (Some(client), false) => client,
        _ => &DryRunSink,
    };

    let report = SessionBuilder::new(source, sink)
        .build(&label, options)
        .await
        .context("Failed to build session")?;

    report.print_summary();
    report
        .save(Path::new(RESULTS_DIR))
        .context("Failed to save session report")?;

    if dry_run {
        println!("\n{}", "Dry run completed - no changes made".yellow());
    }

    Ok(())
}

fn show_setup_guide() {
    println!("{}", "Mood Session Setup Guide".cyan().bold());
    println!("{}", "=".repeat(50));

    println!("\n{}", "1. Spotify API Setup".yellow());
    println!("   - Go to https://developer.spotify.com/dashboard/");
    println!("   - Create a new app");
    println!("   - Copy your Client ID and Client Secret");
    println!("   - Add 'http://127.0.0.1:8080/callback' as a redirect URI");

    println!("\n{}", "2. Configuration".yellow());
    println!("   - Create a .env file with:");
    println!("     SPOTIFY_CLIENT_ID=your_spotify_client_id");
    println!("     SPOTIFY_CLIENT_SECRET=your_spotify_client_secret");
    println!("     SPOTIFY_REDIRECT_URI=http://127.0.0.1:8080/callback");
    println!("     SPOTIFY_TOKEN_CACHE=.spotify_token_cache.json   (optional)");
    println!("     SESSION_MINUTES=38                             (optional)");

    println!("\n{}", "3. Usage".yellow());
    println!("   - mood-session list-playlists");
    println!("   - mood-session classify \"Playlist Name\"");
    println!("   - mood-session build \"Playlist Name\" --mood calm --dry-run");
    println!("   - mood-session build \"Playlist Name\" --mood building --minutes 45");
    println!("   - mood-session build --from-file tracks.json --mood calm --dry-run");

    println!("\n{}", "Ready to build your first session!".green());
}
