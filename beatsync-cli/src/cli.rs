// beatsync-cli/src/cli.rs
//
// Defines the command-line argument structures using clap.

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

// --- CLI Argument Definition ---

#[derive(Parser, Debug)]
#[command(
    author,
    version, // Reads from Cargo.toml via "cargo" feature in clap
    about = "BeatSync: cut video clips to the beat of a song",
    long_about = "Analyzes a music track for beats and hooks, cuts the given clips on the \
                  strongest hooks and encodes them with the music via beatsync-core."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable debug logging (RUST_LOG takes precedence)
    #[arg(short, long, global = true, default_value_t = false)]
    pub verbose: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Assembles a beat-synchronized video from a music track and clips
    Generate(GenerateArgs),
    /// Prints tempo, beats and hooks of a music track
    Analyze(AnalyzeArgs),
}

#[derive(Args, Debug)]
pub struct GenerateArgs {
    /// Music file that drives the cuts and becomes the soundtrack
    #[arg(short, long, value_name = "MUSIC_FILE")]
    pub music: PathBuf,

    /// Video clip, in the order clips are used; repeat for more clips
    #[arg(long = "video", required = true, value_name = "VIDEO_FILE")]
    pub videos: Vec<PathBuf>,

    /// Output video file
    #[arg(short, long, value_name = "OUTPUT_FILE")]
    pub output: PathBuf,

    /// Beats stronger than this fraction of the mean onset strength become hooks (0-1]
    #[arg(long, value_name = "S", value_parser = parse_sensitivity, env = "BEATSYNC_HOOK_SENSITIVITY")]
    pub hook_sensitivity: Option<f32>,

    /// JSON config file; missing fields keep their defaults
    #[arg(long, value_name = "CONFIG_FILE")]
    pub config: Option<PathBuf>,

    /// Directory for intermediate segments (defaults to the output directory)
    #[arg(long, value_name = "DIR")]
    pub temp_dir: Option<PathBuf>,

    /// Output frame rate
    #[arg(long, value_name = "FPS", value_parser = clap::value_parser!(u32).range(1..=240))]
    pub fps: Option<u32>,
}

#[derive(Args, Debug)]
pub struct AnalyzeArgs {
    /// Music file to analyze
    #[arg(short, long, value_name = "MUSIC_FILE")]
    pub music: PathBuf,

    /// Hook threshold relative to the mean onset strength (0-1]
    #[arg(long, value_name = "S", value_parser = parse_sensitivity, env = "BEATSYNC_HOOK_SENSITIVITY")]
    pub hook_sensitivity: Option<f32>,

    /// Print the full analysis as JSON
    #[arg(long, default_value_t = false)]
    pub json: bool,
}

fn parse_sensitivity(value: &str) -> Result<f32, String> {
    let parsed: f32 = value.parse().map_err(|_| format!("'{value}' is not a number"))?;
    beatsync_core::validate_hook_sensitivity(parsed).map_err(|e| e.to_string())?;
    Ok(parsed)
}
