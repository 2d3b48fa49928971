//! Core library for assembling video clips cut to the beats of a music track.
//!
//! This crate analyzes a music file for its tempo, beats and hooks, splits the
//! track into segments at the strongest hooks, fills each segment from one of
//! the supplied clips and encodes the result with the music as its soundtrack.
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use beatsync_core::{BeatSyncGenerator, GenerationRequest, NullProgressCallback, SyncConfig};
//! use beatsync_core::external::{CrateFfprobeExecutor, SidecarSpawner};
//! use std::path::PathBuf;
//!
//! let generator = BeatSyncGenerator::new(
//!     SidecarSpawner,
//!     CrateFfprobeExecutor::new(),
//!     SyncConfig::from_env(),
//! );
//! let request = GenerationRequest::new(
//!     "song.mp3",
//!     vec![PathBuf::from("a.mp4"), PathBuf::from("b.mp4")],
//!     "out.mp4",
//! )
//! .with_hook_sensitivity(0.6);
//!
//! let report = generator.generate(&request, &NullProgressCallback).unwrap();
//! println!("{} segments", report.segments_rendered);
//! ```

pub mod analysis;
pub mod config;
pub mod error;
pub mod external;
pub mod processing;
pub mod progress;
pub mod temp_files;
pub mod utils;

// Re-exports for public API
pub use analysis::{Hook, MusicAnalysis, analyze, analyze_track};
pub use config::{SyncConfig, SyncConfigBuilder, validate_hook_sensitivity};
pub use error::{CoreError, CoreResult};
pub use processing::{
    BeatSyncGenerator, GenerationReport, GenerationRequest, PipelineError, Strategy, TransitionTimeline,
    VideoClip,
};
pub use progress::{NullProgressCallback, ProgressCallback, Stage};
pub use temp_files::{create_temp_dir, create_temp_file, create_temp_file_path};
pub use utils::{format_bytes, format_duration, parse_ffmpeg_time};
