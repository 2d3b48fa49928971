//! Configuration structures and constants for the beatsync-core library.
//!
//! This module provides the configuration system for the pipeline: analysis
//! parameters, the common render format for segments, and the settings of
//! the final encode and its degraded fallback.

mod builder;
pub mod utils;

use crate::error::{CoreError, CoreResult};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub use builder::SyncConfigBuilder;

// Default constants

/// Default hook sensitivity. A beat becomes a hook when its normalized onset
/// strength exceeds this fraction of the mean normalized strength.
pub const DEFAULT_HOOK_SENSITIVITY: f32 = 0.5;

/// Sample rate the music is resampled to before analysis.
pub const DEFAULT_SAMPLE_RATE: u32 = 22_050;

/// STFT window size in samples.
pub const DEFAULT_N_FFT: usize = 2048;

/// STFT hop size in samples. One onset envelope frame per hop.
pub const DEFAULT_HOP_LENGTH: usize = 512;

/// Common frame size every rendered segment is scaled and padded to.
pub const DEFAULT_TARGET_WIDTH: u32 = 1280;
pub const DEFAULT_TARGET_HEIGHT: u32 = 720;

/// Frame rate of rendered segments and of the primary final encode.
pub const DEFAULT_FPS: u32 = 60;

/// Frame rate and thread count of the degraded final encode.
pub const DEFAULT_FALLBACK_FPS: u32 = 24;
pub const DEFAULT_FALLBACK_THREADS: u32 = 1;

/// Assembled video vs. music duration difference (seconds) above which the
/// final encode is limited to the music duration.
pub const DEFAULT_DRIFT_TOLERANCE: f64 = 0.1;

pub const DEFAULT_VIDEO_CODEC: &str = "libx264";
pub const DEFAULT_AUDIO_CODEC: &str = "aac";
pub const DEFAULT_AUDIO_BITRATE: &str = "192k";

/// x264 preset used for both intermediates and the final encode.
pub const DEFAULT_PRESET: &str = "medium";

/// CRF of the final encode.
pub const DEFAULT_CRF: u8 = 23;

/// CRF of rendered intermediates. Lower than the final CRF so the second
/// generation loss stays small.
pub const DEFAULT_INTERMEDIATE_CRF: u8 = 18;

/// Main configuration structure for the beatsync-core library.
///
/// All fields have defaults, so a config can be deserialized from a partial
/// JSON document or built with [`SyncConfigBuilder`].
///
/// # Examples
///
/// ```rust
/// use beatsync_core::config::SyncConfigBuilder;
///
/// let config = SyncConfigBuilder::new()
///     .hook_sensitivity(0.7)
///     .fps(30)
///     .preset("fast")
///     .build();
/// assert_eq!(config.fps, 30);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    // Analysis
    pub sample_rate: u32,
    pub n_fft: usize,
    pub hop_length: usize,
    /// Used when a request does not carry its own sensitivity. Range (0, 1].
    pub hook_sensitivity: f32,

    // Rendering
    pub target_width: u32,
    pub target_height: u32,
    pub fps: u32,
    pub video_codec: String,
    pub preset: String,
    pub intermediate_crf: u8,

    // Final encode
    pub crf: u8,
    pub audio_codec: String,
    pub audio_bitrate: String,
    pub fallback_fps: u32,
    pub fallback_threads: u32,
    pub drift_tolerance: f64,

    /// Optional directory for scratch files (defaults to the output file's directory)
    pub temp_dir: Option<PathBuf>,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            sample_rate: DEFAULT_SAMPLE_RATE,
            n_fft: DEFAULT_N_FFT,
            hop_length: DEFAULT_HOP_LENGTH,
            hook_sensitivity: DEFAULT_HOOK_SENSITIVITY,
            target_width: DEFAULT_TARGET_WIDTH,
            target_height: DEFAULT_TARGET_HEIGHT,
            fps: DEFAULT_FPS,
            video_codec: DEFAULT_VIDEO_CODEC.to_string(),
            preset: DEFAULT_PRESET.to_string(),
            intermediate_crf: DEFAULT_INTERMEDIATE_CRF,
            crf: DEFAULT_CRF,
            audio_codec: DEFAULT_AUDIO_CODEC.to_string(),
            audio_bitrate: DEFAULT_AUDIO_BITRATE.to_string(),
            fallback_fps: DEFAULT_FALLBACK_FPS,
            fallback_threads: DEFAULT_FALLBACK_THREADS,
            drift_tolerance: DEFAULT_DRIFT_TOLERANCE,
            temp_dir: None,
        }
    }
}

impl SyncConfig {
    /// Defaults overridden by `BEATSYNC_*` environment variables.
    #[must_use]
    pub fn from_env() -> Self {
        let mut config = Self::default();
        config.apply_env_overrides();
        config
    }

    /// Applies `BEATSYNC_*` environment variables on top of the current values.
    pub fn apply_env_overrides(&mut self) {
        self.hook_sensitivity = utils::get_env_f32("BEATSYNC_HOOK_SENSITIVITY", self.hook_sensitivity);
        self.fps = utils::get_env_u32("BEATSYNC_FPS", self.fps);
        self.crf = utils::get_env_u8("BEATSYNC_CRF", self.crf);
        self.preset = utils::get_env_string("BEATSYNC_PRESET", self.preset.clone());
        if let Some(dir) = utils::get_env_optional_path("BEATSYNC_TEMP_DIR") {
            self.temp_dir = Some(dir);
        }
    }

    /// Loads a config from a JSON file. Missing fields take their defaults.
    pub fn from_json_file(path: &Path) -> CoreResult<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: SyncConfig = serde_json::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Checks value ranges. Called by the generator before any work starts.
    pub fn validate(&self) -> CoreResult<()> {
        validate_hook_sensitivity(self.hook_sensitivity)?;
        if self.sample_rate == 0 {
            return Err(CoreError::Config("sample_rate must be positive".into()));
        }
        if self.hop_length == 0 || self.n_fft < 2 || self.hop_length > self.n_fft {
            return Err(CoreError::Config(format!(
                "invalid STFT parameters: n_fft={}, hop_length={}",
                self.n_fft, self.hop_length
            )));
        }
        if self.target_width == 0 || self.target_height == 0 {
            return Err(CoreError::Config("target resolution must be non-zero".into()));
        }
        // libx264 with yuv420p needs even dimensions
        if self.target_width % 2 != 0 || self.target_height % 2 != 0 {
            return Err(CoreError::Config(format!(
                "target resolution must be even, got {}x{}",
                self.target_width, self.target_height
            )));
        }
        if self.fps == 0 || self.fallback_fps == 0 {
            return Err(CoreError::Config("frame rates must be positive".into()));
        }
        if self.crf > 51 || self.intermediate_crf > 51 {
            return Err(CoreError::Config("crf must be in 0..=51".into()));
        }
        if self.drift_tolerance.is_nan() || self.drift_tolerance < 0.0 {
            return Err(CoreError::Config("drift_tolerance must be non-negative".into()));
        }
        Ok(())
    }
}

/// Rejects sensitivities outside (0, 1].
pub fn validate_hook_sensitivity(value: f32) -> CoreResult<()> {
    if value > 0.0 && value <= 1.0 {
        Ok(())
    } else {
        Err(CoreError::Config(format!(
            "hook_sensitivity must be in (0, 1], got {value}"
        )))
    }
}
