// ============================================================================
// beatsync-core/src/config/builder.rs
// ============================================================================
//
// CONFIGURATION BUILDER: Builder Pattern for SyncConfig
//
// Fluent construction of SyncConfig instances. Every setter starts from the
// library defaults, so a builder with no calls is equivalent to
// SyncConfig::default().

use std::path::PathBuf;

use super::SyncConfig;

/// Builder for creating [`SyncConfig`] instances.
#[derive(Debug, Clone, Default)]
pub struct SyncConfigBuilder {
    config: SyncConfig,
}

impl SyncConfigBuilder {
    /// Creates a builder seeded with the library defaults.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a builder seeded with an existing config.
    #[must_use]
    pub fn from_config(config: SyncConfig) -> Self {
        Self { config }
    }

    #[must_use]
    pub fn hook_sensitivity(mut self, value: f32) -> Self {
        self.config.hook_sensitivity = value;
        self
    }

    #[must_use]
    pub fn sample_rate(mut self, value: u32) -> Self {
        self.config.sample_rate = value;
        self
    }

    #[must_use]
    pub fn stft(mut self, n_fft: usize, hop_length: usize) -> Self {
        self.config.n_fft = n_fft;
        self.config.hop_length = hop_length;
        self
    }

    #[must_use]
    pub fn resolution(mut self, width: u32, height: u32) -> Self {
        self.config.target_width = width;
        self.config.target_height = height;
        self
    }

    #[must_use]
    pub fn fps(mut self, value: u32) -> Self {
        self.config.fps = value;
        self
    }

    #[must_use]
    pub fn fallback_encode(mut self, fps: u32, threads: u32) -> Self {
        self.config.fallback_fps = fps;
        self.config.fallback_threads = threads;
        self
    }

    #[must_use]
    pub fn preset(mut self, value: &str) -> Self {
        self.config.preset = value.to_string();
        self
    }

    #[must_use]
    pub fn crf(mut self, value: u8) -> Self {
        self.config.crf = value;
        self
    }

    #[must_use]
    pub fn drift_tolerance(mut self, seconds: f64) -> Self {
        self.config.drift_tolerance = seconds;
        self
    }

    #[must_use]
    pub fn audio(mut self, codec: &str, bitrate: &str) -> Self {
        self.config.audio_codec = codec.to_string();
        self.config.audio_bitrate = bitrate.to_string();
        self
    }

    #[must_use]
    pub fn temp_dir(mut self, dir: PathBuf) -> Self {
        self.config.temp_dir = Some(dir);
        self
    }

    /// Builds the config. Ranges are checked later by [`SyncConfig::validate`].
    #[must_use]
    pub fn build(self) -> SyncConfig {
        self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_builder_matches_defaults() {
        assert_eq!(SyncConfigBuilder::new().build(), SyncConfig::default());
    }

    #[test]
    fn setters_apply() {
        let config = SyncConfigBuilder::new()
            .resolution(640, 360)
            .fallback_encode(15, 2)
            .temp_dir(PathBuf::from("/scratch"))
            .build();
        assert_eq!((config.target_width, config.target_height), (640, 360));
        assert_eq!((config.fallback_fps, config.fallback_threads), (15, 2));
        assert_eq!(config.temp_dir, Some(PathBuf::from("/scratch")));
    }
}
