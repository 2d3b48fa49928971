// ============================================================================
// beatsync-core/src/analysis/mod.rs
// ============================================================================
//
// MUSIC ANALYSIS: Tempo, Beats and Hooks
//
// Decodes the music track and derives the timepoints the video is cut on.
//
// KEY COMPONENTS:
// - onset: STFT spectral-flux onset envelope and normalization
// - tempo: Global tempo estimate from the envelope's autocorrelation
// - beats: Dynamic-programming beat tracker
// - hooks: Beats with above-threshold onset strength, strongest first

pub mod beats;
pub mod hooks;
pub mod onset;
pub mod tempo;

pub use hooks::Hook;

use crate::config::SyncConfig;
use crate::error::CoreResult;
use crate::external::{AudioTrack, FfmpegSpawner, decode_audio};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Result of analyzing one music track.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MusicAnalysis {
    /// Duration in seconds, from the decoded sample count.
    pub duration: f64,
    pub sample_rate: u32,
    pub tempo_bpm: f64,
    /// Beat timestamps in seconds, ascending.
    pub beat_times: Vec<f64>,
    pub beat_frames: Vec<usize>,
    /// Hooks ordered by strength, strongest first.
    pub hooks: Vec<Hook>,
    /// Number of onset envelope frames.
    pub envelope_frames: usize,
}

impl MusicAnalysis {
    /// Hook timestamps in strength order.
    #[must_use]
    pub fn hook_times(&self) -> Vec<f64> {
        self.hooks.iter().map(|h| h.time).collect()
    }
}

/// Decodes `music_path` and analyzes it.
pub fn analyze<S: FfmpegSpawner>(
    spawner: &S,
    music_path: &Path,
    hook_sensitivity: f32,
    config: &SyncConfig,
) -> CoreResult<MusicAnalysis> {
    let track = decode_audio(spawner, music_path, config.sample_rate)?;
    analyze_track(&track, hook_sensitivity, config)
}

/// Analyzes already-decoded audio.
pub fn analyze_track(
    track: &AudioTrack,
    hook_sensitivity: f32,
    config: &SyncConfig,
) -> CoreResult<MusicAnalysis> {
    let duration = track.duration();
    let envelope = onset::onset_strength(&track.samples, config.n_fft, config.hop_length)?;
    let frame_rate = f64::from(track.sample_rate) / config.hop_length as f64;

    let tempo_bpm = tempo::estimate_tempo(&envelope, frame_rate);
    let beat_frames = beats::track_beats(&envelope, frame_rate, tempo_bpm);
    let beat_times = beats::frames_to_times(&beat_frames, config.hop_length, track.sample_rate);

    let normalized = onset::normalize(&envelope);
    let hooks = hooks::extract_hooks(&beat_frames, &beat_times, &normalized, hook_sensitivity);

    log::info!(
        "Music analysis: duration {:.2}s, tempo {:.1} BPM, {} beats, {} hooks",
        duration,
        tempo_bpm,
        beat_times.len(),
        hooks.len()
    );
    if let Some(strongest) = hooks.first() {
        log::debug!("Strongest hook at {:.3}s ({:.3})", strongest.time, strongest.strength);
    }

    Ok(MusicAnalysis {
        duration,
        sample_rate: track.sample_rate,
        tempo_bpm,
        beat_times,
        beat_frames,
        hooks,
        envelope_frames: envelope.len(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Short noise bursts every `period_frames` hops, aligned to frame centers.
    pub(crate) fn click_track(seconds: f64, sample_rate: u32, hop: usize, period_frames: usize) -> AudioTrack {
        let len = (seconds * f64::from(sample_rate)) as usize;
        let mut samples = vec![0.0f32; len];
        let step = period_frames * hop;
        let mut start = step;
        while start + 200 < len {
            for i in 0..200 {
                let decay = 1.0 - i as f32 / 200.0;
                samples[start + i] = if i % 2 == 0 { decay } else { -decay };
            }
            start += step;
        }
        AudioTrack {
            samples,
            sample_rate,
        }
    }

    #[test]
    fn click_track_tempo_and_beats() {
        let config = SyncConfig::default();
        let track = click_track(12.0, config.sample_rate, config.hop_length, 22);
        let analysis = analyze_track(&track, 0.5, &config).unwrap();

        assert!((analysis.duration - 12.0).abs() < 1e-3);
        let expected_bpm = 60.0 * 22050.0 / 512.0 / 22.0;
        assert!(
            (analysis.tempo_bpm - expected_bpm).abs() < 6.0,
            "tempo {}",
            analysis.tempo_bpm
        );
        assert!(analysis.beat_times.len() >= 15, "beats {}", analysis.beat_times.len());
        assert!(analysis.beat_times.windows(2).all(|w| w[1] > w[0]));
        assert!(!analysis.hooks.is_empty());
        assert!(analysis.hooks.len() <= analysis.beat_times.len());
        assert!(analysis.hooks.windows(2).all(|w| w[0].strength >= w[1].strength));
    }

    #[test]
    fn silent_track_has_no_beats_or_hooks() {
        let config = SyncConfig::default();
        let track = AudioTrack {
            samples: vec![0.0; 22050 * 3],
            sample_rate: 22050,
        };
        let analysis = analyze_track(&track, 0.5, &config).unwrap();
        assert!(analysis.beat_times.is_empty());
        assert!(analysis.hooks.is_empty());
        assert!((analysis.duration - 3.0).abs() < 1e-9);
    }
}
