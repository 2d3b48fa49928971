//! Audio decoding through ffmpeg.
//!
//! The music file is decoded to mono 32-bit little-endian float PCM at the
//! analysis sample rate and streamed back over ffmpeg's stdout.

use crate::error::{CoreError, CoreResult};
use crate::external::ffmpeg_executor::{FfmpegSpawner, run_ffmpeg};
use crate::external::ffmpeg_handler::FfmpegProgressHandler;
use ffmpeg_sidecar::command::FfmpegCommand;
use std::path::Path;

/// Decoded mono audio.
#[derive(Debug, Clone, PartialEq)]
pub struct AudioTrack {
    pub samples: Vec<f32>,
    pub sample_rate: u32,
}

impl AudioTrack {
    /// Duration in seconds derived from the sample count.
    #[must_use]
    pub fn duration(&self) -> f64 {
        if self.sample_rate == 0 {
            0.0
        } else {
            self.samples.len() as f64 / f64::from(self.sample_rate)
        }
    }
}

/// Builds the decode command for `path`.
pub fn build_decode_command(path: &Path, sample_rate: u32) -> FfmpegCommand {
    let mut cmd = FfmpegCommand::new();
    cmd.hide_banner();
    cmd.input(path.to_string_lossy().as_ref());
    cmd.args(["-vn", "-sn", "-dn", "-ac", "1"]);
    cmd.arg("-ar").arg(sample_rate.to_string());
    cmd.args(["-c:a", "pcm_f32le", "-f", "f32le"]);
    cmd.output("-");
    cmd
}

/// Decodes `path` to mono float samples at `sample_rate`.
///
/// Any decode failure, including a stream that yields no samples, is
/// reported as [`CoreError::AudioLoad`].
pub fn decode_audio<S: FfmpegSpawner>(
    spawner: &S,
    path: &Path,
    sample_rate: u32,
) -> CoreResult<AudioTrack> {
    let audio_load = |message: String| CoreError::AudioLoad {
        path: path.display().to_string(),
        message,
    };

    if !path.is_file() {
        return Err(audio_load("file does not exist".to_string()));
    }

    let cmd = build_decode_command(path, sample_rate);
    let mut handler = FfmpegProgressHandler::capturing_output();
    run_ffmpeg(spawner, cmd, "audio decode", &mut handler).map_err(|e| audio_load(e.to_string()))?;

    let samples = samples_from_f32le(&handler.take_output());
    if samples.is_empty() {
        return Err(audio_load("decoder produced no samples".to_string()));
    }

    log::debug!(
        "Decoded {} samples at {} Hz from {}",
        samples.len(),
        sample_rate,
        path.display()
    );
    Ok(AudioTrack {
        samples,
        sample_rate,
    })
}

/// Converts raw f32le bytes to samples. A trailing partial sample is ignored.
#[must_use]
pub fn samples_from_f32le(bytes: &[u8]) -> Vec<f32> {
    bytes
        .chunks_exact(4)
        .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
        .collect()
}
