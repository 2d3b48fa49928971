//! FFprobe integration for media inspection
//!
//! Clips are probed once when the working set is loaded, and the assembled
//! video is probed again to measure its duration before the final encode.
use crate::error::{CoreError, CoreResult, command_failed_error, command_start_error};
use ffprobe::{FfProbeError, ffprobe};
use std::path::Path;

/// Struct containing media information.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct MediaInfo {
    /// Duration of the media in seconds
    pub duration: Option<f64>,
    /// Width of the first video stream
    pub width: Option<i64>,
    /// Height of the first video stream
    pub height: Option<i64>,
    pub has_video: bool,
    pub has_audio: bool,
}

/// Trait for probing media files.
pub trait FfprobeExecutor {
    fn probe(&self, input_path: &Path) -> CoreResult<MediaInfo>;
}

/// Concrete implementation of `FfprobeExecutor` using the `ffprobe` crate.
#[derive(Debug, Clone, Default)]
pub struct CrateFfprobeExecutor;

impl CrateFfprobeExecutor {
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl FfprobeExecutor for CrateFfprobeExecutor {
    fn probe(&self, input_path: &Path) -> CoreResult<MediaInfo> {
        log::debug!(
            "Running ffprobe (via crate) for media info on: {}",
            input_path.display()
        );
        match ffprobe(input_path) {
            Ok(metadata) => {
                let video_stream = metadata
                    .streams
                    .iter()
                    .find(|s| s.codec_type.as_deref() == Some("video"));
                let has_audio = metadata
                    .streams
                    .iter()
                    .any(|s| s.codec_type.as_deref() == Some("audio"));

                // Some containers only carry the duration on the stream
                let duration = metadata
                    .format
                    .duration
                    .as_deref()
                    .and_then(|d| d.parse::<f64>().ok())
                    .or_else(|| {
                        video_stream
                            .and_then(|s| s.duration.as_deref())
                            .and_then(|d| d.parse::<f64>().ok())
                    });

                Ok(MediaInfo {
                    duration,
                    width: video_stream.and_then(|s| s.width),
                    height: video_stream.and_then(|s| s.height),
                    has_video: video_stream.is_some(),
                    has_audio,
                })
            }
            Err(err) => {
                log::warn!("ffprobe failed on {}: {err:?}", input_path.display());
                Err(map_ffprobe_error(err, "media info"))
            }
        }
    }
}

fn map_ffprobe_error(err: FfProbeError, context: &str) -> CoreError {
    match err {
        FfProbeError::Io(io_err) => command_start_error(format!("ffprobe ({context})"), io_err),
        FfProbeError::Status(output) => {
            let stderr = String::from_utf8_lossy(&output.stderr).into_owned();
            command_failed_error(format!("ffprobe ({context})"), output.status, stderr)
        }
        FfProbeError::Deserialize(err) => {
            CoreError::FfprobeParse(format!("ffprobe {context} output deserialization: {err}"))
        }
        _ => CoreError::FfprobeParse(format!("Unknown ffprobe error during {context}: {err:?}")),
    }
}
