//! `FFmpeg` event handler
//!
//! Consumes the event stream of one ffmpeg process: forwards ffmpeg's log
//! lines to the `ffmpeg_log` target, keeps the error lines for failure
//! reports, turns progress lines into a completion fraction, and optionally
//! collects raw bytes written to stdout.

use crate::error::CoreResult;
use crate::utils::parse_ffmpeg_time;
use ffmpeg_sidecar::event::{FfmpegEvent, FfmpegProgress, LogLevel as FfmpegLogLevel};

/// Minimum fraction change between two progress notifications.
const PROGRESS_STEP: f64 = 0.01;

/// Handler for the events of a single ffmpeg run.
pub struct FfmpegProgressHandler<'a> {
    duration: Option<f64>,
    last_fraction: f64,
    on_fraction: Option<Box<dyn FnMut(f64) + 'a>>,
    stderr_buffer: String,
    output: Option<Vec<u8>>,
}

impl<'a> FfmpegProgressHandler<'a> {
    /// Handler without progress reporting.
    #[must_use]
    pub fn new() -> Self {
        Self {
            duration: None,
            last_fraction: 0.0,
            on_fraction: None,
            stderr_buffer: String::new(),
            output: None,
        }
    }

    /// Handler that reports `time / duration` to `on_fraction` as ffmpeg advances.
    pub fn with_progress(duration: f64, on_fraction: impl FnMut(f64) + 'a) -> Self {
        Self {
            duration: Some(duration),
            on_fraction: Some(Box::new(on_fraction)),
            ..Self::new()
        }
    }

    /// Handler that keeps every stdout chunk.
    #[must_use]
    pub fn capturing_output() -> Self {
        Self {
            output: Some(Vec::new()),
            ..Self::new()
        }
    }

    /// Handles an `FFmpeg` event
    pub fn handle_event(&mut self, event: FfmpegEvent) -> CoreResult<()> {
        match event {
            FfmpegEvent::Progress(progress) => self.handle_progress(&progress),
            FfmpegEvent::Log(level, message) => self.handle_log(&level, &message),
            FfmpegEvent::Error(error) => self.handle_error(&error),
            FfmpegEvent::OutputChunk(chunk) => {
                if let Some(buffer) = self.output.as_mut() {
                    buffer.extend_from_slice(&chunk);
                }
            }
            _ => {}
        }
        Ok(())
    }

    /// Gets the accumulated stderr buffer
    #[must_use]
    pub fn stderr_buffer(&self) -> &str {
        &self.stderr_buffer
    }

    /// Last `lines` lines of the stderr buffer.
    #[must_use]
    pub fn stderr_tail(&self, lines: usize) -> String {
        let all: Vec<&str> = self.stderr_buffer.lines().collect();
        let start = all.len().saturating_sub(lines);
        all[start..].join("\n")
    }

    /// Takes the collected stdout bytes. Empty unless built with `capturing_output`.
    pub fn take_output(&mut self) -> Vec<u8> {
        self.output.take().unwrap_or_default()
    }

    fn handle_progress(&mut self, progress: &FfmpegProgress) {
        let Some(duration) = self.duration.filter(|&d| d > 0.0) else {
            return;
        };
        let current_secs = parse_ffmpeg_time(&progress.time).unwrap_or(0.0);
        let fraction = (current_secs / duration).clamp(0.0, 1.0);

        if fraction >= self.last_fraction + PROGRESS_STEP
            || (fraction >= 1.0 && self.last_fraction < 1.0)
        {
            log::trace!(
                "ffmpeg progress: {:.1}% (frame {}, speed {:.2}x)",
                fraction * 100.0,
                progress.frame,
                progress.speed
            );
            if let Some(callback) = self.on_fraction.as_mut() {
                callback(fraction);
            }
            self.last_fraction = fraction;
        }
    }

    fn handle_log(&mut self, level: &FfmpegLogLevel, message: &str) {
        let log_level = map_ffmpeg_log_level(level);
        if log_level == log::Level::Error {
            self.stderr_buffer.push_str(message);
            self.stderr_buffer.push('\n');
        }
        if log_level == log::Level::Info {
            log::debug!(target: "ffmpeg_log", "{message}");
        } else {
            log::log!(target: "ffmpeg_log", log_level, "{message}");
        }
    }

    fn handle_error(&mut self, error: &str) {
        if is_non_critical_ffmpeg_error(error) {
            log::debug!("ffmpeg non-critical message: {error}");
            return;
        }
        log::warn!(target: "ffmpeg_log", "ffmpeg stderr error: {error}");
        self.stderr_buffer.push_str(error);
        self.stderr_buffer.push('\n');
    }
}

impl Default for FfmpegProgressHandler<'_> {
    fn default() -> Self {
        Self::new()
    }
}

/// Maps `FFmpeg` log level to Rust log level
fn map_ffmpeg_log_level(level: &FfmpegLogLevel) -> log::Level {
    match level {
        FfmpegLogLevel::Fatal | FfmpegLogLevel::Error => log::Level::Error,
        FfmpegLogLevel::Warning => log::Level::Warn,
        FfmpegLogLevel::Info => log::Level::Info,
        _ => log::Level::Trace,
    }
}

/// Messages that appear on stderr without indicating a real problem.
fn is_non_critical_ffmpeg_error(error: &str) -> bool {
    error.contains("deprecated pixel format")
        || error.contains("Timestamps are unset")
        || error.contains("first frame is no keyframe")
        || error.contains("Non-monotonous DTS")
        || error.contains("No streams found")
}
