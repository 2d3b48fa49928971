//! Error types for the beatsync-core library.
//!
//! Every fallible operation in the core returns [`CoreResult`]. Errors raised
//! while running external tools carry the command name so the caller can tell
//! which ffmpeg/ffprobe invocation failed.

use std::io;
use std::process::ExitStatus;
use thiserror::Error;

/// Custom error type for the beatsync-core library.
#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Failed to load audio from {path}: {message}")]
    AudioLoad { path: String, message: String },

    #[error("Audio analysis failed: {0}")]
    Analysis(String),

    #[error("No valid video clips provided")]
    NoValidClips,

    #[error(
        "Total clip duration is insufficient: required {required:.2}s, available {available:.2}s"
    )]
    InsufficientClipDuration { required: f64, available: f64 },

    #[error("No segments could be rendered")]
    NoSegmentsProduced,

    #[error("Invalid transition timeline: {0}")]
    InvalidTimeline(String),

    #[error("Segment {index} render failed: {message}")]
    Render { index: usize, message: String },

    #[error("Concatenation failed: {0}")]
    Concat(String),

    #[error("Final encode failed: {0}")]
    Encode(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Required dependency not found: {0}")]
    DependencyNotFound(String),

    #[error("Failed to start command '{command}': {source}")]
    CommandStart {
        command: String,
        #[source]
        source: io::Error,
    },

    #[error("Command '{command}' failed with status {status}: {stderr}")]
    CommandFailed {
        command: String,
        status: ExitStatus,
        stderr: String,
    },

    #[error("Failed waiting for command '{command}': {source}")]
    CommandWait {
        command: String,
        #[source]
        source: io::Error,
    },

    #[error("ffprobe output parsing error: {0}")]
    FfprobeParse(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

impl CoreError {
    /// Returns true for errors caused by the caller's inputs rather than by
    /// an external tool failing mid-run.
    #[must_use]
    pub fn is_fatal_input(&self) -> bool {
        matches!(
            self,
            CoreError::InvalidInput(_)
                | CoreError::NoValidClips
                | CoreError::InsufficientClipDuration { .. }
                | CoreError::AudioLoad { .. }
                | CoreError::Config(_)
        )
    }
}

/// Result type alias used throughout the core.
pub type CoreResult<T> = Result<T, CoreError>;

/// Builds a [`CoreError::CommandStart`].
pub fn command_start_error(command: impl Into<String>, source: io::Error) -> CoreError {
    CoreError::CommandStart {
        command: command.into(),
        source,
    }
}

/// Builds a [`CoreError::CommandFailed`].
pub fn command_failed_error(
    command: impl Into<String>,
    status: ExitStatus,
    stderr: impl Into<String>,
) -> CoreError {
    CoreError::CommandFailed {
        command: command.into(),
        status,
        stderr: stderr.into(),
    }
}

/// Builds a [`CoreError::CommandWait`].
pub fn command_wait_error(command: impl Into<String>, source: io::Error) -> CoreError {
    CoreError::CommandWait {
        command: command.into(),
        source,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insufficient_duration_message_names_both_totals() {
        let err = CoreError::InsufficientClipDuration {
            required: 20.0,
            available: 10.0,
        };
        let msg = err.to_string();
        assert!(msg.contains("20.00"));
        assert!(msg.contains("10.00"));
    }

    #[test]
    fn input_errors_are_classified() {
        assert!(CoreError::NoValidClips.is_fatal_input());
        assert!(!CoreError::NoSegmentsProduced.is_fatal_input());
        assert!(!CoreError::Encode("x".into()).is_fatal_input());
    }
}
