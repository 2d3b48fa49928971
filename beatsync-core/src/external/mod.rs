// ============================================================================
// beatsync-core/src/external/mod.rs
// ============================================================================
//
// EXTERNAL TOOLS: Interactions with ffmpeg and ffprobe
//
// This module encapsulates every interaction with the external media tools.
// The pipeline only talks to them through the FfmpegSpawner and
// FfprobeExecutor traits, so tests can swap in the scripted mocks.
//
// KEY COMPONENTS:
// - Traits for external tool interactions (FfmpegSpawner, FfprobeExecutor)
// - Concrete implementations using ffmpeg-sidecar and ffprobe crates
// - Audio decoding to PCM through ffmpeg
// - Dependency checking

use crate::error::{CoreError, CoreResult, command_start_error};
use std::io;
use std::process::{Command, Stdio};

// ============================================================================
// SUBMODULES
// ============================================================================

/// Decodes music files to mono PCM through ffmpeg
pub mod audio_decoder;
/// Contains traits and implementations for executing ffmpeg commands
pub mod ffmpeg_executor;
/// Consumes ffmpeg events: logs, errors, progress and stdout chunks
pub mod ffmpeg_handler;
/// Contains traits and implementations for executing ffprobe commands
pub mod ffprobe_executor;
/// Scripted ffmpeg/ffprobe implementations for tests
#[cfg(any(test, feature = "test-mocks"))]
pub mod mocks;

// ============================================================================
// RE-EXPORTS
// ============================================================================

pub use audio_decoder::{AudioTrack, decode_audio};
pub use ffmpeg_executor::{FfmpegProcess, FfmpegSpawner, SidecarProcess, SidecarSpawner, run_ffmpeg};
pub use ffmpeg_handler::FfmpegProgressHandler;
pub use ffprobe_executor::{CrateFfprobeExecutor, FfprobeExecutor, MediaInfo};

// ============================================================================
// DEPENDENCY CHECKING
// ============================================================================

/// Checks that an external command is available by running it with `-version`.
pub fn check_dependency(cmd_name: &str) -> CoreResult<()> {
    let result = Command::new(cmd_name)
        .arg("-version")
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status();

    match result {
        Ok(_) => {
            log::debug!("Found dependency: {cmd_name}");
            Ok(())
        }
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            log::warn!("Dependency '{cmd_name}' not found.");
            Err(CoreError::DependencyNotFound(cmd_name.to_string()))
        }
        Err(e) => {
            log::error!("Failed to start dependency check command '{cmd_name}': {e}");
            Err(command_start_error(cmd_name, e))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_dependency_is_reported() {
        let err = check_dependency("beatsync-no-such-tool-xyz").unwrap_err();
        assert!(matches!(err, CoreError::DependencyNotFound(name) if name == "beatsync-no-such-tool-xyz"));
    }
}
