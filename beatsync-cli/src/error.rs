// ============================================================================
// beatsync-cli/src/error.rs
// ============================================================================
//
// CLI ERROR HANDLING: Result alias and user hints
//
// Commands return anyhow errors with context attached; the core's typed
// errors stay reachable through downcasting so main can print a hint.

use beatsync_core::CoreError;
use beatsync_core::processing::PipelineError;

/// Result type for command implementations.
pub type CliResult<T> = anyhow::Result<T>;

/// Exit code for any failed command.
pub const FAILURE_EXIT_CODE: i32 = 1;

fn core_error(err: &anyhow::Error) -> Option<&CoreError> {
    err.chain().find_map(|cause| {
        cause
            .downcast_ref::<PipelineError>()
            .map(|p| &p.source)
            .or_else(|| cause.downcast_ref::<CoreError>())
    })
}

/// A short suggestion for errors the user can fix.
pub fn suggestion(err: &anyhow::Error) -> Option<&'static str> {
    match core_error(err)? {
        CoreError::InsufficientClipDuration { .. } => {
            Some("Add more clips or longer clips; together they must cover the whole song")
        }
        CoreError::NoValidClips => Some("Check that the --video files are readable video files"),
        CoreError::AudioLoad { .. } => Some("Check that the --music file is a readable audio file"),
        CoreError::DependencyNotFound(_) => Some("Install ffmpeg and make sure ffmpeg and ffprobe are on PATH"),
        CoreError::Config(_) => Some("Check the values in the config file and BEATSYNC_* variables"),
        other if other.is_fatal_input() => Some("Check the paths given on the command line"),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Context;
    use beatsync_core::progress::Stage;

    #[test]
    fn hint_found_through_context_and_stage() {
        let err: CliResult<()> = Err(PipelineError::new(Stage::LoadingVideos, CoreError::NoValidClips))
            .context("Generation failed");
        let err = err.unwrap_err();
        assert!(suggestion(&err).unwrap().contains("--video"));
    }

    #[test]
    fn plain_core_errors_are_found_too() {
        let err = anyhow::Error::new(CoreError::DependencyNotFound("ffmpeg".into()));
        assert!(suggestion(&err).is_some());
        let err = anyhow::Error::new(PipelineError::new(
            Stage::Preprocessing,
            CoreError::InvalidInput("output would overwrite input".into()),
        ));
        assert_eq!(suggestion(&err), Some("Check the paths given on the command line"));
        let err = anyhow::Error::new(CoreError::Encode("x264 crashed".into()));
        assert!(suggestion(&err).is_none());
        let err = anyhow::anyhow!("something else");
        assert!(suggestion(&err).is_none());
    }
}
