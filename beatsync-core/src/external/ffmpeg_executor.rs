// ============================================================================
// beatsync-core/src/external/ffmpeg_executor.rs
// ============================================================================
//
// FFMPEG EXECUTOR: FFmpeg Process Management and Abstraction
//
// This module provides abstractions for spawning and interacting with FFmpeg
// processes. Every ffmpeg invocation in the pipeline (audio decode, segment
// render, concatenation, final encode) goes through an FfmpegSpawner so the
// pipeline can run against scripted processes in tests.
//
// KEY COMPONENTS:
// - FfmpegProcess: Trait representing an active FFmpeg process
// - FfmpegSpawner: Trait for creating new FFmpeg processes
// - SidecarSpawner: Concrete implementation using ffmpeg-sidecar
// - run_ffmpeg: Spawn, drain events, wait, and map failures to CoreError

use crate::error::{CoreResult, command_failed_error, command_start_error, command_wait_error};
use crate::external::ffmpeg_handler::FfmpegProgressHandler;
use ffmpeg_sidecar::child::FfmpegChild as SidecarChild;
use ffmpeg_sidecar::command::FfmpegCommand;
use ffmpeg_sidecar::event::FfmpegEvent;
use std::process::ExitStatus;

// --- Process seam ---

/// A running ffmpeg process.
pub trait FfmpegProcess {
    /// Feeds every event of the process to `handler` until it ends or `handler` fails.
    fn handle_events<F>(&mut self, handler: F) -> CoreResult<()>
    where
        F: FnMut(FfmpegEvent) -> CoreResult<()>;

    /// Blocks until the process exits.
    fn wait(&mut self) -> CoreResult<ExitStatus>;
}

/// Starts ffmpeg processes.
pub trait FfmpegSpawner {
    type Process: FfmpegProcess;
    fn spawn(&self, cmd: FfmpegCommand) -> CoreResult<Self::Process>;
}

// --- ffmpeg-sidecar backend ---

/// A real ffmpeg child process.
pub struct SidecarProcess(SidecarChild);

impl FfmpegProcess for SidecarProcess {
    fn handle_events<F>(&mut self, mut handler: F) -> CoreResult<()>
    where
        F: FnMut(FfmpegEvent) -> CoreResult<()>,
    {
        let events = self.0.iter().map_err(|e| {
            log::error!("Could not read ffmpeg output: {e}");
            command_failed_error("ffmpeg (event stream)", ExitStatus::default(), e.to_string())
        })?;
        events.into_iter().try_for_each(&mut handler)
    }

    fn wait(&mut self) -> CoreResult<ExitStatus> {
        self.0
            .wait()
            .map_err(|e| command_wait_error("ffmpeg (sidecar)", e))
    }
}

/// Spawns the ffmpeg binary found by ffmpeg-sidecar.
#[derive(Debug, Clone, Default)]
pub struct SidecarSpawner;

impl FfmpegSpawner for SidecarSpawner {
    type Process = SidecarProcess;

    fn spawn(&self, mut cmd: FfmpegCommand) -> CoreResult<Self::Process> {
        cmd.spawn()
            .map(SidecarProcess)
            .map_err(|e| command_start_error("ffmpeg (sidecar)", e))
    }
}

// --- Helpers ---

/// Returns the arguments of a command as owned strings.
pub fn command_args(cmd: &FfmpegCommand) -> Vec<String> {
    cmd.get_args()
        .map(|arg| arg.to_string_lossy().into_owned())
        .collect()
}

/// Spawns `cmd`, drains its events through `handler`, and waits for it.
///
/// A non-zero exit status becomes [`CoreError::CommandFailed`] carrying the
/// tail of ffmpeg's error output.
///
/// [`CoreError::CommandFailed`]: crate::error::CoreError::CommandFailed
pub fn run_ffmpeg<S: FfmpegSpawner>(
    spawner: &S,
    cmd: FfmpegCommand,
    label: &str,
    handler: &mut FfmpegProgressHandler<'_>,
) -> CoreResult<()> {
    log::debug!("Running ffmpeg ({label}): ffmpeg {}", command_args(&cmd).join(" "));

    let mut process = spawner.spawn(cmd)?;
    process.handle_events(|event| handler.handle_event(event))?;
    let status = process.wait()?;

    if status.success() {
        Ok(())
    } else {
        log::error!("ffmpeg ({label}) exited with {status}");
        Err(command_failed_error(
            format!("ffmpeg ({label})"),
            status,
            handler.stderr_tail(20),
        ))
    }
}
