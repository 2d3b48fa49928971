// beatsync-core/src/external/mocks.rs

// --- Mocking Infrastructure (for testing) ---

// Scripted stand-ins for ffmpeg and ffprobe. Compiled for unit tests and when
// the "test-mocks" feature is enabled, which the integration tests turn on.

use super::ffmpeg_executor::{FfmpegProcess, FfmpegSpawner, command_args};
use super::ffprobe_executor::{FfprobeExecutor, MediaInfo};
use crate::error::{CoreError, CoreResult};
use ffmpeg_sidecar::command::FfmpegCommand;
use ffmpeg_sidecar::event::FfmpegEvent;
use std::cell::RefCell;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::process::ExitStatus;
use std::rc::Rc;

/// Builds an exit status with the given code.
pub fn exit_status(code: i32) -> ExitStatus {
    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        ExitStatus::from_raw(code << 8)
    }
    #[cfg(windows)]
    {
        use std::os::windows::process::ExitStatusExt;
        ExitStatus::from_raw(code as u32)
    }
}

/// Mock implementation of FfmpegProcess.
#[derive(Clone)]
pub struct MockFfmpegProcess {
    /// Events to emit when handle_events is called.
    pub events_to_emit: Rc<RefCell<Vec<FfmpegEvent>>>,
    /// Exit status to return when wait is called.
    pub exit_status: ExitStatus,
}

impl MockFfmpegProcess {
    fn new(events: Vec<FfmpegEvent>, exit_status: ExitStatus) -> Self {
        Self {
            events_to_emit: Rc::new(RefCell::new(events)),
            exit_status,
        }
    }
}

impl FfmpegProcess for MockFfmpegProcess {
    fn handle_events<F>(&mut self, mut handler: F) -> CoreResult<()>
    where
        F: FnMut(FfmpegEvent) -> CoreResult<()>,
    {
        let events = self.events_to_emit.borrow().clone();
        for event in events {
            handler(event)?;
        }
        Ok(())
    }

    fn wait(&mut self) -> CoreResult<ExitStatus> {
        Ok(self.exit_status)
    }
}

enum MockOutcome {
    Process(MockFfmpegProcess),
    SpawnError(String),
}

/// Represents an expected ffmpeg command call and its mock result.
struct MockFfmpegExpectation {
    arg_pattern: String,
    outcome: MockOutcome,
    create_dummy_output: bool,
}

/// Mock implementation of FfmpegSpawner supporting multiple expectations.
///
/// Each spawn consumes the first expectation whose pattern is a substring of
/// any argument. Unmatched commands panic unless the spawner was built with
/// [`MockFfmpegSpawner::permissive`], in which case they succeed and create
/// an empty file at the output path.
#[derive(Clone, Default)]
pub struct MockFfmpegSpawner {
    expectations: Rc<RefCell<Vec<MockFfmpegExpectation>>>,
    received_calls: Rc<RefCell<Vec<Vec<String>>>>,
    permissive: bool,
}

impl MockFfmpegSpawner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Spawner where unmatched commands succeed.
    pub fn permissive() -> Self {
        Self {
            permissive: true,
            ..Self::default()
        }
    }

    pub fn add_success_expectation(
        &self,
        arg_pattern: &str,
        events: Vec<FfmpegEvent>,
        create_dummy_output: bool,
    ) {
        self.push(
            arg_pattern,
            MockOutcome::Process(MockFfmpegProcess::new(events, exit_status(0))),
            create_dummy_output,
        );
    }

    pub fn add_exit_error_expectation(&self, arg_pattern: &str, events: Vec<FfmpegEvent>, exit_code: i32) {
        self.push(
            arg_pattern,
            MockOutcome::Process(MockFfmpegProcess::new(events, exit_status(exit_code))),
            false,
        );
    }

    pub fn add_spawn_error_expectation(&self, arg_pattern: &str, message: &str) {
        self.push(arg_pattern, MockOutcome::SpawnError(message.to_string()), false);
    }

    fn push(&self, arg_pattern: &str, outcome: MockOutcome, create_dummy_output: bool) {
        self.expectations.borrow_mut().push(MockFfmpegExpectation {
            arg_pattern: arg_pattern.to_string(),
            outcome,
            create_dummy_output,
        });
    }

    pub fn get_received_calls(&self) -> Vec<Vec<String>> {
        self.received_calls.borrow().clone()
    }

    /// Number of expectations not yet consumed.
    pub fn pending_expectations(&self) -> usize {
        self.expectations.borrow().len()
    }
}

fn create_dummy_output(args: &[String]) {
    let Some(output_path_str) = args.last().filter(|a| a.as_str() != "-") else {
        return;
    };
    let output_path = PathBuf::from(output_path_str);
    if let Some(parent) = output_path.parent() {
        if let Err(e) = std::fs::create_dir_all(parent) {
            log::error!("MockFfmpegSpawner failed to create parent dir {parent:?}: {e}");
        }
    }
    match std::fs::write(&output_path, b"mock") {
        Ok(()) => log::debug!("MockFfmpegSpawner created dummy output file: {output_path:?}"),
        Err(e) => log::error!("MockFfmpegSpawner failed to create dummy output file {output_path:?}: {e}"),
    }
}

impl FfmpegSpawner for MockFfmpegSpawner {
    type Process = MockFfmpegProcess;

    fn spawn(&self, cmd: FfmpegCommand) -> CoreResult<Self::Process> {
        let args = command_args(&cmd);
        self.received_calls.borrow_mut().push(args.clone());

        let mut expectations = self.expectations.borrow_mut();
        let found_index = expectations
            .iter()
            .position(|exp| args.iter().any(|arg| arg.contains(&exp.arg_pattern)));

        match found_index {
            Some(index) => {
                let expectation = expectations.remove(index);
                log::debug!("MockFfmpegSpawner: Matched expectation with pattern '{}'", expectation.arg_pattern);
                match expectation.outcome {
                    MockOutcome::Process(process) => {
                        if expectation.create_dummy_output && process.exit_status.success() {
                            create_dummy_output(&args);
                        }
                        Ok(process)
                    }
                    MockOutcome::SpawnError(message) => Err(CoreError::CommandStart {
                        command: "ffmpeg (mock)".to_string(),
                        source: std::io::Error::other(message),
                    }),
                }
            }
            None if self.permissive => {
                create_dummy_output(&args);
                Ok(MockFfmpegProcess::new(Vec::new(), exit_status(0)))
            }
            None => {
                panic!("MockFfmpegSpawner: No expectation found for command args: {args:?}");
            }
        }
    }
}

/// Mock implementation of FfprobeExecutor.
#[derive(Clone, Default)]
pub struct MockFfprobeExecutor {
    results: Rc<RefCell<HashMap<PathBuf, Result<MediaInfo, String>>>>,
    received_calls: Rc<RefCell<Vec<PathBuf>>>,
}

impl MockFfprobeExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add the result of probing `input_path`.
    pub fn expect_media_info(&self, input_path: &Path, info: MediaInfo) {
        self.results.borrow_mut().insert(input_path.to_path_buf(), Ok(info));
    }

    /// Add a probe failure for `input_path`.
    pub fn expect_error(&self, input_path: &Path, message: &str) {
        self.results
            .borrow_mut()
            .insert(input_path.to_path_buf(), Err(message.to_string()));
    }

    pub fn get_received_calls(&self) -> Vec<PathBuf> {
        self.received_calls.borrow().clone()
    }

    /// Media info for a 1280x720 video-only clip of the given duration.
    pub fn video_info(duration: f64) -> MediaInfo {
        MediaInfo {
            duration: Some(duration),
            width: Some(1280),
            height: Some(720),
            has_video: true,
            has_audio: false,
        }
    }
}

impl FfprobeExecutor for MockFfprobeExecutor {
    fn probe(&self, input_path: &Path) -> CoreResult<MediaInfo> {
        self.received_calls.borrow_mut().push(input_path.to_path_buf());
        match self.results.borrow().get(input_path) {
            Some(Ok(info)) => Ok(info.clone()),
            Some(Err(message)) => Err(CoreError::FfprobeParse(format!(
                "Mock ffprobe error for {}: {message}",
                input_path.display()
            ))),
            None => Err(CoreError::FfprobeParse(format!(
                "MockFfprobeExecutor: No expectation set for path {}",
                input_path.display()
            ))),
        }
    }
}
