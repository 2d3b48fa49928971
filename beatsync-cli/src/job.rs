// ============================================================================
// beatsync-cli/src/job.rs
// ============================================================================
//
// JOB TRACKING: In-Memory Record of One Generation Run
//
// The CLI owns a VideoJob for every `generate` invocation. A JobReporter
// implements the core's ProgressCallback and forwards each update both to the
// job record and to an indicatif progress bar.
//
// KEY COMPONENTS:
// - JobStatus / VideoJob: Status, progress, output and failure details
// - JobReporter: ProgressCallback that updates the job and the bar

use beatsync_core::processing::PipelineError;
use beatsync_core::progress::{ProgressCallback, Stage};
use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;
use std::path::PathBuf;
use std::sync::{Mutex, MutexGuard};

// ============================================================================
// JOB RECORD
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Processing,
    Completed,
    Failed,
}

/// One generation run as seen by the caller.
#[derive(Debug, Clone, Serialize)]
pub struct VideoJob {
    pub id: String,
    pub status: JobStatus,
    /// Percentage in [0, 100].
    pub progress: f32,
    pub output_path: PathBuf,
    pub error: Option<String>,
    /// Label of the stage that failed, if any.
    pub failed_stage: Option<String>,
    /// `"{stage}: {percent}%"` for every update received.
    pub messages: Vec<String>,
    pub started_at: String,
    pub finished_at: Option<String>,
}

impl VideoJob {
    pub fn new(output_path: PathBuf) -> Self {
        Self {
            id: format!("job_{}", crate::logging::get_timestamp()),
            status: JobStatus::Processing,
            progress: 0.0,
            output_path,
            error: None,
            failed_stage: None,
            messages: Vec::new(),
            started_at: chrono::Local::now().to_rfc3339(),
            finished_at: None,
        }
    }

    pub fn record_progress(&mut self, stage: Stage, percent: f32) {
        self.progress = percent.clamp(0.0, 100.0);
        self.messages.push(format!("{}: {:.0}%", stage.label(), self.progress));
    }

    pub fn complete(&mut self) {
        self.status = JobStatus::Completed;
        self.progress = 100.0;
        self.finished_at = Some(chrono::Local::now().to_rfc3339());
    }

    pub fn fail(&mut self, error: &PipelineError) {
        self.status = JobStatus::Failed;
        self.error = Some(error.source.to_string());
        self.failed_stage = Some(error.stage.label().to_string());
        self.finished_at = Some(chrono::Local::now().to_rfc3339());
    }
}

// ============================================================================
// PROGRESS REPORTER
// ============================================================================

/// Feeds core progress into a [`VideoJob`] and a terminal progress bar.
pub struct JobReporter {
    job: Mutex<VideoJob>,
    bar: ProgressBar,
}

impl JobReporter {
    /// Reporter drawing to stderr; the bar hides itself when stderr is not a terminal.
    pub fn new(job: VideoJob) -> Self {
        let bar = ProgressBar::new(100);
        bar.set_style(
            ProgressStyle::with_template("{spinner} [{elapsed_precise}] {bar:40} {pos:>3}% {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_bar()),
        );
        Self::with_bar(job, bar)
    }

    pub fn with_bar(job: VideoJob, bar: ProgressBar) -> Self {
        Self {
            job: Mutex::new(job),
            bar,
        }
    }

    /// Locks the job record. A poisoned lock still yields the record.
    pub fn job(&self) -> MutexGuard<'_, VideoJob> {
        self.job.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    pub fn finish_success(&self) {
        self.job().complete();
        self.bar.finish_and_clear();
    }

    pub fn finish_failure(&self, error: &PipelineError) {
        self.job().fail(error);
        self.bar.abandon_with_message(format!("failed during {}", error.stage.name()));
    }

    /// Consumes the reporter and returns the job record.
    pub fn into_job(self) -> VideoJob {
        self.job.into_inner().unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

impl ProgressCallback for JobReporter {
    fn on_progress(&self, stage: Stage, percent: f32) {
        self.job().record_progress(stage, percent);
        self.bar.set_position(percent.round() as u64);
        self.bar.set_message(stage.label());
        log::debug!("{}: {percent:.1}%", stage.label());
    }
}
