// ============================================================================
// beatsync-core/src/processing/generator.rs
// ============================================================================
//
// GENERATOR: End-to-End Beat-Synchronized Video Generation
//
// Runs the stages in order (preprocess, analyze, load, validate, segment,
// render, assemble), reporting progress through the tracker and tagging any
// failure with the stage it happened in.
//
// KEY COMPONENTS:
// - GenerationRequest: Paths and options of one run
// - BeatSyncGenerator: Owns the tool seams and the config
// - GenerationReport: What was produced
// - PipelineError: CoreError plus the failing stage

use crate::analysis::{self, MusicAnalysis};
use crate::config::{SyncConfig, validate_hook_sensitivity};
use crate::error::CoreError;
use crate::external::{FfmpegSpawner, FfprobeExecutor};
use crate::processing::assembler;
use crate::processing::clips::load_clips;
use crate::processing::render::{plan_segments, render_segments};
use crate::processing::retry::Strategy;
use crate::processing::segmenter::segment;
use crate::processing::validation::validate_clip_durations;
use crate::progress::{ProgressCallback, ProgressTracker, Stage};
use crate::temp_files;
use std::path::{Path, PathBuf};
use std::time::Instant;
use thiserror::Error;

/// A pipeline failure and the stage it occurred in.
///
/// The display names the stage only; the cause is the error's `source()`.
#[derive(Error, Debug)]
#[error("{} stage failed", .stage.name())]
pub struct PipelineError {
    pub stage: Stage,
    #[source]
    pub source: CoreError,
}

impl PipelineError {
    pub fn new(stage: Stage, source: CoreError) -> Self {
        Self { stage, source }
    }
}

/// Inputs of one generation run.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationRequest {
    pub music_path: PathBuf,
    /// Candidate clips in the order they are assigned to segments.
    pub clip_paths: Vec<PathBuf>,
    pub output_path: PathBuf,
    /// Overrides the config's hook sensitivity when set.
    pub hook_sensitivity: Option<f32>,
}

impl GenerationRequest {
    pub fn new(music_path: impl Into<PathBuf>, clip_paths: Vec<PathBuf>, output_path: impl Into<PathBuf>) -> Self {
        Self {
            music_path: music_path.into(),
            clip_paths,
            output_path: output_path.into(),
            hook_sensitivity: None,
        }
    }

    #[must_use]
    pub fn with_hook_sensitivity(mut self, value: f32) -> Self {
        self.hook_sensitivity = Some(value);
        self
    }
}

/// Summary of a successful run.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationReport {
    pub output_path: PathBuf,
    pub music_duration: f64,
    pub tempo_bpm: f64,
    pub beat_count: usize,
    pub hook_count: usize,
    pub clips_loaded: usize,
    pub timeline_segments: usize,
    pub segments_planned: usize,
    pub segments_rendered: usize,
    /// Rendered segments that needed their fallback strategy.
    pub segments_via_fallback: usize,
    pub assembled_duration: f64,
    pub drift_corrected: bool,
    pub concat_strategy: Strategy,
    pub encode_strategy: Strategy,
    pub elapsed_secs: f64,
}

impl GenerationReport {
    /// Planned segments that failed both render strategies.
    #[must_use]
    pub fn segments_dropped(&self) -> usize {
        self.segments_planned - self.segments_rendered
    }
}

/// Generates beat-synchronized videos.
///
/// One instance runs one generation at a time; instances share no state.
pub struct BeatSyncGenerator<S: FfmpegSpawner, P: FfprobeExecutor> {
    spawner: S,
    prober: P,
    config: SyncConfig,
}

impl<S: FfmpegSpawner, P: FfprobeExecutor> BeatSyncGenerator<S, P> {
    pub fn new(spawner: S, prober: P, config: SyncConfig) -> Self {
        Self {
            spawner,
            prober,
            config,
        }
    }

    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    /// Analyzes the music only, without touching any clip.
    pub fn analyze(&self, music_path: &Path, hook_sensitivity: Option<f32>) -> Result<MusicAnalysis, PipelineError> {
        let sensitivity = self.sensitivity(hook_sensitivity, Stage::AnalyzingMusic)?;
        analysis::analyze(&self.spawner, music_path, sensitivity, &self.config)
            .map_err(|e| PipelineError::new(Stage::AnalyzingMusic, e))
    }

    /// Runs the whole pipeline for `request`.
    pub fn generate(
        &self,
        request: &GenerationRequest,
        progress: &dyn ProgressCallback,
    ) -> Result<GenerationReport, PipelineError> {
        let started = Instant::now();
        let tracker = ProgressTracker::new(progress);

        tracker.enter(Stage::Preprocessing);
        let sensitivity = self.preprocess(request)?;

        tracker.enter(Stage::AnalyzingMusic);
        let music = analysis::analyze(&self.spawner, &request.music_path, sensitivity, &self.config)
            .map_err(|e| PipelineError::new(Stage::AnalyzingMusic, e))?;

        self.run_from_analysis(request, &music, &tracker, started)
    }

    /// Runs the pipeline with an analysis the caller already holds.
    pub fn generate_with_analysis(
        &self,
        request: &GenerationRequest,
        music: &MusicAnalysis,
        progress: &dyn ProgressCallback,
    ) -> Result<GenerationReport, PipelineError> {
        let started = Instant::now();
        let tracker = ProgressTracker::new(progress);

        tracker.enter(Stage::Preprocessing);
        self.preprocess(request)?;
        tracker.enter(Stage::AnalyzingMusic);

        self.run_from_analysis(request, music, &tracker, started)
    }

    fn sensitivity(&self, requested: Option<f32>, stage: Stage) -> Result<f32, PipelineError> {
        let value = requested.unwrap_or(self.config.hook_sensitivity);
        validate_hook_sensitivity(value).map_err(|e| PipelineError::new(stage, e))?;
        Ok(value)
    }

    /// Checks config and request before any work. Returns the hook sensitivity to use.
    fn preprocess(&self, request: &GenerationRequest) -> Result<f32, PipelineError> {
        let fail = |e: CoreError| PipelineError::new(Stage::Preprocessing, e);
        self.config.validate().map_err(fail)?;
        let sensitivity = self.sensitivity(request.hook_sensitivity, Stage::Preprocessing)?;
        validate_request(request).map_err(fail)?;
        Ok(sensitivity)
    }

    fn run_from_analysis(
        &self,
        request: &GenerationRequest,
        music: &MusicAnalysis,
        tracker: &ProgressTracker<'_>,
        started: Instant,
    ) -> Result<GenerationReport, PipelineError> {
        tracker.enter(Stage::LoadingVideos);
        let clips = load_clips(&self.prober, &request.clip_paths)
            .map_err(|e| PipelineError::new(Stage::LoadingVideos, e))?;

        tracker.enter(Stage::ValidatingClips);
        validate_clip_durations(&clips, music.duration)
            .map_err(|e| PipelineError::new(Stage::ValidatingClips, e))?;

        tracker.enter(Stage::RenderingVideos);
        let render_err = |e| PipelineError::new(Stage::RenderingVideos, e);
        let timeline = segment(&music.hook_times(), clips.len(), music.duration).map_err(render_err)?;
        log::debug!("Transition timeline: {:?}", timeline.boundaries());
        let plans = plan_segments(&timeline, &clips);

        let output_dir = output_parent(&request.output_path);
        let work_dir = temp_files::create_temp_dir(&self.config, &output_dir, ".beatsync_work_")
            .map_err(render_err)?;
        let rendered = render_segments(&self.spawner, &plans, &clips, work_dir.path(), &self.config, |done, total| {
            tracker.advance(Stage::RenderingVideos, done as f64 / total as f64);
        })
        .map_err(render_err)?;

        tracker.enter(Stage::StoringVideo);
        let mut on_encode = |fraction: f64| tracker.advance(Stage::StoringVideo, fraction);
        let assembly = assembler::assemble(
            &self.spawner,
            &self.prober,
            &rendered,
            &request.music_path,
            music.duration,
            &request.output_path,
            work_dir.path(),
            &self.config,
            &mut on_encode,
        )
        .map_err(|e| PipelineError::new(Stage::StoringVideo, e))?;

        // Scratch files go before reporting completion
        if let Err(e) = work_dir.close() {
            log::warn!("Failed to remove scratch directory: {e}");
        }
        tracker.report(Stage::StoringVideo, 100.0);

        let report = GenerationReport {
            output_path: assembly.output_path,
            music_duration: music.duration,
            tempo_bpm: music.tempo_bpm,
            beat_count: music.beat_times.len(),
            hook_count: music.hooks.len(),
            clips_loaded: clips.len(),
            timeline_segments: timeline.num_segments(),
            segments_planned: plans.len(),
            segments_rendered: rendered.len(),
            segments_via_fallback: rendered
                .iter()
                .filter(|s| s.strategy == Strategy::Fallback)
                .count(),
            assembled_duration: assembly.assembled_duration,
            drift_corrected: assembly.drift_corrected,
            concat_strategy: assembly.concat_strategy,
            encode_strategy: assembly.encode_strategy,
            elapsed_secs: started.elapsed().as_secs_f64(),
        };
        log::info!(
            "Generated {} from {} segments in {:.1}s",
            report.output_path.display(),
            report.segments_rendered,
            report.elapsed_secs
        );
        Ok(report)
    }
}

fn output_parent(output: &Path) -> PathBuf {
    match output.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => PathBuf::from("."),
    }
}

fn same_file(a: &Path, b: &Path) -> bool {
    match (a.canonicalize(), b.canonicalize()) {
        (Ok(a), Ok(b)) => a == b,
        _ => a == b,
    }
}

/// Input checks that must pass before anything is written.
pub fn validate_request(request: &GenerationRequest) -> Result<(), CoreError> {
    if request.clip_paths.is_empty() {
        return Err(CoreError::InvalidInput("no video clips given".into()));
    }
    if !request.music_path.is_file() {
        return Err(CoreError::InvalidInput(format!(
            "music file not found: {}",
            request.music_path.display()
        )));
    }
    if request.output_path.file_name().is_none() {
        return Err(CoreError::InvalidInput(format!(
            "output path has no file name: {}",
            request.output_path.display()
        )));
    }
    let mut inputs = std::iter::once(&request.music_path).chain(&request.clip_paths);
    if let Some(clash) = inputs.find(|p| same_file(p, &request.output_path)) {
        return Err(CoreError::InvalidInput(format!(
            "output path would overwrite input {}",
            clash.display()
        )));
    }
    std::fs::create_dir_all(output_parent(&request.output_path))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pipeline_error_names_the_stage() {
        let err = PipelineError::new(Stage::ValidatingClips, CoreError::NoValidClips);
        assert_eq!(err.to_string(), "clip validation stage failed");
        let cause = std::error::Error::source(&err).map(ToString::to_string);
        assert_eq!(cause.as_deref(), Some("No valid video clips provided"));
    }

    #[test]
    fn request_with_no_clips_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let music = dir.path().join("song.mp3");
        std::fs::write(&music, b"id3").unwrap();
        let request = GenerationRequest::new(&music, vec![], dir.path().join("out.mp4"));
        assert!(matches!(validate_request(&request), Err(CoreError::InvalidInput(_))));
    }

    #[test]
    fn output_may_not_replace_an_input() {
        let dir = tempfile::tempdir().unwrap();
        let music = dir.path().join("song.mp3");
        let clip = dir.path().join("clip.mp4");
        std::fs::write(&music, b"id3").unwrap();
        std::fs::write(&clip, b"mp4").unwrap();
        let request = GenerationRequest::new(&music, vec![clip.clone()], &clip);
        assert!(matches!(validate_request(&request), Err(CoreError::InvalidInput(_))));
    }

    #[test]
    fn missing_output_directory_is_created() {
        let dir = tempfile::tempdir().unwrap();
        let music = dir.path().join("song.mp3");
        std::fs::write(&music, b"id3").unwrap();
        let output = dir.path().join("renders/nested/out.mp4");
        let request = GenerationRequest::new(&music, vec![dir.path().join("a.mp4")], &output);
        validate_request(&request).unwrap();
        assert!(output.parent().unwrap().is_dir());
    }
}
