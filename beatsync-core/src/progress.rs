// ============================================================================
// beatsync-core/src/progress.rs
// ============================================================================
//
// PROGRESS REPORTING: Stage Progress Callbacks
//
// This module defines how the core reports progress to its caller. The
// pipeline emits (stage, percent) pairs through a caller-supplied
// ProgressCallback; the stage labels are part of the public contract and are
// shown to end users as-is.
//
// KEY COMPONENTS:
// - Stage: The pipeline stages with their labels and base percentages
// - ProgressCallback: Trait for receiving progress updates
// - NullProgressCallback: No-op implementation for when callbacks aren't needed
// - ProgressTracker: Wrapper that keeps emitted percentages monotonic

use std::cell::Cell;
use std::fmt;

// ============================================================================
// STAGES
// ============================================================================

/// Pipeline stages, in the order they run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    Preprocessing,
    AnalyzingMusic,
    LoadingVideos,
    ValidatingClips,
    RenderingVideos,
    StoringVideo,
}

impl Stage {
    /// All stages in pipeline order.
    pub const ALL: [Stage; 6] = [
        Stage::Preprocessing,
        Stage::AnalyzingMusic,
        Stage::LoadingVideos,
        Stage::ValidatingClips,
        Stage::RenderingVideos,
        Stage::StoringVideo,
    ];

    /// User-visible label.
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Stage::Preprocessing => "Preprocessing",
            Stage::AnalyzingMusic => "Analyzing music...",
            Stage::LoadingVideos => "Loading videos...",
            Stage::ValidatingClips => "Validating clips...",
            Stage::RenderingVideos => "Rendering videos...",
            Stage::StoringVideo => "Storing video...",
        }
    }

    /// Short lowercase name for log lines and error messages.
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Stage::Preprocessing => "preprocessing",
            Stage::AnalyzingMusic => "music analysis",
            Stage::LoadingVideos => "video loading",
            Stage::ValidatingClips => "clip validation",
            Stage::RenderingVideos => "rendering",
            Stage::StoringVideo => "storing",
        }
    }

    /// Percentage reported when the stage starts.
    #[must_use]
    pub fn base_percent(self) -> f32 {
        match self {
            Stage::Preprocessing => 10.0,
            Stage::AnalyzingMusic => 15.0,
            Stage::LoadingVideos => 25.0,
            Stage::ValidatingClips => 35.0,
            Stage::RenderingVideos => 50.0,
            Stage::StoringVideo => 60.0,
        }
    }

    /// Upper bound of the percentage range owned by this stage.
    #[must_use]
    pub fn ceiling_percent(self) -> f32 {
        match self {
            Stage::StoringVideo => 99.0,
            other => {
                let idx = Stage::ALL.iter().position(|s| *s == other).unwrap_or(0);
                Stage::ALL
                    .get(idx + 1)
                    .map_or(100.0, |next| next.base_percent())
            }
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

// ============================================================================
// PROGRESS CALLBACK
// ============================================================================

/// Trait for receiving progress updates from the pipeline.
///
/// Implementations must return quickly; the pipeline calls them inline from
/// its own thread.
pub trait ProgressCallback: Send + Sync {
    /// Called with the current stage and an overall percentage in [0, 100].
    fn on_progress(&self, stage: Stage, percent: f32);
}

impl<F> ProgressCallback for F
where
    F: Fn(Stage, f32) + Send + Sync,
{
    fn on_progress(&self, stage: Stage, percent: f32) {
        self(stage, percent);
    }
}

/// No-op implementation of ProgressCallback.
#[derive(Debug, Clone, Default)]
pub struct NullProgressCallback;

impl ProgressCallback for NullProgressCallback {
    fn on_progress(&self, _stage: Stage, _percent: f32) {}
}

// ============================================================================
// PROGRESS TRACKER
// ============================================================================

/// Forwards progress to a callback, clamping each value to [0, 100] and to
/// no less than the previous emission.
pub struct ProgressTracker<'a> {
    callback: &'a dyn ProgressCallback,
    last: Cell<f32>,
}

impl<'a> ProgressTracker<'a> {
    pub fn new(callback: &'a dyn ProgressCallback) -> Self {
        Self {
            callback,
            last: Cell::new(0.0),
        }
    }

    /// Reports the start of a stage at its base percentage.
    pub fn enter(&self, stage: Stage) {
        log::info!("{}", stage.label());
        self.report(stage, stage.base_percent());
    }

    /// Reports `fraction` (0..=1) of the way through a stage's range.
    pub fn advance(&self, stage: Stage, fraction: f64) {
        let fraction = if fraction.is_finite() {
            fraction.clamp(0.0, 1.0) as f32
        } else {
            0.0
        };
        let base = stage.base_percent();
        let span = stage.ceiling_percent() - base;
        self.report(stage, base + span * fraction);
    }

    /// Reports an explicit percentage, subject to the monotonic clamp.
    pub fn report(&self, stage: Stage, percent: f32) {
        let percent = if percent.is_finite() {
            percent.clamp(0.0, 100.0)
        } else {
            self.last.get()
        };
        let value = percent.max(self.last.get());
        self.last.set(value);
        self.callback.on_progress(stage, value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[derive(Default)]
    struct Recorder(Mutex<Vec<(Stage, f32)>>);

    impl ProgressCallback for Recorder {
        fn on_progress(&self, stage: Stage, percent: f32) {
            self.0.lock().unwrap().push((stage, percent));
        }
    }

    #[test]
    fn labels_and_bases_match_pipeline_contract() {
        let labels: Vec<_> = Stage::ALL.iter().map(|s| s.label()).collect();
        assert_eq!(
            labels,
            vec![
                "Preprocessing",
                "Analyzing music...",
                "Loading videos...",
                "Validating clips...",
                "Rendering videos...",
                "Storing video...",
            ]
        );
        let bases: Vec<_> = Stage::ALL.iter().map(|s| s.base_percent()).collect();
        assert_eq!(bases, vec![10.0, 15.0, 25.0, 35.0, 50.0, 60.0]);
    }

    #[test]
    fn tracker_never_regresses() {
        let recorder = Recorder::default();
        let tracker = ProgressTracker::new(&recorder);
        tracker.enter(Stage::RenderingVideos);
        tracker.report(Stage::RenderingVideos, 20.0);
        tracker.advance(Stage::RenderingVideos, 0.5);
        tracker.report(Stage::StoringVideo, 250.0);
        let values: Vec<f32> = recorder.0.lock().unwrap().iter().map(|(_, p)| *p).collect();
        assert_eq!(values, vec![50.0, 50.0, 55.0, 100.0]);
    }

    #[test]
    fn storing_stage_tops_out_below_completion() {
        assert_eq!(Stage::StoringVideo.ceiling_percent(), 99.0);
        assert_eq!(Stage::RenderingVideos.ceiling_percent(), 60.0);
    }

    #[test]
    fn closures_are_callbacks() {
        let seen = Mutex::new(None);
        let cb = |stage: Stage, pct: f32| *seen.lock().unwrap() = Some((stage, pct));
        ProgressTracker::new(&cb).enter(Stage::LoadingVideos);
        assert_eq!(*seen.lock().unwrap(), Some((Stage::LoadingVideos, 25.0)));
    }
}
