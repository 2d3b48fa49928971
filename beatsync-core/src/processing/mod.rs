//! Clip handling, segmentation, rendering and assembly.
//!
//! This module holds every step after music analysis. The generator drives
//! them in order; the other submodules are usable on their own.

/// Probe and filter candidate clips
pub mod clips;

/// Total clip duration check against the music
pub mod validation;

/// Transition timeline from hook times
pub mod segmenter;

/// Primary/fallback strategy runner
pub mod retry;

/// Per-segment planning and rendering
pub mod render;

/// Concatenation, drift correction and final encode
pub mod assembler;

/// End-to-end pipeline orchestration
pub mod generator;

pub use assembler::AssemblyReport;
pub use clips::{VideoClip, load_clips};
pub use generator::{BeatSyncGenerator, GenerationReport, GenerationRequest, PipelineError};
pub use render::{Fit, RenderedSegment, SegmentPlan};
pub use retry::Strategy;
pub use segmenter::{TransitionTimeline, segment};
pub use validation::validate_clip_durations;
