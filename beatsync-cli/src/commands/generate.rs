//! Implementation of the 'generate' subcommand.
//!
//! Builds the config and request from the arguments, checks the external
//! tools, runs the core pipeline with a job reporter and prints a summary.

use crate::cli::GenerateArgs;
use crate::error::CliResult;
use crate::job::{JobReporter, VideoJob};
use crate::terminal;

use anyhow::Context;
use beatsync_core::external::{CrateFfprobeExecutor, SidecarSpawner, check_dependency};
use beatsync_core::processing::generator::validate_request;
use beatsync_core::processing::{BeatSyncGenerator, GenerationReport, GenerationRequest};
use beatsync_core::{SyncConfig, format_bytes, format_duration};

use log::{debug, info};
use std::time::Instant;

fn build_request(args: &GenerateArgs) -> GenerationRequest {
    let request = GenerationRequest::new(&args.music, args.videos.clone(), &args.output);
    match args.hook_sensitivity {
        Some(value) => request.with_hook_sensitivity(value),
        None => request,
    }
}

fn display_initialization_info(request: &GenerationRequest, config: &SyncConfig) {
    let sensitivity = request.hook_sensitivity.unwrap_or(config.hook_sensitivity);
    terminal::print_section("INITIALIZATION");
    terminal::print_status("Music", &request.music_path.display().to_string(), false);
    terminal::print_status("Clips", &request.clip_paths.len().to_string(), false);
    terminal::print_status("Output", &request.output_path.display().to_string(), false);
    terminal::print_status("Hook threshold", &format!("{sensitivity:.2}"), false);
    terminal::print_status(
        "Format",
        &format!(
            "{}x{} @ {} fps, {} crf {}",
            config.target_width, config.target_height, config.fps, config.video_codec, config.crf
        ),
        false,
    );
}

fn display_report(report: &GenerationReport, total_start_time: Instant) {
    terminal::print_section("GENERATION COMPLETE");
    terminal::print_success(&format!("Wrote {}", report.output_path.display()));

    terminal::print_status("Music", &format_duration(report.music_duration), false);
    terminal::print_status("Tempo", &format!("{:.1} BPM", report.tempo_bpm), false);
    terminal::print_status("Beats", &report.beat_count.to_string(), false);
    terminal::print_status("Hooks", &report.hook_count.to_string(), false);
    let segments = if report.segments_dropped() > 0 {
        format!(
            "{} of {} ({} dropped)",
            report.segments_rendered,
            report.segments_planned,
            report.segments_dropped()
        )
    } else {
        report.segments_rendered.to_string()
    };
    terminal::print_status("Segments", &segments, false);
    if report.segments_via_fallback > 0 {
        terminal::print_status(
            "Fallback renders",
            &report.segments_via_fallback.to_string(),
            false,
        );
    }
    terminal::print_status("Video length", &format_duration(report.assembled_duration), false);
    if report.drift_corrected {
        terminal::print_status("Drift", "trimmed to music length", false);
    }
    terminal::print_status(
        "Strategies",
        &format!("concat {}, encode {}", report.concat_strategy, report.encode_strategy),
        false,
    );
    if let Ok(meta) = std::fs::metadata(&report.output_path) {
        terminal::print_status("Output size", &format_bytes(meta.len()), true);
    }
    terminal::print_status(
        "Total time",
        &format_duration(total_start_time.elapsed().as_secs_f64()),
        true,
    );
}

/// Runs the generation pipeline for the given arguments.
pub fn run_generate(args: GenerateArgs) -> CliResult<()> {
    let total_start_time = Instant::now();
    debug!("Run started: {}", chrono::Local::now());

    let config = crate::config::build_config(&args)?;
    let request = build_request(&args);
    validate_request(&request).context("Invalid generation request")?;

    for tool in ["ffmpeg", "ffprobe"] {
        check_dependency(tool).with_context(|| format!("{tool} is required"))?;
    }

    display_initialization_info(&request, &config);
    terminal::print_section("PROCESSING");
    terminal::print_processing("Generating video");

    let generator = BeatSyncGenerator::new(SidecarSpawner, CrateFfprobeExecutor::new(), config);
    let reporter = JobReporter::new(VideoJob::new(request.output_path.clone()));

    let outcome = generator.generate(&request, &reporter);
    match &outcome {
        Ok(_) => reporter.finish_success(),
        Err(e) => reporter.finish_failure(e),
    }
    let job = reporter.into_job();
    debug!(
        "Job record: {}",
        serde_json::to_string(&job).unwrap_or_else(|e| format!("<unserializable: {e}>"))
    );

    let report = outcome.context("Generation failed")?;
    info!("Job {} completed", job.id);
    display_report(&report, total_start_time);
    debug!("Finished at: {}", chrono::Local::now());
    Ok(())
}
