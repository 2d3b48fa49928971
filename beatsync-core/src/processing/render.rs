// ============================================================================
// beatsync-core/src/processing/render.rs
// ============================================================================
//
// SEGMENT RENDERER: One Sub-Clip per Timeline Segment
//
// Turns the timeline into render plans (which clip, trimmed or looped) and
// runs ffmpeg once per plan. Every rendered segment has the same frame size,
// frame rate and pixel format, and no audio, so the assembler can join them
// with a stream copy.
//
// KEY COMPONENTS:
// - Fit / SegmentPlan: Pure planning data
// - plan_segments: Round-robin clip selection with the clip-count cap
// - build_render_command: ffmpeg arguments for each fit and strategy
// - render_segments: Runs the plans, dropping segments that fail twice

use crate::config::SyncConfig;
use crate::error::{CoreError, CoreResult};
use crate::external::{FfmpegProgressHandler, FfmpegSpawner, run_ffmpeg};
use crate::processing::clips::VideoClip;
use crate::processing::retry::{Strategy, with_fallback};
use crate::processing::segmenter::TransitionTimeline;
use crate::temp_files;
use crate::utils::format_seconds_arg;
use ffmpeg_sidecar::command::FfmpegCommand;
use std::path::{Path, PathBuf};

/// Most inputs the concat-filter loop fallback opens. Longer loops use an
/// endless input loop cut by `-t`.
pub const MAX_LOOP_INPUTS: u32 = 16;

/// How a clip is fitted to its segment.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Fit {
    /// Take `duration` seconds starting at `offset`, centered in the clip.
    Trim { offset: f64 },
    /// Play the clip `repeats` times back to back, then cut to the segment length.
    Loop { repeats: u32 },
}

/// Picks the fit for a clip of `clip_duration` in a segment of `segment_duration`.
#[must_use]
pub fn plan_fit(clip_duration: f64, segment_duration: f64) -> Fit {
    if clip_duration >= segment_duration {
        let offset = (clip_duration / 2.0 - segment_duration / 2.0).max(0.0);
        Fit::Trim { offset }
    } else {
        let repeats = (segment_duration / clip_duration).ceil().max(1.0) as u32;
        Fit::Loop { repeats }
    }
}

/// Everything needed to render one segment.
#[derive(Debug, Clone, PartialEq)]
pub struct SegmentPlan {
    pub index: usize,
    pub start: f64,
    pub end: f64,
    pub duration: f64,
    /// Index into the loaded clip list.
    pub clip_index: usize,
    pub fit: Fit,
}

/// A rendered intermediate file.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderedSegment {
    pub index: usize,
    pub path: PathBuf,
    pub duration: f64,
    pub strategy: Strategy,
}

/// Plans `min(num_segments, clips.len())` segments with round-robin clip selection.
///
/// Segments past the clip count are dropped with a warning naming how much of
/// the timeline they covered. Non-positive segments are skipped.
#[must_use]
pub fn plan_segments(timeline: &TransitionTimeline, clips: &[VideoClip]) -> Vec<SegmentPlan> {
    if clips.is_empty() {
        return Vec::new();
    }
    let limit = timeline.num_segments().min(clips.len());
    if timeline.num_segments() > limit {
        let dropped: f64 = timeline.segments().skip(limit).map(|(s, e)| e - s).sum();
        log::warn!(
            "Timeline has {} segments but only {} clips; dropping the last {} segment(s) ({:.2}s of music)",
            timeline.num_segments(),
            clips.len(),
            timeline.num_segments() - limit,
            dropped
        );
    }

    timeline
        .segments()
        .take(limit)
        .enumerate()
        .filter_map(|(index, (start, end))| {
            let duration = end - start;
            if duration <= 0.0 {
                log::info!("Skipping empty segment {index} ({start:.3}s..{end:.3}s)");
                return None;
            }
            let clip_index = index % clips.len();
            Some(SegmentPlan {
                index,
                start,
                end,
                duration,
                clip_index,
                fit: plan_fit(clips[clip_index].duration, duration),
            })
        })
        .collect()
}

/// Scale to fit the target box keeping aspect ratio, pad to exactly the box,
/// force square pixels and a constant frame rate.
#[must_use]
pub fn normalize_filter(config: &SyncConfig) -> String {
    let (w, h) = (config.target_width, config.target_height);
    format!(
        "scale={w}:{h}:force_original_aspect_ratio=decrease,pad={w}:{h}:(ow-iw)/2:(oh-ih)/2,setsar=1,fps={}",
        config.fps
    )
}

fn add_video_output_args(cmd: &mut FfmpegCommand, config: &SyncConfig, duration: f64) {
    cmd.arg("-t").arg(format_seconds_arg(duration));
    cmd.arg("-an");
    cmd.args(["-c:v", config.video_codec.as_str()]);
    cmd.args(["-preset", config.preset.as_str()]);
    cmd.arg("-crf").arg(config.intermediate_crf.to_string());
    cmd.args(["-pix_fmt", "yuv420p"]);
}

/// Builds the ffmpeg command rendering `plan` from `clip` into `output`.
pub fn build_render_command(
    plan: &SegmentPlan,
    clip: &VideoClip,
    output: &Path,
    config: &SyncConfig,
    strategy: Strategy,
) -> FfmpegCommand {
    let input = clip.path.to_string_lossy();
    let mut cmd = FfmpegCommand::new();
    cmd.hide_banner();
    cmd.overwrite();

    match (plan.fit, strategy) {
        (Fit::Trim { offset }, Strategy::Primary) => {
            // Input seek: fast, lands on the nearest keyframe before decoding
            cmd.arg("-ss").arg(format_seconds_arg(offset));
            cmd.input(input.as_ref());
            cmd.arg("-vf").arg(normalize_filter(config));
        }
        (Fit::Trim { offset }, Strategy::Fallback) => {
            // Decode seek: slower, frame accurate, tolerant of broken indexes
            cmd.input(input.as_ref());
            cmd.arg("-ss").arg(format_seconds_arg(offset));
            cmd.arg("-vf").arg(normalize_filter(config));
        }
        (Fit::Loop { repeats }, Strategy::Primary) => {
            cmd.arg("-stream_loop").arg(repeats.saturating_sub(1).to_string());
            cmd.input(input.as_ref());
            cmd.arg("-vf").arg(normalize_filter(config));
        }
        (Fit::Loop { repeats }, Strategy::Fallback) if repeats > MAX_LOOP_INPUTS => {
            cmd.args(["-stream_loop", "-1"]);
            cmd.input(input.as_ref());
            cmd.arg("-vf").arg(normalize_filter(config));
        }
        (Fit::Loop { repeats }, Strategy::Fallback) => {
            let copies = repeats.max(1) as usize;
            for _ in 0..copies {
                cmd.input(input.as_ref());
            }
            let labels: String = (0..copies).map(|i| format!("[{i}:v:0]")).collect();
            let graph = format!(
                "{labels}concat=n={copies}:v=1:a=0[joined];[joined]{}[v]",
                normalize_filter(config)
            );
            cmd.arg("-filter_complex").arg(graph);
            cmd.args(["-map", "[v]"]);
        }
    }

    add_video_output_args(&mut cmd, config, plan.duration);
    cmd.output(output.to_string_lossy().as_ref());
    cmd
}

fn run_render<S: FfmpegSpawner>(
    spawner: &S,
    plan: &SegmentPlan,
    clip: &VideoClip,
    output: &Path,
    config: &SyncConfig,
    strategy: Strategy,
) -> CoreResult<()> {
    let cmd = build_render_command(plan, clip, output, config, strategy);
    let label = format!("segment {} {strategy}", plan.index);
    let mut handler = FfmpegProgressHandler::new();
    let result = run_ffmpeg(spawner, cmd, &label, &mut handler).and_then(|()| {
        if output.is_file() {
            Ok(())
        } else {
            Err(CoreError::Render {
                index: plan.index,
                message: "ffmpeg reported success but wrote no file".to_string(),
            })
        }
    });
    if result.is_err() && output.exists() {
        // Leave no partial file behind for the fallback to trip over
        if let Err(e) = std::fs::remove_file(output) {
            log::debug!("Could not remove partial segment {}: {e}", output.display());
        }
    }
    result
}

/// Renders one segment, retrying once with the fallback strategy.
pub fn render_segment<S: FfmpegSpawner>(
    spawner: &S,
    plan: &SegmentPlan,
    clip: &VideoClip,
    work_dir: &Path,
    config: &SyncConfig,
) -> CoreResult<RenderedSegment> {
    let output = temp_files::create_temp_file_path(work_dir, &format!("segment_{:04}", plan.index), "mp4");
    log::debug!(
        "Segment {}: {:.3}s..{:.3}s from {} ({:?})",
        plan.index,
        plan.start,
        plan.end,
        clip.path.display(),
        plan.fit
    );

    let operation = format!("Rendering segment {}", plan.index);
    let ((), strategy) = with_fallback(
        &operation,
        || run_render(spawner, plan, clip, &output, config, Strategy::Primary),
        || run_render(spawner, plan, clip, &output, config, Strategy::Fallback),
    )
    .map_err(|e| CoreError::Render {
        index: plan.index,
        message: e.to_string(),
    })?;

    Ok(RenderedSegment {
        index: plan.index,
        path: output,
        duration: plan.duration,
        strategy,
    })
}

/// Renders every plan in order.
///
/// A segment whose both strategies fail is dropped. `on_segment_done(done, total)`
/// is called after each plan, whether it succeeded or not.
pub fn render_segments<S: FfmpegSpawner>(
    spawner: &S,
    plans: &[SegmentPlan],
    clips: &[VideoClip],
    work_dir: &Path,
    config: &SyncConfig,
    mut on_segment_done: impl FnMut(usize, usize),
) -> CoreResult<Vec<RenderedSegment>> {
    let mut rendered = Vec::with_capacity(plans.len());
    for (done, plan) in plans.iter().enumerate() {
        let clip = clips.get(plan.clip_index).ok_or_else(|| CoreError::Render {
            index: plan.index,
            message: format!("clip index {} out of range", plan.clip_index),
        })?;
        match render_segment(spawner, plan, clip, work_dir, config) {
            Ok(segment) => rendered.push(segment),
            Err(e) => log::warn!("Dropping segment {}: {e}", plan.index),
        }
        on_segment_done(done + 1, plans.len());
    }

    if rendered.is_empty() {
        return Err(CoreError::NoSegmentsProduced);
    }
    log::info!("Rendered {} of {} segments", rendered.len(), plans.len());
    Ok(rendered)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::external::ffmpeg_executor::command_args;

    fn clip(name: &str, duration: f64) -> VideoClip {
        VideoClip {
            path: PathBuf::from(name),
            duration,
            width: 1920,
            height: 1080,
        }
    }

    fn plan_for(clip_duration: f64, segment_duration: f64) -> SegmentPlan {
        SegmentPlan {
            index: 0,
            start: 0.0,
            end: segment_duration,
            duration: segment_duration,
            clip_index: 0,
            fit: plan_fit(clip_duration, segment_duration),
        }
    }

    fn arg_after(args: &[String], flag: &str) -> Option<String> {
        args.iter()
            .position(|a| a == flag)
            .and_then(|i| args.get(i + 1).cloned())
    }

    #[test]
    fn long_clip_is_trimmed_around_its_midpoint() {
        assert_eq!(plan_fit(10.0, 4.0), Fit::Trim { offset: 3.0 });
        assert_eq!(plan_fit(4.0, 4.0), Fit::Trim { offset: 0.0 });
    }

    #[test]
    fn short_clip_is_looped_enough_times() {
        assert_eq!(plan_fit(3.0, 7.0), Fit::Loop { repeats: 3 });
        assert_eq!(plan_fit(3.0, 6.0), Fit::Loop { repeats: 2 });
        assert_eq!(plan_fit(2.5, 2.6), Fit::Loop { repeats: 2 });
    }

    #[test]
    fn trim_commands_seek_to_offset_and_cut_to_length() {
        let config = SyncConfig::default();
        let plan = plan_for(10.0, 4.0);
        let c = clip("ten.mp4", 10.0);
        let out = Path::new("/tmp/seg.mp4");

        let primary = command_args(&build_render_command(&plan, &c, out, &config, Strategy::Primary));
        let ss = primary.iter().position(|a| a == "-ss").unwrap();
        let input = primary.iter().position(|a| a == "-i").unwrap();
        assert!(ss < input, "primary trim seeks on the input");
        assert_eq!(arg_after(&primary, "-ss").as_deref(), Some("3.000"));
        assert_eq!(arg_after(&primary, "-t").as_deref(), Some("4.000"));
        assert!(primary.contains(&"-an".to_string()));
        assert_eq!(primary.last().map(String::as_str), Some("/tmp/seg.mp4"));

        let fallback = command_args(&build_render_command(&plan, &c, out, &config, Strategy::Fallback));
        let ss = fallback.iter().position(|a| a == "-ss").unwrap();
        let input = fallback.iter().position(|a| a == "-i").unwrap();
        assert!(ss > input, "fallback trim seeks after decoding");
        assert_eq!(arg_after(&fallback, "-ss").as_deref(), Some("3.000"));
    }

    #[test]
    fn loop_commands_repeat_the_clip() {
        let config = SyncConfig::default();
        let plan = plan_for(3.0, 7.0);
        let c = clip("three.mp4", 3.0);
        let out = Path::new("/tmp/seg.mp4");

        let primary = command_args(&build_render_command(&plan, &c, out, &config, Strategy::Primary));
        assert_eq!(arg_after(&primary, "-stream_loop").as_deref(), Some("2"));
        assert_eq!(arg_after(&primary, "-t").as_deref(), Some("7.000"));

        let fallback = command_args(&build_render_command(&plan, &c, out, &config, Strategy::Fallback));
        assert_eq!(fallback.iter().filter(|a| *a == "-i").count(), 3);
        let graph = arg_after(&fallback, "-filter_complex").unwrap();
        assert!(graph.starts_with("[0:v:0][1:v:0][2:v:0]concat=n=3:v=1:a=0"));
        assert_eq!(arg_after(&fallback, "-t").as_deref(), Some("7.000"));
    }

    #[test]
    fn long_loop_fallback_does_not_open_one_input_per_repeat() {
        let config = SyncConfig::default();
        let plan = plan_for(0.5, 60.0);
        assert_eq!(plan.fit, Fit::Loop { repeats: 120 });
        let c = clip("blink.mp4", 0.5);

        let fallback = command_args(&build_render_command(
            &plan,
            &c,
            Path::new("/tmp/seg.mp4"),
            &config,
            Strategy::Fallback,
        ));
        assert_eq!(fallback.iter().filter(|a| *a == "-i").count(), 1);
        assert_eq!(arg_after(&fallback, "-stream_loop").as_deref(), Some("-1"));
        assert_eq!(arg_after(&fallback, "-t").as_deref(), Some("60.000"));
        assert!(!fallback.contains(&"-filter_complex".to_string()));

        let at_cap = plan_for(1.0, f64::from(MAX_LOOP_INPUTS));
        let args = command_args(&build_render_command(
            &at_cap,
            &clip("one.mp4", 1.0),
            Path::new("/tmp/seg.mp4"),
            &config,
            Strategy::Fallback,
        ));
        assert_eq!(args.iter().filter(|a| *a == "-i").count(), MAX_LOOP_INPUTS as usize);
    }

    #[test]
    fn every_segment_shares_the_target_format() {
        let config = SyncConfig::default();
        let filter = normalize_filter(&config);
        assert!(filter.starts_with("scale=1280:720:force_original_aspect_ratio=decrease"));
        assert!(filter.contains("pad=1280:720:(ow-iw)/2:(oh-ih)/2"));
        assert!(filter.ends_with("fps=60"));
    }

    #[test]
    fn plans_are_capped_at_clip_count_with_round_robin() {
        let timeline = TransitionTimeline::new(vec![0.0, 5.0, 12.0, 18.0, 25.0, 30.0], 30.0).unwrap();
        let clips: Vec<_> = (0..4).map(|i| clip(&format!("c{i}.mp4"), 10.0)).collect();
        let plans = plan_segments(&timeline, &clips);
        assert_eq!(plans.len(), 4);
        let picked: Vec<_> = plans.iter().map(|p| p.clip_index).collect();
        assert_eq!(picked, vec![0, 1, 2, 3]);
        assert_eq!(plans[3].end, 25.0);
        assert_eq!(plans[1].fit, Fit::Trim { offset: 1.5 });
    }

    #[test]
    fn each_segment_gets_its_own_clip_in_order() {
        let timeline = TransitionTimeline::new(vec![0.0, 2.0, 4.0, 6.0], 6.0).unwrap();
        let clips = vec![clip("a.mp4", 5.0), clip("b.mp4", 5.0), clip("c.mp4", 5.0)];
        let plans = plan_segments(&timeline, &clips);
        assert_eq!(plans.iter().map(|p| p.clip_index).collect::<Vec<_>>(), vec![0, 1, 2]);
        let total: f64 = plans.iter().map(|p| p.duration).sum();
        assert!((total - 6.0).abs() < 0.1);
    }
}
