//! Final assembly of rendered segments.
//!
//! This module joins the rendered segments in index order, measures the
//! result against the music, attaches the music track and encodes the output.
//! The encode writes to a hidden temporary file next to the output path and
//! is only renamed onto the output path after ffmpeg succeeds, so a failed or
//! interrupted run never leaves a partial file at the output path.

use crate::config::SyncConfig;
use crate::error::{CoreError, CoreResult};
use crate::external::{FfmpegProgressHandler, FfmpegSpawner, FfprobeExecutor, run_ffmpeg};
use crate::processing::render::RenderedSegment;
use crate::processing::retry::{Strategy, with_fallback};
use crate::temp_files;
use crate::utils::format_seconds_arg;
use ffmpeg_sidecar::command::FfmpegCommand;
use std::cell::RefCell;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

/// Outcome of a successful assembly.
#[derive(Debug, Clone, PartialEq)]
pub struct AssemblyReport {
    pub output_path: PathBuf,
    /// Duration of the joined segments before the final encode.
    pub assembled_duration: f64,
    pub drift_corrected: bool,
    pub concat_strategy: Strategy,
    pub encode_strategy: Strategy,
}

/// Frame rate and thread limit of a final encode attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EncodeProfile {
    pub fps: u32,
    pub threads: Option<u32>,
}

impl EncodeProfile {
    #[must_use]
    pub fn primary(config: &SyncConfig) -> Self {
        Self {
            fps: config.fps,
            threads: None,
        }
    }

    #[must_use]
    pub fn fallback(config: &SyncConfig) -> Self {
        Self {
            fps: config.fallback_fps,
            threads: Some(config.fallback_threads),
        }
    }
}

// ---- Concatenation ----

/// Escapes a path for a concat demuxer list entry.
fn concat_list_entry(path: &Path) -> String {
    let escaped = path.to_string_lossy().replace('\'', r"'\''");
    format!("file '{escaped}'")
}

/// Writes the concat demuxer list for `segments` into `work_dir`.
pub fn write_concat_list(segments: &[RenderedSegment], work_dir: &Path) -> CoreResult<PathBuf> {
    let list_path = work_dir.join("concat_list.txt");
    let mut writer = BufWriter::new(File::create(&list_path)?);
    for segment in segments {
        let absolute = std::path::absolute(&segment.path)?;
        writeln!(writer, "{}", concat_list_entry(&absolute))?;
    }
    writer.flush()?;
    Ok(list_path)
}

/// Stream-copy concatenation through the concat demuxer.
pub fn build_concat_demuxer_command(list_path: &Path, output: &Path) -> FfmpegCommand {
    let mut cmd = FfmpegCommand::new();
    cmd.hide_banner();
    cmd.overwrite();
    cmd.args(["-f", "concat", "-safe", "0"]);
    cmd.input(list_path.to_string_lossy().as_ref());
    cmd.args(["-c", "copy", "-fflags", "+genpts"]);
    cmd.output(output.to_string_lossy().as_ref());
    cmd
}

/// Re-encoding concatenation through the concat filter.
pub fn build_concat_filter_command(
    segments: &[RenderedSegment],
    output: &Path,
    config: &SyncConfig,
) -> FfmpegCommand {
    let mut cmd = FfmpegCommand::new();
    cmd.hide_banner();
    cmd.overwrite();
    for segment in segments {
        cmd.input(segment.path.to_string_lossy().as_ref());
    }
    let labels: String = (0..segments.len()).map(|i| format!("[{i}:v:0]")).collect();
    cmd.arg("-filter_complex")
        .arg(format!("{labels}concat=n={}:v=1:a=0[v]", segments.len()));
    cmd.args(["-map", "[v]", "-an"]);
    cmd.args(["-c:v", config.video_codec.as_str()]);
    cmd.args(["-preset", config.preset.as_str()]);
    cmd.arg("-crf").arg(config.intermediate_crf.to_string());
    cmd.args(["-pix_fmt", "yuv420p"]);
    cmd.output(output.to_string_lossy().as_ref());
    cmd
}

fn run_to_file<S: FfmpegSpawner>(spawner: &S, cmd: FfmpegCommand, label: &str, output: &Path) -> CoreResult<()> {
    let mut handler = FfmpegProgressHandler::new();
    run_ffmpeg(spawner, cmd, label, &mut handler)?;
    if output.is_file() {
        Ok(())
    } else {
        Err(CoreError::Concat(format!("{label} wrote no output file")))
    }
}

/// Joins `segments` in index order into one video in `work_dir`.
pub fn concat_segments<S: FfmpegSpawner>(
    spawner: &S,
    segments: &[RenderedSegment],
    work_dir: &Path,
    config: &SyncConfig,
) -> CoreResult<(PathBuf, Strategy)> {
    if segments.is_empty() {
        return Err(CoreError::NoSegmentsProduced);
    }
    let mut ordered = segments.to_vec();
    ordered.sort_by_key(|s| s.index);

    let output = work_dir.join("assembled.mp4");
    let list_path = write_concat_list(&ordered, work_dir)?;
    let (_, strategy) = with_fallback(
        "Concatenating segments",
        || {
            let cmd = build_concat_demuxer_command(&list_path, &output);
            run_to_file(spawner, cmd, "concat demuxer", &output)
        },
        || {
            let cmd = build_concat_filter_command(&ordered, &output, config);
            run_to_file(spawner, cmd, "concat filter", &output)
        },
    )
    .map_err(|e| CoreError::Concat(e.to_string()))?;

    log::info!("Joined {} segments ({strategy} strategy)", ordered.len());
    Ok((output, strategy))
}

// ---- Duration and drift ----

/// Duration of `assembled` as reported by ffprobe, or `expected` when probing fails.
pub fn measure_duration<P: FfprobeExecutor>(prober: &P, assembled: &Path, expected: f64) -> f64 {
    match prober.probe(assembled) {
        Ok(info) => match info.duration.filter(|d| d.is_finite() && *d > 0.0) {
            Some(duration) => duration,
            None => {
                log::warn!("Assembled video reports no duration, assuming {expected:.3}s");
                expected
            }
        },
        Err(e) => {
            log::warn!("Could not probe assembled video ({e}), assuming {expected:.3}s");
            expected
        }
    }
}

/// True when the assembled video and the music differ by more than `tolerance` seconds.
#[must_use]
pub fn needs_drift_correction(assembled_duration: f64, music_duration: f64, tolerance: f64) -> bool {
    (assembled_duration - music_duration).abs() > tolerance
}

// ---- Final encode ----

/// Builds the final encode: video from `video`, audio from `music`, H.264/AAC.
///
/// `limit` caps the output duration (drift correction).
pub fn build_final_encode_command(
    video: &Path,
    music: &Path,
    output: &Path,
    config: &SyncConfig,
    profile: EncodeProfile,
    limit: Option<f64>,
) -> FfmpegCommand {
    let mut cmd = FfmpegCommand::new();
    cmd.hide_banner();
    cmd.overwrite();
    cmd.input(video.to_string_lossy().as_ref());
    cmd.input(music.to_string_lossy().as_ref());
    cmd.args(["-map", "0:v:0", "-map", "1:a:0"]);
    cmd.args(["-c:v", config.video_codec.as_str()]);
    cmd.args(["-preset", config.preset.as_str()]);
    cmd.arg("-crf").arg(config.crf.to_string());
    cmd.args(["-pix_fmt", "yuv420p"]);
    cmd.arg("-r").arg(profile.fps.to_string());
    if let Some(threads) = profile.threads {
        cmd.arg("-threads").arg(threads.to_string());
    }
    cmd.args(["-c:a", config.audio_codec.as_str()]);
    cmd.args(["-b:a", config.audio_bitrate.as_str()]);
    if let Some(limit) = limit {
        cmd.arg("-t").arg(format_seconds_arg(limit));
    }
    cmd.args(["-movflags", "+faststart"]);
    cmd.output(output.to_string_lossy().as_ref());
    cmd
}

/// Encodes `video` + `music` to `output`, retrying once with the fallback profile.
///
/// `on_fraction` receives encode progress in [0, 1].
#[allow(clippy::too_many_arguments)]
pub fn encode_final<S: FfmpegSpawner>(
    spawner: &S,
    video: &Path,
    music: &Path,
    output: &Path,
    config: &SyncConfig,
    limit: Option<f64>,
    expected_duration: f64,
    on_fraction: &mut dyn FnMut(f64),
) -> CoreResult<Strategy> {
    let parent = match output.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => PathBuf::from("."),
    };
    let extension = output
        .extension()
        .map_or_else(|| "mp4".to_string(), |e| e.to_string_lossy().into_owned());
    let staging = temp_files::create_temp_file(&parent, ".beatsync_encode", &extension)?;

    let attempt = |profile: EncodeProfile, on_fraction: &mut dyn FnMut(f64)| -> CoreResult<()> {
        let cmd = build_final_encode_command(video, music, staging.path(), config, profile, limit);
        let label = format!("final encode {}fps", profile.fps);
        let mut handler = FfmpegProgressHandler::with_progress(expected_duration, |f| on_fraction(f));
        run_ffmpeg(spawner, cmd, &label, &mut handler)
    };

    // Both attempts report through the same callback
    let on_fraction_cell = RefCell::new(on_fraction);
    let (_, strategy) = with_fallback(
        "Final encode",
        || attempt(EncodeProfile::primary(config), &mut **on_fraction_cell.borrow_mut()),
        || attempt(EncodeProfile::fallback(config), &mut **on_fraction_cell.borrow_mut()),
    )
    .map_err(|e| CoreError::Encode(e.to_string()))?;

    let written = std::fs::metadata(staging.path()).map(|m| m.len()).unwrap_or(0);
    if written == 0 {
        return Err(CoreError::Encode("encoder produced an empty file".to_string()));
    }

    staging
        .persist(output)
        .map_err(|e| CoreError::Io(e.error))?;
    log::info!("Wrote {} ({strategy} encode)", output.display());
    Ok(strategy)
}

/// Joins, measures, attaches the music and encodes the final output.
#[allow(clippy::too_many_arguments)]
pub fn assemble<S: FfmpegSpawner, P: FfprobeExecutor>(
    spawner: &S,
    prober: &P,
    segments: &[RenderedSegment],
    music_path: &Path,
    music_duration: f64,
    output_path: &Path,
    work_dir: &Path,
    config: &SyncConfig,
    on_encode_fraction: &mut dyn FnMut(f64),
) -> CoreResult<AssemblyReport> {
    let (assembled, concat_strategy) = concat_segments(spawner, segments, work_dir, config)?;

    let expected: f64 = segments.iter().map(|s| s.duration).sum();
    let assembled_duration = measure_duration(prober, &assembled, expected);
    let drift_corrected = needs_drift_correction(assembled_duration, music_duration, config.drift_tolerance);
    if drift_corrected {
        log::info!(
            "Assembled video is {assembled_duration:.3}s, music is {music_duration:.3}s; limiting output to the music duration"
        );
    }
    let limit = drift_corrected.then_some(music_duration);

    let encode_strategy = encode_final(
        spawner,
        &assembled,
        music_path,
        output_path,
        config,
        limit,
        music_duration.max(assembled_duration),
        on_encode_fraction,
    )?;

    Ok(AssemblyReport {
        output_path: output_path.to_path_buf(),
        assembled_duration,
        drift_corrected,
        concat_strategy,
        encode_strategy,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::external::ffmpeg_executor::command_args;

    fn segment(index: usize, path: &str) -> RenderedSegment {
        RenderedSegment {
            index,
            path: PathBuf::from(path),
            duration: 5.0,
            strategy: Strategy::Primary,
        }
    }

    #[test]
    fn concat_list_escapes_quotes() {
        assert_eq!(
            concat_list_entry(Path::new("/tmp/it's.mp4")),
            r"file '/tmp/it'\''s.mp4'"
        );
    }

    #[test]
    fn concat_list_is_written_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let a = dir.path().join("a.mp4");
        let b = dir.path().join("b.mp4");
        let list = write_concat_list(
            &[segment(0, a.to_str().unwrap()), segment(1, b.to_str().unwrap())],
            dir.path(),
        )
        .unwrap();
        let contents = std::fs::read_to_string(list).unwrap();
        let lines: Vec<_> = contents.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].ends_with("a.mp4'"));
        assert!(lines[1].ends_with("b.mp4'"));
    }

    #[test]
    fn demuxer_concat_copies_streams() {
        let args = command_args(&build_concat_demuxer_command(Path::new("list.txt"), Path::new("out.mp4")));
        let joined = args.join(" ");
        assert!(joined.contains("-f concat -safe 0 -i list.txt"));
        assert!(joined.contains("-c copy"));
    }

    #[test]
    fn filter_concat_reencodes_all_inputs() {
        let config = SyncConfig::default();
        let segs = [segment(0, "a.mp4"), segment(1, "b.mp4"), segment(2, "c.mp4")];
        let args = command_args(&build_concat_filter_command(&segs, Path::new("out.mp4"), &config));
        assert_eq!(args.iter().filter(|a| *a == "-i").count(), 3);
        assert!(args.iter().any(|a| a == "[0:v:0][1:v:0][2:v:0]concat=n=3:v=1:a=0[v]"));
        assert!(args.iter().any(|a| a == "libx264"));
    }

    #[test]
    fn drift_threshold_is_strict() {
        assert!(!needs_drift_correction(30.05, 30.0, 0.1));
        assert!(!needs_drift_correction(30.0, 30.0, 0.1));
        assert!(needs_drift_correction(25.0, 30.0, 0.1));
        assert!(needs_drift_correction(30.2, 30.0, 0.1));
    }

    #[test]
    fn final_encode_maps_video_and_music_audio() {
        let config = SyncConfig::default();
        let args = command_args(&build_final_encode_command(
            Path::new("joined.mp4"),
            Path::new("song.mp3"),
            Path::new("out.mp4"),
            &config,
            EncodeProfile::primary(&config),
            Some(30.0),
        ));
        let joined = args.join(" ");
        assert!(joined.contains("-i joined.mp4 -i song.mp3"));
        assert!(joined.contains("-map 0:v:0 -map 1:a:0"));
        assert!(joined.contains("-c:v libx264"));
        assert!(joined.contains("-c:a aac"));
        assert!(joined.contains("-r 60"));
        assert!(joined.contains("-t 30.000"));
        assert!(!joined.contains("-threads"));
    }

    #[test]
    fn fallback_profile_lowers_fps_and_threads() {
        let config = SyncConfig::default();
        let args = command_args(&build_final_encode_command(
            Path::new("joined.mp4"),
            Path::new("song.mp3"),
            Path::new("out.mp4"),
            &config,
            EncodeProfile::fallback(&config),
            None,
        ));
        let joined = args.join(" ");
        assert!(joined.contains("-r 24"));
        assert!(joined.contains("-threads 1"));
        assert!(!joined.contains("-t "));
    }
}
