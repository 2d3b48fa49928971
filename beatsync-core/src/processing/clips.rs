//! Clip loading: probe every candidate and keep the usable ones.

use crate::error::{CoreError, CoreResult};
use crate::external::FfprobeExecutor;
use std::path::{Path, PathBuf};

/// A source clip that passed probing.
#[derive(Debug, Clone, PartialEq)]
pub struct VideoClip {
    pub path: PathBuf,
    /// Duration in seconds, always > 0.
    pub duration: f64,
    pub width: u32,
    pub height: u32,
}

/// Probes one path. Returns the reason when the clip is unusable.
fn probe_clip<P: FfprobeExecutor>(prober: &P, path: &Path) -> Result<VideoClip, String> {
    let info = prober.probe(path).map_err(|e| e.to_string())?;
    if !info.has_video {
        return Err("no video stream".to_string());
    }
    let duration = info.duration.unwrap_or(0.0);
    if !duration.is_finite() || duration <= 0.0 {
        return Err(format!("non-positive duration ({duration})"));
    }
    let dimension = |v: Option<i64>| v.and_then(|d| u32::try_from(d).ok()).unwrap_or(0);
    Ok(VideoClip {
        path: path.to_path_buf(),
        duration,
        width: dimension(info.width),
        height: dimension(info.height),
    })
}

/// Probes every path in order and returns the clips that can be used.
///
/// Unusable clips are logged and skipped. Fails with
/// [`CoreError::NoValidClips`] when none remain.
pub fn load_clips<P: FfprobeExecutor>(prober: &P, paths: &[PathBuf]) -> CoreResult<Vec<VideoClip>> {
    let mut clips = Vec::with_capacity(paths.len());
    for path in paths {
        match probe_clip(prober, path) {
            Ok(clip) => {
                log::debug!(
                    "Loaded clip {} ({:.2}s, {}x{})",
                    path.display(),
                    clip.duration,
                    clip.width,
                    clip.height
                );
                clips.push(clip);
            }
            Err(reason) => log::warn!("Skipping clip {}: {reason}", path.display()),
        }
    }

    if clips.is_empty() {
        return Err(CoreError::NoValidClips);
    }
    log::info!("Loaded {} of {} clips", clips.len(), paths.len());
    Ok(clips)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::external::MediaInfo;
    use crate::external::mocks::MockFfprobeExecutor;

    #[test]
    fn unusable_clips_are_dropped_and_order_kept() {
        let prober = MockFfprobeExecutor::new();
        let good_a = PathBuf::from("a.mp4");
        let broken = PathBuf::from("broken.mp4");
        let empty = PathBuf::from("empty.mp4");
        let audio_only = PathBuf::from("song.m4a");
        let good_b = PathBuf::from("b.mp4");
        prober.expect_media_info(&good_a, MockFfprobeExecutor::video_info(4.0));
        prober.expect_error(&broken, "moov atom not found");
        prober.expect_media_info(&empty, MockFfprobeExecutor::video_info(0.0));
        prober.expect_media_info(
            &audio_only,
            MediaInfo {
                duration: Some(30.0),
                has_audio: true,
                ..MediaInfo::default()
            },
        );
        prober.expect_media_info(&good_b, MockFfprobeExecutor::video_info(6.5));

        let clips = load_clips(
            &prober,
            &[good_a.clone(), broken, empty, audio_only, good_b.clone()],
        )
        .unwrap();
        let paths: Vec<_> = clips.iter().map(|c| c.path.clone()).collect();
        assert_eq!(paths, vec![good_a, good_b]);
        assert_eq!(clips[1].duration, 6.5);
        assert_eq!((clips[0].width, clips[0].height), (1280, 720));
    }

    #[test]
    fn all_invalid_is_an_error() {
        let prober = MockFfprobeExecutor::new();
        let path = PathBuf::from("broken.mp4");
        prober.expect_error(&path, "invalid data");
        assert!(matches!(load_clips(&prober, &[path]), Err(CoreError::NoValidClips)));
        assert!(matches!(load_clips(&prober, &[]), Err(CoreError::NoValidClips)));
    }
}
