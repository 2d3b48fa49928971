//! Duration check between the clip pool and the music track.

use crate::error::{CoreError, CoreResult};
use crate::processing::clips::VideoClip;

/// Total unlooped duration of `clips` in seconds.
#[must_use]
pub fn total_duration(clips: &[VideoClip]) -> f64 {
    clips.iter().map(|c| c.duration).sum()
}

/// Fails with [`CoreError::InsufficientClipDuration`] when the clips together
/// are shorter than the music.
pub fn validate_clip_durations(clips: &[VideoClip], music_duration: f64) -> CoreResult<()> {
    let available = total_duration(clips);
    if available < music_duration {
        log::error!(
            "Clips provide {available:.2}s of footage but the music is {music_duration:.2}s long"
        );
        return Err(CoreError::InsufficientClipDuration {
            required: music_duration,
            available,
        });
    }
    log::debug!("Clip pool {available:.2}s covers music {music_duration:.2}s");
    Ok(())
}
