//! Partitioning of the music timeline into segments.
//!
//! When there are at least as many hooks as clips, the strongest hooks
//! become cut points; otherwise the timeline is split into equal parts.

use crate::error::{CoreError, CoreResult};

/// Boundary comparison tolerance in seconds.
pub const BOUNDARY_EPSILON: f64 = 1e-6;

/// Ordered cut points over `[0, music_duration]`.
///
/// Always starts at 0, ends at the music duration and is strictly increasing.
#[derive(Debug, Clone, PartialEq)]
pub struct TransitionTimeline {
    boundaries: Vec<f64>,
}

impl TransitionTimeline {
    /// Validates and wraps `boundaries`.
    pub fn new(boundaries: Vec<f64>, music_duration: f64) -> CoreResult<Self> {
        if boundaries.len() < 2 {
            return Err(CoreError::InvalidTimeline(format!(
                "need at least two boundaries, got {}",
                boundaries.len()
            )));
        }
        if boundaries[0].abs() > BOUNDARY_EPSILON {
            return Err(CoreError::InvalidTimeline(format!(
                "first boundary is {} instead of 0",
                boundaries[0]
            )));
        }
        let last = boundaries[boundaries.len() - 1];
        if (last - music_duration).abs() > BOUNDARY_EPSILON {
            return Err(CoreError::InvalidTimeline(format!(
                "last boundary is {last} instead of {music_duration}"
            )));
        }
        if let Some(w) = boundaries.windows(2).find(|w| w[1] <= w[0]) {
            return Err(CoreError::InvalidTimeline(format!(
                "boundaries not strictly increasing at {} -> {}",
                w[0], w[1]
            )));
        }
        Ok(Self { boundaries })
    }

    #[must_use]
    pub fn boundaries(&self) -> &[f64] {
        &self.boundaries
    }

    #[must_use]
    pub fn num_segments(&self) -> usize {
        self.boundaries.len() - 1
    }

    /// `(start, end)` of every segment in order.
    pub fn segments(&self) -> impl Iterator<Item = (f64, f64)> + '_ {
        self.boundaries.windows(2).map(|w| (w[0], w[1]))
    }

    #[must_use]
    pub fn music_duration(&self) -> f64 {
        self.boundaries[self.boundaries.len() - 1]
    }
}

/// Builds the timeline for `num_clips` clips from strength-ordered `hooks`.
pub fn segment(hooks: &[f64], num_clips: usize, music_duration: f64) -> CoreResult<TransitionTimeline> {
    if num_clips == 0 {
        return Err(CoreError::InvalidTimeline("no clips to segment for".into()));
    }
    if !music_duration.is_finite() || music_duration <= 0.0 {
        return Err(CoreError::InvalidTimeline(format!(
            "music duration must be positive, got {music_duration}"
        )));
    }

    if hooks.len() >= num_clips {
        log::info!("Segmenting on the {num_clips} strongest of {} hooks", hooks.len());
        hook_boundaries(&hooks[..num_clips], music_duration)
    } else {
        log::info!(
            "Only {} hooks for {num_clips} clips, using uniform segments",
            hooks.len()
        );
        uniform_boundaries(num_clips, music_duration)
    }
}

fn hook_boundaries(selected: &[f64], music_duration: f64) -> CoreResult<TransitionTimeline> {
    let mut points: Vec<f64> = selected
        .iter()
        .copied()
        .filter(|&t| {
            let inside = t.is_finite() && t >= 0.0 && t <= music_duration + BOUNDARY_EPSILON;
            if !inside {
                log::warn!("Ignoring hook at {t:.3}s outside the track");
            }
            inside
        })
        .map(|t| t.min(music_duration))
        .collect();
    points.sort_by(f64::total_cmp);
    points.dedup_by(|a, b| (*a - *b).abs() <= BOUNDARY_EPSILON);

    if points.first().is_none_or(|&first| first > BOUNDARY_EPSILON) {
        points.insert(0, 0.0);
    } else {
        points[0] = 0.0;
    }
    let last = points.len() - 1;
    if points[last] < music_duration - BOUNDARY_EPSILON {
        points.push(music_duration);
    } else {
        points[last] = music_duration;
    }
    TransitionTimeline::new(points, music_duration)
}

fn uniform_boundaries(num_clips: usize, music_duration: f64) -> CoreResult<TransitionTimeline> {
    let step = music_duration / num_clips as f64;
    let mut points: Vec<f64> = (0..num_clips).map(|i| i as f64 * step).collect();
    points.push(music_duration);
    TransitionTimeline::new(points, music_duration)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hooks_become_sorted_boundaries() {
        let timeline = segment(&[18.0, 5.0, 25.0, 12.0], 4, 30.0).unwrap();
        assert_eq!(timeline.boundaries(), &[0.0, 5.0, 12.0, 18.0, 25.0, 30.0]);
        assert_eq!(timeline.num_segments(), 5);
    }

    #[test]
    fn only_strongest_hooks_are_used() {
        // Strength order: 9, 3, 20, then weaker ones
        let timeline = segment(&[9.0, 3.0, 20.0, 1.0, 15.0], 3, 24.0).unwrap();
        assert_eq!(timeline.boundaries(), &[0.0, 3.0, 9.0, 20.0, 24.0]);
    }

    #[test]
    fn hooks_at_the_edges_are_not_duplicated() {
        let timeline = segment(&[0.0, 10.0, 30.0], 3, 30.0).unwrap();
        assert_eq!(timeline.boundaries(), &[0.0, 10.0, 30.0]);
        assert_eq!(timeline.num_segments(), 2);
    }

    #[test]
    fn too_few_hooks_fall_back_to_uniform() {
        let timeline = segment(&[7.0], 4, 30.0).unwrap();
        assert_eq!(timeline.num_segments(), 4);
        for (start, end) in timeline.segments() {
            assert!((end - start - 7.5).abs() < 1e-9);
        }
        assert_eq!(timeline.boundaries().last(), Some(&30.0));
    }

    #[test]
    fn boundaries_always_cover_the_track() {
        let cases: [(&[f64], usize, f64); 4] = [
            (&[], 1, 12.3),
            (&[1.1, 0.4], 2, 9.0),
            (&[3.0, 3.0, 5.0], 3, 6.0),
            (&[2.0, 4.0, 6.0], 5, 13.7),
        ];
        for (hooks, clips, duration) in cases {
            let timeline = segment(hooks, clips, duration).unwrap();
            let b = timeline.boundaries();
            assert!(b[0].abs() < BOUNDARY_EPSILON);
            assert!((b[b.len() - 1] - duration).abs() < BOUNDARY_EPSILON);
            assert!(b.windows(2).all(|w| w[1] > w[0]));
        }
    }

    #[test]
    fn invalid_inputs_are_rejected() {
        assert!(segment(&[1.0], 0, 10.0).is_err());
        assert!(segment(&[], 2, 0.0).is_err());
        assert!(TransitionTimeline::new(vec![0.0, 5.0, 5.0, 10.0], 10.0).is_err());
        assert!(TransitionTimeline::new(vec![1.0, 10.0], 10.0).is_err());
    }
}
