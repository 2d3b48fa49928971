//! Hook extraction: beats that stand out in the onset envelope.

use serde::{Deserialize, Serialize};

/// A beat whose onset strength is above the sensitivity threshold.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Hook {
    /// Timestamp in seconds.
    pub time: f64,
    /// Normalized onset strength in [0, 1].
    pub strength: f32,
}

/// Selects hooks from `beat_frames` and orders them by strength, strongest first.
///
/// `normalized_envelope` must already be min-max normalized. A beat is a hook
/// when its strength exceeds `sensitivity * mean(normalized_envelope)`. Beats
/// whose frame index falls outside the envelope are skipped. Ties keep their
/// chronological order.
#[must_use]
pub fn extract_hooks(
    beat_frames: &[usize],
    beat_times: &[f64],
    normalized_envelope: &[f32],
    sensitivity: f32,
) -> Vec<Hook> {
    if normalized_envelope.is_empty() {
        return Vec::new();
    }
    let mean = normalized_envelope.iter().sum::<f32>() / normalized_envelope.len() as f32;
    let threshold = sensitivity * mean;

    let mut hooks: Vec<Hook> = beat_frames
        .iter()
        .zip(beat_times)
        .filter_map(|(&frame, &time)| {
            let strength = *normalized_envelope.get(frame)?;
            (strength > threshold).then_some(Hook { time, strength })
        })
        .collect();

    hooks.sort_by(|a, b| b.strength.total_cmp(&a.strength));
    hooks
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hooks_are_ordered_by_strength_not_time() {
        let envelope = [0.0, 0.2, 0.9, 0.1, 0.6, 1.0];
        let frames = [1, 2, 4, 5];
        let times = [1.0, 2.0, 4.0, 5.0];
        // mean = 2.8 / 6, threshold = 0.5 * mean ~= 0.233
        let hooks = extract_hooks(&frames, &times, &envelope, 0.5);
        let order: Vec<f64> = hooks.iter().map(|h| h.time).collect();
        assert_eq!(order, vec![5.0, 2.0, 4.0]);
    }

    #[test]
    fn flat_envelope_yields_no_hooks() {
        let envelope = [0.0; 8];
        let hooks = extract_hooks(&[1, 3, 5], &[0.5, 1.5, 2.5], &envelope, 0.5);
        assert!(hooks.is_empty());
    }

    #[test]
    fn out_of_range_frames_are_skipped() {
        let envelope = [0.0, 1.0];
        let hooks = extract_hooks(&[1, 7], &[0.1, 0.7], &envelope, 0.5);
        assert_eq!(hooks.len(), 1);
        assert_eq!(hooks[0].time, 0.1);
    }

    #[test]
    fn higher_sensitivity_is_stricter() {
        let envelope = [0.0, 0.3, 0.5, 1.0];
        let frames = [1, 2, 3];
        let times = [1.0, 2.0, 3.0];
        let loose = extract_hooks(&frames, &times, &envelope, 0.1);
        let strict = extract_hooks(&frames, &times, &envelope, 1.0);
        assert!(strict.len() <= loose.len());
        assert_eq!(loose.len(), 3);
    }

    #[test]
    fn equal_strengths_keep_chronological_order() {
        let envelope = [0.0, 1.0, 1.0, 1.0];
        let hooks = extract_hooks(&[1, 2, 3], &[1.0, 2.0, 3.0], &envelope, 0.5);
        let order: Vec<f64> = hooks.iter().map(|h| h.time).collect();
        assert_eq!(order, vec![1.0, 2.0, 3.0]);
    }
}
