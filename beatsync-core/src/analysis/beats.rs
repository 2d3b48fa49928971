//! Dynamic-programming beat tracker.
//!
//! Finds the sequence of onset-aligned frames that best matches a constant
//! beat period: each beat's score is its local onset strength plus the best
//! predecessor's cumulative score, penalized by how far the inter-beat
//! interval strays (in log scale) from the target period.

/// Penalty weight for deviating from the target period.
pub const TIGHTNESS: f64 = 100.0;

/// Returns beat frame indices (ascending) for `envelope` at `bpm`.
///
/// Weak beats at the start and end of the track are trimmed. An envelope
/// without energy yields no beats.
#[must_use]
pub fn track_beats(envelope: &[f32], frame_rate: f64, bpm: f64) -> Vec<usize> {
    if envelope.is_empty() || bpm <= 0.0 || frame_rate <= 0.0 {
        return Vec::new();
    }
    let values: Vec<f64> = envelope.iter().map(|&v| f64::from(v)).collect();
    let std = sample_std(&values);
    if std <= f64::EPSILON || values.iter().all(|&v| v <= 0.0) {
        return Vec::new();
    }
    let normalized: Vec<f64> = values.iter().map(|v| v / std).collect();

    let period = 60.0 * frame_rate / bpm;
    if period < 1.0 {
        return Vec::new();
    }
    let local = local_score(&normalized, period);
    let (backlink, cumscore) = beat_dp(&local, period, TIGHTNESS);

    let Some(tail) = last_beat(&cumscore) else {
        return Vec::new();
    };
    let mut beats = vec![tail];
    let mut current = tail;
    while let Some(prev) = backlink[current] {
        beats.push(prev);
        current = prev;
    }
    beats.reverse();
    trim_weak_beats(&local, beats)
}

fn sample_std(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let mean = values.iter().sum::<f64>() / values.len() as f64;
    let var = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (values.len() - 1) as f64;
    var.sqrt()
}

/// Onset envelope smoothed by a Gaussian of width proportional to `period`.
fn local_score(envelope: &[f64], period: f64) -> Vec<f64> {
    let half = period.round() as isize;
    let kernel: Vec<f64> = (-half..=half)
        .map(|k| (-0.5 * (k as f64 * 32.0 / period).powi(2)).exp())
        .collect();
    let len = envelope.len() as isize;
    (0..len)
        .map(|i| {
            kernel
                .iter()
                .enumerate()
                .filter_map(|(j, w)| {
                    let idx = i + j as isize - half;
                    (0..len).contains(&idx).then(|| w * envelope[idx as usize])
                })
                .sum()
        })
        .collect()
}

/// Forward pass. Returns the best predecessor of each frame and its cumulative score.
fn beat_dp(local: &[f64], period: f64, tightness: f64) -> (Vec<Option<usize>>, Vec<f64>) {
    let n = local.len();
    let mut backlink = vec![None; n];
    let mut cumscore = vec![0.0f64; n];

    // Candidate predecessors lie between 2 periods and half a period back
    let far = (2.0 * period).round() as usize;
    let near = ((period / 2.0).round() as usize).max(1);
    let offsets: Vec<usize> = (near..=far.max(near)).collect();
    let penalty: Vec<f64> = offsets
        .iter()
        .map(|&d| -tightness * (d as f64 / period).ln().powi(2))
        .collect();

    let max_local = local.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let mut first_beat = true;

    for i in 0..n {
        // Predecessors before the start of the track contribute only their penalty
        let mut best_score = f64::NEG_INFINITY;
        let mut best_prev = None;
        for (&d, &pen) in offsets.iter().zip(&penalty) {
            let (score, prev) = match i.checked_sub(d) {
                Some(p) => (pen + cumscore[p], Some(p)),
                None => (pen, None),
            };
            if score > best_score {
                best_score = score;
                best_prev = prev;
            }
        }
        if !best_score.is_finite() {
            best_score = 0.0;
        }
        cumscore[i] = local[i] + best_score;

        if first_beat && local[i] < 0.01 * max_local {
            backlink[i] = None;
        } else {
            backlink[i] = best_prev;
            first_beat = false;
        }
    }
    (backlink, cumscore)
}

/// Last local maximum of the cumulative score that is strong relative to the others.
fn last_beat(cumscore: &[f64]) -> Option<usize> {
    let n = cumscore.len();
    let is_max = |i: usize| {
        let left = i == 0 || cumscore[i] > cumscore[i - 1];
        let right = i + 1 == n || cumscore[i] >= cumscore[i + 1];
        left && right
    };
    let mut maxima: Vec<f64> = (0..n).filter(|&i| is_max(i)).map(|i| cumscore[i]).collect();
    if maxima.is_empty() {
        return None;
    }
    maxima.sort_by(f64::total_cmp);
    let median = if maxima.len() % 2 == 1 {
        maxima[maxima.len() / 2]
    } else {
        0.5 * (maxima[maxima.len() / 2 - 1] + maxima[maxima.len() / 2])
    };
    (0..n).rev().find(|&i| is_max(i) && 2.0 * cumscore[i] > median)
}

/// Drops leading and trailing beats whose smoothed onset strength is weak.
fn trim_weak_beats(local: &[f64], beats: Vec<usize>) -> Vec<usize> {
    if beats.is_empty() {
        return beats;
    }
    let raw: Vec<f64> = beats.iter().map(|&b| local[b]).collect();
    // Smooth with a 5-tap Hann kernel
    let kernel = [0.0, 0.5, 1.0, 0.5, 0.0];
    let smooth: Vec<f64> = (0..raw.len() as isize)
        .map(|i| {
            kernel
                .iter()
                .enumerate()
                .filter_map(|(j, w)| {
                    let idx = i + j as isize - 2;
                    (0..raw.len() as isize).contains(&idx).then(|| w * raw[idx as usize])
                })
                .sum()
        })
        .collect();
    let rms = (smooth.iter().map(|v| v * v).sum::<f64>() / smooth.len() as f64).sqrt();
    let threshold = 0.5 * rms;

    let Some(first) = smooth.iter().position(|&v| v > threshold) else {
        return Vec::new();
    };
    let last = smooth.iter().rposition(|&v| v > threshold).unwrap_or(first);
    beats[first..=last].to_vec()
}

/// Converts beat frames to timestamps in seconds.
#[must_use]
pub fn frames_to_times(frames: &[usize], hop_length: usize, sample_rate: u32) -> Vec<f64> {
    frames
        .iter()
        .map(|&f| (f * hop_length) as f64 / f64::from(sample_rate))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pulse_envelope(len: usize, period: usize, offset: usize) -> Vec<f32> {
        (0..len)
            .map(|i| if i >= offset && (i - offset) % period == 0 { 1.0 } else { 0.05 })
            .collect()
    }

    #[test]
    fn beats_follow_regular_pulses() {
        let frame_rate = 22050.0 / 512.0;
        let period = 22;
        let env = pulse_envelope(660, period, 5);
        let bpm = 60.0 * frame_rate / period as f64;
        let beats = track_beats(&env, frame_rate, bpm);

        assert!(beats.len() >= 25, "found {} beats", beats.len());
        assert!(beats.windows(2).all(|w| w[1] > w[0]));
        for w in beats.windows(2) {
            assert_eq!(w[1] - w[0], period);
        }
        assert!(beats.iter().all(|&b| b >= 5 && (b - 5) % period == 0));
    }

    #[test]
    fn empty_or_flat_envelope_has_no_beats() {
        assert!(track_beats(&[], 43.0, 120.0).is_empty());
        assert!(track_beats(&vec![0.0; 200], 43.0, 120.0).is_empty());
        assert!(track_beats(&vec![1.0; 200], 43.0, 120.0).is_empty());
    }

    #[test]
    fn frames_convert_to_seconds() {
        let times = frames_to_times(&[0, 43, 86], 512, 22050);
        assert_eq!(times[0], 0.0);
        assert!((times[1] - 0.998).abs() < 1e-3);
    }
}
