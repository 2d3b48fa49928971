//! Global tempo estimation from the onset envelope.

/// Tempo the prior is centered on, in BPM.
pub const START_BPM: f64 = 120.0;
/// Spread of the log-normal prior, in octaves.
const STD_OCTAVES: f64 = 1.0;
const MIN_BPM: f64 = 30.0;
const MAX_BPM: f64 = 300.0;

/// Log-normal weight of a tempo candidate around [`START_BPM`].
fn tempo_prior(bpm: f64) -> f64 {
    let octaves = (bpm / START_BPM).log2() / STD_OCTAVES;
    (-0.5 * octaves * octaves).exp()
}

/// Estimates the tempo of `envelope` in BPM.
///
/// Autocorrelates the envelope for lags between 300 and 30 BPM, weights each
/// lag by a tempo prior and refines the winning lag by parabolic
/// interpolation. Returns [`START_BPM`] when the envelope carries no energy.
#[must_use]
pub fn estimate_tempo(envelope: &[f32], frame_rate: f64) -> f64 {
    if envelope.len() < 4 || frame_rate <= 0.0 {
        return START_BPM;
    }
    let mean = envelope.iter().map(|&v| f64::from(v)).sum::<f64>() / envelope.len() as f64;
    let centered: Vec<f64> = envelope.iter().map(|&v| f64::from(v) - mean).collect();

    let min_lag = ((60.0 * frame_rate / MAX_BPM).floor() as usize).max(1);
    let max_lag = ((60.0 * frame_rate / MIN_BPM).ceil() as usize).min(centered.len() - 2);
    if min_lag + 1 >= max_lag {
        return START_BPM;
    }

    let autocorr = |lag: usize| -> f64 {
        centered
            .iter()
            .zip(&centered[lag..])
            .map(|(a, b)| a * b)
            .sum::<f64>()
    };
    let scores: Vec<f64> = (min_lag..=max_lag)
        .map(|lag| autocorr(lag).max(0.0) * tempo_prior(60.0 * frame_rate / lag as f64))
        .collect();

    let Some((best_idx, &best)) = scores
        .iter()
        .enumerate()
        .max_by(|a, b| a.1.total_cmp(b.1))
    else {
        return START_BPM;
    };
    if best <= 0.0 {
        return START_BPM;
    }

    let mut lag = (min_lag + best_idx) as f64;
    if best_idx > 0 && best_idx + 1 < scores.len() {
        let (l, c, r) = (scores[best_idx - 1], best, scores[best_idx + 1]);
        let denom = l - 2.0 * c + r;
        if denom.abs() > f64::EPSILON {
            lag += (0.5 * (l - r) / denom).clamp(-0.5, 0.5);
        }
    }
    60.0 * frame_rate / lag
}

#[cfg(test)]
mod tests {
    use super::*;

    fn impulse_train(len: usize, period: usize) -> Vec<f32> {
        (0..len).map(|i| if i % period == 0 { 1.0 } else { 0.0 }).collect()
    }

    #[test]
    fn impulse_train_period_is_recovered() {
        let frame_rate = 22050.0 / 512.0;
        let bpm = estimate_tempo(&impulse_train(1000, 22), frame_rate);
        let expected = 60.0 * frame_rate / 22.0;
        assert!((bpm - expected).abs() < 3.0, "bpm {bpm}, expected {expected}");
    }

    #[test]
    fn prior_prefers_tempo_near_center() {
        assert!(tempo_prior(120.0) > tempo_prior(60.0));
        assert!(tempo_prior(120.0) > tempo_prior(240.0));
        assert!((tempo_prior(60.0) - tempo_prior(240.0)).abs() < 1e-12);
    }

    #[test]
    fn flat_envelope_falls_back_to_default() {
        assert_eq!(estimate_tempo(&vec![0.5; 500], 43.0), START_BPM);
        assert_eq!(estimate_tempo(&[], 43.0), START_BPM);
    }
}
