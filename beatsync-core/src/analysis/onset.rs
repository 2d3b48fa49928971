//! Onset strength envelope.
//!
//! Spectral flux of a log-power STFT: for every frame, the mean over
//! frequency bins of the positive increase in dB since the previous frame.

use crate::error::{CoreError, CoreResult};
use realfft::num_complex::Complex32;
use realfft::{RealFftPlanner, RealToComplex};
use std::f32::consts::PI;
use std::sync::Arc;

/// Dynamic range kept below the loudest bin before differencing.
const TOP_DB: f32 = 80.0;
const AMIN: f32 = 1e-10;

fn hann_window(size: usize) -> Vec<f32> {
    // Periodic Hann, as used for STFT analysis
    (0..size)
        .map(|i| 0.5 - 0.5 * (2.0 * PI * i as f32 / size as f32).cos())
        .collect()
}

/// Sample at padded position `pos` of a signal reflect-padded by `pad` on each side.
fn padded_sample(samples: &[f32], pos: isize, pad: usize) -> f32 {
    let len = samples.len() as isize;
    let mut idx = pos - pad as isize;
    if len == 1 {
        return samples[0];
    }
    // Reflect without repeating the edge sample; fold until in range
    let period = 2 * (len - 1);
    idx = idx.rem_euclid(period);
    if idx >= len {
        idx = period - idx;
    }
    samples[idx as usize]
}

struct Stft {
    plan: Arc<dyn RealToComplex<f32>>,
    window: Vec<f32>,
    input: Vec<f32>,
    spectrum: Vec<Complex32>,
    scratch: Vec<Complex32>,
    hop_length: usize,
}

impl Stft {
    fn new(n_fft: usize, hop_length: usize) -> Self {
        let mut planner = RealFftPlanner::<f32>::new();
        let plan = planner.plan_fft_forward(n_fft);
        let input = plan.make_input_vec();
        let spectrum = plan.make_output_vec();
        let scratch = plan.make_scratch_vec();
        Self {
            plan,
            window: hann_window(n_fft),
            input,
            spectrum,
            scratch,
            hop_length,
        }
    }

    fn frame_count(&self, num_samples: usize) -> usize {
        1 + num_samples / self.hop_length
    }

    /// Writes the log-power spectrum (dB) of `frame` into `out`.
    fn frame_db(&mut self, samples: &[f32], frame: usize, out: &mut [f32]) -> CoreResult<()> {
        let n_fft = self.window.len();
        let pad = n_fft / 2;
        let start = (frame * self.hop_length) as isize;
        for (i, slot) in self.input.iter_mut().enumerate() {
            *slot = padded_sample(samples, start + i as isize, pad) * self.window[i];
        }
        self.plan
            .process_with_scratch(&mut self.input, &mut self.spectrum, &mut self.scratch)
            .map_err(|e| CoreError::Analysis(format!("FFT failed: {e}")))?;
        for (bin, value) in self.spectrum.iter().zip(out.iter_mut()) {
            *value = 10.0 * bin.norm_sqr().max(AMIN).log10();
        }
        Ok(())
    }
}

/// Computes the onset strength envelope of `samples`.
///
/// Frames are centered (frame `t` covers samples around `t * hop_length`),
/// so there are `1 + len / hop_length` values and frame 0 is always 0.
pub fn onset_strength(samples: &[f32], n_fft: usize, hop_length: usize) -> CoreResult<Vec<f32>> {
    if samples.is_empty() {
        return Ok(Vec::new());
    }
    let mut stft = Stft::new(n_fft, hop_length);
    let frames = stft.frame_count(samples.len());
    let bins = n_fft / 2 + 1;

    // One STFT pass; rows are kept so the dB floor can be applied afterwards
    let mut spectrogram = vec![0.0f32; frames * bins];
    for (frame, row) in spectrogram.chunks_exact_mut(bins).enumerate() {
        stft.frame_db(samples, frame, row)?;
    }
    let peak_db = spectrogram.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    let floor_db = peak_db - TOP_DB;
    for value in &mut spectrogram {
        *value = value.max(floor_db);
    }

    let mut envelope = Vec::with_capacity(frames);
    envelope.push(0.0);
    let rows = spectrogram.chunks_exact(bins);
    for (previous, current) in rows.clone().zip(rows.skip(1)) {
        let flux: f32 = current
            .iter()
            .zip(previous)
            .map(|(c, p)| (c - p).max(0.0))
            .sum();
        envelope.push(flux / bins as f32);
    }
    Ok(envelope)
}

/// Min-max normalizes `values` to [0, 1]. A flat input maps to all zeros.
#[must_use]
pub fn normalize(values: &[f32]) -> Vec<f32> {
    let min = values.iter().copied().fold(f32::INFINITY, f32::min);
    let max = values.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    let range = max - min;
    if !range.is_finite() || range <= f32::EPSILON {
        return vec![0.0; values.len()];
    }
    values.iter().map(|v| (v - min) / range).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frame_count_is_centered() {
        let samples = vec![0.0f32; 5120];
        let env = onset_strength(&samples, 2048, 512).unwrap();
        assert_eq!(env.len(), 11);
        assert_eq!(env[0], 0.0);
    }

    #[test]
    fn silence_has_flat_envelope() {
        let env = onset_strength(&vec![0.0f32; 22050], 2048, 512).unwrap();
        assert!(env.iter().all(|v| v.abs() < 1e-6));
    }

    #[test]
    fn click_produces_onset_peak_near_its_frame() {
        let mut samples = vec![0.0f32; 22050];
        let click_at = 40 * 512;
        for i in 0..256 {
            samples[click_at + i] = if i % 2 == 0 { 0.9 } else { -0.9 };
        }
        let env = onset_strength(&samples, 2048, 512).unwrap();
        let (peak_frame, _) = env
            .iter()
            .enumerate()
            .max_by(|a, b| a.1.total_cmp(b.1))
            .unwrap();
        assert!((36..=41).contains(&peak_frame), "peak at {peak_frame}");
    }

    #[test]
    fn content_far_below_the_peak_is_floored() {
        let mut samples = vec![0.0f32; 44100];
        let mut state: u32 = 7;
        for sample in samples.iter_mut().take(22050) {
            state = state.wrapping_mul(1_103_515_245).wrapping_add(12345);
            *sample = (((state >> 16) as f32 / 32768.0) - 1.0) * 1e-6;
        }
        let click_at = 60 * 512;
        for i in 0..256 {
            samples[click_at + i] = if i % 2 == 0 { 0.9 } else { -0.9 };
        }
        let env = onset_strength(&samples, 2048, 512).unwrap();
        // Frames 2..35 only see the faint noise, which clamps to the floor
        assert!(env[2..35].iter().all(|v| v.abs() < 1e-6));
        assert!(env.iter().copied().fold(0.0, f32::max) > 0.1);
    }

    #[test]
    fn normalize_handles_flat_and_ranged_input() {
        assert_eq!(normalize(&[2.0, 2.0, 2.0]), vec![0.0, 0.0, 0.0]);
        assert_eq!(normalize(&[1.0, 3.0, 2.0]), vec![0.0, 1.0, 0.5]);
        assert!(normalize(&[]).is_empty());
    }

    #[test]
    fn reflect_padding_mirrors_edges() {
        let s = [1.0, 2.0, 3.0];
        assert_eq!(padded_sample(&s, 0, 2), 3.0);
        assert_eq!(padded_sample(&s, 1, 2), 2.0);
        assert_eq!(padded_sample(&s, 2, 2), 1.0);
        assert_eq!(padded_sample(&s, 5, 2), 2.0);
    }
}
