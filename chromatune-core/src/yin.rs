//! YIN pitch detection.
//!
//! Same contract and bounds as the autocorrelation detector: energy gate,
//! lag range from the frequency bounds, parabolic refinement. The period is
//! the first dip of the cumulative mean normalized difference below the
//! threshold, which favours the true period over its multiples.

use log::trace;
use rustfft::{FftPlanner, num_complex::Complex};

use crate::pitch::{
    DetectorSettings, PitchDetector, PitchReading, lag_bounds, last_searchable_lag,
    parabolic_offset, passes_energy_gate, period_in_bounds, period_to_frequency,
};

/// Pitch detection by the YIN difference function.
#[derive(Debug, Clone, Default)]
pub struct YinDetector {
    settings: DetectorSettings,
}

impl YinDetector {
    pub fn new(settings: DetectorSettings) -> Self {
        Self { settings }
    }

    pub fn settings(&self) -> &DetectorSettings {
        &self.settings
    }
}

/// Difference function `d(tau) = sum_j (x[j] - x[j + tau])^2` for
/// `tau` in `0..=max_tau`.
///
/// Expands the square into two energy terms and an autocorrelation, and
/// computes the autocorrelation for every lag at once with an FFT.
pub fn difference_function(signal: &[f32], max_tau: usize) -> Vec<f64> {
    let n = signal.len();
    let mut diff = vec![0.0; max_tau + 1];
    if n == 0 || max_tau == 0 {
        return diff;
    }

    let fft_len = (n * 2).next_power_of_two();
    let mut planner = FftPlanner::<f64>::new();
    let fft = planner.plan_fft_forward(fft_len);
    let ifft = planner.plan_fft_inverse(fft_len);

    let mut buffer = vec![Complex { re: 0.0, im: 0.0 }; fft_len];
    for (slot, &sample) in buffer.iter_mut().zip(signal) {
        slot.re = sample as f64;
    }

    fft.process(&mut buffer);
    for value in buffer.iter_mut() {
        *value = Complex {
            re: value.norm_sqr(),
            im: 0.0,
        };
    }
    ifft.process(&mut buffer);

    let scale = 1.0 / fft_len as f64;
    let mut prefix_sq = vec![0.0_f64; n + 1];
    for (idx, &sample) in signal.iter().enumerate() {
        prefix_sq[idx + 1] = prefix_sq[idx] + sample as f64 * sample as f64;
    }

    // Transform rounding leaves residue where the difference is exactly zero.
    let residue_floor = prefix_sq[n] * 1e-9;
    for tau in 1..=max_tau.min(n - 1) {
        let sum_head = prefix_sq[n - tau];
        let sum_tail = prefix_sq[n] - prefix_sq[tau];
        let autocorr = buffer[tau].re * scale;
        let d = sum_head + sum_tail - 2.0 * autocorr;
        diff[tau] = if d > residue_floor { d } else { 0.0 };
    }

    diff
}

/// Cumulative mean normalized difference `d'(tau) = d(tau) * tau / sum_{j<=tau} d(j)`,
/// with `d'(0) = 1`.
pub fn cumulative_mean_normalized_difference(diff: &[f64]) -> Vec<f64> {
    let mut cmnd = vec![1.0; diff.len()];
    let mut running_sum = 0.0;
    for tau in 1..diff.len() {
        running_sum += diff[tau];
        if running_sum != 0.0 {
            cmnd[tau] = diff[tau] * tau as f64 / running_sum;
        }
    }
    cmnd
}

impl PitchDetector for YinDetector {
    fn name(&self) -> &'static str {
        "yin"
    }

    fn detect_with_clarity(&self, signal: &[f32], sample_rate: u32) -> Option<PitchReading> {
        passes_energy_gate(signal, &self.settings)?;

        let n = signal.len();
        let (min_lag, max_lag) = lag_bounds(sample_rate, &self.settings);
        // One lag of slack so a dip at exactly max_lag is still a minimum.
        let last_tau = last_searchable_lag(n, max_lag + 1);
        if min_lag > last_tau {
            return None;
        }

        let cmnd = cumulative_mean_normalized_difference(&difference_function(signal, last_tau + 1));

        // --- First dip below the threshold, then walk down to its minimum ---
        let threshold = self.settings.yin_threshold as f64;
        let mut tau = (min_lag..=last_tau).find(|&tau| cmnd[tau] < threshold)?;
        while tau < last_tau && cmnd[tau + 1] < cmnd[tau] {
            tau += 1;
        }
        trace!("yin dip at tau {} with d' {:.4}", tau, cmnd[tau]);

        let period = tau as f64 + parabolic_offset(cmnd[tau - 1], cmnd[tau], cmnd[tau + 1]);
        if !period_in_bounds(period, min_lag, max_lag) {
            return None;
        }

        period_to_frequency(sample_rate, period).map(|frequency| PitchReading {
            frequency,
            clarity: (1.0 - cmnd[tau]).clamp(0.0, 1.0) as f32,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sine(freq: f32, sample_rate: u32, len: usize) -> Vec<f32> {
        (0..len)
            .map(|i| (2.0 * std::f32::consts::PI * freq * i as f32 / sample_rate as f32).sin())
            .collect()
    }

    #[test]
    fn fft_difference_matches_direct_sum() {
        let signal = sine(300.0, 8000, 256);
        let diff = difference_function(&signal, 64);
        for tau in [1, 7, 26, 27, 64] {
            let direct: f64 = (0..signal.len() - tau)
                .map(|j| {
                    let delta = signal[j] as f64 - signal[j + tau] as f64;
                    delta * delta
                })
                .sum();
            assert!((diff[tau] - direct).abs() < 1e-6, "tau {tau}: {} vs {direct}", diff[tau]);
        }
        assert_eq!(diff[0], 0.0);
    }

    #[test]
    fn cmnd_constant_signal() {
        let frame = vec![1.0_f32; 64];
        let diff = difference_function(&frame, 32);
        let cmnd = cumulative_mean_normalized_difference(&diff);
        assert!(cmnd.iter().all(|v| (*v - 1.0).abs() < 1e-6));
    }

    #[test]
    fn detects_a440() {
        let freq = YinDetector::default()
            .detect(&sine(440.0, 44100, 2048), 44100)
            .unwrap();
        assert!((freq - 440.0).abs() < 1.0, "got {freq}");
    }

    #[test]
    fn detects_low_a() {
        let freq = YinDetector::default()
            .detect(&sine(55.0, 44100, 2048), 44100)
            .unwrap();
        assert!((freq - 55.0).abs() < 0.5, "got {freq}");
    }

    #[test]
    fn detects_the_lowest_frequency() {
        let freq = YinDetector::default()
            .detect(&sine(50.0, 44100, 2048), 44100)
            .unwrap();
        assert!((freq - 50.0).abs() < 0.1, "got {freq}");
    }

    #[test]
    fn short_windows_only_search_half_their_length() {
        let detector = YinDetector::default();
        assert_eq!(detector.detect(&sine(100.0, 44100, 512), 44100), None);
        let freq = detector.detect(&sine(400.0, 44100, 512), 44100).unwrap();
        assert!((freq - 400.0).abs() < 0.5, "got {freq}");
    }

    #[test]
    fn silence_is_gated() {
        let detector = YinDetector::default();
        assert_eq!(detector.detect(&[0.0; 2048], 44100), None);
        assert_eq!(detector.detect(&[], 44100), None);
    }

    #[test]
    fn constant_signal_never_dips() {
        assert_eq!(YinDetector::default().detect(&[0.5; 2048], 44100), None);
    }
}
