//! # Pitch Detection Module
//!
//! This module estimates the fundamental frequency of a monophonic signal
//! from a single window of samples. Two detectors implement the same
//! [`PitchDetector`] contract so a caller can swap between them freely:
//!
//! - [`AutocorrelationDetector`] (primary): unbiased autocorrelation peak
//! - [`YinDetector`](crate::yin::YinDetector): cumulative mean normalized
//!   difference, generally more resistant to octave errors
//!
//! ## Shared pipeline
//! - Energy gate to reject silence before any correlation work
//! - Lag search restricted to the configured frequency bounds
//! - Clarity check to reject noise
//! - Parabolic interpolation for sub-sample accuracy
//!
//! Lags past half the window are never searched: their sums cover too few
//! products to tell a period from noise. A window therefore has to hold two
//! periods of the lowest frequency it should detect.
//!
//! Detectors hold only their settings. They keep no state between calls and
//! are safe to share between threads.

use log::trace;
use serde::{Deserialize, Serialize};

use crate::yin::YinDetector;

/// A window of mono samples together with the rate they were captured at.
#[derive(Debug, Clone, PartialEq)]
pub struct SampleWindow {
    /// Amplitudes, nominally in [-1, 1].
    pub samples: Vec<f32>,
    /// Sample rate in Hz. Must be positive.
    pub sample_rate: u32,
}

impl SampleWindow {
    pub fn new(samples: Vec<f32>, sample_rate: u32) -> Self {
        Self {
            samples,
            sample_rate,
        }
    }
}

/// A detected fundamental together with how periodic the window looked.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PitchReading {
    /// Fundamental frequency in Hz.
    pub frequency: f32,
    /// Periodicity of the window in [0, 1]; 1 is a perfectly periodic signal.
    pub clarity: f32,
}

/// Tunable constants shared by every detector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectorSettings {
    /// Lowest fundamental searched for, in Hz.
    pub min_frequency: f32,
    /// Highest fundamental searched for, in Hz.
    pub max_frequency: f32,
    /// Mean-square energy below which a window counts as silence.
    pub silence_threshold: f32,
    /// Minimum ratio of peak correlation to zero-lag correlation.
    pub clarity_threshold: f32,
    /// An earlier correlation peak within this fraction of the strongest one
    /// wins, so a multiple of the period is not reported as the period.
    pub peak_tolerance: f32,
    /// YIN: first dip of the normalized difference below this value.
    pub yin_threshold: f32,
}

impl Default for DetectorSettings {
    fn default() -> Self {
        Self {
            min_frequency: 50.0,
            max_frequency: 1500.0,
            silence_threshold: 0.001,
            clarity_threshold: 0.2,
            peak_tolerance: 0.9,
            yin_threshold: 0.15,
        }
    }
}

/// Estimates the fundamental frequency of a window of samples.
///
/// Preconditions: `sample_rate > 0`. Implementations return `None` rather
/// than panic when it is violated.
pub trait PitchDetector: Send + Sync {
    /// Short identifier used in logs.
    fn name(&self) -> &'static str;

    /// Detects the fundamental and reports the window's clarity.
    ///
    /// # Returns
    /// * `Some(reading)` - Detected fundamental
    /// * `None` - No pitch (silence, noise, or nothing periodic in range)
    fn detect_with_clarity(&self, signal: &[f32], sample_rate: u32) -> Option<PitchReading>;

    /// Detects the fundamental frequency in Hz.
    fn detect(&self, signal: &[f32], sample_rate: u32) -> Option<f32> {
        self.detect_with_clarity(signal, sample_rate)
            .map(|reading| reading.frequency)
    }

    fn detect_window(&self, window: &SampleWindow) -> Option<f32> {
        self.detect(&window.samples, window.sample_rate)
    }
}

/// The available estimation methods.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Algorithm {
    #[default]
    Autocorrelation,
    Yin,
}

impl Algorithm {
    /// Builds a detector of this kind.
    pub fn build(self, settings: DetectorSettings) -> Box<dyn PitchDetector> {
        match self {
            Algorithm::Autocorrelation => Box::new(AutocorrelationDetector::new(settings)),
            Algorithm::Yin => Box::new(YinDetector::new(settings)),
        }
    }
}

/// Mean-square energy of the signal, `None` for an empty window.
pub(crate) fn mean_square(signal: &[f32]) -> Option<f64> {
    if signal.is_empty() {
        return None;
    }
    let sum: f64 = signal.iter().map(|&s| s as f64 * s as f64).sum();
    Some(sum / signal.len() as f64)
}

/// Returns the energy if the window is loud enough to analyse.
pub(crate) fn passes_energy_gate(signal: &[f32], settings: &DetectorSettings) -> Option<f64> {
    let energy = mean_square(signal)?;
    if energy < settings.silence_threshold as f64 {
        trace!(
            "energy {:.6} below silence threshold {}",
            energy, settings.silence_threshold
        );
        return None;
    }
    Some(energy)
}

/// Lag range `(min_lag, max_lag)` implied by the frequency bounds.
///
/// `min_lag` is at least 1 so the lag before it always exists. A zero sample
/// rate yields an empty range.
pub(crate) fn lag_bounds(sample_rate: u32, settings: &DetectorSettings) -> (usize, usize) {
    let rate = sample_rate as f32;
    let min_lag = ((rate / settings.max_frequency).floor() as usize).max(1);
    let max_lag = (rate / settings.min_frequency).ceil() as usize;
    (min_lag, max_lag)
}

/// Largest lag worth searching for a period in a window of `len` samples.
///
/// Capped at half the window, and two below its end so a peak always has a
/// right-hand neighbour.
pub(crate) fn last_searchable_lag(len: usize, wanted: usize) -> usize {
    wanted.min(len / 2).min(len.saturating_sub(2))
}

/// Whether a refined period lies within the lag bounds, give or take half a lag.
pub(crate) fn period_in_bounds(period: f64, min_lag: usize, max_lag: usize) -> bool {
    period >= min_lag as f64 - 0.5 && period <= max_lag as f64 + 0.5
}

/// Vertex offset of the parabola through three equally spaced points,
/// relative to the middle one. A flat triple has no vertex and gives 0.
pub(crate) fn parabolic_offset(y1: f64, y2: f64, y3: f64) -> f64 {
    let denominator = y1 - 2.0 * y2 + y3;
    if denominator == 0.0 {
        return 0.0;
    }
    (y1 - y3) / (2.0 * denominator)
}

/// Converts a refined period in samples to Hz, rejecting degenerate results.
pub(crate) fn period_to_frequency(sample_rate: u32, period: f64) -> Option<f32> {
    let frequency = (sample_rate as f64 / period) as f32;
    if frequency.is_finite() && frequency > 0.0 {
        Some(frequency)
    } else {
        None
    }
}

/// Pitch detection by the peak of the unbiased autocorrelation.
#[derive(Debug, Clone, Default)]
pub struct AutocorrelationDetector {
    settings: DetectorSettings,
}

impl AutocorrelationDetector {
    pub fn new(settings: DetectorSettings) -> Self {
        Self { settings }
    }

    pub fn settings(&self) -> &DetectorSettings {
        &self.settings
    }
}

/// Unbiased autocorrelation for lags `0..=max_lag`.
///
/// Each lag's sum is divided by the number of overlapping terms, so a
/// periodic signal correlates equally at every multiple of its period
/// instead of fading with lag.
///
/// `max_lag` must be below `signal.len()`.
pub fn autocorrelation(signal: &[f32], max_lag: usize) -> Vec<f64> {
    let n = signal.len();
    (0..=max_lag)
        .map(|lag| {
            let overlap = n - lag;
            let sum: f64 = signal[..overlap]
                .iter()
                .zip(&signal[lag..])
                .map(|(&a, &b)| a as f64 * b as f64)
                .sum();
            sum / overlap as f64
        })
        .collect()
}

/// Normalized square difference at one lag: the overlap's correlation
/// divided by its mean energy, in [-1, 1].
///
/// Unlike [`autocorrelation`], a pure tone reaches its maximum of 1 exactly
/// at the period however few periods the overlap holds.
pub fn normalized_square_difference(signal: &[f32], lag: usize) -> f64 {
    if lag >= signal.len() {
        return 0.0;
    }
    let overlap = signal.len() - lag;
    let (cross, energy) = signal[..overlap].iter().zip(&signal[lag..]).fold(
        (0.0_f64, 0.0_f64),
        |(cross, energy), (&a, &b)| {
            let (a, b) = (a as f64, b as f64);
            (cross + a * b, energy + a * a + b * b)
        },
    );
    if energy == 0.0 {
        0.0
    } else {
        2.0 * cross / energy
    }
}

impl PitchDetector for AutocorrelationDetector {
    fn name(&self) -> &'static str {
        "autocorrelation"
    }

    fn detect_with_clarity(&self, signal: &[f32], sample_rate: u32) -> Option<PitchReading> {
        passes_energy_gate(signal, &self.settings)?;

        let n = signal.len();
        let (min_lag, max_lag) = lag_bounds(sample_rate, &self.settings);
        // Over a short overlap the correlation peak of a tone near the lowest
        // frequency lands a few lags past its period.
        let last_lag = last_searchable_lag(n, max_lag + max_lag / 50 + 1);
        if min_lag > last_lag {
            return None;
        }

        let correlation = autocorrelation(signal, last_lag + 1);

        // --- Candidate peaks: interior local maxima within the lag bounds ---
        let peaks: Vec<usize> = (min_lag..=last_lag)
            .filter(|&lag| {
                correlation[lag] > correlation[lag - 1] && correlation[lag] >= correlation[lag + 1]
            })
            .collect();

        let strongest = peaks
            .iter()
            .map(|&lag| correlation[lag])
            .fold(f64::NEG_INFINITY, f64::max);
        if strongest <= 0.0 {
            return None;
        }

        // --- Prefer the first peak close to the strongest to avoid octave errors ---
        let cutoff = strongest * self.settings.peak_tolerance as f64;
        let peak = peaks.into_iter().find(|&lag| correlation[lag] >= cutoff)?;

        let clarity = correlation[peak] / correlation[0];
        if clarity < self.settings.clarity_threshold as f64 {
            trace!(
                "clarity {:.3} at lag {} below threshold {}",
                clarity, peak, self.settings.clarity_threshold
            );
            return None;
        }

        // --- Refine on the normalized square difference, which peaks at the true period ---
        let nsdf = |lag: usize| normalized_square_difference(signal, lag);
        let mut lag = peak;
        while lag > min_lag && nsdf(lag - 1) > nsdf(lag) {
            lag -= 1;
        }
        while lag < last_lag && nsdf(lag + 1) > nsdf(lag) {
            lag += 1;
        }
        let (y1, y2, y3) = (nsdf(lag - 1), nsdf(lag), nsdf(lag + 1));
        if y2 <= y1 || y2 < y3 {
            trace!("no normalized peak near lag {}", peak);
            return None;
        }

        let period = lag as f64 + parabolic_offset(y1, y2, y3);
        if !period_in_bounds(period, min_lag, max_lag) {
            trace!("period {:.2} outside lags {}..={}", period, min_lag, max_lag);
            return None;
        }

        period_to_frequency(sample_rate, period).map(|frequency| PitchReading {
            frequency,
            clarity: clarity.min(1.0) as f32,
        })
    }
}
